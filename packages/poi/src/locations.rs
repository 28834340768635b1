//! Named location polygons with an R-tree for point lookups.

use std::collections::BTreeMap;
use std::path::Path;

use geo::MultiPolygon;
use ub_spatial::BoundaryIndex;
use ub_spatial::features::{Feature, read_features};

use crate::PoiError;

/// One location polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    /// Value of the configured name property.
    pub name: String,
    /// Polygon outline.
    pub geometry: MultiPolygon<f64>,
    /// Every other property, as strings.
    pub attributes: BTreeMap<String, String>,
}

/// All location polygons, indexed.
pub struct Locations {
    items: Vec<Location>,
    index: BoundaryIndex,
}

impl Locations {
    /// Loads locations from a `GeoJSON` feature collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not `GeoJSON`.
    pub fn load(path: &Path, name_field: &str) -> Result<Self, PoiError> {
        let features = read_features(path)?;
        let locations = Self::from_features(features, name_field);
        log::info!(
            "Loaded {} locations from {}",
            locations.len(),
            path.display()
        );
        Ok(locations)
    }

    /// Builds locations from parsed features.
    ///
    /// Features without a name or without a polygonal geometry are skipped.
    #[must_use]
    pub fn from_features(features: Vec<Feature>, name_field: &str) -> Self {
        let total = features.len();
        let items: Vec<Location> = features
            .into_iter()
            .filter_map(|feature| {
                let geometry = feature.multi_polygon()?;
                let mut attributes = feature.properties;
                let name = attributes.remove(name_field)?;
                Some(Location {
                    name,
                    geometry,
                    attributes,
                })
            })
            .collect();

        if items.len() < total {
            log::warn!(
                "Skipped {} of {total} location features without '{name_field}' or polygon geometry",
                total - items.len()
            );
        }

        Self::new(items)
    }

    /// Indexes the given locations.
    #[must_use]
    pub fn new(items: Vec<Location>) -> Self {
        let index = BoundaryIndex::new(items.iter().map(|l| l.geometry.clone()));
        Self { items, index }
    }

    /// Number of locations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether there are no locations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Locations in input order.
    #[must_use]
    pub fn items(&self) -> &[Location] {
        &self.items
    }

    /// Position of the location whose interior contains the point.
    #[must_use]
    pub fn lookup_position(&self, lng: f64, lat: f64) -> Option<usize> {
        self.index.lookup(lng, lat)
    }

    /// The location whose interior contains the point.
    #[must_use]
    pub fn lookup(&self, lng: f64, lat: f64) -> Option<&Location> {
        self.lookup_position(lng, lat).map(|i| &self.items[i])
    }

    /// Positions of every location intersecting `shape`.
    #[must_use]
    pub fn intersecting(&self, shape: &MultiPolygon<f64>) -> Vec<usize> {
        self.index.intersecting(shape)
    }

    /// Attributes keyed by location name; the first of duplicate names wins.
    #[must_use]
    pub fn attributes(&self) -> BTreeMap<String, BTreeMap<String, String>> {
        let mut by_name = BTreeMap::new();
        for location in &self.items {
            by_name
                .entry(location.name.clone())
                .or_insert_with(|| location.attributes.clone());
        }
        by_name
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use geo::{Geometry, Point, Rect, coord};

    pub(crate) fn square_feature(name: Option<&str>, min_x: f64, min_y: f64) -> Feature {
        let rect = Rect::new(
            coord! { x: min_x, y: min_y },
            coord! { x: min_x + 0.1, y: min_y + 0.1 },
        );
        let mut properties = BTreeMap::from([("district".to_string(), "V".to_string())]);
        if let Some(name) = name {
            properties.insert("NAME".to_string(), name.to_string());
        }
        Feature {
            geometry: Geometry::Polygon(rect.to_polygon()),
            properties,
        }
    }

    pub(crate) fn two_locations() -> Locations {
        Locations::from_features(
            vec![
                square_feature(Some("Lipótváros"), 19.0, 47.5),
                square_feature(Some("Terézváros"), 19.1, 47.5),
            ],
            "NAME",
        )
    }

    #[test]
    fn name_moves_out_of_attributes() {
        let locations = two_locations();
        let first = &locations.items()[0];
        assert_eq!(first.name, "Lipótváros");
        assert!(!first.attributes.contains_key("NAME"));
        assert_eq!(first.attributes.get("district").map(String::as_str), Some("V"));
    }

    #[test]
    fn unnamed_or_non_polygon_features_are_skipped() {
        let point = Feature {
            geometry: Geometry::Point(Point::new(19.0, 47.0)),
            properties: BTreeMap::from([("NAME".to_string(), "Pin".to_string())]),
        };
        let locations = Locations::from_features(
            vec![square_feature(None, 19.0, 47.5), point, square_feature(Some("Ok"), 19.2, 47.5)],
            "NAME",
        );
        assert_eq!(locations.len(), 1);
        assert_eq!(locations.items()[0].name, "Ok");
    }

    #[test]
    fn lookup_by_point() {
        let locations = two_locations();
        assert_eq!(locations.lookup(19.05, 47.55).map(|l| l.name.as_str()), Some("Lipótváros"));
        assert_eq!(locations.lookup(19.15, 47.55).map(|l| l.name.as_str()), Some("Terézváros"));
        assert!(locations.lookup(18.0, 47.55).is_none());
    }

    #[test]
    fn attributes_keep_first_duplicate() {
        let mut second = square_feature(Some("Lipótváros"), 19.1, 47.5);
        second.properties.insert("district".to_string(), "VI".to_string());
        let locations =
            Locations::from_features(vec![square_feature(Some("Lipótváros"), 19.0, 47.5), second], "NAME");

        let attributes = locations.attributes();
        assert_eq!(attributes.len(), 1);
        assert_eq!(attributes["Lipótváros"]["district"], "V");
    }
}
