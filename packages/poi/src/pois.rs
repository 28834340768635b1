//! POI loading, filtering and location assignment.

use std::path::Path;

use geo::Geometry;
use serde::Serialize;
use ub_complexity_models::CategorizedPoi;
use ub_config::PoiFilter;
use ub_spatial::features::{Feature, read_features};
use ub_table::join::left_join;

use crate::PoiError;
use crate::locations::Locations;

/// Category given to POIs inside a mall by [`PoiFilter::MaskMall`].
pub const MALL_CATEGORY: &str = "shopping mall";

/// One point of interest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoiRecord {
    /// Source identifier.
    pub place_id: Option<String>,
    /// Display name.
    pub name: Option<String>,
    /// Coarse amenity class (used by the ATM and parking filters).
    pub amenity_category: Option<String>,
    /// Category label from the configured column.
    pub category: Option<String>,
    /// Mall the POI is inside, if any.
    pub mall: Option<String>,
    /// Longitude.
    pub lng: f64,
    /// Latitude.
    pub lat: f64,
    /// Location assigned by [`assign_locations`].
    pub location_name: Option<String>,
}

/// Loads POIs from a `GeoJSON` feature collection of points.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not `GeoJSON`.
pub fn load_pois(path: &Path, category_column: &str) -> Result<Vec<PoiRecord>, PoiError> {
    let pois = from_features(read_features(path)?, category_column);
    log::info!("Loaded {} POIs from {}", pois.len(), path.display());
    Ok(pois)
}

/// Builds POIs from parsed features; non-point features are skipped.
#[must_use]
pub fn from_features(features: Vec<Feature>, category_column: &str) -> Vec<PoiRecord> {
    let total = features.len();
    let pois: Vec<PoiRecord> = features
        .into_iter()
        .filter_map(|feature| {
            let Geometry::Point(point) = feature.geometry else {
                return None;
            };
            let mut properties = feature.properties;
            Some(PoiRecord {
                place_id: properties.remove("place_id"),
                name: properties.remove("name"),
                amenity_category: properties.remove("amenity_category"),
                category: properties.remove(category_column),
                mall: properties.remove("mall"),
                lng: point.x(),
                lat: point.y(),
                location_name: None,
            })
        })
        .collect();

    if pois.len() < total {
        log::warn!("Skipped {} of {total} non-point POI features", total - pois.len());
    }
    pois
}

fn is_atm(poi: &PoiRecord) -> bool {
    poi.amenity_category.as_deref() == Some("ATM")
        || poi
            .name
            .as_deref()
            .is_some_and(|name| name.to_lowercase().contains(" atm "))
}

/// Applies the configured filters in their fixed order: ATM, parking,
/// mall removal, mall masking. The order of `filters` does not matter.
#[must_use]
pub fn apply_filters(mut pois: Vec<PoiRecord>, filters: &[PoiFilter]) -> Vec<PoiRecord> {
    let before = pois.len();

    if filters.contains(&PoiFilter::Atm) {
        pois.retain(|poi| !is_atm(poi));
    }
    if filters.contains(&PoiFilter::Parking) {
        pois.retain(|poi| poi.amenity_category.as_deref() != Some("Parking"));
    }
    if filters.contains(&PoiFilter::Mall) {
        pois.retain(|poi| poi.mall.is_none());
    }
    if filters.contains(&PoiFilter::MaskMall) {
        for poi in pois.iter_mut().filter(|poi| poi.mall.is_some()) {
            poi.category = Some(MALL_CATEGORY.to_string());
        }
    }

    log::info!(
        "POI filters {:?} kept {} of {before} POIs",
        filters.iter().map(PoiFilter::to_string).collect::<Vec<_>>(),
        pois.len()
    );
    pois
}

/// Sets `location_name` to the location whose interior contains each POI.
///
/// Every POI is kept; POIs outside all locations keep `None` and are
/// reported as a join mismatch.
#[must_use]
pub fn assign_locations(pois: Vec<PoiRecord>, locations: &Locations) -> Vec<PoiRecord> {
    let positions: Vec<usize> = (0..locations.len()).collect();

    left_join(
        pois,
        &positions,
        |poi| locations.lookup_position(poi.lng, poi.lat),
        |position| *position,
    )
    .log_mismatch("POIs within locations")
    .into_left_rows()
    .into_iter()
    .map(|(mut poi, position)| {
        poi.location_name = position.map(|i| locations.items()[i].name.clone());
        poi
    })
    .collect()
}

/// Reduces POIs to the keys the incidence table is built from.
#[must_use]
pub fn to_categorized(pois: &[PoiRecord]) -> Vec<CategorizedPoi> {
    pois.iter()
        .map(|poi| CategorizedPoi {
            location_name: poi.location_name.clone(),
            category: poi.category.clone(),
            place_id: poi.place_id.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::locations::tests::two_locations;
    use geo::{Point, Rect, coord};

    fn poi(place_id: &str, name: &str, amenity: &str, category: &str) -> PoiRecord {
        PoiRecord {
            place_id: Some(place_id.to_string()),
            name: Some(name.to_string()),
            amenity_category: Some(amenity.to_string()),
            category: Some(category.to_string()),
            mall: None,
            lng: 19.05,
            lat: 47.55,
            location_name: None,
        }
    }

    fn sample() -> Vec<PoiRecord> {
        let mut in_mall = poi("4", "Zara", "Shop", "clothing store");
        in_mall.mall = Some("WestEnd".to_string());
        vec![
            poi("1", "OTP ATM", "Bank", "bank"),
            poi("2", "OTP Bank ATM Lipótváros", "Bank", "bank"),
            poi("3", "Garage", "Parking", "parking"),
            in_mall,
            poi("5", "Atmosphere Bar", "Bar", "bar"),
            poi("6", "Cash", "ATM", "atm"),
        ]
    }

    fn ids(pois: &[PoiRecord]) -> Vec<&str> {
        pois.iter().filter_map(|p| p.place_id.as_deref()).collect()
    }

    #[test]
    fn atm_filter_uses_amenity_and_padded_name() {
        let kept = apply_filters(sample(), &[PoiFilter::Atm]);
        assert_eq!(
            ids(&kept),
            vec!["1", "3", "4", "5"],
            "name match requires ' ATM ' with surrounding spaces"
        );
    }

    #[test]
    fn default_filters_drop_atm_and_parking() {
        let kept = apply_filters(sample(), &[PoiFilter::Atm, PoiFilter::Parking]);
        assert_eq!(ids(&kept), vec!["1", "4", "5"]);
    }

    #[test]
    fn mall_filter_removes_mall_members() {
        let kept = apply_filters(sample(), &[PoiFilter::Mall]);
        assert!(kept.iter().all(|p| p.mall.is_none()));
        assert_eq!(kept.len(), 5);
    }

    #[test]
    fn mask_relabels_mall_members() {
        let kept = apply_filters(sample(), &[PoiFilter::MaskMall]);
        assert_eq!(kept.len(), 6);
        let zara = kept.iter().find(|p| p.place_id.as_deref() == Some("4")).unwrap();
        assert_eq!(zara.category.as_deref(), Some(MALL_CATEGORY));
    }

    #[test]
    fn removal_runs_before_masking_regardless_of_list_order() {
        let kept = apply_filters(sample(), &[PoiFilter::MaskMall, PoiFilter::Mall]);
        assert!(kept.iter().all(|p| p.category.as_deref() != Some(MALL_CATEGORY)));
    }

    #[test]
    fn assign_locations_keeps_outside_pois() {
        let mut outside = poi("9", "Far", "Shop", "bakery");
        outside.lng = 18.0;
        let pois = vec![poi("1", "A", "Shop", "bakery"), outside, {
            let mut p = poi("2", "B", "Shop", "bakery");
            p.lng = 19.15;
            p
        }];

        let assigned = assign_locations(pois, &two_locations());
        assert_eq!(ids(&assigned), vec!["1", "9", "2"], "left order is preserved");
        assert_eq!(assigned[0].location_name.as_deref(), Some("Lipótváros"));
        assert_eq!(assigned[1].location_name, None);
        assert_eq!(assigned[2].location_name.as_deref(), Some("Terézváros"));
    }

    #[test]
    fn features_become_pois() {
        let point = Feature {
            geometry: Geometry::Point(Point::new(19.05, 47.55)),
            properties: BTreeMap::from([
                ("place_id".to_string(), "abc".to_string()),
                ("category_78".to_string(), "cafe".to_string()),
                ("category_12".to_string(), "food".to_string()),
            ]),
        };
        let polygon = Feature {
            geometry: Geometry::Polygon(
                Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 1.0, y: 1.0 }).to_polygon(),
            ),
            properties: BTreeMap::new(),
        };

        let pois = from_features(vec![point, polygon], "category_78");
        assert_eq!(pois.len(), 1);
        assert_eq!(pois[0].category.as_deref(), Some("cafe"));
        assert_eq!(pois[0].place_id.as_deref(), Some("abc"));
        assert!(pois[0].mall.is_none());
    }

    #[test]
    fn categorized_pois_carry_join_keys() {
        let assigned = assign_locations(vec![poi("1", "A", "Shop", "bakery")], &two_locations());
        let categorized = to_categorized(&assigned);
        assert_eq!(
            categorized,
            vec![CategorizedPoi {
                location_name: Some("Lipótváros".into()),
                category: Some("bakery".into()),
                place_id: Some("1".into()),
            }]
        );
    }
}
