//! `GeoJSON` feature collections as plain geometries with string properties.

use std::collections::BTreeMap;
use std::path::Path;

use geo::{Geometry, MultiPolygon};
use geojson::GeoJson;
use serde_json::Value;

use crate::SpatialError;

/// One feature of a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Geometry in WGS84 longitude/latitude.
    pub geometry: Geometry<f64>,
    /// Non-null properties, rendered as strings.
    pub properties: BTreeMap<String, String>,
}

impl Feature {
    /// A property value, if present.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// The geometry as a multipolygon when it is polygonal.
    #[must_use]
    pub fn multi_polygon(&self) -> Option<MultiPolygon<f64>> {
        to_multi_polygon(&self.geometry)
    }
}

/// Reads a `GeoJSON` `FeatureCollection` from `path`.
///
/// Features without a geometry are skipped.
///
/// # Errors
///
/// * [`SpatialError::Io`] if the file cannot be read
/// * [`SpatialError::InputFormat`] if it is not a feature collection or a
///   geometry cannot be converted
pub fn read_features(path: &Path) -> Result<Vec<Feature>, SpatialError> {
    let text = std::fs::read_to_string(path).map_err(|source| SpatialError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let features = parse_features(&text).map_err(|message| SpatialError::InputFormat {
        path: path.to_path_buf(),
        message,
    })?;
    log::info!("Read {} features from {}", features.len(), path.display());
    Ok(features)
}

/// Parses a `GeoJSON` `FeatureCollection` held in memory.
///
/// # Errors
///
/// Returns a description of the problem if the text is not a feature
/// collection or a geometry cannot be converted.
pub fn parse_features(text: &str) -> Result<Vec<Feature>, String> {
    let geojson: GeoJson = text.parse().map_err(|e| format!("invalid GeoJSON: {e}"))?;
    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err("expected a FeatureCollection".to_string());
    };

    let mut features = Vec::with_capacity(collection.features.len());
    let mut skipped = 0_usize;

    for (position, feature) in collection.features.into_iter().enumerate() {
        let Some(geometry) = feature.geometry else {
            skipped += 1;
            continue;
        };
        let geometry: Geometry<f64> = geometry
            .try_into()
            .map_err(|e| format!("feature {position}: {e}"))?;

        let properties = feature
            .properties
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(key, value)| property_string(value).map(|v| (key, v)))
            .collect();

        features.push(Feature {
            geometry,
            properties,
        });
    }

    if skipped > 0 {
        log::warn!("Skipped {skipped} features without geometry");
    }

    Ok(features)
}

/// Renders a property value as a string; `null` has no value.
fn property_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// Converts polygonal geometries to a [`MultiPolygon`].
#[must_use]
pub fn to_multi_polygon(geometry: &Geometry<f64>) -> Option<MultiPolygon<f64>> {
    match geometry {
        Geometry::MultiPolygon(mp) => Some(mp.clone()),
        Geometry::Polygon(p) => Some(MultiPolygon(vec![p.clone()])),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLLECTION: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"NAME": "Belváros", "area": 2.5, "note": null},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[19.0, 47.0], [19.1, 47.0], [19.1, 47.1], [19.0, 47.1], [19.0, 47.0]]]
                }
            },
            {
                "type": "Feature",
                "properties": {"place_id": "p1"},
                "geometry": {"type": "Point", "coordinates": [19.05, 47.05]}
            },
            {
                "type": "Feature",
                "properties": {"place_id": "p2"},
                "geometry": null
            }
        ]
    }"#;

    #[test]
    fn parses_properties_as_strings() {
        let features = parse_features(COLLECTION).unwrap();
        assert_eq!(features.len(), 2, "geometry-less feature is skipped");

        let district = &features[0];
        assert_eq!(district.property("NAME"), Some("Belváros"));
        assert_eq!(district.property("area"), Some("2.5"));
        assert_eq!(district.property("note"), None, "null is treated as missing");
    }

    #[test]
    fn polygon_becomes_multipolygon() {
        let features = parse_features(COLLECTION).unwrap();
        assert_eq!(features[0].multi_polygon().map(|mp| mp.0.len()), Some(1));
        assert!(features[1].multi_polygon().is_none(), "points are not polygonal");
    }

    #[test]
    fn rejects_bare_geometry() {
        let err = parse_features(r#"{"type": "Point", "coordinates": [19.0, 47.0]}"#).unwrap_err();
        assert!(err.contains("FeatureCollection"), "unexpected message: {err}");
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_features(Path::new("/nonexistent/ub_spatial/none.geojson")).unwrap_err();
        assert!(matches!(err, SpatialError::Io { .. }));
    }
}
