//! Category complexity attached to every raw POI.

use h3o::Resolution;
use serde::{Deserialize, Serialize};
use ub_complexity_models::CategoryComplexity;
use ub_poi::PoiRecord;
use ub_spatial::SpatialError;
use ub_spatial::hex::point_to_cell;
use ub_table::join::left_join;

/// One POI with its category scores and hex cell
/// (`poi_hex_complexity.csv`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoiHexComplexity {
    pub place_id: Option<String>,
    pub category: Option<String>,
    pub pci: Option<f64>,
    pub ubiquity: Option<u32>,
    pub ubi_norm: Option<f64>,
    pub lng: f64,
    pub lat: f64,
    /// H3 cell of the POI.
    pub h3: String,
}

/// Gives every POI its category's complexity and its H3 cell.
///
/// POIs are taken before any filter, so categories that never entered the
/// complexity run keep empty scores rather than being dropped.
///
/// # Errors
///
/// Returns [`SpatialError::InvalidCoordinate`] if a POI cannot be indexed.
pub fn add_poi_complexity(
    pois: &[PoiRecord],
    categories: &[CategoryComplexity],
    res: Resolution,
) -> Result<Vec<PoiHexComplexity>, SpatialError> {
    left_join(
        pois.iter().collect(),
        categories,
        |poi| poi.category.clone(),
        |category| category.category.clone(),
    )
    .log_mismatch("POIs -> category complexity")
    .into_left_rows()
    .into_iter()
    .map(|(poi, scores)| -> Result<PoiHexComplexity, SpatialError> {
        let scores = scores.as_ref();
        Ok(PoiHexComplexity {
            place_id: poi.place_id.clone(),
            category: poi.category.clone(),
            pci: scores.and_then(|s| s.pci),
            ubiquity: scores.map(|s| s.ubiquity),
            ubi_norm: scores.and_then(|s| s.ubi_norm),
            lng: poi.lng,
            lat: poi.lat,
            h3: point_to_cell(poi.lng, poi.lat, res)?.to_string(),
        })
    })
    .collect()
}
