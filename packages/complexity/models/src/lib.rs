#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incidence and economic-complexity record types.
//!
//! The complexity pipeline moves through three shapes: POIs tagged with a
//! location and category ([`CategorizedPoi`]), the sparse location ×
//! category count table ([`IncidenceCell`]), and the engine output per
//! cell ([`ComplexityRecord`]), which is finally summarized per location
//! ([`LocationComplexity`]) and per category ([`CategoryComplexity`]).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Minimum-density thresholds for the incidence table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidenceThresholds {
    /// A location needs at least this many distinct categories.
    pub min_categories_per_location: usize,
    /// A (location, category) cell needs at least this many POIs.
    pub min_pois_per_category: u64,
}

impl Default for IncidenceThresholds {
    fn default() -> Self {
        Self {
            min_categories_per_location: 2,
            min_pois_per_category: 2,
        }
    }
}

/// A POI reduced to the three keys the incidence table is built from.
///
/// Any key may be missing: a POI outside every location polygon has no
/// location, and such POIs are simply not counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorizedPoi {
    /// Name of the location the POI lies in.
    pub location_name: Option<String>,
    /// Category label.
    pub category: Option<String>,
    /// Source identifier; only POIs with an identifier are counted.
    pub place_id: Option<String>,
}

/// One stored cell of the sparse location × category table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IncidenceCell {
    /// Location name.
    pub location_name: String,
    /// Category label.
    pub category: String,
    /// Number of POIs of `category` in `location_name`.
    pub poi_count: u64,
    /// Distinct categories in `location_name` before cell filtering.
    pub nr_categories: usize,
}

/// Engine output for one (period, location, category) cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexityRecord {
    /// Period label.
    pub period: String,
    /// Location name.
    pub location_name: String,
    /// Category label.
    pub category: String,
    /// POI count of the cell.
    pub poi_count: u64,
    /// Revealed comparative advantage (NaN when a total is zero).
    pub rca: f64,
    /// Whether `rca >= 1`.
    pub presence: bool,
    /// Categories in which the location has a comparative advantage.
    pub diversity: u32,
    /// Locations with a comparative advantage in the category.
    pub ubiquity: u32,
    /// Economic complexity index of the location.
    pub eci: Option<f64>,
    /// Complexity index of the category.
    pub pci: Option<f64>,
}

/// Complexity summary of one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationComplexity {
    /// Location name.
    pub location_name: String,
    /// Economic complexity index.
    pub eci: Option<f64>,
    /// Number of categories with a comparative advantage.
    pub diversity: u32,
    /// Mean ubiquity of those categories.
    pub avg_ubiquity: Option<f64>,
    /// Min-max normalized ECI.
    pub eci_norm: Option<f64>,
    /// Min-max normalized diversity.
    pub div_norm: Option<f64>,
    /// Remaining properties of the location polygon.
    #[serde(skip)]
    pub attributes: BTreeMap<String, String>,
}

/// Complexity summary of one POI category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryComplexity {
    /// Category label.
    pub category: String,
    /// Category complexity index.
    pub pci: Option<f64>,
    /// Number of locations with a comparative advantage in the category.
    pub ubiquity: u32,
    /// Min-max normalized ubiquity.
    pub ubi_norm: Option<f64>,
}
