#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Points of interest and the locations they are counted in.
//!
//! Locations are named polygons ([`locations`]); POIs are categorized
//! points ([`pois`]) that are filtered, assigned to the location polygon
//! they lie within, and handed to the complexity engine as
//! [`ub_complexity_models::CategorizedPoi`]s.

pub mod locations;
pub mod pois;

use thiserror::Error;
use ub_spatial::SpatialError;

pub use locations::{Location, Locations};
pub use pois::PoiRecord;

/// Errors raised while loading POIs or locations.
#[derive(Debug, Error)]
pub enum PoiError {
    /// Reading or parsing a `GeoJSON` file failed.
    #[error(transparent)]
    Spatial(#[from] SpatialError),
}
