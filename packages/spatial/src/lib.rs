#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Spatial primitives for the ub-explorer pipeline.
//!
//! Polygons come from `GeoJSON` feature collections ([`features`]), are
//! indexed in an R-tree ([`BoundaryIndex`]) for point-in-polygon and
//! polygon overlap lookups, and are covered with H3 cells ([`hex`]).
//! All coordinates are WGS84 longitude/latitude degrees.

pub mod features;
pub mod hex;

use std::path::PathBuf;

use geo::{BoundingRect, Contains, Distance, Haversine, Intersects, MultiPolygon, Point};
use rstar::{AABB, RTree, RTreeObject};
use thiserror::Error;

/// Errors raised by spatial loading and indexing.
#[derive(Debug, Error)]
pub enum SpatialError {
    /// A geometry file could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        /// The file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A geometry file is not the expected `GeoJSON`. Fatal for the stage.
    #[error("Malformed input {}: {message}", path.display())]
    InputFormat {
        /// The file.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// H3 resolutions run from 0 to 15.
    #[error("Invalid H3 resolution {0}")]
    InvalidResolution(u8),

    /// A coordinate that H3 cannot index (non-finite).
    #[error("Invalid coordinate ({lng}, {lat})")]
    InvalidCoordinate {
        /// Longitude.
        lng: f64,
        /// Latitude.
        lat: f64,
    },

    /// A string that is not an H3 cell index.
    #[error("Invalid H3 cell index {0:?}")]
    InvalidCell(String),
}

/// A boundary polygon stored in the R-tree with its position in the input.
struct BoundaryEntry {
    id: usize,
    envelope: AABB<[f64; 2]>,
    polygon: MultiPolygon<f64>,
}

impl RTreeObject for BoundaryEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// R-tree over a list of polygons.
///
/// Lookups answer with positions in the list the index was built from, so
/// callers keep their own per-polygon data in a parallel `Vec`.
pub struct BoundaryIndex {
    tree: RTree<BoundaryEntry>,
}

impl BoundaryIndex {
    /// Builds the index. Polygons keep their input position as id.
    #[must_use]
    pub fn new<I>(polygons: I) -> Self
    where
        I: IntoIterator<Item = MultiPolygon<f64>>,
    {
        let entries: Vec<BoundaryEntry> = polygons
            .into_iter()
            .enumerate()
            .map(|(id, polygon)| BoundaryEntry {
                id,
                envelope: compute_envelope(&polygon),
                polygon,
            })
            .collect();
        log::debug!("Indexed {} boundaries", entries.len());

        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Number of indexed polygons.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Whether the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// The polygon whose interior contains the point.
    ///
    /// Points on a boundary belong to no polygon. When polygons overlap the
    /// lowest id wins.
    #[must_use]
    pub fn lookup(&self, lng: f64, lat: f64) -> Option<usize> {
        let point = Point::new(lng, lat);
        let query_env = AABB::from_point([lng, lat]);

        self.tree
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| entry.polygon.contains(&point))
            .map(|entry| entry.id)
            .min()
    }

    /// The polygon that fully contains `shape`, lowest id first.
    #[must_use]
    pub fn containing(&self, shape: &MultiPolygon<f64>) -> Option<usize> {
        self.tree
            .locate_in_envelope_intersecting(&compute_envelope(shape))
            .filter(|entry| entry.polygon.contains(shape))
            .map(|entry| entry.id)
            .min()
    }

    /// Every polygon that intersects `shape`, in id order.
    #[must_use]
    pub fn intersecting(&self, shape: &MultiPolygon<f64>) -> Vec<usize> {
        let mut ids: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&compute_envelope(shape))
            .filter(|entry| entry.polygon.intersects(shape))
            .map(|entry| entry.id)
            .collect();
        ids.sort_unstable();
        ids
    }
}

/// Great-circle distance between two lon/lat points in kilometres.
#[must_use]
pub fn haversine_km(from: (f64, f64), to: (f64, f64)) -> f64 {
    Haversine.distance(Point::new(from.0, from.1), Point::new(to.0, to.1)) / 1000.0
}

/// Compute the bounding box envelope for a [`MultiPolygon`].
fn compute_envelope(mp: &MultiPolygon<f64>) -> AABB<[f64; 2]> {
    mp.bounding_rect().map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
}
