//! H3 hex cells: point indexing, polygon fill and cell geometry.

use std::collections::BTreeSet;

use geo::{BoundingRect, Contains, Coord, LineString, Point, Polygon};
use h3o::{CellIndex, LatLng, Resolution};

use crate::SpatialError;

const KM_PER_DEGREE_LAT: f64 = 111.32;

/// Converts a configured resolution level into an H3 [`Resolution`].
///
/// # Errors
///
/// * [`SpatialError::InvalidResolution`] for levels above 15
pub fn resolution(level: u8) -> Result<Resolution, SpatialError> {
    Resolution::try_from(level).map_err(|_| SpatialError::InvalidResolution(level))
}

/// The cell containing a lon/lat point.
///
/// # Errors
///
/// * [`SpatialError::InvalidCoordinate`] if a coordinate is not finite
pub fn point_to_cell(lng: f64, lat: f64, res: Resolution) -> Result<CellIndex, SpatialError> {
    LatLng::new(lat, lng)
        .map(|coord| coord.to_cell(res))
        .map_err(|_| SpatialError::InvalidCoordinate { lng, lat })
}

/// Parses the hexadecimal string form of a cell index.
///
/// # Errors
///
/// * [`SpatialError::InvalidCell`] if `s` is not a valid index
pub fn parse_cell(s: &str) -> Result<CellIndex, SpatialError> {
    s.parse()
        .map_err(|_| SpatialError::InvalidCell(s.to_string()))
}

/// Centre of a cell as a lon/lat point.
#[must_use]
pub fn cell_centroid(cell: CellIndex) -> Point<f64> {
    let center = LatLng::from(cell);
    Point::new(center.lng(), center.lat())
}

/// Outline of a cell as a lon/lat polygon.
#[must_use]
pub fn cell_polygon(cell: CellIndex) -> Polygon<f64> {
    let ring: Vec<Coord<f64>> = cell
        .boundary()
        .iter()
        .map(|vertex| Coord {
            x: vertex.lng(),
            y: vertex.lat(),
        })
        .collect();
    Polygon::new(LineString::from(ring), vec![])
}

/// Every cell whose centre lies inside `polygon`, sorted.
///
/// Candidates come from a lon/lat lattice over the bounding box, spaced at
/// half an edge length, so every cell whose centre is inside the box has a
/// lattice point inside it.
#[must_use]
pub fn polyfill(polygon: &Polygon<f64>, res: Resolution) -> Vec<CellIndex> {
    let Some(rect) = polygon.bounding_rect() else {
        return Vec::new();
    };

    let step_lat = res.edge_length_km() / 2.0 / KM_PER_DEGREE_LAT;
    let widest_lat = rect.min().y.abs().max(rect.max().y.abs()).min(89.0);
    let step_lng = step_lat / widest_lat.to_radians().cos();

    let min_lng = rect.min().x - step_lng;
    let min_lat = rect.min().y - step_lat;
    let rows = lattice_steps(rect.height(), step_lat);
    let cols = lattice_steps(rect.width(), step_lng);

    let mut candidates = BTreeSet::new();
    for row in 0..=rows {
        #[allow(clippy::cast_precision_loss)]
        let lat = (row as f64).mul_add(step_lat, min_lat);
        for col in 0..=cols {
            #[allow(clippy::cast_precision_loss)]
            let lng = (col as f64).mul_add(step_lng, min_lng);
            if let Ok(coord) = LatLng::new(lat, lng) {
                candidates.insert(coord.to_cell(res));
            }
        }
    }

    candidates
        .into_iter()
        .filter(|cell| polygon.contains(&cell_centroid(*cell)))
        .collect()
}

/// Number of lattice steps covering `extent` plus one step of margin on
/// each side.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn lattice_steps(extent: f64, step: f64) -> usize {
    (extent / step).ceil() as usize + 2
}
