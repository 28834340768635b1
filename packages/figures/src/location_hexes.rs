//! Location complexity spread over the H3 cells of each location.

use std::collections::BTreeSet;

use h3o::Resolution;
use serde::{Deserialize, Serialize};
use ub_complexity_models::LocationComplexity;
use ub_poi::Locations;
use ub_spatial::hex::polyfill;
use ub_table::join::left_join;

/// One cell of a location polygon with the location's scores
/// (`location_hex_complexity.csv`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationHex {
    /// H3 cell index.
    pub h3_part: String,
    /// Name of the location the cell belongs to.
    pub location_name: String,
    pub eci: Option<f64>,
    pub diversity: Option<u32>,
    pub avg_ubiquity: Option<f64>,
    pub eci_norm: Option<f64>,
    pub div_norm: Option<f64>,
}

impl LocationHex {
    /// Column names with `suffix` appended, in field order.
    #[must_use]
    pub fn columns(suffix: &str) -> Vec<String> {
        [
            "h3_part",
            "location_name",
            "eci",
            "diversity",
            "avg_ubiquity",
            "eci_norm",
            "div_norm",
        ]
        .iter()
        .map(|name| format!("{name}{suffix}"))
        .collect()
    }

    /// Field values in [`LocationHex::columns`] order; `None` gives empty
    /// cells.
    #[must_use]
    pub fn fields(hex: Option<&Self>) -> Vec<String> {
        let Some(hex) = hex else {
            return vec![String::new(); 7];
        };
        vec![
            hex.h3_part.clone(),
            hex.location_name.clone(),
            ub_table::io::format_optional(hex.eci),
            hex.diversity.map(|d| d.to_string()).unwrap_or_default(),
            ub_table::io::format_optional(hex.avg_ubiquity),
            ub_table::io::format_optional(hex.eci_norm),
            ub_table::io::format_optional(hex.div_norm),
        ]
    }
}

/// Fills every location polygon with H3 cells and attaches the location's
/// complexity row.
///
/// Locations without a score keep their cells with empty scores. A cell
/// lying in two locations appears once for each.
#[must_use]
pub fn hex_location_complexity(
    locations: &Locations,
    scores: &[LocationComplexity],
    res: Resolution,
) -> Vec<LocationHex> {
    let mut cells = Vec::new();
    for location in locations.items() {
        let unique: BTreeSet<_> = location
            .geometry
            .0
            .iter()
            .flat_map(|polygon| polyfill(polygon, res))
            .collect();
        if unique.is_empty() {
            log::warn!("Location '{}' holds no hex cell centre", location.name);
        }
        cells.extend(unique.into_iter().map(|cell| (cell.to_string(), &location.name)));
    }

    let rows: Vec<LocationHex> = left_join(
        cells,
        scores,
        |(_, name)| Some((*name).clone()),
        |score| score.location_name.clone(),
    )
    .log_mismatch("location hexes -> location complexity")
    .into_left_rows()
    .into_iter()
    .map(|((h3_part, name), score)| LocationHex {
        h3_part,
        location_name: name.clone(),
        eci: score.as_ref().and_then(|s| s.eci),
        diversity: score.as_ref().map(|s| s.diversity),
        avg_ubiquity: score.as_ref().and_then(|s| s.avg_ubiquity),
        eci_norm: score.as_ref().and_then(|s| s.eci_norm),
        div_norm: score.as_ref().and_then(|s| s.div_norm),
    })
    .collect();

    log::info!(
        "Filled {} locations with {} hex cells",
        locations.len(),
        rows.len()
    );
    rows
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::BTreeMap;

    use geo::{MultiPolygon, Rect, coord};
    use ub_poi::Location;
    use ub_spatial::hex::cell_centroid;

    use super::*;

    pub(crate) fn square(min_x: f64, min_y: f64, size: f64) -> MultiPolygon<f64> {
        let rect = Rect::new(
            coord! { x: min_x, y: min_y },
            coord! { x: min_x + size, y: min_y + size },
        );
        MultiPolygon(vec![rect.to_polygon()])
    }

    /// Two 0.01° locations side by side, Lipótváros west of Terézváros.
    pub(crate) fn locations() -> Locations {
        Locations::new(vec![
            Location {
                name: "Lipótváros".to_string(),
                geometry: square(19.04, 47.50, 0.01),
                attributes: BTreeMap::new(),
            },
            Location {
                name: "Terézváros".to_string(),
                geometry: square(19.05, 47.50, 0.01),
                attributes: BTreeMap::new(),
            },
        ])
    }

    pub(crate) fn scores() -> Vec<LocationComplexity> {
        vec![LocationComplexity {
            location_name: "Lipótváros".to_string(),
            eci: Some(1.2),
            diversity: 4,
            avg_ubiquity: Some(2.5),
            eci_norm: Some(1.0),
            div_norm: Some(1.0),
            attributes: BTreeMap::new(),
        }]
    }

    pub(crate) fn res() -> Resolution {
        ub_spatial::hex::resolution(10).unwrap()
    }

    #[test]
    fn every_location_is_filled_and_scored_when_possible() {
        let rows = hex_location_complexity(&locations(), &scores(), res());

        let lipot: Vec<_> = rows.iter().filter(|r| r.location_name == "Lipótváros").collect();
        let terez: Vec<_> = rows.iter().filter(|r| r.location_name == "Terézváros").collect();
        assert!(!lipot.is_empty() && !terez.is_empty());
        assert!(lipot.iter().all(|r| r.eci == Some(1.2) && r.diversity == Some(4)));
        assert!(
            terez.iter().all(|r| r.eci.is_none() && r.diversity.is_none()),
            "unscored location keeps its cells with empty scores"
        );
    }

    #[test]
    fn cell_centres_lie_in_their_location() {
        let rows = hex_location_complexity(&locations(), &scores(), res());
        for row in rows.iter().filter(|r| r.location_name == "Lipótváros") {
            let centre = cell_centroid(ub_spatial::hex::parse_cell(&row.h3_part).unwrap());
            assert!(
                (19.04..=19.05).contains(&centre.x()),
                "{} centre at {centre:?}",
                row.h3_part
            );
        }
    }

    #[test]
    fn columns_and_fields_line_up() {
        let rows = hex_location_complexity(&locations(), &scores(), res());
        assert_eq!(LocationHex::columns("_home")[2], "eci_home");
        assert_eq!(LocationHex::fields(Some(&rows[0])).len(), LocationHex::columns("").len());
        assert_eq!(LocationHex::fields(None), vec![String::new(); 7]);
    }
}
