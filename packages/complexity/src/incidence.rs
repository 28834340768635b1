//! Sparse location × category incidence table.
//!
//! POIs are counted per (location, category). Locations that span too few
//! distinct categories are removed first, then cells holding too few POIs.
//! Whatever disappears is reported, never raised: thin locations and
//! categories are expected to vanish.

use std::collections::{BTreeMap, BTreeSet};

use ub_complexity_models::{CategorizedPoi, IncidenceCell, IncidenceThresholds};
use ub_table::DataIntegrityWarning;

/// Filtered incidence cells plus what the filtering removed.
#[derive(Debug, Clone, PartialEq)]
pub struct IncidenceTable {
    /// Surviving cells, sorted by (location, category).
    pub cells: Vec<IncidenceCell>,
    /// One warning per location or category that lost every cell.
    pub warnings: Vec<DataIntegrityWarning>,
}

impl IncidenceTable {
    /// Total POI count over all cells.
    #[must_use]
    pub fn total_count(&self) -> u64 {
        self.cells.iter().map(|c| c.poi_count).sum()
    }
}

/// Counts POIs per (location, category) and applies the density thresholds.
///
/// POIs with no location or no category are not grouped at all; POIs with
/// no `place_id` are grouped but not counted. The result does not depend on
/// input order.
#[must_use]
pub fn build_incidence_table<'a, I>(pois: I, thresholds: IncidenceThresholds) -> IncidenceTable
where
    I: IntoIterator<Item = &'a CategorizedPoi>,
{
    let mut counts: BTreeMap<(String, String), u64> = BTreeMap::new();
    let mut skipped = 0_usize;

    for poi in pois {
        let (Some(location), Some(category)) = (&poi.location_name, &poi.category) else {
            skipped += 1;
            continue;
        };
        let count = counts
            .entry((location.clone(), category.clone()))
            .or_default();
        if poi.place_id.is_some() {
            *count += 1;
        }
    }

    if skipped > 0 {
        log::debug!("{skipped} POIs without location or category were not counted");
    }

    let mut nr_categories: BTreeMap<&str, usize> = BTreeMap::new();
    for (location, _) in counts.keys() {
        *nr_categories.entry(location.as_str()).or_default() += 1;
    }

    let cells: Vec<IncidenceCell> = counts
        .iter()
        .filter_map(|((location, category), &poi_count)| {
            let distinct = nr_categories[location.as_str()];
            (distinct >= thresholds.min_categories_per_location
                && poi_count >= thresholds.min_pois_per_category)
                .then(|| IncidenceCell {
                    location_name: location.clone(),
                    category: category.clone(),
                    poi_count,
                    nr_categories: distinct,
                })
        })
        .collect();

    let warnings = dropped_keys(&counts, &cells);

    log::info!(
        "Incidence table: {} of {} cells kept ({} locations, {} categories dropped)",
        cells.len(),
        counts.len(),
        warnings
            .iter()
            .filter(|w| matches!(w, DataIntegrityWarning::LocationDropped { .. }))
            .count(),
        warnings
            .iter()
            .filter(|w| matches!(w, DataIntegrityWarning::CategoryDropped { .. }))
            .count(),
    );

    IncidenceTable { cells, warnings }
}

fn dropped_keys(
    counts: &BTreeMap<(String, String), u64>,
    cells: &[IncidenceCell],
) -> Vec<DataIntegrityWarning> {
    let kept_locations: BTreeSet<&str> = cells.iter().map(|c| c.location_name.as_str()).collect();
    let kept_categories: BTreeSet<&str> = cells.iter().map(|c| c.category.as_str()).collect();

    let all_locations: BTreeSet<&str> = counts.keys().map(|(l, _)| l.as_str()).collect();
    let all_categories: BTreeSet<&str> = counts.keys().map(|(_, c)| c.as_str()).collect();

    let locations = all_locations
        .difference(&kept_locations)
        .map(|location| DataIntegrityWarning::LocationDropped {
            location: (*location).to_string(),
        });
    let categories = all_categories
        .difference(&kept_categories)
        .map(|category| DataIntegrityWarning::CategoryDropped {
            category: (*category).to_string(),
        });

    locations
        .chain(categories)
        .map(DataIntegrityWarning::emit)
        .collect()
}
