//! Census population summed per location.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use ub_complexity_models::LocationComplexity;
use ub_poi::Locations;
use ub_price_grid::blocks::Block;
use ub_table::join::left_join;

/// One row of the block population file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PopulationRecord {
    /// Key matched against the block's `TNev`.
    pub szlok_id: String,
    /// Resident population; empty counts as zero.
    pub laknep: Option<f64>,
}

/// Population of one location (`location_population.csv`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationPopulation {
    pub location_name: String,
    pub laknep: f64,
}

/// Sums block population over the blocks intersecting each scored
/// location.
///
/// A block counts toward every location it touches. Scored locations that
/// touch no populated block get zero; locations without a complexity row
/// are left out.
#[must_use]
pub fn population_by_location(
    blocks: &[Block],
    population: &[PopulationRecord],
    locations: &Locations,
    scores: &[LocationComplexity],
) -> Vec<LocationPopulation> {
    let mut per_block = vec![0.0; blocks.len()];
    let joined = left_join(
        blocks.iter().enumerate().collect(),
        population,
        |(_, block)| Some(block.tnev.clone()),
        |record| record.szlok_id.clone(),
    )
    .log_mismatch("census blocks -> population");
    for ((i, _), record) in joined.into_matched() {
        per_block[i] += record.laknep.unwrap_or(0.0);
    }

    let scored: BTreeSet<&str> = scores.iter().map(|s| s.location_name.as_str()).collect();
    let mut totals: BTreeMap<String, f64> = locations
        .items()
        .iter()
        .filter(|l| scored.contains(l.name.as_str()))
        .map(|l| (l.name.clone(), 0.0))
        .collect();

    for (block, laknep) in blocks.iter().zip(&per_block) {
        for position in locations.intersecting(&block.geometry) {
            if let Some(total) = totals.get_mut(&locations.items()[position].name) {
                *total += laknep;
            }
        }
    }

    totals
        .into_iter()
        .map(|(location_name, laknep)| LocationPopulation {
            location_name,
            laknep,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location_hexes::tests::{locations, scores, square};

    fn block(tnev: &str, min_x: f64) -> Block {
        Block {
            tnev: tnev.to_string(),
            szlok: "0001".to_string(),
            district: None,
            geometry: square(min_x, 47.502, 0.002),
        }
    }

    fn record(szlok_id: &str, laknep: Option<f64>) -> PopulationRecord {
        PopulationRecord {
            szlok_id: szlok_id.to_string(),
            laknep,
        }
    }

    #[test]
    fn sums_blocks_intersecting_each_scored_location() {
        let mut all_scores = scores();
        let terez = LocationComplexity {
            location_name: "Terézváros".to_string(),
            ..all_scores[0].clone()
        };
        all_scores.push(terez);
        let blocks = vec![
            block("A", 19.042),
            block("B", 19.045),
            // straddles the shared border
            block("C", 19.049),
            block("D", 19.055),
            block("E", 18.5),
        ];
        let population = vec![
            record("A", Some(100.0)),
            record("B", Some(50.0)),
            record("B", Some(5.0)),
            record("C", Some(10.0)),
            record("D", None),
            record("E", Some(1000.0)),
        ];

        let totals = population_by_location(&blocks, &population, &locations(), &all_scores);

        assert_eq!(
            totals,
            vec![
                LocationPopulation {
                    location_name: "Lipótváros".to_string(),
                    laknep: 165.0,
                },
                LocationPopulation {
                    location_name: "Terézváros".to_string(),
                    laknep: 10.0,
                },
            ]
        );
    }

    #[test]
    fn unscored_locations_are_left_out() {
        let totals = population_by_location(&[], &[], &locations(), &scores());
        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0].location_name, "Lipótváros");
        assert!(totals[0].laknep.abs() < f64::EPSILON, "no blocks means zero");
    }
}
