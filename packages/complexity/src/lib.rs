#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Economic complexity of urban locations.
//!
//! Categorized POIs are counted into a sparse location × category
//! [`incidence`] table, the [`engine`] derives RCA, presence, diversity,
//! ubiquity and the ECI/PCI eigenvector indices from it, and [`tables`]
//! summarizes the engine output per location and per category.

pub mod engine;
pub mod incidence;
pub mod tables;

use ub_complexity_models::{CategorizedPoi, IncidenceThresholds};
use ub_table::DataIntegrityWarning;

use crate::engine::ComplexityRun;
use crate::incidence::IncidenceTable;
use crate::tables::{ComplexityTables, LocationAttributes};

/// Everything one complexity run produces.
#[derive(Debug, Clone)]
pub struct ComplexityOutput {
    /// Filtered incidence table.
    pub incidence: IncidenceTable,
    /// Per-cell engine output.
    pub run: ComplexityRun,
    /// Location and category summaries.
    pub tables: ComplexityTables,
}

impl ComplexityOutput {
    /// All warnings raised along the way, in pipeline order.
    #[must_use]
    pub fn warnings(&self) -> Vec<&DataIntegrityWarning> {
        self.incidence
            .warnings
            .iter()
            .chain(&self.run.warnings)
            .chain(&self.tables.warnings)
            .collect()
    }
}

/// Runs incidence, engine and summaries for a single period.
#[must_use]
pub fn run(
    period: &str,
    pois: &[CategorizedPoi],
    thresholds: IncidenceThresholds,
    attributes: &LocationAttributes,
) -> ComplexityOutput {
    log::info!("Computing complexity for period {period} from {} POIs", pois.len());

    let incidence = incidence::build_incidence_table(pois, thresholds);
    let run = engine::compute_period(period, &incidence.cells);
    let tables = tables::assemble(&run.records, attributes);

    log::info!(
        "Complexity for {period}: {} records, {} locations, {} categories",
        run.records.len(),
        tables.locations.len(),
        tables.categories.len()
    );

    ComplexityOutput {
        incidence,
        run,
        tables,
    }
}
