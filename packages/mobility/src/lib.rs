#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Monthly home and third-place tables.
//!
//! For each monthly period the stop-detection file is aggregated into the
//! device's home of the month and its third places (neither home nor
//! work), both priced by the hex cell they fall in. Third places are
//! paired with the home of the same month and its great-circle distance.

pub mod places;
pub mod stops;
pub mod tables;

use std::sync::Arc;

use h3o::Resolution;
use thiserror::Error;
use ub_config::{MobilityConfig, PipelineConfig};
use ub_price_grid::hexes::HexPrice;
use ub_spatial::SpatialError;
use ub_table::TableError;
use ub_table::progress::ProgressCallback;

use crate::places::{AnchorRules, PlaceKind, place_of_the_month, third_places_table};
use crate::stops::StopRecord;
use crate::tables::{HomeRow, ThirdRow, price_homes, price_third_places};

/// Errors raised by the mobility stage.
#[derive(Debug, Error)]
pub enum MobilityError {
    /// A stop or price file is missing or malformed, or an output could
    /// not be written.
    #[error(transparent)]
    Table(#[from] TableError),

    /// A location could not be indexed.
    #[error(transparent)]
    Spatial(#[from] SpatialError),
}

/// Home and third-place rows of every period, in period order.
#[derive(Debug, Clone, Default)]
pub struct MobilityTables {
    /// Priced homes.
    pub homes: Vec<HomeRow>,
    /// Priced third places with their home.
    pub thirds: Vec<ThirdRow>,
}

impl MobilityTables {
    /// Writes `home_table_full.csv` and `third_table_full.csv`.
    ///
    /// # Errors
    ///
    /// Returns an error if either file cannot be written.
    pub fn write(&self, config: &PipelineConfig) -> Result<(), MobilityError> {
        ub_table::io::write_csv(&config.paths.home_table(), &self.homes)?;
        ub_table::io::write_csv(&config.paths.third_table(), &self.thirds)?;
        Ok(())
    }
}

/// Home anchor rules from the mobility config.
#[must_use]
pub const fn home_rules(config: &MobilityConfig) -> AnchorRules {
    AnchorRules {
        min_stops: config.min_home_stops,
        max_coord_std: config.max_home_coord_std,
    }
}

/// Builds the home and third-place tables for one period's stops.
///
/// # Errors
///
/// Returns an error if a mean location cannot be indexed.
pub fn process_period(
    stops: &[StopRecord],
    prices: &[HexPrice],
    rules: AnchorRules,
    res: Resolution,
) -> Result<MobilityTables, MobilityError> {
    let homes = price_homes(place_of_the_month(stops, PlaceKind::Home, rules, res)?, prices);
    let thirds = price_third_places(third_places_table(stops, res)?, prices, &homes);
    Ok(MobilityTables { homes, thirds })
}

/// Processes every configured period in order.
///
/// Nothing is written here; a missing or malformed period file aborts the
/// whole run.
///
/// # Errors
///
/// Returns an error if the hex price table or any period file is missing
/// or malformed.
pub fn run(
    config: &PipelineConfig,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<MobilityTables, MobilityError> {
    let res = ub_spatial::hex::resolution(config.hex.resolution)?;
    let prices: Vec<HexPrice> = ub_table::io::read_csv(&config.paths.hex_prices())?;
    let rules = home_rules(&config.mobility);

    progress.set_total(config.mobility.periods.len() as u64);
    let mut output = MobilityTables::default();

    for period in &config.mobility.periods {
        progress.set_message(format!("period {period}"));
        let stops = stops::load_stops(&config.paths.stops_for_period(period))?;
        let tables = process_period(&stops, &prices, rules, res)?;
        log::info!(
            "{period}: {} homes, {} third places",
            tables.homes.len(),
            tables.thirds.len()
        );
        output.homes.extend(tables.homes);
        output.thirds.extend(tables.thirds);
        progress.inc(1);
    }

    progress.finish(format!(
        "{} homes, {} third places",
        output.homes.len(),
        output.thirds.len()
    ));
    Ok(output)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::places::tests::{home_stops, res, rules};
    use ub_spatial::hex::point_to_cell;
    use ub_table::progress::null_progress;

    #[test]
    fn period_tables_pair_homes_and_thirds() {
        let mut stops = home_stops("d1", 19.05, 47.5);
        stops.push(crate::places::tests::stop("d1", false, 3, 19.06, 47.5, 5));

        let home = &place_of_the_month(&stops, PlaceKind::Home, rules(), res()).unwrap()[0];
        let home_cell = point_to_cell(home.mean_lon, home.mean_lat, res()).unwrap();
        let third_cell = point_to_cell(19.06, 47.5, res()).unwrap();
        let prices: Vec<HexPrice> = [(home_cell, 2), (third_cell, 8)]
            .into_iter()
            .map(|(cell, group)| HexPrice {
                h3_polyfill: cell.to_string(),
                pred_price: 7.0,
                price_group: group,
                pred_real_price: 1096,
            })
            .collect();

        let tables = process_period(&stops, &prices, rules(), res()).unwrap();
        assert_eq!(tables.homes.len(), 1);
        assert_eq!(tables.thirds.len(), 1);
        assert_eq!(tables.thirds[0].price_group_home, 2);
        assert_eq!(tables.thirds[0].price_group_third, 8);
    }

    #[test]
    fn missing_period_file_aborts() {
        let mut config = PipelineConfig::embedded();
        let dir = std::env::temp_dir().join(format!("ub_mobility_missing_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        config.paths.output_dir.clone_from(&dir);
        config.paths.stops_dir = PathBuf::from("/nonexistent/ub_mobility");
        config.mobility.periods = vec!["2019-05".to_string()];
        std::fs::write(
            config.paths.hex_prices(),
            "h3_polyfill,pred_price,price_group,pred_real_price\n",
        )
        .unwrap();

        let result = run(&config, &null_progress());
        assert!(matches!(
            result,
            Err(MobilityError::Table(TableError::InputFormat { .. }))
        ));
        assert!(!config.paths.home_table().exists(), "nothing is written");

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
