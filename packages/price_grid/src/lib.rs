#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Hex-level real-estate price grid.
//!
//! Census blocks within the Budapest districts are joined to block-level
//! price predictions, binned into equal-frequency price groups and
//! rasterized onto H3 cells. The hex price table feeds the mobility stage;
//! the per-cell block attributes feed the figure combiner.

pub mod blocks;
pub mod hexes;
pub mod prices;

use h3o::Resolution;
use thiserror::Error;
use ub_config::{PipelineConfig, PriceGridConfig};
use ub_spatial::SpatialError;
use ub_table::{DataIntegrityWarning, TableError};

use crate::blocks::{Block, District};
use crate::hexes::{BlockHexPrice, HexPrice};
use crate::prices::Prediction;

/// Errors raised by the price-grid stage.
#[derive(Debug, Error)]
pub enum PriceGridError {
    /// Block or district polygons could not be loaded.
    #[error(transparent)]
    Spatial(#[from] SpatialError),

    /// The prediction file is malformed, binning failed, or an output
    /// could not be written.
    #[error(transparent)]
    Table(#[from] TableError),

    /// Missing prices cannot be filled because nothing matched.
    #[error("No census block matched a price prediction")]
    NoPredictions,
}

/// Both price-grid tables.
#[derive(Debug, Clone, Default)]
pub struct PriceGrid {
    /// One row per (hex cell, block).
    pub block_hexes: Vec<BlockHexPrice>,
    /// Distinct hex price rows.
    pub hexes: Vec<HexPrice>,
    /// Fills applied to blocks without a prediction.
    pub warnings: Vec<DataIntegrityWarning>,
}

impl PriceGrid {
    /// Writes `bp_hex_price.csv` and `block_hex_price.csv`.
    ///
    /// # Errors
    ///
    /// Returns an error if either file cannot be written.
    pub fn write(&self, config: &PipelineConfig) -> Result<(), PriceGridError> {
        ub_table::io::write_csv(&config.paths.hex_prices(), &self.hexes)?;
        ub_table::io::write_csv(&config.paths.block_hex_prices(), &self.block_hexes)?;
        Ok(())
    }
}

/// Loads the configured inputs and builds the price grid.
///
/// # Errors
///
/// Returns an error if an input is missing or malformed, if no block
/// matches a prediction, or if prices cannot be split into the configured
/// number of groups.
pub fn run(config: &PipelineConfig) -> Result<PriceGrid, PriceGridError> {
    let res = ub_spatial::hex::resolution(config.hex.resolution)?;
    let blocks = blocks::load_blocks(&config.paths.blocks)?;
    let districts = blocks::load_districts(&config.paths.districts)?;
    let predictions = prices::load_predictions(&config.paths.block_prices, &config.price_grid)?;

    build(blocks, &districts, &predictions, res, &config.price_grid)
}

/// Builds the price grid from loaded inputs.
///
/// # Errors
///
/// Returns an error if no block matches a prediction or if prices cannot
/// be split into the configured number of groups.
pub fn build(
    blocks: Vec<Block>,
    districts: &[District],
    predictions: &[Prediction],
    res: Resolution,
    config: &PriceGridConfig,
) -> Result<PriceGrid, PriceGridError> {
    let blocks = blocks::within_districts(blocks, districts);
    let (mut priced, warnings) = prices::attach_predictions(blocks, predictions, config.fill_policy)?;
    prices::assign_price_groups(&mut priced, config.deciles)?;

    let block_hexes = hexes::fill_blocks(&priced, res);
    let hexes = hexes::hex_prices(&block_hexes);
    log::info!(
        "Price grid: {} blocks, {} hex cells",
        priced.len(),
        hexes.len()
    );

    Ok(PriceGrid {
        block_hexes,
        hexes,
        warnings,
    })
}
