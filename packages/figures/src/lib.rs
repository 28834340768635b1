#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Figure-ready tables combining the outputs of the other stages.
//!
//! Reads the POI, location and census block inputs together with the
//! complexity, price-grid and mobility outputs, and writes four tables:
//! POIs with their category scores, location scores per hex cell, third
//! places with the locations of both ends and the home's census block, and
//! population per location.

pub mod location_hexes;
pub mod poi_hexes;
pub mod population;
pub mod thirds;

use thiserror::Error;
use ub_complexity_models::{CategoryComplexity, LocationComplexity};
use ub_config::PipelineConfig;
use ub_mobility::tables::ThirdRow;
use ub_poi::{Locations, PoiError};
use ub_price_grid::PriceGridError;
use ub_price_grid::hexes::BlockHexPrice;
use ub_spatial::SpatialError;
use ub_table::TableError;

use crate::location_hexes::LocationHex;
use crate::poi_hexes::PoiHexComplexity;
use crate::population::{LocationPopulation, PopulationRecord};
use crate::thirds::ThirdFigureRow;

/// Output file names, relative to the output directory.
pub const POI_HEX_COMPLEXITY: &str = "poi_hex_complexity.csv";
pub const LOCATION_HEX_COMPLEXITY: &str = "location_hex_complexity.csv";
pub const THIRD_PLACES_FIGURES: &str = "third_places_figures.csv";
pub const LOCATION_POPULATION: &str = "location_population.csv";

/// Errors raised by the figure combiner.
#[derive(Debug, Error)]
pub enum FiguresError {
    /// A stage output is missing or malformed, or a figure table could not
    /// be written.
    #[error(transparent)]
    Table(#[from] TableError),

    /// The hex resolution is invalid or a POI cannot be indexed.
    #[error(transparent)]
    Spatial(#[from] SpatialError),

    /// POIs or locations could not be loaded.
    #[error(transparent)]
    Poi(#[from] PoiError),

    /// Census blocks could not be loaded.
    #[error(transparent)]
    PriceGrid(#[from] PriceGridError),
}

/// All figure tables.
#[derive(Debug, Clone, Default)]
pub struct FigureTables {
    pub poi_hexes: Vec<PoiHexComplexity>,
    pub location_hexes: Vec<LocationHex>,
    pub thirds: Vec<ThirdFigureRow>,
    pub population: Vec<LocationPopulation>,
}

impl FigureTables {
    /// Writes the four figure tables into the output directory.
    ///
    /// # Errors
    ///
    /// Returns an error if any file cannot be written.
    pub fn write(&self, config: &PipelineConfig) -> Result<(), FiguresError> {
        let paths = &config.paths;
        ub_table::io::write_csv(&paths.figure_output(POI_HEX_COMPLEXITY), &self.poi_hexes)?;
        ub_table::io::write_csv(
            &paths.figure_output(LOCATION_HEX_COMPLEXITY),
            &self.location_hexes,
        )?;
        let (headers, records) = thirds::third_records(&self.thirds);
        ub_table::io::write_records(&paths.figure_output(THIRD_PLACES_FIGURES), &headers, &records)?;
        ub_table::io::write_csv(&paths.figure_output(LOCATION_POPULATION), &self.population)?;
        Ok(())
    }
}

/// Reads the inputs and the earlier stage outputs and builds every figure
/// table.
///
/// # Errors
///
/// Returns an error if an input or an earlier output is missing or
/// malformed.
pub fn run(config: &PipelineConfig) -> Result<FigureTables, FiguresError> {
    let paths = &config.paths;
    let res = ub_spatial::hex::resolution(config.hex.resolution)?;

    let pois = ub_poi::pois::load_pois(&paths.pois, &config.complexity.category_column)?;
    let locations = Locations::load(&paths.locations, &config.complexity.location_name_field)?;
    let blocks = ub_price_grid::blocks::load_blocks(&paths.blocks)?;
    let population: Vec<PopulationRecord> = ub_table::io::read_csv(&paths.population)?;

    let categories: Vec<CategoryComplexity> = ub_table::io::read_csv(&paths.poi_complexity())?;
    let scores: Vec<LocationComplexity> = ub_table::io::read_csv(&paths.location_complexity())?;
    let block_hexes: Vec<BlockHexPrice> = ub_table::io::read_csv(&paths.block_hex_prices())?;
    let third_rows: Vec<ThirdRow> = ub_table::io::read_csv(&paths.third_table())?;

    let poi_hexes = poi_hexes::add_poi_complexity(&pois, &categories, res)?;
    let location_hexes = location_hexes::hex_location_complexity(&locations, &scores, res);
    let thirds = thirds::home_block_prices(
        thirds::third_places_with_locations(third_rows, &location_hexes),
        &block_hexes,
    );
    let population = population::population_by_location(&blocks, &population, &locations, &scores);

    log::info!(
        "Figure tables: {} POIs, {} location cells, {} third places, {} locations with population",
        poi_hexes.len(),
        location_hexes.len(),
        thirds.len(),
        population.len()
    );

    Ok(FigureTables {
        poi_hexes,
        location_hexes,
        thirds,
        population,
    })
}
