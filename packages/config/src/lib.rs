#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Pipeline configuration.
//!
//! Every tunable constant of the pipeline (input paths, the POI category
//! column, POI filters, incidence thresholds, hex resolution, price
//! binning, mobility thresholds and periods) lives in one
//! [`PipelineConfig`] that is passed explicitly into each stage.
//!
//! Defaults are embedded at compile time from `config/default.toml`. A user
//! file given on the command line is overlaid key by key, so it only needs
//! to list what differs.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;
use ub_complexity_models::IncidenceThresholds;

/// Embedded default configuration.
const DEFAULT_TOML: &str = include_str!("../config/default.toml");

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The override file could not be read.
    #[error("Failed to read config {}: {source}", path.display())]
    Io {
        /// Override file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The TOML did not parse or did not match the schema.
    #[error("Invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but is out of range.
    #[error("Invalid config value: {message}")]
    Invalid {
        /// What is wrong.
        message: String,
    },
}

/// Complete configuration for every pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Input files and the output directory.
    pub paths: PathsConfig,
    /// H3 indexing.
    pub hex: HexConfig,
    /// POI preparation and complexity engine.
    pub complexity: ComplexityConfig,
    /// Price-grid builder.
    pub price_grid: PriceGridConfig,
    /// Mobility table builder.
    pub mobility: MobilityConfig,
}

/// Input files and output directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Location (neighborhood) polygons, `GeoJSON`.
    pub locations: PathBuf,
    /// Points of interest, `GeoJSON`.
    pub pois: PathBuf,
    /// Census block polygons, `GeoJSON`.
    pub blocks: PathBuf,
    /// District polygons, `GeoJSON`.
    pub districts: PathBuf,
    /// Block-level price model predictions, CSV.
    pub block_prices: PathBuf,
    /// Block-level population, CSV.
    pub population: PathBuf,
    /// Directory holding one stop-detection CSV per monthly period.
    pub stops_dir: PathBuf,
    /// Directory that receives every output table.
    pub output_dir: PathBuf,
}

impl PathsConfig {
    /// Hex-level price table written by the price-grid stage.
    #[must_use]
    pub fn hex_prices(&self) -> PathBuf {
        self.output_dir.join("bp_hex_price.csv")
    }

    /// Hex-level block attributes written by the price-grid stage.
    #[must_use]
    pub fn block_hex_prices(&self) -> PathBuf {
        self.output_dir.join("block_hex_price.csv")
    }

    /// Monthly home table.
    #[must_use]
    pub fn home_table(&self) -> PathBuf {
        self.output_dir.join("home_table_full.csv")
    }

    /// Monthly third-place table.
    #[must_use]
    pub fn third_table(&self) -> PathBuf {
        self.output_dir.join("third_table_full.csv")
    }

    /// Per-cell complexity records.
    #[must_use]
    pub fn complexity_pairs(&self) -> PathBuf {
        self.output_dir.join("complexity_pairs.csv")
    }

    /// Location complexity table.
    #[must_use]
    pub fn location_complexity(&self) -> PathBuf {
        self.output_dir.join("location_complexity.csv")
    }

    /// Category complexity table.
    #[must_use]
    pub fn poi_complexity(&self) -> PathBuf {
        self.output_dir.join("poi_complexity.csv")
    }

    /// Path of the stop-detection file for a monthly period.
    #[must_use]
    pub fn stops_for_period(&self, period: &str) -> PathBuf {
        self.stops_dir.join(format!("{period}.csv"))
    }

    /// Path of a figure-data output file.
    #[must_use]
    pub fn figure_output(&self, name: &str) -> PathBuf {
        self.output_dir.join(name)
    }
}

/// H3 indexing parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HexConfig {
    /// H3 resolution (0-15).
    pub resolution: u8,
}

/// A rule applied to raw POIs before they are counted.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
pub enum PoiFilter {
    /// Drop ATMs (by amenity category or by name).
    #[serde(rename = "ATM")]
    #[strum(serialize = "ATM")]
    Atm,
    /// Drop parking places.
    #[serde(rename = "Parking")]
    #[strum(serialize = "Parking")]
    Parking,
    /// Drop every POI that sits inside a shopping mall.
    #[serde(rename = "mall")]
    #[strum(serialize = "mall")]
    Mall,
    /// Relabel POIs inside a shopping mall as the mall category.
    #[serde(rename = "mask")]
    #[strum(serialize = "mask")]
    MaskMall,
}

/// POI preparation and complexity-engine parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplexityConfig {
    /// POI property holding the category label used for complexity.
    pub category_column: String,
    /// Location property holding the location name.
    pub location_name_field: String,
    /// POI filters to apply.
    pub filters: Vec<PoiFilter>,
    /// Minimum distinct categories for a location to be kept.
    pub min_categories_per_location: usize,
    /// Minimum POIs for a (location, category) cell to be kept.
    pub min_pois_per_category: u64,
    /// Label of the single period the engine is run for.
    pub period_label: String,
}

impl ComplexityConfig {
    /// Incidence thresholds as consumed by the complexity engine.
    #[must_use]
    pub const fn thresholds(&self) -> IncidenceThresholds {
        IncidenceThresholds {
            min_categories_per_location: self.min_categories_per_location,
            min_pois_per_category: self.min_pois_per_category,
        }
    }
}

/// What to do with blocks that have no price prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FillPolicy {
    /// Fill with the mean over blocks that do have a prediction.
    GlobalMean,
    /// Drop blocks without a prediction.
    Drop,
}

/// Price-grid builder parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceGridConfig {
    /// Number of equal-frequency price groups.
    pub deciles: usize,
    /// Field delimiter of the price CSV.
    pub delimiter: char,
    /// Whether the price CSV writes decimals with a comma.
    pub decimal_comma: bool,
    /// Trailing digits of `SZLOKID` that form the block key.
    pub block_id_digits: usize,
    /// Policy for blocks without a prediction.
    pub fill_policy: FillPolicy,
}

/// Mobility table builder parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MobilityConfig {
    /// Monthly periods (`YYYY-MM`), processed in this order.
    pub periods: Vec<String>,
    /// Minimum identified stops behind a monthly home location.
    pub min_home_stops: usize,
    /// Maximum standard deviation (degrees) of home stop coordinates.
    pub max_home_coord_std: f64,
}

impl PipelineConfig {
    /// Returns the embedded defaults.
    ///
    /// # Panics
    ///
    /// Panics if the embedded TOML fails to parse. It is a compile-time
    /// constant covered by tests, so a failure is a development error.
    #[must_use]
    pub fn embedded() -> Self {
        toml::from_str(DEFAULT_TOML)
            .unwrap_or_else(|e| panic!("Failed to parse embedded default config: {e}"))
    }

    /// Loads the defaults, overlaid with `path` when given.
    ///
    /// # Errors
    ///
    /// Returns an error if the override file cannot be read, is not valid
    /// TOML, does not match the schema, or holds out-of-range values.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            None => Self::embedded(),
            Some(path) => {
                let overrides = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                log::info!("Loading config overrides from {}", path.display());
                Self::from_overrides(&overrides)?
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Overlays a TOML document onto the embedded defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if either document fails to parse or the merged
    /// document does not match the schema.
    pub fn from_overrides(overrides: &str) -> Result<Self, ConfigError> {
        let mut base: toml::Table = DEFAULT_TOML.parse()?;
        let overlay: toml::Table = overrides.parse()?;
        merge_tables(&mut base, overlay);
        Ok(toml::Value::Table(base).try_into()?)
    }

    /// Checks value ranges that the schema cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: String| Err(ConfigError::Invalid { message });

        if self.hex.resolution > 15 {
            return invalid(format!(
                "hex.resolution must be 0-15, got {}",
                self.hex.resolution
            ));
        }
        if self.price_grid.deciles == 0 {
            return invalid("price_grid.deciles must be at least 1".to_string());
        }
        if !self.price_grid.delimiter.is_ascii() {
            return invalid(format!(
                "price_grid.delimiter must be ASCII, got {:?}",
                self.price_grid.delimiter
            ));
        }
        if self.price_grid.block_id_digits == 0 {
            return invalid("price_grid.block_id_digits must be at least 1".to_string());
        }
        if self.complexity.category_column.is_empty() {
            return invalid("complexity.category_column must not be empty".to_string());
        }
        if self.mobility.max_home_coord_std < 0.0 {
            return invalid("mobility.max_home_coord_std must not be negative".to_string());
        }
        Ok(())
    }
}

/// Recursively overlays `overlay` onto `base`; non-table values replace.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match value {
            toml::Value::Table(nested) => {
                if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                    merge_tables(existing, nested);
                } else {
                    base.insert(key, toml::Value::Table(nested));
                }
            }
            value => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_defaults_parse_and_validate() {
        let config = PipelineConfig::embedded();
        config.validate().unwrap();
        assert_eq!(config.hex.resolution, 10);
        assert_eq!(config.complexity.category_column, "category_78");
        assert_eq!(
            config.complexity.filters,
            vec![PoiFilter::Atm, PoiFilter::Parking]
        );
        assert_eq!(config.price_grid.fill_policy, FillPolicy::GlobalMean);
    }

    #[test]
    fn default_periods_cover_two_years_of_months() {
        let periods = PipelineConfig::embedded().mobility.periods;
        assert_eq!(periods.len(), 25);
        assert_eq!(periods.first().map(String::as_str), Some("2019-05"));
        assert_eq!(periods.last().map(String::as_str), Some("2021-05"));
    }

    #[test]
    fn overrides_replace_only_given_keys() {
        let config = PipelineConfig::from_overrides(
            "[complexity]\nmin_pois_per_category = 5\nfilters = [\"mall\", \"mask\"]\n",
        )
        .unwrap();

        assert_eq!(config.complexity.min_pois_per_category, 5);
        assert_eq!(config.complexity.min_categories_per_location, 2);
        assert_eq!(
            config.complexity.filters,
            vec![PoiFilter::Mall, PoiFilter::MaskMall]
        );
        assert_eq!(config.hex.resolution, 10);
    }

    #[test]
    fn unknown_filter_is_rejected() {
        let err = PipelineConfig::from_overrides("[complexity]\nfilters = [\"Cinema\"]\n");
        assert!(matches!(err, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn out_of_range_resolution_is_invalid() {
        let config = PipelineConfig::from_overrides("[hex]\nresolution = 16\n").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn thresholds_follow_config() {
        let thresholds = PipelineConfig::embedded().complexity.thresholds();
        assert_eq!(thresholds.min_categories_per_location, 2);
        assert_eq!(thresholds.min_pois_per_category, 2);
    }

    #[test]
    fn filter_names_round_trip_through_strum() {
        for filter in [
            PoiFilter::Atm,
            PoiFilter::Parking,
            PoiFilter::Mall,
            PoiFilter::MaskMall,
        ] {
            let parsed: PoiFilter = filter.to_string().parse().unwrap();
            assert_eq!(parsed, filter);
        }
    }

    #[test]
    fn output_paths_live_in_output_dir() {
        let paths = PipelineConfig::embedded().paths;
        assert_eq!(paths.hex_prices(), PathBuf::from("outputs/bp_hex_price.csv"));
        assert_eq!(
            paths.stops_for_period("2020-01"),
            PathBuf::from("data/semantic_stops/2020-01.csv")
        );
    }
}
