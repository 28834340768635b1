#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line entry point for the ub-explorer pipeline.
//!
//! Each subcommand runs one stage against the configured inputs and writes
//! its tables into the output directory; `all` runs them in dependency
//! order. Configuration comes from the embedded defaults, overlaid with the
//! file given by `--config`.
//!
//! Uses `indicatif-log-bridge` (via [`ub_cli_utils::init_logger`]) so that
//! log lines and progress bars never fight for the terminal.

mod stages;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ub_config::PipelineConfig;

#[derive(Parser)]
#[command(name = "ub_cli", about = "Budapest mobility and POI complexity pipeline")]
struct Cli {
    /// TOML file overriding the embedded default configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rasterize census-block price predictions onto hex cells
    PriceGrid,
    /// Build monthly home and third-place tables from stop files
    Mobility,
    /// Score locations and POI categories
    Complexity,
    /// Combine stage outputs into figure tables
    Figures,
    /// Run every stage in order
    All,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = ub_cli_utils::init_logger();
    let cli = Cli::parse();

    let config = PipelineConfig::load(cli.config.as_deref())?;
    log::debug!("Output directory: {}", config.paths.output_dir.display());

    match cli.command {
        Commands::PriceGrid => stages::price_grid(&config)?,
        Commands::Mobility => stages::mobility(&config, &multi)?,
        Commands::Complexity => {
            stages::complexity(&config)?;
        }
        Commands::Figures => stages::figures(&config)?,
        Commands::All => stages::all(&config, &multi)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_subcommand_with_config() {
        let cli = Cli::try_parse_from(["ub_cli", "mobility", "--config", "local.toml"]).unwrap();
        assert!(matches!(cli.command, Commands::Mobility));
        assert_eq!(cli.config, Some(PathBuf::from("local.toml")));

        let cli = Cli::try_parse_from(["ub_cli", "price-grid"]).unwrap();
        assert!(matches!(cli.command, Commands::PriceGrid));
        assert!(cli.config.is_none());
    }
}
