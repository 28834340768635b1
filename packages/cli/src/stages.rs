//! One function per pipeline stage: run it and write its outputs.

use std::error::Error;
use std::sync::Arc;

use ub_cli_utils::{IndicatifProgress, MultiProgress};
use ub_complexity::ComplexityOutput;
use ub_config::PipelineConfig;
use ub_poi::Locations;
use ub_poi::pois::{apply_filters, assign_locations, load_pois, to_categorized};
use ub_table::progress::ProgressCallback;

/// Builds and writes the hex price grid.
pub fn price_grid(config: &PipelineConfig) -> Result<(), Box<dyn Error>> {
    let grid = ub_price_grid::run(config)?;
    grid.write(config)?;
    log::info!(
        "Price grid written ({} fills applied)",
        grid.warnings.len()
    );
    Ok(())
}

/// Scores locations and POI categories for the configured period and
/// writes the pair, location and category tables.
pub fn complexity(config: &PipelineConfig) -> Result<ComplexityOutput, Box<dyn Error>> {
    let settings = &config.complexity;
    let paths = &config.paths;

    let locations = Locations::load(&paths.locations, &settings.location_name_field)?;
    let pois = load_pois(&paths.pois, &settings.category_column)?;
    let pois = assign_locations(apply_filters(pois, &settings.filters), &locations);

    let output = ub_complexity::run(
        &settings.period_label,
        &to_categorized(&pois),
        settings.thresholds(),
        &locations.attributes(),
    );

    ub_table::io::write_csv(&paths.complexity_pairs(), &output.run.records)?;
    let (headers, rows) = ub_complexity::tables::location_records(&output.tables.locations);
    ub_table::io::write_records(&paths.location_complexity(), &headers, &rows)?;
    ub_table::io::write_csv(&paths.poi_complexity(), &output.tables.categories)?;

    let warnings = output.warnings().len();
    if warnings > 0 {
        log::warn!("Complexity finished with {warnings} data-integrity warnings");
    }
    Ok(output)
}

/// Builds and writes the monthly home and third-place tables.
pub fn mobility(config: &PipelineConfig, multi: &MultiProgress) -> Result<(), Box<dyn Error>> {
    let progress = IndicatifProgress::periods_bar(multi, "Mobility");
    let tables = ub_mobility::run(config, &progress)?;
    tables.write(config)?;
    Ok(())
}

/// Combines the stage outputs into the figure tables.
pub fn figures(config: &PipelineConfig) -> Result<(), Box<dyn Error>> {
    let tables = ub_figures::run(config)?;
    tables.write(config)?;
    Ok(())
}

/// Runs every stage in dependency order.
pub fn all(config: &PipelineConfig, multi: &MultiProgress) -> Result<(), Box<dyn Error>> {
    let steps: Arc<dyn ProgressCallback> = IndicatifProgress::steps_bar(multi, "Stages", 4);

    steps.set_message("price grid".to_string());
    price_grid(config)?;
    steps.inc(1);

    steps.set_message("complexity".to_string());
    complexity(config)?;
    steps.inc(1);

    steps.set_message("mobility".to_string());
    mobility(config, multi)?;
    steps.inc(1);

    steps.set_message("figures".to_string());
    figures(config)?;
    steps.inc(1);

    steps.finish("all stages done".to_string());
    Ok(())
}
