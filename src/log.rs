use crate::dataset::Dataset;
use crate::input::ConversionConfig;
use log::{info, LevelFilter};
use std::time::Duration;

/// Initialises `env_logger`; `RUST_LOG` refines the level picked from the flags.
pub fn init_logging(verbose: bool, quiet: bool) {
    let level = if quiet {
        LevelFilter::Error
    } else if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level).format_timestamp(None).parse_default_env();
    // A second initialisation (tests, embedding) keeps the first logger
    let _ = builder.try_init();
}

pub fn show_greeting(source: &str) {
    info!("=== netCDF to JSON Converter ===");
    info!("Source: {}", source);
}

pub fn config_echo(config: &ConversionConfig) {
    info!("Configuration:");
    info!("  Source: {}", config.source);
    info!("  Output JSON: {}", config.output_path().display());
    info!("  Echo to stdout: {}", config.write_to_stdout);
    info!(
        "  Bounding box: {} ({}), {}/{} ({})",
        config.bounding_box.time_variable,
        config.bounding_box.time_qc_variable,
        config.bounding_box.latitude_variable,
        config.bounding_box.longitude_variable,
        config.bounding_box.position_qc_variable
    );
}

pub fn show_dataset_info(dataset: &dyn Dataset) {
    info!("Dimensions: {}", dataset.dimensions().join(", "));
    info!("Coordinates: {}", dataset.coordinate_names().join(", "));
    info!("Data variables: {}", dataset.data_variable_names().len());
}

pub fn show_farewell_with_timing(elapsed: Duration) {
    info!("=== Conversion completed in {:.2?} ===", elapsed);
}
