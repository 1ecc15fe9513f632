//! # nc2json
//!
//! A Rust library for summarising netCDF archives, typically EGO glider
//! missions, as JSON documents.
//!
//! ## Features
//!
//! - **Local or remote input**: a path is opened in place, an HTTP(S) URL is
//!   downloaded to a temporary file first
//! - **Compact variables**: scalars are written as bare values, arrays are
//!   capped at their first 15 elements
//! - **Text repair**: malformed UTF-8 in string variables is patched with `?`
//! - **Bounding box**: time range and lat/lon rectangle of the
//!   quality-controlled GPS fixes
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nc2json::{process_conversion, input::ConversionConfig};
//!
//! let config = ConversionConfig::from_file("config.yaml").expect("Failed to load config");
//! let written = process_conversion(&config).expect("Failed to convert archive");
//! println!("Wrote {}", written.display());
//! ```
//!
//! ## Configuration Example
//!
//! ```yaml
//! source: https://co.ifremer.fr/co/ego/ego/v2/sea017/sea017_20230613/sea017_20230613_R.nc
//! json_output_directory: out
//! write_to_stdout: false
//! bounding_box:
//!   time_variable: TIME_GPS
//!   time_qc_variable: TIME_GPS_QC
//!   latitude_variable: LATITUDE_GPS
//!   longitude_variable: LONGITUDE_GPS
//!   position_qc_variable: POSITION_GPS_QC
//! ```

pub mod cli;
pub mod convert;
pub mod dataset;
pub mod decode;
pub mod error;
pub mod input;
pub mod log;
pub mod output;
pub mod source;
pub mod storage;
pub mod value;

#[cfg(test)]
mod cli_tests;

use crate::convert::build_document;
use crate::error::Nc2JsonResult;
use crate::input::ConversionConfig;
use crate::log::show_dataset_info;
use crate::output::write_document;
use ::log::debug;
use std::path::PathBuf;

/// Converts one archive according to `config` and returns the path written.
///
/// The pipeline runs strictly in sequence:
/// 1. Opens the archive (local first, then HTTP(S))
/// 2. Builds the document: dimensions, variables, attributes, bounding box
/// 3. Creates the output directory and writes the JSON file
/// 4. Closes the archive, removing any downloaded copy
///
/// The dataset is released on every path; an error after opening drops it.
///
/// # Examples
///
/// ```rust,no_run
/// use nc2json::{process_conversion, input::ConversionConfig};
///
/// let mut config = ConversionConfig::new("sea017_20230613_R.nc");
/// config.json_output_directory = "out".to_string();
/// process_conversion(&config)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
///
/// # Errors
///
/// This function will return an error if:
/// - The configuration does not validate
/// - The archive can neither be opened locally nor downloaded
/// - A variable cannot be read or a text field cannot be repaired
/// - A bounding-box variable is missing or its QC flags do not line up
/// - The output file cannot be written
pub fn process_conversion(config: &ConversionConfig) -> Nc2JsonResult<PathBuf> {
    config.validate()?;

    let dataset = source::open(&config.source)?;
    show_dataset_info(&dataset);

    let document = build_document(&dataset, &config.bounding_box)?;

    let destination = config.prepare_output_path()?;
    write_document(&document, &destination, config.write_to_stdout)?;

    if dataset.is_remote() {
        debug!("Closing {} and removing the downloaded copy", dataset.location());
    } else {
        debug!("Closing {}", dataset.location());
    }
    dataset.close()?;

    Ok(destination)
}
