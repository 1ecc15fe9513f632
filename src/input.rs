//! # Input Configuration Module
//!
//! Configuration for a single conversion: which archive to read, where the
//! JSON document goes and which variables feed the bounding box.
//!
//! ## Configuration Structure
//!
//! - **source**: local path or HTTP(S) URL of the netCDF archive
//! - **json_output_filename**: explicit output file (optional)
//! - **json_output_directory**: directory for the derived filename (default `.`)
//! - **write_to_stdout**: also print the document (default `false`)
//! - **bounding_box**: GPS variable names (defaults follow the EGO glider format)
//!
//! Configuration files may be JSON or YAML; the format is picked from the
//! file extension.
//!
//! ## Example Usage
//!
//! ```rust
//! use nc2json::input::ConversionConfig;
//!
//! let config = ConversionConfig::from_json(r#"
//! {
//!   "source": "https://co.ifremer.fr/co/ego/ego/v2/sea017/sea017_20230613/sea017_20230613_R.nc",
//!   "json_output_directory": "out"
//! }"#)?;
//! assert_eq!(config.output_path(), std::path::Path::new("out/sea017_20230613_R.nc.json"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::error::{Nc2JsonError, Nc2JsonResult};
use crate::storage::StorageFactory;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure for a conversion.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConversionConfig {
    /// Local path or HTTP(S) URL of the archive; may be left to the CLI
    #[serde(default)]
    pub source: String,
    /// Output file; derived from `source` when absent
    #[serde(default)]
    pub json_output_filename: Option<String>,
    /// Directory for the derived output file
    #[serde(default = "default_output_directory")]
    pub json_output_directory: String,
    /// Also print the document to stdout
    #[serde(default)]
    pub write_to_stdout: bool,
    #[serde(default)]
    pub bounding_box: BoundingBoxConfig,
}

fn default_output_directory() -> String {
    ".".to_string()
}

/// Names of the variables the bounding box is computed from.
///
/// Every field has a default, so a configuration file only needs to list the
/// names that differ.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BoundingBoxConfig {
    pub time_variable: String,
    pub time_qc_variable: String,
    pub latitude_variable: String,
    pub longitude_variable: String,
    /// QC flags shared by latitude and longitude
    pub position_qc_variable: String,
}

impl Default for BoundingBoxConfig {
    fn default() -> Self {
        BoundingBoxConfig {
            time_variable: "TIME_GPS".to_string(),
            time_qc_variable: "TIME_GPS_QC".to_string(),
            latitude_variable: "LATITUDE_GPS".to_string(),
            longitude_variable: "LONGITUDE_GPS".to_string(),
            position_qc_variable: "POSITION_GPS_QC".to_string(),
        }
    }
}

impl ConversionConfig {
    /// A configuration for `source` with every other field at its default.
    pub fn new(source: impl Into<String>) -> Self {
        ConversionConfig {
            source: source.into(),
            json_output_filename: None,
            json_output_directory: default_output_directory(),
            write_to_stdout: false,
            bounding_box: BoundingBoxConfig::default(),
        }
    }

    /// Loads a configuration from a JSON or YAML file.
    ///
    /// Files ending in `.yaml` or `.yml` are parsed as YAML, everything else
    /// as JSON.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use nc2json::input::ConversionConfig;
    ///
    /// let config = ConversionConfig::from_file("sea017.yaml")?;
    /// println!("Converting: {}", config.source);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Nc2JsonResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;

        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

        if is_yaml {
            Self::from_yaml(&content)
        } else {
            Self::from_json(&content)
        }
    }

    /// Loads a configuration from a JSON string.
    pub fn from_json(json_str: &str) -> Nc2JsonResult<Self> {
        let config: ConversionConfig = serde_json::from_str(json_str)?;
        Ok(config)
    }

    /// Loads a configuration from a YAML string.
    pub fn from_yaml(yaml_str: &str) -> Nc2JsonResult<Self> {
        let config: ConversionConfig = serde_yaml::from_str(yaml_str)?;
        Ok(config)
    }

    /// Checks that the configuration can drive a conversion.
    pub fn validate(&self) -> Nc2JsonResult<()> {
        if self.source.trim().is_empty() {
            return Err(Nc2JsonError::Config("source must not be empty".to_string()));
        }
        match &self.json_output_filename {
            Some(name) if name.trim().is_empty() => Err(Nc2JsonError::Config(
                "json_output_filename must not be empty when given".to_string(),
            )),
            None if self.json_output_directory.trim().is_empty() => Err(Nc2JsonError::Config(
                "json_output_directory must not be empty".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Where the document is written.
    ///
    /// The explicit filename when given, otherwise
    /// `<json_output_directory>/<basename of source>.json`.
    pub fn output_path(&self) -> PathBuf {
        match &self.json_output_filename {
            Some(name) => PathBuf::from(name),
            None => Path::new(&self.json_output_directory).join(format!("{}.json", source_basename(&self.source))),
        }
    }

    /// [`output_path`](Self::output_path), with its directory created.
    pub fn prepare_output_path(&self) -> Nc2JsonResult<PathBuf> {
        let path = self.output_path();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| Nc2JsonError::output_unwritable(parent, e))?;
        }
        Ok(path)
    }
}

/// Last path segment of a local path or URL; URL query strings and fragments
/// are ignored.
pub fn source_basename(source: &str) -> String {
    if StorageFactory::is_remote_path(source) {
        let without_suffix = source.split(['?', '#']).next().unwrap_or(source);
        return without_suffix.rsplit('/').next().unwrap_or_default().to_string();
    }

    Path::new(source)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.to_string())
}
