//! # Error Types
//!
//! A single error enum covers every failure a conversion can run into. Storage
//! failures keep their own [`StorageError`](crate::storage::StorageError) and
//! are wrapped here, the same way byte-repair failures keep [`DecodeError`].

use crate::decode::DecodeError;
use crate::storage::StorageError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for conversion operations
pub type Nc2JsonResult<T> = Result<T, Nc2JsonError>;

/// Errors that can occur while loading, converting or writing an archive
#[derive(Error, Debug)]
pub enum Nc2JsonError {
    /// Neither a local open nor a remote fetch produced a dataset.
    #[error("Source unavailable: {location} ({reason})")]
    SourceUnavailable { location: String, reason: String },

    /// A byte string could not be repaired into text.
    #[error(transparent)]
    MalformedByteSequence(#[from] DecodeError),

    /// The quality-control mask rejected every sample of a bounding-box axis.
    #[error("No valid quality-controlled samples for '{variable}'")]
    EmptyQualityControlledSet { variable: String },

    #[error("Cannot write output to {}: {source}", path.display())]
    OutputPathUnwritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Variable '{0}' not found in dataset")]
    MissingVariable(String),

    #[error("Quality-control flags for '{variable}' have {flags} elements but the data has {values}")]
    QcLengthMismatch {
        variable: String,
        values: usize,
        flags: usize,
    },

    #[error("Variable '{0}' does not hold numeric data")]
    NonNumericVariable(String),

    #[error("Variable '{name}' cannot be read: {reason}")]
    UnsupportedVariable { name: String, reason: String },

    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Nc2JsonError {
    pub fn source_unavailable(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            location: location.into(),
            reason: reason.into(),
        }
    }

    pub fn unsupported_variable(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsupportedVariable {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn output_unwritable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::OutputPathUnwritable {
            path: path.into(),
            source,
        }
    }
}

impl From<serde_json::Error> for Nc2JsonError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<serde_yaml::Error> for Nc2JsonError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Config(err.to_string())
    }
}
