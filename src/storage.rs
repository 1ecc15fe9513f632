//! # Storage Abstraction Module
//!
//! This module provides a unified interface for reading and writing files from different storage backends,
//! the local filesystem and HTTP(S) servers. The backend is chosen from the path pattern, which lets the
//! archive loader fall back to a remote download when no local file matches.
//!
//! ## Path Patterns
//!
//! - **HTTP paths**: `https://host/path/to/file.nc` or `http://host/path/to/file.nc`
//! - **Local paths**: `/absolute/path/to/file.nc` or `relative/path/to/file.nc`
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use nc2json::storage::{StorageBackend, StorageFactory};
//!
//! let url = "https://co.ifremer.fr/co/ego/ego/v2/sea017/sea017_20230613/sea017_20230613_R.nc";
//! let storage = StorageFactory::from_path(url)?;
//! let data = storage.read(url)?;
//! println!("Downloaded {} bytes", data.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use indicatif::{ProgressBar, ProgressStyle};
use log::debug;
use std::fs;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Operation not supported by this backend: {0}")]
    Unsupported(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait defining the interface for storage backends
///
/// All operations are blocking: a conversion reads one archive and writes one
/// document, strictly in sequence.
pub trait StorageBackend {
    /// Reads the entire contents of a file
    ///
    /// # Errors
    /// Returns `StorageError` if the file cannot be read
    fn read(&self, path: &str) -> StorageResult<Vec<u8>>;

    /// Writes data to a file, creating it if it doesn't exist
    ///
    /// # Errors
    /// Returns `StorageError` if the file cannot be written
    fn write(&self, path: &str, data: &[u8]) -> StorageResult<()>;

    /// Checks if a file exists at the given path
    fn exists(&self, path: &str) -> StorageResult<bool>;
}

/// Local filesystem storage backend
#[derive(Debug, Clone)]
pub struct LocalStorage;

impl StorageBackend for LocalStorage {
    fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
        match fs::read(path) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::PathNotFound(path.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                Err(StorageError::PermissionDenied(path.to_string()))
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    fn write(&self, path: &str, data: &[u8]) -> StorageResult<()> {
        // Create parent directories if they don't exist
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        match fs::write(path, data) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                Err(StorageError::PermissionDenied(path.to_string()))
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    fn exists(&self, path: &str) -> StorageResult<bool> {
        match fs::metadata(path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}

/// HTTP(S) storage backend
///
/// Read-only: archives are downloaded in one request, with a progress bar on
/// stderr unless progress reporting is disabled.
#[derive(Debug, Clone)]
pub struct HttpStorage {
    client: reqwest::blocking::Client,
    show_progress: bool,
}

impl HttpStorage {
    /// Creates a new HttpStorage with a default blocking client
    pub fn new(show_progress: bool) -> StorageResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("nc2json/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(HttpStorage {
            client,
            show_progress,
        })
    }

    fn progress_bar(&self, total: Option<u64>) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        match total {
            Some(len) => {
                let bar = ProgressBar::new(len);
                if let Ok(style) = ProgressStyle::with_template(
                    "{spinner} [{elapsed_precise}] [{bar:40}] {bytes}/{total_bytes} ({eta})",
                ) {
                    bar.set_style(style.progress_chars("=> "));
                }
                bar
            }
            None => ProgressBar::new_spinner(),
        }
    }
}

impl StorageBackend for HttpStorage {
    fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
        debug!("Downloading {}", path);
        let response = self.client.get(path).send()?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StorageError::PathNotFound(path.to_string()));
        }
        if !status.is_success() {
            return Err(StorageError::HttpStatus {
                url: path.to_string(),
                status: status.as_u16(),
            });
        }

        let bar = self.progress_bar(response.content_length());
        let mut data = Vec::new();
        bar.wrap_read(response).read_to_end(&mut data)?;
        bar.finish_and_clear();

        debug!("Downloaded {} bytes from {}", data.len(), path);
        Ok(data)
    }

    fn write(&self, path: &str, _data: &[u8]) -> StorageResult<()> {
        Err(StorageError::Unsupported(format!("cannot upload to {}", path)))
    }

    fn exists(&self, path: &str) -> StorageResult<bool> {
        let response = self.client.head(path).send()?;
        Ok(response.status().is_success())
    }
}

/// Storage backend enumeration
#[derive(Debug)]
pub enum Storage {
    Local(LocalStorage),
    Http(HttpStorage),
}

impl StorageBackend for Storage {
    fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
        match self {
            Storage::Local(storage) => storage.read(path),
            Storage::Http(storage) => storage.read(path),
        }
    }

    fn write(&self, path: &str, data: &[u8]) -> StorageResult<()> {
        match self {
            Storage::Local(storage) => storage.write(path, data),
            Storage::Http(storage) => storage.write(path, data),
        }
    }

    fn exists(&self, path: &str) -> StorageResult<bool> {
        match self {
            Storage::Local(storage) => storage.exists(path),
            Storage::Http(storage) => storage.exists(path),
        }
    }
}

/// Factory for creating storage backends based on path patterns
///
/// - Paths starting with "http://" or "https://" use HttpStorage
/// - All other paths use LocalStorage
pub struct StorageFactory;

impl StorageFactory {
    /// Creates a storage backend for `path`, with download progress enabled
    pub fn from_path(path: &str) -> StorageResult<Storage> {
        Self::from_path_with_progress(path, true)
    }

    /// Creates a storage backend for `path`
    pub fn from_path_with_progress(path: &str, show_progress: bool) -> StorageResult<Storage> {
        if Self::is_remote_path(path) {
            Ok(Storage::Http(HttpStorage::new(show_progress)?))
        } else {
            Ok(Storage::Local(LocalStorage))
        }
    }

    /// Determines if a path is an HTTP(S) URL
    pub fn is_remote_path(path: &str) -> bool {
        let lower = path.to_ascii_lowercase();
        lower.starts_with("http://") || lower.starts_with("https://")
    }
}
