//! Flat JSON persistence shared by the catalog and the caches.
//!
//! Writes go to a temporary file in the target's directory which is then
//! renamed over the target, so readers only ever see the old or the new
//! content. Reads treat a missing file as `None`.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use thiserror::Error;

/// Errors from reading or writing a persisted JSON file.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem failure.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File exists but does not hold the expected JSON.
    #[error("Corrupt file {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// Value could not be encoded.
    #[error("Failed to encode {path}: {reason}")]
    Encode { path: PathBuf, reason: String },
}

impl StorageError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Serialize `value` as pretty JSON and atomically replace `path` with it.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;

    let bytes = serde_json::to_vec_pretty(value).map_err(|e| StorageError::Encode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| StorageError::io(&dir, e))?;
    tmp.write_all(&bytes).map_err(|e| StorageError::io(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| StorageError::io(path, e))?;
    tmp.persist(path).map_err(|e| StorageError::io(path, e.error))?;

    Ok(())
}

/// Read and decode `path`. A missing file yields `Ok(None)`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StorageError> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StorageError::io(path, e)),
    };

    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| StorageError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

/// Read `path`, falling back to `T::default()` when the file is missing,
/// unreadable or corrupt. Corruption is logged, never fatal.
pub fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path, what: &str) -> T {
    match read_json(path) {
        Ok(Some(value)) => value,
        Ok(None) => T::default(),
        Err(e) => {
            tracing::warn!("{} is unusable, starting empty: {}", what, e);
            T::default()
        }
    }
}
