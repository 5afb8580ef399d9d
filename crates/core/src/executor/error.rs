//! Error types for the executor module.

use std::path::PathBuf;
use thiserror::Error;

use super::state::ExecutorState;
use crate::assets::AssetError;
use crate::downloader::DownloadError;

/// Misuse of the executor state machine.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Invalid executor transition from {from} to {to}")]
    InvalidTransition {
        from: ExecutorState,
        to: ExecutorState,
    },
}

/// Why a single plan step failed.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Permission denied: {path}")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Destination already exists: {path}")]
    DestinationExists { path: PathBuf },

    #[error("Source not found: {path}")]
    SourceMissing { path: PathBuf },

    #[error("Download failed: {0}")]
    Download(#[from] DownloadError),

    #[error("Asset generation failed: {0}")]
    Asset(#[from] AssetError),

    #[error("Depends on step {step}, which did not succeed")]
    DependencyFailed { step: usize },

    #[error("Worker stopped before finishing: {reason}")]
    Interrupted { reason: String },
}

impl ActionError {
    /// Wraps an I/O error, singling out permission problems.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::PermissionDenied {
            Self::PermissionDenied { path, source }
        } else {
            Self::Io { path, source }
        }
    }
}
