//! Error types for the downloader module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while downloading a trailer.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Downloader binary not found.
    #[error("Downloader not found at path: {path}")]
    ToolNotFound { path: PathBuf },

    /// The backend ran but reported failure.
    #[error("Download failed: {reason}")]
    Failed { reason: String },

    /// The backend exited cleanly but no file appeared.
    #[error("Download produced no file in {dir}")]
    MissingOutput { dir: PathBuf },

    /// Download timed out.
    #[error("Download timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// I/O error around the download.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DownloadError {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    /// Whether a second attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Failed { .. } | Self::Timeout { .. })
    }

    /// Whether the error comes from the video itself rather than the local
    /// setup, so the movie should be remembered as having no fetchable trailer.
    pub fn is_video_unavailable(&self) -> bool {
        matches!(self, Self::Failed { .. } | Self::MissingOutput { .. })
    }
}
