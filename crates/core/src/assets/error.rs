//! Error types for the assets module.

use std::path::PathBuf;
use thiserror::Error;

use crate::catalog::AssetKind;

/// Errors that can occur while generating an asset.
#[derive(Debug, Error)]
pub enum AssetError {
    /// FFmpeg binary not found.
    #[error("FFmpeg not found at path: {path}")]
    FfmpegNotFound { path: PathBuf },

    /// This backend cannot render the requested kind.
    #[error("Cannot generate {kind} assets")]
    Unsupported { kind: AssetKind },

    /// FFmpeg ran but failed.
    #[error("Asset generation failed: {reason}")]
    GenerationFailed {
        reason: String,
        stderr: Option<String>,
    },

    /// Generation timed out.
    #[error("Asset generation timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// I/O error around generation.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AssetError {
    pub fn generation_failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::GenerationFailed {
            reason: reason.into(),
            stderr,
        }
    }
}
