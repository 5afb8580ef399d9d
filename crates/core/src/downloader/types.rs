//! Types for the downloader module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::catalog::MovieId;

/// One trailer to fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadJob {
    pub id: MovieId,
    /// Movie title, for logs.
    pub title: String,
    pub video_url: String,
    /// Folder the file is written to (created if missing).
    pub dest_dir: PathBuf,
    /// File name without extension.
    pub file_stem: String,
}

/// Where a finished download landed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadedFile {
    pub path: PathBuf,
}
