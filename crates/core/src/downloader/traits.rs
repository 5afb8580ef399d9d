//! Trait definitions for the downloader module.

use async_trait::async_trait;

use super::error::DownloadError;
use super::types::{DownloadJob, DownloadedFile};

/// A backend that can fetch a trailer video to local disk.
#[async_trait]
pub trait TrailerDownloader: Send + Sync {
    /// Returns the name of this downloader implementation.
    fn name(&self) -> &str;

    /// Downloads `job.video_url` into `job.dest_dir`, naming the file
    /// `job.file_stem` plus whatever extension the backend produced.
    async fn download(&self, job: &DownloadJob) -> Result<DownloadedFile, DownloadError>;
}
