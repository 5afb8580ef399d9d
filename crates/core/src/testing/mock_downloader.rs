//! Mock trailer downloader for testing.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::downloader::{DownloadError, DownloadJob, DownloadedFile, TrailerDownloader};

/// Mock implementation of the TrailerDownloader trait.
///
/// A successful download writes a small `<dest_dir>/<file_stem>.mp4` so
/// the rest of the pipeline sees a real file. Every attempt is recorded,
/// failed ones included.
///
/// # Example
///
/// ```rust,ignore
/// use marquee_core::testing::MockDownloader;
///
/// let downloader = MockDownloader::new();
/// downloader.fail_video("https://www.youtube.com/watch?v=gone").await;
///
/// let jobs = downloader.recorded_jobs().await;
/// ```
#[derive(Debug, Default)]
pub struct MockDownloader {
    jobs: Arc<RwLock<Vec<DownloadJob>>>,
    /// URLs that always fail as unavailable.
    unavailable: Arc<RwLock<HashSet<String>>>,
    /// If set, the next download fails with this error.
    next_error: Arc<RwLock<Option<DownloadError>>>,
}

impl MockDownloader {
    /// Create a new mock downloader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every download of `url` fail.
    pub async fn fail_video(&self, url: &str) {
        self.unavailable.write().await.insert(url.to_string());
    }

    /// Configure the next download to fail with the given error.
    pub async fn set_next_error(&self, error: DownloadError) {
        *self.next_error.write().await = Some(error);
    }

    /// Get every recorded download attempt.
    pub async fn recorded_jobs(&self) -> Vec<DownloadJob> {
        self.jobs.read().await.clone()
    }

    /// Clear recorded attempts.
    pub async fn clear_recorded(&self) {
        self.jobs.write().await.clear();
    }
}

#[async_trait]
impl TrailerDownloader for MockDownloader {
    fn name(&self) -> &str {
        "mock"
    }

    async fn download(&self, job: &DownloadJob) -> Result<DownloadedFile, DownloadError> {
        self.jobs.write().await.push(job.clone());

        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }
        if self.unavailable.read().await.contains(&job.video_url) {
            return Err(DownloadError::failed("Video unavailable"));
        }

        tokio::fs::create_dir_all(&job.dest_dir).await?;
        let path = job.dest_dir.join(format!("{}.mp4", job.file_stem));
        tokio::fs::write(&path, b"mock trailer").await?;
        Ok(DownloadedFile { path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MovieId;
    use tempfile::TempDir;

    fn job(dir: &std::path::Path, url: &str) -> DownloadJob {
        DownloadJob {
            id: MovieId(27205),
            title: "Inception".to_string(),
            video_url: url.to_string(),
            dest_dir: dir.join("Inception (2010)"),
            file_stem: "Inception (2010)-trailer".to_string(),
        }
    }

    #[tokio::test]
    async fn test_download_writes_file() {
        let dir = TempDir::new().unwrap();
        let downloader = MockDownloader::new();

        let file = downloader
            .download(&job(dir.path(), "https://www.youtube.com/watch?v=YoHD9XEInc0"))
            .await
            .unwrap();

        assert!(file.path.ends_with("Inception (2010)/Inception (2010)-trailer.mp4"));
        assert!(file.path.exists());
        assert_eq!(downloader.recorded_jobs().await.len(), 1);
    }

    #[tokio::test]
    async fn test_failures_are_recorded() {
        let dir = TempDir::new().unwrap();
        let downloader = MockDownloader::new();
        downloader.fail_video("https://www.youtube.com/watch?v=gone").await;
        downloader
            .set_next_error(DownloadError::Timeout { timeout_secs: 1 })
            .await;

        let first = downloader
            .download(&job(dir.path(), "https://www.youtube.com/watch?v=ok"))
            .await;
        assert!(matches!(first, Err(DownloadError::Timeout { .. })));

        let second = downloader
            .download(&job(dir.path(), "https://www.youtube.com/watch?v=gone"))
            .await;
        assert!(second.unwrap_err().is_video_unavailable());
        assert_eq!(downloader.recorded_jobs().await.len(), 2);
    }
}
