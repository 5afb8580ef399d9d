//! yt-dlp based downloader implementation.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, info};

use super::error::DownloadError;
use super::traits::TrailerDownloader;
use super::types::{DownloadJob, DownloadedFile};
use crate::config::DownloaderConfig;

/// Sponsor segments cut from downloaded trailers.
const SPONSORBLOCK_REMOVE: &str = "interaction,outro";
const MERGE_FORMAT: &str = "mp4";

/// Downloads trailers with the `yt-dlp` binary.
pub struct YtDlpDownloader {
    config: DownloaderConfig,
}

impl YtDlpDownloader {
    pub fn new(config: DownloaderConfig) -> Self {
        Self { config }
    }

    /// Builds yt-dlp arguments for a job.
    fn build_args(&self, job: &DownloadJob) -> Vec<String> {
        let template = job
            .dest_dir
            .join(format!("{}.%(ext)s", job.file_stem))
            .to_string_lossy()
            .to_string();

        vec![
            "--sponsorblock-remove".to_string(),
            SPONSORBLOCK_REMOVE.to_string(),
            "--quiet".to_string(),
            "--no-progress".to_string(),
            "-f".to_string(),
            self.config.format.clone(),
            "--merge-output-format".to_string(),
            MERGE_FORMAT.to_string(),
            "-o".to_string(),
            template,
            job.video_url.clone(),
        ]
    }
}

#[async_trait]
impl TrailerDownloader for YtDlpDownloader {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn download(&self, job: &DownloadJob) -> Result<DownloadedFile, DownloadError> {
        tokio::fs::create_dir_all(&job.dest_dir).await?;

        let args = self.build_args(job);
        debug!("Running yt-dlp with args: {:?}", args);

        let child = Command::new(&self.config.yt_dlp_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    DownloadError::ToolNotFound {
                        path: self.config.yt_dlp_path.clone(),
                    }
                } else {
                    DownloadError::Io(e)
                }
            })?;

        let timeout_duration = Duration::from_secs(self.config.timeout_secs);
        let output = match timeout(timeout_duration, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(DownloadError::Io(e)),
            // Dropping the child kills it.
            Err(_) => {
                return Err(DownloadError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                })
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr
                .lines()
                .rev()
                .find(|l| !l.trim().is_empty())
                .unwrap_or("yt-dlp exited with an error")
                .to_string();
            return Err(DownloadError::Failed { reason });
        }

        let path = find_output(&job.dest_dir, &job.file_stem).ok_or_else(|| {
            DownloadError::MissingOutput {
                dir: job.dest_dir.clone(),
            }
        })?;

        info!("Downloaded trailer for '{}' to {}", job.title, path.display());
        Ok(DownloadedFile { path })
    }
}

/// The file yt-dlp wrote for `stem`, skipping partial downloads.
fn find_output(dir: &Path, stem: &str) -> Option<PathBuf> {
    let prefix = format!("{}.", stem);
    let mut matches: Vec<PathBuf> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            let name = p
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            name.starts_with(&prefix) && !name.ends_with(".part") && !name.ends_with(".ytdl")
        })
        .collect();
    matches.sort();
    matches.into_iter().next()
}
