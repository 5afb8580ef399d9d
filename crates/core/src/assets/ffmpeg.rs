//! FFmpeg-based asset generator implementation.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::debug;

use super::error::AssetError;
use super::traits::AssetGenerator;
use super::types::AssetRequest;
use crate::catalog::AssetKind;
use crate::config::AssetConfig;

/// Renders placeholders and backdrops with ffmpeg.
pub struct FfmpegAssetGenerator {
    config: AssetConfig,
}

impl FfmpegAssetGenerator {
    pub fn new(config: AssetConfig) -> Self {
        Self { config }
    }

    /// Builds ffmpeg arguments for a request.
    fn build_args(&self, request: &AssetRequest) -> Result<Vec<String>, AssetError> {
        let mut args = vec![
            (if request.overwrite { "-y" } else { "-n" }).to_string(),
            "-f".to_string(),
            "lavfi".to_string(),
            "-i".to_string(),
        ];

        match request.kind {
            AssetKind::Placeholder => {
                args.push(format!("color=c=black:s={}:r=30", request.resolution));
                args.extend([
                    "-t".to_string(),
                    request.duration_secs.to_string(),
                    "-c:v".to_string(),
                    "libx264".to_string(),
                    "-pix_fmt".to_string(),
                    "yuv420p".to_string(),
                ]);
            }
            AssetKind::Backdrop => {
                args.push(format!("color=c=black:s={}", request.resolution));
                args.extend([
                    "-vframes".to_string(),
                    "1".to_string(),
                    "-q:v".to_string(),
                    "2".to_string(),
                ]);
            }
            AssetKind::Trailer => {
                return Err(AssetError::Unsupported { kind: request.kind });
            }
        }

        args.extend(["-loglevel".to_string(), "error".to_string()]);
        args.push(request.destination.to_string_lossy().to_string());
        Ok(args)
    }
}

#[async_trait]
impl AssetGenerator for FfmpegAssetGenerator {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn generate(&self, request: &AssetRequest) -> Result<(), AssetError> {
        let args = self.build_args(request)?;

        if let Some(parent) = request.destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        debug!("Running ffmpeg with args: {:?}", args);

        let child = Command::new(&self.config.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    AssetError::FfmpegNotFound {
                        path: self.config.ffmpeg_path.clone(),
                    }
                } else {
                    AssetError::Io(e)
                }
            })?;

        let timeout_duration = Duration::from_secs(self.config.timeout_secs);
        let output = match timeout(timeout_duration, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(AssetError::Io(e)),
            Err(_) => {
                return Err(AssetError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                })
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(AssetError::generation_failed(
                format!("ffmpeg exited with {}", output.status),
                (!stderr.is_empty()).then_some(stderr),
            ));
        }

        Ok(())
    }
}
