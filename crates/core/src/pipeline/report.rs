//! Per-download outcomes and the files written from them.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::types::{PipelineError, SkipRecord};
use crate::external_catalog::MovieCandidate;
use crate::storage::write_json_atomic;

/// Outcome of one trailer a fetch operation wanted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRecord {
    /// Movie folder name, `Title (Year)`.
    pub folder: String,
    pub downloaded: bool,
    /// Why nothing was downloaded; empty on success.
    pub reason: String,
}

impl DownloadRecord {
    pub fn downloaded(folder: &Path) -> Self {
        Self {
            folder: folder_label(folder),
            downloaded: true,
            reason: String::new(),
        }
    }

    pub fn missed(folder: &Path, reason: impl Into<String>) -> Self {
        Self {
            folder: folder_label(folder),
            downloaded: false,
            reason: reason.into(),
        }
    }

    /// Row for a movie skipped before planning.
    pub fn from_skip(skip: &SkipRecord) -> Self {
        let reason = match &skip.detail {
            Some(detail) => format!("{}: {}", skip.category, detail),
            None => skip.category.to_string(),
        };
        Self::missed(&skip.path, reason)
    }
}

fn folder_label(folder: &Path) -> String {
    folder
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| folder.display().to_string())
}

/// Writes `records` as CSV with a `folder,downloaded,reason` header.
pub fn write_download_report(path: &Path, records: &[DownloadRecord]) -> Result<(), PipelineError> {
    let report_error = |source: csv::Error| PipelineError::Report {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| report_error(e.into()))?;
    }

    // Headers are written by hand so an empty report still has them.
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(report_error)?;
    writer
        .write_record(["folder", "downloaded", "reason"])
        .map_err(report_error)?;
    for record in records {
        writer.serialize(record).map_err(report_error)?;
    }
    writer.flush().map_err(|e| report_error(e.into()))?;

    info!("Wrote {} download records to {}", records.len(), path.display());
    Ok(())
}

/// Dumps discovered movies as pretty JSON.
pub fn export_movie_list(path: &Path, movies: &[MovieCandidate]) -> Result<(), PipelineError> {
    write_json_atomic(path, &movies)?;
    info!("Exported {} discovered movies to {}", movies.len(), path.display());
    Ok(())
}
