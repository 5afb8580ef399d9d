//! Types for the pipeline module.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::config::Config;
use super::report::DownloadRecord;
use crate::executor::{ActionError, ExecutionReport, ExecutorError, Simulation};
use crate::storage::StorageError;

/// The reconciliation operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    Catalog,
    FetchExisting,
    FetchUpcoming,
    Sync,
    /// Placeholders and backdrops for folders already in the trailers root.
    GenerateAssets,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Catalog => "catalog",
            Self::FetchExisting => "fetch-existing",
            Self::FetchUpcoming => "fetch-upcoming",
            Self::Sync => "sync",
            Self::GenerateAssets => "generate-assets",
        };
        f.write_str(name)
    }
}

/// Why an item was left out of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipCategory {
    /// No title and year could be extracted from the file name.
    Unparseable,
    /// The metadata service knows no such movie.
    Unmatched,
    /// Several candidates, or one below the accept threshold.
    Ambiguous,
    /// The identity (or its canonical place) is already taken.
    Duplicate,
    PermissionError,
    /// The metadata service failed even after retrying.
    TransientNetwork,
    /// The movie is in the failure cache.
    KnownFailure,
    /// No usable trailer exists or it could not be downloaded.
    TrailerUnavailable,
    /// A plan step, or a lookup it needed, failed for good.
    ActionFailed,
    /// A plan step never ran because the step it depends on failed.
    DependencyFailed,
}

impl SkipCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unparseable => "unparseable",
            Self::Unmatched => "unmatched",
            Self::Ambiguous => "ambiguous",
            Self::Duplicate => "duplicate",
            Self::PermissionError => "permission error",
            Self::TransientNetwork => "network failure",
            Self::KnownFailure => "known failure",
            Self::TrailerUnavailable => "trailer unavailable",
            Self::ActionFailed => "action failed",
            Self::DependencyFailed => "dependency failed",
        }
    }

    /// Category of a failed plan step.
    pub fn of_action_error(error: &ActionError) -> Self {
        match error {
            ActionError::PermissionDenied { .. } => Self::PermissionError,
            ActionError::DependencyFailed { .. } => Self::DependencyFailed,
            ActionError::Download(e) if e.is_video_unavailable() => Self::TrailerUnavailable,
            _ => Self::ActionFailed,
        }
    }
}

impl fmt::Display for SkipCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One skipped item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipRecord {
    pub category: SkipCategory,
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl SkipRecord {
    pub fn new(category: SkipCategory, path: impl Into<PathBuf>) -> Self {
        Self {
            category,
            path: path.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl fmt::Display for SkipRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.category, self.path.display())?;
        if let Some(detail) = &self.detail {
            write!(f, ": {}", detail)?;
        }
        Ok(())
    }
}

/// Skips collected during one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipList {
    records: Vec<SkipRecord>,
}

impl SkipList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: SkipRecord) {
        tracing::debug!("Skipped {}", record);
        self.records.push(record);
    }

    pub fn skip(&mut self, category: SkipCategory, path: &Path, detail: impl Into<String>) {
        self.push(SkipRecord::new(category, path).with_detail(detail));
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = SkipRecord>) {
        for record in records {
            self.push(record);
        }
    }

    pub fn records(&self) -> &[SkipRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<SkipRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Per-run switches, mostly from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Simulate and ask before executing.
    pub dry_run: bool,
    /// Ignore the failure cache and existing trailers.
    pub force: bool,
    /// Regenerate assets that already exist.
    pub overwrite: bool,
    /// Maximum number of items to plan.
    pub limit: Option<usize>,
}

impl RunOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            dry_run: config.dry_run,
            force: false,
            overwrite: false,
            limit: None,
        }
    }

    pub(crate) fn limit_reached(&self, planned: usize) -> bool {
        self.limit.is_some_and(|limit| planned >= limit)
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The plan was executed.
    Executed,
    /// The plan was declined; nothing changed.
    Aborted,
    /// There was nothing to do.
    NothingToDo,
}

/// Result of one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub operation: Operation,
    pub status: RunStatus,
    pub simulation: Simulation,
    pub execution: Option<ExecutionReport>,
    pub skips: Vec<SkipRecord>,
    /// One record per wanted trailer; fetch operations only.
    pub downloads: Vec<DownloadRecord>,
}

impl RunReport {
    /// Number of skips per category.
    pub fn skip_counts(&self) -> BTreeMap<SkipCategory, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.skips {
            *counts.entry(record.category).or_insert(0) += 1;
        }
        counts
    }

    pub fn skipped(&self, category: SkipCategory) -> usize {
        self.skips.iter().filter(|r| r.category == category).count()
    }

    pub fn is_executed(&self) -> bool {
        self.status == RunStatus::Executed
    }

    pub fn with_downloads(mut self, downloads: Vec<DownloadRecord>) -> Self {
        self.downloads = downloads;
        self
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            RunStatus::Executed => writeln!(f, "{}: executed", self.operation)?,
            RunStatus::Aborted => writeln!(f, "{}: aborted, nothing was changed", self.operation)?,
            RunStatus::NothingToDo => writeln!(f, "{}: nothing to do", self.operation)?,
        }
        writeln!(f, "  planned: {}", self.simulation.summary())?;

        if let Some(execution) = &self.execution {
            writeln!(
                f,
                "  applied: {} ({} already done), failed: {}",
                execution.applied_total(),
                execution.already_done,
                execution.failed_total()
            )?;
        }

        if !self.downloads.is_empty() {
            let done = self.downloads.iter().filter(|d| d.downloaded).count();
            writeln!(
                f,
                "  trailers: {} downloaded, {} missed",
                done,
                self.downloads.len() - done
            )?;
        }

        let skips = self.skip_counts();
        if !skips.is_empty() {
            let summary = skips
                .iter()
                .map(|(category, n)| format!("{} {}", n, category))
                .collect::<Vec<_>>()
                .join(", ");
            writeln!(f, "  skipped: {}", summary)?;
            for record in &self.skips {
                writeln!(f, "    {}", record)?;
            }
        }

        if self.status == RunStatus::Executed {
            writeln!(
                f,
                "  Execution is best-effort: failed steps were skipped and reported, the rest were applied."
            )?;
        }
        Ok(())
    }
}

/// Errors that stop an operation as a whole.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Executor error: {0}")]
    Executor(#[from] ExecutorError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Failed to write report {path}: {source}")]
    Report {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}
