//! Planned actions and plans.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::catalog::{AssetKind, MovieId};
use crate::downloader::DownloadJob;

/// Which catalog a `Forget` step removes an entry from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreScope {
    Library,
    Trailers,
}

impl fmt::Display for StoreScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Library => f.write_str("library"),
            Self::Trailers => f.write_str("trailers"),
        }
    }
}

/// A single filesystem or catalog mutation, described but not performed.
///
/// Paths are absolute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlannedAction {
    /// Rename within the same folder.
    Rename { src: PathBuf, dst: PathBuf },
    /// Move into another folder.
    Move { src: PathBuf, dst: PathBuf },
    Download(DownloadJob),
    /// Remove a file or a folder with everything in it.
    Delete { path: PathBuf },
    CreateAsset { kind: AssetKind, dst: PathBuf },
    /// Retire a catalog entry.
    Forget { scope: StoreScope, id: MovieId },
}

impl PlannedAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Rename { .. } => ActionKind::Rename,
            Self::Move { .. } => ActionKind::Move,
            Self::Download(_) => ActionKind::Download,
            Self::Delete { .. } => ActionKind::Delete,
            Self::CreateAsset { .. } => ActionKind::CreateAsset,
            Self::Forget { .. } => ActionKind::Forget,
        }
    }
}

impl fmt::Display for PlannedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rename { src, dst } => {
                write!(f, "RENAME {} -> {}", src.display(), dst.display())
            }
            Self::Move { src, dst } => write!(f, "MOVE {} -> {}", src.display(), dst.display()),
            Self::Download(job) => write!(
                f,
                "DOWNLOAD {} -> {}/{}.*",
                job.video_url,
                job.dest_dir.display(),
                job.file_stem
            ),
            Self::Delete { path } => write!(f, "DELETE {}", path.display()),
            Self::CreateAsset { kind, dst } => write!(f, "CREATE {} {}", kind, dst.display()),
            Self::Forget { scope, id } => write!(f, "FORGET {} entry {}", scope, id),
        }
    }
}

/// Kind of a planned action, for counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Rename,
    Move,
    Download,
    Delete,
    CreateAsset,
    Forget,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rename => "rename",
            Self::Move => "move",
            Self::Download => "download",
            Self::Delete => "delete",
            Self::CreateAsset => "create asset",
            Self::Forget => "forget",
        }
    }

    /// Steps that run on the network pool.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Download)
    }

    /// Steps that run on the asset pool.
    pub fn is_asset(&self) -> bool {
        matches!(self, Self::CreateAsset)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    pub action: PlannedAction,
    /// Index of an earlier step that must succeed first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<usize>,
}

/// Ordered batch of steps for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    steps: Vec<PlanStep>,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an independent step, returning its index.
    pub fn push(&mut self, action: PlannedAction) -> usize {
        self.steps.push(PlanStep {
            action,
            depends_on: None,
        });
        self.steps.len() - 1
    }

    /// Appends a step that only runs if step `dependency` succeeded.
    ///
    /// A dependency must point backwards; anything else is dropped and the
    /// step becomes independent.
    pub fn push_after(&mut self, action: PlannedAction, dependency: usize) -> usize {
        let depends_on = (dependency < self.steps.len()).then_some(dependency);
        self.steps.push(PlanStep { action, depends_on });
        self.steps.len() - 1
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn get(&self, index: usize) -> Option<&PlanStep> {
        self.steps.get(index)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Number of steps per action kind.
    pub fn counts(&self) -> BTreeMap<ActionKind, usize> {
        let mut counts = BTreeMap::new();
        for step in &self.steps {
            *counts.entry(step.action.kind()).or_insert(0) += 1;
        }
        counts
    }
}
