//! Committing catalog changes as plan steps land.

use tracing::warn;

use super::types::{SkipCategory, SkipRecord};
use crate::catalog::CatalogStore;
use crate::executor::{ActionError, AppliedStep, ExecutionObserver};
use crate::planner::{PlanStep, PlannedAction};

/// What an operation records for its own steps.
pub(crate) trait CommitPolicy: Send {
    fn applied(&mut self, index: usize, step: &PlanStep, applied: &AppliedStep);

    fn failed(&mut self, _index: usize, _step: &PlanStep, _error: &ActionError) {}
}

/// Observer shared by every operation: runs the operation's policy, turns
/// failures into skip records and persists the stores every
/// `persist_every` committed changes.
pub(crate) struct Committer<'a, P> {
    policy: P,
    stores: Vec<&'a CatalogStore>,
    persist_every: usize,
    skips: Vec<SkipRecord>,
}

impl<'a, P: CommitPolicy> Committer<'a, P> {
    pub fn new(policy: P, stores: Vec<&'a CatalogStore>, persist_every: usize) -> Self {
        Self {
            policy,
            stores,
            persist_every,
            skips: Vec::new(),
        }
    }

    pub fn into_skips(self) -> Vec<SkipRecord> {
        self.skips
    }

    /// The policy back, with the skips of failed steps.
    pub fn into_parts(self) -> (P, Vec<SkipRecord>) {
        (self.policy, self.skips)
    }

    fn persist_if_due(&self) {
        for store in &self.stores {
            if let Err(e) = store.persist_if_due(self.persist_every) {
                warn!("Periodic persist of {} failed: {}", store.file().display(), e);
            }
        }
    }
}

impl<P: CommitPolicy> ExecutionObserver for Committer<'_, P> {
    fn on_applied(&mut self, index: usize, step: &PlanStep, applied: &AppliedStep) {
        self.policy.applied(index, step, applied);
        self.persist_if_due();
    }

    fn on_failed(&mut self, index: usize, step: &PlanStep, error: &ActionError) {
        self.policy.failed(index, step, error);
        self.skips.push(
            SkipRecord::new(SkipCategory::of_action_error(error), subject(&step.action))
                .with_detail(error.to_string()),
        );
    }
}

/// The path a step is about, for skip records.
pub(crate) fn subject(action: &PlannedAction) -> std::path::PathBuf {
    match action {
        PlannedAction::Rename { src, .. } | PlannedAction::Move { src, .. } => src.clone(),
        PlannedAction::Download(job) => job.dest_dir.clone(),
        PlannedAction::Delete { path } => path.clone(),
        PlannedAction::CreateAsset { dst, .. } => dst.clone(),
        PlannedAction::Forget { scope, id } => format!("{} entry {}", scope, id).into(),
    }
}
