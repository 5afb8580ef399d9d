//! The dry-run executor.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::apply::{path_exists, ActionApplier, AppliedStep};
use super::confirm::Confirmer;
use super::error::{ActionError, ExecutorError};
use super::simulation::Simulation;
use super::state::ExecutorState;
use crate::assets::{AssetGenerator, AssetRequest};
use crate::config::AssetConfig;
use crate::downloader::{DownloadError, DownloadJob, TrailerDownloader};
use crate::library::find_trailer;
use crate::planner::{ActionKind, Plan, PlanStep, PlannedAction};
use crate::retry::RetryPolicy;

/// Rendering settings handed to the asset generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetSettings {
    pub duration_secs: u32,
    pub resolution: String,
    /// Regenerate assets that already exist.
    pub overwrite: bool,
}

impl AssetSettings {
    pub fn from_config(config: &AssetConfig, overwrite: bool) -> Self {
        Self {
            duration_secs: config.placeholder_duration_secs,
            resolution: config.placeholder_resolution.clone(),
            overwrite,
        }
    }
}

/// Backends and limits used while executing a plan.
#[derive(Clone)]
pub struct ExecutionContext {
    pub downloader: Arc<dyn TrailerDownloader>,
    pub assets: Arc<dyn AssetGenerator>,
    /// Concurrent downloads.
    pub network_workers: usize,
    /// Concurrent asset renders.
    pub asset_workers: usize,
    pub asset_settings: AssetSettings,
    pub retry: RetryPolicy,
}

/// Receives step results in plan order, on the executing task.
///
/// Callers use it to commit catalog changes as steps land, so a crash
/// mid-run leaves the catalog consistent with the disk.
pub trait ExecutionObserver: Send {
    fn on_applied(&mut self, index: usize, step: &PlanStep, applied: &AppliedStep);

    fn on_failed(&mut self, index: usize, step: &PlanStep, error: &ActionError);
}

/// Observer that ignores everything.
#[derive(Debug, Default)]
pub struct NoopObserver;

impl ExecutionObserver for NoopObserver {
    fn on_applied(&mut self, _index: usize, _step: &PlanStep, _applied: &AppliedStep) {}

    fn on_failed(&mut self, _index: usize, _step: &PlanStep, _error: &ActionError) {}
}

/// Tally of an execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// Steps that completed, per kind (including already-done ones).
    pub applied: BTreeMap<ActionKind, usize>,
    /// Completed steps that found nothing left to do.
    pub already_done: usize,
    /// Steps that failed, per kind (including dependency skips).
    pub failed: BTreeMap<ActionKind, usize>,
    /// Failed steps that never ran because a dependency failed.
    pub dependency_skipped: usize,
}

impl ExecutionReport {
    pub fn applied_total(&self) -> usize {
        self.applied.values().sum()
    }

    pub fn failed_total(&self) -> usize {
        self.failed.values().sum()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// How [`DryRunExecutor::run`] ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Executed {
        simulation: Simulation,
        report: ExecutionReport,
    },
    /// The plan was declined; nothing changed.
    Aborted { simulation: Simulation },
}

impl ExecutionOutcome {
    pub fn simulation(&self) -> &Simulation {
        match self {
            Self::Executed { simulation, .. } | Self::Aborted { simulation } => simulation,
        }
    }

    pub fn report(&self) -> Option<&ExecutionReport> {
        match self {
            Self::Executed { report, .. } => Some(report),
            Self::Aborted { .. } => None,
        }
    }

    pub fn is_executed(&self) -> bool {
        matches!(self, Self::Executed { .. })
    }
}

/// Runs one plan through simulation, confirmation and execution.
///
/// Filesystem steps run first, one at a time in plan order. Downloads then
/// run on the network pool and asset renders on the asset pool. A step whose
/// dependency has not succeeded by the time it is scheduled fails with
/// [`ActionError::DependencyFailed`].
pub struct DryRunExecutor {
    plan: Plan,
    notes: Vec<String>,
    dry_run: bool,
    state: ExecutorState,
    simulation: Option<Simulation>,
}

impl DryRunExecutor {
    pub fn new(plan: Plan, dry_run: bool) -> Self {
        Self {
            plan,
            notes: Vec::new(),
            dry_run,
            state: ExecutorState::Idle,
            simulation: None,
        }
    }

    /// Extra lines for the simulation that have no plan step.
    pub fn with_notes(mut self, notes: Vec<String>) -> Self {
        self.notes = notes;
        self
    }

    pub fn state(&self) -> ExecutorState {
        self.state
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    /// Builds the simulation. Touches neither disk nor network.
    pub fn simulate(&mut self) -> Result<&Simulation, ExecutorError> {
        self.transition(ExecutorState::Simulated)?;
        let simulation = self.simulation.insert(Simulation::of(&self.plan, &self.notes));
        Ok(&*simulation)
    }

    /// Marks the simulation as shown and waiting for an answer.
    pub fn request_confirmation(&mut self) -> Result<&Simulation, ExecutorError> {
        self.transition(ExecutorState::AwaitingConfirmation)?;
        let (plan, notes) = (&self.plan, &self.notes);
        let simulation = self
            .simulation
            .get_or_insert_with(|| Simulation::of(plan, notes));
        Ok(&*simulation)
    }

    /// Declines the plan.
    pub fn decline(&mut self) -> Result<(), ExecutorError> {
        self.transition(ExecutorState::Aborted)?;
        info!("Plan declined; nothing was changed");
        Ok(())
    }

    /// Performs every step. Failures are reported to `observer` and the
    /// remaining steps still run.
    pub async fn execute(
        &mut self,
        ctx: &ExecutionContext,
        observer: &mut dyn ExecutionObserver,
    ) -> Result<ExecutionReport, ExecutorError> {
        self.transition(ExecutorState::Executed)?;

        let steps = self.plan.steps();
        let mut run = Run {
            steps,
            succeeded: vec![false; self.plan.len()],
            report: ExecutionReport::default(),
            observer,
        };

        let applier = ActionApplier::new();
        for (index, step) in steps.iter().enumerate() {
            let kind = step.action.kind();
            if kind.is_network() || kind.is_asset() {
                continue;
            }
            let result = match run.unmet_dependency(step) {
                Some(err) => Err(err),
                None => apply_fs(&applier, &step.action).await,
            };
            run.record(index, result);
        }

        let downloads = run.spawn_pool(ctx.network_workers, |action| {
            let PlannedAction::Download(job) = action else {
                return None;
            };
            let job = job.clone();
            let downloader = Arc::clone(&ctx.downloader);
            let retry = ctx.retry;
            Some(async move { apply_download(downloader.as_ref(), &job, retry).await })
        });
        run.collect(downloads).await;

        let renders = run.spawn_pool(ctx.asset_workers, |action| {
            let PlannedAction::CreateAsset { kind, dst } = action else {
                return None;
            };
            let request = AssetRequest {
                kind: *kind,
                destination: dst.clone(),
                duration_secs: ctx.asset_settings.duration_secs,
                resolution: ctx.asset_settings.resolution.clone(),
                overwrite: ctx.asset_settings.overwrite,
            };
            let assets = Arc::clone(&ctx.assets);
            Some(async move { apply_asset(assets.as_ref(), &request).await })
        });
        run.collect(renders).await;

        let report = run.report;
        info!(
            "Executed plan: {} applied ({} already done), {} failed",
            report.applied_total(),
            report.already_done,
            report.failed_total()
        );
        Ok(report)
    }

    /// Drives the whole lifecycle. With dry-run off the plan executes
    /// directly; otherwise `confirmer` decides.
    pub async fn run(
        mut self,
        confirmer: &dyn Confirmer,
        ctx: &ExecutionContext,
        observer: &mut dyn ExecutionObserver,
    ) -> Result<ExecutionOutcome, ExecutorError> {
        if self.dry_run {
            self.simulate()?;
            let simulation = self.request_confirmation()?.clone();
            if !confirmer.confirm(&simulation).await {
                self.decline()?;
                return Ok(ExecutionOutcome::Aborted { simulation });
            }
            let report = self.execute(ctx, observer).await?;
            Ok(ExecutionOutcome::Executed { simulation, report })
        } else {
            let simulation = Simulation::of(&self.plan, &self.notes);
            let report = self.execute(ctx, observer).await?;
            Ok(ExecutionOutcome::Executed { simulation, report })
        }
    }

    fn transition(&mut self, to: ExecutorState) -> Result<(), ExecutorError> {
        if !self.state.can_transition_to(to, self.dry_run) {
            return Err(ExecutorError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        debug!("Executor {} -> {}", self.state, to);
        self.state = to;
        Ok(())
    }
}

// =============================================================================
// Step execution
// =============================================================================

type StepResult = Result<AppliedStep, ActionError>;

struct Run<'a, 'o> {
    steps: &'a [PlanStep],
    succeeded: Vec<bool>,
    report: ExecutionReport,
    observer: &'o mut dyn ExecutionObserver,
}

impl Run<'_, '_> {
    fn unmet_dependency(&self, step: &PlanStep) -> Option<ActionError> {
        let dep = step.depends_on?;
        (!self.succeeded.get(dep).copied().unwrap_or(false))
            .then_some(ActionError::DependencyFailed { step: dep })
    }

    /// Spawns every step `make` accepts on a pool of `workers` tasks.
    /// Steps with an unmet dependency are recorded as failed right away.
    fn spawn_pool<F, Fut>(
        &mut self,
        workers: usize,
        mut make: F,
    ) -> Vec<(usize, JoinHandle<StepResult>)>
    where
        F: FnMut(&PlannedAction) -> Option<Fut>,
        Fut: std::future::Future<Output = StepResult> + Send + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(workers.max(1)));
        let mut handles = Vec::new();
        let steps = self.steps;
        for (index, step) in steps.iter().enumerate() {
            let Some(work) = make(&step.action) else {
                continue;
            };
            if let Some(err) = self.unmet_dependency(step) {
                self.record(index, Err(err));
                continue;
            }
            let semaphore = Arc::clone(&semaphore);
            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                work.await
            });
            handles.push((index, handle));
        }
        handles
    }

    async fn collect(&mut self, handles: Vec<(usize, JoinHandle<StepResult>)>) {
        for (index, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(ActionError::Interrupted {
                    reason: e.to_string(),
                }),
            };
            self.record(index, result);
        }
    }

    fn record(&mut self, index: usize, result: StepResult) {
        let steps = self.steps;
        let step = &steps[index];
        let kind = step.action.kind();
        match result {
            Ok(applied) => {
                self.succeeded[index] = true;
                *self.report.applied.entry(kind).or_insert(0) += 1;
                if applied.already_done {
                    self.report.already_done += 1;
                }
                self.observer.on_applied(index, step, &applied);
            }
            Err(err) => {
                if matches!(err, ActionError::DependencyFailed { .. }) {
                    self.report.dependency_skipped += 1;
                    debug!("Skipping step {} ({}): {}", index, step.action, err);
                } else {
                    warn!("Step {} failed ({}): {}", index, step.action, err);
                }
                *self.report.failed.entry(kind).or_insert(0) += 1;
                self.observer.on_failed(index, step, &err);
            }
        }
    }
}

async fn apply_fs(applier: &ActionApplier, action: &PlannedAction) -> StepResult {
    match action {
        PlannedAction::Rename { src, dst } | PlannedAction::Move { src, dst } => {
            applier.relocate(src, dst).await
        }
        PlannedAction::Delete { path } => applier.delete(path).await,
        // Catalog-only; the observer commits it.
        PlannedAction::Forget { .. } => Ok(AppliedStep::done(None)),
        PlannedAction::Download(_) | PlannedAction::CreateAsset { .. } => {
            Err(ActionError::Interrupted {
                reason: format!("{} scheduled outside its pool", action.kind()),
            })
        }
    }
}

async fn apply_download(
    downloader: &dyn TrailerDownloader,
    job: &DownloadJob,
    retry: RetryPolicy,
) -> StepResult {
    if let Some(existing) = find_trailer(&job.dest_dir) {
        debug!("Trailer already present: {}", existing.display());
        return Ok(AppliedStep::already_done(Some(existing)));
    }
    ensure_dir(&job.dest_dir).await?;

    let what = format!("Download of {} trailer", job.title);
    let file = retry
        .run_if(&what, || downloader.download(job), DownloadError::is_retryable)
        .await?;
    info!("Downloaded trailer for {} to {}", job.title, file.path.display());
    Ok(AppliedStep::done(Some(file.path)))
}

async fn apply_asset(assets: &dyn AssetGenerator, request: &AssetRequest) -> StepResult {
    if !request.overwrite && path_exists(&request.destination).await {
        return Ok(AppliedStep::already_done(Some(request.destination.clone())));
    }
    if let Some(parent) = request.destination.parent() {
        ensure_dir(parent).await?;
    }
    assets.generate(request).await?;
    debug!("Created {} {}", request.kind, request.destination.display());
    Ok(AppliedStep::done(Some(request.destination.clone())))
}

async fn ensure_dir(dir: &Path) -> Result<(), ActionError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| ActionError::io(dir, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{AssetKind, MovieId};
    use crate::executor::AutoConfirm;
    use crate::testing::{MockAssetGenerator, MockDownloader};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn context(downloader: Arc<MockDownloader>, assets: Arc<MockAssetGenerator>) -> ExecutionContext {
        ExecutionContext {
            downloader,
            assets,
            network_workers: 2,
            asset_workers: 1,
            asset_settings: AssetSettings {
                duration_secs: 1,
                resolution: "1920x1080".to_string(),
                overwrite: false,
            },
            retry: RetryPolicy::default(),
        }
    }

    fn mocks() -> (Arc<MockDownloader>, Arc<MockAssetGenerator>) {
        (Arc::new(MockDownloader::new()), Arc::new(MockAssetGenerator::new()))
    }

    #[derive(Default)]
    struct Recorder {
        applied: Vec<usize>,
        failed: Vec<(usize, String)>,
    }

    impl ExecutionObserver for Recorder {
        fn on_applied(&mut self, index: usize, _step: &PlanStep, _applied: &AppliedStep) {
            self.applied.push(index);
        }

        fn on_failed(&mut self, index: usize, _step: &PlanStep, error: &ActionError) {
            self.failed.push((index, error.to_string()));
        }
    }

    fn move_plan(dir: &Path) -> (Plan, PathBuf, PathBuf) {
        let src = dir.join("The.Matrix.1999.mkv");
        let dst = dir.join("The Matrix (1999)/The Matrix (1999).mkv");
        std::fs::write(&src, b"movie").unwrap();
        let mut plan = Plan::new();
        plan.push(PlannedAction::Move {
            src: src.clone(),
            dst: dst.clone(),
        });
        (plan, src, dst)
    }

    #[tokio::test]
    async fn test_declined_plan_changes_nothing() {
        let dir = TempDir::new().unwrap();
        let (plan, src, dst) = move_plan(dir.path());
        let (downloader, assets) = mocks();
        let ctx = context(downloader, assets);

        let outcome = DryRunExecutor::new(plan, true)
            .run(&AutoConfirm(false), &ctx, &mut NoopObserver)
            .await
            .unwrap();

        assert!(!outcome.is_executed());
        assert_eq!(outcome.simulation().total(), 1);
        assert!(src.exists());
        assert!(!dst.exists());
    }

    #[tokio::test]
    async fn test_confirmed_plan_executes() {
        let dir = TempDir::new().unwrap();
        let (plan, src, dst) = move_plan(dir.path());
        let (downloader, assets) = mocks();
        let ctx = context(downloader, assets);

        let mut recorder = Recorder::default();
        let outcome = DryRunExecutor::new(plan, true)
            .run(&AutoConfirm(true), &ctx, &mut recorder)
            .await
            .unwrap();

        let report = outcome.report().unwrap();
        assert_eq!(report.applied.get(&ActionKind::Move), Some(&1));
        assert!(report.is_clean());
        assert_eq!(recorder.applied, vec![0]);
        assert!(!src.exists());
        assert!(dst.exists());
    }

    #[tokio::test]
    async fn test_state_machine_rejects_skipping_confirmation() {
        let mut executor = DryRunExecutor::new(Plan::new(), true);
        let (downloader, assets) = mocks();
        let ctx = context(downloader, assets);

        executor.simulate().unwrap();
        assert_eq!(executor.state(), ExecutorState::Simulated);
        let err = executor.execute(&ctx, &mut NoopObserver).await.unwrap_err();
        assert!(matches!(
            err,
            ExecutorError::InvalidTransition {
                from: ExecutorState::Simulated,
                to: ExecutorState::Executed
            }
        ));

        executor.request_confirmation().unwrap();
        executor.decline().unwrap();
        assert_eq!(executor.state(), ExecutorState::Aborted);
        assert!(executor.decline().is_err());
    }

    #[tokio::test]
    async fn test_without_dry_run_executes_directly() {
        let dir = TempDir::new().unwrap();
        let (plan, _src, dst) = move_plan(dir.path());
        let (downloader, assets) = mocks();
        let ctx = context(downloader, assets);

        let mut executor = DryRunExecutor::new(plan, false);
        let report = executor.execute(&ctx, &mut NoopObserver).await.unwrap();
        assert_eq!(report.applied_total(), 1);
        assert_eq!(executor.state(), ExecutorState::Executed);
        assert!(dst.exists());
    }

    #[tokio::test]
    async fn test_failed_step_skips_dependents_but_not_others() {
        let dir = TempDir::new().unwrap();
        let mut plan = Plan::new();
        let missing = plan.push(PlannedAction::Move {
            src: dir.path().join("gone.mkv"),
            dst: dir.path().join("Gone (2000)/Gone (2000).mkv"),
        });
        plan.push_after(
            PlannedAction::Delete {
                path: dir.path().join("old-folder"),
            },
            missing,
        );
        let stray = dir.path().join("stray");
        std::fs::create_dir(&stray).unwrap();
        plan.push(PlannedAction::Delete {
            path: stray.clone(),
        });

        let (downloader, assets) = mocks();
        let ctx = context(downloader, assets);
        let mut recorder = Recorder::default();
        let report = DryRunExecutor::new(plan, false)
            .execute(&ctx, &mut recorder)
            .await
            .unwrap();

        assert_eq!(report.failed_total(), 2);
        assert_eq!(report.dependency_skipped, 1);
        assert_eq!(recorder.applied, vec![2]);
        assert_eq!(recorder.failed[0].0, 0);
        assert!(recorder.failed[1].1.contains("Depends on step 0"));
        assert!(!stray.exists());
    }

    #[tokio::test]
    async fn test_downloads_then_assets_in_plan_order() {
        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("Dune Part Two (2024)");
        let mut plan = Plan::new();
        let download = plan.push(PlannedAction::Download(DownloadJob {
            id: MovieId(693134),
            title: "Dune Part Two".to_string(),
            video_url: "https://www.youtube.com/watch?v=abc".to_string(),
            dest_dir: folder.clone(),
            file_stem: "Dune Part Two (2024)-trailer".to_string(),
        }));
        plan.push_after(
            PlannedAction::CreateAsset {
                kind: AssetKind::Placeholder,
                dst: folder.join("Dune Part Two (2024).mp4"),
            },
            download,
        );
        plan.push_after(
            PlannedAction::CreateAsset {
                kind: AssetKind::Backdrop,
                dst: folder.join("backdrop.jpg"),
            },
            download,
        );

        let (downloader, assets) = mocks();
        let ctx = context(Arc::clone(&downloader), Arc::clone(&assets));
        let mut recorder = Recorder::default();
        let report = DryRunExecutor::new(plan.clone(), false)
            .execute(&ctx, &mut recorder)
            .await
            .unwrap();

        assert!(report.is_clean());
        assert_eq!(recorder.applied, vec![0, 1, 2]);
        assert!(folder.join("Dune Part Two (2024)-trailer.mp4").exists());
        assert!(folder.join("backdrop.jpg").exists());
        assert_eq!(downloader.recorded_jobs().await.len(), 1);
        assert_eq!(assets.recorded_requests().await.len(), 2);

        // Re-running finds everything in place.
        let report = DryRunExecutor::new(plan, false)
            .execute(&ctx, &mut NoopObserver)
            .await
            .unwrap();
        assert_eq!(report.already_done, 3);
        assert_eq!(downloader.recorded_jobs().await.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_download_skips_its_assets() {
        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("Lost (2025)");
        let url = "https://www.youtube.com/watch?v=gone".to_string();
        let mut plan = Plan::new();
        let download = plan.push(PlannedAction::Download(DownloadJob {
            id: MovieId(1),
            title: "Lost".to_string(),
            video_url: url.clone(),
            dest_dir: folder.clone(),
            file_stem: "Lost (2025)-trailer".to_string(),
        }));
        plan.push_after(
            PlannedAction::CreateAsset {
                kind: AssetKind::Backdrop,
                dst: folder.join("backdrop.jpg"),
            },
            download,
        );

        let (downloader, assets) = mocks();
        downloader.fail_video(&url).await;
        let ctx = context(Arc::clone(&downloader), Arc::clone(&assets));
        let report = DryRunExecutor::new(plan, false)
            .execute(&ctx, &mut NoopObserver)
            .await
            .unwrap();

        assert_eq!(report.failed.get(&ActionKind::Download), Some(&1));
        assert_eq!(report.dependency_skipped, 1);
        // One attempt plus one retry.
        assert_eq!(downloader.recorded_jobs().await.len(), 2);
        assert!(assets.recorded_requests().await.is_empty());
    }
}
