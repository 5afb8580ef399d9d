//! Pipeline orchestration.
//!
//! The [`Reconciler`] drives the operations. Each one enumerates its
//! items, runs them through the per-item sub-pipeline, collects skips, and
//! hands a single [`Plan`] to the [`DryRunExecutor`]. Catalog changes are
//! committed by an observer as steps land; stores and caches are only
//! written once the plan was actually executed.

mod assets;
mod catalog;
mod commit;
mod fetch;
mod report;
mod sync;
mod types;

pub use assets::AssetOptions;
pub use fetch::UpcomingOptions;
pub use report::{export_movie_list, write_download_report, DownloadRecord};
pub use types::{
    Operation, PipelineError, RunOptions, RunReport, RunStatus, SkipCategory, SkipList,
    SkipRecord,
};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::info;

use crate::assets::AssetGenerator;
use crate::cache::{FailureCache, KNOWN_FAILURES_FILE};
use crate::catalog::{CatalogStore, MovieId, LIBRARY_CATALOG_FILE, TRAILERS_CATALOG_FILE};
use crate::config::Config;
use crate::downloader::TrailerDownloader;
use crate::executor::{
    AssetSettings, Confirmer, DryRunExecutor, ExecutionContext, ExecutionOutcome, Simulation,
};
use crate::external_catalog::{select_trailer, ExternalCatalogError, MovieCatalog, MovieVideo};
use crate::parser::JunkVocabulary;
use crate::planner::Plan;
use crate::retry::RetryPolicy;
use commit::{CommitPolicy, Committer};

/// Runs the reconciliation operations against one configured library.
pub struct Reconciler {
    config: Config,
    catalog: Arc<dyn MovieCatalog>,
    downloader: Arc<dyn TrailerDownloader>,
    assets: Arc<dyn AssetGenerator>,
    confirmer: Arc<dyn Confirmer>,
}

impl Reconciler {
    pub fn new(
        config: Config,
        catalog: Arc<dyn MovieCatalog>,
        downloader: Arc<dyn TrailerDownloader>,
        assets: Arc<dyn AssetGenerator>,
        confirmer: Arc<dyn Confirmer>,
    ) -> Self {
        Self {
            config,
            catalog,
            downloader,
            assets,
            confirmer,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Folder holding the caches. A relative `cache_dir` lives under the
    /// library root.
    pub fn cache_dir(&self) -> PathBuf {
        let dir = &self.config.library.cache_dir;
        if dir.is_absolute() {
            dir.clone()
        } else {
            self.config.library.root.join(dir)
        }
    }

    pub fn library_store(&self) -> CatalogStore {
        CatalogStore::load(self.config.library.root.join(LIBRARY_CATALOG_FILE))
    }

    pub fn trailers_store(&self) -> CatalogStore {
        CatalogStore::load(self.config.library.trailers_root.join(TRAILERS_CATALOG_FILE))
    }

    pub fn failure_cache(&self) -> FailureCache {
        FailureCache::load(self.cache_dir().join(KNOWN_FAILURES_FILE))
    }

    /// Removes ids from the failure cache (all of them when `ids` is empty)
    /// and writes it back. Returns how many were removed.
    pub fn clear_failures(&self, ids: &[MovieId]) -> Result<usize, PipelineError> {
        let failures = self.failure_cache();
        let removed = if ids.is_empty() {
            failures.clear_all()
        } else {
            failures.clear(ids)
        };
        failures.persist()?;
        info!("Cleared {} known failures", removed);
        Ok(removed)
    }

    /// Learns the junk vocabulary again from the library and caches it.
    pub fn rebuild_junk(&self) -> Result<JunkVocabulary, PipelineError> {
        let scan = crate::library::scan_videos(&self.config.library.root, &self.config.library);
        let names = catalog::video_names(&scan.videos);
        let (junk, _) = JunkVocabulary::load_or_learn(&self.junk_cache_file(), &names, true);
        junk.persist(&self.junk_cache_file())?;
        info!("Junk vocabulary rebuilt with {} words", junk.words().len());
        Ok(junk)
    }

    fn junk_cache_file(&self) -> PathBuf {
        self.cache_dir().join(crate::cache::JUNK_WORDS_FILE)
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from(&self.config.retry)
    }

    fn execution_context(&self, options: &RunOptions) -> ExecutionContext {
        ExecutionContext {
            downloader: Arc::clone(&self.downloader),
            assets: Arc::clone(&self.assets),
            network_workers: self.config.workers.max_network_workers,
            asset_workers: self.config.workers.max_asset_workers,
            asset_settings: AssetSettings::from_config(&self.config.assets, options.overwrite),
            retry: self.retry_policy(),
        }
    }

    /// Looks up the preferred trailer of each movie on the network pool.
    /// Results come back in input order.
    async fn lookup_trailers(
        &self,
        ids: Vec<u32>,
    ) -> Vec<Result<Option<MovieVideo>, ExternalCatalogError>> {
        let retry = self.retry_policy();
        let catalog = &self.catalog;
        stream::iter(ids.into_iter().map(|id| async move {
            retry
                .run_if(
                    &format!("Video lookup for movie {}", id),
                    || catalog.movie_videos(id),
                    ExternalCatalogError::is_retryable,
                )
                .await
                .map(|videos| select_trailer(&videos).cloned())
        }))
        .buffered(self.config.workers.max_network_workers.max(1))
        .collect()
        .await
    }

    /// Runs `plan` through the executor and reports how it ended.
    ///
    /// An empty plan skips confirmation; it counts as executed only when
    /// dry-run is off, so a dry run never writes anything.
    async fn execute_plan<P: CommitPolicy>(
        &self,
        plan: Plan,
        notes: Vec<String>,
        options: &RunOptions,
        committer: &mut Committer<'_, P>,
    ) -> Result<PlanOutcome, PipelineError> {
        if plan.is_empty() && notes.is_empty() {
            return Ok(PlanOutcome {
                simulation: Simulation::default(),
                status: RunStatus::NothingToDo,
                execution: None,
                may_write: !options.dry_run,
            });
        }

        let ctx = self.execution_context(options);
        let executor = DryRunExecutor::new(plan, options.dry_run).with_notes(notes);
        let outcome = executor
            .run(self.confirmer.as_ref(), &ctx, committer)
            .await?;

        Ok(match outcome {
            ExecutionOutcome::Executed { simulation, report } => PlanOutcome {
                simulation,
                status: RunStatus::Executed,
                execution: Some(report),
                may_write: true,
            },
            ExecutionOutcome::Aborted { simulation } => PlanOutcome {
                simulation,
                status: RunStatus::Aborted,
                execution: None,
                may_write: false,
            },
        })
    }
}

/// Internal result of [`Reconciler::execute_plan`].
struct PlanOutcome {
    simulation: Simulation,
    status: RunStatus,
    execution: Option<crate::executor::ExecutionReport>,
    /// Whether stores and caches may now be written.
    may_write: bool,
}

impl PlanOutcome {
    fn into_report(self, operation: Operation, skips: SkipList) -> RunReport {
        let report = RunReport {
            operation,
            status: self.status,
            simulation: self.simulation,
            execution: self.execution,
            skips: skips.into_records(),
            downloads: Vec::new(),
        };
        info!(
            "{} finished ({:?}): {}, {} skipped",
            operation,
            report.status,
            report.simulation.summary(),
            report.skips.len()
        );
        report
    }
}

/// Path of `path` relative to `root`, if it lies under it.
pub(crate) fn relative_to(root: &Path, path: &Path) -> Option<PathBuf> {
    path.strip_prefix(root).ok().map(Path::to_path_buf)
}

/// Writes every store in `stores`.
fn persist_all(stores: &[&CatalogStore]) -> Result<(), PipelineError> {
    for store in stores {
        store.persist()?;
    }
    Ok(())
}
