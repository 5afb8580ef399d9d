//! Trailer operations: fetch-existing and fetch-upcoming.

use std::collections::{BTreeSet, HashMap};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::commit::{CommitPolicy, Committer};
use super::report::{export_movie_list, DownloadRecord};
use super::types::{
    Operation, PipelineError, RunOptions, RunReport, RunStatus, SkipCategory, SkipList,
    SkipRecord,
};
use super::{persist_all, relative_to, Reconciler};
use crate::cache::{FailureCache, TimedCache, MOVIES_CACHE_FILE};
use crate::catalog::{AssetKind, CatalogEntry, CatalogStore, InsertOutcome, MovieId};
use crate::downloader::DownloadJob;
use crate::executor::{ActionError, AppliedStep};
use crate::external_catalog::{ExternalCatalogError, MovieCandidate, MovieVideo};
use crate::library::{backdrop_path, find_trailer, folder_name, placeholder_path, TRAILER_SUFFIX};
use crate::planner::{Plan, PlanStep, PlannedAction};

/// Switches specific to fetch-upcoming.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpcomingOptions {
    /// Release years to discover; the configured range when `None`.
    pub years: Option<RangeInclusive<u32>>,
    /// Ignore cached discover results (they are still refreshed).
    pub no_cache: bool,
    /// Drop every cached discover result first.
    pub clear_cache: bool,
    /// Also dump the discovered movies as JSON here, dry-run or not.
    pub export_list: Option<PathBuf>,
}

/// Cache key of one discovered year.
fn discover_key(year: u32) -> String {
    format!("discover:{}", year)
}

/// `<Folder>-trailer`, the stem every downloaded trailer gets.
fn trailer_stem(folder: &Path) -> String {
    let name = folder
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    format!("{}{}", name, TRAILER_SUFFIX)
}

/// Records a per-movie skip both as a skip and as a missed download.
fn skip_download(skips: &mut SkipList, downloads: &mut Vec<DownloadRecord>, skip: SkipRecord) {
    downloads.push(DownloadRecord::from_skip(&skip));
    skips.push(skip);
}

/// Missed downloads recorded while planning, followed by the outcome of
/// every planned download.
fn download_records(
    mut records: Vec<DownloadRecord>,
    status: RunStatus,
    planned: &[PathBuf],
    landed: Vec<DownloadRecord>,
) -> Vec<DownloadRecord> {
    match status {
        RunStatus::Executed => records.extend(landed),
        RunStatus::Aborted => records.extend(
            planned
                .iter()
                .map(|folder| DownloadRecord::missed(folder, "not confirmed")),
        ),
        RunStatus::NothingToDo => {}
    }
    records
}

impl Reconciler {
    /// Downloads trailers for catalogued movies that have none.
    pub async fn fetch_existing(&self, options: &RunOptions) -> Result<RunReport, PipelineError> {
        let root = self.config.library.root.clone();
        let store = self.library_store();
        let failures = self.failure_cache();
        let mut skips = SkipList::new();
        let mut downloads = Vec::new();
        let mut found = Vec::new();
        let mut wanted = Vec::new();

        for entry in store.all() {
            if entry.has_asset(AssetKind::Trailer) {
                continue;
            }
            let folder = root.join(entry.folder());
            if let Some(trailer) = find_trailer(&folder) {
                found.push((entry.id, trailer));
                continue;
            }
            if !options.force && failures.contains(entry.id) {
                let skip = SkipRecord::new(SkipCategory::KnownFailure, &folder)
                    .with_detail("no trailer last time");
                skip_download(&mut skips, &mut downloads, skip);
                continue;
            }
            if options.limit_reached(wanted.len()) {
                break;
            }
            wanted.push(entry);
        }

        let lookups = self
            .lookup_trailers(wanted.iter().map(|e| e.id.0).collect())
            .await;

        let mut plan = Plan::new();
        let mut staged = HashMap::new();
        let mut planned = Vec::new();
        for (entry, lookup) in wanted.into_iter().zip(lookups) {
            let folder = root.join(entry.folder());
            let video_url = match usable_trailer(&failures, entry.id, &folder, lookup) {
                Ok(url) => url,
                Err(skip) => {
                    skip_download(&mut skips, &mut downloads, skip);
                    continue;
                }
            };
            planned.push(folder.clone());
            let index = plan.push(PlannedAction::Download(DownloadJob {
                id: entry.id,
                title: entry.title.clone(),
                video_url,
                file_stem: trailer_stem(&folder),
                dest_dir: folder,
            }));
            staged.insert(index, (entry.id, AssetKind::Trailer));
        }

        let notes = found
            .iter()
            .map(|(id, trailer)| format!("RECORD trailer of {} at {}", id, trailer.display()))
            .collect();

        let policy = AssetCommit {
            store: &store,
            root: &root,
            failures: Some(&failures),
            staged,
            new_entries: HashMap::new(),
            landed: Vec::new(),
        };
        let mut committer = Committer::new(policy, vec![&store], self.config.catalog.persist_every);
        let outcome = self.execute_plan(plan, notes, options, &mut committer).await?;
        let (policy, failed) = committer.into_parts();
        skips.extend(failed);
        let downloads = download_records(downloads, outcome.status, &planned, policy.landed);

        if outcome.may_write {
            for (id, trailer) in found {
                record_asset(&store, &root, id, AssetKind::Trailer, &trailer);
            }
            persist_all(&[&store])?;
            failures.persist()?;
        }

        Ok(outcome
            .into_report(Operation::FetchExisting, skips)
            .with_downloads(downloads))
    }

    /// Fetches trailers of upcoming movies into the trailers root, with a
    /// placeholder video and a backdrop next to each.
    pub async fn fetch_upcoming(
        &self,
        options: &RunOptions,
        upcoming: &UpcomingOptions,
    ) -> Result<RunReport, PipelineError> {
        let root = self.config.library.trailers_root.clone();
        let store = self.trailers_store();
        let library = self.library_store();
        let failures = self.failure_cache();
        let ttl = Duration::from_secs(self.config.cache.ttl_secs);
        let cache: TimedCache<Vec<MovieCandidate>> =
            TimedCache::load(self.cache_dir().join(MOVIES_CACHE_FILE), ttl);
        let mut skips = SkipList::new();
        let mut downloads = Vec::new();

        if upcoming.clear_cache {
            info!("Clearing {} cached discover results", cache.len());
            cache.clear();
        }

        let years = upcoming
            .years
            .clone()
            .unwrap_or(self.config.upcoming.start_year..=self.config.upcoming.end_year);

        let mut seen = BTreeSet::new();
        let mut discovered = Vec::new();
        let mut wanted = Vec::new();
        for year in years {
            let movies = match self.discover_year(&cache, year, upcoming.no_cache).await {
                Ok(movies) => movies,
                Err(e) => {
                    let detail = format!("discover {}: {}", year, e);
                    skips.skip(SkipCategory::TransientNetwork, &root, detail);
                    continue;
                }
            };

            for movie in movies {
                let Some(release_year) = movie.year() else {
                    debug!("Skipping '{}' without a release date", movie.title);
                    continue;
                };
                let id = MovieId(movie.id);
                if !seen.insert(id) {
                    continue;
                }
                discovered.push(movie.clone());
                let folder = root.join(folder_name(&movie.title, release_year));

                if library.contains(id) {
                    skips.skip(SkipCategory::Duplicate, &folder, "already in the library");
                    continue;
                }
                if !options.force && find_trailer(&folder).is_some() {
                    skips.skip(SkipCategory::Duplicate, &folder, "trailer already present");
                    continue;
                }
                if !options.force && failures.contains(id) {
                    let skip = SkipRecord::new(SkipCategory::KnownFailure, &folder)
                        .with_detail("no trailer last time");
                    skip_download(&mut skips, &mut downloads, skip);
                    continue;
                }
                if options.limit_reached(wanted.len()) {
                    break;
                }
                let entry = CatalogEntry::new(id, movie.title.as_str(), release_year, "");
                wanted.push((entry, folder));
            }
        }

        if let Some(path) = &upcoming.export_list {
            export_movie_list(path, &discovered)?;
        }

        let lookups = self
            .lookup_trailers(wanted.iter().map(|(e, _)| e.id.0).collect())
            .await;

        let mut plan = Plan::new();
        let mut staged = HashMap::new();
        let mut new_entries = HashMap::new();
        let mut planned = Vec::new();
        for ((mut entry, folder), lookup) in wanted.into_iter().zip(lookups) {
            let video_url = match usable_trailer(&failures, entry.id, &folder, lookup) {
                Ok(url) => url,
                Err(skip) => {
                    skip_download(&mut skips, &mut downloads, skip);
                    continue;
                }
            };
            planned.push(folder.clone());
            entry.path = relative_to(&root, &folder).unwrap_or_else(|| folder.clone());

            let download = plan.push(PlannedAction::Download(DownloadJob {
                id: entry.id,
                title: entry.title.clone(),
                video_url,
                file_stem: trailer_stem(&folder),
                dest_dir: folder.clone(),
            }));
            staged.insert(download, (entry.id, AssetKind::Trailer));

            if self.config.assets.create_placeholder {
                let index = plan.push_after(
                    PlannedAction::CreateAsset {
                        kind: AssetKind::Placeholder,
                        dst: placeholder_path(&folder),
                    },
                    download,
                );
                staged.insert(index, (entry.id, AssetKind::Placeholder));
            }
            if self.config.assets.create_backdrop {
                let index = plan.push_after(
                    PlannedAction::CreateAsset {
                        kind: AssetKind::Backdrop,
                        dst: backdrop_path(&folder),
                    },
                    download,
                );
                staged.insert(index, (entry.id, AssetKind::Backdrop));
            }
            new_entries.insert(entry.id, entry);
        }

        let policy = AssetCommit {
            store: &store,
            root: &root,
            failures: Some(&failures),
            staged,
            new_entries,
            landed: Vec::new(),
        };
        let mut committer = Committer::new(policy, vec![&store], self.config.catalog.persist_every);
        let outcome = self.execute_plan(plan, Vec::new(), options, &mut committer).await?;
        let (policy, failed) = committer.into_parts();
        skips.extend(failed);
        let downloads = download_records(downloads, outcome.status, &planned, policy.landed);

        if outcome.may_write {
            persist_all(&[&store])?;
            failures.persist()?;
            cache.persist()?;
        }

        Ok(outcome
            .into_report(Operation::FetchUpcoming, skips)
            .with_downloads(downloads))
    }

    /// Discover results of one year, from the cache when fresh.
    async fn discover_year(
        &self,
        cache: &TimedCache<Vec<MovieCandidate>>,
        year: u32,
        no_cache: bool,
    ) -> Result<Vec<MovieCandidate>, ExternalCatalogError> {
        let key = discover_key(year);
        if !no_cache {
            if let Some(movies) = cache.get(&key, Utc::now()) {
                debug!("Using cached discover results for {}", year);
                return Ok(movies);
            }
        }

        let retry = self.retry_policy();
        let filters = &self.config.upcoming.filters;
        let mut movies = Vec::new();
        for page in 1..=self.config.upcoming.pages_per_year.max(1) {
            let what = format!("Discover {} page {}", year, page);
            let results = retry
                .run_if(
                    &what,
                    || self.catalog.discover_movies(year, page, filters),
                    ExternalCatalogError::is_retryable,
                )
                .await?;
            if results.is_empty() {
                break;
            }
            movies.extend(results);
        }

        info!("Discovered {} movies for {}", movies.len(), year);
        cache.insert(key, movies.clone(), Utc::now());
        Ok(movies)
    }
}

/// The trailer URL to download, or why there is none. Movies without any
/// usable trailer are remembered in the failure cache.
fn usable_trailer(
    failures: &FailureCache,
    id: MovieId,
    folder: &Path,
    lookup: Result<Option<MovieVideo>, ExternalCatalogError>,
) -> Result<String, SkipRecord> {
    let skip = |category: SkipCategory, detail: String| -> Result<String, SkipRecord> {
        Err(SkipRecord::new(category, folder).with_detail(detail))
    };
    match lookup {
        Ok(Some(video)) => match video.url() {
            Some(url) => Ok(url),
            None => skip(
                SkipCategory::TrailerUnavailable,
                "trailer is not on YouTube".to_string(),
            ),
        },
        Ok(None) => {
            failures.record(id);
            skip(SkipCategory::TrailerUnavailable, "no trailer listed".to_string())
        }
        Err(e) if e.is_retryable() => skip(SkipCategory::TransientNetwork, e.to_string()),
        Err(ExternalCatalogError::NotFound(reason)) => {
            failures.record(id);
            let detail = format!("unknown to the metadata service: {}", reason);
            skip(SkipCategory::TrailerUnavailable, detail)
        }
        Err(e) => skip(SkipCategory::ActionFailed, e.to_string()),
    }
}

/// Records trailers and generated assets as their steps land, creating the
/// entry of an upcoming movie on its first applied step.
pub(super) struct AssetCommit<'a> {
    pub(super) store: &'a CatalogStore,
    pub(super) root: &'a Path,
    /// Where failed downloads are remembered.
    pub(super) failures: Option<&'a FailureCache>,
    pub(super) staged: HashMap<usize, (MovieId, AssetKind)>,
    pub(super) new_entries: HashMap<MovieId, CatalogEntry>,
    /// Outcome of every download step that ran.
    pub(super) landed: Vec<DownloadRecord>,
}

impl CommitPolicy for AssetCommit<'_> {
    fn applied(&mut self, index: usize, step: &PlanStep, applied: &AppliedStep) {
        if let PlannedAction::Download(job) = &step.action {
            self.landed.push(DownloadRecord::downloaded(&job.dest_dir));
        }
        let Some((id, kind)) = self.staged.remove(&index) else {
            return;
        };
        let Some(produced) = applied.produced.as_deref() else {
            return;
        };

        if let Some(entry) = self.new_entries.remove(&id) {
            match self.store.insert_if_absent(entry) {
                InsertOutcome::Inserted | InsertOutcome::DuplicateOf(_) => {}
                InsertOutcome::PathTaken(owner) => {
                    warn!("{} already belongs to {}", owner.path.display(), owner.id);
                    return;
                }
            }
        }
        record_asset(self.store, self.root, id, kind, produced);
    }

    fn failed(&mut self, index: usize, step: &PlanStep, error: &ActionError) {
        self.staged.remove(&index);
        let PlannedAction::Download(job) = &step.action else {
            return;
        };
        self.landed
            .push(DownloadRecord::missed(&job.dest_dir, error.to_string()));
        if let (ActionError::Download(e), Some(failures)) = (error, self.failures) {
            if e.is_video_unavailable() || e.is_retryable() {
                failures.record(job.id);
            }
        }
    }
}

pub(super) fn record_asset(
    store: &CatalogStore,
    root: &Path,
    id: MovieId,
    kind: AssetKind,
    path: &Path,
) {
    let rel: PathBuf = relative_to(root, path).unwrap_or_else(|| path.to_path_buf());
    let result = store.update(id, |entry| {
        entry.assets.insert(kind, rel);
        entry.last_verified = Utc::now();
    });
    if let Err(e) = result {
        warn!("Could not record {} of {}: {}", kind, id, e);
    }
}
