//! The catalog operation: scan, parse, resolve, dedup, sanitize.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use super::commit::{CommitPolicy, Committer};
use super::types::{Operation, PipelineError, RunOptions, RunReport, SkipCategory, SkipList};
use super::{persist_all, relative_to, Reconciler};
use crate::catalog::{AssetKind, CatalogEntry, CatalogStore, InsertOutcome, MovieId};
use crate::executor::AppliedStep;
use crate::library::{canonical_movie_path, find_trailer, scan_videos};
use crate::parser::{FilenameParser, JunkVocabulary};
use crate::planner::{self, Plan, PlanStep, Resolution};
use crate::resolver::{IdentityResolver, MatchResult};

/// File names of `videos`, for junk learning.
pub(crate) fn video_names(videos: &[PathBuf]) -> Vec<String> {
    videos
        .iter()
        .filter_map(|p| p.file_name())
        .map(|n| n.to_string_lossy().to_string())
        .collect()
}

impl Reconciler {
    /// Catalogs the library: every uncatalogued video is parsed, resolved,
    /// deduplicated and moved into the canonical layout.
    pub async fn catalog(&self, options: &RunOptions) -> Result<RunReport, PipelineError> {
        let root = self.config.library.root.clone();
        let store = self.library_store();
        let mut skips = SkipList::new();

        let scan = scan_videos(&root, &self.config.library);
        for (folder, error) in &scan.unreadable {
            skips.skip(SkipCategory::PermissionError, folder, error.to_string());
        }
        let videos = scan.videos;
        let junk_file = self.junk_cache_file();
        let (junk, junk_learned) =
            JunkVocabulary::load_or_learn(&junk_file, video_names(&videos), false);
        let parser = FilenameParser::new().with_junk_words(junk.words());

        let mut parsed = Vec::new();
        for path in videos {
            let already_known = relative_to(&root, &path)
                .map(|rel| store.find_by_path(&rel).is_some())
                .unwrap_or(false);
            if already_known {
                continue;
            }
            if options.limit_reached(parsed.len()) {
                break;
            }

            let result = parser.parse(&path);
            match result.title_year() {
                Some((title, year)) => parsed.push((path.clone(), title.to_string(), year)),
                None => skips.skip(SkipCategory::Unparseable, &path, result.outcome.as_str()),
            }
        }
        info!("Resolving {} parsed files", parsed.len());

        let resolver = IdentityResolver::new(
            std::sync::Arc::clone(&self.catalog),
            self.config.resolver.clone(),
            self.retry_policy(),
        );
        let resolver = &resolver;
        let resolved: Vec<(PathBuf, MatchResult)> = stream::iter(parsed.into_iter().map(
            |(path, title, year)| async move {
                let result = resolver.resolve(&title, Some(year)).await;
                (path, result)
            },
        ))
        .buffered(self.config.workers.max_network_workers.max(1))
        .collect()
        .await;

        let mut plan = Plan::new();
        let mut staged = StagedEntries::default();
        let mut in_place = Vec::new();

        for (path, result) in resolved {
            let (id, title, year) = match result {
                MatchResult::Matched {
                    id, title, year, ..
                } => (MovieId(id), title, year),
                MatchResult::Ambiguous { candidates } => {
                    let names = candidates
                        .iter()
                        .map(|c| format!("{} [{}]", c.title, c.id))
                        .collect::<Vec<_>>()
                        .join(", ");
                    skips.skip(SkipCategory::Ambiguous, &path, names);
                    continue;
                }
                MatchResult::NotFound => {
                    skips.skip(SkipCategory::Unmatched, &path, "no matching movie");
                    continue;
                }
                MatchResult::TransientFailure { reason } => {
                    skips.skip(SkipCategory::TransientNetwork, &path, reason);
                    continue;
                }
            };

            let extension = path
                .extension()
                .map(|e| e.to_string_lossy().to_string())
                .unwrap_or_default();
            let canonical = canonical_movie_path(&title, year, &extension);

            if let Some(existing) = store.find(id) {
                let detail = format!("already catalogued as {}", existing.path.display());
                skips.skip(SkipCategory::Duplicate, &path, detail);
                continue;
            }
            if let Some(first) = staged.by_id.get(&id) {
                let detail = format!("same movie as {}, which sorts first", first.display());
                skips.skip(SkipCategory::Duplicate, &path, detail);
                continue;
            }
            if let Some(owner) = store.find_by_path(&canonical) {
                let detail = format!("{} already belongs to {}", canonical.display(), owner.id);
                skips.skip(SkipCategory::Duplicate, &path, detail);
                continue;
            }
            if !staged.paths.insert(canonical.clone()) {
                let detail = format!("{} is already planned", canonical.display());
                skips.skip(SkipCategory::Duplicate, &path, detail);
                continue;
            }
            staged.by_id.insert(id, path.clone());

            let entry = CatalogEntry::new(id, title.as_str(), year, canonical);
            let resolution = Resolution {
                title: &title,
                year,
            };
            match planner::plan(&root, &resolution, &path) {
                Some(action) => {
                    let index = plan.push(action);
                    staged.by_step.insert(index, entry);
                }
                None => in_place.push(entry),
            }
        }

        let notes = in_place
            .iter()
            .map(|e| format!("RECORD {} ({}) at {}", e.title, e.year, e.path.display()))
            .collect();

        let policy = CatalogCommit {
            store: &store,
            root: &root,
            staged: staged.by_step,
        };
        let mut committer = Committer::new(policy, vec![&store], self.config.catalog.persist_every);
        let outcome = self.execute_plan(plan, notes, options, &mut committer).await?;
        skips.extend(committer.into_skips());

        if outcome.may_write {
            for entry in in_place {
                commit_entry(&store, &root, entry);
            }
            persist_all(&[&store])?;
            if junk_learned {
                if let Err(e) = junk.persist(&junk_file) {
                    warn!("Could not cache junk words: {}", e);
                }
            }
        }

        Ok(outcome.into_report(Operation::Catalog, skips))
    }
}

#[derive(Default)]
struct StagedEntries {
    /// First file seen per identity. Videos are enumerated sorted by path,
    /// so the path that sorts first wins.
    by_id: HashMap<MovieId, PathBuf>,
    paths: HashSet<PathBuf>,
    /// Entry to insert once the step at this index is applied.
    by_step: HashMap<usize, CatalogEntry>,
}

struct CatalogCommit<'a> {
    store: &'a CatalogStore,
    root: &'a Path,
    staged: HashMap<usize, CatalogEntry>,
}

impl CommitPolicy for CatalogCommit<'_> {
    fn applied(&mut self, index: usize, _step: &PlanStep, _applied: &AppliedStep) {
        if let Some(entry) = self.staged.remove(&index) {
            commit_entry(self.store, self.root, entry);
        }
    }
}

/// Inserts `entry`, picking up a trailer already sitting in its folder.
fn commit_entry(store: &CatalogStore, root: &Path, mut entry: CatalogEntry) {
    if let Some(trailer) = find_trailer(&root.join(entry.folder())) {
        if let Some(rel) = relative_to(root, &trailer) {
            entry.assets.insert(AssetKind::Trailer, rel);
        }
    }
    match store.insert_if_absent(entry) {
        InsertOutcome::Inserted => {}
        InsertOutcome::DuplicateOf(existing) | InsertOutcome::PathTaken(existing) => {
            warn!("Catalog already holds {} at {}", existing.id, existing.path.display());
        }
    }
}
