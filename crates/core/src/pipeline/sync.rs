//! The sync operation: reconcile upcoming trailers with the library.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::commit::{CommitPolicy, Committer};
use super::types::{Operation, PipelineError, RunOptions, RunReport, SkipList};
use super::{persist_all, relative_to, Reconciler};
use crate::catalog::{AssetKind, CatalogStore, MovieId};
use crate::executor::AppliedStep;
use crate::library::{empty_folders, find_trailer, trailer_path};
use crate::planner::{Plan, PlanStep, PlannedAction, StoreScope};

impl Reconciler {
    /// Moves trailers of movies that reached the library, retires entries
    /// whose files vanished and removes empty folders.
    pub async fn sync(&self, options: &RunOptions) -> Result<RunReport, PipelineError> {
        let library_root = self.config.library.root.clone();
        let trailers_root = self.config.library.trailers_root.clone();
        let library = self.library_store();
        let trailers = self.trailers_store();
        let mut plan = Plan::new();
        let mut moved = HashMap::new();
        let mut deleted = HashSet::new();

        let vanished: BTreeSet<MovieId> = library
            .all()
            .into_iter()
            .filter(|entry| !library_root.join(&entry.path).exists())
            .map(|entry| {
                debug!("Library file {} vanished", entry.path.display());
                entry.id
            })
            .collect();

        for upcoming in trailers.all() {
            let folder = trailers_root.join(upcoming.folder());
            let forget = PlannedAction::Forget {
                scope: StoreScope::Trailers,
                id: upcoming.id,
            };

            if !folder.exists() {
                debug!("Upcoming folder {} vanished", folder.display());
                plan.push(forget);
                continue;
            }
            // The upcoming trailer stays put until the movie is really there.
            if vanished.contains(&upcoming.id) {
                continue;
            }
            let Some(owned) = library.find(upcoming.id) else {
                continue;
            };

            let library_folder = library_root.join(owned.folder());
            let wants_trailer =
                !owned.has_asset(AssetKind::Trailer) && find_trailer(&library_folder).is_none();

            let remove_folder = PlannedAction::Delete {
                path: folder.clone(),
            };
            let delete = match find_trailer(&folder).filter(|_| wants_trailer) {
                Some(trailer) => {
                    let extension = trailer
                        .extension()
                        .map(|e| e.to_string_lossy().to_string())
                        .unwrap_or_default();
                    let index = plan.push(PlannedAction::Move {
                        src: trailer,
                        dst: trailer_path(&library_folder, &extension),
                    });
                    moved.insert(index, owned.id);
                    plan.push_after(remove_folder, index)
                }
                None => plan.push(remove_folder),
            };
            deleted.insert(folder);
            plan.push_after(forget, delete);
        }

        for id in vanished {
            plan.push(PlannedAction::Forget {
                scope: StoreScope::Library,
                id,
            });
        }

        for root in [&library_root, &trailers_root] {
            for folder in empty_folders(root) {
                if !deleted.contains(&folder) {
                    plan.push(PlannedAction::Delete { path: folder });
                }
            }
        }

        let policy = SyncCommit {
            library: &library,
            trailers: &trailers,
            library_root: &library_root,
            moved,
        };
        let mut committer = Committer::new(
            policy,
            vec![&library, &trailers],
            self.config.catalog.persist_every,
        );
        let outcome = self.execute_plan(plan, Vec::new(), options, &mut committer).await?;
        let mut skips = SkipList::new();
        skips.extend(committer.into_skips());

        if outcome.may_write {
            persist_all(&[&library, &trailers])?;
        }

        Ok(outcome.into_report(Operation::Sync, skips))
    }
}

struct SyncCommit<'a> {
    library: &'a CatalogStore,
    trailers: &'a CatalogStore,
    library_root: &'a Path,
    /// Trailer moves, by step, to the library entry receiving them.
    moved: HashMap<usize, MovieId>,
}

impl CommitPolicy for SyncCommit<'_> {
    fn applied(&mut self, index: usize, step: &PlanStep, applied: &AppliedStep) {
        match &step.action {
            PlannedAction::Forget { scope, id } => {
                let store = match scope {
                    StoreScope::Library => self.library,
                    StoreScope::Trailers => self.trailers,
                };
                store.retire(*id);
            }
            PlannedAction::Move { .. } => {
                let Some(id) = self.moved.remove(&index) else {
                    return;
                };
                let Some(dst) = applied.produced.as_deref() else {
                    return;
                };
                let rel: PathBuf =
                    relative_to(self.library_root, dst).unwrap_or_else(|| dst.to_path_buf());
                if let Err(e) = self.library.update(id, |entry| {
                    entry.assets.insert(AssetKind::Trailer, rel);
                }) {
                    warn!("Could not record moved trailer of {}: {}", id, e);
                }
            }
            _ => {}
        }
    }
}
