//! The generate-assets operation: placeholders and backdrops for folders
//! already in the trailers root.

use std::collections::HashMap;

use tracing::info;

use super::commit::Committer;
use super::fetch::AssetCommit;
use super::types::{Operation, PipelineError, RunOptions, RunReport, SkipCategory, SkipList};
use super::{persist_all, relative_to, Reconciler};
use crate::catalog::AssetKind;
use crate::library::{backdrop_path, movie_folders, placeholder_path};
use crate::planner::{Plan, PlannedAction};

/// Which assets generate-assets creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetOptions {
    pub placeholders: bool,
    pub backdrops: bool,
}

impl Default for AssetOptions {
    fn default() -> Self {
        Self {
            placeholders: true,
            backdrops: true,
        }
    }
}

impl Reconciler {
    /// Creates missing placeholders and backdrops in every folder of the
    /// trailers root. With `overwrite`, existing ones are rendered again.
    pub async fn generate_assets(
        &self,
        options: &RunOptions,
        assets: &AssetOptions,
    ) -> Result<RunReport, PipelineError> {
        let root = self.config.library.trailers_root.clone();
        let store = self.trailers_store();
        let mut skips = SkipList::new();

        let folders = match movie_folders(&root) {
            Ok(folders) => folders,
            Err(e) => {
                skips.skip(SkipCategory::PermissionError, &root, e.to_string());
                Vec::new()
            }
        };
        info!("Checking assets of {} folders in {}", folders.len(), root.display());

        let mut plan = Plan::new();
        let mut staged = HashMap::new();
        let mut planned_folders = 0;
        for folder in folders {
            let mut wanted = Vec::new();
            if assets.placeholders {
                wanted.push((AssetKind::Placeholder, placeholder_path(&folder)));
            }
            if assets.backdrops {
                wanted.push((AssetKind::Backdrop, backdrop_path(&folder)));
            }
            wanted.retain(|(_, dst)| options.overwrite || !dst.exists());
            if wanted.is_empty() {
                continue;
            }
            if options.limit_reached(planned_folders) {
                break;
            }
            planned_folders += 1;

            // Folders nobody catalogued still get their assets.
            let owner = relative_to(&root, &folder)
                .and_then(|rel| store.find_by_path(&rel))
                .map(|entry| entry.id);
            for (kind, dst) in wanted {
                let index = plan.push(PlannedAction::CreateAsset { kind, dst });
                if let Some(id) = owner {
                    staged.insert(index, (id, kind));
                }
            }
        }

        let policy = AssetCommit {
            store: &store,
            root: &root,
            failures: None,
            staged,
            new_entries: HashMap::new(),
            landed: Vec::new(),
        };
        let mut committer = Committer::new(policy, vec![&store], self.config.catalog.persist_every);
        let outcome = self.execute_plan(plan, Vec::new(), options, &mut committer).await?;
        skips.extend(committer.into_skips());

        if outcome.may_write {
            persist_all(&[&store])?;
        }

        Ok(outcome.into_report(Operation::GenerateAssets, skips))
    }
}
