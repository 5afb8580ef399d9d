//! Action planning.
//!
//! Turns a resolved identity and a file's current location into the
//! filesystem action that brings it into the canonical layout. Planning is
//! pure: nothing here touches the disk.

mod types;

pub use types::{ActionKind, Plan, PlanStep, PlannedAction, StoreScope};

use std::path::{Path, PathBuf};

use crate::library::canonical_movie_path;

/// A resolved movie identity, as far as naming is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution<'a> {
    pub title: &'a str,
    pub year: u32,
}

/// Canonical path of `current` under `root`, keeping its extension.
pub fn canonical_destination(root: &Path, resolution: &Resolution<'_>, current: &Path) -> PathBuf {
    let extension = current
        .extension()
        .map(|e| e.to_string_lossy().to_string())
        .unwrap_or_default();
    root.join(canonical_movie_path(
        resolution.title,
        resolution.year,
        &extension,
    ))
}

/// The action that moves `current` to its canonical place under `root`:
/// `Rename` when the folder stays the same, `Move` when it changes, `None`
/// when the file is already canonical.
pub fn plan(root: &Path, resolution: &Resolution<'_>, current: &Path) -> Option<PlannedAction> {
    let dst = canonical_destination(root, resolution, current);
    if dst == current {
        return None;
    }

    let src = current.to_path_buf();
    if dst.parent() == current.parent() {
        Some(PlannedAction::Rename { src, dst })
    } else {
        Some(PlannedAction::Move { src, dst })
    }
}
