//! Directory scanning.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::naming::is_trailer;
use crate::config::LibraryConfig;

/// Result of [`scan_videos`].
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// Candidate videos, sorted by path.
    pub videos: Vec<PathBuf>,
    /// Folders that exist but could not be listed.
    pub unreadable: Vec<(PathBuf, io::Error)>,
}

/// Video files in `root` and its direct subfolders.
///
/// Deeper folders (extras, featurettes) are not visited and trailer files
/// are skipped. A missing folder counts as empty.
pub fn scan_videos(root: &Path, library: &LibraryConfig) -> ScanOutcome {
    scan_with(root, library, read_entries)
}

fn scan_with<F>(root: &Path, library: &LibraryConfig, read: F) -> ScanOutcome
where
    F: Fn(&Path) -> io::Result<Vec<PathBuf>>,
{
    let mut outcome = ScanOutcome::default();
    let list = |dir: &Path, outcome: &mut ScanOutcome| match read(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
        Err(e) => {
            warn!("Cannot read {}: {}", dir.display(), e);
            outcome.unreadable.push((dir.to_path_buf(), e));
            Vec::new()
        }
    };

    for path in list(root, &mut outcome) {
        if path.is_dir() {
            let children = list(&path, &mut outcome);
            outcome.videos.extend(
                children
                    .into_iter()
                    .filter(|child| is_candidate_video(child, library)),
            );
        } else if is_candidate_video(&path, library) {
            outcome.videos.push(path);
        }
    }

    outcome.videos.sort();
    outcome.unreadable.sort_by(|a, b| a.0.cmp(&b.0));
    debug!(
        "Found {} videos under {} ({} unreadable folders)",
        outcome.videos.len(),
        root.display(),
        outcome.unreadable.len()
    );
    outcome
}

/// Visible subfolders of `root`, sorted. A missing `root` has none.
pub fn movie_folders(root: &Path) -> io::Result<Vec<PathBuf>> {
    let entries = match read_entries(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    let mut folders: Vec<PathBuf> = entries
        .into_iter()
        .filter(|path| path.is_dir())
        .filter(|path| {
            path.file_name()
                .map(|n| !n.to_string_lossy().starts_with('.'))
                .unwrap_or(false)
        })
        .collect();
    folders.sort();
    Ok(folders)
}

/// Folders under `root` that hold no files at any depth. Only the topmost
/// such folder of each empty subtree is returned; `root` itself never is.
pub fn empty_folders(root: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for path in list_dir(root) {
        if path.is_dir() {
            collect_empty(&path, &mut found);
        }
    }
    found.sort();
    found
}

/// Returns whether `dir` is empty at every depth, pushing the topmost empty
/// folders below it otherwise.
fn collect_empty(dir: &Path, found: &mut Vec<PathBuf>) -> bool {
    let entries = match read_entries(dir) {
        Ok(entries) => entries,
        Err(e) => {
            // Unlistable folders are never reported as empty.
            warn!("Cannot read {}: {}", dir.display(), e);
            return false;
        }
    };
    let mut below = Vec::new();
    let mut empty = true;

    for entry in entries {
        if entry.is_dir() {
            if !collect_empty(&entry, &mut below) {
                empty = false;
            }
        } else {
            empty = false;
        }
    }

    if empty {
        found.push(dir.to_path_buf());
    } else {
        found.extend(below);
    }
    empty
}

fn read_entries(dir: &Path) -> io::Result<Vec<PathBuf>> {
    Ok(std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect())
}

fn list_dir(dir: &Path) -> Vec<PathBuf> {
    match read_entries(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cannot read {}: {}", dir.display(), e);
            Vec::new()
        }
    }
}

fn is_candidate_video(path: &Path, library: &LibraryConfig) -> bool {
    if !path.is_file() {
        return false;
    }
    let is_video = path
        .extension()
        .map(|ext| library.is_video_extension(&ext.to_string_lossy()))
        .unwrap_or(false);
    is_video && !is_trailer(path)
}
