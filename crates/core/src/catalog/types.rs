//! Types for the movie catalog.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::storage::StorageError;

/// TMDB movie id, the identity used for deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MovieId(pub u32);

impl fmt::Display for MovieId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for MovieId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Files that can accompany a movie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Trailer,
    Placeholder,
    Backdrop,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trailer => "trailer",
            Self::Placeholder => "placeholder",
            Self::Backdrop => "backdrop",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One verified movie.
///
/// `path` is relative to the store's root. Library entries point at the
/// movie file (`Title (Year)/Title (Year).mkv`); upcoming entries point at
/// their folder. Asset paths are relative to the same root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: MovieId,
    pub title: String,
    pub year: u32,
    pub path: PathBuf,
    #[serde(default)]
    pub assets: BTreeMap<AssetKind, PathBuf>,
    pub last_verified: DateTime<Utc>,
}

impl CatalogEntry {
    pub fn new(id: MovieId, title: impl Into<String>, year: u32, path: impl Into<PathBuf>) -> Self {
        Self {
            id,
            title: title.into(),
            year,
            path: path.into(),
            assets: BTreeMap::new(),
            last_verified: Utc::now(),
        }
    }

    /// The movie's folder, relative to the store root.
    pub fn folder(&self) -> &Path {
        match self.path.components().next() {
            Some(first) => Path::new(first.as_os_str()),
            None => &self.path,
        }
    }

    pub fn asset(&self, kind: AssetKind) -> Option<&Path> {
        self.assets.get(&kind).map(PathBuf::as_path)
    }

    pub fn has_asset(&self, kind: AssetKind) -> bool {
        self.assets.contains_key(&kind)
    }
}

/// Result of [`super::CatalogStore::insert_if_absent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// An entry with the same identity already exists.
    DuplicateOf(CatalogEntry),
    /// A different identity already owns the canonical path.
    PathTaken(CatalogEntry),
}

/// Errors for catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Not found: {0}")]
    NotFound(MovieId),

    #[error("Path {path} already belongs to {owner}")]
    PathConflict { path: PathBuf, owner: MovieId },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_of_file_and_folder_entries() {
        let file = CatalogEntry::new(
            MovieId(603),
            "The Matrix",
            1999,
            "The Matrix (1999)/The Matrix (1999).mkv",
        );
        assert_eq!(file.folder(), Path::new("The Matrix (1999)"));

        let folder = CatalogEntry::new(MovieId(1), "Dune", 2021, "Dune (2021)");
        assert_eq!(folder.folder(), Path::new("Dune (2021)"));
    }

    #[test]
    fn test_asset_kind_serialization() {
        assert_eq!(
            serde_json::to_string(&AssetKind::Placeholder).unwrap(),
            "\"placeholder\""
        );
    }
}
