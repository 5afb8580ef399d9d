//! Movies with no fetchable trailer.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use tracing::debug;

use crate::catalog::MovieId;
use crate::storage::{read_json_or_default, write_json_atomic, StorageError};

/// Persistent set of identities whose trailer could not be fetched.
///
/// Consulted before any download. Grows on failures and only shrinks when
/// the user clears it.
#[derive(Debug)]
pub struct FailureCache {
    file: PathBuf,
    ids: RwLock<BTreeSet<MovieId>>,
}

impl FailureCache {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            ids: RwLock::new(BTreeSet::new()),
        }
    }

    /// Loads the set; a missing or corrupt file is an empty set.
    pub fn load(file: impl Into<PathBuf>) -> Self {
        let cache = Self::new(file);
        let ids: Vec<MovieId> = read_json_or_default(&cache.file, "Known failures");
        debug!("Loaded {} known failures", ids.len());
        *cache.ids.write().unwrap_or_else(PoisonError::into_inner) = ids.into_iter().collect();
        cache
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn contains(&self, id: MovieId) -> bool {
        self.ids
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&id)
    }

    /// Records a failure. Returns false if it was already known.
    pub fn record(&self, id: MovieId) -> bool {
        self.ids
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id)
    }

    /// Forgets every failure. Returns how many were removed.
    pub fn clear_all(&self) -> usize {
        let mut ids = self.ids.write().unwrap_or_else(PoisonError::into_inner);
        let count = ids.len();
        ids.clear();
        count
    }

    /// Forgets the given failures. Returns how many were actually known.
    pub fn clear(&self, targets: &[MovieId]) -> usize {
        let mut ids = self.ids.write().unwrap_or_else(PoisonError::into_inner);
        targets.iter().filter(|id| ids.remove(*id)).count()
    }

    pub fn ids(&self) -> Vec<MovieId> {
        self.ids
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .copied()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.ids.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes the set as a JSON list of ids.
    pub fn persist(&self) -> Result<(), StorageError> {
        let ids = self.ids();
        write_json_atomic(&self.file, &ids)
    }
}
