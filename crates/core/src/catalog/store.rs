//! JSON-backed catalog store.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::types::{CatalogEntry, CatalogError, InsertOutcome, MovieId};
use crate::storage::{read_json, write_json_atomic};

const FORMAT_VERSION: u32 = 1;

/// On-disk layout: entries keyed by identity.
#[derive(Debug, Serialize, Deserialize)]
struct CatalogFile {
    version: u32,
    entries: BTreeMap<MovieId, CatalogEntry>,
}

#[derive(Debug, Default)]
struct StoreInner {
    entries: BTreeMap<MovieId, CatalogEntry>,
    by_path: HashMap<PathBuf, MovieId>,
    /// Changes since the last successful persist.
    pending: usize,
}

impl StoreInner {
    fn index(&mut self) {
        self.by_path = self
            .entries
            .values()
            .map(|e| (e.path.clone(), e.id))
            .collect();
    }
}

/// In-memory catalog backed by a JSON file.
///
/// The identity is the deduplication authority: at most one entry per
/// [`MovieId`], and at most one entry per relative path. Mutations go through
/// a single writer lock; readers get clones.
#[derive(Debug)]
pub struct CatalogStore {
    file: PathBuf,
    inner: RwLock<StoreInner>,
}

impl CatalogStore {
    /// Creates an empty store that will persist to `file`.
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            inner: RwLock::new(StoreInner::default()),
        }
    }

    /// Loads the store from `file`. A missing or unreadable file yields an
    /// empty store.
    pub fn load(file: impl Into<PathBuf>) -> Self {
        let store = Self::new(file);

        match read_json::<CatalogFile>(&store.file) {
            Ok(Some(data)) => {
                if data.version != FORMAT_VERSION {
                    warn!(
                        "Catalog {} has version {}, expected {}",
                        store.file.display(),
                        data.version,
                        FORMAT_VERSION
                    );
                }
                let mut inner = store.write();
                inner.entries = data.entries;
                inner.index();
                info!(
                    "Loaded {} catalog entries from {}",
                    inner.entries.len(),
                    store.file.display()
                );
            }
            Ok(None) => debug!("No catalog at {}, starting empty", store.file.display()),
            Err(e) => warn!("Catalog is unusable, starting empty: {}", e),
        }

        store
    }

    /// Where the store persists to.
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Inserts `entry` unless its identity or its path is already taken.
    pub fn insert_if_absent(&self, entry: CatalogEntry) -> InsertOutcome {
        let mut inner = self.write();

        if let Some(existing) = inner.entries.get(&entry.id) {
            return InsertOutcome::DuplicateOf(existing.clone());
        }
        if let Some(owner) = inner.by_path.get(&entry.path) {
            if let Some(existing) = inner.entries.get(owner) {
                return InsertOutcome::PathTaken(existing.clone());
            }
        }

        inner.by_path.insert(entry.path.clone(), entry.id);
        inner.entries.insert(entry.id, entry);
        inner.pending += 1;
        InsertOutcome::Inserted
    }

    pub fn find(&self, id: MovieId) -> Option<CatalogEntry> {
        self.read().entries.get(&id).cloned()
    }

    pub fn find_by_path(&self, path: &Path) -> Option<CatalogEntry> {
        let inner = self.read();
        inner
            .by_path
            .get(path)
            .and_then(|id| inner.entries.get(id))
            .cloned()
    }

    pub fn contains(&self, id: MovieId) -> bool {
        self.read().entries.contains_key(&id)
    }

    /// Applies `mutator` to the entry with `id`. The identity cannot change;
    /// a new path must not belong to another entry.
    pub fn update<F>(&self, id: MovieId, mutator: F) -> Result<CatalogEntry, CatalogError>
    where
        F: FnOnce(&mut CatalogEntry),
    {
        let mut inner = self.write();
        let current = inner
            .entries
            .get(&id)
            .cloned()
            .ok_or(CatalogError::NotFound(id))?;

        let mut updated = current.clone();
        mutator(&mut updated);
        updated.id = id;

        if updated.path != current.path {
            if let Some(owner) = inner.by_path.get(&updated.path) {
                if *owner != id {
                    return Err(CatalogError::PathConflict {
                        path: updated.path,
                        owner: *owner,
                    });
                }
            }
            inner.by_path.remove(&current.path);
            inner.by_path.insert(updated.path.clone(), id);
        }

        inner.entries.insert(id, updated.clone());
        inner.pending += 1;
        Ok(updated)
    }

    /// Removes an entry. Only called for explicit, confirmed removals.
    pub fn retire(&self, id: MovieId) -> Option<CatalogEntry> {
        let mut inner = self.write();
        let removed = inner.entries.remove(&id)?;
        inner.by_path.remove(&removed.path);
        inner.pending += 1;
        Some(removed)
    }

    /// All entries, ordered by identity.
    pub fn all(&self) -> Vec<CatalogEntry> {
        self.read().entries.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().entries.is_empty()
    }

    /// Changes not yet written to disk.
    pub fn pending_changes(&self) -> usize {
        self.read().pending
    }

    /// Writes the store atomically: temp file in the same directory, then
    /// rename over the target.
    pub fn persist(&self) -> Result<(), CatalogError> {
        // Hold the write lock so no change slips between snapshot and reset.
        let mut inner = self.write();
        let data = CatalogFile {
            version: FORMAT_VERSION,
            entries: inner.entries.clone(),
        };
        write_json_atomic(&self.file, &data)?;
        debug!(
            "Persisted {} entries to {}",
            data.entries.len(),
            self.file.display()
        );
        inner.pending = 0;
        Ok(())
    }

    /// Persists when at least `every` changes are pending.
    pub fn persist_if_due(&self, every: usize) -> Result<bool, CatalogError> {
        if self.pending_changes() < every.max(1) {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::AssetKind;
    use tempfile::TempDir;

    fn matrix() -> CatalogEntry {
        CatalogEntry::new(
            MovieId(603),
            "The Matrix",
            1999,
            "The Matrix (1999)/The Matrix (1999).mkv",
        )
    }

    #[test]
    fn test_insert_then_duplicate() {
        let dir = TempDir::new().unwrap();
        let store = CatalogStore::new(dir.path().join("library.json"));

        assert_eq!(store.insert_if_absent(matrix()), InsertOutcome::Inserted);

        let mut again = matrix();
        again.path = PathBuf::from("elsewhere/The Matrix.mkv");
        match store.insert_if_absent(again) {
            InsertOutcome::DuplicateOf(existing) => assert_eq!(existing.id, MovieId(603)),
            other => panic!("expected duplicate, got {:?}", other),
        }
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_path_taken_by_other_identity() {
        let dir = TempDir::new().unwrap();
        let store = CatalogStore::new(dir.path().join("library.json"));
        store.insert_if_absent(matrix());

        let mut impostor = matrix();
        impostor.id = MovieId(9999);
        assert!(matches!(
            store.insert_if_absent(impostor),
            InsertOutcome::PathTaken(_)
        ));
    }

    #[test]
    fn test_find_by_path_and_update() {
        let dir = TempDir::new().unwrap();
        let store = CatalogStore::new(dir.path().join("library.json"));
        store.insert_if_absent(matrix());

        let found = store
            .find_by_path(Path::new("The Matrix (1999)/The Matrix (1999).mkv"))
            .unwrap();
        assert_eq!(found.id, MovieId(603));

        store
            .update(MovieId(603), |e| {
                e.assets.insert(
                    AssetKind::Trailer,
                    PathBuf::from("The Matrix (1999)/The Matrix (1999)-trailer.mp4"),
                );
            })
            .unwrap();
        assert!(store.find(MovieId(603)).unwrap().has_asset(AssetKind::Trailer));

        assert!(matches!(
            store.update(MovieId(1), |_| {}),
            Err(CatalogError::NotFound(_))
        ));
    }

    #[test]
    fn test_update_path_conflict() {
        let dir = TempDir::new().unwrap();
        let store = CatalogStore::new(dir.path().join("library.json"));
        store.insert_if_absent(matrix());
        store.insert_if_absent(CatalogEntry::new(MovieId(949), "Heat", 1995, "Heat (1995)/Heat (1995).mkv"));

        let result = store.update(MovieId(949), |e| e.path = matrix().path);
        assert!(matches!(result, Err(CatalogError::PathConflict { .. })));
        assert_eq!(
            store.find(MovieId(949)).unwrap().path,
            PathBuf::from("Heat (1995)/Heat (1995).mkv")
        );
    }

    #[test]
    fn test_retire() {
        let dir = TempDir::new().unwrap();
        let store = CatalogStore::new(dir.path().join("library.json"));
        store.insert_if_absent(matrix());

        assert!(store.retire(MovieId(603)).is_some());
        assert!(store.retire(MovieId(603)).is_none());
        assert!(store.find_by_path(&matrix().path).is_none());
    }

    #[test]
    fn test_persist_and_load() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("library.json");
        let store = CatalogStore::new(&file);
        store.insert_if_absent(matrix());
        assert_eq!(store.pending_changes(), 1);
        store.persist().unwrap();
        assert_eq!(store.pending_changes(), 0);

        let loaded = CatalogStore::load(&file);
        assert_eq!(loaded.all(), store.all());
        assert!(loaded.find_by_path(&matrix().path).is_some());
    }

    #[test]
    fn test_truncated_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("library.json");
        let store = CatalogStore::new(&file);
        store.insert_if_absent(matrix());
        store.persist().unwrap();

        let bytes = std::fs::read(&file).unwrap();
        std::fs::write(&file, &bytes[..bytes.len() / 2]).unwrap();

        assert!(CatalogStore::load(&file).is_empty());
    }

    #[test]
    fn test_persist_if_due() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("library.json");
        let store = CatalogStore::new(&file);
        store.insert_if_absent(matrix());

        assert!(!store.persist_if_due(2).unwrap());
        assert!(!file.exists());

        store.insert_if_absent(CatalogEntry::new(MovieId(949), "Heat", 1995, "Heat (1995)/Heat (1995).mkv"));
        assert!(store.persist_if_due(2).unwrap());
        assert!(file.exists());
    }
}
