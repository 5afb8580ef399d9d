//! Query cache with a time-to-live.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::storage::{read_json_or_default, write_json_atomic, StorageError};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedValue<V> {
    fetched_at: DateTime<Utc>,
    value: V,
}

/// Results keyed by query string. An entry older than the TTL is treated as
/// absent.
#[derive(Debug)]
pub struct TimedCache<V> {
    file: PathBuf,
    ttl: Duration,
    entries: RwLock<BTreeMap<String, CachedValue<V>>>,
}

impl<V> TimedCache<V>
where
    V: Clone + Serialize + DeserializeOwned,
{
    /// An empty cache persisting to `file`.
    pub fn new(file: impl Into<PathBuf>, ttl: std::time::Duration) -> Self {
        Self {
            file: file.into(),
            ttl: to_chrono(ttl),
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Loads the cache from `file`; missing or corrupt files give an empty
    /// cache.
    pub fn load(file: impl Into<PathBuf>, ttl: std::time::Duration) -> Self {
        let cache = Self::new(file, ttl);
        let entries: BTreeMap<String, CachedValue<V>> =
            read_json_or_default(&cache.file, "Query cache");
        debug!(
            "Loaded {} cached queries from {}",
            entries.len(),
            cache.file.display()
        );
        *cache.entries.write().unwrap_or_else(PoisonError::into_inner) = entries;
        cache
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    /// The cached value for `key`, unless it is older than the TTL at `now`.
    pub fn get(&self, key: &str, now: DateTime<Utc>) -> Option<V> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let cached = entries.get(key)?;
        if now - cached.fetched_at > self.ttl {
            debug!("Cached '{}' is stale", key);
            return None;
        }
        Some(cached.value.clone())
    }

    pub fn insert(&self, key: impl Into<String>, value: V, fetched_at: DateTime<Utc>) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), CachedValue { fetched_at, value });
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes the cache, stale entries included.
    pub fn persist(&self) -> Result<(), StorageError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        write_json_atomic(&self.file, &*entries)
    }
}

fn to_chrono(ttl: std::time::Duration) -> Duration {
    Duration::from_std(ttl).unwrap_or_else(|_| Duration::days(365 * 100))
}
