use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::models::{Photo, RequestKey};
use crate::storage::{KeyValueStore, StorageError};

pub const CACHE_STORAGE_KEY: &str = "photo_page_cache_v1";

/// One fetched page, stamped with when it was fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub key: RequestKey,
    pub items: Vec<Photo>,
    pub fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.fetched_at
    }

    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.age(now) < ttl
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub total: usize,
    pub fresh: usize,
    pub stale: usize,
    pub max_entries: Option<usize>,
    pub persistent: bool,
}

/// Page cache shared by every session.
///
/// The cache does not know about TTLs: stale entries stay until they are
/// overwritten, cleared, or pushed out by `max_entries`. Every write is
/// mirrored to the backing store. Once the store refuses a write the cache
/// stops persisting and keeps working from memory.
pub struct PageCache {
    entries: RwLock<HashMap<RequestKey, CacheEntry>>,
    store: Arc<dyn KeyValueStore>,
    max_entries: Option<usize>,
    degraded: AtomicBool,
}

impl PageCache {
    pub fn new(store: Arc<dyn KeyValueStore>, max_entries: Option<usize>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            store,
            max_entries,
            degraded: AtomicBool::new(false),
        }
    }

    /// Builds a cache pre-filled from the store. Unreadable or malformed data
    /// gives an empty cache.
    pub fn hydrate(store: Arc<dyn KeyValueStore>, max_entries: Option<usize>) -> Self {
        let cache = Self::new(store, max_entries);

        match cache.load_persisted() {
            Ok(loaded) => {
                info!("Hydrated page cache with {} entries", loaded.len());
                *cache.entries.write() = loaded;
            }
            Err(e) => {
                debug!("Ignoring persisted page cache: {}", e);
            }
        }

        cache
    }

    fn load_persisted(&self) -> Result<HashMap<RequestKey, CacheEntry>, StorageError> {
        let raw = match self.store.get(CACHE_STORAGE_KEY)? {
            Some(raw) => raw,
            None => return Ok(HashMap::new()),
        };

        let parsed: HashMap<String, CacheEntry> = serde_json::from_str(&raw)?;
        Ok(parsed
            .into_values()
            .map(|entry| (entry.key.clone(), entry))
            .collect())
    }

    pub fn get(&self, key: &RequestKey) -> Option<CacheEntry> {
        self.entries.read().get(key).cloned()
    }

    /// Inserts or replaces the page for `key` and persists the whole map.
    pub fn put(&self, key: RequestKey, items: Vec<Photo>, now: DateTime<Utc>) -> CacheEntry {
        let entry = CacheEntry {
            key: key.clone(),
            items,
            fetched_at: now,
        };

        {
            let mut entries = self.entries.write();
            entries.insert(key.clone(), entry.clone());
            if let Some(max) = self.max_entries {
                Self::evict_oldest(&mut entries, max, &key);
            }
        }

        if let Err(e) = self.persist() {
            warn!("Page cache persistence disabled for this session: {}", e);
        }

        entry
    }

    /// Drops the oldest entries past `max`, never the one in `keep`.
    fn evict_oldest(entries: &mut HashMap<RequestKey, CacheEntry>, max: usize, keep: &RequestKey) {
        if entries.len() <= max {
            return;
        }

        let mut by_age: Vec<_> = entries
            .values()
            .filter(|entry| &entry.key != keep)
            .map(|entry| (entry.fetched_at, entry.key.clone()))
            .collect();
        by_age.sort_by_key(|(fetched_at, _)| *fetched_at);

        let excess = entries.len() - max;
        for (_, key) in by_age.into_iter().take(excess) {
            entries.remove(&key);
        }
        debug!("Evicted {} page cache entries", excess);
    }

    /// Writes the full map to the store. Skipped once a write has failed.
    pub fn persist(&self) -> Result<(), StorageError> {
        if self.degraded.load(Ordering::Relaxed) {
            return Ok(());
        }

        let result = self.write_snapshot();
        if result.is_err() {
            self.degraded.store(true, Ordering::Relaxed);
        }
        result
    }

    fn write_snapshot(&self) -> Result<(), StorageError> {
        let serialized = {
            let entries = self.entries.read();
            let by_name: HashMap<String, &CacheEntry> = entries
                .iter()
                .map(|(key, entry)| (key.to_string(), entry))
                .collect();
            serde_json::to_string(&by_name)?
        };
        self.store.set(CACHE_STORAGE_KEY, &serialized)
    }

    pub fn is_persistent(&self) -> bool {
        !self.degraded.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
        if let Err(e) = self.store.remove(CACHE_STORAGE_KEY) {
            warn!("Failed to clear persisted page cache: {}", e);
        }
        info!("Page cache cleared");
    }

    pub fn stats(&self, now: DateTime<Utc>, ttl: Duration) -> CacheStats {
        let entries = self.entries.read();
        let fresh = entries.values().filter(|e| e.is_fresh(now, ttl)).count();

        CacheStats {
            total: entries.len(),
            fresh,
            stale: entries.len() - fresh,
            max_entries: self.max_entries,
            persistent: self.is_persistent(),
        }
    }
}
