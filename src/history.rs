use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::warn;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::storage::{KeyValueStore, StorageError};

pub const HISTORY_STORAGE_KEY: &str = "photo_search_history_v1";
pub const DEFAULT_HISTORY_LIMIT: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHistoryEntry {
    pub term: String,
    pub timestamp: DateTime<Utc>,
}

/// Searched terms, most recent first, unique by term and capped in length.
///
/// The list lives in memory and is written through to the store on every
/// change. Storage failures are returned to the caller but never undo the
/// in-memory change.
pub struct SearchHistory {
    entries: RwLock<VecDeque<SearchHistoryEntry>>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    limit: usize,
}

impl SearchHistory {
    /// Loads persisted history; unreadable or malformed data starts empty.
    pub fn load(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, limit: usize) -> Self {
        let mut entries = match Self::read(store.as_ref()) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to read search history: {}", e);
                VecDeque::new()
            }
        };
        entries.truncate(limit);

        Self {
            entries: RwLock::new(entries),
            store,
            clock,
            limit,
        }
    }

    fn read(store: &dyn KeyValueStore) -> Result<VecDeque<SearchHistoryEntry>, StorageError> {
        match store.get(HISTORY_STORAGE_KEY)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(VecDeque::new()),
        }
    }

    fn write(&self, entries: &VecDeque<SearchHistoryEntry>) -> Result<(), StorageError> {
        let serialized = serde_json::to_string(entries)?;
        self.store.set(HISTORY_STORAGE_KEY, &serialized)
    }

    /// Moves `term` to the front, dropping the oldest entry past the limit.
    /// Blank terms are ignored.
    pub fn add(&self, term: &str) -> Result<(), StorageError> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(());
        }

        let mut entries = self.entries.write();
        entries.retain(|e| e.term != term);
        entries.push_front(SearchHistoryEntry {
            term: term.to_string(),
            timestamp: self.clock.now(),
        });
        entries.truncate(self.limit);

        self.write(&entries).map_err(|e| {
            warn!("Failed to save search history: {}", e);
            e
        })
    }

    pub fn remove(&self, term: &str) -> Result<bool, StorageError> {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|e| e.term != term.trim());
        if entries.len() == before {
            return Ok(false);
        }
        self.write(&entries)?;
        Ok(true)
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.entries.write().clear();
        self.store.remove(HISTORY_STORAGE_KEY)
    }

    pub fn entries(&self) -> Vec<SearchHistoryEntry> {
        self.entries.read().iter().cloned().collect()
    }

    pub fn recent(&self, count: usize) -> Vec<SearchHistoryEntry> {
        self.entries.read().iter().take(count).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::MemoryStore;

    fn history(store: Arc<MemoryStore>, clock: &ManualClock, limit: usize) -> SearchHistory {
        SearchHistory::load(store, Arc::new(clock.clone()), limit)
    }

    fn terms(history: &SearchHistory) -> Vec<String> {
        history.entries().into_iter().map(|e| e.term).collect()
    }

    #[test]
    fn test_readd_moves_to_front() {
        let clock = ManualClock::new(Utc::now());
        let history = history(Arc::new(MemoryStore::new()), &clock, DEFAULT_HISTORY_LIMIT);

        for term in ["c", "b", "a"] {
            history.add(term).unwrap();
        }
        assert_eq!(terms(&history), vec!["a", "b", "c"]);

        clock.advance(Duration::minutes(1));
        history.add("b").unwrap();

        assert_eq!(terms(&history), vec!["b", "a", "c"]);
        assert_eq!(history.entries()[0].timestamp, clock.now());
    }

    #[test]
    fn test_cap_drops_oldest() {
        let clock = ManualClock::new(Utc::now());
        let history = history(Arc::new(MemoryStore::new()), &clock, DEFAULT_HISTORY_LIMIT);

        for i in 0..200 {
            history.add(&format!("term-{}", i)).unwrap();
        }
        assert_eq!(history.len(), 200);

        history.add("newest").unwrap();

        let all = terms(&history);
        assert_eq!(all.len(), 200);
        assert_eq!(all[0], "newest");
        assert!(!all.contains(&"term-0".to_string()));
        assert_eq!(all[199], "term-1");
    }

    #[test]
    fn test_blank_and_padded_terms() {
        let clock = ManualClock::new(Utc::now());
        let history = history(Arc::new(MemoryStore::new()), &clock, 10);

        history.add("   ").unwrap();
        assert!(history.is_empty());

        history.add("  cats ").unwrap();
        history.add("cats").unwrap();
        assert_eq!(terms(&history), vec!["cats"]);
    }

    #[test]
    fn test_persists_across_instances() {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::new(Utc::now());
        {
            let history = history(store.clone(), &clock, 10);
            history.add("sea").unwrap();
            history.add("forest").unwrap();
        }

        let reloaded = history(store, &clock, 10);
        assert_eq!(terms(&reloaded), vec!["forest", "sea"]);
        assert_eq!(reloaded.recent(1).len(), 1);
    }

    #[test]
    fn test_malformed_storage_starts_empty() {
        let store = Arc::new(MemoryStore::new());
        store.set(HISTORY_STORAGE_KEY, "[{\"term\": 3}]").unwrap();

        let clock = ManualClock::new(Utc::now());
        assert!(history(store, &clock, 10).is_empty());
    }

    #[test]
    fn test_storage_failure_keeps_memory_state() {
        let store = Arc::new(MemoryStore::with_quota(8));
        let clock = ManualClock::new(Utc::now());
        let history = history(store, &clock, 10);

        let result = history.add("mountains");

        assert!(matches!(result, Err(StorageError::QuotaExceeded { .. })));
        assert_eq!(terms(&history), vec!["mountains"]);
    }

    #[test]
    fn test_remove_and_clear() {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::new(Utc::now());
        let history = history(store.clone(), &clock, 10);
        history.add("a").unwrap();
        history.add("b").unwrap();

        assert!(history.remove("a").unwrap());
        assert!(!history.remove("missing").unwrap());
        assert_eq!(terms(&history), vec!["b"]);

        history.clear().unwrap();
        assert!(history.is_empty());
        assert!(store.get(HISTORY_STORAGE_KEY).unwrap().is_none());
    }
}
