use std::collections::HashMap;

use parking_lot::RwLock;

use super::{KeyValueStore, StorageError};

/// Process-lifetime store. An optional byte quota makes it behave like a
/// browser store that can run out of room.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota: usize) -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
            quota: Some(quota),
        }
    }

    fn used_without(values: &HashMap<String, String>, key: &str) -> usize {
        values
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut values = self.values.write();

        if let Some(limit) = self.quota {
            let needed = Self::used_without(&values, key) + key.len() + value.len();
            if needed > limit {
                return Err(StorageError::QuotaExceeded { needed, limit });
            }
        }

        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.values.write().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let store = MemoryStore::new();
        assert!(store.get("k").unwrap().is_none());

        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));

        store.remove("k").unwrap();
        assert!(store.get("k").unwrap().is_none());
    }

    #[test]
    fn test_quota_counts_replaced_value_once() {
        let store = MemoryStore::with_quota(10);
        store.set("k", "12345").unwrap();
        // Overwriting the same key must not count the old value
        store.set("k", "123456789").unwrap();

        let err = store.set("k", "1234567890").unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { needed: 11, limit: 10 }));
        assert_eq!(store.get("k").unwrap().as_deref(), Some("123456789"));
    }
}
