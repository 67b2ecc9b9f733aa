mod file;
mod memory;

use thiserror::Error;

pub use file::FileStore;
pub use memory::MemoryStore;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Storage quota exceeded: {needed} bytes needed, {limit} allowed")]
    QuotaExceeded { needed: usize, limit: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Text key/value store used for anything that should outlive one request:
/// the page cache (session scoped) and the search history (cross session).
///
/// Every operation is fallible. Callers treat storage as best effort and keep
/// working from memory when it fails.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
