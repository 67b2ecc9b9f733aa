mod page;

pub use page::{CacheEntry, CacheStats, PageCache, CACHE_STORAGE_KEY};
