pub mod cache;
pub mod clock;
pub mod config;
pub mod cors;
pub mod feed;
pub mod history;
pub mod models;
pub mod source;
pub mod storage;

pub use cache::PageCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::AppConfig;
pub use feed::{FeedContext, FeedSession, FeedSettings, LoadOutcome, SessionRegistry};
pub use history::SearchHistory;
pub use models::{FeedMode, FeedSnapshot, Photo, RequestKey};
pub use source::{PhotoSource, SourceError, UnsplashClient};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
