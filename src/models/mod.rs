pub mod feed;
pub mod photo;

pub use feed::{FeedMode, FeedSnapshot, RequestKey, SessionScope};
pub use photo::{Photo, PhotoAuthor, PhotoLinks, PhotoUrls, SearchEnvelope};
