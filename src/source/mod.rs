mod unsplash;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Photo, RequestKey};

pub use unsplash::UnsplashClient;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Remote API error {status}")]
    Http { status: u16 },

    #[error("Rate limited by the remote API")]
    RateLimited,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Parsing error: {0}")]
    ParsingError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// The remote endpoint returning pages of photos.
#[async_trait]
pub trait PhotoSource: Send + Sync {
    async fn fetch_page(&self, key: &RequestKey, per_page: u32) -> Result<Vec<Photo>, SourceError>;
}
