pub mod cache;
mod error;
pub mod feed;
pub mod history;

pub use error::ApiError;
