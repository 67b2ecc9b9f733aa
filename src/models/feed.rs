use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::photo::Photo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedMode {
    Search,
    Popular,
}

impl FeedMode {
    /// A blank query lists popular photos, anything else is a text search.
    pub fn infer(query: Option<&str>) -> Self {
        match query {
            Some(q) if !q.trim().is_empty() => FeedMode::Search,
            _ => FeedMode::Popular,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FeedMode::Search => "search",
            FeedMode::Popular => "popular",
        }
    }
}

impl Display for FeedMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FeedMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "search" => Ok(FeedMode::Search),
            "popular" => Ok(FeedMode::Popular),
            other => Err(format!("Unsupported mode: {}", other)),
        }
    }
}

/// The (mode, query) pair a session accumulates pages for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionScope {
    pub mode: FeedMode,
    pub query: Option<String>,
}

impl SessionScope {
    pub fn key(&self, page: u32) -> RequestKey {
        RequestKey {
            mode: self.mode,
            query: self.query.clone(),
            page,
        }
    }
}

/// Identity of one page request, used both as cache key and in-flight key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestKey {
    pub mode: FeedMode,
    pub query: Option<String>,
    pub page: u32,
}

impl RequestKey {
    /// Builds a key with the query normalized: trimmed, and dropped entirely
    /// for popular mode or when blank. Page numbers start at 1.
    pub fn new(mode: FeedMode, query: Option<&str>, page: u32) -> Self {
        let query = match mode {
            FeedMode::Popular => None,
            FeedMode::Search => query
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .map(str::to_string),
        };

        Self {
            mode,
            query,
            page: page.max(1),
        }
    }

    pub fn search(query: &str, page: u32) -> Self {
        Self::new(FeedMode::Search, Some(query), page)
    }

    pub fn popular(page: u32) -> Self {
        Self::new(FeedMode::Popular, None, page)
    }

    pub fn scope(&self) -> SessionScope {
        SessionScope {
            mode: self.mode,
            query: self.query.clone(),
        }
    }

    /// Search mode without any text to search for.
    pub fn is_blank_search(&self) -> bool {
        self.mode == FeedMode::Search && self.query.is_none()
    }
}

impl Display for RequestKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:page:{}",
            self.mode,
            self.query.as_deref().unwrap_or("popular"),
            self.page
        )
    }
}

/// What a consumer of a session gets to render.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedSnapshot {
    pub items: Vec<Photo>,
    pub loading: bool,
    pub error: Option<String>,
    pub has_more: bool,
    pub page: u32,
    pub mode: Option<FeedMode>,
    pub query: Option<String>,
}
