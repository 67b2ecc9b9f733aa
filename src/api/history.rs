use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use serde::Deserialize;

use picfeed::history::SearchHistoryEntry;
use picfeed::SearchHistory;

use crate::api::ApiError;

#[derive(Debug, Deserialize)]
pub struct NewTerm {
    pub term: String,
}

#[get("/?<limit>")]
pub fn list(limit: Option<usize>, history: &State<SearchHistory>) -> Json<Vec<SearchHistoryEntry>> {
    match limit {
        Some(limit) => Json(history.recent(limit)),
        None => Json(history.entries()),
    }
}

#[post("/", data = "<body>")]
pub fn add(body: Json<NewTerm>, history: &State<SearchHistory>) -> Result<Json<Vec<SearchHistoryEntry>>, ApiError> {
    if body.term.trim().is_empty() {
        return Err(ApiError::InvalidRequest("Search term must not be blank".to_string()));
    }
    // Storage problems only cost durability, the entry is kept in memory
    history.add(&body.term).ok();
    Ok(Json(history.entries()))
}

#[delete("/<term>")]
pub fn remove(term: &str, history: &State<SearchHistory>) -> Result<Status, ApiError> {
    match history.remove(term) {
        Ok(true) => Ok(Status::NoContent),
        Ok(false) => Err(ApiError::TermNotFound(term.to_string())),
        Err(e) => {
            log::warn!("Failed to persist history removal of '{}': {}", term, e);
            Ok(Status::NoContent)
        }
    }
}

#[delete("/")]
pub fn clear(history: &State<SearchHistory>) -> Status {
    if let Err(e) = history.clear() {
        log::warn!("Failed to clear persisted search history: {}", e);
    }
    Status::NoContent
}
