use std::io::Cursor;

use rocket::http::{ContentType, Header, Status};
use rocket::response::{self, Responder, Response};
use rocket::{Request, State};

use picfeed::{FeedMode, FeedSnapshot, LoadOutcome, SearchHistory, SessionRegistry};

use crate::api::ApiError;

#[get("/<session>?<query>&<page>&<mode>")]
pub async fn load_feed(
    session: &str,
    query: Option<&str>,
    page: Option<u32>,
    mode: Option<&str>,
    registry: &State<SessionRegistry>,
    history: &State<SearchHistory>,
) -> Result<SnapshotResponse, ApiError> {
    let mode = match mode {
        Some(mode) => mode.parse::<FeedMode>().map_err(ApiError::InvalidRequest)?,
        None => FeedMode::infer(query),
    };
    let page = page.unwrap_or(1);

    // A settled search on its first page goes into the history
    if mode == FeedMode::Search && page == 1 {
        if let Some(term) = query {
            history.add(term).ok();
        }
    }

    let feed = registry.get_or_create(session);
    let outcome = feed.load(query, page, mode).await;
    log::debug!("Session {} load {:?}", session, outcome);

    Ok(SnapshotResponse {
        snapshot: feed.snapshot(),
        outcome: Some(outcome),
    })
}

#[post("/<session>/more")]
pub async fn load_more(
    session: &str,
    registry: &State<SessionRegistry>,
) -> Result<SnapshotResponse, ApiError> {
    let feed = registry
        .get(session)
        .ok_or_else(|| ApiError::SessionNotFound(session.to_string()))?;
    let outcome = feed.load_more().await;

    Ok(SnapshotResponse {
        snapshot: feed.snapshot(),
        outcome: Some(outcome),
    })
}

#[get("/<session>/snapshot")]
pub fn snapshot(session: &str, registry: &State<SessionRegistry>) -> Result<SnapshotResponse, ApiError> {
    let feed = registry
        .get(session)
        .ok_or_else(|| ApiError::SessionNotFound(session.to_string()))?;

    Ok(SnapshotResponse {
        snapshot: feed.snapshot(),
        outcome: None,
    })
}

#[delete("/<session>")]
pub fn close_session(session: &str, registry: &State<SessionRegistry>) -> Result<Status, ApiError> {
    if registry.close(session) {
        Ok(Status::NoContent)
    } else {
        Err(ApiError::SessionNotFound(session.to_string()))
    }
}

/// Session state is per consumer, so it is never cached by intermediaries.
pub struct SnapshotResponse {
    pub snapshot: FeedSnapshot,
    pub outcome: Option<LoadOutcome>,
}

impl<'r> Responder<'r, 'static> for SnapshotResponse {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let body = serde_json::to_vec(&self.snapshot).map_err(|e| {
            log::error!("Failed to serialize feed snapshot: {}", e);
            Status::InternalServerError
        })?;

        let mut response = Response::build();
        response.header(ContentType::JSON);
        response.header(Header::new("Cache-Control", "no-store"));
        if let Some(outcome) = self.outcome {
            response.header(Header::new("X-Feed-Outcome", outcome.as_str()));
        }
        response.sized_body(body.len(), Cursor::new(body));
        response.ok()
    }
}
