use std::sync::Arc;

use chrono::Duration;
use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::Notify;

use crate::cache::PageCache;
use crate::clock::Clock;
use crate::config::AppConfig;
use crate::feed::merge::merge;
use crate::models::{FeedMode, FeedSnapshot, Photo, RequestKey, SessionScope};
use crate::source::PhotoSource;

#[derive(Debug, Clone)]
pub struct FeedSettings {
    pub ttl: Duration,
    /// Page size requested from the API. A shorter page means the end was reached.
    pub per_page: u32,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::minutes(5),
            per_page: 20,
        }
    }
}

impl FeedSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            ttl: Duration::seconds(config.cache_ttl as i64),
            per_page: config.per_page.max(1),
        }
    }
}

/// Collaborators shared by every session: one cache, one API client, one clock.
#[derive(Clone)]
pub struct FeedContext {
    pub cache: Arc<PageCache>,
    pub source: Arc<dyn PhotoSource>,
    pub clock: Arc<dyn Clock>,
    pub settings: FeedSettings,
}

impl FeedContext {
    pub fn new(
        cache: Arc<PageCache>,
        source: Arc<dyn PhotoSource>,
        clock: Arc<dyn Clock>,
        settings: FeedSettings,
    ) -> Self {
        Self {
            cache,
            source,
            clock,
            settings,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchPhase {
    Idle,
    Loading,
    Success,
    Failed,
    Cancelled,
}

/// What a single `load` call ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Served from a fresh cache entry without touching the network.
    CacheHit { received: usize },
    Fetched { received: usize },
    /// The request failed; the error is exposed through the snapshot.
    Failed,
    /// Superseded by a newer request or by teardown. Nothing was applied.
    Cancelled,
    /// The same key is already being fetched for this session.
    AlreadyLoading,
    /// Nothing to fetch: a blank search, or no further page to load.
    Skipped,
}

impl LoadOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadOutcome::CacheHit { .. } => "cache-hit",
            LoadOutcome::Fetched { .. } => "fetched",
            LoadOutcome::Failed => "failed",
            LoadOutcome::Cancelled => "cancelled",
            LoadOutcome::AlreadyLoading => "already-loading",
            LoadOutcome::Skipped => "skipped",
        }
    }
}

#[derive(Clone)]
struct CancelSignal(Arc<Notify>);

impl CancelSignal {
    fn new() -> Self {
        Self(Arc::new(Notify::new()))
    }

    fn cancel(&self) {
        self.0.notify_one();
    }

    async fn cancelled(&self) {
        self.0.notified().await
    }
}

struct InFlight {
    key: RequestKey,
    signal: CancelSignal,
}

struct SessionState {
    scope: Option<SessionScope>,
    /// Last page applied for the current scope, 0 when nothing is loaded
    page: u32,
    items: Vec<Photo>,
    phase: FetchPhase,
    error: Option<String>,
    has_more: bool,
    generation: u64,
    in_flight: Option<InFlight>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            scope: None,
            page: 0,
            items: Vec::new(),
            phase: FetchPhase::Idle,
            error: None,
            has_more: true,
            generation: 0,
            in_flight: None,
        }
    }

    /// Invalidates whatever is in flight. A response carrying an older
    /// generation is dropped without being applied.
    fn supersede(&mut self) {
        self.generation += 1;
        if let Some(in_flight) = self.in_flight.take() {
            debug!("Cancelling in-flight request for {}", in_flight.key);
            in_flight.signal.cancel();
        }
    }

    fn reset(&mut self, scope: Option<SessionScope>) {
        self.supersede();
        self.scope = scope;
        self.page = 0;
        self.items.clear();
        self.phase = FetchPhase::Idle;
        self.error = None;
        self.has_more = true;
    }

    fn enter_scope(&mut self, scope: SessionScope) {
        if self.scope.as_ref() != Some(&scope) {
            self.reset(Some(scope));
        }
    }

    fn apply_page(&mut self, key: &RequestKey, page: &[Photo], per_page: u32) {
        self.items = merge(&self.items, page);
        self.page = key.page;
        self.has_more = page.len() >= per_page as usize;
        self.error = None;
        self.phase = FetchPhase::Success;
    }

    fn snapshot(&self) -> FeedSnapshot {
        FeedSnapshot {
            items: self.items.clone(),
            loading: self.in_flight.is_some(),
            error: self.error.clone(),
            has_more: self.has_more,
            page: self.page,
            mode: self.scope.as_ref().map(|s| s.mode),
            query: self.scope.as_ref().and_then(|s| s.query.clone()),
        }
    }
}

// Marks the load as cancelled if its future is dropped before completing.
struct LoadGuard<'a> {
    state: &'a Mutex<SessionState>,
    generation: u64,
    armed: bool,
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.state.lock();
        if state.generation == self.generation {
            state.in_flight = None;
            state.phase = FetchPhase::Cancelled;
        }
    }
}

/// Accumulates pages for one consumer.
///
/// Each request either comes from a fresh cache entry or from the network.
/// A session never has more than one request outstanding: starting a new one
/// cancels the previous request, and a response is only applied while its
/// generation is still the current one. Changing mode or query starts over
/// with an empty result set.
pub struct FeedSession {
    context: FeedContext,
    state: Mutex<SessionState>,
}

impl FeedSession {
    pub fn new(context: FeedContext) -> Self {
        Self {
            context,
            state: Mutex::new(SessionState::new()),
        }
    }

    pub async fn load(&self, query: Option<&str>, page: u32, mode: FeedMode) -> LoadOutcome {
        self.load_key(RequestKey::new(mode, query, page)).await
    }

    /// Requests the page after the last one applied, if the session is idle
    /// and more pages are expected.
    pub async fn load_more(&self) -> LoadOutcome {
        let key = {
            let state = self.state.lock();
            match &state.scope {
                Some(scope) if state.in_flight.is_none() && state.has_more => {
                    match state.page.checked_add(1) {
                        Some(next) => scope.key(next),
                        None => return LoadOutcome::Skipped,
                    }
                }
                _ => return LoadOutcome::Skipped,
            }
        };
        self.load_key(key).await
    }

    pub async fn load_key(&self, key: RequestKey) -> LoadOutcome {
        let settings = &self.context.settings;

        let (generation, signal) = {
            let mut state = self.state.lock();
            state.enter_scope(key.scope());

            if key.is_blank_search() {
                state.has_more = false;
                return LoadOutcome::Skipped;
            }

            if state.in_flight.as_ref().map(|f| &f.key) == Some(&key) {
                debug!("Request for {} already in flight", key);
                return LoadOutcome::AlreadyLoading;
            }

            let now = self.context.clock.now();
            match self.context.cache.get(&key) {
                Some(entry) if entry.is_fresh(now, settings.ttl) => {
                    debug!("Cache hit for {}", key);
                    state.supersede();
                    state.apply_page(&key, &entry.items, settings.per_page);
                    return LoadOutcome::CacheHit {
                        received: entry.items.len(),
                    };
                }
                Some(_) => debug!("Cache entry for {} is stale", key),
                None => debug!("Cache miss for {}", key),
            }

            state.supersede();
            let signal = CancelSignal::new();
            state.in_flight = Some(InFlight {
                key: key.clone(),
                signal: signal.clone(),
            });
            state.phase = FetchPhase::Loading;
            state.error = None;
            (state.generation, signal)
        };

        let mut guard = LoadGuard {
            state: &self.state,
            generation,
            armed: true,
        };
        let result = tokio::select! {
            result = self.context.source.fetch_page(&key, settings.per_page) => Some(result),
            _ = signal.cancelled() => None,
        };
        guard.armed = false;

        let mut state = self.state.lock();
        if state.generation != generation {
            debug!("Discarding response for superseded request {}", key);
            return LoadOutcome::Cancelled;
        }
        state.in_flight = None;

        match result {
            None => {
                state.phase = FetchPhase::Cancelled;
                LoadOutcome::Cancelled
            }
            Some(Ok(photos)) => {
                let received = photos.len();
                let entry = self.context.cache.put(key.clone(), photos, self.context.clock.now());
                state.apply_page(&key, &entry.items, settings.per_page);
                info!(
                    "Applied {} photos for {} ({} accumulated)",
                    received,
                    key,
                    state.items.len()
                );
                LoadOutcome::Fetched { received }
            }
            Some(Err(e)) => {
                warn!("Failed to load {}: {}", key, e);
                state.error = Some(e.to_string());
                state.phase = FetchPhase::Failed;
                LoadOutcome::Failed
            }
        }
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        self.state.lock().snapshot()
    }

    pub fn phase(&self) -> FetchPhase {
        self.state.lock().phase
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().in_flight.is_some()
    }

    pub fn has_more(&self) -> bool {
        self.state.lock().has_more
    }

    /// Tears the session down: cancels outstanding work and drops the
    /// accumulated results. Cached pages are kept.
    pub fn close(&self) {
        self.state.lock().reset(None);
    }
}

impl Drop for FeedSession {
    fn drop(&mut self) {
        self.state.get_mut().supersede();
    }
}
