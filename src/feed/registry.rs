use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use log::info;
use parking_lot::RwLock;

use super::session::{FeedContext, FeedSession};

struct SessionSlot {
    session: Arc<FeedSession>,
    last_access: DateTime<Utc>,
}

/// Hands out one session per consumer id. All sessions share the context,
/// and therefore the page cache.
///
/// With an idle timeout set, sessions nobody touched for that long are
/// closed and forgotten the next time a session is opened.
pub struct SessionRegistry {
    context: FeedContext,
    idle_timeout: Option<Duration>,
    sessions: RwLock<HashMap<String, SessionSlot>>,
}

impl SessionRegistry {
    pub fn new(context: FeedContext) -> Self {
        Self {
            context,
            idle_timeout: None,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = Some(idle_timeout);
        self
    }

    pub fn context(&self) -> &FeedContext {
        &self.context
    }

    pub fn get(&self, id: &str) -> Option<Arc<FeedSession>> {
        let now = self.context.clock.now();
        self.sessions.write().get_mut(id).map(|slot| {
            slot.last_access = now;
            slot.session.clone()
        })
    }

    pub fn get_or_create(&self, id: &str) -> Arc<FeedSession> {
        self.evict_idle();
        if let Some(session) = self.get(id) {
            return session;
        }

        let now = self.context.clock.now();
        self.sessions
            .write()
            .entry(id.to_string())
            .or_insert_with(|| {
                info!("Opened feed session {}", id);
                SessionSlot {
                    session: Arc::new(FeedSession::new(self.context.clone())),
                    last_access: now,
                }
            })
            .session
            .clone()
    }

    /// Closes sessions idle for longer than the timeout. Sessions with a
    /// load in flight are kept. Returns how many were closed.
    pub fn evict_idle(&self) -> usize {
        let Some(idle_timeout) = self.idle_timeout else {
            return 0;
        };
        let now = self.context.clock.now();

        let evicted: Vec<(String, Arc<FeedSession>)> = {
            let mut sessions = self.sessions.write();
            let expired: Vec<String> = sessions
                .iter()
                .filter(|(_, slot)| now - slot.last_access > idle_timeout && !slot.session.is_loading())
                .map(|(id, _)| id.clone())
                .collect();
            expired
                .into_iter()
                .filter_map(|id| sessions.remove(&id).map(|slot| (id, slot.session)))
                .collect()
        };

        for (id, session) in &evicted {
            session.close();
            info!("Closed idle feed session {}", id);
        }
        evicted.len()
    }

    /// Tears the session down and forgets it.
    pub fn close(&self, id: &str) -> bool {
        let removed = self.sessions.write().remove(id);
        match removed {
            Some(slot) => {
                slot.session.close();
                info!("Closed feed session {}", id);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}
