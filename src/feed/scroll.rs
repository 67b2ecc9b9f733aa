use log::debug;

use crate::models::FeedSnapshot;

/// Host hook that reports when a sentinel becomes visible. In a browser this
/// is an `IntersectionObserver`; the host calls
/// [`ScrollTrigger::on_intersection`] when it fires.
pub trait IntersectionObserver {
    fn observe(&mut self, sentinel: &str);

    fn disconnect(&mut self);
}

/// Calls `load_more` when the last rendered item scrolls into view.
///
/// Only one sentinel is observed at a time. The previous observation is
/// always disconnected before a new one starts, and nothing is observed
/// while the trigger is disabled.
pub struct ScrollTrigger<O: IntersectionObserver, F: FnMut()> {
    observer: O,
    load_more: F,
    sentinel: Option<String>,
    enabled: bool,
    observing: bool,
}

impl<O: IntersectionObserver, F: FnMut()> ScrollTrigger<O, F> {
    pub fn new(observer: O, load_more: F) -> Self {
        Self {
            observer,
            load_more,
            sentinel: None,
            enabled: true,
            observing: false,
        }
    }

    pub fn set_sentinel(&mut self, sentinel: Option<&str>) {
        if self.sentinel.as_deref() == sentinel && self.observing == self.should_observe() {
            return;
        }
        self.sentinel = sentinel.map(str::to_string);
        self.rebind();
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            self.enabled = enabled;
            self.rebind();
        }
    }

    /// Follows a session snapshot: the last item is the sentinel, and the
    /// trigger is off while loading or once the feed is exhausted.
    pub fn sync(&mut self, snapshot: &FeedSnapshot) {
        self.set_enabled(!snapshot.loading && snapshot.has_more);
        self.set_sentinel(snapshot.items.last().map(|p| p.id.as_str()));
    }

    /// Returns whether `load_more` was called.
    pub fn on_intersection(&mut self, sentinel: &str, intersecting: bool) -> bool {
        if !intersecting || !self.observing || self.sentinel.as_deref() != Some(sentinel) {
            return false;
        }
        debug!("Sentinel {} visible, loading more", sentinel);
        (self.load_more)();
        true
    }

    pub fn observed(&self) -> Option<&str> {
        if self.observing {
            self.sentinel.as_deref()
        } else {
            None
        }
    }

    /// Stops observing for good. Called on drop.
    pub fn release(&mut self) {
        self.disconnect();
        self.sentinel = None;
    }

    fn should_observe(&self) -> bool {
        self.enabled && self.sentinel.is_some()
    }

    fn disconnect(&mut self) {
        if self.observing {
            self.observer.disconnect();
            self.observing = false;
        }
    }

    fn rebind(&mut self) {
        self.disconnect();
        if !self.enabled {
            return;
        }
        if let Some(sentinel) = &self.sentinel {
            self.observer.observe(sentinel);
            self.observing = true;
        }
    }
}

impl<O: IntersectionObserver, F: FnMut()> Drop for ScrollTrigger<O, F> {
    fn drop(&mut self) {
        self.release();
    }
}
