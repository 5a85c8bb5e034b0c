//! Invalidation events and their subscribers

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;

// == Invalidation Event ==
/// Raised every time the caches are cleared on behalf of a file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvalidationEvent {
    /// The file that triggered the invalidation
    pub file_path: PathBuf,
    /// Why the caches were cleared
    pub reason: String,
    /// When the invalidation happened
    pub timestamp: DateTime<Utc>,
}

impl InvalidationEvent {
    pub fn new(file_path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            reason: reason.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn is_for(&self, path: &Path) -> bool {
        self.file_path == path
    }
}

/// Handle returned by a subscription, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub type InvalidationCallback = Arc<dyn Fn(&InvalidationEvent) + Send + Sync>;

// == Subscribers ==
/// Registered event callbacks.
///
/// Callbacks run on whichever thread performs the invalidation and are
/// invoked after the registry lock has been released, so a callback may
/// subscribe or unsubscribe.
#[derive(Default)]
pub(crate) struct Subscribers {
    next_id: AtomicU64,
    callbacks: RwLock<Vec<(SubscriptionId, InvalidationCallback)>>,
}

impl Subscribers {
    pub(crate) fn add(&self, callback: InvalidationCallback) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.callbacks.write().push((id, callback));
        id
    }

    pub(crate) fn remove(&self, id: SubscriptionId) -> bool {
        let mut callbacks = self.callbacks.write();
        let before = callbacks.len();
        callbacks.retain(|(existing, _)| *existing != id);
        callbacks.len() != before
    }

    pub(crate) fn publish(&self, event: &InvalidationEvent) {
        let callbacks: Vec<InvalidationCallback> = self
            .callbacks
            .read()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        for callback in callbacks {
            callback(event);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.callbacks.read().len()
    }
}

impl std::fmt::Debug for Subscribers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscribers")
            .field("count", &self.len())
            .finish()
    }
}

// == Event Log ==
/// Bounded history of the most recent invalidation events.
#[derive(Debug)]
pub struct EventLog {
    capacity: usize,
    events: Mutex<VecDeque<InvalidationEvent>>,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            events: Mutex::new(VecDeque::new()),
        }
    }

    /// Appends an event, dropping the oldest once full.
    pub fn record(&self, event: &InvalidationEvent) {
        let mut events = self.events.lock();
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event.clone());
    }

    /// Events oldest first.
    pub fn recent(&self) -> Vec<InvalidationEvent> {
        self.events.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}
