//! Listener registry: event kind → callbacks in registration order.

use std::collections::{BTreeMap, HashMap};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::error;

use wardlink_protocols::{EventFrame, EventKind};

/// Callback invoked with every decoded frame of a subscribed kind.
pub type Listener = Arc<dyn Fn(&EventFrame) + Send + Sync>;

/// Handle identifying one registered listener.
///
/// Stands in for callback identity: inserting under an existing id
/// replaces the previous listener, it never duplicates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

/// Registry mapping event kinds to listeners.
///
/// Listeners for one kind are kept in registration order (ordered by their
/// monotonically increasing ids); ordering across kinds is unspecified.
pub(crate) struct ListenerRegistry {
    inner: Mutex<HashMap<EventKind, BTreeMap<ListenerId, Listener>>>,
    next_id: AtomicU64,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Register a listener under a fresh id.
    pub fn add(&self, kind: EventKind, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.insert(kind, id, listener);
        id
    }

    /// Insert under an explicit id. Re-inserting an id replaces the
    /// previous listener in place.
    pub fn insert(&self, kind: EventKind, id: ListenerId, listener: Listener) {
        self.inner.lock().entry(kind).or_default().insert(id, listener);
    }

    /// Remove a listener. Unknown ids are a no-op.
    ///
    /// Returns whether a listener was actually removed.
    pub fn remove(&self, kind: EventKind, id: ListenerId) -> bool {
        let mut inner = self.inner.lock();
        match inner.get_mut(&kind) {
            Some(listeners) => listeners.remove(&id).is_some(),
            None => false,
        }
    }

    /// Drop every registration.
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Number of listeners registered for `kind`.
    pub fn len(&self, kind: EventKind) -> usize {
        self.inner.lock().get(&kind).map_or(0, BTreeMap::len)
    }

    /// Invoke every listener registered for the frame's kind.
    ///
    /// Listeners run outside the registry lock, in registration order. A
    /// panicking listener is logged and skipped; its siblings still run.
    pub fn dispatch(&self, frame: &EventFrame) {
        let listeners: Vec<Listener> = {
            let inner = self.inner.lock();
            match inner.get(&frame.kind) {
                Some(listeners) => listeners.values().cloned().collect(),
                None => return,
            }
        };

        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(frame))).is_err() {
                error!("Notification listener panicked for {:?}; skipping", frame.kind);
            }
        }
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
