//! Listener registry shared by the connection and the channel facade.
//!
//! Listeners are snapshotted before each emit so a listener may register,
//! remove, or tear down its owner while being invoked.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::identifiers::SubscriptionId;

// ============================================================================
// Types
// ============================================================================

/// Callback invoked with each emitted value.
pub type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

// ============================================================================
// ListenerSet
// ============================================================================

/// Set of listeners keyed by [`SubscriptionId`].
///
/// Listeners run in registration order.
pub(crate) struct ListenerSet<T> {
    /// Next ID to hand out.
    next_id: AtomicU64,
    /// Registered listeners.
    listeners: Mutex<FxHashMap<SubscriptionId, Listener<T>>>,
}

impl<T> Default for ListenerSet<T> {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            listeners: Mutex::new(FxHashMap::default()),
        }
    }
}

impl<T> ListenerSet<T> {
    /// Creates an empty set.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener and returns its ID.
    pub fn add(&self, listener: Listener<T>) -> SubscriptionId {
        let id = SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().insert(id, listener);
        id
    }

    /// Removes a listener. Returns `false` if it was not registered.
    pub fn remove(&self, id: SubscriptionId) -> bool {
        self.listeners.lock().remove(&id).is_some()
    }

    /// Removes every listener.
    pub fn clear(&self) {
        self.listeners.lock().clear();
    }

    /// Returns the number of registered listeners.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Returns `true` if no listener is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.lock().is_empty()
    }

    /// Invokes every listener with `value`.
    pub fn emit(&self, value: &T) {
        let mut snapshot: Vec<(SubscriptionId, Listener<T>)> = self
            .listeners
            .lock()
            .iter()
            .map(|(id, listener)| (*id, Arc::clone(listener)))
            .collect();
        snapshot.sort_unstable_by_key(|(id, _)| *id);

        for (_, listener) in snapshot {
            listener(value);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
