// src/host/dispatcher.rs
//! Process-wide event dispatch with explicit subscriptions

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Fan-out dispatcher with a subscriber list.
///
/// Hosts own one dispatcher per notification kind (navigation, clicks,
/// page transitions) and emit into it; capture instances subscribe on
/// `start()` and cancel the subscription on `stop()`.
pub struct Dispatcher<T> {
    subscribers: DashMap<u64, Callback<T>>,
    next_id: AtomicU64,
}

impl<T> Dispatcher<T> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            subscribers: DashMap::new(),
            next_id: AtomicU64::new(1),
        })
    }

    /// Register a callback, returning the handle that removes it.
    pub fn subscribe(
        self: &Arc<Self>,
        callback: impl Fn(&T) + Send + Sync + 'static,
    ) -> Subscription<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.insert(id, Arc::new(callback));
        Subscription {
            dispatcher: Arc::clone(self),
            id,
        }
    }

    /// Deliver one event to every current subscriber.
    pub fn emit(&self, event: &T) {
        // Snapshot first so a callback may subscribe or cancel without
        // holding shard locks.
        let callbacks: Vec<Callback<T>> = self
            .subscribers
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        for callback in callbacks {
            callback(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

/// Handle releasing one subscription.
pub struct Subscription<T> {
    dispatcher: Arc<Dispatcher<T>>,
    id: u64,
}

impl<T> Subscription<T> {
    /// Remove the callback from the dispatcher.
    pub fn cancel(self) {
        self.dispatcher.subscribers.remove(&self.id);
    }
}
