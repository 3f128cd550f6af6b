//! The live set of subscribers.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use herald_core::SubscriberId;
use parking_lot::RwLock;

use crate::subscriber::Subscriber;

/// Concurrent registry of open push channels.
///
/// Every mutation happens under the write lock, so a [`snapshot`] sees
/// either the whole subscriber or nothing. No lock is held across an
/// `.await`.
///
/// [`snapshot`]: ConnectionRegistry::snapshot
pub struct ConnectionRegistry {
    entries: RwLock<HashMap<SubscriberId, Arc<Subscriber>>>,
    /// Mirrors `entries.len()` so count queries skip the lock.
    count: AtomicUsize,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            count: AtomicUsize::new(0),
        }
    }

    /// Register a subscriber and return its id.
    pub fn add(&self, subscriber: Subscriber) -> SubscriberId {
        let id = subscriber.id;
        let mut entries = self.entries.write();
        if entries.insert(id, Arc::new(subscriber)).is_none() {
            let _ = self.count.fetch_add(1, Ordering::Relaxed);
        }
        id
    }

    /// Register a subscriber unless `limit` entries are already present.
    ///
    /// The check and the insert happen under one lock, so concurrent calls
    /// cannot overshoot the limit.
    pub fn try_add(&self, subscriber: Subscriber, limit: usize) -> Option<SubscriberId> {
        let id = subscriber.id;
        let mut entries = self.entries.write();
        if entries.len() >= limit {
            return None;
        }
        if entries.insert(id, Arc::new(subscriber)).is_none() {
            let _ = self.count.fetch_add(1, Ordering::Relaxed);
        }
        Some(id)
    }

    /// Remove a subscriber. Returns `false` if it was not present.
    pub fn remove(&self, id: SubscriberId) -> bool {
        let mut entries = self.entries.write();
        if entries.remove(&id).is_some() {
            let _ = self.count.fetch_sub(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Point-in-time copy of every registered subscriber.
    pub fn snapshot(&self) -> Vec<Arc<Subscriber>> {
        self.entries.read().values().cloned().collect()
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: SubscriberId) -> bool {
        self.entries.read().contains_key(&id)
    }

    /// Number of registered subscribers.
    pub fn len(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }

    /// Whether no subscriber is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.write();
        let drained = entries.len();
        entries.clear();
        self.count.store(0, Ordering::Relaxed);
        drained
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
