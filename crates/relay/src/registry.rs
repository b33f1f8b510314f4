//! Subscriber registry.
//!
//! Tracks the set of currently open subscriber connections. Uses DashMap so
//! registration, removal, and iteration are safe under concurrent access
//! without blocking locks.
//!
//! Invariant: a subscriber appears here iff it is between `Accepted` and
//! `Closed`.

use crate::error::{RelayError, Result};
use crate::subscriber::{Subscriber, SubscriberId};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

/// Lock-free set of connected subscribers, keyed by identity.
#[derive(Default)]
pub struct SubscriberRegistry {
    subscribers: DashMap<SubscriberId, Arc<Subscriber>>,
}

impl SubscriberRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            subscribers: DashMap::new(),
        }
    }

    /// Register a subscriber. Identity collisions should not occur under
    /// correct session creation; if one does, the attempt is rejected and
    /// existing members are untouched.
    pub fn register(&self, subscriber: Arc<Subscriber>) -> Result<SubscriberId> {
        let id = subscriber.id;
        match self.subscribers.entry(id) {
            Entry::Occupied(_) => Err(RelayError::DuplicateIdentity(id)),
            Entry::Vacant(entry) => {
                entry.insert(subscriber);
                Ok(id)
            }
        }
    }

    /// Remove a subscriber if present. Idempotent: returns `false` when the
    /// identity is absent, which supports double-close cleanup.
    pub fn deregister(&self, id: &SubscriberId) -> bool {
        self.subscribers.remove(id).is_some()
    }

    /// Look up a subscriber by identity.
    pub fn get(&self, id: &SubscriberId) -> Option<Arc<Subscriber>> {
        self.subscribers.get(id).map(|entry| entry.clone())
    }

    /// Current membership size.
    pub fn count(&self) -> usize {
        self.subscribers.len()
    }

    /// Visit a snapshot of current members. Tolerates concurrent add and
    /// remove; members changed mid-iteration are visited at most once.
    pub fn for_each(&self, mut visitor: impl FnMut(&Arc<Subscriber>)) {
        for entry in self.subscribers.iter() {
            visitor(entry.value());
        }
    }
}
