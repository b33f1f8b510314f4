//! Relay coordinator: one per logical channel.
//!
//! A `Relay` owns exactly one latest-value cache and one subscriber
//! registry and mediates every interaction between sessions and the two of
//! them, so there is a single source of truth per channel. Accepting
//! connections, ingesting pushes, and querying the subscriber count are all
//! safe to invoke concurrently.

use crate::cache::LatestValue;
use crate::error::Result;
use crate::registry::SubscriberRegistry;
use crate::session::Session;
use crate::subscriber::{Subscriber, SubscriberId, SUBSCRIBER_CHANNEL_BUFFER};
use bytes::Bytes;
use metrics::{counter, gauge};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Coordinator for one logical channel.
pub struct Relay {
    name: String,
    registry: SubscriberRegistry,
    cache: LatestValue,
}

impl Relay {
    /// Create a relay for the named channel, with an empty cache and no
    /// subscribers.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            registry: SubscriberRegistry::new(),
            cache: LatestValue::new(),
        }
    }

    /// The channel name this relay serves.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Accept a validated connection: create a subscriber in `Accepted`,
    /// register it, transition it to `Active`, and hand the session back to
    /// the transport boundary so bytes can flow.
    pub fn accept(self: &Arc<Self>) -> Result<Session> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CHANNEL_BUFFER);
        let subscriber = Arc::new(Subscriber::new(tx));
        self.registry.register(subscriber.clone())?;
        subscriber.activate();

        counter!("relay_connections_total", "channel" => self.name.clone()).increment(1);
        gauge!("relay_active_subscribers", "channel" => self.name.clone())
            .set(self.registry.count() as f64);
        info!("Subscriber {} connected to '{}'", subscriber.id, self.name);

        Ok(Session::new(self.clone(), subscriber, rx))
    }

    /// Store a fresh payload. Last write wins; repeated identical pushes
    /// are harmless. Subscribers are not notified (pull-based delivery).
    pub fn ingest_push(&self, payload: Bytes) {
        counter!("relay_pushes_total", "channel" => self.name.clone()).increment(1);
        debug!("Push of {} bytes into '{}'", payload.len(), self.name);
        self.cache.set(payload);
    }

    /// Current cached payload, if any push has completed yet.
    pub fn latest(&self) -> Option<Bytes> {
        self.cache.get()
    }

    /// Number of currently active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.registry.count()
    }

    /// The channel's registry, for broadcast iteration.
    pub(crate) fn registry(&self) -> &SubscriberRegistry {
        &self.registry
    }

    /// Remove a subscriber after close. Idempotent; only the call that
    /// actually removes the member updates the gauges, so a double-close
    /// decrements exactly once.
    pub(crate) fn finish(&self, id: &SubscriberId) -> bool {
        let removed = self.registry.deregister(id);
        if removed {
            counter!("relay_disconnections_total", "channel" => self.name.clone()).increment(1);
            gauge!("relay_active_subscribers", "channel" => self.name.clone())
                .set(self.registry.count() as f64);
            info!("Subscriber {} disconnected from '{}'", id, self.name);
        }
        removed
    }
}
