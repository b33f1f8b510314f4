//! Timer-driven broadcast with liveness eviction. Disabled by default.
//!
//! Each tick sends every channel's cached payload to every subscriber,
//! counts the ticks a subscriber goes without a successful send, and
//! force-closes it at a threshold. Structurally separate from the pull
//! path: enabling the broadcaster never changes how `"DATA"` requests are
//! answered.

use crate::channels::ChannelMap;
use crate::coordinator::Relay;
use crate::protocol;
use axum::extract::ws::{CloseFrame, Message};
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

/// Configuration for the broadcast task.
#[derive(Debug, Clone)]
pub struct BroadcastConfig {
    /// Interval between broadcast ticks.
    pub interval: Duration,
    /// Consecutive missed checks before a subscriber is evicted.
    pub fail_threshold: u32,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            fail_threshold: 10,
        }
    }
}

/// Periodically fans the freshest payload out to all subscribers and evicts
/// unresponsive ones.
pub struct Broadcaster {
    channels: Arc<ChannelMap>,
    config: BroadcastConfig,
}

impl Broadcaster {
    /// Create a broadcaster over the given channels.
    pub fn new(channels: Arc<ChannelMap>, config: BroadcastConfig) -> Self {
        Self { channels, config }
    }

    /// Run until the shutdown channel fires.
    pub async fn run(self, mut shutdown_rx: mpsc::Receiver<()>) {
        info!(
            "Broadcaster running, tick every {:?}, evicting after {} missed checks",
            self.config.interval, self.config.fail_threshold
        );

        let mut tick = interval(self.config.interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.recv() => {
                    info!("Broadcaster received shutdown signal");
                    break;
                }

                _ = tick.tick() => {
                    self.tick();
                }
            }
        }

        info!("Broadcaster stopped");
    }

    /// One broadcast pass over every channel.
    pub fn tick(&self) {
        self.channels.for_each(|relay| self.sweep(relay));
    }

    /// Send the channel's cached payload to each subscriber, then evict the
    /// ones past the miss threshold.
    fn sweep(&self, relay: &Arc<Relay>) {
        // Nothing pushed yet: nothing to send, and no liveness to measure.
        let Some(payload) = relay.latest() else {
            return;
        };

        let mut evicted = Vec::new();
        relay.registry().for_each(|subscriber| {
            let misses = subscriber.tick_fail();
            if subscriber.try_send(Message::Binary(payload.clone())) {
                subscriber.reset_fail_checks();
            } else if misses >= self.config.fail_threshold {
                evicted.push(subscriber.clone());
            }
        });

        for subscriber in evicted {
            warn!(
                "Evicting subscriber {} from '{}' after {} missed checks",
                subscriber.id,
                relay.name(),
                subscriber.missed_checks()
            );
            if subscriber.begin_close() {
                let _ = subscriber.try_send(Message::Close(Some(CloseFrame {
                    code: protocol::CLOSE_GOING_AWAY,
                    reason: protocol::CLOSE_REASON_EVICTED.into(),
                })));
            }
            relay.finish(&subscriber.id);
            counter!("relay_evictions_total", "channel" => relay.name().to_string()).increment(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use crate::subscriber::SessionState;
    use bytes::Bytes;

    fn setup(threshold: u32) -> (Arc<ChannelMap>, Arc<Relay>, Broadcaster) {
        let channels = Arc::new(ChannelMap::new());
        let relay = channels.get_or_create("test");
        let broadcaster = Broadcaster::new(
            channels.clone(),
            BroadcastConfig {
                interval: Duration::from_millis(10),
                fail_threshold: threshold,
            },
        );
        (channels, relay, broadcaster)
    }

    fn fill_buffer(session: &Session) {
        while session.subscriber().try_send(Message::Ping(vec![].into())) {}
    }

    fn drain(session: &mut Session) {
        while session.rx_mut().try_recv().is_ok() {}
    }

    #[test]
    fn tick_delivers_latest_to_every_subscriber() {
        let (_channels, relay, broadcaster) = setup(10);
        let mut first = relay.accept().unwrap();
        let mut second = relay.accept().unwrap();
        relay.ingest_push(Bytes::from_static(b"fresh"));

        broadcaster.tick();

        for session in [&mut first, &mut second] {
            match session.rx_mut().try_recv().unwrap() {
                Message::Binary(data) => assert_eq!(data, Bytes::from_static(b"fresh")),
                other => panic!("expected binary payload, got {:?}", other),
            }
            assert_eq!(session.subscriber().missed_checks(), 0);
        }
    }

    #[test]
    fn tick_with_empty_cache_is_a_noop() {
        let (_channels, relay, broadcaster) = setup(10);
        let mut session = relay.accept().unwrap();

        broadcaster.tick();

        assert!(session.rx_mut().try_recv().is_err());
        assert_eq!(session.subscriber().missed_checks(), 0);
    }

    #[test]
    fn unresponsive_subscriber_is_evicted_at_threshold() {
        let (_channels, relay, broadcaster) = setup(3);
        let session = relay.accept().unwrap();
        relay.ingest_push(Bytes::from_static(b"payload"));
        fill_buffer(&session);

        broadcaster.tick();
        broadcaster.tick();
        assert_eq!(relay.subscriber_count(), 1);

        broadcaster.tick();
        assert_eq!(relay.subscriber_count(), 0);
        assert_ne!(session.subscriber().state(), SessionState::Active);
    }

    #[test]
    fn successful_send_resets_the_miss_counter() {
        let (_channels, relay, broadcaster) = setup(3);
        let mut session = relay.accept().unwrap();
        relay.ingest_push(Bytes::from_static(b"payload"));
        fill_buffer(&session);

        broadcaster.tick();
        broadcaster.tick();
        assert_eq!(session.subscriber().missed_checks(), 2);

        // The subscriber catches up; the next tick succeeds and resets.
        drain(&mut session);
        broadcaster.tick();
        assert_eq!(session.subscriber().missed_checks(), 0);

        fill_buffer(&session);
        broadcaster.tick();
        broadcaster.tick();
        assert_eq!(relay.subscriber_count(), 1);
    }

    #[test]
    fn eviction_leaves_other_subscribers_untouched() {
        let (_channels, relay, broadcaster) = setup(1);
        let stuck = relay.accept().unwrap();
        let mut healthy = relay.accept().unwrap();
        relay.ingest_push(Bytes::from_static(b"payload"));
        fill_buffer(&stuck);

        broadcaster.tick();

        assert_eq!(relay.subscriber_count(), 1);
        assert_eq!(healthy.subscriber().state(), SessionState::Active);
        assert!(matches!(
            healthy.rx_mut().try_recv().unwrap(),
            Message::Binary(_)
        ));
    }
}
