//! Per-connection subscriber state.
//!
//! A `Subscriber` is the registry's view of one open connection: its
//! identity, its outbound message channel, its lifecycle state, and the
//! liveness counter used by the optional broadcast task. The owning
//! `Session` is the sole driver of the lifecycle state.

use axum::extract::ws::Message;
use chrono::Utc;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Unique subscriber identifier, assigned at acceptance.
pub type SubscriberId = Uuid;

/// Outbound buffer per subscriber. A full buffer means the consumer is not
/// keeping up; sends are dropped rather than blocking the relay.
pub const SUBSCRIBER_CHANNEL_BUFFER: usize = 64;

/// Session lifecycle. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    Accepted = 0,
    Active = 1,
    Closing = 2,
    Closed = 3,
}

/// State for a single connected subscriber.
pub struct Subscriber {
    /// Unique subscriber identifier.
    pub id: SubscriberId,
    /// Channel to the subscriber's WebSocket write half.
    tx: mpsc::Sender<Message>,
    /// Lifecycle state, stored as a `SessionState` discriminant.
    state: AtomicU8,
    /// Consecutive broadcast ticks without a successful send.
    fail_checks: AtomicU32,
    /// Timestamp when the subscriber connected (ms since epoch).
    pub connected_at: i64,
}

impl Subscriber {
    /// Create a new subscriber in state `Accepted`.
    pub fn new(tx: mpsc::Sender<Message>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tx,
            state: AtomicU8::new(SessionState::Accepted as u8),
            fail_checks: AtomicU32::new(0),
            connected_at: Utc::now().timestamp_millis(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        match self.state.load(Ordering::Relaxed) {
            0 => SessionState::Accepted,
            1 => SessionState::Active,
            2 => SessionState::Closing,
            _ => SessionState::Closed,
        }
    }

    /// `Accepted → Active`, entered immediately after registration.
    pub fn activate(&self) {
        let _ = self.state.compare_exchange(
            SessionState::Accepted as u8,
            SessionState::Active as u8,
            Ordering::Relaxed,
            Ordering::Relaxed,
        );
    }

    /// Enter `Closing`. Returns `true` for exactly one caller even when
    /// close is triggered twice concurrently; `false` once the subscriber
    /// is already `Closing` or `Closed`.
    pub fn begin_close(&self) -> bool {
        loop {
            let current = self.state.load(Ordering::Relaxed);
            if current >= SessionState::Closing as u8 {
                return false;
            }
            if self
                .state
                .compare_exchange(
                    current,
                    SessionState::Closing as u8,
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                )
                .is_ok()
            {
                return true;
            }
        }
    }

    /// `Closing → Closed`. Terminal; no outgoing transitions.
    pub fn finish_close(&self) {
        self.state.store(SessionState::Closed as u8, Ordering::Relaxed);
    }

    /// Try to send a message to this subscriber.
    /// Non-blocking; returns `false` if the buffer is full or the
    /// connection's write half is gone.
    pub fn try_send(&self, msg: Message) -> bool {
        self.tx.try_send(msg).is_ok()
    }

    /// Increment the liveness counter for one broadcast tick and return the
    /// new count.
    pub fn tick_fail(&self) -> u32 {
        self.fail_checks.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Reset the liveness counter after a successful send.
    pub fn reset_fail_checks(&self) {
        self.fail_checks.store(0, Ordering::Relaxed);
    }

    /// Consecutive missed liveness checks so far.
    pub fn missed_checks(&self) -> u32 {
        self.fail_checks.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_subscriber(buffer: usize) -> (Subscriber, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Subscriber::new(tx), rx)
    }

    #[test]
    fn starts_accepted_then_activates() {
        let (sub, _rx) = make_subscriber(1);
        assert_eq!(sub.state(), SessionState::Accepted);
        sub.activate();
        assert_eq!(sub.state(), SessionState::Active);
    }

    #[test]
    fn begin_close_wins_exactly_once() {
        let (sub, _rx) = make_subscriber(1);
        sub.activate();
        assert!(sub.begin_close());
        assert!(!sub.begin_close());
        assert_eq!(sub.state(), SessionState::Closing);
        sub.finish_close();
        assert_eq!(sub.state(), SessionState::Closed);
        assert!(!sub.begin_close());
    }

    #[test]
    fn activate_after_close_is_ignored() {
        let (sub, _rx) = make_subscriber(1);
        sub.activate();
        sub.begin_close();
        sub.finish_close();
        sub.activate();
        assert_eq!(sub.state(), SessionState::Closed);
    }

    #[test]
    fn try_send_fails_when_buffer_full() {
        let (sub, mut rx) = make_subscriber(1);
        assert!(sub.try_send(Message::Ping(vec![].into())));
        assert!(!sub.try_send(Message::Ping(vec![].into())));
        rx.try_recv().expect("buffered message");
        assert!(sub.try_send(Message::Ping(vec![].into())));
    }

    #[test]
    fn fail_counter_ticks_and_resets() {
        let (sub, _rx) = make_subscriber(1);
        assert_eq!(sub.tick_fail(), 1);
        assert_eq!(sub.tick_fail(), 2);
        assert_eq!(sub.missed_checks(), 2);
        sub.reset_fail_checks();
        assert_eq!(sub.missed_checks(), 0);
    }
}
