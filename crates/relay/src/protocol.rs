//! Wire protocol for the subscriber channel.
//!
//! The channel is intentionally minimal: a subscriber sends the literal
//! request token and receives the current payload as one binary message.
//! Any other inbound frame has no defined behavior and is ignored.

/// Request token a subscriber sends to pull the latest payload.
pub const DATA_REQUEST: &str = "DATA";

/// WebSocket close code for a normal close acknowledgment.
pub const CLOSE_NORMAL: u16 = 1000;

/// WebSocket close code when the relay force-closes a connection.
pub const CLOSE_GOING_AWAY: u16 = 1001;

/// Human-readable reason sent with every close acknowledgment.
pub const CLOSE_REASON: &str = "relay is closing this connection";

/// Reason sent when the broadcast task evicts an unresponsive subscriber.
pub const CLOSE_REASON_EVICTED: &str = "evicted after missed liveness checks";
