//! Core of the live-data relay: one upstream producer pushes opaque binary
//! payloads, many WebSocket subscribers pull the freshest one on request.
//!
//! ## Architecture
//!
//! ```text
//! producer push (authenticated at the gateway)
//!         ↓
//! Relay (one per channel: latest-value cache + subscriber registry)
//!         ↓ pull ("DATA" request)
//! Session (per-connection state machine)
//!         ↓
//! WebSocket subscribers
//! ```
//!
//! ## Design
//!
//! - Single-slot cache: only the latest payload is retained, replaced
//!   wholesale on each push. Subscribers only ever want freshest state, and
//!   one slot bounds memory under slow or dead consumers.
//! - Pull-based delivery: a push updates the cache and notifies nobody;
//!   subscribers ask with a `"DATA"` frame. An optional broadcast task
//!   (off by default) periodically fans the cached value out to every
//!   subscriber and evicts unresponsive ones.
//! - Lock-free registry using DashMap; payloads are refcounted `Bytes` so
//!   a reader never observes a torn value.

pub mod broadcast;
pub mod cache;
pub mod channels;
pub mod coordinator;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod session;
pub mod subscriber;

pub use broadcast::{BroadcastConfig, Broadcaster};
pub use cache::LatestValue;
pub use channels::ChannelMap;
pub use coordinator::Relay;
pub use error::{RelayError, Result};
pub use registry::SubscriberRegistry;
pub use session::Session;
pub use subscriber::{SessionState, Subscriber, SubscriberId};
