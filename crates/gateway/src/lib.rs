//! Gateway for the live-data relay.
//!
//! This service:
//! - Accepts WebSocket connections from subscribers and hands the validated
//!   connection to the relay core
//! - Authenticates producer pushes with a shared token before any payload
//!   reaches the core
//! - Exposes subscriber-count and health queries
//!
//! ## Architecture
//!
//! ```text
//! POST /cron (x-auth-token)      GET /websocket
//!         ↓                            ↓
//!      Gateway (admission & ingestion, this crate)
//!         ↓                            ↓
//!   Relay::ingest_push          Relay::accept → Session
//! ```
//!
//! Admission failures (bad token, bad upgrade) are answered here and never
//! cross into the relay core.

pub mod api;
pub mod auth;
pub mod config;

pub use api::{create_router, AppState, OnlineResponse};
pub use config::GatewayConfig;
