//! HTTP API handlers and routes using axum.
//!
//! Routes:
//! - GET  /websocket - subscriber WebSocket upgrade
//! - POST /cron      - authenticated payload push from the producer
//! - GET  /online    - subscriber count for a channel
//! - GET  /health    - health check

use crate::auth;
use crate::config::GatewayConfig;
use axum::{
    body::Bytes,
    extract::{ws::WebSocket, Query, State, WebSocketUpgrade},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use metrics::counter;
use relay::{ChannelMap, Relay};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub channels: Arc<ChannelMap>,
    pub config: Arc<GatewayConfig>,
}

impl AppState {
    /// Resolve the relay a request addresses, falling back to the
    /// configured default channel.
    fn channel(&self, query: &ChannelQuery) -> Arc<Relay> {
        let name = query
            .channel
            .as_deref()
            .unwrap_or(&self.config.default_channel);
        self.channels.get_or_create(name)
    }
}

/// Optional `?channel=` selector shared by all routes.
#[derive(Debug, Deserialize)]
pub struct ChannelQuery {
    pub channel: Option<String>,
}

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/websocket", get(ws_handler))
        .route("/cron", post(push_handler))
        .route("/online", get(online_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

// ============================================================================
// Handlers
// ============================================================================

/// WebSocket upgrade handler.
/// GET /websocket
///
/// The extractor has already validated the upgrade request; anything that
/// is not a legitimate upgrade is rejected before this runs.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ChannelQuery>,
) -> impl IntoResponse {
    let relay = state.channel(&query);
    ws.on_upgrade(move |socket| handle_socket(socket, relay))
}

/// Hand an upgraded socket to the relay core.
async fn handle_socket(socket: WebSocket, relay: Arc<Relay>) {
    match relay.accept() {
        Ok(session) => session.run(socket).await,
        Err(e) => {
            // Fatal to this registration attempt only; other subscribers
            // and the cache are unaffected.
            warn!("Rejecting connection on '{}': {}", relay.name(), e);
            drop(socket);
        }
    }
}

/// Authenticated producer push.
/// POST /cron
async fn push_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ChannelQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let presented = headers
        .get(auth::AUTH_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if !auth::token_matches(&state.config.auth_token, presented) {
        counter!("gateway_pushes_rejected_total").increment(1);
        warn!("Rejected push with bad or missing token");
        return Err(ApiError::Forbidden);
    }

    state.channel(&query).ingest_push(body);
    Ok(StatusCode::CREATED)
}

/// Subscriber count for a channel.
/// GET /online
async fn online_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ChannelQuery>,
) -> impl IntoResponse {
    let relay = state.channel(&query);
    Json(OnlineResponse {
        clients: relay.subscriber_count(),
    })
}

/// Subscriber count response.
#[derive(Debug, Serialize, Deserialize)]
pub struct OnlineResponse {
    pub clients: usize,
}

/// Health check handler.
/// GET /health
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        channels: state.channels.channel_count(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    channels: usize,
}

// ============================================================================
// Error Handling
// ============================================================================

/// API error types.
#[derive(Debug)]
pub enum ApiError {
    /// Push authentication failed.
    Forbidden,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "invalid push token".to_string()),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}
