//! Gateway service entry point.
//!
//! HTTP/WebSocket front for the live-data relay: subscriber connections,
//! authenticated producer pushes, status queries.

use anyhow::Result;
use gateway::{create_router, AppState, GatewayConfig};
use metrics_exporter_prometheus::PrometheusBuilder;
use relay::{Broadcaster, ChannelMap};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting relay gateway");

    let config = GatewayConfig::from_env();
    info!("Configuration:");
    info!("  HTTP_PORT: {}", config.http_port);
    info!("  METRICS_PORT: {}", config.metrics_port);
    info!("  CHANNEL: {}", config.default_channel);
    match &config.broadcast {
        Some(bc) => info!(
            "  broadcast: every {:?}, evict after {} missed checks",
            bc.interval, bc.fail_threshold
        ),
        None => info!("  broadcast: disabled"),
    }

    // Start Prometheus metrics server
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], config.metrics_port))
        .install()
        .expect("Failed to start Prometheus exporter");
    info!(
        "Prometheus metrics server started on port {}",
        config.metrics_port
    );

    // Channel map with the default channel ready up front
    let channels = Arc::new(ChannelMap::new());
    channels.get_or_create(&config.default_channel);

    // Spawn the broadcast task when configured
    let mut broadcast_shutdown_tx = None;
    let mut broadcast_handle = None;
    if let Some(bc) = config.broadcast.clone() {
        let (tx, rx) = mpsc::channel::<()>(1);
        let broadcaster = Broadcaster::new(channels.clone(), bc);
        broadcast_handle = Some(tokio::spawn(broadcaster.run(rx)));
        broadcast_shutdown_tx = Some(tx);
    }

    // Create application state
    let state = AppState {
        channels,
        config: Arc::new(config.clone()),
    };

    // Start HTTP server
    let app = create_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = TcpListener::bind(addr).await?;
    info!("Gateway listening on {}", addr);

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Shutdown broadcaster
    if let Some(tx) = broadcast_shutdown_tx {
        let _ = tx.send(()).await;
    }
    if let Some(handle) = broadcast_handle {
        let _ = handle.await;
    }

    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received terminate signal"),
    }
}
