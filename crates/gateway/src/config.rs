//! Environment configuration for the gateway process.

use relay::BroadcastConfig;
use std::env;
use std::time::Duration;

/// Gateway configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Port for the HTTP/WebSocket listener.
    pub http_port: u16,
    /// Port for the Prometheus metrics exporter.
    pub metrics_port: u16,
    /// Shared token producers must present on `/cron`.
    pub auth_token: String,
    /// Channel used when a request does not name one.
    pub default_channel: String,
    /// Broadcast task settings; `None` leaves the task disabled.
    pub broadcast: Option<BroadcastConfig>,
}

impl GatewayConfig {
    /// Read configuration from the environment.
    ///
    /// `AUTH_TOKEN` has no default: without it every push would be
    /// unauthenticated.
    pub fn from_env() -> Self {
        let http_port: u16 = env::var("HTTP_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .expect("HTTP_PORT must be a number");
        let metrics_port: u16 = env::var("METRICS_PORT")
            .unwrap_or_else(|_| "9090".to_string())
            .parse()
            .expect("METRICS_PORT must be a number");
        let auth_token = env::var("AUTH_TOKEN").expect("AUTH_TOKEN must be set");
        let default_channel = env::var("CHANNEL").unwrap_or_else(|_| "live".to_string());

        // The broadcast task stays off unless an interval is configured.
        let broadcast = env::var("BROADCAST_INTERVAL_MS").ok().map(|ms| {
            let interval = Duration::from_millis(
                ms.parse().expect("BROADCAST_INTERVAL_MS must be a number"),
            );
            let fail_threshold = env::var("BROADCAST_FAIL_THRESHOLD")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .expect("BROADCAST_FAIL_THRESHOLD must be a number");
            BroadcastConfig {
                interval,
                fail_threshold,
            }
        });

        Self {
            http_port,
            metrics_port,
            auth_token,
            default_channel,
            broadcast,
        }
    }
}
