//! Per-connection session: drives one subscriber's WebSocket.
//!
//! The session owns the connection's lifecycle (`Accepted → Active →
//! Closing → Closed`) and the request/response exchange over it. A `"DATA"`
//! text frame is answered with the channel's cached payload as one binary
//! message; a request that arrives before the first push gets no reply at
//! all. Close is acknowledged with a status code and reason even when the
//! remote side initiated it, and teardown deregisters idempotently, so a
//! transport failure takes the same path as an explicit close.

use crate::coordinator::Relay;
use crate::protocol;
use crate::subscriber::Subscriber;
use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures::{SinkExt, StreamExt};
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// How long teardown waits for queued frames (including the close
/// acknowledgment) to flush before the write half is dropped.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// One subscriber's connection lifecycle and message exchange.
pub struct Session {
    relay: Arc<Relay>,
    subscriber: Arc<Subscriber>,
    rx: mpsc::Receiver<Message>,
}

impl Session {
    pub(crate) fn new(
        relay: Arc<Relay>,
        subscriber: Arc<Subscriber>,
        rx: mpsc::Receiver<Message>,
    ) -> Self {
        Self {
            relay,
            subscriber,
            rx,
        }
    }

    /// This session's subscriber identity.
    pub fn id(&self) -> crate::subscriber::SubscriberId {
        self.subscriber.id
    }

    /// The subscriber this session drives.
    pub fn subscriber(&self) -> &Arc<Subscriber> {
        &self.subscriber
    }

    #[cfg(test)]
    pub(crate) fn rx_mut(&mut self) -> &mut mpsc::Receiver<Message> {
        &mut self.rx
    }

    /// Drive the connection until it closes, then clean up.
    pub async fn run(self, socket: WebSocket) {
        let id = self.subscriber.id;
        let (mut ws_tx, mut ws_rx) = socket.split();
        let mut rx = self.rx;

        // Forward queued messages to the socket; a close frame is the last
        // thing this connection will ever send.
        let mut send_task = tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                let is_close = matches!(msg, Message::Close(_));
                if ws_tx.send(msg).await.is_err() || is_close {
                    break;
                }
            }
        });

        while let Some(msg) = ws_rx.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    if text.as_str() == protocol::DATA_REQUEST {
                        Self::handle_pull(&self.relay, &self.subscriber);
                    } else {
                        debug!("Subscriber {} sent unknown request, ignoring", id);
                    }
                }
                Ok(Message::Close(frame)) => {
                    debug!("Subscriber {} sent close: {:?}", id, frame);
                    break;
                }
                // Binary frames have no defined meaning on this channel;
                // ping/pong is handled by the transport.
                Ok(_) => {}
                Err(e) => {
                    warn!("Transport error for subscriber {}: {:?}", id, e);
                    break;
                }
            }
        }

        // Acknowledge the close unless eviction already did.
        if self.subscriber.begin_close() {
            let _ = self.subscriber.try_send(Message::Close(Some(CloseFrame {
                code: protocol::CLOSE_NORMAL,
                reason: protocol::CLOSE_REASON.into(),
            })));
        }

        // Deregister before flushing so the subscriber count reflects the
        // close without delay.
        self.relay.finish(&id);

        if tokio::time::timeout(CLOSE_GRACE, &mut send_task).await.is_err() {
            send_task.abort();
        }
        self.subscriber.finish_close();
    }

    /// Answer one `"DATA"` request with the cached payload. An empty cache
    /// means no reply: the subscriber cannot tell "nothing pushed yet" from
    /// a lost request, and that is the specified behavior.
    fn handle_pull(relay: &Arc<Relay>, subscriber: &Arc<Subscriber>) {
        counter!("relay_pulls_total", "channel" => relay.name().to_string()).increment(1);
        match relay.latest() {
            Some(payload) => {
                if !subscriber.try_send(Message::Binary(payload)) {
                    debug!(
                        "Subscriber {} buffer full, dropping pull response",
                        subscriber.id
                    );
                }
            }
            None => {
                debug!(
                    "No payload cached yet, ignoring pull from {}",
                    subscriber.id
                );
            }
        }
    }
}
