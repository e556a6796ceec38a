//! # Scan Hub Module
//!
//! Implements the WebSocket relay that fans out barcode-scan payloads
//! between connected clients.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Scan Relay Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     RelayServer (Axum)                          │   │
//! │  │                                                                 │   │
//! │  │  /ws endpoint ──▶ WebSocket upgrade                            │   │
//! │  │                        │                                        │   │
//! │  │                        ▼                                        │   │
//! │  │              ┌─────────────────┐                                │   │
//! │  │              │     ScanHub     │ ◀───── registry keyed by       │   │
//! │  │              │  (registry +    │        connection id           │   │
//! │  │              │    fan-out)     │                                │   │
//! │  │              └────────┬────────┘                                │   │
//! │  │                       │                                         │   │
//! │  │         ┌─────────────┼─────────────┐                          │   │
//! │  │         ▼             ▼             ▼                          │   │
//! │  │  ┌──────────┐  ┌──────────┐  ┌──────────┐                      │   │
//! │  │  │ Scanner  │  │ Till #1  │  │ Till #2  │   Connected          │   │
//! │  │  │  phone   │  │          │  │          │   clients            │   │
//! │  │  └──────────┘  └──────────┘  └──────────┘                      │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  Fan-out Policy:                                                        │
//! │  ───────────────                                                        │
//! │  broadcast_from(sender, payload) delivers to every client EXCEPT        │
//! │  the sender. Payloads pass through verbatim: the relay never parses     │
//! │  or validates barcode content.                                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{RelayError, RelayResult};

// =============================================================================
// Constants
// =============================================================================

/// Default WebSocket port for the relay server.
pub const DEFAULT_RELAY_PORT: u16 = 8765;

/// Per-client outgoing buffer. A client that falls this far behind starts
/// losing scans rather than stalling everyone else.
const CLIENT_BUFFER: usize = 64;

/// Maximum message size (64KB). Scan payloads are tiny; anything bigger
/// is not a scan.
const MAX_MESSAGE_SIZE: usize = 64 * 1024;

// =============================================================================
// Relay Configuration
// =============================================================================

/// Configuration for the relay server.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Port to listen on.
    pub port: u16,
    /// Bind address (default: 0.0.0.0).
    pub bind_addr: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        RelayConfig {
            port: DEFAULT_RELAY_PORT,
            bind_addr: "0.0.0.0".to_string(),
        }
    }
}

impl RelayConfig {
    /// Returns the full bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

// =============================================================================
// Scan Hub
// =============================================================================

/// Registry of connected clients with broadcast-except-sender fan-out.
///
/// The hub is transport-agnostic: it deals in connection ids and opaque
/// string payloads. The WebSocket plumbing lives in [`RelayServer`].
#[derive(Debug, Default)]
pub struct ScanHub {
    /// Connected clients, keyed by connection id.
    clients: RwLock<HashMap<String, mpsc::Sender<String>>>,
}

impl ScanHub {
    /// Creates an empty hub.
    pub fn new() -> Self {
        ScanHub {
            clients: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a client and returns its receiving end.
    ///
    /// Payloads broadcast by *other* clients arrive on the returned
    /// receiver. Registering an id that is already present replaces the
    /// old entry (its receiver goes dead).
    pub async fn register(&self, conn_id: &str) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(CLIENT_BUFFER);
        let mut clients = self.clients.write().await;
        clients.insert(conn_id.to_string(), tx);
        debug!(conn_id = %conn_id, total = clients.len(), "Client registered");
        rx
    }

    /// Removes a client from the registry.
    pub async fn unregister(&self, conn_id: &str) {
        let mut clients = self.clients.write().await;
        if clients.remove(conn_id).is_some() {
            debug!(conn_id = %conn_id, total = clients.len(), "Client unregistered");
        }
    }

    /// Delivers `payload` to every registered client except `sender_id`.
    ///
    /// Best-effort: a client whose buffer is full or whose receiver is
    /// gone is skipped silently. The payload is passed through verbatim.
    ///
    /// ## Returns
    /// The number of clients the payload was delivered to.
    pub async fn broadcast_from(&self, sender_id: &str, payload: &str) -> usize {
        let clients = self.clients.read().await;
        let mut delivered = 0;

        for (conn_id, tx) in clients.iter() {
            if conn_id == sender_id {
                continue;
            }
            if tx.try_send(payload.to_string()).is_ok() {
                delivered += 1;
            }
        }

        debug!(sender = %sender_id, delivered, "Scan broadcast");
        delivered
    }

    /// Returns the number of connected clients.
    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Returns a list of connected client ids.
    pub async fn client_ids(&self) -> Vec<String> {
        self.clients.read().await.keys().cloned().collect()
    }
}

// =============================================================================
// Relay Server
// =============================================================================

/// The WebSocket server that feeds the [`ScanHub`].
pub struct RelayServer {
    /// Server configuration.
    config: RelayConfig,
    /// Shared hub.
    hub: Arc<ScanHub>,
}

/// Handle for controlling a started relay server.
#[derive(Clone)]
pub struct RelayHandle {
    /// Shared hub.
    hub: Arc<ScanHub>,
    /// Shutdown signal sender.
    shutdown_tx: mpsc::Sender<()>,
    /// The address the server actually bound (useful with port 0).
    local_addr: SocketAddr,
}

impl RelayHandle {
    /// Returns the shared hub.
    pub fn hub(&self) -> Arc<ScanHub> {
        self.hub.clone()
    }

    /// Returns the number of connected clients.
    pub async fn client_count(&self) -> usize {
        self.hub.client_count().await
    }

    /// Returns the bound address.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Shuts down the relay server gracefully.
    pub async fn shutdown(&self) -> RelayResult<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| RelayError::ChannelError("Relay shutdown channel closed".into()))
    }
}

impl RelayServer {
    /// Creates a new relay server with a fresh hub.
    pub fn new(config: RelayConfig) -> Self {
        RelayServer {
            config,
            hub: Arc::new(ScanHub::new()),
        }
    }

    /// Creates a relay server around an existing hub.
    pub fn with_hub(config: RelayConfig, hub: Arc<ScanHub>) -> Self {
        RelayServer { config, hub }
    }

    /// Starts the relay server and returns a handle.
    pub async fn start(self) -> RelayResult<RelayHandle> {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let app = Router::new()
            .route("/ws", get(ws_handler))
            .route("/health", get(health_handler))
            .with_state(self.hub.clone());

        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await.map_err(|e| {
            RelayError::TransportError(format!("Failed to bind to {}: {}", bind_addr, e))
        })?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| RelayError::TransportError(e.to_string()))?;

        info!(addr = %local_addr, "Relay server started");

        let handle = RelayHandle {
            hub: self.hub.clone(),
            shutdown_tx,
            local_addr,
        };

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_rx.recv().await;
                    info!("Relay server shutting down");
                })
                .await
                .ok();
        });

        Ok(handle)
    }
}

// =============================================================================
// WebSocket Handler
// =============================================================================

/// Health check endpoint.
async fn health_handler() -> impl IntoResponse {
    "OK"
}

/// WebSocket upgrade handler.
async fn ws_handler(ws: WebSocketUpgrade, State(hub): State<Arc<ScanHub>>) -> impl IntoResponse {
    ws.max_message_size(MAX_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_socket(socket, hub))
}

/// Handles one client connection for its whole lifetime.
async fn handle_socket(socket: WebSocket, hub: Arc<ScanHub>) {
    let conn_id = Uuid::new_v4().to_string();
    info!(conn_id = %conn_id, "Scan client connected");

    let mut rx = hub.register(&conn_id).await;
    let (mut sender, mut receiver) = socket.split();

    // Forward fan-out payloads to this client's socket.
    let outgoing_handle = tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            if sender.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    // Main receive loop: every text frame is a scan to rebroadcast.
    loop {
        match receiver.next().await {
            Some(Ok(Message::Text(text))) => {
                hub.broadcast_from(&conn_id, &text).await;
            }
            Some(Ok(Message::Binary(data))) => {
                // Scanners occasionally send binary frames; pass through
                // as lossy UTF-8.
                let text = String::from_utf8_lossy(&data);
                hub.broadcast_from(&conn_id, &text).await;
            }
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                // Axum answers pings itself; nothing to do.
            }
            Some(Ok(Message::Close(_))) => {
                info!(conn_id = %conn_id, "Client requested close");
                break;
            }
            Some(Err(e)) => {
                warn!(conn_id = %conn_id, ?e, "WebSocket error");
                break;
            }
            None => {
                info!(conn_id = %conn_id, "Client disconnected");
                break;
            }
        }
    }

    outgoing_handle.abort();
    hub.unregister(&conn_id).await;
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_config_default() {
        let config = RelayConfig::default();
        assert_eq!(config.port, DEFAULT_RELAY_PORT);
        assert_eq!(config.bind_addr, "0.0.0.0");
    }

    #[test]
    fn test_relay_config_bind_address() {
        let config = RelayConfig {
            port: 9000,
            bind_addr: "127.0.0.1".to_string(),
        };
        assert_eq!(config.bind_address(), "127.0.0.1:9000");
    }

    #[tokio::test]
    async fn test_broadcast_excludes_sender() {
        let hub = ScanHub::new();

        let mut rx_a = hub.register("a").await;
        let mut rx_b = hub.register("b").await;
        let mut rx_c = hub.register("c").await;

        let delivered = hub.broadcast_from("a", "8901234567890").await;
        assert_eq!(delivered, 2);

        assert_eq!(rx_b.recv().await.as_deref(), Some("8901234567890"));
        assert_eq!(rx_c.recv().await.as_deref(), Some("8901234567890"));

        // The sender received nothing.
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unregister_stops_delivery() {
        let hub = ScanHub::new();

        let _rx_a = hub.register("a").await;
        let mut rx_b = hub.register("b").await;
        hub.unregister("b").await;

        let delivered = hub.broadcast_from("a", "scan").await;
        assert_eq!(delivered, 0);
        assert!(rx_b.try_recv().is_err());
        assert_eq!(hub.client_count().await, 1);
    }

    #[tokio::test]
    async fn test_dead_receiver_skipped() {
        let hub = ScanHub::new();

        let _rx_a = hub.register("a").await;
        let rx_b = hub.register("b").await;
        let mut rx_c = hub.register("c").await;

        // b's receiver is gone; broadcasting still reaches c.
        drop(rx_b);
        let delivered = hub.broadcast_from("a", "scan").await;
        assert_eq!(delivered, 1);
        assert_eq!(rx_c.recv().await.as_deref(), Some("scan"));
    }

    #[tokio::test]
    async fn test_full_buffer_skipped_not_blocked() {
        let hub = ScanHub::new();

        let _rx_a = hub.register("a").await;
        let _rx_b = hub.register("b").await;

        // Fill b's buffer without draining it.
        for i in 0..(CLIENT_BUFFER + 10) {
            hub.broadcast_from("a", &format!("scan-{}", i)).await;
        }

        // The hub never blocked; excess scans for b were dropped.
        assert_eq!(hub.client_count().await, 2);
    }

    #[tokio::test]
    async fn test_payload_is_opaque() {
        let hub = ScanHub::new();

        let _rx_a = hub.register("a").await;
        let mut rx_b = hub.register("b").await;

        // Not JSON, not a barcode; the relay doesn't care.
        hub.broadcast_from("a", "!!not-json¡¡").await;
        assert_eq!(rx_b.recv().await.as_deref(), Some("!!not-json¡¡"));
    }

    #[tokio::test]
    async fn test_server_start_and_shutdown() {
        let config = RelayConfig {
            port: 0, // Let the OS pick a free port
            bind_addr: "127.0.0.1".to_string(),
        };

        let handle = RelayServer::new(config).start().await.unwrap();
        assert_eq!(handle.client_count().await, 0);
        assert_ne!(handle.local_addr().port(), 0);

        handle.shutdown().await.unwrap();
    }
}
