// ABOUTME: Main aircast server implementation
// ABOUTME: Assembles the tx/rx WebSocket endpoints around one shared channel registry

use crate::protocol::messages::Message;
use crate::relay::config::ServerConfig;
use crate::relay::publisher::handle_publisher;
use crate::relay::registry::ChannelRegistry;
use crate::relay::subscriber::handle_subscriber;
use axum::{
    extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
    extract::State,
    response::IntoResponse,
    routing::any,
    Router,
};
use futures_util::stream::SplitSink;
use futures_util::SinkExt;
use std::sync::Arc;

/// Shared application state
///
/// The registry is constructed once by the server and handed to every
/// session handler through this state; there is no global.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration
    pub config: Arc<ServerConfig>,
    /// Channel registry shared by all sessions
    pub registry: ChannelRegistry,
}

/// Aircast relay server
pub struct AircastServer {
    config: Arc<ServerConfig>,
    registry: ChannelRegistry,
}

impl AircastServer {
    /// Create a new server with default configuration
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    /// Create a new server with custom configuration
    pub fn with_config(config: ServerConfig) -> Self {
        let registry = ChannelRegistry::new(config.max_channels, config.max_clients);
        Self {
            config: Arc::new(config),
            registry,
        }
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get a handle to the channel registry (read-only monitoring access)
    pub fn registry(&self) -> ChannelRegistry {
        self.registry.clone()
    }

    /// Bind and run the server until shutdown
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let listener = tokio::net::TcpListener::bind(&self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Run the server on an already-bound listener.
    ///
    /// Useful for tests and callers that want an ephemeral port.
    pub async fn serve(
        self,
        listener: tokio::net::TcpListener,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let state = AppState {
            config: self.config.clone(),
            registry: self.registry.clone(),
        };

        let app = Router::new()
            .route(&self.config.tx_path, any(tx_handler))
            .route(&self.config.rx_path, any(rx_handler))
            .with_state(state);

        log::info!(
            "Aircast server listening on {} (tx: {}, rx: {})",
            listener.local_addr()?,
            self.config.tx_path,
            self.config.rx_path
        );

        // Setup graceful shutdown
        let shutdown_signal = async {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to listen for Ctrl-C");
            log::info!("Received shutdown signal");
        };

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await?;

        log::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for AircastServer {
    fn default() -> Self {
        Self::new()
    }
}

/// Publisher WebSocket upgrade handler
async fn tx_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_publisher(socket, state))
}

/// Subscriber WebSocket upgrade handler
async fn rx_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_subscriber(socket, state))
}

/// Serialize a control message and send it down a WebSocket sink.
pub(crate) async fn send_message(
    ws_tx: &mut SplitSink<WebSocket, WsMessage>,
    message: &Message,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(message).map_err(axum::Error::new)?;
    ws_tx.send(WsMessage::Text(json.into())).await
}
