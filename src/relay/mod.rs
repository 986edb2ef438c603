// ABOUTME: Relay module for aircast
// ABOUTME: Provides the WebSocket server, channel registry, and tx/rx session handlers

mod cli;
mod config;
mod publisher;
mod registry;
mod server;
mod subscriber;

pub use cli::ServerArgs;
pub use config::ServerConfig;
pub use publisher::handle_publisher;
pub use registry::{
    Channel, ChannelId, ChannelRegistry, ChannelStats, ChannelSummary, ServerMessage, SubscriberId,
};
pub use server::{AircastServer, AppState};
pub use subscriber::handle_subscriber;
