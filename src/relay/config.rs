// ABOUTME: Server configuration
// ABOUTME: Defines configurable parameters for the aircast relay server

use std::net::SocketAddr;

/// Server configuration
///
/// No state is persisted: all channel data lives in memory and is lost on
/// restart.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// WebSocket endpoint path for publishers
    pub tx_path: String,
    /// WebSocket endpoint path for subscribers
    pub rx_path: String,
    /// Cap on simultaneous live channels
    pub max_channels: usize,
    /// Cap on subscribers per channel
    pub max_clients: usize,
}

impl ServerConfig {
    /// Set the bind address
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the publisher endpoint path
    pub fn tx_path(mut self, path: impl Into<String>) -> Self {
        self.tx_path = path.into();
        self
    }

    /// Set the subscriber endpoint path
    pub fn rx_path(mut self, path: impl Into<String>) -> Self {
        self.rx_path = path.into();
        self
    }

    /// Set the cap on simultaneous live channels
    pub fn max_channels(mut self, max: usize) -> Self {
        self.max_channels = max;
        self
    }

    /// Set the cap on subscribers per channel
    pub fn max_clients(mut self, max: usize) -> Self {
        self.max_clients = max;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8917".parse().unwrap(),
            tx_path: "/tx".to_string(),
            rx_path: "/rx".to_string(),
            max_channels: 8,
            max_clients: 4,
        }
    }
}
