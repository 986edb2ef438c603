// ABOUTME: Shared CLI argument parsing and server builder utilities
// ABOUTME: Maps process-level options onto ServerConfig and initializes logging

use crate::relay::config::ServerConfig;
use clap::Args;
use std::net::SocketAddr;

/// Common server arguments
///
/// Use with `#[command(flatten)]` in a binary's Args struct:
/// ```ignore
/// #[derive(Parser)]
/// struct MyArgs {
///     #[command(flatten)]
///     server: ServerArgs,
/// }
/// ```
#[derive(Args, Debug, Clone)]
pub struct ServerArgs {
    /// Address to bind the server to
    #[arg(short, long, default_value = "127.0.0.1:8917")]
    pub bind: SocketAddr,

    /// WebSocket endpoint path for publishers
    #[arg(long, default_value = "/tx")]
    pub tx_path: String,

    /// WebSocket endpoint path for subscribers
    #[arg(long, default_value = "/rx")]
    pub rx_path: String,

    /// Maximum number of simultaneous channels
    #[arg(long, default_value = "8")]
    pub max_channels: usize,

    /// Maximum number of subscribers per channel
    #[arg(long, default_value = "4")]
    pub max_clients: usize,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl ServerArgs {
    /// Initialize tracing based on verbosity flag
    pub fn init_tracing(&self) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let filter = if self.verbose {
            "aircast=debug"
        } else {
            "aircast=info"
        };

        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| filter.into()),
            )
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    /// Log startup information
    pub fn log_startup_info(&self) {
        tracing::info!("Aircast Server v{}", env!("CARGO_PKG_VERSION"));
        tracing::info!("Bind: {}", self.bind);
        tracing::info!("Publishers: ws://{}{}", self.bind, self.tx_path);
        tracing::info!("Subscribers: ws://{}{}", self.bind, self.rx_path);
        tracing::info!(
            "Limits: {} channels, {} listeners per channel",
            self.max_channels,
            self.max_clients
        );
    }

    /// Build ServerConfig from these args
    pub fn build_config(&self) -> ServerConfig {
        ServerConfig::default()
            .bind_addr(self.bind)
            .tx_path(self.tx_path.clone())
            .rx_path(self.rx_path.clone())
            .max_channels(self.max_channels)
            .max_clients(self.max_clients)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> ServerArgs {
        ServerArgs {
            bind: "127.0.0.1:8917".parse().unwrap(),
            tx_path: "/tx".to_string(),
            rx_path: "/rx".to_string(),
            max_channels: 8,
            max_clients: 4,
            verbose: false,
        }
    }

    #[test]
    fn test_default_args() {
        let args = args();

        assert_eq!(args.bind.port(), 8917);
        assert_eq!(args.max_channels, 8);
        assert_eq!(args.max_clients, 4);
    }

    #[test]
    fn test_build_config() {
        let mut args = args();
        args.bind = "0.0.0.0:9100".parse().unwrap();
        args.max_channels = 2;
        args.max_clients = 1;

        let config = args.build_config();
        assert_eq!(config.bind_addr.port(), 9100);
        assert_eq!(config.max_channels, 2);
        assert_eq!(config.max_clients, 1);
        assert_eq!(config.tx_path, "/tx");
    }
}
