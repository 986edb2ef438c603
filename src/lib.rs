// ABOUTME: Main library entry point for aircast
// ABOUTME: Exports the relay server, wire protocol types, and error taxonomy

//! # aircast
//!
//! Real-time audio relay server: a single publisher ("tx") per logical
//! channel streams audio-frame batches, and zero or more subscribers ("rx")
//! receive a verbatim rebroadcast. The server mediates channel creation,
//! capacity limits, activation ordering, and per-channel statistics.
//!
//! All channel state is in-memory and lost on restart.
//!
//! ## Example: Running a Server
//!
//! ```no_run
//! use aircast::relay::{AircastServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ServerConfig::default()
//!         .bind_addr("127.0.0.1:8917".parse().unwrap())
//!         .max_channels(8)
//!         .max_clients(4);
//!
//!     AircastServer::with_config(config).run().await.unwrap();
//! }
//! ```

#![warn(missing_docs)]

/// Wire protocol: control messages and audio batch framing
pub mod protocol;
/// Relay implementation: channel registry, session handlers, server assembly
pub mod relay;

pub use protocol::messages::Message;
pub use relay::{AircastServer, ChannelRegistry, ServerConfig};

/// Result type for aircast operations
pub type Result<T> = std::result::Result<T, error::RelayError>;

/// Error types for aircast
pub mod error {
    use thiserror::Error;

    /// Errors reported to an offending connection by the relay core.
    ///
    /// The display text of each variant is exactly the human-readable
    /// message delivered in the `error` reply on the wire.
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum RelayError {
        /// The server already hosts the maximum number of live channels
        #[error("channels limit reached")]
        CapacityExceeded,

        /// The channel id does not resolve to a live channel
        #[error("invalid channel")]
        InvalidChannel,

        /// A configuration attempt on an already-active channel
        #[error("channel is active")]
        AlreadyActive,

        /// Audio was streamed before the channel was configured
        #[error("channel has not been configured")]
        NotActive,

        /// The channel already has the maximum number of subscribers
        #[error("listeners limit reached")]
        ListenerLimitExceeded,
    }
}
