// ABOUTME: Control message type definitions and serialization
// ABOUTME: Supports configure, channel, join, config, error, eot

use serde::{Deserialize, Serialize};

/// Top-level protocol message envelope
///
/// Control messages travel as JSON text frames. The channel configuration
/// carried by [`Message::Configure`] and [`Message::ConfigDelivered`] is an
/// opaque payload: the relay stores and re-delivers it without ever
/// inspecting its shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Message {
    /// Channel configuration from a publisher; activates the channel
    #[serde(rename = "configure")]
    Configure(serde_json::Value),

    /// Channel id assignment, sent to a publisher after activation
    #[serde(rename = "channel")]
    ChannelAssigned(ChannelAssigned),

    /// Join request from a subscriber naming a target channel
    #[serde(rename = "join")]
    Join(Join),

    /// The joined channel's configuration, sent to a subscriber
    #[serde(rename = "config")]
    ConfigDelivered(serde_json::Value),

    /// Human-readable error reply to the offending connection
    #[serde(rename = "error")]
    Error(ErrorReply),

    /// End-of-transmission signal, fanned out when the publisher disconnects
    #[serde(rename = "eot")]
    Eot,
}

/// Channel id assignment payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelAssigned {
    /// The id the publisher's channel was registered under
    pub channel_id: String,
}

/// Join request payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Join {
    /// Id of the channel to join
    pub channel_id: String,
}

/// Error reply payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReply {
    /// Human-readable description of what went wrong
    pub message: String,
}
