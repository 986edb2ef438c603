// ABOUTME: Publisher (tx) session handler
// ABOUTME: Allocates a channel on connect, activates on configure, relays audio batches

use crate::protocol::batch;
use crate::protocol::messages::{ChannelAssigned, ErrorReply, Message};
use crate::relay::registry::ServerMessage;
use crate::relay::server::{send_message, AppState};
use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::StreamExt;

/// Handle a publisher WebSocket connection
///
/// One channel is allocated per publisher connection. The session is a
/// three-state machine: unconfigured until a `configure` message activates
/// the channel, active while relaying audio batches, closed on disconnect.
/// Every exit runs the same teardown: end-of-transmission to the broadcast
/// group, then release of the channel.
pub async fn handle_publisher(socket: WebSocket, state: AppState) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let channel_id = match state.registry.allocate() {
        Ok(id) => id,
        Err(e) => {
            log::warn!("Publisher rejected: {}", e);
            let _ = send_error(&mut ws_tx, &e.to_string()).await;
            // This is the one rejection that does not terminate the
            // connection. No channel backs the session, so everything the
            // peer sends from here on is ignored.
            drain(&mut ws_rx).await;
            return;
        }
    };

    log::info!("Publisher connected, channel {} allocated", channel_id);

    while let Some(msg) = ws_rx.next().await {
        match msg {
            Ok(WsMessage::Text(text)) => {
                if !handle_control_message(&text, &channel_id, &state, &mut ws_tx).await {
                    break;
                }
            }
            Ok(WsMessage::Binary(data)) => {
                if !handle_audio_batch(&data, &channel_id, &state, &mut ws_tx).await {
                    break;
                }
            }
            Ok(WsMessage::Ping(_)) | Ok(WsMessage::Pong(_)) => {
                // Handled automatically by axum
            }
            Ok(WsMessage::Close(_)) => {
                log::info!("Publisher of channel {} closed connection", channel_id);
                break;
            }
            Err(e) => {
                log::warn!("WebSocket error on channel {}: {}", channel_id, e);
                break;
            }
        }
    }

    // Single teardown path: notify the group, then release. Idempotent if
    // the channel is already gone.
    if let Some(channel) = state.registry.release(&channel_id) {
        match serde_json::to_string(&Message::Eot) {
            Ok(json) => {
                for sender in channel.subscriber_senders() {
                    let _ = sender.send(ServerMessage::Text(json.clone()));
                }
            }
            Err(e) => log::error!("Failed to serialize eot: {}", e),
        }
    }

    log::info!("Publisher of channel {} disconnected", channel_id);
}

/// Handle a control message from the publisher.
///
/// Returns false when the session must be forcibly terminated.
async fn handle_control_message(
    text: &str,
    channel_id: &str,
    state: &AppState,
    ws_tx: &mut SplitSink<WebSocket, WsMessage>,
) -> bool {
    let msg = match serde_json::from_str::<Message>(text) {
        Ok(m) => m,
        Err(e) => {
            log::warn!("Failed to parse message on channel {}: {}", channel_id, e);
            return true;
        }
    };

    match msg {
        Message::Configure(config) => match state.registry.activate(channel_id, config) {
            Ok(()) => {
                let assigned = Message::ChannelAssigned(ChannelAssigned {
                    channel_id: channel_id.to_string(),
                });
                send_message(ws_tx, &assigned).await.is_ok()
            }
            Err(e) => {
                log::warn!("Configure rejected on channel {}: {}", channel_id, e);
                let _ = send_error(ws_tx, &e.to_string()).await;
                false
            }
        },
        other => {
            log::debug!("Unhandled message on channel {}: {:?}", channel_id, other);
            true
        }
    }
}

/// Relay one binary audio batch to the channel's broadcast group.
///
/// Returns false when the session must be forcibly terminated.
async fn handle_audio_batch(
    data: &[u8],
    channel_id: &str,
    state: &AppState,
    ws_tx: &mut SplitSink<WebSocket, WsMessage>,
) -> bool {
    let payload_bytes = match batch::payload_bytes(data) {
        Ok(bytes) => bytes,
        Err(e) => {
            log::warn!("Malformed audio batch on channel {}: {}", channel_id, e);
            let _ = send_error(ws_tx, "malformed audio batch").await;
            return false;
        }
    };

    match state.registry.forward(channel_id, payload_bytes, data) {
        Ok(delivered) => {
            log::trace!(
                "Relayed {} bytes on channel {} to {} subscribers",
                payload_bytes,
                channel_id,
                delivered
            );
            true
        }
        Err(e) => {
            log::warn!("Audio rejected on channel {}: {}", channel_id, e);
            let _ = send_error(ws_tx, &e.to_string()).await;
            false
        }
    }
}

async fn send_error(
    ws_tx: &mut SplitSink<WebSocket, WsMessage>,
    message: &str,
) -> Result<(), axum::Error> {
    send_message(
        ws_tx,
        &Message::Error(ErrorReply {
            message: message.to_string(),
        }),
    )
    .await
}

/// Read and discard everything until the peer goes away.
async fn drain(ws_rx: &mut SplitStream<WebSocket>) {
    while let Some(msg) = ws_rx.next().await {
        match msg {
            Ok(WsMessage::Close(_)) | Err(_) => break,
            _ => {}
        }
    }
}
