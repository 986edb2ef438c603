// ABOUTME: Subscriber (rx) session handler
// ABOUTME: Joins a broadcast group on request, pumps relayed audio, leaves on disconnect

use crate::protocol::messages::{ErrorReply, Message};
use crate::relay::registry::ServerMessage;
use crate::relay::server::{send_message, AppState};
use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

/// Handle a subscriber WebSocket connection
///
/// The session waits for a `join` naming a target channel, validates it
/// against the registry (active channel, free listener slot), delivers the
/// channel's configuration, and then forwards everything the publisher
/// relays until either side disconnects. Disconnect is the only
/// cancellation mechanism; an unjoined connection may idle indefinitely.
pub async fn handle_subscriber(socket: WebSocket, state: AppState) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let subscriber_id = uuid::Uuid::new_v4().to_string();

    let channel_id = loop {
        match ws_rx.next().await {
            Some(Ok(WsMessage::Text(text))) => match serde_json::from_str::<Message>(&text) {
                Ok(Message::Join(join)) => break join.channel_id,
                Ok(other) => log::debug!(
                    "Subscriber {} sent {:?} before joining",
                    subscriber_id,
                    other
                ),
                Err(e) => log::warn!(
                    "Failed to parse message from subscriber {}: {}",
                    subscriber_id,
                    e
                ),
            },
            Some(Ok(WsMessage::Close(_))) | None => {
                log::debug!("Subscriber {} left before joining", subscriber_id);
                return;
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                log::warn!("WebSocket error for subscriber {}: {}", subscriber_id, e);
                return;
            }
        }
    };

    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    let config = match state.registry.join(&channel_id, &subscriber_id, tx) {
        Ok(config) => config,
        Err(e) => {
            log::warn!(
                "Subscriber {} rejected from channel {}: {}",
                subscriber_id,
                channel_id,
                e
            );
            let _ = send_message(
                &mut ws_tx,
                &Message::Error(ErrorReply {
                    message: e.to_string(),
                }),
            )
            .await;
            return;
        }
    };

    // Config goes out before the send task starts, so it always precedes
    // any audio the publisher relays from here on.
    if send_message(&mut ws_tx, &Message::ConfigDelivered(config))
        .await
        .is_err()
    {
        log::warn!("Failed to deliver config to subscriber {}", subscriber_id);
        state.registry.leave(&channel_id, &subscriber_id);
        return;
    }

    // Forward relayed messages to the WebSocket.
    let subscriber_id_send = subscriber_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let ws_msg = match msg {
                ServerMessage::Binary(data) => WsMessage::Binary(data.into()),
                ServerMessage::Text(text) => WsMessage::Text(text.into()),
            };
            if ws_tx.send(ws_msg).await.is_err() {
                log::debug!(
                    "Subscriber {} disconnected (send failed)",
                    subscriber_id_send
                );
                break;
            }
        }
    });

    while let Some(msg) = ws_rx.next().await {
        match msg {
            Ok(WsMessage::Text(text)) => {
                log::debug!(
                    "Ignoring message from joined subscriber {}: {}",
                    subscriber_id,
                    text
                );
            }
            Ok(WsMessage::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                log::warn!("WebSocket error for subscriber {}: {}", subscriber_id, e);
                break;
            }
        }
    }

    state.registry.leave(&channel_id, &subscriber_id);
    send_task.abort();

    log::info!("Subscriber {} disconnected", subscriber_id);
}
