//! WebSocket connection loop.
//!
//! Handles the read/write loop for a single WebSocket connection,
//! dispatching room commands and forwarding filtered change events.

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use super::messages::{WsCommand, WsMessage, WsMessageType};
use super::rooms::RoomMembership;
use crate::domain::ChangeEvent;

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Reads commands from the client and replies to them.
/// - Forwards events from the [`broadcast::Receiver`] that the
///   connection's rooms accept.
pub async fn run_connection(socket: WebSocket, mut event_rx: broadcast::Receiver<ChangeEvent>) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut rooms = RoomMembership::new();

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = handle_text_message(&text, &mut rooms)
                            && ws_tx.send(Message::text(reply)).await.is_err() {
                                break;
                            }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(error = %e, "ws read failed");
                        break;
                    }
                    _ => {}
                }
            }
            event = event_rx.recv() => {
                match event {
                    Ok(event) => {
                        if !rooms.accepts(&event) {
                            continue;
                        }
                        let Some(json) = render_event(&event) else {
                            continue;
                        };
                        if ws_tx.send(Message::text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(lagged = n, "ws client lagged behind event bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    tracing::debug!(rooms = rooms.count(), "ws connection closed");
}

fn render_event(event: &ChangeEvent) -> Option<String> {
    match WsMessage::event(event).and_then(|msg| serde_json::to_string(&msg)) {
        Ok(json) => Some(json),
        Err(e) => {
            tracing::error!(error = %e, key = %event.document_key, "event encoding failed");
            None
        }
    }
}

/// Handles a text frame from the client, returning the JSON reply.
fn handle_text_message(text: &str, rooms: &mut RoomMembership) -> Option<String> {
    let reply = match serde_json::from_str::<WsMessage>(text) {
        Err(_) => WsMessage::error(String::new(), 400, "malformed JSON"),
        Ok(msg) if msg.msg_type != WsMessageType::Command => {
            WsMessage::error(msg.id, 400, "expected a command")
        }
        Ok(msg) => match serde_json::from_value::<WsCommand>(msg.payload) {
            Ok(cmd) => WsMessage::response(msg.id, apply_command(cmd, rooms)),
            Err(_) => WsMessage::error(msg.id, 404, "unknown command"),
        },
    };
    serde_json::to_string(&reply).ok()
}

fn apply_command(cmd: WsCommand, rooms: &mut RoomMembership) -> serde_json::Value {
    match cmd {
        WsCommand::JoinRoom { user_id } => {
            rooms.join(user_id);
            tracing::debug!(%user_id, "joined room");
            serde_json::json!({ "joined": user_id, "rooms": rooms.count() })
        }
        WsCommand::LeaveRoom { user_id } => {
            rooms.leave(user_id);
            serde_json::json!({ "left": user_id, "rooms": rooms.count() })
        }
        WsCommand::Ping => serde_json::json!({ "pong": true }),
    }
}
