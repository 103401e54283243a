//! WebSocket client for the push gateway.
//!
//! Reconnects with exponential backoff. Once the attempts are exhausted the
//! transport parks in [`ConnectionState::Failed`] until [`TransportHandle::retry`]
//! is called, which starts a fresh round of attempts.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::sync::{Notify, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::backoff::ExponentialBackoff;
use crate::domain::{ChangeEvent, DocumentId};
use crate::ws::messages::{WsMessage, WsMessageType};

/// Connection status shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionState {
    /// First connection attempt in progress.
    Connecting,
    /// Connected and receiving events.
    Connected,
    /// Waiting before reconnect attempt `attempt`.
    Reconnecting {
        /// 1-based retry number.
        attempt: u32,
        /// Delay before the attempt.
        delay_ms: u64,
    },
    /// Attempts exhausted; waiting for a manual retry.
    Failed {
        /// Retries made before giving up.
        attempts: u32,
    },
}

/// What the transport reports to its owner.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A connection is established.
    Connected,
    /// The connection dropped.
    Disconnected,
    /// A change event arrived.
    Change(ChangeEvent),
    /// Reconnect attempts are exhausted.
    Failed,
}

/// Push gateway client settings.
#[derive(Debug, Clone)]
pub struct Transport {
    url: String,
    room: Option<DocumentId>,
    backoff: ExponentialBackoff,
}

/// Control handle for a running [`Transport`]. Dropping it stops the task.
#[derive(Debug)]
pub struct TransportHandle {
    retry: Arc<Notify>,
    state: watch::Receiver<ConnectionState>,
    task: JoinHandle<()>,
}

impl TransportHandle {
    /// Starts a new round of connection attempts after a failure. Ignored
    /// (returns `false`) unless the transport is in
    /// [`ConnectionState::Failed`], so an early call cannot cut a later
    /// failure short.
    pub fn retry(&self) -> bool {
        if !matches!(*self.state.borrow(), ConnectionState::Failed { .. }) {
            return false;
        }
        self.retry.notify_one();
        true
    }

    /// Watches the connection state.
    #[must_use]
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }
}

impl Drop for TransportHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

enum Session {
    /// The connection closed; reconnect.
    Closed,
    /// The owner went away; stop.
    OwnerGone,
}

impl Transport {
    /// Creates a transport for `url` (e.g. `ws://localhost:3000/ws`),
    /// joining `room` after every connect when given.
    #[must_use]
    pub fn new(url: &str, room: Option<DocumentId>, backoff: ExponentialBackoff) -> Self {
        Self {
            url: url.to_string(),
            room,
            backoff,
        }
    }

    /// Starts the connection loop, reporting to `events`.
    #[must_use]
    pub fn spawn(self, events: mpsc::Sender<TransportEvent>) -> TransportHandle {
        let retry = Arc::new(Notify::new());
        let (state_tx, state) = watch::channel(ConnectionState::Connecting);
        let task = tokio::spawn(self.run(events, Arc::clone(&retry), state_tx));
        TransportHandle { retry, state, task }
    }

    async fn run(
        self,
        events: mpsc::Sender<TransportEvent>,
        retry: Arc<Notify>,
        state: watch::Sender<ConnectionState>,
    ) {
        let mut attempt = 0u32;
        loop {
            match tokio_tungstenite::connect_async(self.url.as_str()).await {
                Ok((stream, _)) => {
                    attempt = 0;
                    state.send_replace(ConnectionState::Connected);
                    tracing::info!(url = %self.url, "push connection established");
                    if events.send(TransportEvent::Connected).await.is_err() {
                        return;
                    }
                    if let Session::OwnerGone = self.session(stream, &events).await {
                        return;
                    }
                    if events.send(TransportEvent::Disconnected).await.is_err() {
                        return;
                    }
                }
                Err(e) => {
                    tracing::warn!(url = %self.url, error = %e, "push connection failed");
                }
            }

            attempt = attempt.saturating_add(1);
            match self.backoff.delay(attempt) {
                Some(delay) => {
                    state.send_replace(ConnectionState::Reconnecting {
                        attempt,
                        delay_ms: u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    });
                    tokio::time::sleep(delay).await;
                }
                None => {
                    let attempts = attempt.saturating_sub(1);
                    tracing::error!(url = %self.url, attempts, "push connection gave up");
                    state.send_replace(ConnectionState::Failed { attempts });
                    if events.send(TransportEvent::Failed).await.is_err() {
                        return;
                    }
                    retry.notified().await;
                    tracing::info!(url = %self.url, "manual retry requested");
                    state.send_replace(ConnectionState::Connecting);
                    attempt = 0;
                }
            }
        }
    }

    async fn session(&self, stream: WsStream, events: &mpsc::Sender<TransportEvent>) -> Session {
        let (mut tx, mut rx) = stream.split();
        if let Some(user_id) = self.room {
            let join = serde_json::json!({
                "id": "join",
                "type": "command",
                "payload": { "command": "join_room", "user_id": user_id },
            });
            if tx.send(Message::text(join.to_string())).await.is_err() {
                return Session::Closed;
            }
        }
        while let Some(frame) = rx.next().await {
            let text = match frame {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!(error = %e, "push connection error");
                    break;
                }
            };
            let Some(event) = decode_event(text.as_str()) else {
                continue;
            };
            if events.send(TransportEvent::Change(event)).await.is_err() {
                return Session::OwnerGone;
            }
        }
        Session::Closed
    }
}

/// Extracts the change event from an `event` frame. Other frames
/// (command responses, errors) yield `None`.
fn decode_event(text: &str) -> Option<ChangeEvent> {
    let msg: WsMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            tracing::debug!(error = %e, "unreadable push frame");
            return None;
        }
    };
    if msg.msg_type != WsMessageType::Event {
        return None;
    }
    match serde_json::from_value(msg.payload) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::warn!(error = %e, "malformed change event skipped");
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::domain::{EventKind, Operation};

    #[test]
    fn decodes_event_frames_only() {
        let event = ChangeEvent {
            event: EventKind::StationUpdate,
            operation: Operation::Delete,
            document_key: DocumentId::new(),
            full_document: None,
            user_id: None,
            timestamp: chrono::Utc::now(),
        };
        let Ok(frame) = WsMessage::event(&event) else {
            panic!("encode failed");
        };
        let Ok(text) = serde_json::to_string(&frame) else {
            panic!("encode failed");
        };
        assert_eq!(decode_event(&text), Some(event));

        let response = WsMessage::response("1".to_string(), serde_json::json!({"pong": true}));
        let Ok(text) = serde_json::to_string(&response) else {
            panic!("encode failed");
        };
        assert_eq!(decode_event(&text), None);
        assert_eq!(decode_event("garbage"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_gateway_fails_after_backoff_then_retries() {
        let backoff = ExponentialBackoff::new(Duration::from_millis(10), Duration::from_millis(40), 2);
        // Port 1 on loopback refuses connections.
        let transport = Transport::new("ws://127.0.0.1:1/ws", None, backoff);
        let (tx, mut rx) = mpsc::channel(8);
        let handle = transport.spawn(tx);

        let Some(first) = rx.recv().await else {
            panic!("transport ended");
        };
        assert_eq!(first, TransportEvent::Failed);
        assert_eq!(*handle.state().borrow(), ConnectionState::Failed { attempts: 2 });

        assert!(handle.retry());
        let Some(second) = rx.recv().await else {
            panic!("transport ended");
        };
        assert_eq!(second, TransportEvent::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_before_failure_is_not_remembered() {
        let backoff = ExponentialBackoff::new(Duration::from_millis(10), Duration::from_millis(40), 2);
        let transport = Transport::new("ws://127.0.0.1:1/ws", None, backoff);
        let (tx, mut rx) = mpsc::channel(8);
        let handle = transport.spawn(tx);
        let mut state = handle.state();

        assert!(!handle.retry(), "retry accepted while still connecting");
        let Some(first) = rx.recv().await else {
            panic!("transport ended");
        };
        assert_eq!(first, TransportEvent::Failed);

        // Parked: no new round starts on its own.
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(*state.borrow_and_update(), ConnectionState::Failed { attempts: 2 });
        assert!(rx.try_recv().is_err());
    }
}
