//! Write-side entry point of the relay.
//!
//! [`EventPublisher`] hides whether events travel through a Redis pub/sub
//! channel (multi-process deployments) or straight into the local
//! [`EventBus`]. Publishing is fire-and-forget: failures are logged and
//! reported as [`PublishOutcome::Failed`], never as an error, so the write
//! that triggered the event can never fail because of it.

use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use super::EventBus;
use crate::domain::ChangeEvent;

/// Result of a best-effort publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Handed to the relay; `receivers` subscribers were listening.
    Published {
        /// Subscriber count reported by the relay.
        receivers: usize,
    },
    /// The relay rejected or could not be reached. Already logged.
    Failed,
}

/// Publishes change events on a Redis channel.
#[derive(Clone)]
pub struct RedisPublisher {
    connection: ConnectionManager,
    channel: String,
}

impl std::fmt::Debug for RedisPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisPublisher")
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}

impl RedisPublisher {
    /// Connects a managed Redis connection for publishing.
    ///
    /// # Errors
    ///
    /// Returns the Redis error if the URL is invalid or the server cannot be
    /// reached.
    pub async fn connect(client: &redis::Client, channel: &str) -> redis::RedisResult<Self> {
        let connection = client.get_connection_manager().await?;
        Ok(Self {
            connection,
            channel: channel.to_string(),
        })
    }

    async fn publish(&self, event: &ChangeEvent) -> PublishOutcome {
        let payload = match serde_json::to_string(event) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = %e, "change event not serializable");
                return PublishOutcome::Failed;
            }
        };
        let mut conn = self.connection.clone();
        match conn.publish::<_, _, i64>(&self.channel, payload).await {
            Ok(n) => PublishOutcome::Published {
                receivers: usize::try_from(n).unwrap_or(0),
            },
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    channel = %self.channel,
                    event = event.event.as_str(),
                    key = %event.document_key,
                    "relay publish failed; event dropped"
                );
                PublishOutcome::Failed
            }
        }
    }
}

/// Where the write path sends change events.
#[derive(Debug, Clone)]
pub enum EventPublisher {
    /// Straight into the in-process bus (single-instance deployments).
    Local(EventBus),
    /// Through a Redis channel; a [`super::RedisBridge`] feeds the bus.
    Redis(RedisPublisher),
}

impl EventPublisher {
    /// Publishes `event` once, best-effort.
    pub async fn publish(&self, event: &ChangeEvent) -> PublishOutcome {
        let outcome = match self {
            Self::Local(bus) => PublishOutcome::Published {
                receivers: bus.publish(event.clone()),
            },
            Self::Redis(redis) => redis.publish(event).await,
        };
        tracing::debug!(
            event = event.event.as_str(),
            operation = event.operation.as_str(),
            key = %event.document_key,
            ?outcome,
            "change event published"
        );
        outcome
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{DocumentId, EventKind, Operation};
    use chrono::Utc;

    fn event() -> ChangeEvent {
        ChangeEvent {
            event: EventKind::ClientUpdate,
            operation: Operation::Delete,
            document_key: DocumentId::new(),
            full_document: None,
            user_id: None,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn local_publish_reaches_bus() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let publisher = EventPublisher::Local(bus);

        let sent = event();
        let outcome = publisher.publish(&sent).await;
        assert_eq!(outcome, PublishOutcome::Published { receivers: 1 });

        let Ok(received) = rx.recv().await else {
            panic!("event not delivered");
        };
        assert_eq!(received, sent);
    }

    #[tokio::test]
    async fn local_publish_without_listeners_still_succeeds() {
        let publisher = EventPublisher::Local(EventBus::new(8));
        let outcome = publisher.publish(&event()).await;
        assert_eq!(outcome, PublishOutcome::Published { receivers: 0 });
    }
}
