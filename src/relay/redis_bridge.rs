//! Redis subscriber that feeds the in-process [`EventBus`].
//!
//! One background task per gateway process subscribes to the relay
//! channel and republishes every decodable envelope locally. The channel
//! has no persistence: anything published while the bridge is
//! disconnected is lost. The bridge never gives up; once the backoff is
//! exhausted it keeps retrying at the capped delay and reports itself
//! degraded through [`RelayStatus`].

use futures_util::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::EventBus;
use crate::backoff::ExponentialBackoff;
use crate::domain::ChangeEvent;

/// Relay subscription state, as reported by `/health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayStatus {
    /// In-process relay; there is nothing to subscribe to.
    Local,
    /// First subscription attempt in progress.
    Connecting,
    /// Subscribed to the Redis channel.
    Subscribed,
    /// Subscription lost or refused; retry `attempt` is pending.
    Reconnecting {
        /// Retries since the last successful subscription.
        attempt: u32,
    },
}

impl RelayStatus {
    /// Label used in health responses.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Connecting => "connecting",
            Self::Subscribed => "connected",
            Self::Reconnecting { .. } => "degraded",
        }
    }

    /// `true` while remote events are not reaching this process.
    #[must_use]
    pub const fn is_degraded(self) -> bool {
        matches!(self, Self::Reconnecting { .. })
    }

    /// A receiver that always reports `self`.
    #[must_use]
    pub fn fixed(self) -> watch::Receiver<Self> {
        watch::channel(self).1
    }
}

/// Background subscriber bridging Redis pub/sub into the local bus.
#[derive(Debug)]
pub struct RedisBridge {
    client: redis::Client,
    channel: String,
    bus: EventBus,
    backoff: ExponentialBackoff,
    status: watch::Sender<RelayStatus>,
}

impl RedisBridge {
    /// Creates a bridge; nothing happens until [`RedisBridge::spawn`].
    #[must_use]
    pub fn new(client: redis::Client, channel: &str, bus: EventBus, backoff: ExponentialBackoff) -> Self {
        let (status, _) = watch::channel(RelayStatus::Connecting);
        Self {
            client,
            channel: channel.to_string(),
            bus,
            backoff,
            status,
        }
    }

    /// Watches the subscription state.
    #[must_use]
    pub fn status(&self) -> watch::Receiver<RelayStatus> {
        self.status.subscribe()
    }

    /// Starts the subscribe loop on the runtime.
    #[must_use]
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    async fn run(self) {
        let mut attempt = 0u32;
        loop {
            match self.subscribe_once().await {
                Ok(()) => {
                    attempt = 0;
                    tracing::warn!(channel = %self.channel, "relay subscription closed");
                }
                Err(e) => {
                    tracing::warn!(channel = %self.channel, error = %e, "relay subscription failed");
                }
            }
            attempt = attempt.saturating_add(1);
            self.status.send_replace(RelayStatus::Reconnecting { attempt });
            let delay = match self.backoff.delay(attempt) {
                Some(delay) => delay,
                None => {
                    if attempt == self.backoff.max_attempts.saturating_add(1) {
                        tracing::error!(
                            channel = %self.channel,
                            attempts = self.backoff.max_attempts,
                            every_ms = u64::try_from(self.backoff.max.as_millis()).unwrap_or(u64::MAX),
                            "relay still unreachable; retrying at the capped delay"
                        );
                    }
                    self.backoff.max
                }
            };
            tokio::time::sleep(delay).await;
        }
    }

    /// Subscribes and forwards until the connection drops. `Ok` means the
    /// subscription was established at some point.
    async fn subscribe_once(&self) -> redis::RedisResult<()> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(&self.channel).await?;
        self.status.send_replace(RelayStatus::Subscribed);
        tracing::info!(channel = %self.channel, "relay subscription active");

        let mut messages = pubsub.on_message();
        while let Some(msg) = messages.next().await {
            match msg.get_payload::<String>() {
                Ok(payload) => {
                    forward_payload(&payload, &self.bus);
                }
                Err(e) => tracing::warn!(error = %e, "relay message without text payload"),
            }
        }
        Ok(())
    }
}

/// Decodes one relay payload and republishes it on `bus`.
///
/// Returns `false` (after logging) for payloads that are not change
/// envelopes.
pub fn forward_payload(payload: &str, bus: &EventBus) -> bool {
    match serde_json::from_str::<ChangeEvent>(payload) {
        Ok(event) => {
            let receivers = bus.publish(event);
            tracing::trace!(receivers, "relay event forwarded");
            true
        }
        Err(e) => {
            tracing::warn!(error = %e, "malformed relay payload skipped");
            false
        }
    }
}
