//! Client reconciler: keeps a dashboard's local copy of every collection
//! in step with the gateway.
//!
//! Live change events from the push gateway are applied as upserts or
//! removals on per-collection snapshots. When the push path goes quiet
//! after a connect, or drops, the reconciler falls back to full refetches
//! on a timer until live events resume. Nothing here requires the push
//! path to be healthy: at worst the dashboard is as stale as one poll
//! interval plus the list cache TTL.

pub mod activity;
pub mod dashboard;
pub mod fetch;
pub mod mode;
pub mod snapshot;
pub mod transport;

use std::time::Duration;

pub use activity::{ActivityEntry, ActivityLog, DEFAULT_ACTIVITY_CAPACITY};
pub use dashboard::{Dashboard, DashboardState, DashboardView};
pub use fetch::{FetchError, Fetcher, FullSnapshot, HttpFetcher};
pub use mode::{DEFAULT_GRACE, ModeTracker, SyncMode};
pub use snapshot::CollectionSnapshot;
pub use transport::{ConnectionState, Transport, TransportEvent, TransportHandle};

use crate::backoff::ExponentialBackoff;
use crate::domain::DocumentId;

/// Default full-refetch period in poll mode.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Reconciler settings.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Gateway base URL, e.g. `http://localhost:3000`.
    pub gateway_url: String,
    /// Room to join for targeted events; `None` receives everything.
    pub room: Option<DocumentId>,
    /// Quiet period after a connect before falling back to polling.
    pub grace: Duration,
    /// Refetch period while polling.
    pub poll_interval: Duration,
    /// Activity feed length.
    pub activity_capacity: usize,
    /// Push reconnect policy.
    pub backoff: ExponentialBackoff,
}

impl ReconcilerConfig {
    /// Defaults for the gateway at `gateway_url`.
    #[must_use]
    pub fn new(gateway_url: &str) -> Self {
        Self {
            gateway_url: gateway_url.trim_end_matches('/').to_string(),
            room: None,
            grace: DEFAULT_GRACE,
            poll_interval: DEFAULT_POLL_INTERVAL,
            activity_capacity: DEFAULT_ACTIVITY_CAPACITY,
            backoff: ExponentialBackoff::default(),
        }
    }

    /// WebSocket endpoint derived from the base URL.
    #[must_use]
    pub fn ws_url(&self) -> String {
        let base = if let Some(rest) = self.gateway_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.gateway_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.gateway_url.clone()
        };
        format!("{base}/ws")
    }
}
