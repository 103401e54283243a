//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use tokio::sync::watch;

use crate::cache::ReadCache;
use crate::config::PaymentKeys;
use crate::relay::{EventBus, RelayStatus};
use crate::service::StoreService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Change source for all document writes and reads.
    pub store: Arc<StoreService>,
    /// Read-side cache for lists and aggregates.
    pub cache: ReadCache,
    /// Local fan-out feeding WebSocket connections.
    pub event_bus: EventBus,
    /// Payment provider credentials.
    pub payments: Arc<PaymentKeys>,
    /// Relay subscription state.
    pub relay: watch::Receiver<RelayStatus>,
}
