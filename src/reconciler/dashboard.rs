//! Dashboard driver: one task that owns the local state.
//!
//! Events, refetch results and timers are all handled on the same task, so
//! the snapshot is never mutated concurrently. The current state is
//! published on a [`watch`] channel after every step.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::ReconcilerConfig;
use super::activity::{ActivityEntry, ActivityLog};
use super::fetch::{Fetcher, FullSnapshot};
use super::mode::{ModeTracker, SyncMode};
use super::snapshot::CollectionSnapshot;
use super::transport::{ConnectionState, Transport, TransportEvent, TransportHandle};
use crate::domain::{ChangeEvent, Client, Document, EventKind, Operation, Payment, Station};

/// Transport events buffered while a refetch is in flight.
const EVENT_QUEUE: usize = 256;

/// Read-only copy of the dashboard, as rendered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    /// Clients, newest first.
    pub clients: Vec<Client>,
    /// Stations, newest first.
    pub stations: Vec<Station>,
    /// Payments, newest first.
    pub payments: Vec<Payment>,
    /// Recent activity, newest first.
    pub activity: Vec<ActivityEntry>,
    /// How the view is being kept fresh.
    pub mode: SyncMode,
    /// Push connection status.
    pub connection: ConnectionState,
    /// Completion time of the last successful refetch.
    pub last_refetch: Option<DateTime<Utc>>,
    /// Message of the last failed refetch, cleared on success.
    pub refetch_error: Option<String>,
}

impl Default for DashboardView {
    fn default() -> Self {
        Self {
            clients: Vec::new(),
            stations: Vec::new(),
            payments: Vec::new(),
            activity: Vec::new(),
            mode: SyncMode::Push,
            connection: ConnectionState::Connecting,
            last_refetch: None,
            refetch_error: None,
        }
    }
}

/// Snapshots of the three collections plus the activity feed.
#[derive(Debug, Default)]
pub struct DashboardState {
    clients: CollectionSnapshot<Client>,
    stations: CollectionSnapshot<Station>,
    payments: CollectionSnapshot<Payment>,
    activity: ActivityLog,
}

impl DashboardState {
    /// Creates empty state with an activity feed of `activity_capacity`.
    #[must_use]
    pub fn new(activity_capacity: usize) -> Self {
        Self {
            activity: ActivityLog::new(activity_capacity),
            ..Self::default()
        }
    }

    /// Applies one change event and records it in the activity feed.
    pub fn apply(&mut self, event: &ChangeEvent) {
        match event.event {
            EventKind::ClientUpdate => apply_to(&mut self.clients, event),
            EventKind::StationUpdate => apply_to(&mut self.stations, event),
            EventKind::PaymentUpdate => apply_to(&mut self.payments, event),
        }
        self.activity.push(ActivityEntry::from(event));
    }

    /// Replaces every snapshot with a full refetch. The activity feed is
    /// kept.
    pub fn replace(&mut self, snapshot: FullSnapshot) {
        self.clients.replace_all(snapshot.clients);
        self.stations.replace_all(snapshot.stations);
        self.payments.replace_all(snapshot.payments);
    }

    /// Client snapshot.
    #[must_use]
    pub fn clients(&self) -> &CollectionSnapshot<Client> {
        &self.clients
    }

    /// Station snapshot.
    #[must_use]
    pub fn stations(&self) -> &CollectionSnapshot<Station> {
        &self.stations
    }

    /// Payment snapshot.
    #[must_use]
    pub fn payments(&self) -> &CollectionSnapshot<Payment> {
        &self.payments
    }

    /// Activity feed.
    #[must_use]
    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }
}

fn apply_to<T: Document>(snapshot: &mut CollectionSnapshot<T>, event: &ChangeEvent) {
    match event.operation {
        Operation::Delete => {
            snapshot.remove(event.document_key);
        }
        Operation::Insert | Operation::Update => match event.document::<T>() {
            Some(document) => {
                snapshot.upsert(document);
            }
            None => tracing::warn!(
                key = %event.document_key,
                event = event.event.as_str(),
                "event without a usable document; waiting for next refetch"
            ),
        },
    }
}

/// A running dashboard. Dropping it (or calling [`Dashboard::shutdown`])
/// cancels the poll timer and the push subscription together.
#[derive(Debug)]
pub struct Dashboard {
    view: watch::Receiver<DashboardView>,
    transport: Option<TransportHandle>,
    task: JoinHandle<()>,
}

impl Dashboard {
    /// Connects to the gateway in `config` and starts reconciling.
    #[must_use]
    pub fn spawn<F: Fetcher>(config: ReconcilerConfig, fetcher: F) -> Self {
        let (tx, rx) = mpsc::channel(EVENT_QUEUE);
        let transport = Transport::new(&config.ws_url(), config.room, config.backoff).spawn(tx);
        let mut dashboard = Self::attach(config, fetcher, rx, transport.state());
        dashboard.transport = Some(transport);
        dashboard
    }

    /// Reconciles from an existing event source. The dashboard stops when
    /// `events` closes.
    #[must_use]
    pub fn attach<F: Fetcher>(
        config: ReconcilerConfig,
        fetcher: F,
        events: mpsc::Receiver<TransportEvent>,
        connection: watch::Receiver<ConnectionState>,
    ) -> Self {
        let (view_tx, view) = watch::channel(DashboardView::default());
        let driver = Driver {
            state: DashboardState::new(config.activity_capacity),
            mode: ModeTracker::new(config.grace),
            fetcher,
            last_refetch: None,
            refetch_error: None,
            view_tx,
        };
        let task = tokio::spawn(driver.run(config, events, connection));
        Self {
            view,
            transport: None,
            task,
        }
    }

    /// Watches the rendered state.
    #[must_use]
    pub fn view(&self) -> watch::Receiver<DashboardView> {
        self.view.clone()
    }

    /// Manual reconnect after the transport gave up. Returns `false` if
    /// there is nothing to retry.
    pub fn retry(&self) -> bool {
        self.transport.as_ref().is_some_and(TransportHandle::retry)
    }

    /// Stops reconciling.
    pub fn shutdown(self) {
        drop(self);
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct Driver<F> {
    state: DashboardState,
    mode: ModeTracker,
    fetcher: F,
    last_refetch: Option<DateTime<Utc>>,
    refetch_error: Option<String>,
    view_tx: watch::Sender<DashboardView>,
}

impl<F: Fetcher> Driver<F> {
    async fn run(
        mut self,
        config: ReconcilerConfig,
        mut events: mpsc::Receiver<TransportEvent>,
        mut connection: watch::Receiver<ConnectionState>,
    ) {
        let mut poll = tokio::time::interval_at(
            Instant::now() + config.poll_interval,
            config.poll_interval,
        );
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut connection_open = true;

        // The transport may never connect; the window covers that too.
        self.mode.arm(Instant::now());
        self.refetch().await;
        self.publish(&connection);

        loop {
            let grace = self.mode.grace_deadline();
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else {
                        break;
                    };
                    self.on_transport(event).await;
                }
                _ = poll.tick(), if self.mode.mode() == SyncMode::Poll => {
                    self.refetch().await;
                }
                () = tokio::time::sleep_until(grace.unwrap_or_else(Instant::now)), if grace.is_some() => {
                    if self.mode.poll_due(Instant::now()) {
                        tracing::warn!("no live events within grace window; polling");
                        self.refetch().await;
                        poll.reset();
                    }
                }
                changed = connection.changed(), if connection_open => {
                    connection_open = changed.is_ok();
                }
            }
            self.publish(&connection);
        }
        tracing::debug!("dashboard event source closed");
    }

    async fn on_transport(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected => {
                self.mode.on_connected(Instant::now());
                self.refetch().await;
            }
            TransportEvent::Disconnected => {
                if self.mode.on_disconnected().is_some() {
                    tracing::warn!("push connection lost; polling");
                }
            }
            TransportEvent::Change(change) => {
                if self.mode.on_event(Instant::now()).is_some() {
                    tracing::info!("live events resumed; push mode");
                }
                self.state.apply(&change);
            }
            TransportEvent::Failed => {
                tracing::error!("push connection unavailable; retry required");
                if self.mode.on_disconnected().is_some() {
                    tracing::warn!("push connection failed; polling");
                }
            }
        }
    }

    async fn refetch(&mut self) {
        match self.fetcher.fetch_all().await {
            Ok(snapshot) => {
                self.state.replace(snapshot);
                self.last_refetch = Some(Utc::now());
                self.refetch_error = None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "refetch failed");
                self.refetch_error = Some(e.to_string());
            }
        }
    }

    fn publish(&self, connection: &watch::Receiver<ConnectionState>) {
        self.view_tx.send_replace(DashboardView {
            clients: self.state.clients().items().to_vec(),
            stations: self.state.stations().items().to_vec(),
            payments: self.state.payments().items().to_vec(),
            activity: self.state.activity().iter().cloned().collect(),
            mode: self.mode.mode(),
            connection: connection.borrow().clone(),
            last_refetch: self.last_refetch,
            refetch_error: self.refetch_error.clone(),
        });
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::domain::{ClientStatus, DocumentId};
    use crate::reconciler::fetch::FetchError;

    #[derive(Debug, Clone, Default)]
    struct CountingFetcher {
        calls: Arc<AtomicU32>,
    }

    impl Fetcher for CountingFetcher {
        async fn fetch_all(&self) -> Result<FullSnapshot, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(FullSnapshot::default())
        }
    }

    fn client(name: &str) -> Client {
        let now = Utc::now();
        Client {
            id: DocumentId::new(),
            name: name.to_string(),
            email: "c@example.com".to_string(),
            phone: "9876543210".to_string(),
            vehicle_model: None,
            status: ClientStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    fn config() -> ReconcilerConfig {
        ReconcilerConfig {
            poll_interval: Duration::from_secs(30),
            ..ReconcilerConfig::new("http://localhost:3000")
        }
    }

    async fn wait_for(
        view: &mut watch::Receiver<DashboardView>,
        what: &str,
        f: impl FnMut(&DashboardView) -> bool,
    ) {
        let waited = tokio::time::timeout(Duration::from_secs(600), view.wait_for(f)).await;
        if !matches!(waited, Ok(Ok(_))) {
            panic!("timed out waiting for {what}");
        }
    }

    #[test]
    fn state_applies_insert_update_delete() {
        let mut state = DashboardState::new(10);
        let asha = client("Asha");
        state.apply(&ChangeEvent::written(Operation::Insert, &asha));
        assert_eq!(state.clients().len(), 1);

        let mut renamed = asha.clone();
        renamed.name = "Asha R".to_string();
        let update = ChangeEvent::written(Operation::Update, &renamed);
        state.apply(&update);
        state.apply(&update);
        assert_eq!(state.clients().len(), 1);
        assert_eq!(state.clients().get(asha.id).map(|c| c.name.as_str()), Some("Asha R"));

        state.apply(&ChangeEvent::deleted(&asha));
        assert!(state.clients().is_empty());
        assert_eq!(state.activity().len(), 4);
        let ops: Vec<Operation> = state.activity().iter().map(|e| e.operation).collect();
        assert_eq!(ops.first(), Some(&Operation::Delete));
    }

    #[test]
    fn event_stream_matches_a_fold_by_key() {
        let asha = client("Asha");
        let ravi = client("Ravi");
        let meena = client("Meena");
        let renamed = |c: &Client, name: &str| Client {
            name: name.to_string(),
            ..c.clone()
        };
        let events = [
            ChangeEvent::deleted(&ravi),
            ChangeEvent::written(Operation::Update, &renamed(&meena, "Meena 1")),
            ChangeEvent::written(Operation::Insert, &asha),
            ChangeEvent::written(Operation::Insert, &ravi),
            ChangeEvent::deleted(&asha),
            ChangeEvent::deleted(&asha),
            ChangeEvent::written(Operation::Update, &renamed(&ravi, "Ravi 2")),
            ChangeEvent::written(Operation::Insert, &asha),
            ChangeEvent::written(Operation::Update, &renamed(&meena, "Meena 2")),
            ChangeEvent::written(Operation::Update, &renamed(&ravi, "Ravi 3")),
        ];

        let mut state = DashboardState::new(50);
        let mut expected: std::collections::HashMap<DocumentId, Client> =
            std::collections::HashMap::new();
        for event in &events {
            state.apply(event);
            match event.operation {
                Operation::Delete => {
                    expected.remove(&event.document_key);
                }
                Operation::Insert | Operation::Update => {
                    let Some(doc) = event.document::<Client>() else {
                        panic!("event without document");
                    };
                    expected.insert(doc.id, doc);
                }
            }
        }

        assert_eq!(state.clients().len(), expected.len());
        for (id, doc) in &expected {
            assert_eq!(state.clients().get(*id), Some(doc));
        }
        assert_eq!(
            state.clients().get(meena.id).map(|c| c.name.as_str()),
            Some("Meena 2")
        );
        assert_eq!(state.activity().len(), events.len());
    }

    #[test]
    fn bodyless_upsert_is_logged_but_not_applied() {
        let mut state = DashboardState::new(10);
        let mut event = ChangeEvent::written(Operation::Insert, &client("Ravi"));
        event.full_document = None;
        state.apply(&event);
        assert!(state.clients().is_empty());
        assert_eq!(state.activity().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn falls_back_to_polling_and_recovers_on_event() {
        let fetcher = CountingFetcher::default();
        let calls = Arc::clone(&fetcher.calls);
        let (tx, rx) = mpsc::channel(8);
        let (_conn_tx, conn_rx) = watch::channel(ConnectionState::Connected);
        let dashboard = Dashboard::attach(config(), fetcher, rx, conn_rx);
        let mut view = dashboard.view();

        tokio_test::assert_ok!(tx.send(TransportEvent::Connected).await);
        wait_for(&mut view, "poll mode", |v| v.mode == SyncMode::Poll).await;
        // Initial load, (re)connect, grace expiry.
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 4, "one poll per interval");

        let asha = client("Asha");
        tokio_test::assert_ok!(tx.send(TransportEvent::Change(ChangeEvent::written(Operation::Insert, &asha))).await);
        wait_for(&mut view, "push mode", |v| v.mode == SyncMode::Push).await;
        let current = view.borrow().clone();
        assert_eq!(current.clients.first().map(|c| c.id), Some(asha.id));
        assert_eq!(current.activity.len(), 1);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 4, "no polling in push mode");
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_switches_to_poll() {
        let (tx, rx) = mpsc::channel(8);
        let (_conn_tx, conn_rx) = watch::channel(ConnectionState::Connected);
        let dashboard = Dashboard::attach(config(), CountingFetcher::default(), rx, conn_rx);
        let mut view = dashboard.view();

        tokio_test::assert_ok!(tx.send(TransportEvent::Connected).await);
        let event = ChangeEvent::written(Operation::Insert, &client("Asha"));
        tokio_test::assert_ok!(tx.send(TransportEvent::Change(event)).await);
        wait_for(&mut view, "first event", |v| v.activity.len() == 1).await;

        tokio_test::assert_ok!(tx.send(TransportEvent::Disconnected).await);
        wait_for(&mut view, "poll mode", |v| v.mode == SyncMode::Poll).await;
    }

    #[tokio::test(start_paused = true)]
    async fn polls_when_push_never_connects() {
        let fetcher = CountingFetcher::default();
        let calls = Arc::clone(&fetcher.calls);
        let (_tx, rx) = mpsc::channel(8);
        let (_conn_tx, conn_rx) = watch::channel(ConnectionState::Connecting);
        let dashboard = Dashboard::attach(config(), fetcher, rx, conn_rx);
        let mut view = dashboard.view();

        wait_for(&mut view, "poll mode", |v| v.mode == SyncMode::Poll).await;
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert!(calls.load(Ordering::SeqCst) >= 10, "polling stalled");
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_transport_switches_to_poll() {
        let fetcher = CountingFetcher::default();
        let calls = Arc::clone(&fetcher.calls);
        let (tx, rx) = mpsc::channel(8);
        let (_conn_tx, conn_rx) = watch::channel(ConnectionState::Failed { attempts: 5 });
        let dashboard = Dashboard::attach(config(), fetcher, rx, conn_rx);
        let mut view = dashboard.view();

        tokio_test::assert_ok!(tx.send(TransportEvent::Failed).await);
        wait_for(&mut view, "poll mode", |v| v.mode == SyncMode::Poll).await;
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert!(calls.load(Ordering::SeqCst) >= 10, "polling stalled");
        assert_eq!(view.borrow().connection, ConnectionState::Failed { attempts: 5 });
    }

    #[tokio::test]
    async fn dropping_dashboard_cancels_subscription() {
        let (tx, rx) = mpsc::channel(8);
        let (_conn_tx, conn_rx) = watch::channel(ConnectionState::Connecting);
        let dashboard = Dashboard::attach(config(), CountingFetcher::default(), rx, conn_rx);
        dashboard.shutdown();
        let closed = tokio::time::timeout(Duration::from_secs(5), tx.closed()).await;
        assert!(closed.is_ok(), "event source still held after shutdown");
    }
}
