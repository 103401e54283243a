//! Store service: validated writes followed by change publication.

use crate::domain::{
    AuditEntry, ChangeEvent, Client, ClientPatch, Collection, Document, DocumentId, NewClient,
    NewPayment, NewStation, Operation, Payment, PaymentStatus, Station, StationPatch,
};
use crate::error::GatewayError;
use crate::persistence::AuditStore;
use crate::relay::{EventPublisher, PublishOutcome};

use super::DashboardStats;

/// Optional filters shared by the list endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    /// Case-insensitive substring matched against the searchable fields.
    pub search: Option<String>,
    /// Exact status wire name (e.g. `"active"`).
    pub status: Option<String>,
}

impl ListFilter {
    fn matches_status(&self, status: &str) -> bool {
        self.status.as_deref().is_none_or(|wanted| wanted == status)
    }

    fn matches_text(&self, fields: &[&str]) -> bool {
        let Some(needle) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
            return true;
        };
        let needle = needle.to_lowercase();
        fields.iter().any(|f| f.to_lowercase().contains(&needle))
    }
}

/// Orchestration layer for all document writes.
///
/// Every mutation follows the same sequence: validate → write one document
/// → publish one [`ChangeEvent`] → record the audit entry. Publishing and
/// auditing are best-effort and never turn a committed write into an
/// error. A failed write publishes nothing.
#[derive(Debug)]
pub struct StoreService {
    clients: Collection<Client>,
    stations: Collection<Station>,
    payments: Collection<Payment>,
    publisher: EventPublisher,
    audit: AuditStore,
}

impl StoreService {
    /// Creates a service with empty collections.
    #[must_use]
    pub fn new(publisher: EventPublisher, audit: AuditStore) -> Self {
        Self {
            clients: Collection::new(),
            stations: Collection::new(),
            payments: Collection::new(),
            publisher,
            audit,
        }
    }

    /// Returns the audit store.
    #[must_use]
    pub fn audit(&self) -> &AuditStore {
        &self.audit
    }

    /// Publishes the event for a committed write, then audits it.
    async fn commit<T: Document>(&self, operation: Operation, document: &T) -> PublishOutcome {
        let event = ChangeEvent::written(operation, document);
        let outcome = self.publisher.publish(&event).await;
        self.audit.record(&AuditEntry::from_event(&event)).await;
        outcome
    }

    // ── Clients ─────────────────────────────────────────────────────────

    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] on validation failure or
    /// [`GatewayError::Conflict`] if the email is taken.
    pub async fn create_client(&self, req: NewClient) -> Result<Client, GatewayError> {
        let client = self.clients.insert(req.validate()?).await?;
        self.commit(Operation::Insert, &client).await;
        tracing::info!(id = %client.id, "client created");
        Ok(client)
    }

    /// Applies a partial update to a client.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`], a validation error, or a
    /// conflict on a taken email.
    pub async fn update_client(
        &self,
        id: DocumentId,
        patch: ClientPatch,
    ) -> Result<Client, GatewayError> {
        let client = self.clients.update(id, |cur| patch.apply(cur)).await?;
        self.commit(Operation::Update, &client).await;
        tracing::info!(%id, status = client.status.as_str(), "client updated");
        Ok(client)
    }

    /// Deletes a client.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] if the client does not exist.
    pub async fn delete_client(&self, id: DocumentId) -> Result<Client, GatewayError> {
        let client = self.clients.remove(id).await?;
        self.commit(Operation::Delete, &client).await;
        tracing::info!(%id, "client deleted");
        Ok(client)
    }

    /// Fetches one client.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] if the client does not exist.
    pub async fn get_client(&self, id: DocumentId) -> Result<Client, GatewayError> {
        self.clients.get(id).await
    }

    /// Lists clients matching `filter`, newest first.
    pub async fn list_clients(&self, filter: &ListFilter) -> Vec<Client> {
        self.clients
            .list(|c| {
                filter.matches_status(c.status.as_str())
                    && filter.matches_text(&[&c.name, &c.email, &c.phone])
            })
            .await
    }

    // ── Stations ────────────────────────────────────────────────────────

    /// Creates a station.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] on validation failure or
    /// [`GatewayError::Conflict`] if the code is taken.
    pub async fn create_station(&self, req: NewStation) -> Result<Station, GatewayError> {
        let station = self.stations.insert(req.validate()?).await?;
        self.commit(Operation::Insert, &station).await;
        tracing::info!(id = %station.id, code = %station.code, "station created");
        Ok(station)
    }

    /// Applies a partial update to a station.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] or a validation error.
    pub async fn update_station(
        &self,
        id: DocumentId,
        patch: StationPatch,
    ) -> Result<Station, GatewayError> {
        let station = self.stations.update(id, |cur| patch.apply(cur)).await?;
        self.commit(Operation::Update, &station).await;
        tracing::info!(%id, status = station.status.as_str(), "station updated");
        Ok(station)
    }

    /// Deletes a station.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] if the station does not exist.
    pub async fn delete_station(&self, id: DocumentId) -> Result<Station, GatewayError> {
        let station = self.stations.remove(id).await?;
        self.commit(Operation::Delete, &station).await;
        tracing::info!(%id, "station deleted");
        Ok(station)
    }

    /// Fetches one station.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] if the station does not exist.
    pub async fn get_station(&self, id: DocumentId) -> Result<Station, GatewayError> {
        self.stations.get(id).await
    }

    /// Lists stations matching `filter`, newest first.
    pub async fn list_stations(&self, filter: &ListFilter) -> Vec<Station> {
        self.stations
            .list(|s| {
                filter.matches_status(s.status.as_str())
                    && filter.matches_text(&[&s.name, &s.code, &s.location])
            })
            .await
    }

    // ── Payments ────────────────────────────────────────────────────────

    /// Creates a payment order for an existing client (and station, if
    /// given).
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] for an unknown client or station,
    /// or a validation error.
    pub async fn create_payment(&self, req: NewPayment) -> Result<Payment, GatewayError> {
        self.clients.get(req.client_id).await?;
        if let Some(station_id) = req.station_id {
            self.stations.get(station_id).await?;
        }
        let payment = self.payments.insert(req.validate()?).await?;
        self.commit(Operation::Insert, &payment).await;
        tracing::info!(id = %payment.id, order_id = %payment.order_id, "payment order created");
        Ok(payment)
    }

    /// Fetches one payment.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] if the payment does not exist.
    pub async fn get_payment(&self, id: DocumentId) -> Result<Payment, GatewayError> {
        self.payments.get(id).await
    }

    /// Looks a payment up by provider order reference.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] for an unknown order.
    pub async fn payment_by_order(&self, order_id: &str) -> Result<Payment, GatewayError> {
        self.payments
            .find(|p| p.order_id == order_id)
            .await
            .ok_or_else(|| GatewayError::not_found(Payment::LABEL, order_id))
    }

    /// Lists payments matching `filter`, newest first.
    pub async fn list_payments(&self, filter: &ListFilter) -> Vec<Payment> {
        self.payments
            .list(|p| {
                filter.matches_status(p.status.as_str())
                    && filter.matches_text(&[
                        &p.order_id,
                        p.provider_payment_id.as_deref().unwrap_or_default(),
                    ])
            })
            .await
    }

    /// Marks the order captured. Re-capturing with the same provider
    /// reference is a no-op and publishes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] for an unknown order or
    /// [`GatewayError::Conflict`] if it cannot be captured.
    pub async fn capture_payment(
        &self,
        order_id: &str,
        provider_payment_id: &str,
    ) -> Result<Payment, GatewayError> {
        let current = self.payment_by_order(order_id).await?;
        if current.status == PaymentStatus::Captured
            && current.provider_payment_id.as_deref() == Some(provider_payment_id)
        {
            return Ok(current);
        }
        let payment = self
            .payments
            .update(current.id, |cur| cur.captured(provider_payment_id))
            .await?;
        self.commit(Operation::Update, &payment).await;
        tracing::info!(id = %payment.id, %order_id, "payment captured");
        Ok(payment)
    }

    /// Marks the order failed. Settled orders are returned unchanged and
    /// publish nothing.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] for an unknown order.
    pub async fn fail_payment(&self, order_id: &str) -> Result<Payment, GatewayError> {
        let current = self.payment_by_order(order_id).await?;
        if current.status != PaymentStatus::Created {
            return Ok(current);
        }
        let payment = self
            .payments
            .update(current.id, |cur| Ok(cur.failed()))
            .await?;
        self.commit(Operation::Update, &payment).await;
        tracing::warn!(id = %payment.id, %order_id, "payment failed");
        Ok(payment)
    }

    // ── Aggregates ──────────────────────────────────────────────────────

    /// Computes the dashboard aggregate over all collections.
    pub async fn stats(&self) -> DashboardStats {
        let all = ListFilter::default();
        let clients = self.list_clients(&all).await;
        let stations = self.list_stations(&all).await;
        let payments = self.list_payments(&all).await;
        DashboardStats::compute(&clients, &stations, &payments)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use tokio::sync::broadcast;

    use super::*;
    use crate::domain::{ClientStatus, ConnectorType, EventKind};
    use crate::relay::EventBus;

    fn make_service() -> (StoreService, broadcast::Receiver<ChangeEvent>) {
        let bus = EventBus::new(64);
        let rx = bus.subscribe();
        let service = StoreService::new(EventPublisher::Local(bus), AuditStore::Disabled);
        (service, rx)
    }

    fn new_client(email: &str) -> NewClient {
        NewClient {
            name: "Asha Rao".to_string(),
            email: email.to_string(),
            phone: "9876543210".to_string(),
            vehicle_model: None,
            status: None,
        }
    }

    fn new_station(code: &str) -> NewStation {
        NewStation {
            name: "Hub".to_string(),
            code: code.to_string(),
            location: "MG Road".to_string(),
            connector_type: ConnectorType::Type2,
            power_kw: 22.0,
            price_per_kwh_paise: 1500,
            status: None,
        }
    }

    async fn next(rx: &mut broadcast::Receiver<ChangeEvent>) -> ChangeEvent {
        let Ok(event) = rx.recv().await else {
            panic!("expected an event");
        };
        event
    }

    #[tokio::test]
    async fn client_lifecycle_emits_insert_update_delete() {
        let (service, mut rx) = make_service();

        let Ok(client) = service.create_client(new_client("asha@example.com")).await else {
            panic!("create failed");
        };
        let inserted = next(&mut rx).await;
        assert_eq!(inserted.event, EventKind::ClientUpdate);
        assert_eq!(inserted.operation, Operation::Insert);
        assert_eq!(inserted.document_key, client.id);
        let Some(body) = inserted.full_document else {
            panic!("insert without body");
        };
        assert_eq!(body["name"], "Asha Rao");

        let patch = ClientPatch {
            status: Some(ClientStatus::Inactive),
            ..ClientPatch::default()
        };
        assert!(service.update_client(client.id, patch).await.is_ok());
        let updated = next(&mut rx).await;
        assert_eq!(updated.operation, Operation::Update);
        assert_eq!(updated.document_key, client.id);

        assert!(service.delete_client(client.id).await.is_ok());
        let deleted = next(&mut rx).await;
        assert_eq!(deleted.operation, Operation::Delete);
        assert_eq!(deleted.document_key, client.id);
        assert!(deleted.full_document.is_none());

        assert!(rx.try_recv().is_err(), "each write publishes exactly once");
    }

    #[tokio::test]
    async fn failed_writes_publish_nothing() {
        let (service, mut rx) = make_service();
        assert!(service.create_client(new_client("a@example.com")).await.is_ok());
        let _ = next(&mut rx).await;

        assert!(service.create_client(new_client("a@example.com")).await.is_err());
        assert!(service.create_client(new_client("bad")).await.is_err());
        assert!(service.delete_client(DocumentId::new()).await.is_err());
        assert!(service
            .update_station(DocumentId::new(), StationPatch::default())
            .await
            .is_err());

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn write_succeeds_with_no_subscribers() {
        let service = StoreService::new(EventPublisher::Local(EventBus::new(4)), AuditStore::Disabled);
        assert!(service.create_station(new_station("blr-01")).await.is_ok());
    }

    #[tokio::test]
    async fn payment_requires_known_client() {
        let (service, _rx) = make_service();
        let req = NewPayment {
            client_id: DocumentId::new(),
            station_id: None,
            amount_paise: 5000,
            currency: None,
        };
        assert!(matches!(
            service.create_payment(req).await,
            Err(GatewayError::NotFound { entity: "client", .. })
        ));
    }

    #[tokio::test]
    async fn payment_events_target_paying_client() {
        let (service, mut rx) = make_service();
        let Ok(client) = service.create_client(new_client("p@example.com")).await else {
            panic!("create failed");
        };
        let _ = next(&mut rx).await;

        let req = NewPayment {
            client_id: client.id,
            station_id: None,
            amount_paise: 5000,
            currency: None,
        };
        let Ok(payment) = service.create_payment(req).await else {
            panic!("payment failed");
        };
        let created = next(&mut rx).await;
        assert_eq!(created.event, EventKind::PaymentUpdate);
        assert_eq!(created.user_id, Some(client.id));

        assert!(service.capture_payment(&payment.order_id, "pay_1").await.is_ok());
        let captured = next(&mut rx).await;
        assert_eq!(captured.operation, Operation::Update);

        // Same reference again: nothing written, nothing published.
        assert!(service.capture_payment(&payment.order_id, "pay_1").await.is_ok());
        assert!(rx.try_recv().is_err());

        let stats = service.stats().await;
        assert_eq!(stats.captured_payments, 1);
        assert_eq!(stats.revenue_paise, 5000);
    }

    #[tokio::test]
    async fn list_filters_by_status_and_search() {
        let (service, _rx) = make_service();
        let _ = service.create_station(new_station("blr-01")).await;
        let mut busy = new_station("del-02");
        busy.status = Some(crate::domain::StationStatus::Occupied);
        busy.location = "Connaught Place".to_string();
        let _ = service.create_station(busy).await;

        let occupied = ListFilter {
            status: Some("occupied".to_string()),
            ..ListFilter::default()
        };
        assert_eq!(service.list_stations(&occupied).await.len(), 1);

        let search = ListFilter {
            search: Some("connaught".to_string()),
            ..ListFilter::default()
        };
        let found = service.list_stations(&search).await;
        assert_eq!(found.len(), 1);
        assert_eq!(found.first().map(|s| s.code.as_str()), Some("DEL-02"));
    }
}
