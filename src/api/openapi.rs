//! OpenAPI document for the REST surface.

use utoipa::OpenApi;

use super::dto::{PaginationMeta, PaymentOrderResponse, VerifyPaymentRequest, WebhookAck};
use super::handlers::{clients, dashboard, payments, stations, system};
use crate::domain::{
    AuditEntry, Client, ClientPatch, ClientStatus, ConnectorType, DocumentId, NewClient,
    NewPayment, NewStation, Payment, PaymentStatus, Station, StationPatch, StationStatus,
};
use crate::error::{ErrorBody, ErrorResponse};
use crate::service::DashboardStats;

/// Generated OpenAPI description, served at `/api-docs/openapi.json`.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "EV Slot Gateway API",
        description = "Booking documents, payment verification and change events for EV charging dashboards"
    ),
    paths(
        clients::create_client,
        clients::list_clients,
        clients::get_client,
        clients::update_client,
        clients::delete_client,
        stations::create_station,
        stations::list_stations,
        stations::get_station,
        stations::update_station,
        stations::delete_station,
        payments::create_payment,
        payments::list_payments,
        payments::get_payment,
        payments::verify_payment,
        payments::payment_webhook,
        dashboard::dashboard_stats,
        dashboard::audit_logs,
        system::health_handler,
    ),
    components(schemas(
        DocumentId,
        Client,
        ClientStatus,
        NewClient,
        ClientPatch,
        Station,
        StationStatus,
        ConnectorType,
        NewStation,
        StationPatch,
        Payment,
        PaymentStatus,
        NewPayment,
        PaymentOrderResponse,
        VerifyPaymentRequest,
        WebhookAck,
        AuditEntry,
        DashboardStats,
        PaginationMeta,
        ErrorResponse,
        ErrorBody,
    )),
    tags(
        (name = "Clients", description = "EV owners"),
        (name = "Stations", description = "Charging stations"),
        (name = "Payments", description = "Orders, checkout verification and provider webhooks"),
        (name = "Dashboard", description = "Aggregates and audit trail"),
        (name = "System", description = "Health checks"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/v1/clients",
            "/api/v1/clients/{id}",
            "/api/v1/stations/{id}",
            "/api/v1/payments/verify",
            "/api/v1/webhooks/payments",
            "/api/v1/dashboard/stats",
            "/health",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path} missing");
        }
    }
}
