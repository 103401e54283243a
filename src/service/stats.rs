//! Dashboard aggregate computed over all collections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Client, ClientStatus, Payment, PaymentStatus, Station, StationStatus};

/// Counts and revenue shown on the operator dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DashboardStats {
    /// All clients.
    pub total_clients: u64,
    /// Clients with `active` status.
    pub active_clients: u64,
    /// All stations.
    pub total_stations: u64,
    /// Stations free for booking.
    pub available_stations: u64,
    /// Stations currently charging.
    pub occupied_stations: u64,
    /// Stations in maintenance or offline.
    pub unavailable_stations: u64,
    /// All payments.
    pub total_payments: u64,
    /// Captured payments.
    pub captured_payments: u64,
    /// Payments still awaiting checkout.
    pub pending_payments: u64,
    /// Sum of captured amounts, in paise.
    pub revenue_paise: u64,
    /// When the aggregate was computed.
    pub generated_at: DateTime<Utc>,
}

impl DashboardStats {
    /// Folds the three collections into one aggregate.
    #[must_use]
    pub fn compute(clients: &[Client], stations: &[Station], payments: &[Payment]) -> Self {
        let mut stats = Self {
            total_clients: clients.len() as u64,
            total_stations: stations.len() as u64,
            total_payments: payments.len() as u64,
            generated_at: Utc::now(),
            ..Self::default()
        };
        stats.active_clients = clients
            .iter()
            .filter(|c| c.status == ClientStatus::Active)
            .count() as u64;
        for station in stations {
            match station.status {
                StationStatus::Available => stats.available_stations += 1,
                StationStatus::Occupied => stats.occupied_stations += 1,
                StationStatus::Maintenance | StationStatus::Offline => {
                    stats.unavailable_stations += 1;
                }
            }
        }
        for payment in payments {
            match payment.status {
                PaymentStatus::Captured => {
                    stats.captured_payments += 1;
                    stats.revenue_paise = stats.revenue_paise.saturating_add(payment.amount_paise);
                }
                PaymentStatus::Created => stats.pending_payments += 1,
                PaymentStatus::Failed | PaymentStatus::Refunded => {}
            }
        }
        stats
    }
}
