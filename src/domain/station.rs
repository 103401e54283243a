//! Charging stations that slots are booked on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{Document, DocumentId, EventKind, validation};
use crate::error::GatewayError;

/// Upper bound accepted for a charger's rated power.
pub const MAX_POWER_KW: f64 = 400.0;

/// Plug standard offered by a station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorType {
    /// Combined Charging System 2.
    Ccs2,
    /// CHAdeMO.
    Chademo,
    /// IEC Type 2 AC.
    Type2,
    /// GB/T.
    Gbt,
}

/// Operational state of a station.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StationStatus {
    /// Free for booking.
    #[default]
    Available,
    /// Currently charging a vehicle.
    Occupied,
    /// Taken down for service.
    Maintenance,
    /// Not reporting.
    Offline,
}

impl StationStatus {
    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Occupied => "occupied",
            Self::Maintenance => "maintenance",
            Self::Offline => "offline",
        }
    }
}

/// A charging station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Station {
    /// Document key.
    pub id: DocumentId,
    /// Display name.
    pub name: String,
    /// Unique operator code (upper-case).
    pub code: String,
    /// Free-form address or landmark.
    pub location: String,
    /// Plug standard.
    pub connector_type: ConnectorType,
    /// Rated power in kilowatts.
    pub power_kw: f64,
    /// Tariff in paise per kWh.
    pub price_per_kwh_paise: u64,
    /// Operational state.
    pub status: StationStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Document for Station {
    const KIND: EventKind = EventKind::StationUpdate;
    const LABEL: &'static str = "station";

    fn id(&self) -> DocumentId {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn unique_key(&self) -> Option<&str> {
        Some(&self.code)
    }
}

/// Request body for `POST /stations`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewStation {
    /// Display name.
    pub name: String,
    /// Operator code.
    pub code: String,
    /// Address or landmark.
    pub location: String,
    /// Plug standard.
    pub connector_type: ConnectorType,
    /// Rated power in kilowatts.
    pub power_kw: f64,
    /// Tariff in paise per kWh.
    pub price_per_kwh_paise: u64,
    /// Initial status, `available` when omitted.
    #[serde(default)]
    pub status: Option<StationStatus>,
}

fn tariff(value: u64) -> Result<u64, GatewayError> {
    if value == 0 {
        return Err(GatewayError::InvalidRequest(
            "price_per_kwh_paise must be positive".to_string(),
        ));
    }
    Ok(value)
}

impl NewStation {
    /// Validates the request and builds a fresh [`Station`].
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] naming the first bad field.
    pub fn validate(self) -> Result<Station, GatewayError> {
        let now = Utc::now();
        Ok(Station {
            id: DocumentId::new(),
            name: validation::required_text("name", &self.name)?,
            code: validation::station_code(&self.code)?,
            location: validation::required_text("location", &self.location)?,
            connector_type: self.connector_type,
            power_kw: validation::positive("power_kw", self.power_kw, MAX_POWER_KW)?,
            price_per_kwh_paise: tariff(self.price_per_kwh_paise)?,
            status: self.status.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        })
    }
}

/// Request body for `PATCH /stations/{id}`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct StationPatch {
    /// New display name.
    #[serde(default)]
    pub name: Option<String>,
    /// New location.
    #[serde(default)]
    pub location: Option<String>,
    /// New plug standard.
    #[serde(default)]
    pub connector_type: Option<ConnectorType>,
    /// New rated power.
    #[serde(default)]
    pub power_kw: Option<f64>,
    /// New tariff.
    #[serde(default)]
    pub price_per_kwh_paise: Option<u64>,
    /// New status.
    #[serde(default)]
    pub status: Option<StationStatus>,
}

impl StationPatch {
    /// Applies the patch on top of `current`. The station code is immutable.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] for an empty patch or a bad
    /// field.
    pub fn apply(self, current: &Station) -> Result<Station, GatewayError> {
        if self.name.is_none()
            && self.location.is_none()
            && self.connector_type.is_none()
            && self.power_kw.is_none()
            && self.price_per_kwh_paise.is_none()
            && self.status.is_none()
        {
            return Err(GatewayError::InvalidRequest("no fields to update".to_string()));
        }
        let mut next = current.clone();
        if let Some(name) = self.name {
            next.name = validation::required_text("name", &name)?;
        }
        if let Some(location) = self.location {
            next.location = validation::required_text("location", &location)?;
        }
        if let Some(connector_type) = self.connector_type {
            next.connector_type = connector_type;
        }
        if let Some(power_kw) = self.power_kw {
            next.power_kw = validation::positive("power_kw", power_kw, MAX_POWER_KW)?;
        }
        if let Some(price) = self.price_per_kwh_paise {
            next.price_per_kwh_paise = tariff(price)?;
        }
        if let Some(status) = self.status {
            next.status = status;
        }
        next.updated_at = Utc::now();
        Ok(next)
    }
}
