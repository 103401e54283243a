//! Domain layer: documents, change events, and concurrent storage.
//!
//! This module contains the server-side domain model: the shared
//! [`DocumentId`], the three tracked entities with their hand-written
//! validators, the [`ChangeEvent`] envelope, and the [`Collection`] store
//! that route handlers write through.

pub mod audit;
pub mod change_event;
pub mod client;
pub mod collection;
pub mod document;
pub mod document_id;
pub mod payment;
pub mod station;
pub mod validation;

pub use audit::AuditEntry;
pub use change_event::{ChangeEvent, EventKind, Operation};
pub use client::{Client, ClientPatch, ClientStatus, NewClient};
pub use collection::Collection;
pub use document::Document;
pub use document_id::DocumentId;
pub use payment::{NewPayment, Payment, PaymentStatus};
pub use station::{ConnectorType, NewStation, Station, StationPatch, StationStatus};
