//! Service layer: the change source.
//!
//! [`StoreService`] performs every write on the document collections and,
//! only once a write has succeeded, publishes the matching change event
//! and records the audit entry.

pub mod stats;
pub mod store_service;

pub use stats::DashboardStats;
pub use store_service::{ListFilter, StoreService};
