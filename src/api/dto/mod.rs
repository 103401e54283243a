//! Data Transfer Objects for REST request/response serialization.
//!
//! Documents themselves (clients, stations, payments) are exchanged as
//! their domain types; this module holds the envelopes and the
//! endpoint-specific shapes around them.

pub mod common_dto;
pub mod payment_dto;

pub use common_dto::*;
pub use payment_dto::*;
