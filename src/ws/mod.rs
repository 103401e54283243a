//! WebSocket layer: the push gateway.
//!
//! The endpoint at `/ws` forwards change events to connected dashboards,
//! filtered by the per-user rooms each connection has joined.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod rooms;
