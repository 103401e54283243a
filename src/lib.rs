//! # evslot-gateway
//!
//! REST API, change relay and WebSocket push gateway for EV charging slot
//! booking dashboards, plus the client-side reconciler those dashboards run.
//!
//! Every successful write on a client, station or payment publishes one
//! change event. Events travel through a relay (Redis pub/sub, or an
//! in-process bus when Redis is off) to the push gateway, which forwards
//! them to WebSocket connections by per-user room. Dashboards apply them
//! to a local snapshot and fall back to periodic refetch when the push
//! path goes quiet.
//!
//! ## Architecture
//!
//! ```text
//! Dashboards (HTTP, WebSocket)        reconciler/  (evslot-watch)
//!     │                                   ▲
//!     ├── REST Handlers (api/)            │ events / refetch
//!     ├── WS Push Gateway (ws/) ──────────┘
//!     │        ▲
//!     │        │ EventBus (relay/) ◄── RedisBridge ◄── Redis channel
//!     │                                                   ▲
//!     ├── StoreService (service/) ── EventPublisher ──────┘
//!     │        │
//!     │        ├── Collections (domain/)
//!     │        └── AuditStore (persistence/) ── PostgreSQL
//!     │
//!     └── ReadCache (cache/) ── memory or Redis
//! ```

pub mod api;
pub mod app_state;
pub mod backoff;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod reconciler;
pub mod relay;
pub mod service;
pub mod signature;
pub mod ws;
