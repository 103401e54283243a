//! Event relay: fan-out of change events from writers to the push gateway.
//!
//! A single logical channel carries every event kind; consumers filter on
//! the `event` field. Delivery is at-most-once with no replay.

pub mod event_bus;
pub mod publisher;
pub mod redis_bridge;

pub use event_bus::EventBus;
pub use publisher::{EventPublisher, PublishOutcome, RedisPublisher};
pub use redis_bridge::{RedisBridge, RelayStatus};
