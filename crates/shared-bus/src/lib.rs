//! # Shared Bus
//!
//! In-process event bus the validator's subsystems use to publish and
//! subscribe to state transitions (transaction commits, fee updates, MEV
//! alerts, peer lifecycle, resource pressure) without calling each other
//! directly.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │ banking-stage│                    │  telemetry   │
//! │              │    publish()       │              │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │          │
//!                  │              │ ─────────┘
//!                  └──────────────┘  subscribe()
//! ```
//!
//! The nonce cache guards the cluster membership and QUIC transport message
//! paths against replay; events crossing those boundaries are validated
//! before being published here.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod nonce_cache;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{EventFilter, EventTopic, ValidatorEvent};
pub use nonce_cache::TimeBoundedNonceCache;
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, EventSubscriber, Subscription, SubscriptionError};

/// Current protocol version for event bus messages.
pub const PROTOCOL_VERSION: u16 = 1;

/// Maximum events to buffer per subscriber before backpressure.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Dead Letter Queue topic for failed messages.
pub const DLQ_TOPIC: &str = "dlq.critical";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_version() {
        assert_eq!(PROTOCOL_VERSION, 1);
    }

    #[test]
    fn test_default_capacity() {
        assert_eq!(DEFAULT_CHANNEL_CAPACITY, 1000);
    }
}
