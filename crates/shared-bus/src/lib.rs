//! # Shared Bus - Event Bus for Registry Notifications
//!
//! Carries the registry's committed events to external consumers (the
//! frontend's realtime registration table, log shippers, tests).
//!
//! ## Flow
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │   Registry   │                    │   Consumer   │
//! │   service    │    publish()       │              │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │          │
//!                  │              │ ─────────┘
//!                  └──────────────┘  subscribe()
//! ```
//!
//! The bus is live-only. History lives in the registry's event log; every
//! [`EventRecord`] carries its log sequence so the two can be joined.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{EventFilter, EventRecord, EventTopic, RegistryEvent};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before it lags.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
