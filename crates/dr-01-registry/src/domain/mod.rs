//! # Domain Layer (Inner Hexagon)
//!
//! Pure registry logic: hierarchy, pricing, ledger, access control and the
//! event log. No I/O and no async; external transfers happen in the service
//! through the ports.

pub mod access;
pub mod entities;
pub mod event_log;
pub mod ledger;
pub mod pricing;
pub mod snapshot;
pub mod state;
pub mod tree;
pub mod value_objects;

pub use access::*;
pub use entities::*;
pub use event_log::*;
pub use ledger::*;
pub use pricing::*;
pub use snapshot::*;
pub use state::*;
pub use tree::*;
pub use value_objects::*;
