//! # Ports Layer
//!
//! - **Inbound (API)**: what the registry offers its callers.
//! - **Outbound (SPI)**: what the registry needs from the outside world.

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
