//! # Adapters Layer
//!
//! In-memory implementations of the outbound ports, used by tests and by the
//! node when no external chain is wired in.

pub mod oracle;
pub mod stablecoin;
pub mod vault;

pub use oracle::FixedRateOracle;
pub use stablecoin::InMemoryStablecoin;
pub use vault::InMemoryNativeVault;
