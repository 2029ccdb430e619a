//! # Domain Registrar Node
//!
//! Library half of the `registrar-node` binary: configuration from the
//! environment and the runtime that wires the registry, the relay and the
//! event feed together.
//!
//! ## Modules
//!
//! - `config/` - `NodeConfig::from_env()` and validation
//! - `runtime/` - `RegistrarNode` startup and shutdown

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod runtime;

pub use config::{ConfigError, NodeConfig};
pub use runtime::{NodeError, RegistrarNode, SHUTDOWN_GRACE};

/// Node version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
