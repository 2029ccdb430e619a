//! # Domain Registrar Test Suite
//!
//! Unified test crate for flows that cross crate boundaries.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── flows.rs              # Registry + bus + feed + snapshots
//!     └── e2e_registration.rs   # Registry behind the withdraw relay
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p dr-tests
//! cargo test -p dr-tests integration::e2e_registration
//! ```

pub mod integration;
