//! # Shared Types Crate
//!
//! Identity and value types used by every crate in the workspace.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: `Address`, `Currency` and the amount types are
//!   defined once here.
//! - **No Mixed Units**: `NativeAmount` and `StableAmount` never convert
//!   implicitly; conversion is the pricing engine's job.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
