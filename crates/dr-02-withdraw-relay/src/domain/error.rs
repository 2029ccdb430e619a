//! Relay error types and their HTTP mapping.
//!
//! | Error | Status |
//! |-------|--------|
//! | `UnknownAccount`, `UnsupportedCurrency` | 400 |
//! | `Registry`, `Internal` | 500 |

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dr_01_registry::errors::RegistryError;
use thiserror::Error;

use super::config::ConfigError;

/// Errors raised while serving a withdraw request.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Account not parseable or not in the key set.
    #[error("unknown account: {0}")]
    UnknownAccount(String),

    /// Currency other than `eth` or `usdc`.
    #[error("unsupported currency: {0:?}")]
    UnsupportedCurrency(String),

    /// The registry refused or failed the withdrawal.
    #[error("{0}")]
    Registry(#[from] RegistryError),

    /// The withdrawal task did not complete.
    #[error("internal error: {0}")]
    Internal(String),

    /// Invalid configuration at startup.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Listener could not be bound or served.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

impl RelayError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::UnknownAccount(_) | Self::UnsupportedCurrency(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Rejected before reaching the registry.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status().is_client_error()
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
