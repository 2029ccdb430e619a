//! Withdraw relay service.
//!
//! `POST /withdraw/:account?currency=eth|usdc` withdraws the account's whole
//! balance in that currency and answers once the registry has committed the
//! payout. `/health` and `/metrics` are served alongside.

use crate::domain::config::{parse_currency, KeySet, RelayConfig};
use crate::domain::error::RelayError;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use dr_01_registry::ports::inbound::DomainRegistryApi;
use registrar_telemetry::{
    encode_metrics, metrics_content_type, WITHDRAW_DURATION, WITHDRAW_REQUESTS,
};
use serde::{Deserialize, Serialize};
use shared_types::{Address, Currency};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

/// Withdraw relay.
pub struct WithdrawRelay {
    config: RelayConfig,
    state: RelayState,
}

/// Shared handler state.
#[derive(Clone)]
pub struct RelayState {
    registry: Arc<dyn DomainRegistryApi>,
    keys: Arc<KeySet>,
}

/// Body of a successful withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawReceipt {
    /// Correlates the response with the relay's log lines.
    pub request_id: String,
    /// Account paid.
    pub account: Address,
    /// `eth` or `usdc`.
    pub currency: String,
    /// Amount paid in smallest units, decimal.
    pub amount: String,
    /// Amount paid in whole units.
    pub formatted: String,
}

#[derive(Debug, Deserialize)]
struct WithdrawQuery {
    currency: Option<String>,
}

impl WithdrawRelay {
    /// Create a relay in front of `registry`.
    ///
    /// # Errors
    ///
    /// `RelayError::Config` if the configuration does not validate.
    pub fn new(
        config: RelayConfig,
        registry: Arc<dyn DomainRegistryApi>,
    ) -> Result<Self, RelayError> {
        config.validate()?;
        let state = RelayState {
            registry,
            keys: Arc::new(config.key_set()),
        };
        Ok(Self { config, state })
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Build the HTTP router.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/withdraw/:account", post(handle_withdraw))
            .route("/health", get(health_check))
            .route("/metrics", get(metrics))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Bind the configured address and serve until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// `RelayError::Server` if the address cannot be bound or serving fails.
    pub async fn start<F>(self, shutdown: F) -> Result<(), RelayError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.bind_addr()).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// `RelayError::Server` if serving fails.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), RelayError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        info!(
            addr = %addr,
            accounts = self.state.keys.len(),
            "Withdraw relay listening"
        );
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;
        info!("Withdraw relay stopped");
        Ok(())
    }
}

/// Handle `POST /withdraw/:account`.
async fn handle_withdraw(
    State(state): State<RelayState>,
    Path(account): Path<String>,
    Query(query): Query<WithdrawQuery>,
) -> Result<Json<WithdrawReceipt>, RelayError> {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("withdraw", %request_id, account = %account);
    let _timer = WITHDRAW_DURATION.start_timer();

    let currency = query.currency.as_deref().and_then(parse_currency);
    let result = withdraw(&state, &account, query.currency.as_deref(), request_id)
        .instrument(span.clone())
        .await;

    let outcome = match &result {
        Ok(_) => "ok",
        Err(e) if e.is_client_error() => "rejected",
        Err(_) => "failed",
    };
    let label = currency.map_or("invalid", Currency::ticker);
    WITHDRAW_REQUESTS.with_label_values(&[label, outcome]).inc();

    span.in_scope(|| match &result {
        Ok(receipt) => info!(amount = %receipt.amount, currency = label, "Withdrawal relayed"),
        Err(e) => warn!(error = %e, status = e.status().as_u16(), "Withdrawal refused"),
    });
    result.map(Json)
}

async fn withdraw(
    state: &RelayState,
    raw_account: &str,
    raw_currency: Option<&str>,
    request_id: Uuid,
) -> Result<WithdrawReceipt, RelayError> {
    let account = state
        .keys
        .resolve(raw_account)
        .ok_or_else(|| RelayError::UnknownAccount(raw_account.to_string()))?;
    let raw_currency = raw_currency.unwrap_or_default();
    let currency = parse_currency(raw_currency)
        .ok_or_else(|| RelayError::UnsupportedCurrency(raw_currency.to_string()))?;

    // The registry call runs detached so a dropped connection cannot cancel
    // it between zeroing the balance and paying out.
    let registry = Arc::clone(&state.registry);
    let task = tokio::spawn(async move {
        match currency {
            Currency::Native => registry
                .withdraw(account)
                .await
                .map(|paid| (paid.raw(), paid.format_units())),
            Currency::Stable => registry
                .withdraw_usdc(account)
                .await
                .map(|paid| (paid.raw(), paid.format_units())),
        }
    });
    let (raw, formatted) = task
        .await
        .map_err(|e| RelayError::Internal(e.to_string()))??;

    Ok(WithdrawReceipt {
        request_id: request_id.to_string(),
        account,
        currency: currency.ticker().to_string(),
        amount: raw.to_string(),
        formatted,
    })
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": crate::VERSION,
    }))
}

/// Prometheus scrape endpoint
async fn metrics() -> impl IntoResponse {
    match encode_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, metrics_content_type())],
            body,
        )
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}
