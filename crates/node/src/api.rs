//! HTTP surface of the wallet node.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

use purse_ledger::{
    BalanceReporter, LedgerStore, SettlementEngine, SettlementError, StoreError, UnspentRecord,
};

/// Shared handles the handlers operate on
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LedgerStore>,
    pub engine: Arc<SettlementEngine>,
    pub reporter: Arc<BalanceReporter>,
}

/// Errors a handler can bubble up to the client
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Settlement(#[from] SettlementError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Settlement(SettlementError::BelowDust { .. })
            | ApiError::Settlement(SettlementError::InsufficientFunds(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Settlement(SettlementError::Contention { .. }) => StatusCode::CONFLICT,
            ApiError::Settlement(SettlementError::Store(_)) | ApiError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status.is_server_error() {
            error!("request failed: {}", self);
            // Backend details stay in the log
            (status, "internal ledger error".to_string()).into_response()
        } else {
            debug!("request rejected: {}", self);
            (status, self.to_string()).into_response()
        }
    }
}

/// Build the application router
pub fn router(state: AppState, allowed_origin: HeaderValue) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(allowed_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true);

    Router::new()
        .route("/balance", get(balance))
        .route("/transactions", get(transactions))
        .route("/transfer", post(transfer))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct BalanceResponse {
    /// Spendable balance, fixed to five decimal places
    #[serde(rename = "BTC_balance")]
    btc_balance: String,
    /// Converted balance to two decimal places, or "unavailable"
    #[serde(rename = "EUR_balance")]
    eur_balance: String,
}

async fn balance(State(state): State<AppState>) -> Result<Json<BalanceResponse>, ApiError> {
    let report = state.reporter.report().await?;

    let eur_balance = report
        .converted
        .map(|eur| format!("{:.2}", eur))
        .unwrap_or_else(|| "unavailable".to_string());

    Ok(Json(BalanceResponse {
        btc_balance: format_btc(report.total),
        eur_balance,
    }))
}

async fn transactions(
    State(state): State<AppState>,
) -> Result<Json<Vec<UnspentRecord>>, ApiError> {
    Ok(Json(state.store.list_all().await?))
}

#[derive(Debug, Deserialize)]
struct TransferRequest {
    /// Amount to withdraw, in BTC
    amount: Decimal,
}

async fn transfer(
    State(state): State<AppState>,
    Json(request): Json<TransferRequest>,
) -> Result<String, ApiError> {
    let settlement = state.engine.withdraw(request.amount).await?;

    let display = settlement
        .amount
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    Ok(format!("Transfer of {:.2} BTC completed", display))
}

fn format_btc(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(5, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.5}", rounded)
}
