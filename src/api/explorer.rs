use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use crate::{
    blockchain::models::{ExplorerError, TransactionSummary, WalletSummary},
    AppState,
};

const DEFAULT_LIMIT: usize = 10;

/// Query parameters for the wallet summary.
#[derive(Debug, Deserialize, Validate)]
pub struct SummaryQuery {
    #[validate(range(min = 1, max = 50))]
    pub limit: Option<usize>,
}

/// Create the explorer router
pub fn create_explorer_router() -> Router<AppState> {
    Router::new()
        .route("/explorer/wallet/:address", get(wallet_summary_handler))
        .route("/explorer/tx/:hash", get(transaction_handler))
}

fn into_response_error(e: ExplorerError) -> (StatusCode, String) {
    let status = match &e {
        ExplorerError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        ExplorerError::TransactionNotFound(_) => StatusCode::NOT_FOUND,
        ExplorerError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        ExplorerError::Gateway(_) => StatusCode::BAD_GATEWAY,
    };
    (status, e.to_string())
}

pub async fn wallet_summary_handler(
    Path(address): Path<String>,
    Query(query): Query<SummaryQuery>,
    State(state): State<AppState>,
) -> Result<Json<WalletSummary>, (StatusCode, String)> {
    query
        .validate()
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Invalid query: {}", e)))?;
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);

    info!("Wallet summary requested for {} (limit {})", address, limit);
    state
        .explorer
        .get_wallet_summary(&address, limit)
        .await
        .map(Json)
        .map_err(into_response_error)
}

pub async fn transaction_handler(
    Path(hash): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<TransactionSummary>, (StatusCode, String)> {
    state
        .explorer
        .get_transaction_details(&hash)
        .await
        .map(Json)
        .map_err(into_response_error)
}
