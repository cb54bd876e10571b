use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::{error, info};

use crate::{
    blockchain::models::{TokenError, TokenRecord, TokenTransferOutcome},
    AppState,
};

// --- Request Models ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub symbol: String,
    pub recipient: String,
    pub amount: String,
}

/// Create the token router
pub fn create_token_router() -> Router<AppState> {
    Router::new()
        .route("/tokens", get(list_tokens_handler).post(register_token_handler))
        .route("/tokens/transfer", post(transfer_token_handler))
}

fn into_response_error(e: TokenError) -> (StatusCode, String) {
    let status = match &e {
        TokenError::UnknownToken(..) => StatusCode::NOT_FOUND,
        TokenError::InvalidAmount(..) | TokenError::InvalidAddress(_) => StatusCode::BAD_REQUEST,
        TokenError::Gateway(_) => StatusCode::BAD_GATEWAY,
    };
    (status, format!("{:#}", e))
}

pub async fn list_tokens_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<TokenRecord>>, (StatusCode, String)> {
    state.tokens.list_tokens().await.map(Json).map_err(|e| {
        error!("Failed to list deployed tokens: {:#}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e))
    })
}

pub async fn register_token_handler(
    State(state): State<AppState>,
    Json(record): Json<TokenRecord>,
) -> Result<(StatusCode, Json<TokenRecord>), (StatusCode, String)> {
    let record = state
        .tokens
        .register_token(record)
        .await
        .map_err(into_response_error)?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn transfer_token_handler(
    State(state): State<AppState>,
    Json(req): Json<TransferRequest>,
) -> Result<Json<TokenTransferOutcome>, (StatusCode, String)> {
    info!(
        "Token transfer requested: {} {} to {}",
        req.amount, req.symbol, req.recipient
    );
    state
        .tokens
        .transfer_token(&req.symbol, &req.recipient, &req.amount)
        .await
        .map(Json)
        .map_err(into_response_error)
}
