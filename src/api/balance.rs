use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::error;

use crate::{
    blockchain::models::{BalanceResponse, TokenError},
    utils, AppState,
};

// The handler function for the GET /balance/{address} endpoint.
pub async fn get_balance_handler(
    Path(address): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<BalanceResponse>, (StatusCode, String)> {
    match state.tokens.get_native_balance(&address).await {
        Ok(balance) => Ok(Json(BalanceResponse {
            address,
            amount: utils::format_native(balance),
            denom: state.config.native_symbol.clone(),
        })),
        Err(TokenError::InvalidAddress(address)) => Err((
            StatusCode::BAD_REQUEST,
            format!("Invalid EVM address format: {}", address),
        )),
        Err(e) => {
            error!("Failed to get balance for {}: {}", address, e);
            Err((StatusCode::BAD_GATEWAY, e.to_string()))
        }
    }
}
