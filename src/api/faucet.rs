// src/api/faucet.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::{error, info};

use crate::{
    blockchain::models::{ClaimOutcome, ClaimRecord, Eligibility, FaucetStats},
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct ClaimRequest {
    pub address: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub address: Option<String>,
}

/// Create the faucet router
pub fn create_faucet_router() -> Router<AppState> {
    Router::new()
        .route("/faucet/eligibility/:address", get(eligibility_handler))
        .route("/faucet/claim", post(claim_handler))
        .route("/faucet/stats", get(stats_handler))
        .route("/faucet/history", get(history_handler))
}

pub async fn eligibility_handler(
    Path(address): Path<String>,
    State(state): State<AppState>,
) -> Json<Eligibility> {
    Json(state.faucet.check_eligibility(&address).await)
}

/// Claim outcomes are always 200; a refused or failed claim carries
/// `success: false` and an error message.
pub async fn claim_handler(
    State(state): State<AppState>,
    Json(req): Json<ClaimRequest>,
) -> Json<ClaimOutcome> {
    info!("Faucet claim requested for {}", req.address);
    Json(state.faucet.claim_faucet(req.address.trim()).await)
}

pub async fn stats_handler(
    State(state): State<AppState>,
) -> Result<Json<FaucetStats>, (StatusCode, String)> {
    state.faucet.get_faucet_stats().await.map(Json).map_err(|e| {
        error!("Failed to get faucet stats: {:#}", e);
        (StatusCode::BAD_GATEWAY, format!("{:#}", e))
    })
}

/// Claim records, newest first.
pub async fn history_handler(
    Query(query): Query<HistoryQuery>,
    State(state): State<AppState>,
) -> Json<Vec<ClaimRecord>> {
    let mut claims = state.faucet.get_claim_history(query.address.as_deref()).await;
    claims.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Json(claims)
}
