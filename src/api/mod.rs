//! # API Module
//!
//! HTTP handlers for the Citrea faucet, explorer and token services.
//! Every route is nested under `/api`.
//!
//! ## Available Endpoints
//!
//! ### Faucet
//! - `GET /faucet/eligibility/:address` - Check whether an address may claim now
//! - `POST /faucet/claim` - Claim the fixed payout
//! - `GET /faucet/stats` - Ledger totals and faucet balance
//! - `GET /faucet/history?address=` - Claim records, optionally for one address
//!
//! ### Explorer
//! - `GET /explorer/wallet/:address?limit=` - Wallet activity summary
//! - `GET /explorer/tx/:hash` - Transaction details
//!
//! ### Tokens
//! - `GET /tokens` - Deployed tokens
//! - `POST /tokens` - Record a deployment
//! - `POST /tokens/transfer` - Transfer an ERC-20 token by symbol
//!
//! ### Misc
//! - `GET /health` - Liveness
//! - `GET /balance/:address` - Native balance

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;

pub mod balance;
pub mod explorer;
pub mod faucet;
pub mod health;
pub mod tokens;

/// Builds the full application router with state and middleware applied.
pub fn create_router(state: AppState) -> Router {
    let api_router = Router::new()
        .route("/health", get(health::health_handler))
        .route("/balance/:address", get(balance::get_balance_handler))
        .merge(faucet::create_faucet_router())
        .merge(explorer::create_explorer_router())
        .merge(tokens::create_token_router());

    Router::new()
        .nest("/api", api_router)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
