// src/lib.rs

use std::sync::Arc;

use anyhow::{Context, Result};

// Re-export commonly used types
pub use ethers::types::{Address, H256, U256};

pub mod api;
pub mod blockchain;
pub mod config;
pub mod storage;
pub mod utils;

use blockchain::gateway::ChainGateway;
use blockchain::services::{
    token::load_token_list, ActivityAggregator, ClaimLedger, ExplorerUrls, ScanSettings,
    TokenRegistry,
};
use storage::DocumentStore;

/// Application state shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::Config>,
    /// Rate-limited faucet
    pub faucet: Arc<ClaimLedger>,
    /// Wallet and transaction summaries
    pub explorer: Arc<ActivityAggregator>,
    /// Deployed tokens and ERC-20 transfers
    pub tokens: Arc<TokenRegistry>,
}

impl AppState {
    /// Wires the services around one gateway and one document store.
    pub fn new(
        config: config::Config,
        gateway: Arc<dyn ChainGateway>,
        store: Arc<dyn DocumentStore>,
    ) -> Result<Self> {
        let urls = ExplorerUrls::new(config.explorer_base_url.clone());

        let faucet = ClaimLedger::new(
            gateway.clone(),
            store.clone(),
            config.faucet_limits.clone(),
            config.native_symbol.clone(),
        )
        .context("Invalid faucet limits")?;

        let explorer = ActivityAggregator::new(
            gateway.clone(),
            urls.clone(),
            ScanSettings {
                ceiling: config.scan_ceiling,
                batch_size: config.scan_batch_size,
                block_timeout: config.block_timeout,
                summary_timeout: config.summary_timeout,
            },
        );

        let well_known = match &config.well_known_tokens_path {
            Some(path) => load_token_list(path)?,
            None => Vec::new(),
        };
        let tokens = TokenRegistry::new(gateway, store, urls, well_known);

        Ok(Self {
            config: Arc::new(config),
            faucet: Arc::new(faucet),
            explorer: Arc::new(explorer),
            tokens: Arc::new(tokens),
        })
    }
}
