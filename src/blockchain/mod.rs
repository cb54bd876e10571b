// src/blockchain/mod.rs

pub mod evm_client;
pub mod gateway;
pub mod models;
pub mod nonce_manager;
pub mod retry;
pub mod services;

pub use evm_client::EvmClient;
pub use gateway::ChainGateway;

// Re-export commonly used types
pub use ethers::{
    types::{Address, H256, U256, U64},
    utils::to_checksum,
};
