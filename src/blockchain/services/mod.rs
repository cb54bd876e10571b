// src/blockchain/services/mod.rs

pub mod explorer;
pub mod faucet;
pub mod token;

pub use explorer::{ActivityAggregator, ExplorerUrls, ScanSettings};
pub use faucet::ClaimLedger;
pub use token::{TokenRegistry, TokenResolver, TokenSource};
