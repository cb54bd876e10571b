// src/blockchain/gateway.rs

use anyhow::Result;
use async_trait::async_trait;
use ethers::types::{
    Address, Block, Bytes, Transaction, TransactionReceipt, TransactionRequest, H256, U256,
};

/// JSON-RPC operations the faucet, explorer and token services rely on.
///
/// Amounts are exchanged in the smallest unit; formatting happens in the
/// services.
#[async_trait]
pub trait ChainGateway: Send + Sync {
    /// Address of the key this gateway signs with.
    fn signer_address(&self) -> Address;

    async fn get_balance(&self, address: Address) -> Result<U256>;

    async fn get_transaction_count(&self, address: Address) -> Result<U256>;

    /// Height of the latest block.
    async fn get_block_number(&self) -> Result<u64>;

    async fn get_block_with_transactions(&self, number: u64) -> Result<Option<Block<Transaction>>>;

    async fn get_transaction(&self, hash: H256) -> Result<Option<Transaction>>;

    async fn get_transaction_receipt(&self, hash: H256) -> Result<Option<TransactionReceipt>>;

    async fn get_gas_price(&self) -> Result<U256>;

    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<U256>;

    /// Signs and submits `tx` from the signer address, returning its hash.
    async fn send_transaction(&self, tx: TransactionRequest) -> Result<H256>;

    /// Waits until `hash` has `confirmations` blocks and returns its receipt.
    async fn wait_for_confirmations(&self, hash: H256, confirmations: usize) -> Result<TransactionReceipt>;

    /// Read-only contract call against the latest block.
    async fn call(&self, tx: &TransactionRequest) -> Result<Bytes>;
}
