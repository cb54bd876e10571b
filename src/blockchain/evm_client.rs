// src/blockchain/evm_client.rs

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use ethers::{
    providers::{Http, Middleware, PendingTransaction, Provider},
    signers::{LocalWallet, Signer},
    types::{
        transaction::eip2718::TypedTransaction, Address, Block, BlockId, BlockNumber, Bytes,
        Transaction, TransactionReceipt, TransactionRequest, H256, U256, U64,
    },
};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

use crate::blockchain::{gateway::ChainGateway, nonce_manager::NonceManager, retry::RetryPolicy};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(120);

/// [`ChainGateway`] backed by an HTTP JSON-RPC provider and a local signing key.
#[derive(Clone)]
pub struct EvmClient {
    provider: Arc<Provider<Http>>,
    wallet: LocalWallet,
    chain_id: u64,
    nonce_manager: NonceManager,
    retry: RetryPolicy,
    confirmation_timeout: Duration,
}

impl EvmClient {
    /// Create a new EvmClient for one chain
    pub fn new(
        rpc_url: &str,
        chain_id: u64,
        private_key: &SecretString,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| anyhow!("Failed to create provider for {}: {}", rpc_url, e))?
            .interval(DEFAULT_POLL_INTERVAL);

        let wallet = LocalWallet::from_str(private_key.expose_secret().trim())
            .map_err(|e| anyhow!("Invalid private key: {}", e))?
            .with_chain_id(chain_id);

        info!(
            "EVM client ready for chain {} at {} (signer {:?})",
            chain_id,
            rpc_url,
            wallet.address()
        );

        Ok(Self {
            provider: Arc::new(provider),
            wallet,
            chain_id,
            nonce_manager: NonceManager::new(),
            retry,
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
        })
    }

    pub fn with_confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.confirmation_timeout = timeout;
        self
    }

    async fn pending_nonce(&self, address: Address) -> Result<U256> {
        self.retry
            .run("eth_getTransactionCount", || {
                self.provider
                    .get_transaction_count(address, Some(BlockId::Number(BlockNumber::Pending)))
            })
            .await
            .context("Failed to get nonce from RPC")
    }
}

#[async_trait]
impl ChainGateway for EvmClient {
    fn signer_address(&self) -> Address {
        self.wallet.address()
    }

    async fn get_balance(&self, address: Address) -> Result<U256> {
        self.retry
            .run("eth_getBalance", || self.provider.get_balance(address, None))
            .await
            .with_context(|| format!("Failed to get balance of {:?}", address))
    }

    async fn get_transaction_count(&self, address: Address) -> Result<U256> {
        self.retry
            .run("eth_getTransactionCount", || {
                self.provider.get_transaction_count(address, None)
            })
            .await
            .with_context(|| format!("Failed to get transaction count of {:?}", address))
    }

    async fn get_block_number(&self) -> Result<u64> {
        let number = self
            .retry
            .run("eth_blockNumber", || self.provider.get_block_number())
            .await
            .context("Failed to get latest block number")?;
        Ok(number.as_u64())
    }

    async fn get_block_with_transactions(&self, number: u64) -> Result<Option<Block<Transaction>>> {
        self.retry
            .run("eth_getBlockByNumber", || {
                self.provider
                    .get_block_with_txs(BlockNumber::Number(U64::from(number)))
            })
            .await
            .with_context(|| format!("Failed to get block {}", number))
    }

    async fn get_transaction(&self, hash: H256) -> Result<Option<Transaction>> {
        self.retry
            .run("eth_getTransactionByHash", || self.provider.get_transaction(hash))
            .await
            .with_context(|| format!("Failed to get transaction {:?}", hash))
    }

    async fn get_transaction_receipt(&self, hash: H256) -> Result<Option<TransactionReceipt>> {
        self.retry
            .run("eth_getTransactionReceipt", || {
                self.provider.get_transaction_receipt(hash)
            })
            .await
            .with_context(|| format!("Failed to get receipt for {:?}", hash))
    }

    async fn get_gas_price(&self) -> Result<U256> {
        self.retry
            .run("eth_gasPrice", || self.provider.get_gas_price())
            .await
            .context("Failed to get gas price")
    }

    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<U256> {
        let mut tx = tx.clone();
        if tx.from.is_none() {
            tx = tx.from(self.wallet.address());
        }
        let typed: TypedTransaction = tx.into();
        self.retry
            .run("eth_estimateGas", || self.provider.estimate_gas(&typed, None))
            .await
            .context("RPC Error estimating gas")
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<H256> {
        let from_address = self.wallet.address();

        let nonce = self
            .nonce_manager
            .get_next_nonce(from_address, || self.pending_nonce(from_address))
            .await?;

        let submitted: Result<H256> = async {
            let mut tx = tx.from(from_address).nonce(nonce).chain_id(self.chain_id);

            // If gas is not provided, estimate it
            if tx.gas.is_none() {
                let gas = self.estimate_gas(&tx).await?;
                tx = tx.gas(gas);
            }

            // Legacy pricing: fall back to eth_gasPrice
            if tx.gas_price.is_none() {
                let gas_price = self.get_gas_price().await?;
                tx = tx.gas_price(gas_price);
            }

            let typed: TypedTransaction = tx.into();
            let signature = self
                .wallet
                .sign_transaction(&typed)
                .await
                .map_err(|e| anyhow!("Failed to sign transaction: {}", e))?;
            let raw_tx = typed.rlp_signed(&signature);

            let pending = self
                .provider
                .send_raw_transaction(raw_tx)
                .await
                .map_err(|e| anyhow!("RPC Error sending transaction: {}", e))?;
            Ok(pending.tx_hash())
        }
        .await;

        match submitted {
            Ok(hash) => {
                debug!("Submitted transaction {:?} with nonce {}", hash, nonce);
                Ok(hash)
            }
            Err(e) => {
                // The reserved nonce was never used on chain
                self.nonce_manager.reset(from_address).await;
                Err(e)
            }
        }
    }

    async fn wait_for_confirmations(&self, hash: H256, confirmations: usize) -> Result<TransactionReceipt> {
        let pending = PendingTransaction::new(hash, self.provider.as_ref())
            .interval(DEFAULT_POLL_INTERVAL)
            .confirmations(confirmations);

        let receipt = tokio::time::timeout(self.confirmation_timeout, pending)
            .await
            .map_err(|_| {
                anyhow!(
                    "Timed out after {:?} waiting for {:?} to confirm",
                    self.confirmation_timeout,
                    hash
                )
            })?
            .with_context(|| format!("Failed while waiting for {:?}", hash))?;

        receipt.ok_or_else(|| anyhow!("Transaction {:?} was dropped from the mempool", hash))
    }

    async fn call(&self, tx: &TransactionRequest) -> Result<Bytes> {
        let typed: TypedTransaction = tx.clone().into();
        self.retry
            .run("eth_call", || self.provider.call(&typed, None))
            .await
            .context("eth_call failed")
    }
}
