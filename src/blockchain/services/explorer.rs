// src/blockchain/services/explorer.rs

//! Wallet and transaction summaries reconstructed from raw chain data.
//!
//! The RPC has no address index, so recent activity is found by scanning a
//! bounded window of the newest blocks. Blocks are fetched in descending
//! batches; each block fetch has its own timeout and a failed block is
//! skipped. The scan stops once `limit` matching transactions are collected,
//! so the result is a sample of recent activity rather than a full history.

use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use ethers::types::{Address, Transaction, TransactionReceipt, H256, U256, U64};
use futures::future::{join_all, try_join_all};
use tracing::{debug, error, info, warn};

use crate::blockchain::gateway::ChainGateway;
use crate::blockchain::models::{
    BlockRange, ExplorerError, GasStatistics, TransactionSummary, TxStatus, WalletSummary,
};
use crate::utils;

/// Explorer link formatting; no network access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplorerUrls {
    base_url: String,
}

impl ExplorerUrls {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn address_url(&self, address: &str) -> String {
        format!("{}/address/{}", self.base_url, address)
    }

    pub fn transaction_url(&self, tx_hash: &str) -> String {
        format!("{}/tx/{}", self.base_url, tx_hash)
    }

    pub fn block_url(&self, block_number: u64) -> String {
        format!("{}/block/{}", self.base_url, block_number)
    }
}

/// Tunables bounding the cost of one wallet summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSettings {
    /// Maximum number of blocks examined per summary
    pub ceiling: u64,
    pub batch_size: u64,
    pub block_timeout: Duration,
    pub summary_timeout: Duration,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            ceiling: 100,
            batch_size: 10,
            block_timeout: Duration::from_secs(5),
            summary_timeout: Duration::from_secs(30),
        }
    }
}

/// A matching transaction together with the raw amounts needed for gas totals.
struct ScannedTransaction {
    summary: TransactionSummary,
    gas_used: U256,
    gas_price: U256,
    gas_cost: U256,
}

struct ScanResult {
    transactions: Vec<ScannedTransaction>,
    scanned: u64,
}

pub struct ActivityAggregator {
    gateway: Arc<dyn ChainGateway>,
    urls: ExplorerUrls,
    settings: ScanSettings,
}

impl ActivityAggregator {
    pub fn new(gateway: Arc<dyn ChainGateway>, urls: ExplorerUrls, settings: ScanSettings) -> Self {
        Self {
            gateway,
            urls,
            settings: ScanSettings {
                batch_size: settings.batch_size.max(1),
                ..settings
            },
        }
    }

    pub fn urls(&self) -> &ExplorerUrls {
        &self.urls
    }

    pub fn get_address_url(&self, address: &str) -> String {
        self.urls.address_url(address)
    }

    pub fn get_transaction_url(&self, tx_hash: &str) -> String {
        self.urls.transaction_url(tx_hash)
    }

    pub fn get_block_url(&self, block_number: u64) -> String {
        self.urls.block_url(block_number)
    }

    /// Balance, nonce and up to `limit` recent transactions of `address`.
    ///
    /// Fails as a whole with [`ExplorerError::Timeout`] when the summary does
    /// not finish within the configured budget.
    pub async fn get_wallet_summary(
        &self,
        address: &str,
        limit: usize,
    ) -> Result<WalletSummary, ExplorerError> {
        let target = utils::parse_address(address)
            .ok_or_else(|| ExplorerError::InvalidInput(format!("invalid address format: {}", address)))?;
        if limit == 0 {
            return Err(ExplorerError::InvalidInput("limit must be a positive integer".into()));
        }

        let result = with_timeout(
            self.settings.summary_timeout,
            self.wallet_summary_inner(target, limit),
        )
        .await
        .and_then(|inner| inner);

        if let Err(e) = &result {
            error!("Error getting wallet summary for {}: {}", address, e);
        }
        result
    }

    async fn wallet_summary_inner(
        &self,
        address: Address,
        limit: usize,
    ) -> Result<WalletSummary, ExplorerError> {
        let (balance, transaction_count, current_block) = tokio::try_join!(
            self.gateway.get_balance(address),
            self.gateway.get_transaction_count(address),
            self.gateway.get_block_number(),
        )?;

        let scan_window = self.settings.ceiling.min(current_block);
        let from_block = current_block.saturating_sub(scan_window);

        let scan = self
            .scan_recent_transactions(address, limit, from_block, current_block)
            .await;

        let mut transactions = scan.transactions;
        transactions.sort_by(|a, b| b.summary.block_number.cmp(&a.summary.block_number));
        transactions.truncate(limit);

        let gas = calculate_gas_statistics(&transactions);

        Ok(WalletSummary {
            address: utils::checksum(&address),
            balance: utils::format_native(balance),
            transaction_count: transaction_count.low_u64(),
            recent_transactions: transactions.into_iter().map(|tx| tx.summary).collect(),
            gas,
            block_range: BlockRange {
                from: from_block,
                to: current_block,
                scanned: scan.scanned,
            },
        })
    }

    /// Walks blocks `to_block` down to `from_block + 1`, newest batch first.
    async fn scan_recent_transactions(
        &self,
        address: Address,
        limit: usize,
        from_block: u64,
        to_block: u64,
    ) -> ScanResult {
        info!(
            "Scanning blocks {} to {} for address {:?} (max {} blocks)",
            from_block + 1,
            to_block,
            address,
            to_block - from_block
        );

        let mut collected = Vec::new();
        let mut scanned = 0u64;
        let mut batch_start = to_block;

        while batch_start > from_block && collected.len() < limit {
            let batch_end = batch_start
                .saturating_sub(self.settings.batch_size - 1)
                .max(from_block + 1);

            let fetches = (batch_end..=batch_start).rev().map(|block_number| async move {
                let outcome = with_timeout(
                    self.settings.block_timeout,
                    self.process_block(block_number, address, to_block),
                )
                .await;
                (block_number, outcome)
            });
            scanned += batch_start - batch_end + 1;

            for (block_number, outcome) in join_all(fetches).await {
                match outcome {
                    Ok(Ok(mut found)) => collected.append(&mut found),
                    Ok(Err(e)) => warn!("Skipping block {}: {}", block_number, e),
                    Err(e) => warn!("Skipping block {}: {}", block_number, e),
                }
            }

            batch_start = batch_end - 1;
        }

        debug!(
            "Scan for {:?} found {} transactions in {} blocks",
            address,
            collected.len(),
            scanned
        );

        ScanResult {
            transactions: collected,
            scanned,
        }
    }

    /// Matching transactions of one block, with their receipts.
    async fn process_block(
        &self,
        block_number: u64,
        address: Address,
        current_block: u64,
    ) -> Result<Vec<ScannedTransaction>, ExplorerError> {
        let block = self
            .gateway
            .get_block_with_transactions(block_number)
            .await?
            .ok_or_else(|| anyhow!("block {} not available", block_number))?;
        let timestamp = block.timestamp.low_u64();

        let matching = block
            .transactions
            .into_iter()
            .filter(|tx| tx.from == address || tx.to == Some(address));

        let with_receipts = try_join_all(matching.map(|tx| async move {
            let receipt = self.gateway.get_transaction_receipt(tx.hash).await?;
            Ok::<_, anyhow::Error>((tx, receipt))
        }))
        .await?;

        Ok(with_receipts
            .into_iter()
            .filter_map(|(tx, receipt)| {
                let receipt = receipt?;
                let mut scanned = self.summarize(&tx, &receipt, current_block);
                scanned.summary.timestamp = Some(timestamp);
                Some(scanned)
            })
            .collect())
    }

    /// Details of one transaction; fails with
    /// [`ExplorerError::TransactionNotFound`] if the transaction or its
    /// receipt is missing.
    pub async fn get_transaction_details(
        &self,
        tx_hash: &str,
    ) -> Result<TransactionSummary, ExplorerError> {
        let hash = H256::from_str(tx_hash.trim())
            .map_err(|_| ExplorerError::InvalidInput(format!("invalid transaction hash: {}", tx_hash)))?;

        let (tx, receipt) = tokio::try_join!(
            self.gateway.get_transaction(hash),
            self.gateway.get_transaction_receipt(hash),
        )
        .map_err(|e| {
            error!("Error getting transaction details for {}: {:#}", tx_hash, e);
            ExplorerError::Gateway(e)
        })?;

        let (tx, receipt) = match (tx, receipt) {
            (Some(tx), Some(receipt)) => (tx, receipt),
            _ => return Err(ExplorerError::TransactionNotFound(tx_hash.to_string())),
        };

        let current_block = self
            .gateway
            .get_block_number()
            .await
            .context("Failed to read chain head")?;

        Ok(self.summarize(&tx, &receipt, current_block).summary)
    }

    fn summarize(
        &self,
        tx: &Transaction,
        receipt: &TransactionReceipt,
        current_block: u64,
    ) -> ScannedTransaction {
        let gas_used = receipt.gas_used.unwrap_or_default();
        let gas_price = tx
            .gas_price
            .or(receipt.effective_gas_price)
            .unwrap_or_default();
        let gas_cost = gas_used.saturating_mul(gas_price);
        let block_number = receipt
            .block_number
            .or(tx.block_number)
            .unwrap_or_default()
            .as_u64();
        let hash = format!("{:?}", tx.hash);

        let summary = TransactionSummary {
            explorer_url: self.urls.transaction_url(&hash),
            hash,
            from: utils::checksum(&tx.from),
            to: tx.to.as_ref().map(utils::checksum),
            value: utils::format_native(tx.value),
            gas_used: gas_used.to_string(),
            gas_price: utils::format_gwei(gas_price),
            gas_cost: utils::format_native(gas_cost),
            block_number,
            timestamp: None,
            status: if receipt.status == Some(U64::one()) {
                TxStatus::Success
            } else {
                TxStatus::Failed
            },
            confirmations: current_block.saturating_sub(block_number),
        };

        ScannedTransaction {
            summary,
            gas_used,
            gas_price,
            gas_cost,
        }
    }
}

/// Totals over exactly the returned transactions, in integer base units.
fn calculate_gas_statistics(transactions: &[ScannedTransaction]) -> GasStatistics {
    if transactions.is_empty() {
        return GasStatistics::zero();
    }

    let mut total_gas_used = U256::zero();
    let mut total_gas_price = U256::zero();
    let mut total_gas_cost = U256::zero();
    for tx in transactions {
        total_gas_used = total_gas_used.saturating_add(tx.gas_used);
        total_gas_price = total_gas_price.saturating_add(tx.gas_price);
        total_gas_cost = total_gas_cost.saturating_add(tx.gas_cost);
    }
    let average_gas_price = total_gas_price / U256::from(transactions.len());

    GasStatistics {
        total_gas_used: total_gas_used.to_string(),
        average_gas_price: utils::format_gwei(average_gas_price),
        total_gas_cost: utils::format_native(total_gas_cost),
    }
}

async fn with_timeout<T>(limit: Duration, future: impl Future<Output = T>) -> Result<T, ExplorerError> {
    tokio::time::timeout(limit, future)
        .await
        .map_err(|_| ExplorerError::Timeout(limit.as_millis()))
}
