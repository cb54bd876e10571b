// src/blockchain/models.rs
use serde::{Deserialize, Serialize};
use thiserror::Error;

// --- Error types ---

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LimitsError {
    #[error("maxClaimsPerDay must be at least 1")]
    ZeroClaims,
    #[error("windowHours must be greater than 0")]
    ZeroWindow,
    #[error("invalid maxAmountPerClaim '{0}': {1}")]
    InvalidAmount(String, String),
}

#[derive(Error, Debug)]
pub enum ExplorerError {
    #[error("operation timed out after {0}ms")]
    Timeout(u128),
    #[error("transaction not found: {0}")]
    TransactionNotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Gateway(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("token with symbol {0} not found in {1}")]
    UnknownToken(String, String),
    #[error("invalid amount '{0}': {1}")]
    InvalidAmount(String, String),
    #[error("invalid address format: {0}")]
    InvalidAddress(String),
    #[error(transparent)]
    Gateway(#[from] anyhow::Error),
}

// --- Faucet Models ---

/// One disbursement, appended to the claims document after the transfer confirms.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRecord {
    pub address: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    pub amount: String,
    pub tx_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FaucetLimits {
    pub max_claims_per_day: u32,
    /// Fixed payout per claim, as a decimal in the native unit
    pub max_amount_per_claim: String,
    pub window_hours: u32,
}

impl Default for FaucetLimits {
    fn default() -> Self {
        Self {
            max_claims_per_day: 5,
            max_amount_per_claim: "0.0001".to_string(),
            window_hours: 24,
        }
    }
}

impl FaucetLimits {
    pub fn window_ms(&self) -> i64 {
        i64::from(self.window_hours) * 60 * 60 * 1000
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Eligibility {
    pub eligible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_claims: Option<u32>,
    /// Milliseconds since the Unix epoch at which a slot frees up
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_claim_time: Option<i64>,
}

impl Eligibility {
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            eligible: false,
            reason: Some(reason.into()),
            remaining_claims: None,
            next_claim_time: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClaimOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    /// Faucet balance after the payout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ClaimOutcome {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            tx_hash: None,
            amount: None,
            balance: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FaucetStats {
    pub total_claims: usize,
    pub total_distributed: String,
    pub unique_addresses: usize,
    pub faucet_balance: String,
    pub limits: FaucetLimits,
}

// --- Explorer Models ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    pub hash: String,
    pub from: String,
    /// `None` for contract creation
    pub to: Option<String>,
    pub value: String,
    pub gas_used: String,
    /// Gas price in gwei
    pub gas_price: String,
    pub gas_cost: String,
    pub block_number: u64,
    /// Block timestamp (seconds) when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
    pub status: TxStatus,
    pub confirmations: u64,
    pub explorer_url: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockRange {
    pub from: u64,
    pub to: u64,
    pub scanned: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GasStatistics {
    pub total_gas_used: String,
    pub average_gas_price: String,
    pub total_gas_cost: String,
}

impl GasStatistics {
    pub fn zero() -> Self {
        Self {
            total_gas_used: "0".to_string(),
            average_gas_price: "0".to_string(),
            total_gas_cost: "0".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WalletSummary {
    pub address: String,
    pub balance: String,
    pub transaction_count: u64,
    /// Most recent first
    pub recent_transactions: Vec<TransactionSummary>,
    #[serde(flatten)]
    pub gas: GasStatistics,
    pub block_range: BlockRange,
}

// --- Token Models ---

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExplorerLinks {
    pub contract: String,
    pub transaction: String,
}

/// A deployed ERC-20 token as kept in the deployed-tokens document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenRecord {
    pub name: String,
    pub symbol: String,
    pub address: String,
    pub tx_hash: String,
    pub supply: String,
    pub network: String,
    /// Filled in on registration from the configured explorer.
    #[serde(default)]
    pub explorer: ExplorerLinks,
}

/// Minimal token identity returned by a lookup source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenRef {
    #[serde(default)]
    pub name: String,
    pub symbol: String,
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenTransferOutcome {
    pub token: String,
    pub symbol: String,
    pub recipient: String,
    pub amount: String,
    pub tx_hash: String,
    /// Name of the lookup source that resolved the symbol
    pub source: String,
    pub explorer: ExplorerLinks,
}

/// Native balance of one address.
#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub address: String,
    pub amount: String,
    pub denom: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn claim_record_uses_ledger_field_names() {
        let record = ClaimRecord {
            address: "0xAbC".to_string(),
            timestamp: 1_700_000_000_000,
            amount: "0.0001".to_string(),
            tx_hash: "0x01".to_string(),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({"address": "0xAbC", "timestamp": 1_700_000_000_000i64, "amount": "0.0001", "txHash": "0x01"})
        );
    }

    #[test]
    fn eligible_result_omits_absent_fields() {
        let eligibility = Eligibility {
            eligible: true,
            reason: None,
            remaining_claims: Some(5),
            next_claim_time: None,
        };
        let value = serde_json::to_value(&eligibility).unwrap();
        assert_eq!(value, json!({"eligible": true, "remainingClaims": 5}));
    }

    #[test]
    fn wallet_summary_flattens_gas_statistics() {
        let summary = WalletSummary {
            address: "0x0".to_string(),
            balance: "0.0".to_string(),
            transaction_count: 0,
            recent_transactions: vec![],
            gas: GasStatistics::zero(),
            block_range: BlockRange { from: 0, to: 0, scanned: 0 },
        };
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["totalGasUsed"], "0");
        assert_eq!(value["totalGasCost"], "0");
        assert_eq!(value["blockRange"]["scanned"], 0);
    }

    #[test]
    fn window_is_measured_in_milliseconds() {
        assert_eq!(FaucetLimits::default().window_ms(), 86_400_000);
    }
}
