// src/blockchain/services/faucet.rs

//! Rate-limited faucet backed by an append-only claim ledger.
//!
//! Every address may receive the fixed payout at most `maxClaimsPerDay` times
//! within a trailing window of `windowHours`. Claims for one address are
//! processed one at a time, and ledger appends are serialized, so concurrent
//! requests cannot push an address past its cap or drop each other's records.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use dashmap::DashMap;
use ethers::types::{Address, TransactionRequest, U256};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::blockchain::gateway::ChainGateway;
use crate::blockchain::models::{
    ClaimOutcome, ClaimRecord, Eligibility, FaucetLimits, FaucetStats, LimitsError,
};
use crate::storage::{DocumentStore, CLAIMS_KEY};
use crate::utils;

/// Extra gas allowance applied to the payout transaction, in percent.
const GAS_LIMIT_BUFFER_PERCENT: u64 = 120;

pub struct ClaimLedger {
    gateway: Arc<dyn ChainGateway>,
    store: Arc<dyn DocumentStore>,
    limits: FaucetLimits,
    claim_amount: U256,
    native_symbol: String,
    address_locks: DashMap<Address, Arc<Mutex<()>>>,
    append_lock: Mutex<()>,
}

impl ClaimLedger {
    pub fn new(
        gateway: Arc<dyn ChainGateway>,
        store: Arc<dyn DocumentStore>,
        limits: FaucetLimits,
        native_symbol: impl Into<String>,
    ) -> Result<Self, LimitsError> {
        if limits.max_claims_per_day == 0 {
            return Err(LimitsError::ZeroClaims);
        }
        if limits.window_hours == 0 {
            return Err(LimitsError::ZeroWindow);
        }
        let claim_amount = utils::parse_native(&limits.max_amount_per_claim).map_err(|e| {
            LimitsError::InvalidAmount(limits.max_amount_per_claim.clone(), e.to_string())
        })?;

        Ok(Self {
            gateway,
            store,
            limits,
            claim_amount,
            native_symbol: native_symbol.into(),
            address_locks: DashMap::new(),
            append_lock: Mutex::new(()),
        })
    }

    pub fn limits(&self) -> &FaucetLimits {
        &self.limits
    }

    /// Loads the full ledger, failing on an unreadable document or on any
    /// record that does not parse.
    async fn read_claims(&self) -> Result<Vec<ClaimRecord>> {
        match self
            .store
            .read_document(CLAIMS_KEY)
            .await
            .context("Claims ledger unreadable")?
        {
            Some(document) => {
                serde_json::from_value(document).context("Claims ledger is malformed")
            }
            None => Ok(Vec::new()),
        }
    }

    /// Fail-open view of the ledger for eligibility, history and stats. An
    /// unreadable or malformed document reads as empty and is logged.
    async fn load_claims(&self) -> Vec<ClaimRecord> {
        match self.read_claims().await {
            Ok(claims) => claims,
            Err(e) => {
                warn!("{:#}; treating as empty", e);
                Vec::new()
            }
        }
    }

    /// Appends under the ledger lock. Never rewrites a ledger it cannot parse.
    async fn append_claim(&self, claim: ClaimRecord) -> Result<()> {
        let _guard = self.append_lock.lock().await;
        let mut claims = self.read_claims().await?;
        claims.push(claim);
        let document: Value =
            serde_json::to_value(&claims).context("Failed to serialize claims ledger")?;
        self.store
            .write_document(CLAIMS_KEY, &document)
            .await
            .context("Failed to persist claims ledger")
    }

    fn recent_claims<'a>(&self, claims: &'a [ClaimRecord], address: &str, now: i64) -> Vec<&'a ClaimRecord> {
        let cutoff = now - self.limits.window_ms();
        claims
            .iter()
            .filter(|claim| claim.address.eq_ignore_ascii_case(address) && claim.timestamp > cutoff)
            .collect()
    }

    fn evaluate(&self, claims: &[ClaimRecord], address: &str, now: i64) -> Eligibility {
        let recent = self.recent_claims(claims, address, now);
        let count = recent.len() as u32;

        if count >= self.limits.max_claims_per_day {
            // A slot frees up when the oldest claim in the window ages out
            let oldest = recent.iter().map(|claim| claim.timestamp).min().unwrap_or(now);
            return Eligibility {
                eligible: false,
                reason: Some(format!(
                    "Maximum {} claims per {} hours reached",
                    self.limits.max_claims_per_day, self.limits.window_hours
                )),
                remaining_claims: Some(0),
                next_claim_time: Some(oldest + self.limits.window_ms()),
            };
        }

        Eligibility {
            eligible: true,
            reason: None,
            remaining_claims: Some(self.limits.max_claims_per_day - count),
            next_claim_time: None,
        }
    }

    /// Read-only check of whether `address` may claim now.
    pub async fn check_eligibility(&self, address: &str) -> Eligibility {
        if !utils::is_valid_address(address) {
            return Eligibility::rejected("Invalid EVM address format");
        }
        let claims = self.load_claims().await;
        self.evaluate(&claims, address, utils::now_millis())
    }

    /// Current faucet balance in the native unit.
    pub async fn get_faucet_balance(&self) -> Result<String> {
        let balance = self
            .gateway
            .get_balance(self.gateway.signer_address())
            .await?;
        Ok(utils::format_native(balance))
    }

    /// Pays the fixed amount to `address` if it is eligible and the faucet can
    /// cover the payout plus gas. A ledger that cannot be read strictly is
    /// left untouched and no payout is sent. Never returns an error; failures
    /// are folded into the outcome.
    pub async fn claim_faucet(&self, address: &str) -> ClaimOutcome {
        let recipient = match utils::parse_address(address) {
            Some(recipient) => recipient,
            None => return ClaimOutcome::failed("Invalid EVM address format"),
        };

        let lock = self
            .address_locks
            .entry(recipient)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let outcome = {
            let _guard = lock.lock().await;
            self.claim_locked(address, recipient).await
        };

        // Drop the entry once no other claim for this address holds or awaits it
        self.address_locks
            .remove_if(&recipient, |_, entry| Arc::strong_count(entry) <= 2);
        outcome
    }

    /// Number of addresses with a claim currently in flight.
    pub fn in_flight_addresses(&self) -> usize {
        self.address_locks.len()
    }

    async fn claim_locked(&self, address: &str, recipient: Address) -> ClaimOutcome {
        // No payout against a ledger that could not be appended to afterwards
        let claims = match self.read_claims().await {
            Ok(claims) => claims,
            Err(e) => {
                error!("Refusing faucet claim for {}: {:#}", address, e);
                return ClaimOutcome::failed(format!("{:#}", e));
            }
        };

        let eligibility = self.evaluate(&claims, address, utils::now_millis());
        if !eligibility.eligible {
            info!("Faucet claim rejected for {}: {:?}", address, eligibility.reason);
            return ClaimOutcome::failed(
                eligibility
                    .reason
                    .unwrap_or_else(|| "Address is not eligible".to_string()),
            );
        }

        match self.disburse(recipient).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Faucet claim for {} failed: {:#}", address, e);
                ClaimOutcome::failed(format!("Transaction failed: {:#}", e))
            }
        }
    }

    async fn disburse(&self, recipient: Address) -> Result<ClaimOutcome> {
        let faucet_address = self.gateway.signer_address();
        let faucet_balance = self.gateway.get_balance(faucet_address).await?;

        if faucet_balance < self.claim_amount {
            return Ok(ClaimOutcome::failed(format!(
                "Insufficient faucet balance. Available: {} {}",
                utils::format_native(faucet_balance),
                self.native_symbol
            )));
        }

        let transfer = TransactionRequest::new()
            .from(faucet_address)
            .to(recipient)
            .value(self.claim_amount);

        let gas_estimate = self.gateway.estimate_gas(&transfer).await?;
        let gas_price = self.gateway.get_gas_price().await?;
        let total_cost = gas_estimate
            .checked_mul(gas_price)
            .and_then(|fee| fee.checked_add(self.claim_amount))
            .ok_or_else(|| anyhow!("Fee calculation overflow"))?;

        if faucet_balance < total_cost {
            return Ok(ClaimOutcome::failed(format!(
                "Insufficient balance for transaction fees. Required: {} {}",
                utils::format_native(total_cost),
                self.native_symbol
            )));
        }

        let gas_limit = gas_estimate * U256::from(GAS_LIMIT_BUFFER_PERCENT) / U256::from(100u64);
        let tx_hash = self
            .gateway
            .send_transaction(transfer.gas(gas_limit).gas_price(gas_price))
            .await?;
        let receipt = self.gateway.wait_for_confirmations(tx_hash, 1).await?;
        let tx_hash = format!("{:?}", receipt.transaction_hash);

        let claim = ClaimRecord {
            address: utils::checksum(&recipient),
            timestamp: utils::now_millis(),
            amount: self.limits.max_amount_per_claim.clone(),
            tx_hash: tx_hash.clone(),
        };

        if let Err(e) = self.append_claim(claim).await {
            error!("Payout {} confirmed but the claim was not recorded: {:#}", tx_hash, e);
            return Ok(ClaimOutcome {
                success: false,
                tx_hash: Some(tx_hash),
                amount: Some(self.limits.max_amount_per_claim.clone()),
                balance: None,
                error: Some(format!("Transfer confirmed but recording the claim failed: {:#}", e)),
            });
        }

        info!(
            "Faucet paid {} {} to {:?} in {}",
            self.limits.max_amount_per_claim, self.native_symbol, recipient, tx_hash
        );

        // A failed balance refresh doesn't undo a recorded payout
        let balance = match self.get_faucet_balance().await {
            Ok(balance) => Some(balance),
            Err(e) => {
                warn!("Failed to refresh faucet balance: {:#}", e);
                None
            }
        };

        Ok(ClaimOutcome {
            success: true,
            tx_hash: Some(tx_hash),
            amount: Some(self.limits.max_amount_per_claim.clone()),
            balance,
            error: None,
        })
    }

    /// Full ledger, or only the claims for `address` (case-insensitive), in
    /// ledger order.
    pub async fn get_claim_history(&self, address: Option<&str>) -> Vec<ClaimRecord> {
        let claims = self.load_claims().await;
        match address {
            Some(address) => claims
                .into_iter()
                .filter(|claim| claim.address.eq_ignore_ascii_case(address))
                .collect(),
            None => claims,
        }
    }

    pub async fn get_faucet_stats(&self) -> Result<FaucetStats> {
        let claims = self.load_claims().await;

        let unique_addresses = claims
            .iter()
            .map(|claim| claim.address.to_lowercase())
            .collect::<HashSet<_>>()
            .len();

        let mut total_distributed = U256::zero();
        for claim in &claims {
            let amount = utils::parse_native(&claim.amount)
                .with_context(|| format!("Invalid amount in claim {}", claim.tx_hash))?;
            total_distributed = total_distributed
                .checked_add(amount)
                .ok_or_else(|| anyhow!("Distributed total overflow"))?;
        }

        Ok(FaucetStats {
            total_claims: claims.len(),
            total_distributed: utils::format_native(total_distributed),
            unique_addresses,
            faucet_balance: self.get_faucet_balance().await?,
            limits: self.limits.clone(),
        })
    }
}
