//! Scriptable chain and store doubles shared by the integration tests

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use ethers::types::{
    Address, Block, Bytes, Transaction, TransactionReceipt, TransactionRequest, H256, U256, U64,
};
use serde_json::Value;

use citrea_mcp_server::{blockchain::gateway::ChainGateway, storage::DocumentStore, utils};

pub const GWEI: u64 = 1_000_000_000;

/// Parses a native amount such as "0.0001" into wei.
pub fn native(amount: &str) -> U256 {
    utils::parse_native(amount).unwrap()
}

pub fn addr(byte: u8) -> Address {
    Address::repeat_byte(byte)
}

pub fn hex_addr(byte: u8) -> String {
    format!("{:?}", addr(byte))
}

#[derive(Default)]
struct ChainState {
    balances: HashMap<Address, U256>,
    nonces: HashMap<Address, U256>,
    head: u64,
    blocks: HashMap<u64, Block<Transaction>>,
    transactions: HashMap<H256, Transaction>,
    receipts: HashMap<H256, TransactionReceipt>,
    failing_blocks: HashSet<u64>,
    stalled_blocks: HashSet<u64>,
    head_delay: Option<Duration>,
    fetched_blocks: Vec<u64>,
    sent: Vec<TransactionRequest>,
    next_hash: u64,
    fail_sends: bool,
    call_result: Bytes,
}

/// In-memory [`ChainGateway`] whose chain contents are set up by each test.
pub struct FakeGateway {
    signer: Address,
    gas_price: U256,
    gas_estimate: U256,
    state: Mutex<ChainState>,
}

impl FakeGateway {
    pub fn new(signer_balance: U256) -> Self {
        let signer = addr(0xfa);
        let mut state = ChainState::default();
        state.balances.insert(signer, signer_balance);
        Self {
            signer,
            gas_price: U256::from(GWEI),
            gas_estimate: U256::from(21_000u64),
            state: Mutex::new(state),
        }
    }

    pub fn shared(signer_balance: U256) -> Arc<Self> {
        Arc::new(Self::new(signer_balance))
    }

    pub fn set_head(&self, head: u64) {
        self.state.lock().unwrap().head = head;
    }

    pub fn set_balance(&self, address: Address, balance: U256) {
        self.state.lock().unwrap().balances.insert(address, balance);
    }

    pub fn set_nonce(&self, address: Address, nonce: u64) {
        self.state.lock().unwrap().nonces.insert(address, U256::from(nonce));
    }

    pub fn fail_block(&self, number: u64) {
        self.state.lock().unwrap().failing_blocks.insert(number);
    }

    /// The block fetch never completes on its own.
    pub fn stall_block(&self, number: u64) {
        self.state.lock().unwrap().stalled_blocks.insert(number);
    }

    pub fn delay_head(&self, delay: Duration) {
        self.state.lock().unwrap().head_delay = Some(delay);
    }

    pub fn fail_sends(&self) {
        self.state.lock().unwrap().fail_sends = true;
    }

    pub fn set_call_result(&self, data: Bytes) {
        self.state.lock().unwrap().call_result = data;
    }

    pub fn fetched_blocks(&self) -> Vec<u64> {
        self.state.lock().unwrap().fetched_blocks.clone()
    }

    pub fn sent(&self) -> Vec<TransactionRequest> {
        self.state.lock().unwrap().sent.clone()
    }

    /// Mines a transaction into `block` with the given outcome and returns its hash.
    pub fn add_transaction(
        &self,
        block: u64,
        from: Address,
        to: Option<Address>,
        value: U256,
        gas_price_gwei: u64,
        gas_used: u64,
        succeeded: bool,
    ) -> H256 {
        let mut state = self.state.lock().unwrap();
        state.next_hash += 1;
        let hash = H256::from_low_u64_be(state.next_hash);

        let tx = Transaction {
            hash,
            from,
            to,
            value,
            gas_price: Some(U256::from(gas_price_gwei * GWEI)),
            block_number: Some(U64::from(block)),
            ..Default::default()
        };
        let receipt = TransactionReceipt {
            transaction_hash: hash,
            block_number: Some(U64::from(block)),
            gas_used: Some(U256::from(gas_used)),
            status: Some(U64::from(succeeded as u64)),
            ..Default::default()
        };

        state
            .blocks
            .entry(block)
            .or_insert_with(|| empty_block(block))
            .transactions
            .push(tx.clone());
        state.transactions.insert(hash, tx);
        state.receipts.insert(hash, receipt);
        hash
    }
}

fn empty_block(number: u64) -> Block<Transaction> {
    Block {
        number: Some(U64::from(number)),
        timestamp: U256::from(1_700_000_000u64 + number * 2),
        ..Default::default()
    }
}

#[async_trait]
impl ChainGateway for FakeGateway {
    fn signer_address(&self) -> Address {
        self.signer
    }

    async fn get_balance(&self, address: Address) -> Result<U256> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .balances
            .get(&address)
            .copied()
            .unwrap_or_default())
    }

    async fn get_transaction_count(&self, address: Address) -> Result<U256> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .nonces
            .get(&address)
            .copied()
            .unwrap_or_default())
    }

    async fn get_block_number(&self) -> Result<u64> {
        let (head, delay) = {
            let state = self.state.lock().unwrap();
            (state.head, state.head_delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(head)
    }

    async fn get_block_with_transactions(&self, number: u64) -> Result<Option<Block<Transaction>>> {
        let (stalled, failing, block) = {
            let mut state = self.state.lock().unwrap();
            state.fetched_blocks.push(number);
            let block = if number <= state.head {
                Some(
                    state
                        .blocks
                        .get(&number)
                        .cloned()
                        .unwrap_or_else(|| empty_block(number)),
                )
            } else {
                None
            };
            (
                state.stalled_blocks.contains(&number),
                state.failing_blocks.contains(&number),
                block,
            )
        };
        if stalled {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if failing {
            return Err(anyhow!("block {} unavailable", number));
        }
        Ok(block)
    }

    async fn get_transaction(&self, hash: H256) -> Result<Option<Transaction>> {
        Ok(self.state.lock().unwrap().transactions.get(&hash).cloned())
    }

    async fn get_transaction_receipt(&self, hash: H256) -> Result<Option<TransactionReceipt>> {
        Ok(self.state.lock().unwrap().receipts.get(&hash).cloned())
    }

    async fn get_gas_price(&self) -> Result<U256> {
        Ok(self.gas_price)
    }

    async fn estimate_gas(&self, _tx: &TransactionRequest) -> Result<U256> {
        Ok(self.gas_estimate)
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<H256> {
        let mut state = self.state.lock().unwrap();
        if state.fail_sends {
            return Err(anyhow!("nonce too low"));
        }
        state.next_hash += 1;
        let hash = H256::from_low_u64_be(state.next_hash);
        let block = state.head + 1;
        state.head = block;

        let value = tx.value.unwrap_or_default();
        let fee = tx.gas.unwrap_or(self.gas_estimate) * tx.gas_price.unwrap_or(self.gas_price);
        let signer_balance = state.balances.entry(self.signer).or_default();
        *signer_balance = signer_balance.saturating_sub(value + fee);
        if let Some(to) = tx.to.as_ref().and_then(|to| to.as_address()).copied() {
            *state.balances.entry(to).or_default() += value;
        }

        state.receipts.insert(
            hash,
            TransactionReceipt {
                transaction_hash: hash,
                block_number: Some(U64::from(block)),
                gas_used: Some(self.gas_estimate),
                status: Some(U64::one()),
                ..Default::default()
            },
        );
        state.sent.push(tx);
        Ok(hash)
    }

    async fn wait_for_confirmations(&self, hash: H256, _confirmations: usize) -> Result<TransactionReceipt> {
        self.state
            .lock()
            .unwrap()
            .receipts
            .get(&hash)
            .cloned()
            .ok_or_else(|| anyhow!("transaction {:?} dropped", hash))
    }

    async fn call(&self, _tx: &TransactionRequest) -> Result<Bytes> {
        Ok(self.state.lock().unwrap().call_result.clone())
    }
}

/// Store whose reads or writes always fail.
#[derive(Debug, Default)]
pub struct BrokenStore {
    pub fail_reads: bool,
    pub fail_writes: bool,
}

#[async_trait]
impl DocumentStore for BrokenStore {
    async fn read_document(&self, _key: &str) -> Result<Option<Value>> {
        if self.fail_reads {
            Err(anyhow!("disk unreadable"))
        } else {
            Ok(None)
        }
    }

    async fn write_document(&self, _key: &str, _document: &Value) -> Result<()> {
        if self.fail_writes {
            Err(anyhow!("disk full"))
        } else {
            Ok(())
        }
    }
}
