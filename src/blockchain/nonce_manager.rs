// src/blockchain/nonce_manager.rs

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use ethers::types::{Address, U256};
use tokio::sync::Mutex;

// Hands out sequential nonces per sender so concurrent payouts from the same
// key don't collide.
#[derive(Debug, Clone, Default)]
pub struct NonceManager {
    // Each address gets its own state, protected by a Mutex.
    // The DashMap allows for concurrent access to different address states.
    nonces: Arc<DashMap<Address, Arc<Mutex<NonceState>>>>,
}

#[derive(Debug)]
struct NonceState {
    next_nonce: Option<U256>,
}

impl NonceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the next valid nonce for `address`.
    ///
    /// The first call (or the first after [`NonceManager::reset`]) seeds the
    /// counter from `fetch_on_chain`, which should return the pending
    /// transaction count.
    pub async fn get_next_nonce<F, Fut>(
        &self,
        address: Address,
        fetch_on_chain: F,
    ) -> anyhow::Result<U256>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<U256>>,
    {
        let address_nonce_lock = self
            .nonces
            .entry(address)
            .or_insert_with(|| Arc::new(Mutex::new(NonceState { next_nonce: None })))
            .clone();

        // Lock the mutex specifically for this address.
        let mut state = address_nonce_lock.lock().await;

        let nonce_to_use = match state.next_nonce {
            Some(nonce) => nonce,
            None => fetch_on_chain().await?,
        };

        state.next_nonce = Some(nonce_to_use + U256::one());

        Ok(nonce_to_use)
    }

    /// Forgets the cached nonce so the next call resyncs from the chain.
    pub async fn reset(&self, address: Address) {
        let lock = self.nonces.get(&address).map(|entry| entry.value().clone());
        if let Some(lock) = lock {
            lock.lock().await.next_nonce = None;
        }
    }
}
