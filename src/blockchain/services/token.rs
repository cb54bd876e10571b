// src/blockchain/services/token.rs

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use ethers::abi::{decode, encode, ParamType, Token};
use ethers::types::{Address, Bytes, TransactionRequest, U256};
use ethers::utils::keccak256;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::blockchain::gateway::ChainGateway;
use crate::blockchain::models::{
    ExplorerLinks, TokenError, TokenRecord, TokenRef, TokenTransferOutcome,
};
use crate::blockchain::services::explorer::ExplorerUrls;
use crate::storage::{DocumentStore, DEPLOYED_TOKENS_KEY};
use crate::utils;

fn selector(sig: &str) -> [u8; 4] {
    let mut sel = [0u8; 4];
    sel.copy_from_slice(&keccak256(sig.as_bytes())[0..4]);
    sel
}

fn encode_call(sig: &str, tokens: Vec<Token>) -> Bytes {
    let mut out = selector(sig).to_vec();
    out.extend(encode(&tokens));
    Bytes::from(out)
}

pub fn erc20_transfer_data(to: Address, amount: U256) -> Bytes {
    encode_call(
        "transfer(address,uint256)",
        vec![Token::Address(to), Token::Uint(amount)],
    )
}

fn decode_decimals(raw: &Bytes) -> Result<u32> {
    let tokens = decode(&[ParamType::Uint(8)], raw.as_ref())
        .map_err(|e| anyhow!("Invalid decimals() response: {}", e))?;
    match tokens.first() {
        Some(Token::Uint(n)) if *n <= U256::from(77u64) => Ok(n.as_u32()),
        _ => Err(anyhow!("Invalid decimals() response")),
    }
}

/// One named place a token symbol can be resolved from.
pub trait TokenSource: Send + Sync {
    fn name(&self) -> &str;

    fn lookup(&self, symbol: &str) -> Option<TokenRef>;
}

/// A source over an already-loaded token list.
#[derive(Debug, Clone)]
pub struct ListTokenSource {
    name: String,
    tokens: Vec<TokenRef>,
}

impl ListTokenSource {
    pub fn new(name: impl Into<String>, tokens: Vec<TokenRef>) -> Self {
        Self {
            name: name.into(),
            tokens,
        }
    }
}

impl TokenSource for ListTokenSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookup(&self, symbol: &str) -> Option<TokenRef> {
        self.tokens
            .iter()
            .find(|token| token.symbol.eq_ignore_ascii_case(symbol))
            .cloned()
    }
}

/// Tries each source in order; the first match wins.
pub struct TokenResolver {
    sources: Vec<Box<dyn TokenSource>>,
}

impl TokenResolver {
    pub fn new(sources: Vec<Box<dyn TokenSource>>) -> Self {
        Self { sources }
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|source| source.name()).collect()
    }

    /// Returns the token and the name of the source that resolved it.
    pub fn resolve(&self, symbol: &str) -> Option<(TokenRef, &str)> {
        self.sources
            .iter()
            .find_map(|source| source.lookup(symbol).map(|token| (token, source.name())))
    }
}

/// Loads a well-known token list (a JSON array of `{name, symbol, address}`).
pub fn load_token_list(path: &Path) -> Result<Vec<TokenRef>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read token list {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse token list {}", path.display()))
}

/// Deployed-token list plus ERC-20 transfers by symbol.
pub struct TokenRegistry {
    gateway: Arc<dyn ChainGateway>,
    store: Arc<dyn DocumentStore>,
    urls: ExplorerUrls,
    well_known: Vec<TokenRef>,
    append_lock: Mutex<()>,
}

impl TokenRegistry {
    pub fn new(
        gateway: Arc<dyn ChainGateway>,
        store: Arc<dyn DocumentStore>,
        urls: ExplorerUrls,
        well_known: Vec<TokenRef>,
    ) -> Self {
        Self {
            gateway,
            store,
            urls,
            well_known,
            append_lock: Mutex::new(()),
        }
    }

    pub async fn list_tokens(&self) -> Result<Vec<TokenRecord>> {
        match self.store.read_document(DEPLOYED_TOKENS_KEY).await? {
            Some(document) => {
                serde_json::from_value(document).context("Failed to parse deployed token list")
            }
            None => Ok(Vec::new()),
        }
    }

    /// Appends a deployment to the deployed-token list.
    pub async fn register_token(&self, record: TokenRecord) -> Result<TokenRecord, TokenError> {
        let address = utils::parse_address(&record.address)
            .ok_or_else(|| TokenError::InvalidAddress(record.address.clone()))?;
        let address = utils::checksum(&address);
        let record = TokenRecord {
            explorer: ExplorerLinks {
                contract: self.urls.address_url(&address),
                transaction: self.urls.transaction_url(&record.tx_hash),
            },
            address,
            ..record
        };

        let _guard = self.append_lock.lock().await;
        let mut tokens = self.list_tokens().await?;
        tokens.push(record.clone());
        let document: Value = serde_json::to_value(&tokens).context("Failed to serialize token list")?;
        self.store
            .write_document(DEPLOYED_TOKENS_KEY, &document)
            .await
            .context("Failed to persist deployed token list")?;

        info!("Registered token {} at {}", record.symbol, record.address);
        Ok(record)
    }

    /// Builds the lookup chain: well-known tokens first, then deployments.
    pub async fn resolver(&self) -> TokenResolver {
        let deployed = match self.list_tokens().await {
            Ok(tokens) => tokens
                .into_iter()
                .map(|t| TokenRef {
                    name: t.name,
                    symbol: t.symbol,
                    address: t.address,
                })
                .collect(),
            Err(e) => {
                warn!("Deployed token list unreadable, skipping it: {:#}", e);
                Vec::new()
            }
        };
        TokenResolver::new(vec![
            Box::new(ListTokenSource::new("well-known", self.well_known.clone())),
            Box::new(ListTokenSource::new("deployed", deployed)),
        ])
    }

    /// Transfers `amount` (human units) of the token named `symbol` to `recipient`.
    pub async fn transfer_token(
        &self,
        symbol: &str,
        recipient: &str,
        amount: &str,
    ) -> Result<TokenTransferOutcome, TokenError> {
        let to = utils::parse_address(recipient)
            .ok_or_else(|| TokenError::InvalidAddress(recipient.to_string()))?;

        let resolver = self.resolver().await;
        let (token, source) = resolver.resolve(symbol).ok_or_else(|| {
            TokenError::UnknownToken(symbol.to_string(), resolver.source_names().join(" or "))
        })?;
        let contract = utils::parse_address(&token.address)
            .ok_or_else(|| TokenError::InvalidAddress(token.address.clone()))?;

        let decimals_call = TransactionRequest::new()
            .to(contract)
            .data(encode_call("decimals()", vec![]));
        let decimals = decode_decimals(&self.gateway.call(&decimals_call).await?)?;

        let units = utils::parse_amount(amount, decimals)
            .map_err(|e| TokenError::InvalidAmount(amount.to_string(), e.to_string()))?;

        let tx = TransactionRequest::new()
            .to(contract)
            .data(erc20_transfer_data(to, units));
        let hash = self.gateway.send_transaction(tx).await?;
        let receipt = self.gateway.wait_for_confirmations(hash, 1).await?;
        let tx_hash = format!("{:?}", receipt.transaction_hash);

        info!("Transferred {} {} to {:?} in {}", amount, token.symbol, to, tx_hash);

        Ok(TokenTransferOutcome {
            token: token.name,
            symbol: token.symbol,
            recipient: utils::checksum(&to),
            amount: amount.to_string(),
            explorer: ExplorerLinks {
                transaction: self.urls.transaction_url(&tx_hash),
                contract: self.urls.address_url(&token.address),
            },
            tx_hash,
            source: source.to_string(),
        })
    }

    /// Native balance of `address`.
    pub async fn get_native_balance(&self, address: &str) -> Result<U256, TokenError> {
        let address = utils::parse_address(address)
            .ok_or_else(|| TokenError::InvalidAddress(address.to_string()))?;
        Ok(self.gateway.get_balance(address).await?)
    }
}
