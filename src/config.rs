// src/config.rs

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use secrecy::SecretString;

use crate::blockchain::models::FaucetLimits;
use crate::blockchain::retry::RetryPolicy;

/// Name of the directory created under the cache root.
pub const CACHE_DIR_NAME: &str = ".citrea-mcp";

// A struct to hold all configuration, loaded once at startup from the .env file.
#[derive(Clone, Debug)]
pub struct Config {
    // Server settings
    pub port: u16,

    /// Citrea testnet endpoint and signing chain id
    pub rpc_url: String,
    pub chain_id: u64,
    pub explorer_base_url: String,
    /// Display symbol of the native currency (cBTC on Citrea)
    pub native_symbol: String,

    /// Operator key used for faucet payouts and token transfers
    pub private_key: Option<SecretString>,
    /// Directory holding the JSON documents (claims, deployed tokens)
    pub cache_dir: PathBuf,
    pub well_known_tokens_path: Option<PathBuf>,

    // Faucet settings
    pub faucet_limits: FaucetLimits,

    // Explorer scan settings
    pub scan_ceiling: u64,
    pub scan_batch_size: u64,
    pub block_timeout: Duration,
    pub summary_timeout: Duration,

    // Gateway settings
    pub retry_policy: RetryPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            rpc_url: "https://rpc.testnet.citrea.xyz".to_string(),
            chain_id: 5115,
            explorer_base_url: "https://explorer.testnet.citrea.xyz".to_string(),
            native_symbol: "cBTC".to_string(),
            private_key: None,
            cache_dir: PathBuf::from(CACHE_DIR_NAME),
            well_known_tokens_path: None,
            faucet_limits: FaucetLimits::default(),
            scan_ceiling: 100,
            scan_batch_size: 10,
            block_timeout: Duration::from_secs(5),
            summary_timeout: Duration::from_secs(30),
            retry_policy: RetryPolicy::default(),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        // Load variables from the .env file into the environment
        dotenvy::dotenv().ok();

        let defaults = Config::default();

        let cache_dir = resolve_cache_dir(env::var("CACHE_DIR").ok())?;

        let faucet_limits = FaucetLimits {
            max_claims_per_day: parse_var("FAUCET_MAX_CLAIMS_PER_DAY", defaults.faucet_limits.max_claims_per_day)?,
            max_amount_per_claim: env::var("FAUCET_AMOUNT_PER_CLAIM")
                .unwrap_or(defaults.faucet_limits.max_amount_per_claim),
            window_hours: parse_var("FAUCET_WINDOW_HOURS", defaults.faucet_limits.window_hours)?,
        };

        let retry_policy = RetryPolicy {
            max_attempts: parse_var("RPC_MAX_ATTEMPTS", defaults.retry_policy.max_attempts)?,
            initial_backoff: Duration::from_millis(parse_var(
                "RPC_BACKOFF_MS",
                defaults.retry_policy.initial_backoff.as_millis() as u64,
            )?),
            max_backoff: defaults.retry_policy.max_backoff,
        };

        Ok(Config {
            port: parse_var("PORT", defaults.port)?,
            rpc_url: env::var("CITREA_RPC_URL").unwrap_or(defaults.rpc_url),
            chain_id: parse_var("CITREA_CHAIN_ID", defaults.chain_id)?,
            explorer_base_url: env::var("EXPLORER_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.explorer_base_url),
            native_symbol: env::var("NATIVE_SYMBOL").unwrap_or(defaults.native_symbol),
            private_key: env::var("PRIVATE_KEY").ok().map(SecretString::new),
            cache_dir,
            well_known_tokens_path: env::var("WELL_KNOWN_TOKENS_PATH").ok().map(PathBuf::from),
            faucet_limits,
            scan_ceiling: parse_var("EXPLORER_SCAN_CEILING", defaults.scan_ceiling)?,
            scan_batch_size: parse_var("EXPLORER_BATCH_SIZE", defaults.scan_batch_size)?,
            block_timeout: Duration::from_millis(parse_var("EXPLORER_BLOCK_TIMEOUT_MS", 5_000u64)?),
            summary_timeout: Duration::from_millis(parse_var("EXPLORER_SUMMARY_TIMEOUT_MS", 30_000u64)?),
            retry_policy,
        })
    }
}

impl Config {
    /// The signing key, required by the binary.
    pub fn require_private_key(&self) -> Result<&SecretString> {
        self.private_key
            .as_ref()
            .ok_or_else(|| anyhow!("PRIVATE_KEY environment variable is required"))
    }
}

/// Resolves `<CACHE_DIR or home>/.citrea-mcp`, failing when neither is available.
pub fn resolve_cache_dir(cache_root: Option<String>) -> Result<PathBuf> {
    let root = cache_root
        .filter(|dir| !dir.trim().is_empty())
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .ok_or_else(|| {
            anyhow!("Environment variable CACHE_DIR or HOME not set. Set it to a valid directory path.")
        })?;
    Ok(root.join(CACHE_DIR_NAME))
}

fn parse_var<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid number", key)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_dir_prefers_explicit_root() {
        let dir = resolve_cache_dir(Some("/tmp/cache".to_string())).unwrap();
        assert_eq!(dir, PathBuf::from("/tmp/cache").join(CACHE_DIR_NAME));
    }

    #[test]
    fn blank_cache_root_falls_back_to_home() {
        let dir = resolve_cache_dir(Some("  ".to_string()));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(dir.unwrap(), home.join(CACHE_DIR_NAME));
        } else {
            assert!(dir.is_err());
        }
    }

    #[test]
    fn defaults_match_testnet() {
        let config = Config::default();
        assert_eq!(config.chain_id, 5115);
        assert_eq!(config.faucet_limits.max_claims_per_day, 5);
        assert_eq!(config.faucet_limits.max_amount_per_claim, "0.0001");
        assert_eq!(config.scan_ceiling, 100);
    }

    #[test]
    fn missing_private_key_is_an_error() {
        let mut config = Config::default();
        let err = config.require_private_key().unwrap_err();
        assert!(err.to_string().contains("PRIVATE_KEY"));

        config.private_key = Some(SecretString::new("0x01".to_string()));
        assert!(config.require_private_key().is_ok());
    }
}
