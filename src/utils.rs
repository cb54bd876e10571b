//! Utility functions for unit conversion and address handling

use std::str::FromStr;

use anyhow::{anyhow, Result};
use ethers::types::{Address, U256};
use ethers::utils::{format_units, parse_units, to_checksum};

/// Decimals of the chain's native currency.
pub const NATIVE_DECIMALS: u32 = 18;
/// Decimals of the gwei display unit.
pub const GWEI_DECIMALS: u32 = 9;

/// Validates an EVM address: `0x` followed by 40 hex digits. Mixed-case input
/// must carry a valid EIP-55 checksum.
pub fn parse_address(input: &str) -> Option<Address> {
    let hex = input.strip_prefix("0x").or_else(|| input.strip_prefix("0X"))?;
    if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let address = Address::from_str(hex).ok()?;
    let has_lower = hex.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = hex.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper && to_checksum(&address, None)[2..] != *hex {
        return None;
    }
    Some(address)
}

pub fn is_valid_address(input: &str) -> bool {
    parse_address(input).is_some()
}

/// EIP-55 form of an address.
pub fn checksum(address: &Address) -> String {
    to_checksum(address, None)
}

/// Formats an integer amount at `decimals`, trimming trailing zeros but
/// keeping at least one fractional digit ("1.5", "0.0").
pub fn format_amount(amount: U256, decimals: u32) -> String {
    let raw = format_units(amount, decimals).unwrap_or_else(|_| amount.to_string());
    match raw.split_once('.') {
        Some((whole, fraction)) => {
            let fraction = fraction.trim_end_matches('0');
            if fraction.is_empty() {
                format!("{}.0", whole)
            } else {
                format!("{}.{}", whole, fraction)
            }
        }
        None => format!("{}.0", raw),
    }
}

pub fn format_native(amount: U256) -> String {
    format_amount(amount, NATIVE_DECIMALS)
}

pub fn format_gwei(amount: U256) -> String {
    format_amount(amount, GWEI_DECIMALS)
}

/// Parses a human decimal ("0.0001") into the smallest unit at `decimals`.
pub fn parse_amount(amount: &str, decimals: u32) -> Result<U256> {
    let trimmed = amount.trim();
    if trimmed.is_empty() || trimmed.starts_with('-') {
        return Err(anyhow!("amount must be a non-negative decimal"));
    }
    parse_units(trimmed, decimals)
        .map(Into::into)
        .map_err(|e| anyhow!("{}", e))
}

pub fn parse_native(amount: &str) -> Result<U256> {
    parse_amount(amount, NATIVE_DECIMALS)
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_lowercase_and_checksummed_addresses() {
        assert!(is_valid_address("0x52908400098527886e0f7030069857d2e4169ee7"));
        assert!(is_valid_address("0x52908400098527886E0F7030069857D2E4169EE7"));
        assert!(is_valid_address("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"));
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(!is_valid_address(""));
        assert!(!is_valid_address("0x1234"));
        assert!(!is_valid_address("5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"));
        assert!(!is_valid_address("0xzzAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"));
        // bad checksum: last char case flipped
        assert!(!is_valid_address("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAeD"));
    }

    #[test]
    fn formats_native_amounts_without_trailing_zeros() {
        assert_eq!(format_native(U256::exp10(14)), "0.0001");
        assert_eq!(format_native(U256::exp10(18) * 3), "3.0");
        assert_eq!(format_native(U256::zero()), "0.0");
        assert_eq!(format_gwei(U256::from(1_500_000_000u64)), "1.5");
    }

    #[test]
    fn parses_decimal_amounts() {
        assert_eq!(parse_native("0.0001").unwrap(), U256::exp10(14));
        assert_eq!(parse_amount("12.5", 6).unwrap(), U256::from(12_500_000u64));
        assert!(parse_native("abc").is_err());
        assert!(parse_native("-1").is_err());
        assert!(parse_native("").is_err());
    }
}
