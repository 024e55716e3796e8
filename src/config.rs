//! Runtime configuration.
//!
//! The browser build has no environment, so `build.rs` bakes the RPC URL,
//! preferred chain and address book into the binary and
//! [`AppConfig::baked`] reads them back. Native tools call
//! [`AppConfig::from_env`], which honours a `.env` file.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::contracts::AddressBook;
use crate::error::WalletError;
use crate::network::{ChainParams, GANACHE_CHAIN_ID};
use crate::transactions::ConfirmPolicy;

pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:7545";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} is not a valid number: {value}")]
    BadNumber { key: &'static str, value: String },
    #[error("reading address book {path}: {source}")]
    AddressBookFile { path: String, source: std::io::Error },
    #[error("address book: {0}")]
    AddressBook(#[from] WalletError),
}

/// Polling periods per consumer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intervals {
    pub token: Duration,
    pub staking: Duration,
    pub auction: Duration,
    pub watchdog: Duration,
    pub balance: Duration,
}

impl Default for Intervals {
    fn default() -> Self {
        Self {
            token: Duration::from_secs(15),
            staking: Duration::from_secs(5),
            auction: Duration::from_secs(10),
            watchdog: Duration::from_secs(5),
            balance: Duration::from_secs(15),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub rpc_url: String,
    /// Chain the wallet is asked to switch to right after connecting.
    pub preferred_chain: Option<u64>,
    pub intervals: Intervals,
    pub confirm: ConfirmPolicy,
    pub address_book: AddressBook,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            preferred_chain: None,
            intervals: Intervals::default(),
            confirm: ConfirmPolicy::default(),
            address_book: AddressBook::default(),
        }
    }
}

impl AppConfig {
    pub fn preferred_chain_params(&self) -> Option<ChainParams> {
        self.preferred_chain.map(|id| ChainParams::for_chain(id, &self.rpc_url))
    }

    /// Values baked in by `build.rs`.
    pub fn baked() -> Result<Self, ConfigError> {
        let preferred_chain = match option_env!("DAPP_CHAIN_ID") {
            Some(raw) if !raw.is_empty() => Some(parse_number("DAPP_CHAIN_ID", raw)?),
            _ => Some(GANACHE_CHAIN_ID),
        };
        Ok(Self {
            rpc_url: option_env!("DAPP_RPC_URL").unwrap_or(DEFAULT_RPC_URL).to_string(),
            preferred_chain,
            address_book: AddressBook::from_json(include_str!(concat!(env!("OUT_DIR"), "/address_book.json")))?,
            ..Self::default()
        })
    }

    /// `DAPP_RPC_URL`, `DAPP_CHAIN_ID`, `DAPP_ADDRESS_BOOK` (inline JSON or a
    /// path), `DAPP_CONFIRM_ATTEMPTS`.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }

        let mut config = Self::default();
        if let Ok(url) = std::env::var("DAPP_RPC_URL") {
            config.rpc_url = url;
        }
        if let Ok(raw) = std::env::var("DAPP_CHAIN_ID") {
            config.preferred_chain = Some(parse_number("DAPP_CHAIN_ID", &raw)?);
        }
        if let Ok(raw) = std::env::var("DAPP_CONFIRM_ATTEMPTS") {
            config.confirm.max_attempts = parse_number("DAPP_CONFIRM_ATTEMPTS", &raw)?;
        }
        if let Ok(source) = std::env::var("DAPP_ADDRESS_BOOK") {
            config.address_book = load_address_book(&source)?;
        }
        Ok(config)
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn load_address_book(source: &str) -> Result<AddressBook, ConfigError> {
    let trimmed = source.trim();
    if trimmed.starts_with('{') {
        return Ok(AddressBook::from_json(trimmed)?);
    }
    let raw = std::fs::read_to_string(trimmed)
        .map_err(|source| ConfigError::AddressBookFile { path: trimmed.to_string(), source })?;
    Ok(AddressBook::from_json(&raw)?)
}

fn parse_number<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::BadNumber { key, value: raw.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::ContractKind;

    #[test]
    fn default_intervals() {
        let intervals = Intervals::default();
        assert_eq!(intervals.token, Duration::from_secs(15));
        assert_eq!(intervals.staking, Duration::from_secs(5));
        assert_eq!(intervals.auction, Duration::from_secs(10));
    }

    #[test]
    fn preferred_chain_params_use_rpc_url() {
        let config = AppConfig { preferred_chain: Some(GANACHE_CHAIN_ID), ..AppConfig::default() };
        let params = config.preferred_chain_params().unwrap();
        assert_eq!(params.chain_id, 1337);
        assert_eq!(params.rpc_urls, vec![DEFAULT_RPC_URL.to_string()]);
        assert!(AppConfig::default().preferred_chain_params().is_none());
    }

    #[test]
    fn inline_address_book() {
        let book = load_address_book(r#" {"RewardToken": {"5777": "0x5555555555555555555555555555555555555555"}} "#).unwrap();
        assert!(book.lookup(ContractKind::RewardToken, 5777).is_some());
        assert!(matches!(load_address_book("/definitely/missing.json"), Err(ConfigError::AddressBookFile { .. })));
        assert!(matches!(parse_number::<u64>("DAPP_CHAIN_ID", "abc"), Err(ConfigError::BadNumber { .. })));
    }

    #[test]
    fn confirm_attempts_must_fit_u32() {
        assert_eq!(parse_number::<u32>("DAPP_CONFIRM_ATTEMPTS", " 45 ").unwrap(), 45);
        let err = parse_number::<u32>("DAPP_CONFIRM_ATTEMPTS", "4294967296").unwrap_err();
        assert_eq!(err.to_string(), "DAPP_CONFIRM_ATTEMPTS is not a valid number: 4294967296");
    }
}
