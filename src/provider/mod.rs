//! The wallet provider boundary.
//!
//! [`WalletProvider`] is the black box the rest of the crate talks to:
//! account and chain queries, `eth_call`, transaction submission, receipts,
//! chain switching and an event subscription that hands back an
//! unsubscribe handle. Two implementations ship with the crate:
//!
//! * [`InjectedProvider`] wraps the browser's `window.ethereum` (wasm32).
//! * [`HttpProvider`] speaks JSON-RPC to a node, optionally signing with a
//!   local key.

use async_trait::async_trait;
use ethers_core::types::{Address, Bytes, H256, U256};

use crate::error::WalletError;
use crate::network::ChainParams;
use crate::store::Subscription;

mod http;
#[cfg(target_arch = "wasm32")]
mod injected;

pub use http::HttpProvider;
#[cfg(target_arch = "wasm32")]
pub use injected::InjectedProvider;

/// Events pushed by the provider.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    AccountsChanged(Vec<Address>),
    ChainChanged(u64),
    Disconnect,
}

pub type EventHandler = Box<dyn Fn(&ProviderEvent)>;

/// A contract call or transaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallRequest {
    pub from: Option<Address>,
    pub to: Address,
    pub data: Bytes,
    pub value: Option<U256>,
    pub gas: Option<U256>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TxReceipt {
    pub transaction_hash: H256,
    pub block_number: Option<u64>,
    pub status: Option<u64>,
    pub gas_used: Option<U256>,
}

impl TxReceipt {
    pub fn succeeded(&self) -> bool {
        self.status == Some(1)
    }
}

#[async_trait(?Send)]
pub trait WalletProvider {
    /// Whether a wallet is reachable at all.
    fn is_available(&self) -> bool {
        true
    }

    /// Prompting account request (`eth_requestAccounts`).
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError>;

    /// Already-authorized accounts, never prompts (`eth_accounts`).
    async fn accounts(&self) -> Result<Vec<Address>, WalletError>;

    async fn chain_id(&self) -> Result<u64, WalletError>;

    async fn balance(&self, address: Address) -> Result<U256, WalletError>;

    async fn call(&self, req: &CallRequest) -> Result<Bytes, WalletError>;

    async fn send_transaction(&self, req: &CallRequest) -> Result<H256, WalletError>;

    async fn transaction_receipt(&self, hash: H256) -> Result<Option<TxReceipt>, WalletError>;

    async fn switch_chain(&self, params: &ChainParams) -> Result<(), WalletError>;

    /// Register for account / chain / disconnect events.
    fn subscribe(&self, handler: EventHandler) -> Result<Subscription, WalletError>;
}
