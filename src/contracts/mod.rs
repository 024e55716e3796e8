//! Contract address resolution and ABI-level reads and writes.
//!
//! Every deployed contract is looked up by `(kind, network id)` in a static
//! [`AddressBook`]. A missing entry means no [`ContractHandle`] is ever
//! built; the loader logs it once and returns
//! [`WalletError::NetworkMismatch`] without touching the provider.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use ethers_core::abi::{parse_abi, Abi, Token};
use ethers_core::types::{Address, Bytes, U256};
use serde_json::Value;

use crate::error::WalletError;
use crate::network::{GANACHE_CHAIN_ID, GANACHE_NETWORK_ID};
use crate::provider::{CallRequest, TxReceipt, WalletProvider};
use crate::transactions::{wait_for_receipt, ConfirmPolicy};

pub mod auction;
pub mod staking;
pub mod token;

pub use auction::AuctionContract;
pub use staking::{StakerInfo, StakingContract};
pub use token::TokenContract;

const ERC20: &[&str] = &[
    "function name() external view returns (string)",
    "function symbol() external view returns (string)",
    "function decimals() external view returns (uint8)",
    "function totalSupply() external view returns (uint256)",
    "function balanceOf(address account) external view returns (uint256)",
    "function transfer(address to, uint256 amount) external returns (bool)",
    "function approve(address spender, uint256 amount) external returns (bool)",
    "function allowance(address owner, address spender) external view returns (uint256)",
];

const BURN_EXTENSION: &[&str] = &["function transferWithAutoBurn(address to, uint256 amount) external"];

const STAKING_PLATFORM: &[&str] = &[
    "function stake(uint256 amount) external",
    "function unStake() external",
    "function stakers(address account) external view returns (uint256 amount, uint256 startTime)",
    "function calculateRewards(address account) external view returns (uint256)",
    "function apr() external view returns (uint256)",
    "function setAPR(uint256 newApr) external",
];

const SIMPLE_AUCTION: &[&str] = &[
    "function bid() external payable",
    "function highestBid() external view returns (uint256)",
    "function highestBidder() external view returns (address)",
    "function auctionEnded() external view returns (bool)",
    "function endAuction() external",
    "function resetAuction() external",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContractKind {
    DefiToken,
    StakingToken,
    RewardToken,
    StakingPlatform,
    SimpleAuction,
}

impl ContractKind {
    pub const ALL: [ContractKind; 5] = [
        ContractKind::DefiToken,
        ContractKind::StakingToken,
        ContractKind::RewardToken,
        ContractKind::StakingPlatform,
        ContractKind::SimpleAuction,
    ];

    /// Artifact / address-book name.
    pub fn name(self) -> &'static str {
        match self {
            ContractKind::DefiToken => "SimpleDeFiToken",
            ContractKind::StakingToken => "StakingToken",
            ContractKind::RewardToken => "RewardToken",
            ContractKind::StakingPlatform => "StakingPlatform",
            ContractKind::SimpleAuction => "SimpleAuction",
        }
    }

    fn signatures(self) -> Vec<&'static str> {
        match self {
            ContractKind::DefiToken => ERC20.iter().chain(BURN_EXTENSION).copied().collect(),
            ContractKind::StakingToken | ContractKind::RewardToken => ERC20.to_vec(),
            ContractKind::StakingPlatform => STAKING_PLATFORM.to_vec(),
            ContractKind::SimpleAuction => SIMPLE_AUCTION.to_vec(),
        }
    }

    pub fn abi(self) -> Result<Abi, WalletError> {
        parse_abi(&self.signatures()).map_err(|e| WalletError::Decode(format!("{} abi: {e}", self.name())))
    }
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ContractKind {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContractKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| WalletError::Decode(format!("unknown contract `{s}`")))
    }
}

/// Deployed addresses per `(contract, network id)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddressBook {
    entries: BTreeMap<(ContractKind, u64), Address>,
    // Artifacts saved without a `networks` section
    fallback: BTreeMap<ContractKind, Address>,
}

impl AddressBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// `{ "StakingToken": { "5777": "0x…" }, … }`
    pub fn from_json(raw: &str) -> Result<Self, WalletError> {
        let value: Value = serde_json::from_str(raw).map_err(|e| WalletError::Decode(format!("address book: {e}")))?;
        let table = value
            .as_object()
            .ok_or_else(|| WalletError::Decode("address book must be a JSON object".into()))?;

        let mut book = Self::new();
        for (name, networks) in table {
            let kind: ContractKind = name.parse()?;
            let networks = networks
                .as_object()
                .ok_or_else(|| WalletError::Decode(format!("{name}: expected a network table")))?;
            for (network, address) in networks {
                let network_id = network
                    .parse::<u64>()
                    .map_err(|_| WalletError::Decode(format!("{name}: bad network id `{network}`")))?;
                book.insert(kind, network_id, parse_address(address)?);
            }
        }
        Ok(book)
    }

    /// Merge a Truffle build artifact: `networks.<id>.address`, else a
    /// top-level `address` that applies to any network.
    pub fn add_artifact(&mut self, kind: ContractKind, raw: &str) -> Result<(), WalletError> {
        let artifact: Value =
            serde_json::from_str(raw).map_err(|e| WalletError::Decode(format!("{kind} artifact: {e}")))?;

        let mut found = false;
        if let Some(networks) = artifact.get("networks").and_then(Value::as_object) {
            for (network, entry) in networks {
                let (Ok(network_id), Some(address)) = (network.parse::<u64>(), entry.get("address")) else {
                    continue;
                };
                self.insert(kind, network_id, parse_address(address)?);
                found = true;
            }
        }
        if !found {
            if let Some(address) = artifact.get("address") {
                self.fallback.insert(kind, parse_address(address)?);
                found = true;
            }
        }
        if found {
            Ok(())
        } else {
            Err(WalletError::Decode(format!("{kind} artifact has no deployed address")))
        }
    }

    pub fn insert(&mut self, kind: ContractKind, network_id: u64, address: Address) {
        self.entries.insert((kind, network_id), address);
    }

    /// Ganache reports chain id 1337 but Truffle records network id 5777.
    pub fn lookup(&self, kind: ContractKind, chain_id: u64) -> Option<Address> {
        let alias = match chain_id {
            GANACHE_CHAIN_ID => Some(GANACHE_NETWORK_ID),
            GANACHE_NETWORK_ID => Some(GANACHE_CHAIN_ID),
            _ => None,
        };
        self.entries
            .get(&(kind, chain_id))
            .or_else(|| alias.and_then(|id| self.entries.get(&(kind, id))))
            .or_else(|| self.fallback.get(&kind))
            .copied()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.fallback.is_empty()
    }
}

fn parse_address(value: &Value) -> Result<Address, WalletError> {
    value
        .as_str()
        .and_then(|s| s.parse::<Address>().ok())
        .ok_or_else(|| WalletError::Decode(format!("bad contract address {value}")))
}

/// A resolved contract: address plus the ABI used to talk to it.
#[derive(Debug, Clone)]
pub struct ContractHandle {
    pub kind: ContractKind,
    pub address: Address,
    abi: Rc<Abi>,
}

impl ContractHandle {
    pub fn new(kind: ContractKind, address: Address) -> Result<Self, WalletError> {
        Ok(Self { kind, address, abi: Rc::new(kind.abi()?) })
    }

    fn function(&self, method: &str) -> Result<&ethers_core::abi::Function, WalletError> {
        self.abi
            .function(method)
            .map_err(|e| WalletError::Decode(format!("{}.{method}: {e}", self.kind)))
    }

    pub fn selector(&self, method: &str) -> Result<[u8; 4], WalletError> {
        Ok(self.function(method)?.short_signature())
    }

    pub fn encode(&self, method: &str, args: &[Token]) -> Result<Bytes, WalletError> {
        self.function(method)?
            .encode_input(args)
            .map(Bytes::from)
            .map_err(|e| WalletError::Decode(format!("{}.{method} arguments: {e}", self.kind)))
    }

    pub fn decode(&self, method: &str, output: &[u8]) -> Result<Vec<Token>, WalletError> {
        self.function(method)?
            .decode_output(output)
            .map_err(|e| WalletError::Decode(format!("{}.{method} output: {e}", self.kind)))
    }
}

/// Extras for a state-changing call.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WriteOptions {
    pub value: Option<U256>,
    pub gas: Option<U256>,
}

/// Resolves handles and runs reads / confirmed writes against them.
#[derive(Clone)]
pub struct ContractLoader {
    book: Rc<AddressBook>,
    provider: Rc<dyn WalletProvider>,
    policy: ConfirmPolicy,
    handles: Rc<RefCell<BTreeMap<(ContractKind, u64), ContractHandle>>>,
}

impl ContractLoader {
    pub fn new(book: AddressBook, provider: Rc<dyn WalletProvider>, policy: ConfirmPolicy) -> Self {
        Self { book: Rc::new(book), provider, policy, handles: Rc::default() }
    }

    pub fn provider(&self) -> &Rc<dyn WalletProvider> {
        &self.provider
    }

    pub fn address_book(&self) -> &AddressBook {
        &self.book
    }

    /// Handle for `kind` on `chain_id`, built once and cached.
    pub fn resolve(&self, kind: ContractKind, chain_id: u64) -> Result<ContractHandle, WalletError> {
        if let Some(handle) = self.handles.borrow().get(&(kind, chain_id)) {
            return Ok(handle.clone());
        }
        let Some(address) = self.book.lookup(kind, chain_id) else {
            tracing::error!(contract = kind.name(), chain_id, "contract not deployed on this network");
            return Err(WalletError::NetworkMismatch { contract: kind.name(), chain_id });
        };
        let handle = ContractHandle::new(kind, address)?;
        tracing::debug!(contract = kind.name(), chain_id, address = ?address, "contract handle resolved");
        self.handles.borrow_mut().insert((kind, chain_id), handle.clone());
        Ok(handle)
    }

    /// `eth_call`, no side effects.
    pub async fn read(&self, handle: &ContractHandle, method: &str, args: &[Token]) -> Result<Vec<Token>, WalletError> {
        let data = handle.encode(method, args)?;
        let req = CallRequest { to: handle.address, data, ..Default::default() };
        let output = self.provider.call(&req).await?;
        handle.decode(method, &output)
    }

    /// Submit and wait for a successful receipt.
    pub async fn write(
        &self,
        handle: &ContractHandle,
        from: Address,
        method: &str,
        args: &[Token],
        options: WriteOptions,
    ) -> Result<TxReceipt, WalletError> {
        let data = handle.encode(method, args)?;
        let req = CallRequest { from: Some(from), to: handle.address, data, value: options.value, gas: options.gas };
        tracing::info!(contract = handle.kind.name(), method, "submitting transaction");
        let hash = self.provider.send_transaction(&req).await?;
        tracing::info!(contract = handle.kind.name(), method, tx = ?hash, "transaction sent, waiting for receipt");
        wait_for_receipt(self.provider.as_ref(), hash, self.policy).await
    }
}

impl fmt::Debug for ContractLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractLoader")
            .field("book", &self.book)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

pub(crate) fn single_uint(tokens: Vec<Token>) -> Result<U256, WalletError> {
    match tokens.into_iter().next() {
        Some(Token::Uint(v)) => Ok(v),
        other => Err(WalletError::Decode(format!("expected uint, got {other:?}"))),
    }
}

pub(crate) fn single_address(tokens: Vec<Token>) -> Result<Address, WalletError> {
    match tokens.into_iter().next() {
        Some(Token::Address(a)) => Ok(a),
        other => Err(WalletError::Decode(format!("expected address, got {other:?}"))),
    }
}

pub(crate) fn single_bool(tokens: Vec<Token>) -> Result<bool, WalletError> {
    match tokens.into_iter().next() {
        Some(Token::Bool(b)) => Ok(b),
        other => Err(WalletError::Decode(format!("expected bool, got {other:?}"))),
    }
}
