use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ethers_core::abi::{encode, Token};
use ethers_core::types::{Address, Bytes, H256, U256};
use ethers_core::utils::id;
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

use crate::config::AppConfig;
use crate::context::AppContext;
use crate::contracts::{AddressBook, ContractKind};
use crate::error::WalletError;
use crate::network::{ChainParams, GANACHE_CHAIN_ID};
use crate::provider::{CallRequest, EventHandler, ProviderEvent, TxReceipt, WalletProvider};
use crate::storage::MemoryFlags;
use crate::store::{Listeners, Subscription};

pub const USER: Address = Address::repeat_byte(0xaa);
pub const OTHER: Address = Address::repeat_byte(0xbb);
pub const DEFI_TOKEN: Address = Address::repeat_byte(0x10);
pub const STAKING_TOKEN: Address = Address::repeat_byte(0x20);
pub const REWARD_TOKEN: Address = Address::repeat_byte(0x30);
pub const PLATFORM: Address = Address::repeat_byte(0x40);
pub const AUCTION: Address = Address::repeat_byte(0x50);

pub fn ether(n: u64) -> U256 {
    U256::from(n) * U256::exp10(18)
}

pub fn selector(signature: &str) -> [u8; 4] {
    id(signature)
}

/// Scripted wallet provider. Every method call is appended to `log`.
pub struct MockProvider {
    pub available: Cell<bool>,
    pub accounts: RefCell<Vec<Address>>,
    pub request_error: RefCell<Option<WalletError>>,
    pub chain_id: Cell<u64>,
    pub native_balance: Cell<U256>,
    pub send_error: RefCell<Option<WalletError>>,
    pub receipt_status: Cell<u64>,
    pub receipt_pending: Cell<bool>,
    /// Latency added to every `eth_call`.
    pub call_delay: Cell<Duration>,
    pub switch_error: RefCell<Option<WalletError>>,
    pub sent: RefCell<Vec<CallRequest>>,
    pub log: RefCell<Vec<&'static str>>,
    responses: RefCell<HashMap<(Address, [u8; 4]), Bytes>>,
    listeners: Listeners<ProviderEvent>,
    next_hash: Cell<u64>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            available: Cell::new(true),
            accounts: RefCell::new(vec![USER]),
            request_error: RefCell::new(None),
            chain_id: Cell::new(GANACHE_CHAIN_ID),
            native_balance: Cell::new(ether(10)),
            send_error: RefCell::new(None),
            receipt_status: Cell::new(1),
            receipt_pending: Cell::new(false),
            call_delay: Cell::new(Duration::ZERO),
            switch_error: RefCell::new(None),
            sent: RefCell::new(Vec::new()),
            log: RefCell::new(Vec::new()),
            responses: RefCell::new(HashMap::new()),
            listeners: Listeners::new(),
            next_hash: Cell::new(1),
        }
    }
}

impl MockProvider {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Answer `eth_call`s of `signature` on `to` with `output`.
    pub fn respond(&self, to: Address, signature: &str, output: &[Token]) {
        self.responses.borrow_mut().insert((to, selector(signature)), Bytes::from(encode(output)));
    }

    pub fn emit(&self, event: ProviderEvent) {
        self.listeners.emit(&event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn calls(&self) -> usize {
        self.log.borrow().len()
    }

    pub fn count(&self, method: &str) -> usize {
        self.log.borrow().iter().filter(|m| **m == method).count()
    }

    pub fn sent_selectors(&self) -> Vec<[u8; 4]> {
        self.sent
            .borrow()
            .iter()
            .map(|req| {
                let mut sel = [0u8; 4];
                sel.copy_from_slice(&req.data[..4]);
                sel
            })
            .collect()
    }

    fn record(&self, method: &'static str) {
        self.log.borrow_mut().push(method);
    }
}

#[async_trait(?Send)]
impl WalletProvider for MockProvider {
    fn is_available(&self) -> bool {
        self.available.get()
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        self.record("eth_requestAccounts");
        if let Some(err) = self.request_error.borrow().clone() {
            return Err(err);
        }
        Ok(self.accounts.borrow().clone())
    }

    async fn accounts(&self) -> Result<Vec<Address>, WalletError> {
        self.record("eth_accounts");
        Ok(self.accounts.borrow().clone())
    }

    async fn chain_id(&self) -> Result<u64, WalletError> {
        self.record("eth_chainId");
        Ok(self.chain_id.get())
    }

    async fn balance(&self, _address: Address) -> Result<U256, WalletError> {
        self.record("eth_getBalance");
        Ok(self.native_balance.get())
    }

    async fn call(&self, req: &CallRequest) -> Result<Bytes, WalletError> {
        self.record("eth_call");
        let delay = self.call_delay.get();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let mut sel = [0u8; 4];
        sel.copy_from_slice(&req.data[..4]);
        self.responses
            .borrow()
            .get(&(req.to, sel))
            .cloned()
            .ok_or_else(|| WalletError::Rpc { code: -32000, message: format!("no scripted response for {sel:?}") })
    }

    async fn send_transaction(&self, req: &CallRequest) -> Result<H256, WalletError> {
        self.record("eth_sendTransaction");
        if let Some(err) = self.send_error.borrow().clone() {
            return Err(err);
        }
        self.sent.borrow_mut().push(req.clone());
        let n = self.next_hash.get();
        self.next_hash.set(n + 1);
        Ok(H256::from_low_u64_be(n))
    }

    async fn transaction_receipt(&self, hash: H256) -> Result<Option<TxReceipt>, WalletError> {
        self.record("eth_getTransactionReceipt");
        if self.receipt_pending.get() {
            return Ok(None);
        }
        Ok(Some(TxReceipt {
            transaction_hash: hash,
            block_number: Some(1),
            status: Some(self.receipt_status.get()),
            gas_used: Some(U256::from(21_000u64)),
        }))
    }

    async fn switch_chain(&self, params: &ChainParams) -> Result<(), WalletError> {
        self.record("wallet_switchEthereumChain");
        if let Some(err) = self.switch_error.borrow().clone() {
            return Err(err);
        }
        self.chain_id.set(params.chain_id);
        Ok(())
    }

    fn subscribe(&self, handler: EventHandler) -> Result<Subscription, WalletError> {
        Ok(self.listeners.add(move |event| handler(event)))
    }
}

/// Address book with every contract deployed on Ganache.
pub fn address_book() -> AddressBook {
    let mut book = AddressBook::new();
    book.insert(ContractKind::DefiToken, GANACHE_CHAIN_ID, DEFI_TOKEN);
    book.insert(ContractKind::StakingToken, GANACHE_CHAIN_ID, STAKING_TOKEN);
    book.insert(ContractKind::RewardToken, GANACHE_CHAIN_ID, REWARD_TOKEN);
    book.insert(ContractKind::StakingPlatform, GANACHE_CHAIN_ID, PLATFORM);
    book.insert(ContractKind::SimpleAuction, GANACHE_CHAIN_ID, AUCTION);
    book
}

pub fn config() -> AppConfig {
    AppConfig { address_book: address_book(), ..AppConfig::default() }
}

pub struct Fixture {
    pub provider: Rc<MockProvider>,
    pub flags: MemoryFlags,
    pub ctx: AppContext,
}

pub fn fixture_with(config: AppConfig) -> Fixture {
    let provider = MockProvider::new();
    let flags = MemoryFlags::new();
    let dyn_provider: Rc<dyn WalletProvider> = provider.clone();
    let ctx = AppContext::new(config, dyn_provider, Rc::new(flags.clone()));
    Fixture { provider, flags, ctx }
}

pub fn fixture() -> Fixture {
    fixture_with(config())
}

/// Scripted reads for every dashboard, all on Ganache.
pub fn script_contracts(provider: &MockProvider) {
    provider.respond(DEFI_TOKEN, "totalSupply()", &[Token::Uint(ether(1_000_000))]);
    provider.respond(DEFI_TOKEN, "balanceOf(address)", &[Token::Uint(ether(100))]);
    provider.respond(STAKING_TOKEN, "balanceOf(address)", &[Token::Uint(ether(50))]);
    provider.respond(REWARD_TOKEN, "balanceOf(address)", &[Token::Uint(U256::zero())]);
    provider.respond(PLATFORM, "stakers(address)", &[Token::Uint(U256::zero()), Token::Uint(U256::zero())]);
    provider.respond(PLATFORM, "calculateRewards(address)", &[Token::Uint(U256::zero())]);
    provider.respond(PLATFORM, "apr()", &[Token::Uint(U256::from(3550u64))]);
    provider.respond(AUCTION, "highestBid()", &[Token::Uint(ether(1))]);
    provider.respond(AUCTION, "highestBidder()", &[Token::Address(OTHER)]);
    provider.respond(AUCTION, "auctionEnded()", &[Token::Bool(false)]);
}

/// Let spawned local tasks run to completion.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

/// Counts ERROR-level events on the current thread.
#[derive(Clone, Default)]
pub struct ErrorCounter(Arc<AtomicUsize>);

impl ErrorCounter {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl<S: Subscriber> Layer<S> for ErrorCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::ERROR {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

pub fn capture_errors() -> (ErrorCounter, DefaultGuard) {
    let counter = ErrorCounter::default();
    let subscriber = tracing_subscriber::registry().with(counter.clone());
    let guard = tracing::subscriber::set_default(subscriber);
    (counter, guard)
}
