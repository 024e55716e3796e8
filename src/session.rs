//! Wallet session lifecycle.
//!
//! [`SessionManager`] owns the connection state, mirrors provider events
//! into it, persists the continuity flags and runs the two session timers
//! (connection watchdog and native balance refresh). `disconnect` is a local
//! reset only: injected wallets expose no way to revoke an authorization,
//! so the wallet itself still considers the site connected afterwards.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use ethers_core::types::{Address, U256};

use crate::config::Intervals;
use crate::error::WalletError;
use crate::network::{self, ChainParams};
use crate::provider::{ProviderEvent, WalletProvider};
use crate::refresher::Refresher;
use crate::runtime;
use crate::storage::{keys, FlagStore, PersistedSession};
use crate::store::{Store, Subscription};
use crate::units::{self, DisplayBalance};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    pub address: Address,
    pub chain_id: u64,
}

/// Everything the UI shows about the wallet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    /// Present iff connected.
    pub connection: Option<Connection>,
    /// Native balance in wei, `None` until read.
    pub balance: Option<U256>,
    pub connecting: bool,
    pub last_error: Option<String>,
}

impl Session {
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn address(&self) -> Option<Address> {
        self.connection.map(|c| c.address)
    }

    pub fn chain_id(&self) -> Option<u64> {
        self.connection.map(|c| c.chain_id)
    }

    pub fn network_name(&self) -> Option<String> {
        self.chain_id().map(network::chain_name)
    }

    pub fn currency_symbol(&self) -> &'static str {
        self.chain_id().map(network::currency_symbol).unwrap_or("ETH")
    }

    pub fn short_address(&self) -> Option<String> {
        self.address().map(|a| units::short_address(&format!("{a:?}")))
    }

    pub fn display_balance(&self) -> Option<DisplayBalance> {
        self.balance.map(DisplayBalance::ether)
    }
}

struct SessionInner {
    provider: Rc<dyn WalletProvider>,
    flags: Rc<dyn FlagStore>,
    state: Store<Session>,
    events: RefCell<Option<Subscription>>,
    watchdog: Refresher,
    balance_timer: Refresher,
    preferred_chain: Option<ChainParams>,
}

#[derive(Clone)]
pub struct SessionManager {
    inner: Rc<SessionInner>,
}

impl SessionManager {
    pub fn new(
        provider: Rc<dyn WalletProvider>,
        flags: Rc<dyn FlagStore>,
        intervals: &Intervals,
        preferred_chain: Option<ChainParams>,
    ) -> Self {
        Self {
            inner: Rc::new(SessionInner {
                provider,
                flags,
                state: Store::default(),
                events: RefCell::new(None),
                watchdog: Refresher::new("session-watchdog", intervals.watchdog),
                balance_timer: Refresher::new("native-balance", intervals.balance),
                preferred_chain,
            }),
        }
    }

    fn from_weak(weak: &Weak<SessionInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    pub fn state(&self) -> Store<Session> {
        self.inner.state.clone()
    }

    pub fn snapshot(&self) -> Session {
        self.inner.state.get()
    }

    pub fn connection(&self) -> Option<Connection> {
        self.inner.state.with(|s| s.connection)
    }

    /// Whether `connection` is still the live one. Reads started under an
    /// older connection check this before writing anything back.
    pub fn is_current(&self, connection: Connection) -> bool {
        self.connection() == Some(connection)
    }

    pub fn subscribe(&self, callback: impl Fn(&Session) + 'static) -> Subscription {
        self.inner.state.subscribe(callback)
    }

    pub fn provider(&self) -> &Rc<dyn WalletProvider> {
        &self.inner.provider
    }

    pub fn is_polling(&self) -> bool {
        self.inner.watchdog.is_running() || self.inner.balance_timer.is_running()
    }

    fn surface(&self, err: &WalletError) {
        let text = err.user_message();
        self.inner.state.update(|s| {
            s.connecting = false;
            s.last_error = Some(text);
        });
    }

    /// Prompt the wallet for accounts and adopt the first one.
    ///
    /// A rejection leaves the current session as it was. An empty account
    /// list ends up disconnected.
    pub async fn connect(&self) -> Result<Connection, WalletError> {
        let provider = Rc::clone(&self.inner.provider);
        if !provider.is_available() {
            tracing::error!("no wallet provider available");
            let err = WalletError::ProviderUnavailable;
            self.surface(&err);
            return Err(err);
        }

        self.inner.state.update(|s| {
            s.connecting = true;
            s.last_error = None;
        });

        let accounts = match provider.request_accounts().await {
            Ok(accounts) => accounts,
            Err(err) => {
                if err.is_user_rejection() {
                    tracing::info!("connection request rejected by user");
                } else {
                    tracing::error!(%err, "connecting wallet failed");
                }
                self.surface(&err);
                return Err(err);
            }
        };

        let Some(&address) = accounts.first() else {
            tracing::warn!("wallet returned no accounts");
            self.disconnect();
            let err = WalletError::NoAccount;
            self.surface(&err);
            return Err(err);
        };

        let chain_id = match provider.chain_id().await {
            Ok(id) => id,
            Err(err) => {
                tracing::error!(%err, "reading chain id failed");
                self.surface(&err);
                return Err(err);
            }
        };

        let connection = Connection { address, chain_id };
        self.establish(connection);
        tracing::info!(address = ?address, chain_id, network = %network::chain_name(chain_id), "wallet connected");

        if let Some(params) = self.inner.preferred_chain.clone() {
            if params.chain_id != chain_id {
                // Failure is surfaced by switch_network; the connection stands.
                let _ = self.switch_network(&params).await;
            }
        }
        let _ = self.refresh_balance().await;
        Ok(self.connection().unwrap_or(connection))
    }

    /// Silent reconnect on load, driven by the persisted flags.
    pub async fn restore(&self) -> Result<Option<Connection>, WalletError> {
        let persisted = PersistedSession::load(self.inner.flags.as_ref());
        if !persisted.user_connected {
            return Ok(None);
        }
        if !self.inner.provider.is_available() {
            tracing::warn!("persisted session but no wallet provider, clearing flags");
            PersistedSession::clear(self.inner.flags.as_ref());
            return Ok(None);
        }

        let accounts = match self.inner.provider.accounts().await {
            Ok(accounts) => accounts,
            Err(err) => {
                tracing::error!(%err, "restoring session failed");
                self.surface(&err);
                return Err(err);
            }
        };
        let Some(&address) = accounts.first() else {
            tracing::info!("wallet no longer authorizes this site, clearing persisted flags");
            PersistedSession::clear(self.inner.flags.as_ref());
            return Ok(None);
        };
        let chain_id = match self.inner.provider.chain_id().await {
            Ok(id) => id,
            Err(err) => {
                tracing::error!(%err, "reading chain id failed");
                self.surface(&err);
                return Err(err);
            }
        };

        let connection = Connection { address, chain_id };
        self.establish(connection);
        tracing::info!(address = ?address, chain_id, "session restored");
        let _ = self.refresh_balance().await;
        Ok(Some(connection))
    }

    fn establish(&self, connection: Connection) {
        self.inner.state.update(|s| {
            s.connection = Some(connection);
            s.balance = None;
            s.connecting = false;
            s.last_error = None;
        });
        PersistedSession::save_connected(self.inner.flags.as_ref(), connection.address, connection.chain_id);
        self.attach();
    }

    fn attach(&self) {
        if self.inner.events.borrow().is_none() {
            let weak = Rc::downgrade(&self.inner);
            // Handled on the next turn of the event loop so a disconnect can
            // safely drop the listener that delivered it.
            let handler = Box::new(move |event: &ProviderEvent| {
                let weak = weak.clone();
                let event = event.clone();
                runtime::spawn_local(async move {
                    if let Some(manager) = Self::from_weak(&weak) {
                        manager.handle_event(&event);
                    }
                });
            });
            match self.inner.provider.subscribe(handler) {
                Ok(sub) => *self.inner.events.borrow_mut() = Some(sub),
                Err(err) => tracing::warn!(%err, "could not subscribe to wallet events"),
            }
        }

        let weak = Rc::downgrade(&self.inner);
        self.inner.watchdog.start(move || {
            let manager = Self::from_weak(&weak);
            async move {
                if let Some(manager) = manager {
                    manager.check_connection().await;
                }
            }
        });

        let weak = Rc::downgrade(&self.inner);
        self.inner.balance_timer.start(move || {
            let manager = Self::from_weak(&weak);
            async move {
                if let Some(manager) = manager {
                    let _ = manager.refresh_balance().await;
                }
            }
        });
    }

    /// Local reset: state, persisted flags, event subscription, timers.
    /// Calls nothing on the provider.
    pub fn disconnect(&self) {
        let events = self.inner.events.borrow_mut().take();
        if let Some(sub) = events {
            sub.unsubscribe();
        }
        self.inner.watchdog.stop();
        self.inner.balance_timer.stop();
        PersistedSession::clear(self.inner.flags.as_ref());
        self.inner.state.set(Session::default());
        tracing::info!("wallet disconnected locally");
    }

    /// Mirror a provider event into the session.
    pub fn handle_event(&self, event: &ProviderEvent) {
        match event {
            ProviderEvent::AccountsChanged(accounts) => match accounts.first() {
                None => {
                    tracing::info!("wallet reported no accounts, disconnecting");
                    self.disconnect();
                }
                Some(&address) => {
                    let Some(current) = self.connection() else {
                        return;
                    };
                    if current.address == address {
                        return;
                    }
                    tracing::info!(from = ?current.address, to = ?address, "account changed");
                    self.inner.state.update(|s| {
                        s.connection = Some(Connection { address, chain_id: current.chain_id });
                        s.balance = None;
                    });
                    PersistedSession::save_connected(self.inner.flags.as_ref(), address, current.chain_id);
                    self.spawn_balance_refresh();
                }
            },
            ProviderEvent::ChainChanged(chain_id) => self.apply_chain(*chain_id),
            ProviderEvent::Disconnect => {
                tracing::info!("wallet emitted disconnect");
                self.disconnect();
            }
        }
    }

    fn apply_chain(&self, chain_id: u64) {
        let Some(current) = self.connection() else {
            return;
        };
        if current.chain_id == chain_id {
            return;
        }
        tracing::info!(chain_id, network = %network::chain_name(chain_id), "network changed");
        self.inner.state.update(|s| {
            s.connection = Some(Connection { chain_id, ..current });
            s.balance = None;
        });
        self.inner.flags.set(keys::CHAIN_ID, &chain_id.to_string());
        self.spawn_balance_refresh();
    }

    fn spawn_balance_refresh(&self) {
        let manager = self.clone();
        runtime::spawn_local(async move {
            let _ = manager.refresh_balance().await;
        });
    }

    /// Native balance of the connected account.
    pub async fn refresh_balance(&self) -> Result<Option<U256>, WalletError> {
        let Some(connection) = self.connection() else {
            return Ok(None);
        };
        match self.inner.provider.balance(connection.address).await {
            Ok(balance) => {
                // The account may have changed while the read was in flight.
                if self.connection().map(|c| c.address) == Some(connection.address) {
                    self.inner.state.update(|s| s.balance = Some(balance));
                }
                Ok(Some(balance))
            }
            Err(err) => {
                tracing::error!(%err, "reading native balance failed");
                self.surface(&err);
                Err(err)
            }
        }
    }

    /// Watchdog tick: an empty `eth_accounts` while connected means the
    /// wallet revoked or locked this site.
    pub async fn check_connection(&self) {
        if self.connection().is_none() {
            return;
        }
        match self.inner.provider.accounts().await {
            Ok(accounts) if accounts.is_empty() => {
                tracing::info!("wallet no longer exposes accounts, disconnecting");
                self.disconnect();
            }
            Ok(_) => {}
            Err(err) => tracing::warn!(%err, "connection check failed"),
        }
    }

    /// Ask the wallet to switch chains, adding the chain when it is unknown.
    pub async fn switch_network(&self, params: &ChainParams) -> Result<(), WalletError> {
        tracing::info!(chain_id = params.chain_id, network = %params.chain_name, "requesting network switch");
        if let Err(err) = self.inner.provider.switch_chain(params).await {
            if err.is_user_rejection() {
                tracing::info!("network switch rejected by user");
            } else {
                tracing::error!(%err, "network switch failed");
            }
            self.surface(&err);
            return Err(err);
        }
        // Providers without events (plain HTTP) never send chainChanged.
        match self.inner.provider.chain_id().await {
            Ok(chain_id) => {
                self.apply_chain(chain_id);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(%err, "reading chain id after switch failed");
                Ok(())
            }
        }
    }

    pub fn clear_error(&self) {
        self.inner.state.update(|s| s.last_error = None);
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("session", &self.snapshot())
            .field("watchdog", &self.inner.watchdog)
            .field("balance_timer", &self.inner.balance_timer)
            .finish()
    }
}
