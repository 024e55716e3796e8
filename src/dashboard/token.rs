use std::cell::RefCell;
use std::rc::{Rc, Weak};

use ethers_core::types::U256;

use super::{log_load_error, report, watch_connection, ActionError};
use crate::context::AppContext;
use crate::contracts::ContractKind;
use crate::error::WalletError;
use crate::forms::{ActionGate, FormError, TransferForm};
use crate::provider::TxReceipt;
use crate::refresher::Refresher;
use crate::runtime;
use crate::session::Connection;
use crate::store::{Store, Subscription};
use crate::transactions::TxStatus;
use crate::units::DisplayBalance;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenState {
    pub total_supply: Option<U256>,
    pub balance: Option<U256>,
    pub loading: bool,
    pub transfer: TxStatus,
    pub burn: TxStatus,
    /// Last failed read, cleared by the next successful one.
    pub error: Option<String>,
}

impl TokenState {
    pub fn display_balance(&self) -> Option<DisplayBalance> {
        self.balance.map(DisplayBalance::ether)
    }

    pub fn display_supply(&self) -> Option<DisplayBalance> {
        self.total_supply.map(DisplayBalance::ether)
    }

    pub fn is_busy(&self) -> bool {
        self.transfer.is_busy() || self.burn.is_busy()
    }
}

struct TokenInner {
    ctx: AppContext,
    state: Store<TokenState>,
    refresher: Refresher,
    gate: ActionGate,
    watch: RefCell<Option<Subscription>>,
}

/// Token-transfer dashboard: supply, balance, plain and burning transfers.
#[derive(Clone)]
pub struct TokenDashboard {
    inner: Rc<TokenInner>,
}

impl TokenDashboard {
    pub fn new(ctx: AppContext) -> Self {
        let refresher = Refresher::new("token-dashboard", ctx.config.intervals.token);
        Self {
            inner: Rc::new(TokenInner {
                ctx,
                state: Store::default(),
                refresher,
                gate: ActionGate::new(),
                watch: RefCell::new(None),
            }),
        }
    }

    fn from_weak(weak: &Weak<TokenInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    pub fn state(&self) -> Store<TokenState> {
        self.inner.state.clone()
    }

    pub fn is_polling(&self) -> bool {
        self.inner.refresher.is_running()
    }

    pub fn is_busy(&self) -> bool {
        self.inner.gate.is_busy()
    }

    /// Follow the session: load and poll while connected, reset otherwise.
    pub fn attach(&self) {
        let weak = Rc::downgrade(&self.inner);
        let sub = watch_connection(&self.inner.ctx.session, move |connection| {
            if let Some(dashboard) = Self::from_weak(&weak) {
                dashboard.on_connection(connection);
            }
        });
        *self.inner.watch.borrow_mut() = Some(sub);
    }

    pub fn detach(&self) {
        self.inner.watch.borrow_mut().take();
        self.inner.refresher.stop();
    }

    fn on_connection(&self, connection: Option<Connection>) {
        match connection {
            Some(_) => {
                let dashboard = self.clone();
                runtime::spawn_local(async move {
                    let _ = dashboard.load().await;
                });
                self.start_polling();
            }
            None => {
                self.inner.refresher.stop();
                self.inner.state.set(TokenState::default());
            }
        }
    }

    fn start_polling(&self) {
        let weak = Rc::downgrade(&self.inner);
        self.inner.refresher.start(move || {
            let dashboard = Self::from_weak(&weak);
            async move {
                if let Some(dashboard) = dashboard {
                    let _ = dashboard.load().await;
                }
            }
        });
    }

    /// Read total supply and the connected account's balance.
    pub async fn load(&self) -> Result<(), WalletError> {
        let result = self.try_load().await;
        match &result {
            Ok(()) => self.inner.state.update(|s| s.error = None),
            Err(err) => {
                log_load_error("token data", err);
                let text = err.user_message();
                self.inner.state.update(|s| {
                    s.loading = false;
                    s.error = Some(text);
                });
            }
        }
        result
    }

    async fn try_load(&self) -> Result<(), WalletError> {
        let connection = self.inner.ctx.session.connection().ok_or(WalletError::NotConnected)?;
        let token = self.inner.ctx.loader.token(ContractKind::DefiToken, connection.chain_id)?;

        self.inner.state.update(|s| s.loading = true);
        let reads = async { Ok::<_, WalletError>((token.total_supply().await?, token.balance_of(connection.address).await?)) }.await;
        if !self.inner.ctx.session.is_current(connection) {
            tracing::debug!("connection changed during token load, discarding");
            return Ok(());
        }
        let (total_supply, balance) = reads?;
        tracing::debug!(%total_supply, %balance, "token data loaded");

        self.inner.state.update(|s| {
            s.total_supply = Some(total_supply);
            s.balance = Some(balance);
            s.loading = false;
        });
        Ok(())
    }

    /// Validate and send a transfer; `burn` routes it through
    /// `transferWithAutoBurn`. Clears the form on success.
    pub async fn transfer(&self, form: &mut TransferForm, burn: bool) -> Result<TxReceipt, ActionError> {
        let action = if burn { "transfer with burn" } else { "transfer" };
        match self.try_transfer(form, burn).await {
            Ok(receipt) => {
                form.clear();
                Ok(receipt)
            }
            Err(err) => {
                report(&self.inner.ctx, action, &err);
                Err(err)
            }
        }
    }

    async fn try_transfer(&self, form: &TransferForm, burn: bool) -> Result<TxReceipt, ActionError> {
        let valid = form.validate(self.inner.state.with(|s| s.balance))?;
        let connection = self.inner.ctx.session.connection().ok_or(WalletError::NotConnected)?;
        let _pending = self.inner.gate.try_begin().ok_or(FormError::Busy)?;
        let token = self.inner.ctx.loader.token(ContractKind::DefiToken, connection.chain_id)?;

        self.set_status(burn, TxStatus::Submitting);
        let outcome = if burn {
            token.transfer_with_auto_burn(connection.address, valid.to, valid.amount).await
        } else {
            token.transfer(connection.address, valid.to, valid.amount).await
        };

        match outcome {
            Ok(receipt) => {
                self.set_status(burn, TxStatus::Confirmed(receipt.transaction_hash));
                let verb = if burn { "Transfer with burn" } else { "Transfer" };
                self.inner.ctx.notices.success(format!("{verb} of {} confirmed", DisplayBalance::ether(valid.amount)));
                let _ = self.load().await;
                Ok(receipt)
            }
            Err(err) => {
                self.set_status(burn, TxStatus::Failed(err.user_message()));
                Err(err.into())
            }
        }
    }

    fn set_status(&self, burn: bool, status: TxStatus) {
        self.inner.state.update(|s| {
            if burn {
                s.burn = status;
            } else {
                s.transfer = status;
            }
        });
    }
}

impl std::fmt::Debug for TokenDashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenDashboard")
            .field("state", &self.inner.state.get())
            .field("refresher", &self.inner.refresher)
            .finish()
    }
}
