use std::cell::RefCell;
use std::rc::{Rc, Weak};

use ethers_core::types::U256;

use super::{log_load_error, report, watch_connection, ActionError};
use crate::context::AppContext;
use crate::contracts::{ContractKind, StakerInfo};
use crate::error::WalletError;
use crate::forms::{ActionGate, FormError, StakeForm};
use crate::provider::TxReceipt;
use crate::refresher::Refresher;
use crate::runtime;
use crate::session::Connection;
use crate::store::{Store, Subscription};
use crate::transactions::TxStatus;
use crate::units::{format_apr, DisplayBalance};

/// Gas limit sent with the approval that precedes every stake.
pub const APPROVE_GAS: u64 = 300_000;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StakingState {
    pub staking_balance: Option<U256>,
    pub reward_balance: Option<U256>,
    pub staker: Option<StakerInfo>,
    pub rewards: Option<U256>,
    pub apr_bps: Option<U256>,
    pub auto_update: bool,
    pub stake: TxStatus,
    pub unstake: TxStatus,
    pub error: Option<String>,
}

impl StakingState {
    pub fn staked(&self) -> U256 {
        self.staker.map(|s| s.amount).unwrap_or_default()
    }

    pub fn has_stake(&self) -> bool {
        self.staker.is_some_and(|s| s.has_stake())
    }

    pub fn apr_text(&self) -> Option<String> {
        self.apr_bps.map(format_apr)
    }

    pub fn display_rewards(&self) -> Option<DisplayBalance> {
        self.rewards.map(DisplayBalance::ether)
    }
}

struct StakingInner {
    ctx: AppContext,
    state: Store<StakingState>,
    refresher: Refresher,
    gate: ActionGate,
    watch: RefCell<Option<Subscription>>,
}

/// Staking dashboard: token balances, position, rewards and APR.
///
/// Auto-refresh only runs while the account actually has a stake.
#[derive(Clone)]
pub struct StakingDashboard {
    inner: Rc<StakingInner>,
}

impl StakingDashboard {
    pub fn new(ctx: AppContext) -> Self {
        let refresher = Refresher::new("staking-dashboard", ctx.config.intervals.staking);
        Self {
            inner: Rc::new(StakingInner {
                ctx,
                state: Store::default(),
                refresher,
                gate: ActionGate::new(),
                watch: RefCell::new(None),
            }),
        }
    }

    fn from_weak(weak: &Weak<StakingInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    pub fn state(&self) -> Store<StakingState> {
        self.inner.state.clone()
    }

    pub fn is_polling(&self) -> bool {
        self.inner.refresher.is_running()
    }

    pub fn is_busy(&self) -> bool {
        self.inner.gate.is_busy()
    }

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
        self.stop_auto_update();
    }

    fn on_connection(&self, connection: Option<Connection>) {
        match connection {
            Some(_) => {
                let dashboard = self.clone();
                runtime::spawn_local(async move {
                    if dashboard.load().await.is_ok() {
                        let _ = dashboard.start_auto_update().await;
                    }
                });
            }
            None => {
                self.stop_auto_update();
                self.inner.state.set(StakingState::default());
            }
        }
    }

    fn connection(&self) -> Result<Connection, WalletError> {
        self.inner.ctx.session.connection().ok_or(WalletError::NotConnected)
    }

    pub async fn load(&self) -> Result<(), WalletError> {
        let result = self.try_load().await;
        match &result {
            Ok(()) => self.inner.state.update(|s| s.error = None),
            Err(err) => {
                log_load_error("staking data", err);
                let text = err.user_message();
                self.inner.state.update(|s| s.error = Some(text));
            }
        }
        result
    }

    async fn try_load(&self) -> Result<(), WalletError> {
        let connection = self.connection()?;
        let loader = &self.inner.ctx.loader;
        let staking_token = loader.token(ContractKind::StakingToken, connection.chain_id)?;
        let reward_token = loader.token(ContractKind::RewardToken, connection.chain_id)?;
        let platform = loader.staking(connection.chain_id)?;

        let reads = async {
            Ok::<_, WalletError>((
                staking_token.balance_of(connection.address).await?,
                reward_token.balance_of(connection.address).await?,
                platform.stakers(connection.address).await?,
                platform.calculate_rewards(connection.address).await?,
                platform.apr().await?,
            ))
        }
        .await;
        if !self.inner.ctx.session.is_current(connection) {
            tracing::debug!("connection changed during staking load, discarding");
            return Ok(());
        }
        let (staking_balance, reward_balance, staker, rewards, apr_bps) = reads?;
        tracing::debug!(staked = %staker.amount, %rewards, %apr_bps, "staking data loaded");

        self.inner.state.update(|s| {
            s.staking_balance = Some(staking_balance);
            s.reward_balance = Some(reward_balance);
            s.staker = Some(staker);
            s.rewards = Some(rewards);
            s.apr_bps = Some(apr_bps);
        });
        Ok(())
    }

    /// Start polling, but only if the account has something staked.
    pub async fn start_auto_update(&self) -> Result<bool, WalletError> {
        let connection = self.connection()?;
        let platform = self.inner.ctx.loader.staking(connection.chain_id)?;
        let staker = platform.stakers(connection.address).await?;
        if !self.inner.ctx.session.is_current(connection) {
            return Ok(false);
        }
        if !staker.has_stake() {
            tracing::info!("nothing staked, auto-update not started");
            return Ok(false);
        }

        let weak = Rc::downgrade(&self.inner);
        self.inner.refresher.start(move || {
            let dashboard = Self::from_weak(&weak);
            async move {
                if let Some(dashboard) = dashboard {
                    let _ = dashboard.load().await;
                }
            }
        });
        self.inner.state.update(|s| s.auto_update = true);
        Ok(true)
    }

    pub fn stop_auto_update(&self) {
        self.inner.refresher.stop();
        if self.inner.state.with(|s| s.auto_update) {
            self.inner.state.update(|s| s.auto_update = false);
        }
    }

    /// Approve the platform for the amount, then stake it.
    pub async fn stake(&self, form: &mut StakeForm) -> Result<TxReceipt, ActionError> {
        match self.try_stake(form).await {
            Ok(receipt) => {
                form.clear();
                Ok(receipt)
            }
            Err(err) => {
                report(&self.inner.ctx, "stake", &err);
                Err(err)
            }
        }
    }

    async fn try_stake(&self, form: &StakeForm) -> Result<TxReceipt, ActionError> {
        let amount = form.validate(self.inner.state.with(|s| s.staking_balance))?;
        let connection = self.connection()?;
        let _pending = self.inner.gate.try_begin().ok_or(FormError::Busy)?;
        let staking_token = self.inner.ctx.loader.token(ContractKind::StakingToken, connection.chain_id)?;
        let platform = self.inner.ctx.loader.staking(connection.chain_id)?;

        self.inner.state.update(|s| s.stake = TxStatus::Submitting);
        let outcome = async {
            tracing::info!(%amount, "approving staking platform");
            staking_token
                .approve(connection.address, platform.address(), amount, Some(U256::from(APPROVE_GAS)))
                .await?;
            tracing::info!(%amount, "staking");
            platform.stake(connection.address, amount).await
        }
        .await;

        match outcome {
            Ok(receipt) => {
                self.inner.state.update(|s| s.stake = TxStatus::Confirmed(receipt.transaction_hash));
                self.inner.ctx.notices.success(format!("Staked {}", DisplayBalance::ether(amount)));
                let _ = self.load().await;
                let _ = self.start_auto_update().await;
                Ok(receipt)
            }
            Err(err) => {
                self.inner.state.update(|s| s.stake = TxStatus::Failed(err.user_message()));
                Err(err.into())
            }
        }
    }

    /// Withdraw the whole position together with its rewards.
    pub async fn unstake(&self) -> Result<TxReceipt, ActionError> {
        let result = self.try_unstake().await;
        if let Err(err) = &result {
            report(&self.inner.ctx, "unstake", err);
        }
        result
    }

    async fn try_unstake(&self) -> Result<TxReceipt, ActionError> {
        let connection = self.connection()?;
        let _pending = self.inner.gate.try_begin().ok_or(FormError::Busy)?;
        let platform = self.inner.ctx.loader.staking(connection.chain_id)?;

        self.inner.state.update(|s| s.unstake = TxStatus::Submitting);
        match platform.un_stake(connection.address).await {
            Ok(receipt) => {
                self.inner.state.update(|s| s.unstake = TxStatus::Confirmed(receipt.transaction_hash));
                self.inner.ctx.notices.success("Unstaked, rewards paid out");
                self.stop_auto_update();
                let _ = self.load().await;
                Ok(receipt)
            }
            Err(err) => {
                self.inner.state.update(|s| s.unstake = TxStatus::Failed(err.user_message()));
                Err(err.into())
            }
        }
    }

    /// Owner action: new APR in basis points.
    pub async fn set_apr(&self, bps: u64) -> Result<TxReceipt, ActionError> {
        let result = async {
            let connection = self.connection()?;
            let _pending = self.inner.gate.try_begin().ok_or(FormError::Busy)?;
            let platform = self.inner.ctx.loader.staking(connection.chain_id)?;
            let receipt = platform.set_apr(connection.address, U256::from(bps)).await?;
            self.inner.ctx.notices.success(format!("APR set to {}", format_apr(U256::from(bps))));
            let _ = self.load().await;
            Ok::<_, ActionError>(receipt)
        }
        .await;
        if let Err(err) = &result {
            report(&self.inner.ctx, "set APR", err);
        }
        result
    }
}

impl std::fmt::Debug for StakingDashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StakingDashboard")
            .field("state", &self.inner.state.get())
            .field("refresher", &self.inner.refresher)
            .finish()
    }
}
