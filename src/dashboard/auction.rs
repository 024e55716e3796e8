use std::cell::RefCell;
use std::rc::{Rc, Weak};

use ethers_core::types::{Address, H256, U256};

use super::{log_load_error, report, report_with, watch_connection, ActionError};
use crate::context::AppContext;
use crate::error::{RevertReason, WalletError};
use crate::forms::{ActionGate, BidForm, FormError};
use crate::provider::TxReceipt;
use crate::refresher::Refresher;
use crate::runtime;
use crate::session::Connection;
use crate::store::{Store, Subscription};
use crate::transactions::TxStatus;
use crate::units::DisplayBalance;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BidStatus {
    Confirmed,
    Failed(String),
}

/// A bid sent from this page, newest last. Local history only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidRecord {
    pub transaction_hash: Option<H256>,
    pub bidder: Address,
    pub amount: U256,
    pub status: BidStatus,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuctionState {
    pub highest_bid: Option<U256>,
    pub highest_bidder: Option<Address>,
    pub ended: Option<bool>,
    pub bids: Vec<BidRecord>,
    pub bid: TxStatus,
    pub admin: TxStatus,
    pub error: Option<String>,
}

impl AuctionState {
    pub fn display_highest_bid(&self) -> Option<DisplayBalance> {
        self.highest_bid.map(DisplayBalance::ether)
    }

    /// `highestBidder` is the zero address until the first bid lands.
    pub fn has_bids(&self) -> bool {
        self.highest_bidder.is_some_and(|a| !a.is_zero())
    }

    pub fn is_open(&self) -> bool {
        self.ended == Some(false)
    }
}

struct AuctionInner {
    ctx: AppContext,
    state: Store<AuctionState>,
    refresher: Refresher,
    gate: ActionGate,
    watch: RefCell<Option<Subscription>>,
}

/// Auction bidding UI: current leader, bidding and owner controls.
#[derive(Clone)]
pub struct AuctionDashboard {
    inner: Rc<AuctionInner>,
}

#[derive(Debug, Clone, Copy)]
enum OwnerAction {
    End,
    Reset,
}

fn owner_action_message(err: &ActionError) -> String {
    match err {
        ActionError::Wallet(WalletError::Reverted(RevertReason::Unauthorized)) => {
            "Only the auction owner can do this".into()
        }
        ActionError::Wallet(WalletError::Reverted(RevertReason::AlreadyFinalized)) => {
            "The auction has already ended".into()
        }
        other => other.user_message(),
    }
}

impl AuctionDashboard {
    pub fn new(ctx: AppContext) -> Self {
        let refresher = Refresher::new("auction-dashboard", ctx.config.intervals.auction);
        Self {
            inner: Rc::new(AuctionInner {
                ctx,
                state: Store::default(),
                refresher,
                gate: ActionGate::new(),
                watch: RefCell::new(None),
            }),
        }
    }

    fn from_weak(weak: &Weak<AuctionInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    pub fn state(&self) -> Store<AuctionState> {
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
        self.inner.refresher.stop();
    }

    fn on_connection(&self, connection: Option<Connection>) {
        match connection {
            Some(_) => {
                let dashboard = self.clone();
                runtime::spawn_local(async move {
                    let _ = dashboard.load().await;
                });
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
            None => {
                self.inner.refresher.stop();
                // Bid history belongs to the page, not the account.
                self.inner.state.update(|s| {
                    let bids = std::mem::take(&mut s.bids);
                    *s = AuctionState { bids, ..AuctionState::default() };
                });
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
                log_load_error("auction data", err);
                let text = err.user_message();
                self.inner.state.update(|s| s.error = Some(text));
            }
        }
        result
    }

    async fn try_load(&self) -> Result<(), WalletError> {
        let connection = self.connection()?;
        let auction = self.inner.ctx.loader.auction(connection.chain_id)?;
        let reads = async {
            Ok::<_, WalletError>((
                auction.highest_bid().await?,
                auction.highest_bidder().await?,
                auction.auction_ended().await?,
            ))
        }
        .await;
        if !self.inner.ctx.session.is_current(connection) {
            tracing::debug!("connection changed during auction load, discarding");
            return Ok(());
        }
        let (highest_bid, highest_bidder, ended) = reads?;
        tracing::debug!(%highest_bid, bidder = ?highest_bidder, ended, "auction data loaded");

        self.inner.state.update(|s| {
            s.highest_bid = Some(highest_bid);
            s.highest_bidder = Some(highest_bidder);
            s.ended = Some(ended);
        });
        Ok(())
    }

    /// Place a bid. It must beat the displayed highest bid and fit in the
    /// native balance; the contract has the final word.
    pub async fn bid(&self, form: &mut BidForm) -> Result<TxReceipt, ActionError> {
        match self.try_bid(form).await {
            Ok(receipt) => {
                form.clear();
                Ok(receipt)
            }
            Err(err) => {
                report(&self.inner.ctx, "bid", &err);
                Err(err)
            }
        }
    }

    async fn try_bid(&self, form: &BidForm) -> Result<TxReceipt, ActionError> {
        let highest = self.inner.state.with(|s| s.highest_bid).unwrap_or_default();
        let balance = self.inner.ctx.session.snapshot().balance;
        let amount = form.validate(highest, balance)?;
        let connection = self.connection()?;
        let _pending = self.inner.gate.try_begin().ok_or(FormError::Busy)?;
        let auction = self.inner.ctx.loader.auction(connection.chain_id)?;

        self.inner.state.update(|s| s.bid = TxStatus::Submitting);
        let outcome = auction.bid(connection.address, amount).await;

        let (transaction_hash, status) = match &outcome {
            Ok(receipt) => (Some(receipt.transaction_hash), BidStatus::Confirmed),
            Err(err) => {
                let hash = match err {
                    WalletError::ReceiptFailed { hash, .. } | WalletError::ReceiptTimeout(hash) => Some(*hash),
                    _ => None,
                };
                (hash, BidStatus::Failed(err.user_message()))
            }
        };
        let record = BidRecord { transaction_hash, bidder: connection.address, amount, status };

        match outcome {
            Ok(receipt) => {
                self.inner.state.update(|s| {
                    s.bid = TxStatus::Confirmed(receipt.transaction_hash);
                    s.bids.push(record);
                });
                self.inner.ctx.notices.success(format!("Bid of {} placed", DisplayBalance::ether(amount)));
                let _ = self.load().await;
                let _ = self.inner.ctx.session.refresh_balance().await;
                Ok(receipt)
            }
            Err(err) => {
                // Rejected prompts never reached the chain; keep them out of the history.
                let keep = !err.is_user_rejection();
                self.inner.state.update(|s| {
                    s.bid = TxStatus::Failed(err.user_message());
                    if keep {
                        s.bids.push(record);
                    }
                });
                Err(err.into())
            }
        }
    }

    /// Owner only; fails with an already-ended revert the second time.
    pub async fn end_auction(&self) -> Result<TxReceipt, ActionError> {
        let result = self.owner_action(OwnerAction::End).await;
        match &result {
            Ok(_) => {
                self.inner.ctx.notices.success("Auction ended");
            }
            Err(err) => report_with(&self.inner.ctx, "end auction", err, owner_action_message(err)),
        }
        result
    }

    /// Owner only; starts a fresh round and clears the local bid history.
    pub async fn reset_auction(&self) -> Result<TxReceipt, ActionError> {
        let result = self.owner_action(OwnerAction::Reset).await;
        match &result {
            Ok(_) => {
                self.inner.state.update(|s| s.bids.clear());
                self.inner.ctx.notices.success("Auction reset");
            }
            Err(err) => report_with(&self.inner.ctx, "reset auction", err, owner_action_message(err)),
        }
        result
    }

    async fn owner_action(&self, action: OwnerAction) -> Result<TxReceipt, ActionError> {
        let connection = self.connection()?;
        let _pending = self.inner.gate.try_begin().ok_or(FormError::Busy)?;
        let auction = self.inner.ctx.loader.auction(connection.chain_id)?;

        self.inner.state.update(|s| s.admin = TxStatus::Submitting);
        let outcome = match action {
            OwnerAction::End => auction.end_auction(connection.address).await,
            OwnerAction::Reset => auction.reset_auction(connection.address).await,
        };
        match outcome {
            Ok(receipt) => {
                self.inner.state.update(|s| s.admin = TxStatus::Confirmed(receipt.transaction_hash));
                let _ = self.load().await;
                Ok(receipt)
            }
            Err(err) => {
                self.inner.state.update(|s| s.admin = TxStatus::Failed(err.user_message()));
                Err(err.into())
            }
        }
    }
}

impl std::fmt::Debug for AuctionDashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuctionDashboard")
            .field("state", &self.inner.state.get())
            .field("refresher", &self.inner.refresher)
            .finish()
    }
}
