//! Per-app services behind the three front ends.
//!
//! Each dashboard keeps its own observable state, reloads it whenever the
//! session connection changes, polls while connected and runs the write
//! flows: validate, gate, submit, wait for the receipt, then read again.
//! A failure is logged, pushed as a notice and leaves the displayed data
//! as it was.

use std::cell::Cell;
use std::rc::Rc;

use thiserror::Error;

use crate::context::AppContext;
use crate::error::WalletError;
use crate::forms::FormError;
use crate::session::{Connection, SessionManager};
use crate::store::Subscription;

pub mod auction;
pub mod staking;
pub mod token;

pub use auction::{AuctionDashboard, AuctionState, BidRecord, BidStatus};
pub use staking::{StakingDashboard, StakingState};
pub use token::{TokenDashboard, TokenState};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ActionError {
    #[error(transparent)]
    Form(#[from] FormError),
    #[error(transparent)]
    Wallet(#[from] WalletError),
}

impl ActionError {
    pub fn user_message(&self) -> String {
        match self {
            ActionError::Form(err) => capitalize(&err.to_string()),
            ActionError::Wallet(err) => err.user_message(),
        }
    }

    pub fn is_user_rejection(&self) -> bool {
        matches!(self, ActionError::Wallet(err) if err.is_user_rejection())
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Log `err` and raise a notice carrying `text`.
pub(crate) fn report_with(ctx: &AppContext, action: &'static str, err: &ActionError, text: String) {
    match err {
        // The loader already logged the missing deployment.
        ActionError::Wallet(WalletError::NetworkMismatch { .. }) => {}
        _ if err.is_user_rejection() => tracing::info!(action, "rejected by user"),
        _ => tracing::error!(action, error = %err, "action failed"),
    }
    if err.is_user_rejection() {
        ctx.notices.info(text);
    } else {
        ctx.notices.error(text);
    }
}

pub(crate) fn report(ctx: &AppContext, action: &'static str, err: &ActionError) {
    report_with(ctx, action, err, err.user_message());
}

/// Log a failed background read; the UI shows it as a banner, not a toast.
pub(crate) fn log_load_error(what: &'static str, err: &WalletError) {
    if !matches!(err, WalletError::NetworkMismatch { .. }) {
        tracing::error!(what, error = %err, "loading contract data failed");
    }
}

/// Run `on_change` now and after every change of the session connection.
pub(crate) fn watch_connection(
    session: &SessionManager,
    on_change: impl Fn(Option<Connection>) + 'static,
) -> Subscription {
    let last = Rc::new(Cell::new(session.connection()));
    on_change(last.get());
    session.subscribe(move |s| {
        if s.connection != last.get() {
            last.set(s.connection);
            on_change(s.connection);
        }
    })
}
