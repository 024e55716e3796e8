//! Wallet session and on-chain data synchronization for the token, staking
//! and auction front ends.
//!
//! The core (session, contracts, dashboards) is target-agnostic and runs on
//! a single-threaded executor. The Leptos UI in [`app`] and [`ui`] is only
//! built for wasm32; the `dapp_cli` binary drives the same services natively
//! over HTTP JSON-RPC.

pub mod config;
pub mod context;
pub mod contracts;
pub mod dashboard;
pub mod error;
pub mod forms;
pub mod network;
pub mod notice;
pub mod provider;
pub mod refresher;
pub mod rpc;
pub mod runtime;
pub mod session;
pub mod storage;
pub mod store;
pub mod transactions;
pub mod units;

#[cfg(target_arch = "wasm32")]
pub mod app;
#[cfg(target_arch = "wasm32")]
pub mod ui;

#[cfg(test)]
mod tests;

pub use context::AppContext;
pub use error::{RevertReason, WalletError};
