//! Persisted connection flags.
//!
//! A handful of plain string pairs written on every session transition and
//! read once on load. They are a continuity hint only: the wallet stays the
//! source of truth and [`crate::session::SessionManager::restore`] re-checks
//! it before trusting anything found here.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use ethers_core::types::Address;

pub mod keys {
    pub const ADDRESS: &str = "wallet.address";
    pub const CHAIN_ID: &str = "wallet.chainId";
    pub const USER_CONNECTED: &str = "wallet.userConnected";
    pub const PROVIDER_CONNECTED: &str = "wallet.providerConnected";

    pub const ALL: [&str; 4] = [ADDRESS, CHAIN_ID, USER_CONNECTED, PROVIDER_CONNECTED];
}

pub trait FlagStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// In-memory flags for the CLI and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryFlags {
    entries: Rc<RefCell<BTreeMap<String, String>>>,
}

impl MemoryFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl FlagStore for MemoryFlags {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries.borrow_mut().insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries.borrow_mut().remove(key);
    }
}

/// `window.localStorage`, values stored unquoted.
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserFlags;

#[cfg(target_arch = "wasm32")]
impl FlagStore for BrowserFlags {
    fn get(&self, key: &str) -> Option<String> {
        use gloo_storage::{LocalStorage, Storage};
        LocalStorage::raw().get_item(key).ok().flatten()
    }

    fn set(&self, key: &str, value: &str) {
        use gloo_storage::{LocalStorage, Storage};
        if LocalStorage::raw().set_item(key, value).is_err() {
            tracing::warn!(key, "localStorage write failed");
        }
    }

    fn remove(&self, key: &str) {
        use gloo_storage::{LocalStorage, Storage};
        LocalStorage::delete(key);
    }
}

/// The snapshot the flags describe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedSession {
    pub address: Option<Address>,
    pub chain_id: Option<u64>,
    pub user_connected: bool,
}

impl PersistedSession {
    pub fn load(flags: &dyn FlagStore) -> Self {
        Self {
            address: flags.get(keys::ADDRESS).and_then(|a| a.parse().ok()),
            chain_id: flags.get(keys::CHAIN_ID).and_then(|c| c.parse().ok()),
            user_connected: flags.get(keys::USER_CONNECTED).as_deref() == Some("true"),
        }
    }

    pub fn save_connected(flags: &dyn FlagStore, address: Address, chain_id: u64) {
        flags.set(keys::ADDRESS, &format!("{address:?}"));
        flags.set(keys::CHAIN_ID, &chain_id.to_string());
        flags.set(keys::USER_CONNECTED, "true");
        flags.set(keys::PROVIDER_CONNECTED, "true");
    }

    pub fn clear(flags: &dyn FlagStore) {
        for key in keys::ALL {
            flags.remove(key);
        }
    }
}
