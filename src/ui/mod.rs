//! Leptos views over the dashboard services.

use leptos::*;

use crate::context::AppContext;
use crate::store::Store;

pub mod auction;
pub mod staking;
pub mod toast;
pub mod token;
pub mod wallet_bar;

pub use auction::AuctionPage;
pub use staking::StakingPage;
pub use toast::Toasts;
pub use token::TokenPage;
pub use wallet_bar::WalletBar;

pub fn use_app() -> AppContext {
    expect_context::<AppContext>()
}

/// Mirror `store` into a signal until the current owner is cleaned up.
pub fn use_store<T: Clone + 'static>(store: &Store<T>) -> ReadSignal<T> {
    let (value, set_value) = create_signal(store.get());
    let sub = store.subscribe(move |next| set_value.set(next.clone()));
    on_cleanup(move || drop(sub));
    value
}

fn copy_to_clipboard(text: String) {
    if let Some(window) = web_sys::window() {
        let clipboard = window.navigator().clipboard();
        let _ = clipboard.write_text(&text);
    }
}

/// `"..."` until a value has been read.
fn or_dots(value: Option<String>) -> String {
    value.unwrap_or_else(|| "...".to_string())
}
