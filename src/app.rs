use std::rc::Rc;

use leptos::*;
use leptos_meta::*;
use leptos_router::*;

use crate::config::AppConfig;
use crate::context::AppContext;
use crate::provider::{InjectedProvider, WalletProvider};
use crate::storage::{BrowserFlags, FlagStore};
use crate::ui::{AuctionPage, StakingPage, Toasts, TokenPage, WalletBar};

fn build_context() -> AppContext {
    let config = AppConfig::baked().unwrap_or_else(|err| {
        tracing::error!(error = %err, "baked configuration is invalid, using defaults");
        AppConfig::default()
    });
    let provider: Rc<dyn WalletProvider> = Rc::new(InjectedProvider::new());
    let flags: Rc<dyn FlagStore> = Rc::new(BrowserFlags);
    AppContext::new(config, provider, flags)
}

#[component]
pub fn App() -> impl IntoView {
    provide_meta_context();

    let ctx = build_context();
    provide_context(ctx.clone());

    // Re-adopt a previous connection without prompting.
    spawn_local(async move {
        if let Err(err) = ctx.session.restore().await {
            tracing::warn!(error = %err, "could not restore wallet session");
        }
    });

    view! {
        <Title text="DeFi Playground"/>

        <Router>
            <WalletBar/>
            <nav class="app-nav">
                <A href="" exact=true class="nav-item">"Token"</A>
                <A href="staking" class="nav-item">"Staking"</A>
                <A href="auction" class="nav-item">"Auction"</A>
            </nav>
            <main class="container app-content">
                <Routes>
                    <Route path="" view=TokenPage/>
                    <Route path="staking" view=StakingPage/>
                    <Route path="auction" view=AuctionPage/>
                </Routes>
            </main>
            <Toasts/>
        </Router>
    }
}
