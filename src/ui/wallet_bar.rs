use leptos::*;

use super::{copy_to_clipboard, or_dots, use_app, use_store};

#[component]
pub fn WalletBar() -> impl IntoView {
    let ctx = store_value(use_app());
    let session = use_store(&ctx.with_value(|ctx| ctx.session.state()));
    let preferred = ctx.with_value(|ctx| ctx.config.preferred_chain_params());
    let preferred = store_value(preferred);

    let connect = move |_| {
        let ctx = ctx.get_value();
        spawn_local(async move {
            if let Err(err) = ctx.session.connect().await {
                if err.is_user_rejection() {
                    ctx.notices.info(err.user_message());
                } else {
                    ctx.notices.error(err.user_message());
                }
            }
        });
    };

    let disconnect = move |_| ctx.with_value(|ctx| ctx.session.disconnect());

    let switch_network = move |_| {
        let ctx = ctx.get_value();
        let Some(params) = preferred.get_value() else { return };
        spawn_local(async move {
            if let Err(err) = ctx.session.switch_network(&params).await {
                ctx.notices.error(err.user_message());
            }
        });
    };

    let wrong_network = move || {
        let chain_id = session.with(|s| s.chain_id());
        match (chain_id, preferred.get_value()) {
            (Some(current), Some(params)) => current != params.chain_id,
            _ => false,
        }
    };

    view! {
        <header class="app-header">
            <div class="header-status">
                <span class="label">"Network"</span>
                <div class="network">{move || session.with(|s| s.network_name()).unwrap_or_else(|| "Not connected".into())}</div>
            </div>

            {move || if session.with(|s| s.is_connected()) {
                let address = session.with(|s| s.address().map(|a| format!("{a:?}"))).unwrap_or_default();
                view! {
                    <div class="wallet-info">
                        <button class="text-btn mono" title="Copy" on:click=move |_| copy_to_clipboard(address.clone())>
                            {move || session.with(|s| s.short_address()).unwrap_or_default()}
                        </button>
                        <span class="val">
                            {move || or_dots(session.with(|s| s.display_balance().map(|b| b.fixed(4))))}
                            " "
                            {move || session.with(|s| s.currency_symbol())}
                        </span>
                        {move || if wrong_network() {
                            view! { <button class="sponsor-btn" on:click=switch_network>"Switch network"</button> }.into_view()
                        } else {
                            view! {}.into_view()
                        }}
                        <button class="cancel-btn" on:click=disconnect>"Disconnect"</button>
                    </div>
                }.into_view()
            } else {
                view! {
                    <button class="primary-btn" disabled=move || session.with(|s| s.connecting) on:click=connect>
                        {move || if session.with(|s| s.connecting) { "Connecting..." } else { "Connect Wallet" }}
                    </button>
                }.into_view()
            }}
        </header>

        {move || session.with(|s| s.last_error.clone()).map(|text| {
            let ctx = ctx.get_value();
            view! {
                <div class="warning-box">
                    <p>{text}</p>
                    <button class="text-btn" on:click=move |_| ctx.session.clear_error()>"Dismiss"</button>
                </div>
            }
        })}
    }
}
