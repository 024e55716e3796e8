use leptos::*;

use super::{or_dots, use_app, use_store};
use crate::dashboard::TokenDashboard;
use crate::forms::{sanitize_amount_input, TransferForm};

#[component]
pub fn TokenPage() -> impl IntoView {
    let ctx = use_app();
    let session = use_store(&ctx.session.state());
    let dashboard = TokenDashboard::new(ctx);
    dashboard.attach();
    let state = use_store(&dashboard.state());
    {
        let dashboard = dashboard.clone();
        on_cleanup(move || dashboard.detach());
    }
    let dashboard = store_value(dashboard);

    let (recipient, set_recipient) = create_signal(String::new());
    let (amount, set_amount) = create_signal(String::new());

    let submit = move |burn: bool| {
        let dashboard = dashboard.get_value();
        let mut form = TransferForm::new(recipient.get_untracked(), amount.get_untracked());
        spawn_local(async move {
            if dashboard.transfer(&mut form, burn).await.is_ok() {
                set_recipient.set(form.recipient);
                set_amount.set(form.amount);
            }
        });
    };
    let busy = move || state.with(|s| s.is_busy()) || !session.with(|s| s.is_connected());

    view! {
        <section class="card">
            <h2>"SimpleDeFi Token"</h2>
            {move || state.with(|s| s.error.clone()).map(|text| view! { <p class="warning-box">{text}</p> })}
            <div class="balance-grid">
                <div class="bal-item">
                    <span class="label">"Total supply"</span>
                    <span class="val">{move || or_dots(state.with(|s| s.display_supply().map(|b| b.compact())))}</span>
                </div>
                <div class="bal-item">
                    <span class="label">"Your balance"</span>
                    <span class="val">{move || or_dots(state.with(|s| s.display_balance().map(|b| b.fixed(4))))}</span>
                </div>
            </div>

            <div class="sponsor-box">
                <p>"Transfer"</p>
                <input type="text" placeholder="Recipient (0x...)"
                    on:input=move |ev| set_recipient.set(event_target_value(&ev))
                    prop:value=recipient />
                <input type="text" placeholder="Amount"
                    on:input=move |ev| set_amount.set(sanitize_amount_input(&amount.get_untracked(), &event_target_value(&ev)))
                    prop:value=amount />
                <div class="flex-row">
                    <button class="primary-btn" disabled=busy on:click=move |_| submit(false)>
                        {move || if state.with(|s| s.transfer.is_busy()) { "Sending..." } else { "Transfer" }}
                    </button>
                    <button class="danger-btn-outline" disabled=busy on:click=move |_| submit(true)>
                        {move || if state.with(|s| s.burn.is_busy()) { "Sending..." } else { "Transfer with burn" }}
                    </button>
                </div>
            </div>
        </section>
    }
}
