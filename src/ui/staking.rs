use leptos::*;

use super::{or_dots, use_app, use_store};
use crate::dashboard::StakingDashboard;
use crate::forms::{sanitize_amount_input, StakeForm};
use crate::units::DisplayBalance;

#[component]
pub fn StakingPage() -> impl IntoView {
    let ctx = use_app();
    let session = use_store(&ctx.session.state());
    let notices = store_value(ctx.notices.clone());
    let dashboard = StakingDashboard::new(ctx);
    dashboard.attach();
    let state = use_store(&dashboard.state());
    {
        let dashboard = dashboard.clone();
        on_cleanup(move || dashboard.detach());
    }
    let dashboard = store_value(dashboard);

    let (amount, set_amount) = create_signal(String::new());
    let (apr_input, set_apr_input) = create_signal(String::new());

    let stake = move |_| {
        let dashboard = dashboard.get_value();
        let mut form = StakeForm::new(amount.get_untracked());
        spawn_local(async move {
            if dashboard.stake(&mut form).await.is_ok() {
                set_amount.set(form.amount);
            }
        });
    };
    let unstake = move |_| {
        let dashboard = dashboard.get_value();
        spawn_local(async move {
            let _ = dashboard.unstake().await;
        });
    };
    let set_apr = move |_| {
        let dashboard = dashboard.get_value();
        let Ok(bps) = apr_input.get_untracked().trim().parse::<u64>() else {
            notices.with_value(|n| n.error("APR must be a whole number of basis points"));
            return;
        };
        spawn_local(async move {
            if dashboard.set_apr(bps).await.is_ok() {
                set_apr_input.set(String::new());
            }
        });
    };
    let toggle_auto = move |_| {
        let dashboard = dashboard.get_value();
        if state.with_untracked(|s| s.auto_update) {
            dashboard.stop_auto_update();
        } else {
            spawn_local(async move {
                let _ = dashboard.start_auto_update().await;
            });
        }
    };
    let disabled = move || !session.with(|s| s.is_connected()) || state.with(|s| s.stake.is_busy() || s.unstake.is_busy());

    view! {
        <section class="card">
            <h2>"Staking"</h2>
            {move || state.with(|s| s.error.clone()).map(|text| view! { <p class="warning-box">{text}</p> })}
            <div class="balance-grid">
                <div class="bal-item">
                    <span class="label">"Staking token"</span>
                    <span class="val">{move || or_dots(state.with(|s| s.staking_balance.map(|b| DisplayBalance::ether(b).fixed(4))))}</span>
                </div>
                <div class="bal-item">
                    <span class="label">"Reward token"</span>
                    <span class="val">{move || or_dots(state.with(|s| s.reward_balance.map(|b| DisplayBalance::ether(b).fixed(4))))}</span>
                </div>
                <div class="bal-item">
                    <span class="label">"Staked"</span>
                    <span class="val">{move || DisplayBalance::ether(state.with(|s| s.staked())).fixed(4)}</span>
                </div>
                <div class="bal-item">
                    <span class="label">"Pending rewards"</span>
                    <span class="val">{move || or_dots(state.with(|s| s.display_rewards().map(|b| b.fixed(6))))}</span>
                </div>
                <div class="bal-item">
                    <span class="label">"APR"</span>
                    <span class="val">{move || or_dots(state.with(|s| s.apr_text()))}</span>
                </div>
            </div>

            <div class="sponsor-box">
                <input type="text" placeholder="Amount to stake"
                    on:input=move |ev| set_amount.set(sanitize_amount_input(&amount.get_untracked(), &event_target_value(&ev)))
                    prop:value=amount />
                <div class="flex-row">
                    <button class="primary-btn" disabled=disabled on:click=stake>"Stake"</button>
                    <button class="cancel-btn" disabled=move || disabled() || !state.with(|s| s.has_stake()) on:click=unstake>"Unstake"</button>
                </div>
                <label class="tiny-text">
                    <input type="checkbox" prop:checked=move || state.with(|s| s.auto_update) on:change=toggle_auto />
                    " Auto-update"
                </label>
            </div>

            <div class="sponsor-box">
                <p>"Set APR (owner)"</p>
                <input type="text" placeholder="Basis points, e.g. 3550"
                    on:input=move |ev| set_apr_input.set(event_target_value(&ev))
                    prop:value=apr_input />
                <button class="text-btn" disabled=disabled on:click=set_apr>"Update APR"</button>
            </div>
        </section>
    }
}
