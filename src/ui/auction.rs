use leptos::*;

use super::{or_dots, use_app, use_store};
use crate::dashboard::{AuctionDashboard, BidRecord, BidStatus};
use crate::forms::{sanitize_amount_input, BidForm};
use crate::units::{short_address, DisplayBalance};

fn bid_row(record: BidRecord) -> impl IntoView {
    let (status, class) = match &record.status {
        BidStatus::Confirmed => ("Confirmed".to_string(), "success-text"),
        BidStatus::Failed(reason) => (format!("Failed: {reason}"), "error-text"),
    };
    let hash = record.transaction_hash.map(|h| short_address(&format!("{h:?}"))).unwrap_or_else(|| "-".into());
    view! {
        <tr>
            <td class="mono">{short_address(&format!("{:?}", record.bidder))}</td>
            <td>{DisplayBalance::ether(record.amount).to_string()}</td>
            <td class="mono">{hash}</td>
            <td class=class>{status}</td>
        </tr>
    }
}

#[component]
pub fn AuctionPage() -> impl IntoView {
    let ctx = use_app();
    let session = use_store(&ctx.session.state());
    let dashboard = AuctionDashboard::new(ctx);
    dashboard.attach();
    let state = use_store(&dashboard.state());
    {
        let dashboard = dashboard.clone();
        on_cleanup(move || dashboard.detach());
    }
    let dashboard = store_value(dashboard);

    let (amount, set_amount) = create_signal(String::new());

    let bid = move |_| {
        let dashboard = dashboard.get_value();
        let mut form = BidForm::new(amount.get_untracked());
        spawn_local(async move {
            if dashboard.bid(&mut form).await.is_ok() {
                set_amount.set(form.amount);
            }
        });
    };
    let end = move |_| {
        let dashboard = dashboard.get_value();
        spawn_local(async move {
            let _ = dashboard.end_auction().await;
        });
    };
    let reset = move |_| {
        let dashboard = dashboard.get_value();
        spawn_local(async move {
            let _ = dashboard.reset_auction().await;
        });
    };
    let busy = move || !session.with(|s| s.is_connected()) || state.with(|s| s.bid.is_busy() || s.admin.is_busy());

    view! {
        <section class="card">
            <h2>"Auction"</h2>
            {move || state.with(|s| s.error.clone()).map(|text| view! { <p class="warning-box">{text}</p> })}
            <div class="balance-grid">
                <div class="bal-item">
                    <span class="label">"Highest bid"</span>
                    <span class="val">{move || or_dots(state.with(|s| s.display_highest_bid().map(|b| b.to_string())))}</span>
                </div>
                <div class="bal-item">
                    <span class="label">"Highest bidder"</span>
                    <span class="val mono">
                        {move || state.with(|s| {
                            if s.has_bids() {
                                s.highest_bidder.map(|a| short_address(&format!("{a:?}"))).unwrap_or_default()
                            } else {
                                "No bids yet".to_string()
                            }
                        })}
                    </span>
                </div>
                <div class="bal-item">
                    <span class="label">"Status"</span>
                    <span class="val">
                        {move || match state.with(|s| s.ended) {
                            Some(true) => "Ended",
                            Some(false) => "Open",
                            None => "...",
                        }}
                    </span>
                </div>
            </div>

            <div class="sponsor-box">
                <input type="text" placeholder="Bid amount"
                    on:input=move |ev| set_amount.set(sanitize_amount_input(&amount.get_untracked(), &event_target_value(&ev)))
                    prop:value=amount />
                <button class="primary-btn" disabled=move || busy() || !state.with(|s| s.is_open()) on:click=bid>
                    {move || if state.with(|s| s.bid.is_busy()) { "Bidding..." } else { "Place bid" }}
                </button>
            </div>

            <div class="flex-row">
                <button class="danger-btn-outline" disabled=busy on:click=end>"End auction"</button>
                <button class="text-btn" disabled=busy on:click=reset>"Reset auction"</button>
            </div>

            <table class="bid-history">
                <thead>
                    <tr><th>"Bidder"</th><th>"Amount"</th><th>"Tx"</th><th>"Status"</th></tr>
                </thead>
                <tbody>
                    {move || state.with(|s| s.bids.iter().rev().cloned().map(bid_row).collect_view())}
                </tbody>
            </table>
        </section>
    }
}
