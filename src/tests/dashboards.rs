use std::time::Duration;

use ethers_core::abi::Token;
use ethers_core::types::U256;
use tokio::task::LocalSet;

use super::utils::*;
use crate::dashboard::staking::APPROVE_GAS;
use crate::dashboard::{
    ActionError, AuctionDashboard, AuctionState, BidStatus, StakingDashboard, StakingState, TokenDashboard, TokenState,
};
use crate::error::WalletError;
use crate::forms::{BidForm, FormError, StakeForm, TransferForm};
use crate::notice::NoticeLevel;
use crate::transactions::TxStatus;

fn recipient() -> String {
    format!("{OTHER:?}")
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn failed_receipt_keeps_displayed_balance() {
    LocalSet::new()
        .run_until(async {
            let f = fixture();
            script_contracts(&f.provider);
            f.ctx.session.connect().await.unwrap();
            let token = TokenDashboard::new(f.ctx.clone());
            token.load().await.unwrap();

            // a reload would now show 40
            f.provider.respond(DEFI_TOKEN, "balanceOf(address)", &[Token::Uint(ether(40))]);
            f.provider.receipt_status.set(0);

            let mut form = TransferForm::new(recipient(), "5");
            let err = token.transfer(&mut form, false).await.unwrap_err();
            assert!(matches!(err, ActionError::Wallet(WalletError::ReceiptFailed { .. })));

            let state = token.state().get();
            assert_eq!(state.balance, Some(ether(100)));
            assert_eq!(state.transfer, TxStatus::Failed("Transaction failed on-chain".into()));
            assert_eq!(form.amount, "5");
            assert!(!token.is_busy());

            let notices = f.ctx.notices.current();
            assert_eq!(notices.len(), 1);
            assert_eq!(notices[0].level, NoticeLevel::Error);
            assert_eq!(notices[0].text, "Transaction failed on-chain");
        })
        .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn invalid_transfer_never_sends() {
    LocalSet::new()
        .run_until(async {
            let f = fixture();
            script_contracts(&f.provider);
            f.ctx.session.connect().await.unwrap();
            let token = TokenDashboard::new(f.ctx.clone());
            token.load().await.unwrap();

            let mut form = TransferForm::new(recipient(), "abc");
            let err = token.transfer(&mut form, false).await.unwrap_err();
            assert_eq!(err, ActionError::Form(FormError::NotNumeric));

            let mut form = TransferForm::new(recipient(), "101");
            let err = token.transfer(&mut form, true).await.unwrap_err();
            assert!(matches!(err, ActionError::Form(FormError::ExceedsBalance { .. })));

            assert_eq!(f.provider.count("eth_sendTransaction"), 0);
            assert_eq!(f.ctx.notices.current()[0].text, "Amount must be a number");
        })
        .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn transfers_clear_the_form_and_reload() {
    LocalSet::new()
        .run_until(async {
            let f = fixture();
            script_contracts(&f.provider);
            f.ctx.session.connect().await.unwrap();
            let token = TokenDashboard::new(f.ctx.clone());
            token.load().await.unwrap();

            f.provider.respond(DEFI_TOKEN, "balanceOf(address)", &[Token::Uint(ether(95))]);
            let mut form = TransferForm::new(recipient(), "5");
            token.transfer(&mut form, false).await.unwrap();
            assert_eq!(form, TransferForm::default());
            assert_eq!(token.state().get().balance, Some(ether(95)));
            assert!(matches!(token.state().get().transfer, TxStatus::Confirmed(_)));

            let mut form = TransferForm::new(recipient(), "1.5");
            token.transfer(&mut form, true).await.unwrap();
            assert!(matches!(token.state().get().burn, TxStatus::Confirmed(_)));

            assert_eq!(
                f.provider.sent_selectors(),
                vec![selector("transfer(address,uint256)"), selector("transferWithAutoBurn(address,uint256)")]
            );
            let notices = f.ctx.notices.current();
            assert_eq!(notices[0].text, "Transfer of 5.0 confirmed");
            assert_eq!(notices[1].text, "Transfer with burn of 1.5 confirmed");
        })
        .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn no_auto_update_without_a_stake() {
    LocalSet::new()
        .run_until(async {
            let f = fixture();
            script_contracts(&f.provider);
            let staking = StakingDashboard::new(f.ctx.clone());
            staking.attach();

            f.ctx.session.connect().await.unwrap();
            settle().await;

            let state = staking.state().get();
            assert_eq!(state.staking_balance, Some(ether(50)));
            assert_eq!(state.apr_text().as_deref(), Some("35.50%"));
            assert!(!state.has_stake());
            assert!(!state.auto_update);
            assert!(!staking.is_polling());
        })
        .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn stake_approves_then_stakes() {
    LocalSet::new()
        .run_until(async {
            let f = fixture();
            script_contracts(&f.provider);
            f.ctx.session.connect().await.unwrap();
            let staking = StakingDashboard::new(f.ctx.clone());
            staking.load().await.unwrap();

            f.provider.respond(PLATFORM, "stakers(address)", &[Token::Uint(ether(10)), Token::Uint(U256::from(1u64))]);
            let mut form = StakeForm::new("10");
            staking.stake(&mut form).await.unwrap();

            let sent = f.provider.sent.borrow().clone();
            assert_eq!(sent.len(), 2);
            assert_eq!(sent[0].to, STAKING_TOKEN);
            assert_eq!(sent[0].gas, Some(U256::from(APPROVE_GAS)));
            assert_eq!(sent[1].to, PLATFORM);
            assert_eq!(f.provider.sent_selectors(), vec![selector("approve(address,uint256)"), selector("stake(uint256)")]);

            assert!(form.amount.is_empty());
            let state = staking.state().get();
            assert_eq!(state.staked(), ether(10));
            assert!(state.auto_update);
            assert!(staking.is_polling());

            staking.unstake().await.unwrap();
            assert!(!staking.is_polling());
            assert_eq!(f.provider.sent_selectors()[2], selector("unStake()"));
        })
        .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn bids_must_beat_the_highest_bid() {
    LocalSet::new()
        .run_until(async {
            let f = fixture();
            script_contracts(&f.provider);
            f.ctx.session.connect().await.unwrap();
            let auction = AuctionDashboard::new(f.ctx.clone());
            auction.load().await.unwrap();
            assert!(auction.state().get().has_bids());

            let mut form = BidForm::new("0.5");
            let err = auction.bid(&mut form).await.unwrap_err();
            assert!(matches!(err, ActionError::Form(FormError::BidTooLow { .. })));
            assert_eq!(f.provider.count("eth_sendTransaction"), 0);

            let mut form = BidForm::new("2");
            auction.bid(&mut form).await.unwrap();
            assert!(form.amount.is_empty());
            assert_eq!(f.provider.sent.borrow()[0].value, Some(ether(2)));

            let bids = auction.state().get().bids;
            assert_eq!(bids.len(), 1);
            assert_eq!(bids[0].bidder, USER);
            assert_eq!(bids[0].amount, ether(2));
            assert_eq!(bids[0].status, BidStatus::Confirmed);
            assert!(bids[0].transaction_hash.is_some());
        })
        .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn rejected_bid_stays_out_of_history() {
    LocalSet::new()
        .run_until(async {
            let f = fixture();
            script_contracts(&f.provider);
            f.ctx.session.connect().await.unwrap();
            let auction = AuctionDashboard::new(f.ctx.clone());
            auction.load().await.unwrap();

            *f.provider.send_error.borrow_mut() = Some(WalletError::UserRejected);
            let mut form = BidForm::new("2");
            assert!(auction.bid(&mut form).await.unwrap_err().is_user_rejection());
            assert!(auction.state().get().bids.is_empty());
            assert_eq!(form.amount, "2");

            let notices = f.ctx.notices.current();
            assert_eq!(notices[0].level, NoticeLevel::Info);
            assert_eq!(notices[0].text, "Transaction rejected by user");
        })
        .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn only_the_owner_can_end_the_auction() {
    LocalSet::new()
        .run_until(async {
            let f = fixture();
            script_contracts(&f.provider);
            f.ctx.session.connect().await.unwrap();
            let auction = AuctionDashboard::new(f.ctx.clone());

            *f.provider.send_error.borrow_mut() =
                Some(WalletError::from_rpc(-32000, "execution reverted", Some("Unauthorized()")));
            auction.end_auction().await.unwrap_err();

            let notices = f.ctx.notices.current();
            assert_eq!(notices.len(), 1);
            assert_eq!(notices[0].level, NoticeLevel::Error);
            assert_eq!(notices[0].text, "Only the auction owner can do this");
            assert!(matches!(auction.state().get().admin, TxStatus::Failed(_)));
        })
        .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn reset_clears_bid_history() {
    LocalSet::new()
        .run_until(async {
            let f = fixture();
            script_contracts(&f.provider);
            f.ctx.session.connect().await.unwrap();
            let auction = AuctionDashboard::new(f.ctx.clone());
            auction.attach();
            settle().await;

            auction.bid(&mut BidForm::new("3")).await.unwrap();
            assert_eq!(auction.state().get().bids.len(), 1);

            auction.reset_auction().await.unwrap();
            assert!(auction.state().get().bids.is_empty());
            assert_eq!(f.provider.sent_selectors()[1], selector("resetAuction()"));
            assert_eq!(f.ctx.notices.current().last().map(|n| n.text.clone()).as_deref(), Some("Auction reset"));
        })
        .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn set_apr_sends_basis_points_and_reloads() {
    LocalSet::new()
        .run_until(async {
            let f = fixture();
            script_contracts(&f.provider);
            f.ctx.session.connect().await.unwrap();
            let staking = StakingDashboard::new(f.ctx.clone());

            f.provider.respond(PLATFORM, "apr()", &[Token::Uint(U256::from(1200u64))]);
            staking.set_apr(1200).await.unwrap();

            assert_eq!(f.provider.sent_selectors(), vec![selector("setAPR(uint256)")]);
            assert_eq!(staking.state().get().apr_text().as_deref(), Some("12.00%"));
            assert_eq!(f.ctx.notices.current()[0].text, "APR set to 12.00%");
        })
        .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn reads_landing_after_disconnect_are_discarded() {
    LocalSet::new()
        .run_until(async {
            let f = fixture();
            script_contracts(&f.provider);
            f.provider.respond(PLATFORM, "stakers(address)", &[Token::Uint(ether(10)), Token::Uint(U256::from(1u64))]);
            let token = TokenDashboard::new(f.ctx.clone());
            let staking = StakingDashboard::new(f.ctx.clone());
            let auction = AuctionDashboard::new(f.ctx.clone());
            token.attach();
            staking.attach();
            auction.attach();

            f.provider.call_delay.set(Duration::from_secs(1));
            f.ctx.session.connect().await.unwrap();
            settle().await;
            assert!(token.state().get().loading);

            f.ctx.session.disconnect();
            tokio::time::sleep(Duration::from_secs(10)).await;

            assert_eq!(token.state().get(), TokenState::default());
            assert_eq!(staking.state().get(), StakingState::default());
            assert_eq!(auction.state().get(), AuctionState::default());
            assert!(!staking.is_polling());
            assert!(f.ctx.notices.current().is_empty());
        })
        .await;
}
