use std::time::Duration;

use tokio::task::LocalSet;

use super::utils::*;
use crate::config::AppConfig;
use crate::dashboard::{TokenDashboard, TokenState};
use crate::error::WalletError;
use crate::provider::ProviderEvent;
use crate::session::Connection;
use crate::storage::{keys, FlagStore, PersistedSession};

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn connecting_without_accounts_stays_disconnected() {
    LocalSet::new()
        .run_until(async {
            let f = fixture();
            f.provider.accounts.borrow_mut().clear();

            let err = f.ctx.session.connect().await.unwrap_err();
            assert_eq!(err, WalletError::NoAccount);

            let session = f.ctx.session.snapshot();
            assert!(!session.is_connected());
            assert_eq!(session.address(), None);
            assert_eq!(session.chain_id(), None);
            assert!(f.flags.is_empty());
            assert!(!f.ctx.session.is_polling());
            assert_eq!(f.provider.subscriber_count(), 0);
        })
        .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn connect_persists_flags_and_starts_timers() {
    LocalSet::new()
        .run_until(async {
            let f = fixture();
            let connection = f.ctx.session.connect().await.unwrap();
            assert_eq!(connection, Connection { address: USER, chain_id: 1337 });

            let persisted = PersistedSession::load(&f.flags);
            assert_eq!(persisted.address, Some(USER));
            assert_eq!(persisted.chain_id, Some(1337));
            assert!(persisted.user_connected);
            assert_eq!(f.flags.get(keys::PROVIDER_CONNECTED).as_deref(), Some("true"));

            let session = f.ctx.session.snapshot();
            assert_eq!(session.balance, Some(ether(10)));
            assert_eq!(session.network_name().as_deref(), Some("Ganache Local"));
            assert_eq!(session.short_address().as_deref(), Some("0xaaaa...aaaa"));
            assert!(!session.connecting);
            assert!(f.ctx.session.is_polling());
            assert_eq!(f.provider.subscriber_count(), 1);
        })
        .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn user_rejection_leaves_session_untouched() {
    LocalSet::new()
        .run_until(async {
            let f = fixture();
            *f.provider.request_error.borrow_mut() = Some(WalletError::UserRejected);
            assert_eq!(f.ctx.session.connect().await, Err(WalletError::UserRejected));
            assert!(f.flags.is_empty());
            assert!(!f.ctx.session.snapshot().is_connected());

            *f.provider.request_error.borrow_mut() = None;
            let connection = f.ctx.session.connect().await.unwrap();

            *f.provider.request_error.borrow_mut() = Some(WalletError::UserRejected);
            assert_eq!(f.ctx.session.connect().await, Err(WalletError::UserRejected));

            let session = f.ctx.session.snapshot();
            assert_eq!(session.connection, Some(connection));
            assert_eq!(session.last_error.as_deref(), Some("Transaction rejected by user"));
            assert_eq!(PersistedSession::load(&f.flags).address, Some(USER));
        })
        .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn disconnect_clears_flags_and_stops_polling() {
    LocalSet::new()
        .run_until(async {
            let f = fixture();
            script_contracts(&f.provider);
            let token = TokenDashboard::new(f.ctx.clone());
            token.attach();

            f.ctx.session.connect().await.unwrap();
            settle().await;
            assert!(token.is_polling());
            assert_eq!(token.state().get().balance, Some(ether(100)));

            // one token poll and a few watchdog ticks
            let before = f.provider.count("eth_call");
            tokio::time::sleep(Duration::from_secs(16)).await;
            assert!(f.provider.count("eth_call") > before);

            let calls = f.provider.calls();
            f.ctx.session.disconnect();
            assert_eq!(f.provider.calls(), calls, "disconnect must not call the provider");

            for key in keys::ALL {
                assert_eq!(f.flags.get(key), None, "{key} still persisted");
            }
            assert!(!f.ctx.session.is_polling());
            assert!(!token.is_polling());
            assert_eq!(f.provider.subscriber_count(), 0);
            assert_eq!(token.state().get(), TokenState::default());

            tokio::time::sleep(Duration::from_secs(60)).await;
            assert_eq!(f.provider.calls(), calls);
        })
        .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn provider_events_mirror_into_session() {
    LocalSet::new()
        .run_until(async {
            let f = fixture();
            f.ctx.session.connect().await.unwrap();

            f.provider.native_balance.set(ether(3));
            f.provider.emit(ProviderEvent::AccountsChanged(vec![OTHER]));
            settle().await;
            let session = f.ctx.session.snapshot();
            assert_eq!(session.address(), Some(OTHER));
            assert_eq!(session.balance, Some(ether(3)));
            assert_eq!(f.flags.get(keys::ADDRESS), Some(format!("{OTHER:?}")));

            f.provider.emit(ProviderEvent::ChainChanged(11155111));
            settle().await;
            let session = f.ctx.session.snapshot();
            assert_eq!(session.chain_id(), Some(11155111));
            assert_eq!(session.network_name().as_deref(), Some("Sepolia"));
            assert_eq!(f.flags.get(keys::CHAIN_ID).as_deref(), Some("11155111"));

            f.provider.emit(ProviderEvent::AccountsChanged(vec![]));
            settle().await;
            assert!(!f.ctx.session.snapshot().is_connected());
            assert!(f.flags.is_empty());
            assert_eq!(f.provider.subscriber_count(), 0);
        })
        .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn disconnect_event_resets_session() {
    LocalSet::new()
        .run_until(async {
            let f = fixture();
            f.ctx.session.connect().await.unwrap();
            f.provider.emit(ProviderEvent::Disconnect);
            settle().await;
            assert!(!f.ctx.session.snapshot().is_connected());
            assert!(!f.ctx.session.is_polling());
        })
        .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn restore_adopts_authorized_account() {
    LocalSet::new()
        .run_until(async {
            let f = fixture();
            assert_eq!(f.ctx.session.restore().await, Ok(None));
            assert_eq!(f.provider.calls(), 0);

            PersistedSession::save_connected(&f.flags, USER, 1337);
            let restored = f.ctx.session.restore().await.unwrap();
            assert_eq!(restored, Some(Connection { address: USER, chain_id: 1337 }));
            assert_eq!(f.provider.count("eth_requestAccounts"), 0);
            assert!(f.ctx.session.is_polling());
        })
        .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn restore_clears_flags_when_authorization_is_gone() {
    LocalSet::new()
        .run_until(async {
            let f = fixture();
            PersistedSession::save_connected(&f.flags, USER, 1337);
            f.provider.accounts.borrow_mut().clear();

            assert_eq!(f.ctx.session.restore().await, Ok(None));
            assert!(f.flags.is_empty());
            assert!(!f.ctx.session.snapshot().is_connected());
        })
        .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn watchdog_disconnects_when_accounts_vanish() {
    LocalSet::new()
        .run_until(async {
            let f = fixture();
            f.ctx.session.connect().await.unwrap();

            tokio::time::sleep(Duration::from_secs(6)).await;
            assert!(f.ctx.session.snapshot().is_connected());

            f.provider.accounts.borrow_mut().clear();
            tokio::time::sleep(Duration::from_secs(5)).await;
            assert!(!f.ctx.session.snapshot().is_connected());
            assert!(f.flags.is_empty());
        })
        .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn connect_switches_to_preferred_chain() {
    LocalSet::new()
        .run_until(async {
            let f = fixture_with(AppConfig { preferred_chain: Some(1337), ..config() });
            f.provider.chain_id.set(1);

            let connection = f.ctx.session.connect().await.unwrap();
            assert_eq!(f.provider.count("wallet_switchEthereumChain"), 1);
            assert_eq!(connection.chain_id, 1337);
            assert_eq!(f.flags.get(keys::CHAIN_ID).as_deref(), Some("1337"));
        })
        .await;
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn rejected_chain_switch_keeps_connection() {
    LocalSet::new()
        .run_until(async {
            let f = fixture_with(AppConfig { preferred_chain: Some(1337), ..config() });
            f.provider.chain_id.set(1);
            *f.provider.switch_error.borrow_mut() = Some(WalletError::UserRejected);

            let connection = f.ctx.session.connect().await.unwrap();
            assert_eq!(connection.chain_id, 1);
            let session = f.ctx.session.snapshot();
            assert!(session.is_connected());
            assert_eq!(session.last_error.as_deref(), Some("Transaction rejected by user"));
        })
        .await;
}
