use std::rc::Rc;

use crate::config::AppConfig;
use crate::contracts::ContractLoader;
use crate::notice::NoticeBoard;
use crate::provider::WalletProvider;
use crate::session::SessionManager;
use crate::storage::FlagStore;

/// Shared services, built once at the application root and handed down.
#[derive(Clone)]
pub struct AppContext {
    pub config: Rc<AppConfig>,
    pub session: SessionManager,
    pub loader: ContractLoader,
    pub notices: NoticeBoard,
}

impl AppContext {
    pub fn new(config: AppConfig, provider: Rc<dyn WalletProvider>, flags: Rc<dyn FlagStore>) -> Self {
        let session = SessionManager::new(
            Rc::clone(&provider),
            flags,
            &config.intervals,
            config.preferred_chain_params(),
        );
        let loader = ContractLoader::new(config.address_book.clone(), provider, config.confirm);
        Self { config: Rc::new(config), session, loader, notices: NoticeBoard::new() }
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("session", &self.session)
            .field("loader", &self.loader)
            .finish_non_exhaustive()
    }
}
