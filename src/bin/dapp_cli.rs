//! Operator CLI: the dashboard flows against a JSON-RPC node.
//!
//! Reads `.env` / the environment like the web build (`DAPP_RPC_URL`,
//! `DAPP_CHAIN_ID`, `DAPP_ADDRESS_BOOK`). With `DAPP_PRIVATE_KEY` set,
//! transactions are signed locally; otherwise the node's first unlocked
//! account is used.

#[cfg(not(target_arch = "wasm32"))]
mod host {
    use std::rc::Rc;

    use anyhow::{Context, Result};
    use clap::{Parser, Subcommand};
    use dapp_sync::config::AppConfig;
    use dapp_sync::contracts::ContractKind;
    use dapp_sync::dashboard::{AuctionDashboard, StakingDashboard, TokenDashboard};
    use dapp_sync::forms::{BidForm, StakeForm, TransferForm};
    use dapp_sync::notice::NoticeLevel;
    use dapp_sync::provider::{HttpProvider, WalletProvider};
    use dapp_sync::storage::MemoryFlags;
    use dapp_sync::units::{format_apr, DisplayBalance};
    use dapp_sync::AppContext;
    use ethers_signers::{LocalWallet, Signer};
    use tokio::task::LocalSet;
    use tracing_subscriber::EnvFilter;

    #[derive(Parser, Debug)]
    #[command(name = "dapp_cli", about = "Token, staking and auction operations from the terminal")]
    struct Cli {
        /// Overrides DAPP_RPC_URL.
        #[arg(long, global = true)]
        rpc_url: Option<String>,

        #[command(subcommand)]
        command: Command,
    }

    #[derive(Subcommand, Debug)]
    enum Command {
        /// Account, network and every dashboard's data.
        Status,
        /// Native and token balances of the account.
        Balance,
        Transfer {
            to: String,
            amount: String,
            /// Route through `transferWithAutoBurn`.
            #[arg(long)]
            burn: bool,
        },
        /// Approve the platform, then stake.
        Stake { amount: String },
        Unstake,
        Rewards,
        /// Owner only. Basis points, e.g. 3550 for 35.50%.
        SetApr { bps: u64 },
        #[command(subcommand)]
        Auction(AuctionCommand),
        /// Poll every dashboard and print changes until Ctrl-C.
        Watch,
    }

    #[derive(Subcommand, Debug)]
    enum AuctionCommand {
        Status,
        Bid { amount: String },
        End,
        Reset,
    }

    async fn build_provider(config: &AppConfig) -> Result<HttpProvider> {
        let Ok(key) = std::env::var("DAPP_PRIVATE_KEY") else {
            return Ok(HttpProvider::new(config.rpc_url.clone()));
        };
        let chain_id = HttpProvider::new(config.rpc_url.clone())
            .chain_id()
            .await
            .context("reading chain id for the signer")?;
        let wallet: LocalWallet = key.trim().parse().context("DAPP_PRIVATE_KEY is not a valid key")?;
        Ok(HttpProvider::with_signer(config.rpc_url.clone(), wallet.with_chain_id(chain_id)))
    }

    fn print_notices(ctx: &AppContext) {
        for notice in ctx.notices.drain() {
            let tag = match notice.level {
                NoticeLevel::Info => "info",
                NoticeLevel::Success => "ok",
                NoticeLevel::Error => "error",
            };
            println!("[{tag}] {}", notice.text);
        }
    }

    fn show(value: Option<DisplayBalance>) -> String {
        value.map(|v| v.to_string()).unwrap_or_else(|| "-".into())
    }

    async fn print_token(ctx: &AppContext) {
        let token = TokenDashboard::new(ctx.clone());
        if let Err(err) = token.load().await {
            println!("{}: {}", ContractKind::DefiToken, err.user_message());
            return;
        }
        let state = token.state().get();
        println!("{}", ContractKind::DefiToken);
        println!("  total supply: {}", show(state.display_supply()));
        println!("  balance:      {}", show(state.display_balance()));
    }

    async fn print_staking(ctx: &AppContext) {
        let staking = StakingDashboard::new(ctx.clone());
        if let Err(err) = staking.load().await {
            println!("{}: {}", ContractKind::StakingPlatform, err.user_message());
            return;
        }
        let state = staking.state().get();
        println!("{}", ContractKind::StakingPlatform);
        println!("  staking token: {}", show(state.staking_balance.map(DisplayBalance::ether)));
        println!("  reward token:  {}", show(state.reward_balance.map(DisplayBalance::ether)));
        println!("  staked:        {}", DisplayBalance::ether(state.staked()));
        println!("  rewards:       {}", show(state.display_rewards()));
        println!("  apr:           {}", state.apr_text().unwrap_or_else(|| "-".into()));
    }

    async fn print_auction(ctx: &AppContext) {
        let auction = AuctionDashboard::new(ctx.clone());
        if let Err(err) = auction.load().await {
            println!("{}: {}", ContractKind::SimpleAuction, err.user_message());
            return;
        }
        let state = auction.state().get();
        println!("{}", ContractKind::SimpleAuction);
        println!("  highest bid:    {}", show(state.display_highest_bid()));
        match state.highest_bidder {
            Some(bidder) if state.has_bids() => println!("  highest bidder: {bidder:?}"),
            _ => println!("  highest bidder: none"),
        }
        println!("  ended:          {}", state.ended.map(|e| e.to_string()).unwrap_or_else(|| "-".into()));
    }

    async fn watch(ctx: &AppContext) -> Result<()> {
        let token = TokenDashboard::new(ctx.clone());
        let staking = StakingDashboard::new(ctx.clone());
        let auction = AuctionDashboard::new(ctx.clone());
        token.attach();
        staking.attach();
        auction.attach();

        let _token_sub = token.state().subscribe(|s| {
            if let (Some(supply), Some(balance)) = (s.display_supply(), s.display_balance()) {
                println!("token    supply={supply} balance={balance}");
            }
        });
        let _staking_sub = staking.state().subscribe(|s| {
            if let Some(rewards) = s.display_rewards() {
                println!("staking  staked={} rewards={rewards} auto={}", DisplayBalance::ether(s.staked()), s.auto_update);
            }
        });
        let _auction_sub = auction.state().subscribe(|s| {
            if let Some(bid) = s.display_highest_bid() {
                println!("auction  highest={bid} ended={}", s.ended.unwrap_or_default());
            }
        });

        println!("watching, Ctrl-C to stop");
        tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;
        token.detach();
        staking.detach();
        auction.detach();
        ctx.session.disconnect();
        Ok(())
    }

    async fn run(cli: Cli) -> Result<()> {
        let mut config = AppConfig::from_env()?;
        if let Some(url) = cli.rpc_url {
            config.rpc_url = url;
        }
        let provider: Rc<dyn WalletProvider> = Rc::new(build_provider(&config).await?);
        let ctx = AppContext::new(config, provider, Rc::new(MemoryFlags::new()));

        let connection = ctx.session.connect().await.context("connecting to the node")?;
        let session = ctx.session.snapshot();
        tracing::info!(address = ?connection.address, chain_id = connection.chain_id, "connected");

        let result: Result<()> = match cli.command {
            Command::Status => {
                println!("account: {:?}", connection.address);
                println!("network: {} ({})", session.network_name().unwrap_or_default(), connection.chain_id);
                println!("balance: {} {}", show(session.display_balance()), session.currency_symbol());
                print_token(&ctx).await;
                print_staking(&ctx).await;
                print_auction(&ctx).await;
                Ok(())
            }
            Command::Balance => {
                println!("{} {}", show(session.display_balance()), session.currency_symbol());
                print_token(&ctx).await;
                Ok(())
            }
            Command::Transfer { to, amount, burn } => {
                let token = TokenDashboard::new(ctx.clone());
                let _ = token.load().await;
                token.transfer(&mut TransferForm::new(to, amount), burn).await.map(drop).map_err(Into::into)
            }
            Command::Stake { amount } => {
                let staking = StakingDashboard::new(ctx.clone());
                let _ = staking.load().await;
                staking.stake(&mut StakeForm::new(amount)).await.map(drop).map_err(Into::into)
            }
            Command::Unstake => {
                let staking = StakingDashboard::new(ctx.clone());
                staking.unstake().await.map(drop).map_err(Into::into)
            }
            Command::Rewards => {
                let platform = ctx.loader.staking(connection.chain_id)?;
                let rewards = platform.calculate_rewards(connection.address).await?;
                let apr = platform.apr().await?;
                println!("pending rewards: {} (apr {})", DisplayBalance::ether(rewards), format_apr(apr));
                Ok(())
            }
            Command::SetApr { bps } => {
                let staking = StakingDashboard::new(ctx.clone());
                staking.set_apr(bps).await.map(drop).map_err(Into::into)
            }
            Command::Auction(AuctionCommand::Status) => {
                print_auction(&ctx).await;
                Ok(())
            }
            Command::Auction(AuctionCommand::Bid { amount }) => {
                let auction = AuctionDashboard::new(ctx.clone());
                let _ = auction.load().await;
                auction.bid(&mut BidForm::new(amount)).await.map(drop).map_err(Into::into)
            }
            Command::Auction(AuctionCommand::End) => {
                AuctionDashboard::new(ctx.clone()).end_auction().await.map(drop).map_err(Into::into)
            }
            Command::Auction(AuctionCommand::Reset) => {
                AuctionDashboard::new(ctx.clone()).reset_auction().await.map(drop).map_err(Into::into)
            }
            Command::Watch => watch(&ctx).await,
        };

        print_notices(&ctx);
        if let Some(text) = ctx.session.snapshot().last_error {
            println!("[warn] {text}");
        }
        result
    }

    pub fn main() -> Result<()> {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
            .with_writer(std::io::stderr)
            .init();

        let cli = Cli::parse();
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        let local = LocalSet::new();
        local.block_on(&runtime, run(cli))
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    host::main()
}

#[cfg(target_arch = "wasm32")]
fn main() {}
