//! Sync a prepaid wallet into the ledger.
//!
//! One-shot run: credentials come from flags or the environment, progress is
//! logged through `tracing` (`RUST_LOG` overrides the default `info` level),
//! and any fatal failure exits non-zero.

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use wallet_ledger_sync::client::{HttpLedgerClient, HttpWalletClient};
use wallet_ledger_sync::{ReconciliationEngine, SyncConfig, WalletCredentials};

#[derive(Parser)]
#[command(name = "wallet-ledger-sync", about = "Sync ANA Pay transactions into PocketSmith")]
struct Cli {
    /// Wallet username (ANA wallet id).
    #[arg(long, env = "ANAPAY_USERNAME", hide_env_values = true)]
    username: String,

    /// Wallet password (device id).
    #[arg(long, env = "ANAPAY_PASSWORD", hide_env_values = true)]
    password: String,

    /// PocketSmith developer key.
    #[arg(long, env = "POCKETSMITH_TOKEN", hide_env_values = true)]
    token: String,

    /// Number of transactions to parse.
    #[arg(long, default_value_t = wallet_ledger_sync::DEFAULT_TRANSACTION_LIMIT)]
    num_transactions: usize,

    /// Override the wallet API base URL.
    #[arg(long, hide = true)]
    wallet_url: Option<String>,

    /// Override the ledger API base URL.
    #[arg(long, hide = true)]
    ledger_url: Option<String>,
}

impl Cli {
    fn config(&self) -> SyncConfig {
        SyncConfig::new(
            WalletCredentials {
                wallet_id: self.username.clone(),
                device_id: self.password.clone(),
            },
            self.token.clone(),
        )
        .with_transaction_limit(self.num_transactions)
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.config();
    config.validate().context("invalid configuration")?;

    let wallet = match &cli.wallet_url {
        Some(url) => HttpWalletClient::with_base_url(url.clone()),
        None => HttpWalletClient::new(),
    }
    .context("could not build wallet client")?;

    let ledger = match &cli.ledger_url {
        Some(url) => HttpLedgerClient::with_base_url(config.ledger_token.clone(), url.clone()),
        None => HttpLedgerClient::new(config.ledger_token.clone()),
    }
    .context("could not build ledger client")?;

    let report = ReconciliationEngine::new(config, wallet, ledger)
        .run()
        .await
        .context("synchronization aborted")?;

    tracing::info!(
        "Done: {} fetched, {} created, {} already present",
        report.fetched,
        report.created,
        report.already_existing
    );
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }
}
