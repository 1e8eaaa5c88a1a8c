//! Wallet bridge CLI
//!
//! Manages the wallet's account and network and serves dapp requests over
//! stdin/stdout.

use aptos_dapp_bridge::accounts::{self, ActiveAccount};
use aptos_dapp_bridge::audit::AuditLog;
use aptos_dapp_bridge::client::{RestClientFactory, APTOS_COIN};
use aptos_dapp_bridge::config::network;
use aptos_dapp_bridge::origin::ActiveTab;
use aptos_dapp_bridge::permissions::{
    PermissionKind, PermissionPrompter, Permissions, StaticPrompter, TerminalPrompter,
};
use aptos_dapp_bridge::storage::{FileStore, KeyValueStore, MemoryStore, SessionStore};
use aptos_dapp_bridge::transfer::TransferParams;
use aptos_dapp_bridge::wallet::LocalSigner;
use aptos_dapp_bridge::{
    BridgeRunner, Config, DappApi, Error, NetworkConfig, Result, WalletContext, PRIVATE_KEY_ENV,
};
use clap::{Parser, Subcommand};
use secrecy::SecretString;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "wallet-bridge")]
#[command(about = "Aptos wallet bridge for dapps")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log as JSON lines
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the active account
    Account {
        #[command(subcommand)]
        command: AccountCommand,
    },

    /// Manage networks
    Network {
        #[command(subcommand)]
        command: NetworkCommand,
    },

    /// Show the native coin balance of an account
    Balance {
        /// Address to query (defaults to the active account)
        #[arg(long)]
        address: Option<String>,
    },

    /// Transfer the native coin from the active account
    Transfer {
        /// Recipient address
        #[arg(long)]
        to: String,

        /// Amount in octas
        #[arg(long)]
        amount: u64,

        /// Only simulate, don't submit
        #[arg(long)]
        simulate: bool,

        /// Skip the on-chain lookup and treat the recipient as existing
        #[arg(long)]
        recipient_exists: bool,
    },

    /// Serve dapp requests (JSON lines on stdin, responses on stdout)
    Serve {
        /// Permission kinds approved without asking
        #[arg(long = "approve", value_name = "KIND")]
        approve: Vec<String>,

        /// Ask on the terminal for every prompt
        #[arg(long, conflicts_with = "approve")]
        interactive: bool,
    },

    /// Show current configuration
    Config,
}

#[derive(Subcommand)]
enum AccountCommand {
    /// Import a private key and make it the active account
    Import {
        /// Hex private key (defaults to PRIVATE_KEY)
        #[arg(long)]
        key: Option<String>,
    },
    /// Generate a new key and make it the active account
    Generate,
    /// Show the active account
    Show,
    /// Forget the active account
    Clear,
}

#[derive(Subcommand)]
enum NetworkCommand {
    /// List known networks
    List,
    /// Switch the active network
    Use { name: String },
    /// Add or replace a custom network
    Add { name: String, url: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // stdout carries bridge responses, so logs go to stderr
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    let (plain, json) = if cli.json {
        (None, Some(fmt::layer().json().with_writer(std::io::stderr)))
    } else {
        (Some(fmt::layer().with_writer(std::io::stderr)), None)
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(plain)
        .with(json)
        .init();

    let config = match &cli.config {
        Some(path) => Config::load(path).await?,
        None => Config::default(),
    };

    if let Commands::Config = cli.command {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let ctx = Arc::new(build_context(config).await?);
    unlock_from_env(&ctx).await?;

    match cli.command {
        Commands::Account { command } => run_account(&ctx, command).await,
        Commands::Network { command } => run_network(&ctx, command).await,
        Commands::Balance { address } => run_balance(&ctx, address).await,
        Commands::Transfer {
            to,
            amount,
            simulate,
            recipient_exists,
        } => run_transfer(&ctx, to, amount, simulate, recipient_exists).await,
        Commands::Serve {
            approve,
            interactive,
        } => run_serve(ctx, approve, interactive).await,
        Commands::Config => Ok(()),
    }
}

async fn build_context(config: Config) -> Result<WalletContext> {
    let store: Arc<dyn KeyValueStore> = match &config.storage_path {
        Some(path) => Arc::new(FileStore::open(path.clone()).await?),
        None => {
            tracing::warn!("No storage_path configured - wallet state lasts for this run only");
            Arc::new(MemoryStore::new())
        }
    };

    Ok(WalletContext::new(
        config,
        store,
        SessionStore::new(),
        NetworkConfig::from_env(),
        Arc::new(RestClientFactory::new()),
    ))
}

/// Unlock the key from PRIVATE_KEY; it becomes active if no account is set
async fn unlock_from_env(ctx: &WalletContext) -> Result<()> {
    let Ok(private_key) = std::env::var(PRIVATE_KEY_ENV) else {
        return Ok(());
    };

    match LocalSigner::from_hex(&private_key) {
        Ok(signer) => {
            ctx.session()
                .unlock(signer.address(), SecretString::from(private_key))
                .await;
            if ctx.active_account().await?.is_none() {
                accounts::set_active_account(ctx.store().as_ref(), &signer.account()).await?;
            }
            tracing::info!(address = %signer.address(), "Unlocked key from PRIVATE_KEY");
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load key from PRIVATE_KEY");
        }
    }
    Ok(())
}

async fn activate(ctx: &WalletContext, signer: &LocalSigner, private_key: String) -> Result<()> {
    accounts::set_active_account(ctx.store().as_ref(), &signer.account()).await?;
    ctx.session()
        .unlock(signer.address(), SecretString::from(private_key))
        .await;
    Ok(())
}

async fn require_active_account(ctx: &WalletContext) -> Result<ActiveAccount> {
    ctx.active_account()
        .await?
        .ok_or(Error::NoAccounts)
}

async fn run_account(ctx: &WalletContext, command: AccountCommand) -> Result<()> {
    match command {
        AccountCommand::Import { key } => {
            let key = match key {
                Some(key) => key,
                None => std::env::var(PRIVATE_KEY_ENV).map_err(|_| {
                    Error::InvalidArgument(format!("Pass --key or set {}", PRIVATE_KEY_ENV))
                })?,
            };
            let signer = LocalSigner::from_hex(&key)?;
            activate(ctx, &signer, key).await?;
            println!("Active account: {}", signer.address());
        }
        AccountCommand::Generate => {
            let signer = LocalSigner::generate();
            let private_key = signer.private_key_hex();
            activate(ctx, &signer, private_key.clone()).await?;
            println!("Address:     {}", signer.address());
            println!("Public key:  {}", signer.public_key_hex());
            println!("Private key: {}", private_key);
            println!(
                "Store the private key safely; set it as {} to unlock the wallet.",
                PRIVATE_KEY_ENV
            );
        }
        AccountCommand::Clear => {
            let account = require_active_account(ctx).await?;
            accounts::clear_active_account(ctx.store().as_ref()).await?;
            println!("Cleared active account {}", account.address);
        }
        AccountCommand::Show => {
            let account = require_active_account(ctx).await?;
            println!("Address:    {}", account.address);
            println!("Public key: {}", account.public_key);
            let unlocked = ctx.session().is_unlocked(&account.address).await;
            println!("Unlocked:   {}", unlocked);
        }
    }
    Ok(())
}

async fn run_network(ctx: &WalletContext, command: NetworkCommand) -> Result<()> {
    let store = ctx.store().as_ref();
    match command {
        NetworkCommand::List => {
            let active = ctx.active_network().await?;
            let known = network::known_networks(store, ctx.networks()).await?;
            for net in known.networks() {
                let marker = if net.name == active.name { "*" } else { " " };
                println!("{} {:<12} {}", marker, net.name, net.node_url);
            }
        }
        NetworkCommand::Use { name } => {
            let net = network::set_active_network(store, ctx.networks(), &name).await?;
            println!("Active network: {} ({})", net.name, net.node_url);
        }
        NetworkCommand::Add { name, url } => {
            let net = aptos_dapp_bridge::Network::new(name, &url)?;
            let summary = format!("{} ({})", net.name, net.node_url);
            network::save_custom_network(store, net).await?;
            println!("Saved network: {}", summary);
        }
    }
    Ok(())
}

async fn run_balance(ctx: &WalletContext, address: Option<String>) -> Result<()> {
    let address = match address {
        Some(address) => address,
        None => require_active_account(ctx).await?.address,
    };
    let transfer = ctx.coin_transfer().await?;
    let balance = transfer.balance(&address).await?;
    println!("{} {} ({})", balance, APTOS_COIN, address);
    Ok(())
}

async fn run_transfer(
    ctx: &WalletContext,
    to: String,
    amount: u64,
    simulate: bool,
    recipient_exists: bool,
) -> Result<()> {
    let account = require_active_account(ctx).await?;
    let transfer = ctx.coin_transfer().await?;

    let params = if recipient_exists {
        TransferParams {
            recipient: to,
            amount,
            does_recipient_exist: true,
        }
    } else {
        transfer.params(&to, amount).await?
    };

    tracing::info!(
        from = %account.address,
        to = %params.recipient,
        amount = params.amount,
        recipient_exists = params.does_recipient_exist,
        "Preparing transfer"
    );

    if simulate {
        let result = transfer.simulate(&account, &params).await?;
        if result.success {
            println!("Simulation SUCCEEDED");
            println!("  Gas used: {}", result.gas_used);
            println!("  Estimated fee: {} octas", result.estimated_fee());
        } else {
            println!("Simulation FAILED");
            if let Some(reason) = result.abort_reason {
                println!("  Abort reason: {}", reason);
            }
        }
        return Ok(());
    }

    let signer = ctx
        .session()
        .signer(&account.address)
        .await?
        .ok_or_else(|| Error::Wallet(format!("Set {} to unlock the wallet", PRIVATE_KEY_ENV)))?;
    let committed = transfer.submit(&signer, &params).await?;
    println!("Transfer committed");
    println!("  Hash: {}", committed.hash);
    println!("  Version: {}", committed.version);
    println!("  Gas used: {}", committed.gas_used);
    Ok(())
}

async fn run_serve(ctx: Arc<WalletContext>, approve: Vec<String>, interactive: bool) -> Result<()> {
    let prompter: Arc<dyn PermissionPrompter> = if interactive {
        Arc::new(TerminalPrompter::new())
    } else {
        let kinds = approve
            .iter()
            .map(|name| {
                PermissionKind::parse(name).ok_or_else(|| {
                    Error::InvalidArgument(format!("Unknown permission kind: {}", name))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Arc::new(StaticPrompter::approving(kinds))
    };

    let tab = ActiveTab::new();
    let permissions = Permissions::new(ctx.store().clone(), prompter);
    let audit_path = ctx.config().audit_log_path.clone();
    let api = DappApi::new(ctx, Arc::new(tab.clone()), permissions);

    let mut runner = BridgeRunner::new(api, tab);
    if let Some(path) = audit_path {
        tracing::info!(path = %path, "Writing audit log");
        runner = runner.with_audit_log(AuditLog::new(path));
    }

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    runner.serve(stdin, tokio::io::stdout()).await?;
    Ok(())
}
