//! Chain Sweeper
use anyhow::{Context, Result};
use chain_sweeper::baseline::BaselineStore;
use chain_sweeper::endpoint_pool::EndpointPool;
use chain_sweeper::engine::SweepEngine;
use chain_sweeper::eth_gateway::EthConnector;
use chain_sweeper::gateway::GatewayConnector;
use chain_sweeper::scheduler::Scheduler;
use chain_sweeper::types::{generate_eth_address, AccountConfig, AssetConfig, ChainConfig, Config};
use clap::{Parser, Subcommand};
use ethers::signers::LocalWallet;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(name = "chain_sweeper")]
struct Cli {
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single sweep cycle for every account and exit.
    Once,

    /// Poll continuously until interrupted.
    Continuous,

    /// Write a sample configuration with freshly generated addresses.
    InitConfig {
        #[arg(long, default_value = "2")]
        num_wallets: usize,

        #[arg(long, default_value = "60")]
        interval: u64,

        /// Sweep minimum for native accounts, in whole coins.
        #[arg(long, default_value = "0.0002")]
        native_threshold: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chain_sweeper=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    if let Commands::InitConfig {
        num_wallets,
        interval,
        native_threshold,
    } = &cli.command
    {
        return init_config(&cli.config, *num_wallets, *interval, native_threshold).await;
    }

    info!("Loading configuration from {}", cli.config.display());
    let config_content = tokio::fs::read_to_string(&cli.config)
        .await
        .context("Failed to read config file")?;

    let config: Config =
        serde_json::from_str(&config_content).context("Failed to parse config file")?;
    let resolved = config.resolve().context("Invalid configuration")?;

    info!("Configuration loaded:");
    info!("  Destination: {:?}", resolved.destination);
    info!("  Chains: {}", resolved.endpoints.len());
    info!("  Tracked accounts: {}", resolved.accounts.len());

    let wallet: LocalWallet = std::env::var("PRIVATE_KEY")
        .context("PRIVATE_KEY environment variable is not set")?
        .parse()
        .context("PRIVATE_KEY is not a valid hex private key")?;

    // One shared pool and connector per chain; accounts on the same chain
    // rotate through the same endpoints.
    let mut pools: HashMap<String, Arc<EndpointPool>> = HashMap::new();
    let mut connectors: HashMap<String, Arc<dyn GatewayConnector>> = HashMap::new();
    for (chain, urls) in &resolved.endpoints {
        pools.insert(chain.clone(), Arc::new(EndpointPool::new(urls.clone())?));
        connectors.insert(
            chain.clone(),
            Arc::new(EthConnector::new(
                wallet.clone(),
                resolved.chain_ids[chain],
                resolved.request_timeout,
            )),
        );
    }

    let baselines = Arc::new(BaselineStore::new());
    let mut engines = Vec::new();
    for account in resolved.accounts {
        let pool = pools
            .get(&account.chain)
            .cloned()
            .with_context(|| format!("no endpoint pool for chain {}", account.chain))?;
        let connector = connectors
            .get(&account.chain)
            .cloned()
            .with_context(|| format!("no connector for chain {}", account.chain))?;
        engines.push(Arc::new(SweepEngine::new(
            account,
            pool,
            connector,
            baselines.clone(),
        )));
    }

    let scheduler = Scheduler::new(engines);

    match cli.command {
        Commands::Once => {
            scheduler.run_once().await?;
        }
        Commands::Continuous => {
            let ctrl_c = signal::ctrl_c();

            tokio::select! {
                result = scheduler.run_continuous() => {
                    result?;
                }
                _ = ctrl_c => {
                    info!("Received Ctrl+C, shutting down gracefully...");
                }
            }

            for (id, state) in baselines.snapshot() {
                info!(
                    "  {}: {} sweeps, last at {}",
                    id,
                    state.total_sweeps,
                    state
                        .last_sweep
                        .map(|t| t.to_rfc3339())
                        .unwrap_or_else(|| "never".to_string())
                );
            }
        }
        Commands::InitConfig { .. } => {
            unreachable!("InitConfig handled above");
        }
    }

    info!("Sweeper shutdown complete");
    Ok(())
}

async fn init_config(
    path: &Path,
    num_wallets: usize,
    interval: u64,
    native_threshold: &str,
) -> Result<()> {
    info!("Initializing configuration...");
    let destination = generate_eth_address();
    info!("Generating {} random watched wallet addresses", num_wallets);

    let mut accounts = Vec::new();
    for i in 0..num_wallets {
        let address = generate_eth_address();
        info!("  Wallet {}: {}", i + 1, address);

        accounts.push(AccountConfig {
            chain: "bsc".to_string(),
            label: format!("Wallet {}", i + 1),
            address: address.clone(),
            asset: AssetConfig::Native {
                symbol: "BNB".to_string(),
                decimals: 18,
            },
            min_sweep: native_threshold.to_string(),
            poll_interval_seconds: None,
        });

        accounts.push(AccountConfig {
            chain: "bsc".to_string(),
            label: format!("Wallet {} USDC", i + 1),
            address,
            asset: AssetConfig::Token {
                symbol: "USDC".to_string(),
                contract: "0x8AC76a51cc950d9822D68b83fE1Ad97B32Cd580d".to_string(),
                decimals: 18,
            },
            min_sweep: "1".to_string(),
            poll_interval_seconds: None,
        });
    }

    let mut chains = HashMap::new();
    chains.insert(
        "bsc".to_string(),
        ChainConfig {
            chain_id: 56,
            endpoints: vec![
                "https://bsc-rpc.publicnode.com".to_string(),
                "https://bsc-dataseed.binance.org".to_string(),
            ],
            native_symbol: "BNB".to_string(),
            native_decimals: 18,
        },
    );

    let config = Config {
        destination_address: destination.clone(),
        chains,
        accounts,
        poll_interval_seconds: interval,
        request_timeout_seconds: 20,
    };

    info!("Configuration:");
    info!("  Destination: {}", destination);
    info!("  Watched wallets: {}", num_wallets);
    info!("  Sweep interval: {}s", interval);
    info!("  Native threshold: {}", native_threshold);

    let config_json =
        serde_json::to_string_pretty(&config).context("Failed to serialize configuration")?;

    tokio::fs::write(path, config_json)
        .await
        .context("Failed to write configuration file")?;

    info!("Created configuration file: {}", path.display());
    Ok(())
}
