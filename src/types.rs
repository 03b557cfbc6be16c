//! Core data types and configuration for the sweeper service.

use anyhow::{anyhow, bail, Context, Result};
use ethers::types::{Address, U256};
use ethers::utils::{format_units, parse_units};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub destination_address: String,
    pub chains: HashMap<String, ChainConfig>,
    pub accounts: Vec<AccountConfig>,
    pub poll_interval_seconds: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_request_timeout() -> u64 {
    20
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub endpoints: Vec<String>,
    #[serde(default = "default_native_symbol")]
    pub native_symbol: String,
    #[serde(default = "default_native_decimals")]
    pub native_decimals: u8,
}

fn default_native_symbol() -> String {
    "ETH".to_string()
}

fn default_native_decimals() -> u8 {
    18
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    pub chain: String,
    pub label: String,
    pub address: String,
    pub asset: AssetConfig,
    /// Minimum balance, in human units of the asset, before a sweep triggers.
    pub min_sweep: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssetConfig {
    Native {
        symbol: String, //eth,bnb,matic etc
        decimals: u8,
    },

    Token {
        symbol: String, //usdc,usdt,ada etc
        contract: String,
        decimals: u8,
    },
}

impl AssetConfig {
    fn resolve(&self) -> Result<AssetKind> {
        Ok(match self {
            AssetConfig::Native { symbol, decimals } => AssetKind::Native {
                symbol: symbol.clone(),
                decimals: *decimals,
            },
            AssetConfig::Token {
                symbol,
                contract,
                decimals,
            } => AssetKind::Token {
                symbol: symbol.clone(),
                contract: parse_address(contract)?,
                decimals: *decimals,
            },
        })
    }
}

/// Asset held by a tracked account, with everything needed to query and
/// transfer it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetKind {
    Native {
        symbol: String,
        decimals: u8,
    },
    Token {
        symbol: String,
        contract: Address,
        decimals: u8,
    },
}

impl AssetKind {
    pub fn symbol(&self) -> &str {
        match self {
            AssetKind::Native { symbol, .. } | AssetKind::Token { symbol, .. } => symbol,
        }
    }

    pub fn decimals(&self) -> u8 {
        match self {
            AssetKind::Native { decimals, .. } | AssetKind::Token { decimals, .. } => *decimals,
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self, AssetKind::Native { .. })
    }
}

/// A fully-resolved account under watch. Built once at startup, immutable
/// for the process lifetime.
#[derive(Debug, Clone)]
pub struct TrackedAccount {
    pub chain: String,
    pub chain_id: u64,
    pub label: String,
    pub address: Address,
    pub destination: Address,
    pub asset: AssetKind,
    /// The chain's native asset, which pays fees for token sweeps.
    pub gas_asset: AssetKind,
    /// Minimum balance, in smallest units, before a sweep triggers.
    pub min_sweep: U256,
    pub poll_interval: Duration,
}

impl TrackedAccount {
    pub fn id(&self) -> String {
        format!("{}:{}:{:?}", self.chain, self.asset.symbol(), self.address)
    }
}

/// Startup-validated view of [`Config`] with addresses parsed and thresholds
/// converted to smallest units.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub destination: Address,
    pub accounts: Vec<TrackedAccount>,
    pub endpoints: HashMap<String, Vec<Url>>,
    pub chain_ids: HashMap<String, u64>,
    pub request_timeout: Duration,
}

impl Config {
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        let destination =
            parse_address(&self.destination_address).context("invalid destination_address")?;

        if self.accounts.is_empty() {
            bail!("no accounts configured");
        }

        let mut endpoints = HashMap::new();
        let mut chain_ids = HashMap::new();
        for (name, chain) in &self.chains {
            if chain.endpoints.is_empty() {
                bail!("chain {name} has no endpoints");
            }
            let mut urls = Vec::new();
            for raw in &chain.endpoints {
                urls.push(
                    Url::parse(raw)
                        .with_context(|| format!("invalid endpoint url for chain {name}: {raw}"))?,
                );
            }
            endpoints.insert(name.clone(), urls);
            chain_ids.insert(name.clone(), chain.chain_id);
        }

        let mut accounts = Vec::new();
        for acct in &self.accounts {
            let chain = self.chains.get(&acct.chain).with_context(|| {
                format!(
                    "account {} references unknown chain {}",
                    acct.label, acct.chain
                )
            })?;

            let asset = acct
                .asset
                .resolve()
                .with_context(|| format!("invalid asset for account {}", acct.label))?;

            let min_sweep = parse_amount(&acct.min_sweep, asset.decimals())
                .with_context(|| format!("invalid min_sweep for account {}", acct.label))?;

            accounts.push(TrackedAccount {
                chain: acct.chain.clone(),
                chain_id: chain.chain_id,
                label: acct.label.clone(),
                address: parse_address(&acct.address)
                    .with_context(|| format!("invalid address for account {}", acct.label))?,
                destination,
                asset,
                gas_asset: AssetKind::Native {
                    symbol: chain.native_symbol.clone(),
                    decimals: chain.native_decimals,
                },
                min_sweep,
                poll_interval: Duration::from_secs(
                    acct.poll_interval_seconds
                        .unwrap_or(self.poll_interval_seconds),
                ),
            });
        }

        Ok(ResolvedConfig {
            destination,
            accounts,
            endpoints,
            chain_ids,
            request_timeout: Duration::from_secs(self.request_timeout_seconds),
        })
    }
}

pub fn parse_address(raw: &str) -> Result<Address> {
    raw.parse::<Address>()
        .map_err(|e| anyhow!("invalid address {raw:?}: {e}"))
}

/// Convert a human-unit decimal string into the asset's smallest unit.
/// Everything downstream stays in integer smallest units.
pub fn parse_amount(amount: &str, decimals: u8) -> Result<U256> {
    let parsed = parse_units(amount, u32::from(decimals))
        .map_err(|e| anyhow!("invalid amount {amount:?}: {e}"))?;
    Ok(parsed.into())
}

/// Render a smallest-unit amount in human units for logs.
pub fn format_amount(amount: U256, decimals: u8) -> String {
    format_units(amount, u32::from(decimals)).unwrap_or_else(|_| amount.to_string())
}

pub fn truncate_address(address: &str) -> String {
    if address.len() <= 10 {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}

// Random address generator for the sample-config command
pub fn generate_eth_address() -> String {
    let mut rng = rand::rng();
    let mut bytes = [0u8; 20];
    rng.fill(&mut bytes);

    format!("0x{}", hex::encode(bytes))
}
