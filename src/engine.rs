//! Sweep Engine
//!
//! Runs one sweep cycle for one tracked account: rotate to the next
//! endpoint, read the balance, compare against the baseline and threshold,
//! plan fees, submit at most one transfer, and advance the baseline only
//! after the transfer is confirmed by a fresh balance read.

use crate::baseline::BaselineStore;
use crate::endpoint_pool::EndpointPool;
use crate::fee_planner::{FeePlanner, PlanOutcome};
use crate::gateway::{GatewayConnector, GatewayError};
use crate::types::{format_amount, truncate_address, AssetKind, TrackedAccount};
use ethers::types::{H256, U256};
use std::sync::Arc;
use tracing::{info, warn};

/// Flat gas cost of a native-coin transfer; no simulation needed.
const NATIVE_TRANSFER_GAS: u64 = 21_000;

/// What one sweep cycle decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Balance did not rise above the baseline.
    NoNewFunds { balance: U256 },
    /// New funds observed, but below the configured sweep minimum. The
    /// baseline stays put so the same excess is re-evaluated next cycle.
    BelowThreshold { balance: U256, threshold: U256 },
    /// Fees would eat the whole balance.
    InsufficientFunds { required: U256, available: U256 },
    /// A transfer went out.
    Swept { tx_hash: H256, amount: U256 },
}

pub struct SweepEngine {
    account: TrackedAccount,
    pool: Arc<EndpointPool>,
    connector: Arc<dyn GatewayConnector>,
    baselines: Arc<BaselineStore>,
    planner: FeePlanner,
}

impl SweepEngine {
    pub fn new(
        account: TrackedAccount,
        pool: Arc<EndpointPool>,
        connector: Arc<dyn GatewayConnector>,
        baselines: Arc<BaselineStore>,
    ) -> Self {
        Self {
            account,
            pool,
            connector,
            baselines,
            planner: FeePlanner::default(),
        }
    }

    pub fn account(&self) -> &TrackedAccount {
        &self.account
    }

    /// One full cycle. Gateway failures abort it with the baseline
    /// untouched; the next scheduled cycle retries against the next endpoint
    /// in rotation. The caller must not run two cycles for the same account
    /// concurrently.
    pub async fn run_cycle(&self) -> Result<CycleOutcome, GatewayError> {
        let account = &self.account;
        let symbol = account.asset.symbol();
        let decimals = account.asset.decimals();

        let endpoint = self.pool.select_next();
        let gateway = self.connector.connect(endpoint).await?;

        let balance = gateway.get_balance(account.address, &account.asset).await?;
        let baseline = self.baselines.baseline(&account.id());

        info!(
            "{}: {} balance {} via {} (baseline {})",
            account.label,
            symbol,
            format_amount(balance, decimals),
            endpoint,
            format_amount(baseline, decimals)
        );

        if balance <= baseline {
            info!("{}: no new {} detected", account.label, symbol);
            return Ok(CycleOutcome::NoNewFunds { balance });
        }

        if balance < account.min_sweep {
            info!(
                "{}: new {} below sweep minimum {}, skipping",
                account.label,
                symbol,
                format_amount(account.min_sweep, decimals)
            );
            return Ok(CycleOutcome::BelowThreshold {
                balance,
                threshold: account.min_sweep,
            });
        }

        let quote = gateway.get_fee_data().await?;

        let gas_units = match &account.asset {
            AssetKind::Native { .. } => U256::from(NATIVE_TRANSFER_GAS),
            AssetKind::Token { .. } => {
                gateway
                    .estimate_gas(account.destination, balance, &account.asset)
                    .await?
            }
        };

        // Fees always come out of the native balance. For a token sweep that
        // is a separate read and the token amount itself stays whole.
        let (fee_funds, fee_symbol, fee_decimals) = match &account.asset {
            AssetKind::Native { .. } => (balance, symbol, decimals),
            AssetKind::Token { .. } => (
                gateway
                    .get_balance(account.address, &account.gas_asset)
                    .await?,
                account.gas_asset.symbol(),
                account.gas_asset.decimals(),
            ),
        };

        let plan = match self.planner.plan(&quote, gas_units, fee_funds) {
            PlanOutcome::Funded(plan) => plan,
            PlanOutcome::InsufficientFunds {
                required,
                available,
            } => {
                info!(
                    "{}: {} {} cannot cover fee reservation {}, skipping",
                    account.label,
                    format_amount(available, fee_decimals),
                    fee_symbol,
                    format_amount(required, fee_decimals)
                );
                return Ok(CycleOutcome::InsufficientFunds {
                    required,
                    available,
                });
            }
        };

        let amount = if account.asset.is_native() {
            plan.sendable
        } else {
            balance
        };

        info!(
            "{}: sweeping {} {} to {} ({} pricing, reservation {} {})",
            account.label,
            format_amount(amount, decimals),
            symbol,
            truncate_address(&format!("{:?}", account.destination)),
            plan.params.pricing.mode(),
            format_amount(plan.reservation, fee_decimals),
            fee_symbol
        );

        let tx_hash = gateway
            .submit_transfer(account.destination, amount, &plan.params, &account.asset)
            .await?;
        info!("{}: transfer sent: {:?}", account.label, tx_hash);

        // Advance the baseline only from a confirmed post-transfer read. A
        // failed read leaves the old baseline, so the next cycle re-evaluates.
        match gateway.get_balance(account.address, &account.asset).await {
            Ok(fresh) => self.baselines.record_sweep(&account.id(), fresh),
            Err(e) => warn!(
                "{}: post-sweep balance read failed, baseline unchanged: {}",
                account.label, e
            ),
        }

        Ok(CycleOutcome::Swept { tx_hash, amount })
    }
}
