//! In-memory sweep state per tracked account.
//!
//! Nothing here is persisted. After a restart every baseline is zero again
//! and the first observed balance counts as new funds.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use ethers::types::U256;

#[derive(Debug, Clone, Default)]
pub struct AccountState {
    /// Last balance used for a sweep decision, the high-water mark.
    pub baseline: U256,
    pub total_sweeps: u64,
    pub last_sweep: Option<DateTime<Utc>>,
}

/// Per-account sweep state keyed by account id. `DashMap` keeps updates for
/// different accounts independent while concurrent cycles run.
#[derive(Default)]
pub struct BaselineStore {
    accounts: DashMap<String, AccountState>,
}

impl BaselineStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current baseline for an account; zero until the first recorded sweep.
    pub fn baseline(&self, account_id: &str) -> U256 {
        self.accounts
            .get(account_id)
            .map(|state| state.baseline)
            .unwrap_or_default()
    }

    /// Advance the baseline after a confirmed sweep. The only writer.
    pub fn record_sweep(&self, account_id: &str, fresh_balance: U256) {
        let mut entry = self.accounts.entry(account_id.to_string()).or_default();
        entry.baseline = fresh_balance;
        entry.total_sweeps += 1;
        entry.last_sweep = Some(Utc::now());
    }

    pub fn state(&self, account_id: &str) -> Option<AccountState> {
        self.accounts.get(account_id).map(|state| state.clone())
    }

    pub fn snapshot(&self) -> Vec<(String, AccountState)> {
        self.accounts
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}
