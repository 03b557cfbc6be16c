//! Scheduler
//!
//! Drives sweep cycles for every tracked account, once or continuously.

use crate::engine::{CycleOutcome, SweepEngine};
use anyhow::Result;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing::{error, info, warn};

pub struct Scheduler {
    engines: Vec<Arc<SweepEngine>>,
}

impl Scheduler {
    pub fn new(engines: Vec<Arc<SweepEngine>>) -> Self {
        Self { engines }
    }

    /// One cycle for every account, concurrently. Returns the number of
    /// sweeps submitted.
    pub async fn run_once(&self) -> Result<usize> {
        info!("Starting sweep cycle for {} accounts", self.engines.len());

        let mut set = JoinSet::new();
        for engine in &self.engines {
            let engine = Arc::clone(engine);
            set.spawn(async move { drive(&engine).await });
        }

        let mut sweep_count = 0;
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(count) => sweep_count += count,
                Err(e) => error!("Sweep task failed: {}", e),
            }
        }

        info!("Sweep cycle complete: {} sweeps executed", sweep_count);
        Ok(sweep_count)
    }

    /// One looping task per account. A cycle always runs to completion
    /// before that account's next tick starts, so cycles for the same
    /// account never overlap; accounts run independently of each other.
    pub async fn run_continuous(self) -> Result<()> {
        let mut set = JoinSet::new();
        for engine in self.engines {
            let interval = engine.account().poll_interval;
            info!(
                "Watching {} every {}s",
                engine.account().label,
                interval.as_secs()
            );
            set.spawn(async move {
                loop {
                    drive(&engine).await;
                    sleep(interval).await;
                }
            });
        }

        while let Some(joined) = set.join_next().await {
            if let Err(e) = joined {
                error!("Sweep task ended unexpectedly: {}", e);
            }
        }
        Ok(())
    }
}

/// Run one cycle and swallow its failure. Nothing a cycle does is fatal;
/// the next tick retries against a rotated endpoint.
async fn drive(engine: &SweepEngine) -> usize {
    match engine.run_cycle().await {
        Ok(CycleOutcome::Swept { .. }) => 1,
        Ok(_) => 0,
        Err(e) => {
            warn!(
                "Sweep cycle failed for {}: {}",
                engine.account().label,
                e
            );
            0
        }
    }
}
