// Sweep Scheduler - periodically re-drives pending settlements
//
// The scheduler never decides that a draw is due. It only picks up draws that
// already reached DRAWN and were not settled, e.g. after a crash or when
// the operator trigger was never sent.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info};

use super::sweeper::SettlementSweeper;
use crate::ledger::store::LedgerStore;

/// Sweep schedule configuration
#[derive(Debug, Clone)]
pub struct SweepScheduleConfig {
    pub enabled: bool,
    /// Time between two sweeps
    pub interval: Duration,
}

impl Default for SweepScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_secs(300),
        }
    }
}

pub struct SweepScheduler<S: LedgerStore + 'static> {
    config: SweepScheduleConfig,
    sweeper: Arc<SettlementSweeper<S>>,
}

impl<S: LedgerStore + 'static> SweepScheduler<S> {
    pub fn new(config: SweepScheduleConfig, sweeper: Arc<SettlementSweeper<S>>) -> Self {
        Self { config, sweeper }
    }

    /// Start the sweep loop in the background; `None` when disabled
    pub fn start(&self) -> Option<JoinHandle<()>> {
        if !self.config.enabled {
            info!("⏭️ Settlement sweep scheduler disabled");
            return None;
        }

        let period = self.config.interval;
        let sweeper = self.sweeper.clone();

        info!("⏰ Settlement sweep scheduled every {}s", period.as_secs());

        Some(tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                match sweeper.sweep(None).await {
                    Ok(report) if report.is_empty() => {}
                    Ok(report) => {
                        info!(
                            "✓ Scheduled sweep: {} settled, {} failed",
                            report.succeeded, report.failed
                        );
                    }
                    Err(e) => error!("❌ Scheduled sweep failed: {:?}", e),
                }
            }
        }))
    }
}
