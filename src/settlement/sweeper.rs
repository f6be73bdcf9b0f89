// Settlement Sweeper - re-drives every draw left in DRAWN
//
// Draws are settled one at a time; a failing draw is recorded and the sweep
// moves on to the next one.

use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use super::coordinator::{SettlementCoordinator, SettlementSummary};
use crate::error::{AppResult, ErrorKind};
use crate::ledger::store::LedgerStore;

/// One draw the sweep could not settle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepFailure {
    pub draw_id: Uuid,
    pub game_name: String,
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<SweepFailure>,
    pub settled: Vec<SettlementSummary>,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.processed == 0
    }
}

pub struct SettlementSweeper<S: LedgerStore> {
    coordinator: SettlementCoordinator<S>,
}

impl<S: LedgerStore> SettlementSweeper<S> {
    pub fn new(ledger: Arc<S>) -> Self {
        Self {
            coordinator: SettlementCoordinator::new(ledger),
        }
    }

    /// Settle every pending draw, optionally restricted to `filter`
    pub async fn sweep(&self, filter: Option<&[Uuid]>) -> AppResult<SweepReport> {
        info!("🔄 Starting settlement sweep");

        let mut pending = self.coordinator.ledger().pending_draws().await?;
        if let Some(ids) = filter {
            pending.retain(|draw| ids.contains(&draw.id));
        }

        if pending.is_empty() {
            info!("✓ No draws pending settlement");
            return Ok(SweepReport::default());
        }

        info!("📊 Found {} draws pending settlement", pending.len());

        let mut report = SweepReport {
            processed: pending.len(),
            ..SweepReport::default()
        };

        for draw in pending {
            match self.coordinator.settle(draw.id).await {
                Ok(summary) => {
                    report.succeeded += 1;
                    report.settled.push(summary);
                }
                Err(e) => {
                    error!(draw_id = %draw.id, game = %draw.game_name, "❌ Draw settlement failed: {}", e);
                    report.failed += 1;
                    report.failures.push(SweepFailure {
                        draw_id: draw.id,
                        game_name: draw.game_name,
                        kind: e.kind(),
                        message: e.to_string(),
                    });
                }
            }
        }

        info!(
            total = report.processed,
            succeeded = report.succeeded,
            failed = report.failed,
            "✓ Settlement sweep completed"
        );

        Ok(report)
    }
}
