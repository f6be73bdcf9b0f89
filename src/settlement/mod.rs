// Draw settlement and prize distribution
pub mod coordinator;
pub mod evaluator;
pub mod scheduler;
pub mod summary;
pub mod sweeper;

pub use coordinator::{SettlementCoordinator, SettlementSummary};
pub use scheduler::{SweepScheduleConfig, SweepScheduler};
pub use summary::{DrawPrizeSummary, SummaryReader, WinnerOrder};
pub use sweeper::{SettlementSweeper, SweepReport};
