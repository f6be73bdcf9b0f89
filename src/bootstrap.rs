use std::{sync::Arc, time::Duration};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tokio::task::JoinHandle;
use tracing::info;

use crate::{
    api::handler::AppState,
    config::Config,
    error::AppResult,
    ledger::repository::LedgerRepository,
    settlement::SweepScheduler,
};

pub struct App {
    pub state: AppState<LedgerRepository>,
    /// Background sweep loop, `None` when disabled
    pub sweep_task: Option<JoinHandle<()>>,
}

pub async fn initialize_app(config: &Config) -> AppResult<App> {
    info!("Initializing application components ...");

    // Database pool
    let pool = initialize_database(config).await?;

    // Core components
    let ledger = Arc::new(LedgerRepository::new(pool));
    let state = AppState::new(ledger);

    // Re-drive draws left in DRAWN after a crash or a missed trigger
    let scheduler = SweepScheduler::new(config.sweep_schedule(), state.sweeper.clone());
    let sweep_task = scheduler.start();

    Ok(App { state, sweep_task })
}

async fn initialize_database(config: &Config) -> AppResult<PgPool> {
    info!("📊 Connecting to database...");

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .min_connections(config.db_min_connections)
        .acquire_timeout(Duration::from_secs(config.db_acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&config.database_url)
        .await?;

    info!(
        "✓ Database pool configured: {} max connections",
        config.db_max_connections
    );

    // Run migrations
    info!("🔄 Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;

    info!("✓ Database initialized");
    Ok(pool)
}
