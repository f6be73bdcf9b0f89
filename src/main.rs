mod api;
mod bootstrap;
mod config;
mod error;
mod ledger;
mod middleware;
mod server;
mod settlement;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::server::ServerOptions;

// Initialize logging and tracing
fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,tower_http=debug,lottery_settlement=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before anything reads the environment
    dotenv::dotenv().ok();
    init_tracing();

    info!("🚀 Starting Lottery Settlement Service");

    let config = config::Config::from_env().context("failed to load configuration")?;

    let app = bootstrap::initialize_app(&config)
        .await
        .context("failed to initialize application")?;

    if app.sweep_task.is_some() {
        info!("✓ Settlement sweep running in background");
    }

    // Create HTTP server
    let router = server::create_app(
        app.state,
        &ServerOptions {
            request_timeout: config.request_timeout(),
            cors_origins: config.cors_origins(),
        },
    );

    // Run the Server
    server::run_server(router, &config.bind_address).await?;

    Ok(())
}
