use axum::{
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;

use crate::{
    api::handler::{get_prizes_summary, health_check, process_all_pending, process_prizes, AppState},
    ledger::store::LedgerStore,
    middleware::create_cors_layer,
};

const MIN_REQUEST_TIMEOUT: Duration = Duration::from_secs(1);

/// HTTP surface options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub request_timeout: Duration,
    pub cors_origins: Vec<String>,
}

pub fn create_app<S: LedgerStore + 'static>(state: AppState<S>, options: &ServerOptions) -> Router {
    info!("⚙️ Setting up HTTP routes...");

    let app = Router::new()
        // Public health check endpoint
        .route("/health", get(health_check))
        .nest(
            "/api/v1",
            Router::new()
                .route("/prizes/process/:draw_id", post(process_prizes::<S>))
                .route("/prizes/process-all", post(process_all_pending::<S>))
                .route("/prizes/summary/:draw_id", get(get_prizes_summary::<S>)),
        )
        .layer(TimeoutLayer::new(options.request_timeout.max(MIN_REQUEST_TIMEOUT)))
        .layer(create_cors_layer(&options.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("✓ HTTP routes configured");
    app
}

pub async fn run_server(app: Router, bind_address: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    info!("🌐 Server listening on: {}", bind_address);

    axum::serve(listener, app).await?;
    Ok(())
}
