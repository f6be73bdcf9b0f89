use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::models::*;
use crate::{
    error::AppResult,
    ledger::store::LedgerStore,
    middleware::parse_optional_json,
    settlement::{
        DrawPrizeSummary, SettlementCoordinator, SettlementSummary, SettlementSweeper,
        SummaryReader, SweepReport,
    },
};

pub struct AppState<S: LedgerStore> {
    pub coordinator: SettlementCoordinator<S>,
    pub sweeper: Arc<SettlementSweeper<S>>,
    pub summary_reader: Arc<SummaryReader<S>>,
}

impl<S: LedgerStore> AppState<S> {
    pub fn new(ledger: Arc<S>) -> Self {
        Self {
            coordinator: SettlementCoordinator::new(ledger.clone()),
            sweeper: Arc::new(SettlementSweeper::new(ledger.clone())),
            summary_reader: Arc::new(SummaryReader::new(ledger)),
        }
    }
}

impl<S: LedgerStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            coordinator: self.coordinator.clone(),
            sweeper: self.sweeper.clone(),
            summary_reader: self.summary_reader.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
    })
}

/// Settle a single drawn draw
/// POST /prizes/process/:draw_id
pub async fn process_prizes<S: LedgerStore + 'static>(
    State(state): State<AppState<S>>,
    Path(draw_id): Path<Uuid>,
) -> AppResult<Json<SettlementSummary>> {
    info!("🎯 Settlement requested for draw {}", draw_id);

    let summary = state.coordinator.settle(draw_id).await?;
    Ok(Json(summary))
}

/// Settle every draw still waiting in DRAWN
/// POST /prizes/process-all
pub async fn process_all_pending<S: LedgerStore + 'static>(
    State(state): State<AppState<S>>,
    body: Bytes,
) -> AppResult<Json<SweepReport>> {
    let request: SweepRequest = parse_optional_json(&body)?;

    info!("🔄 Manual settlement sweep requested");

    let report = state.sweeper.sweep(request.draw_ids.as_deref()).await?;
    Ok(Json(report))
}

/// Read-only prize report for one draw
/// GET /prizes/summary/:draw_id?order=prize_desc|created_at
pub async fn get_prizes_summary<S: LedgerStore + 'static>(
    State(state): State<AppState<S>>,
    Path(draw_id): Path<Uuid>,
    Query(query): Query<SummaryQuery>,
) -> AppResult<Json<DrawPrizeSummary>> {
    let summary = state.summary_reader.summary(draw_id, query.order).await?;
    Ok(Json(summary))
}
