use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::health::{HealthSnapshot, HealthState};
use crate::api::latency::ScanLatency;
use crate::db::models::{PriceSampleRow, ProcessedMarketRow, SpikeNotificationRow};
use crate::db::SqliteStore;
use crate::error::AppError;

const MAX_LIMIT: i64 = 1_000;

#[derive(Clone)]
pub struct ApiState {
    pub store: SqliteStore,
    pub health: Arc<HealthState>,
    pub latency: Arc<ScanLatency>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/markets/processed", get(get_processed_markets))
        .route("/markets/:id/prices", get(get_market_prices))
        .route("/spikes/recent", get(get_recent_spikes))
        .route("/stats/scan", get(get_scan_stats))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query param structs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

#[derive(Deserialize)]
pub struct PricesQuery {
    pub since: Option<i64>,
    pub limit: Option<i64>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub subscribers: i64,
    #[serde(flatten)]
    pub coordinator: HealthSnapshot,
}

#[derive(Serialize)]
pub struct ScanStatsResponse {
    pub samples: u64,
    pub p50_ms: Option<u64>,
    pub p95_ms: Option<u64>,
    pub p99_ms: Option<u64>,
}

fn clamp_limit(limit: Option<i64>, default: i64) -> Result<i64, AppError> {
    match limit.unwrap_or(default) {
        n if n <= 0 => Err(AppError::BadRequest(format!("limit must be positive, got {n}"))),
        n => Ok(n.min(MAX_LIMIT)),
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_health(State(state): State<ApiState>) -> Result<Json<HealthResponse>, AppError> {
    let subscribers = state.store.subscriber_count().await?;
    Ok(Json(HealthResponse {
        status: "ok",
        subscribers,
        coordinator: state.health.snapshot(),
    }))
}

async fn get_processed_markets(
    State(state): State<ApiState>,
    Query(params): Query<LimitQuery>,
) -> Result<Json<Vec<ProcessedMarketRow>>, AppError> {
    let limit = clamp_limit(params.limit, 50)?;
    Ok(Json(state.store.recent_processed(limit).await?))
}

async fn get_market_prices(
    State(state): State<ApiState>,
    Path(market_id): Path<String>,
    Query(params): Query<PricesQuery>,
) -> Result<Json<Vec<PriceSampleRow>>, AppError> {
    let limit = clamp_limit(params.limit, 100)?;
    let since = params.since.unwrap_or(0);
    Ok(Json(state.store.price_history(&market_id, since, limit).await?))
}

async fn get_recent_spikes(
    State(state): State<ApiState>,
    Query(params): Query<LimitQuery>,
) -> Result<Json<Vec<SpikeNotificationRow>>, AppError> {
    let limit = clamp_limit(params.limit, 50)?;
    Ok(Json(state.store.recent_spikes(limit).await?))
}

async fn get_scan_stats(State(state): State<ApiState>) -> Json<ScanStatsResponse> {
    let (p50_ms, p95_ms, p99_ms) = state.latency.percentiles();
    Json(ScanStatsResponse {
        samples: state.latency.len(),
        p50_ms,
        p95_ms,
        p99_ms,
    })
}
