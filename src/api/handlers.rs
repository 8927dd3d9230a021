use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use super::responses::{AverageResponse, HealthResponse, PriceQueryParams};
use crate::database::connection::DatabaseError;
use crate::database::models::PricePoint;
use crate::database::repositories::PriceRepository;
use crate::pipeline::{IngestMonitor, IngestStats};

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub repository: Arc<dyn PriceRepository>,
    /// Absent when the API runs without an ingestion pipeline
    pub monitor: Option<IngestMonitor>,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

/// Run a repository call on the blocking pool
async fn query_blocking<T, F>(what: &str, f: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, DatabaseError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| {
            tracing::error!("Query task for {} failed: {}", what, e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?
        .map(Json)
        .map_err(|e| {
            tracing::error!("Failed to get {}: {}", what, e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })
}

/// Get stored prices for a stock
#[utoipa::path(
    get,
    path = "/api/prices/{stock_name}",
    tag = "prices",
    params(
        ("stock_name" = String, Path, description = "Stock symbol (e.g., AAPL)"),
        PriceQueryParams
    ),
    responses(
        (status = 200, description = "Price points ordered by time", body = Vec<PricePoint>),
        (status = 400, description = "Invalid time bound"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_prices(
    State(state): State<ApiState>,
    Path(stock_name): Path<String>,
    Query(params): Query<PriceQueryParams>,
) -> ApiResult<Vec<PricePoint>> {
    let range = params
        .time_range()
        .map_err(|e| (StatusCode::BAD_REQUEST, e))?;

    let repository = Arc::clone(&state.repository);
    query_blocking("prices", move || repository.get_prices(&stock_name, range)).await
}

/// Get the average price of a stock
#[utoipa::path(
    get,
    path = "/api/average/{stock_name}",
    tag = "prices",
    params(
        ("stock_name" = String, Path, description = "Stock symbol (e.g., AAPL)"),
        PriceQueryParams
    ),
    responses(
        (status = 200, description = "Average price, null when no prices match", body = AverageResponse),
        (status = 400, description = "Invalid time bound"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_average(
    State(state): State<ApiState>,
    Path(stock_name): Path<String>,
    Query(params): Query<PriceQueryParams>,
) -> ApiResult<AverageResponse> {
    let range = params
        .time_range()
        .map_err(|e| (StatusCode::BAD_REQUEST, e))?;

    let repository = Arc::clone(&state.repository);
    query_blocking("average price", move || {
        repository
            .get_average(&stock_name, range)
            .map(|average_price| AverageResponse { average_price })
    })
    .await
}

/// Service health
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "health",
    responses(
        (status = 200, description = "Ingestion health status", body = HealthResponse)
    )
)]
pub async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    let listener = state.monitor.as_ref().map(IngestMonitor::listener_state);
    Json(HealthResponse::from_listener(listener))
}

/// Ingestion pipeline statistics
#[utoipa::path(
    get,
    path = "/api/v1/ingest/stats",
    tag = "health",
    responses(
        (status = 200, description = "Accumulator, listener, flush and forwarder statistics", body = IngestStats),
        (status = 503, description = "Ingestion pipeline not running")
    )
)]
pub async fn get_ingest_stats(State(state): State<ApiState>) -> ApiResult<IngestStats> {
    state
        .monitor
        .as_ref()
        .map(|monitor| Json(monitor.stats()))
        .ok_or_else(|| {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "Ingestion pipeline not running".to_string(),
            )
        })
}
