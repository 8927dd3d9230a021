use utoipa::OpenApi;

use crate::api::handlers;
use crate::api::responses::*;
use crate::database::models::PricePoint;
use crate::gateway::ForwarderStats;
use crate::ingest::{AccumulatorStats, ListenerState, ListenerStats};
use crate::jobs::FlushStats;
use crate::metrics::LatencyStats;
use crate::pipeline::IngestStats;

/// OpenAPI document for the query API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Tick Ingest API",
        version = "1.0.0",
        description = "Stock price history and ingestion status for the tick ingestion service"
    ),
    paths(
        handlers::get_prices,
        handlers::get_average,
        handlers::get_health,
        handlers::get_ingest_stats,
    ),
    components(
        schemas(
            PricePoint,
            AverageResponse,
            HealthResponse,
            HealthState,
            ListenerState,
            IngestStats,
            AccumulatorStats,
            ListenerStats,
            FlushStats,
            LatencyStats,
            ForwarderStats,
        )
    ),
    tags(
        (name = "prices", description = "Stored price queries"),
        (name = "health", description = "Health and ingestion statistics"),
    )
)]
pub struct ApiDoc;
