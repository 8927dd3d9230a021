use axum::{routing::get, Router};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers::*;
use super::openapi::ApiDoc;

/// Create the API router with Swagger UI
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Price queries
        .route("/api/prices/:stock_name", get(get_prices))
        .route("/api/average/:stock_name", get(get_average))
        // Service status
        .route("/api/v1/health", get(get_health))
        .route("/api/v1/ingest/stats", get(get_ingest_stats))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::NewStockPrice;
    use crate::pipeline::{IngestPipeline, PipelineSettings};
    use crate::testing::{InMemoryTickSource, RecordingGateway, RecordingRepository};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::{DateTime, Utc};
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn row(stock_name: &str, price: f64, secs: i64) -> NewStockPrice {
        NewStockPrice {
            stock_name: stock_name.to_string(),
            exchange: "NASDAQ".to_string(),
            price,
            price_time: DateTime::<Utc>::from_timestamp(secs, 0).unwrap(),
        }
    }

    fn router_with_rows(rows: Vec<NewStockPrice>) -> Router {
        create_router(ApiState {
            repository: Arc::new(RecordingRepository::with_rows(rows)),
            monitor: None,
        })
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));

        (status, body)
    }

    #[tokio::test]
    async fn test_prices_ordered_and_filtered() {
        let router = router_with_rows(vec![
            row("AAPL", 221.0, 1757494920),
            row("AAPL", 220.0, 1757494910),
            row("MSFT", 421.0, 1757494915),
            row("AAPL", 222.0, 1757494930),
        ]);

        let (status, body) = get_json(router.clone(), "/api/prices/AAPL").await;
        assert_eq!(status, StatusCode::OK);
        let prices: Vec<f64> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["price"].as_f64().unwrap())
            .collect();
        assert_eq!(prices, vec![220.0, 221.0, 222.0]);

        let (status, body) = get_json(
            router,
            "/api/prices/AAPL?start_time=2025-09-10T09:01:55Z&end_time=2025-09-10T09:02:00Z",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["price"], 221.0);
        assert_eq!(body[0]["timestamp"], "2025-09-10T09:02:00Z");
    }

    #[tokio::test]
    async fn test_invalid_time_is_bad_request() {
        let router = router_with_rows(vec![]);

        let (status, body) = get_json(router, "/api/prices/AAPL?start_time=soon").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.as_str().unwrap().contains("start_time"));
    }

    #[tokio::test]
    async fn test_average_price() {
        let router = router_with_rows(vec![
            row("AAPL", 220.0, 1757494910),
            row("AAPL", 222.0, 1757494920),
        ]);

        let (status, body) = get_json(router.clone(), "/api/average/AAPL").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["average_price"], 221.0);

        let (status, body) = get_json(router, "/api/average/TSLA").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["average_price"].is_null());
    }

    #[tokio::test]
    async fn test_health_and_stats_without_pipeline() {
        let router = router_with_rows(vec![]);

        let (status, body) = get_json(router.clone(), "/api/v1/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "degraded");

        let (status, _) = get_json(router, "/api/v1/ingest/stats").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_health_and_stats_with_pipeline() {
        let repository = Arc::new(RecordingRepository::new());
        let pipeline = IngestPipeline::start(
            Arc::new(InMemoryTickSource::new()),
            repository.clone(),
            Arc::new(RecordingGateway::new()),
            PipelineSettings {
                channels: vec!["NASDAQ".to_string()],
                flush_interval: Duration::from_secs(60),
                reconnect_delay: Duration::from_millis(10),
                readiness_attempts: 1,
                readiness_delay: Duration::from_millis(1),
                forward_queue_capacity: 8,
            },
        )
        .await
        .unwrap();

        let monitor = pipeline.monitor();
        assert!(
            crate::testing::wait_until(Duration::from_secs(2), || {
                monitor.listener_state() == crate::ingest::ListenerState::Subscribed
            })
            .await
        );

        let router = create_router(ApiState {
            repository,
            monitor: Some(monitor),
        });

        let (status, body) = get_json(router.clone(), "/api/v1/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["listener"], "subscribed");

        let (status, body) = get_json(router, "/api/v1/ingest/stats").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["accumulator"]["current_size"], 0);
        assert_eq!(body["flush"]["attempts"], 0);
        assert_eq!(body["listener"]["state"], "subscribed");

        pipeline.abort();
    }

    #[tokio::test]
    async fn test_openapi_document_is_served() {
        let router = router_with_rows(vec![]);

        let (status, body) = get_json(router, "/api-docs/openapi.json").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/api/prices/{stock_name}"].is_object());
        assert!(body["paths"]["/api/average/{stock_name}"].is_object());
    }
}
