use std::error::Error;
use std::sync::Arc;

use tick_ingest::api::{create_router, ApiState};
use tick_ingest::config::AppConfig;
use tick_ingest::database::establish_connection_pool;
use tick_ingest::database::repositories::{PgPriceRepository, PriceRepository};
use tick_ingest::gateway::{CentrifugoGateway, RealtimeGateway};
use tick_ingest::pipeline::{IngestPipeline, PipelineSettings};
use tick_ingest::source::{RedisTickSource, TickSource};
use tick_ingest::telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Load environment variables from .env file (if present)
    dotenvy::dotenv().ok();

    telemetry::init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!("Configuration: {}", serde_json::to_string(&config)?);

    let repository = initialize_database(&config).await?;

    let source: Arc<dyn TickSource> = Arc::new(RedisTickSource::new(&config.redis)?);
    let gateway: Arc<dyn RealtimeGateway> = Arc::new(CentrifugoGateway::new(&config.gateway)?);

    tracing::info!("📡 Tick source: {}", source.endpoint());
    tracing::info!("🌉 Gateway: {}", config.gateway.api_url);

    // Exits non-zero when the tick source never becomes ready
    let pipeline = IngestPipeline::start(
        source,
        Arc::clone(&repository),
        gateway,
        PipelineSettings::from_config(&config),
    )
    .await?;

    if !config.api.enabled {
        pipeline.join().await;
        return Ok(());
    }

    let app = create_router(ApiState {
        repository,
        monitor: Some(pipeline.monitor()),
    });

    let addr = config.api.bind_addr.as_str();
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("🚀 Tick Ingest API running on http://{}", addr);
    tracing::info!("📊 Health check: http://{}/api/v1/health", addr);
    tracing::info!("📚 Swagger UI: http://{}/swagger-ui", addr);

    tokio::select! {
        result = async { axum::serve(listener, app).await } => result?,
        _ = pipeline.join() => tracing::error!("Ingest pipeline stopped"),
    }

    Ok(())
}

/// Create the connection pool, apply migrations and build the price repository
///
/// Only configuration mistakes are fatal here; an unreachable database is
/// logged and every flush will fail until it comes back.
async fn initialize_database(
    config: &AppConfig,
) -> Result<Arc<dyn PriceRepository>, Box<dyn Error>> {
    tracing::info!("🗄️  Initializing PostgreSQL connection pool...");

    let pool = establish_connection_pool(&config.postgres)?;

    if config.postgres.run_migrations {
        let migration_pool = pool.clone();
        match tokio::task::spawn_blocking(move || migration_pool.run_migrations()).await? {
            Ok(applied) => tracing::info!("✅ Database schema ready ({} migrations applied)", applied),
            Err(e) => {
                tracing::warn!("⚠️  Could not apply migrations: {}", e);
                tracing::warn!("   Flushes will fail until the database is reachable");
            }
        }
    }

    Ok(Arc::new(PgPriceRepository::new(move || pool.get_conn())))
}
