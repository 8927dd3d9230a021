// Library Crate Root
// lib.rs

pub mod api;
pub mod config;
pub mod database;
pub mod gateway;
pub mod ingest;
pub mod jobs;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod source;
pub mod telemetry;
pub mod testing;

// pub use = re-export at crate root
pub use api::{create_router, ApiState};
pub use config::{AppConfig, ConfigError};
pub use ingest::{TickAccumulator, TickParser};
pub use models::{BatchRecord, RawMessage, Tick, TickEvent};
pub use pipeline::{IngestMonitor, IngestPipeline, PipelineError, PipelineSettings};
