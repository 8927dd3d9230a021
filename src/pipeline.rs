use hdrhistogram::CreationError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use utoipa::ToSchema;

use crate::config::AppConfig;
use crate::database::repositories::PriceRepository;
use crate::gateway::{ForwarderStats, RealtimeGateway, TickForwarder};
use crate::ingest::{
    wait_until_ready, AccumulatorStats, ChannelListener, ListenerHandle, ListenerState,
    ListenerStats, ReadinessError, TickAccumulator,
};
use crate::jobs::{FlushHandle, FlushScheduler, FlushStats};
use crate::metrics::MetricEvent;
use crate::source::TickSource;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Readiness(#[from] ReadinessError),

    #[error("failed to create latency histogram: {0}")]
    Metrics(#[from] CreationError),
}

/// Runtime knobs for the ingestion pipeline
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub channels: Vec<String>,
    pub flush_interval: Duration,
    pub reconnect_delay: Duration,
    pub readiness_attempts: u32,
    pub readiness_delay: Duration,
    pub forward_queue_capacity: usize,
}

impl PipelineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            channels: config.redis.channels.clone(),
            flush_interval: config.ingest.flush_interval,
            reconnect_delay: config.ingest.reconnect_delay,
            readiness_attempts: config.ingest.readiness_attempts,
            readiness_delay: config.ingest.readiness_delay,
            forward_queue_capacity: config.gateway.queue_capacity,
        }
    }
}

/// Combined statistics of every pipeline stage
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IngestStats {
    pub accumulator: AccumulatorStats,
    pub listener: ListenerStats,
    pub flush: FlushStats,
    pub forwarder: ForwarderStats,
}

/// Cloneable read-only view of a running pipeline
#[derive(Clone)]
pub struct IngestMonitor {
    accumulator: Arc<TickAccumulator>,
    listener: ListenerHandle,
    flush: FlushHandle,
    forwarder: TickForwarder,
}

impl IngestMonitor {
    pub fn listener_state(&self) -> ListenerState {
        self.listener.state()
    }

    pub fn stats(&self) -> IngestStats {
        IngestStats {
            accumulator: self.accumulator.stats(),
            listener: self.listener.stats(),
            flush: self.flush.stats(),
            forwarder: self.forwarder.stats(),
        }
    }
}

/// Running ingestion service: listener, flush job and gateway forwarder
///
/// The accumulator is created here and shared only between the listener
/// (append) and the flush job (drain).
pub struct IngestPipeline {
    monitor: IngestMonitor,
    tasks: Vec<JoinHandle<()>>,
}

impl IngestPipeline {
    /// Probe the tick source, then start every stage
    ///
    /// Fails without starting anything when the source never becomes ready;
    /// a `source_unavailable` event is emitted first.
    pub async fn start(
        source: Arc<dyn TickSource>,
        repository: Arc<dyn PriceRepository>,
        gateway: Arc<dyn RealtimeGateway>,
        settings: PipelineSettings,
    ) -> Result<Self, PipelineError> {
        let accumulator = Arc::new(TickAccumulator::new());
        let scheduler =
            FlushScheduler::new(Arc::clone(&accumulator), repository, settings.flush_interval)?;

        if let Err(e) = wait_until_ready(
            source.as_ref(),
            settings.readiness_attempts,
            settings.readiness_delay,
        )
        .await
        {
            MetricEvent::source_unavailable().emit();
            return Err(e.into());
        }

        let forwarder = TickForwarder::spawn(gateway, settings.forward_queue_capacity);
        let listener = ChannelListener::new(
            source,
            settings.channels,
            Arc::clone(&accumulator),
            forwarder.clone(),
            settings.reconnect_delay,
        );

        let monitor = IngestMonitor {
            accumulator,
            listener: listener.handle(),
            flush: scheduler.handle(),
            forwarder,
        };

        let tasks = vec![listener.spawn(), scheduler.spawn()];

        tracing::info!("🚀 Ingest pipeline started");

        Ok(Self { monitor, tasks })
    }

    pub fn monitor(&self) -> IngestMonitor {
        self.monitor.clone()
    }

    /// Wait for the pipeline tasks; they only return if one of them panics
    pub async fn join(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::error!("Pipeline task stopped: {}", e);
            }
        }
    }

    /// Stop the listener and flush job immediately
    ///
    /// Buffered records are not flushed.
    pub fn abort(self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
