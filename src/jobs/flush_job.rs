use chrono::{DateTime, Utc};
use hdrhistogram::CreationError;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use utoipa::ToSchema;

use crate::database::models::NewStockPrice;
use crate::database::repositories::PriceRepository;
use crate::ingest::TickAccumulator;
use crate::metrics::{FlushLatencyTracker, LatencyStats, MetricEvent};

/// Result of one flush cycle
#[derive(Debug, Clone, PartialEq)]
pub enum FlushOutcome {
    /// Nothing was buffered; storage was not touched
    Empty,
    Persisted { rows: usize, latency: Duration },
    /// The batch was discarded
    Failed { rows: usize },
}

/// Statistics for the flush job
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FlushStats {
    pub cycles: u64,
    /// Cycles that found records to write
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub rows_persisted: u64,
    pub rows_lost: u64,
    pub last_success_at: Option<DateTime<Utc>>,
    pub latency: LatencyStats,
}

struct FlushCounters {
    cycles: AtomicU64,
    attempts: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    rows_persisted: AtomicU64,
    rows_lost: AtomicU64,
    last_success_at: Mutex<Option<DateTime<Utc>>>,
    latency: Mutex<FlushLatencyTracker>,
}

/// Read-only view of the flush job statistics
#[derive(Clone)]
pub struct FlushHandle {
    counters: Arc<FlushCounters>,
}

impl FlushHandle {
    pub fn stats(&self) -> FlushStats {
        let c = &self.counters;
        FlushStats {
            cycles: c.cycles.load(Ordering::Relaxed),
            attempts: c.attempts.load(Ordering::Relaxed),
            successes: c.successes.load(Ordering::Relaxed),
            failures: c.failures.load(Ordering::Relaxed),
            rows_persisted: c.rows_persisted.load(Ordering::Relaxed),
            rows_lost: c.rows_lost.load(Ordering::Relaxed),
            last_success_at: *c.last_success_at.lock(),
            latency: c.latency.lock().stats(),
        }
    }
}

/// Periodically drains the accumulator into the price table
///
/// Each cycle:
/// - Drains every buffered record
/// - Skips storage entirely when nothing was buffered
/// - Writes the batch in one transaction on the blocking pool
/// - Emits exactly one structured event (success with latency, or failure)
///
/// A failed batch is dropped, never retried or re-buffered. Cycles run one at
/// a time, so a slow insert delays the next cycle instead of overlapping it.
pub struct FlushScheduler {
    accumulator: Arc<TickAccumulator>,
    repository: Arc<dyn PriceRepository>,
    interval: Duration,
    counters: Arc<FlushCounters>,
}

impl FlushScheduler {
    pub fn new(
        accumulator: Arc<TickAccumulator>,
        repository: Arc<dyn PriceRepository>,
        interval: Duration,
    ) -> Result<Self, CreationError> {
        Ok(Self {
            accumulator,
            repository,
            interval,
            counters: Arc::new(FlushCounters {
                cycles: AtomicU64::new(0),
                attempts: AtomicU64::new(0),
                successes: AtomicU64::new(0),
                failures: AtomicU64::new(0),
                rows_persisted: AtomicU64::new(0),
                rows_lost: AtomicU64::new(0),
                last_success_at: Mutex::new(None),
                latency: Mutex::new(FlushLatencyTracker::new()?),
            }),
        })
    }

    pub fn handle(&self) -> FlushHandle {
        FlushHandle {
            counters: Arc::clone(&self.counters),
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Flush every interval, the first time one interval after start
    pub async fn run(self) {
        let start = tokio::time::Instant::now() + self.interval;
        let mut ticker = tokio::time::interval_at(start, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!("⏰ Flush job started (every {:?})", self.interval);

        loop {
            ticker.tick().await;
            tracing::debug!("🕐 Flush job triggered");
            self.flush_once().await;
        }
    }

    /// Run a single flush cycle
    pub async fn flush_once(&self) -> FlushOutcome {
        self.counters.cycles.fetch_add(1, Ordering::Relaxed);

        let batch = self.accumulator.drain();
        let tick_count = batch.len();

        if tick_count == 0 {
            tracing::debug!("   No ticks to persist");
            return FlushOutcome::Empty;
        }

        self.counters.attempts.fetch_add(1, Ordering::Relaxed);
        let start = Instant::now();

        // Row conversion and the insert both block, keep them off the runtime
        let repository = Arc::clone(&self.repository);
        let result = tokio::task::spawn_blocking(move || {
            let rows = NewStockPrice::from_batch(&batch)?;
            repository.insert_batch(&rows)
        })
        .await;

        let latency = start.elapsed();

        match result {
            Ok(Ok(inserted)) => {
                self.counters.successes.fetch_add(1, Ordering::Relaxed);
                self.counters
                    .rows_persisted
                    .fetch_add(inserted as u64, Ordering::Relaxed);
                *self.counters.last_success_at.lock() = Some(Utc::now());
                self.counters.latency.lock().record(latency);

                MetricEvent::insert_success(latency).emit();
                tracing::info!(
                    "📥 Persisted {} ticks to database in {:.2}ms",
                    inserted,
                    latency.as_secs_f64() * 1000.0
                );

                FlushOutcome::Persisted {
                    rows: inserted,
                    latency,
                }
            }
            Ok(Err(e)) => {
                tracing::error!("❌ Failed to persist ticks to database: {}", e);
                self.record_failure(tick_count)
            }
            Err(e) => {
                tracing::error!("❌ Failed to spawn blocking task: {}", e);
                self.record_failure(tick_count)
            }
        }
    }

    fn record_failure(&self, tick_count: usize) -> FlushOutcome {
        self.counters.failures.fetch_add(1, Ordering::Relaxed);
        self.counters
            .rows_lost
            .fetch_add(tick_count as u64, Ordering::Relaxed);

        MetricEvent::insert_failure().emit();
        tracing::error!("   {} ticks lost", tick_count);

        FlushOutcome::Failed { rows: tick_count }
    }
}
