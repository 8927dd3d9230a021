use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::database::connection::DatabaseError;
use crate::database::models::{NewStockPrice, PricePoint};
use crate::database::repositories::{PriceRepository, TimeRange};
use crate::gateway::{ForwardError, RealtimeGateway};
use crate::models::TickEvent;

/// Price repository that keeps rows in memory
///
/// Failures can be injected per insert call; a failed call stores nothing.
#[derive(Default)]
pub struct RecordingRepository {
    rows: Mutex<Vec<NewStockPrice>>,
    insert_calls: AtomicUsize,
    failing_inserts: AtomicUsize,
}

impl RecordingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<NewStockPrice>) -> Self {
        Self {
            rows: Mutex::new(rows),
            ..Self::default()
        }
    }

    /// Make the next `count` insert calls fail
    pub fn fail_next_inserts(&self, count: usize) {
        self.failing_inserts.store(count, Ordering::SeqCst);
    }

    pub fn rows(&self) -> Vec<NewStockPrice> {
        self.rows.lock().clone()
    }

    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    fn matching(&self, stock_name: &str, range: TimeRange) -> Vec<PricePoint> {
        let mut points: Vec<PricePoint> = self
            .rows
            .lock()
            .iter()
            .filter(|row| row.stock_name == stock_name && range.contains(row.price_time))
            .map(|row| PricePoint {
                timestamp: row.price_time,
                price: row.price,
            })
            .collect();
        points.sort_by_key(|p| p.timestamp);
        points
    }
}

impl PriceRepository for RecordingRepository {
    fn insert_batch(&self, rows: &[NewStockPrice]) -> Result<usize, DatabaseError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);

        let injected = self
            .failing_inserts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(DatabaseError::ConnectionFailed("injected failure".to_string()));
        }

        self.rows.lock().extend_from_slice(rows);
        Ok(rows.len())
    }

    fn get_prices(&self, stock_name: &str, range: TimeRange) -> Result<Vec<PricePoint>, DatabaseError> {
        Ok(self.matching(stock_name, range))
    }

    fn get_average(&self, stock_name: &str, range: TimeRange) -> Result<Option<f64>, DatabaseError> {
        let points = self.matching(stock_name, range);
        if points.is_empty() {
            return Ok(None);
        }
        Ok(Some(points.iter().map(|p| p.price).sum::<f64>() / points.len() as f64))
    }
}

/// Gateway that records every publish call
#[derive(Default)]
pub struct RecordingGateway {
    published: Mutex<Vec<(String, TickEvent)>>,
    attempts: AtomicUsize,
    failing: AtomicBool,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// While failing, publishes are rejected and not recorded
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Successful publishes as `(channel, event)` in arrival order
    pub fn published(&self) -> Vec<(String, TickEvent)> {
        self.published.lock().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RealtimeGateway for RecordingGateway {
    async fn publish(&self, channel: &str, event: &TickEvent) -> Result<(), ForwardError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if self.failing.load(Ordering::SeqCst) {
            return Err(ForwardError::Status {
                status: 503,
                body: "unavailable".to_string(),
            });
        }

        self.published
            .lock()
            .push((channel.to_string(), event.clone()));
        Ok(())
    }
}
