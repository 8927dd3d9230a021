use hdrhistogram::{CreationError, Histogram};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use utoipa::ToSchema;

/// Longest flush the histogram tracks exactly; slower ones saturate
const MAX_TRACKED_MICROS: u64 = 60_000_000;

/// Flush latency tracker using HDR Histogram
///
/// Samples are recorded in microseconds, from 1µs up to one minute, with 3
/// significant figures.
pub struct FlushLatencyTracker {
    latency_us: Histogram<u64>,
}

impl FlushLatencyTracker {
    pub fn new() -> Result<Self, CreationError> {
        Ok(Self {
            latency_us: Histogram::new_with_bounds(1, MAX_TRACKED_MICROS, 3)?,
        })
    }

    #[inline]
    pub fn record(&mut self, elapsed: Duration) {
        let micros = (elapsed.as_micros() as u64).max(1);
        self.latency_us.saturating_record(micros);
    }

    pub fn stats(&self) -> LatencyStats {
        LatencyStats {
            metric_name: "db_insert".to_string(),
            p50_ms: to_ms(self.latency_us.value_at_percentile(50.0)),
            p95_ms: to_ms(self.latency_us.value_at_percentile(95.0)),
            p99_ms: to_ms(self.latency_us.value_at_percentile(99.0)),
            max_ms: to_ms(self.latency_us.max()),
            min_ms: to_ms(self.latency_us.min()),
            mean_ms: self.latency_us.mean() / 1000.0,
            sample_count: self.latency_us.len(),
        }
    }
}

fn to_ms(micros: u64) -> f64 {
    micros as f64 / 1000.0
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LatencyStats {
    pub metric_name: String,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub max_ms: f64,
    pub min_ms: f64,
    pub mean_ms: f64,
    pub sample_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_tracker() {
        let tracker = FlushLatencyTracker::new().unwrap();
        let stats = tracker.stats();

        assert_eq!(stats.sample_count, 0);
        assert_eq!(stats.p50_ms, 0.0);
    }

    #[test]
    fn test_record_flushes() {
        let mut tracker = FlushLatencyTracker::new().unwrap();

        for ms in [2, 4, 6, 8, 10] {
            tracker.record(Duration::from_millis(ms));
        }

        let stats = tracker.stats();
        assert_eq!(stats.sample_count, 5);
        assert!((stats.p50_ms - 6.0).abs() < 0.01);
        assert!((stats.max_ms - 10.0).abs() < 0.01);
        assert!((stats.min_ms - 2.0).abs() < 0.01);
    }

    #[test]
    fn test_sub_microsecond_and_huge_samples_are_kept() {
        let mut tracker = FlushLatencyTracker::new().unwrap();

        tracker.record(Duration::from_nanos(10));
        tracker.record(Duration::from_secs(3600));

        let stats = tracker.stats();
        assert_eq!(stats.sample_count, 2);
        assert!(stats.max_ms >= 59_000.0);
    }
}
