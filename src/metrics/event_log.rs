use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tracing target carrying structured events
///
/// The subscriber renders this target without any decoration, so each event
/// becomes exactly one JSON line on the output.
pub const EVENT_TARGET: &str = "tick_ingest::events";

/// Value of the `service` field on every structured event
pub const SERVICE_NAME: &str = "tick-ingest";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    InsertSuccess,
    InsertFailure,
    SourceUnavailable,
}

/// One machine-readable log line
///
/// ```json
/// {"timestamp":"2025-09-10T09:01:57.020Z","metric":"db_insert_latency","value":12.5,
///  "unit":"ms","event":"insert_success","service":"tick-ingest"}
/// ```
///
/// Failure events carry an empty `metric`, a zero `value` and an empty `unit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricEvent {
    pub timestamp: DateTime<Utc>,
    pub metric: String,
    pub value: f64,
    pub unit: String,
    pub event: EventKind,
    pub service: String,
}

impl MetricEvent {
    fn new(event: EventKind, metric: &str, value: f64, unit: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            metric: metric.to_string(),
            value,
            unit: unit.to_string(),
            event,
            service: SERVICE_NAME.to_string(),
        }
    }

    /// Batch committed; `latency` is the wall-clock time of the insert
    pub fn insert_success(latency: Duration) -> Self {
        Self::new(
            EventKind::InsertSuccess,
            "db_insert_latency",
            latency.as_micros() as f64 / 1000.0,
            "ms",
        )
    }

    pub fn insert_failure() -> Self {
        Self::new(EventKind::InsertFailure, "", 0.0, "")
    }

    /// Readiness probe exhausted; the process is about to exit
    pub fn source_unavailable() -> Self {
        Self::new(EventKind::SourceUnavailable, "", 0.0, "")
    }

    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Write the event to the structured event target
    pub fn emit(&self) {
        match self.to_json_line() {
            Ok(line) => tracing::info!(target: EVENT_TARGET, "{}", line),
            Err(e) => tracing::error!("Failed to encode {:?} event: {}", self.event, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn fields(event: &MetricEvent) -> serde_json::Map<String, Value> {
        let line = event.to_json_line().unwrap();
        match serde_json::from_str::<Value>(&line).unwrap() {
            Value::Object(map) => map,
            other => panic!("expected a JSON object, got {}", other),
        }
    }

    #[test]
    fn test_success_event_fields() {
        let event = MetricEvent::insert_success(Duration::from_micros(12_500));
        let map = fields(&event);

        let mut keys: Vec<_> = map.keys().cloned().collect();
        keys.sort();
        assert_eq!(
            keys,
            vec!["event", "metric", "service", "timestamp", "unit", "value"]
        );

        assert_eq!(map["metric"], "db_insert_latency");
        assert_eq!(map["value"], 12.5);
        assert_eq!(map["unit"], "ms");
        assert_eq!(map["event"], "insert_success");
        assert_eq!(map["service"], "tick-ingest");
    }

    #[test]
    fn test_failure_events_are_empty() {
        for (event, kind) in [
            (MetricEvent::insert_failure(), "insert_failure"),
            (MetricEvent::source_unavailable(), "source_unavailable"),
        ] {
            let map = fields(&event);
            assert_eq!(map.len(), 6);
            assert_eq!(map["metric"], "");
            assert_eq!(map["value"], 0.0);
            assert_eq!(map["unit"], "");
            assert_eq!(map["event"], kind);
        }
    }

    #[test]
    fn test_timestamp_is_iso8601() {
        let event = MetricEvent::insert_failure();
        let map = fields(&event);

        let raw = map["timestamp"].as_str().unwrap();
        let parsed = DateTime::parse_from_rfc3339(raw).unwrap();
        assert_eq!(parsed.with_timezone(&Utc), event.timestamp);
    }
}
