pub mod event_log;
pub mod latency;

pub use event_log::{EventKind, MetricEvent, EVENT_TARGET, SERVICE_NAME};
pub use latency::{FlushLatencyTracker, LatencyStats};
