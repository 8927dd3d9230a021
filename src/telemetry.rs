use tracing::{Level, Subscriber};
use tracing_subscriber::filter::{filter_fn, EnvFilter, FilterExt, Targets};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer};

use crate::metrics::EVENT_TARGET;

/// Install the global tracing subscriber
///
/// `RUST_LOG` (default `tick_ingest=info`) only controls the regular logs.
/// Structured events always go to stdout.
pub fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "tick_ingest=info".into());

    build_subscriber(env_filter, std::io::stdout).init();
}

/// Subscriber with two `fmt` layers:
/// - regular logs for every target except the structured event target,
///   filtered by `env_filter`
/// - structured events at `INFO`, printed bare to `events` so each line is
///   exactly one JSON object
pub fn build_subscriber<W>(env_filter: EnvFilter, events: W) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let app_layer = fmt::layer()
        .with_filter(filter_fn(|meta| meta.target() != EVENT_TARGET).and(env_filter));

    let event_layer = fmt::layer()
        .without_time()
        .with_level(false)
        .with_target(false)
        .with_ansi(false)
        .with_writer(events)
        .with_filter(Targets::new().with_target(EVENT_TARGET, Level::INFO));

    tracing_subscriber::registry().with(app_layer).with(event_layer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricEvent;
    use crate::testing::LogCapture;

    #[test]
    fn test_events_survive_restrictive_log_filter() {
        let subscriber = build_subscriber(EnvFilter::new("warn"), std::io::sink);

        tracing::subscriber::with_default(subscriber, || {
            assert!(tracing::enabled!(target: EVENT_TARGET, Level::INFO));
            assert!(!tracing::enabled!(target: "tick_ingest::jobs", Level::INFO));
        });
    }

    #[test]
    fn test_events_written_bare_with_logs_off() {
        let capture = LogCapture::new();
        let subscriber = build_subscriber(EnvFilter::new("off"), capture.clone());

        tracing::subscriber::with_default(subscriber, || {
            tracing::error!("regular log line");
            MetricEvent::insert_failure().emit();
        });

        let lines = capture.lines();
        assert_eq!(lines.len(), 1);

        let event: serde_json::Value = serde_json::from_str(lines[0].trim()).unwrap();
        assert_eq!(event["event"], "insert_failure");
        assert_eq!(event["service"], "tick-ingest");
    }
}
