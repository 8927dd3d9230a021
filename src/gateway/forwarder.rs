use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use utoipa::ToSchema;

use super::RealtimeGateway;
use crate::models::{Tick, TickEvent};

/// Statistics for the gateway forwarder
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ForwarderStats {
    pub forwarded: u64,
    pub failed: u64,
    /// Events discarded because the worker queue was full
    pub dropped: u64,
    pub queued: usize,
}

#[derive(Default)]
struct Counters {
    forwarded: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

/// Hands parsed ticks to a single background worker that publishes them
///
/// `forward` never waits: when the bounded queue is full the event is dropped
/// and counted. One worker drains the queue, so events reach the gateway in
/// the order they were forwarded.
#[derive(Clone)]
pub struct TickForwarder {
    tx: mpsc::Sender<(String, TickEvent)>,
    counters: Arc<Counters>,
}

impl TickForwarder {
    /// Start the worker task and return the handle used by the listener
    pub fn spawn(gateway: Arc<dyn RealtimeGateway>, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let counters = Arc::new(Counters::default());

        tokio::spawn(Self::run(gateway, rx, Arc::clone(&counters)));

        Self { tx, counters }
    }

    async fn run(
        gateway: Arc<dyn RealtimeGateway>,
        mut rx: mpsc::Receiver<(String, TickEvent)>,
        counters: Arc<Counters>,
    ) {
        tracing::info!("🌉 Gateway forwarder started");

        while let Some((channel, event)) = rx.recv().await {
            match gateway.publish(&channel, &event).await {
                Ok(()) => {
                    counters.forwarded.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                    tracing::error!(
                        "Failed to forward tick: channel={}, stock={}, error={}",
                        channel,
                        event.stock,
                        e
                    );
                }
            }
        }

        tracing::info!("🔴 Gateway forwarder stopped");
    }

    /// Queue one tick for publishing on its originating channel
    pub fn forward(&self, tick: &Tick) {
        match self.tx.try_send((tick.exchange.clone(), tick.to_event())) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                let dropped = self.counters.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                if dropped.is_power_of_two() {
                    tracing::warn!("Forwarder queue full, {} events dropped so far", dropped);
                }
            }
            Err(TrySendError::Closed(_)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::error!("Forwarder worker is gone, dropping {}", tick.symbol);
            }
        }
    }

    pub fn stats(&self) -> ForwarderStats {
        ForwarderStats {
            forwarded: self.counters.forwarded.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            queued: self.tx.max_capacity() - self.tx.capacity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::ForwardError;
    use crate::testing::{wait_until, RecordingGateway};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[tokio::test]
    async fn test_forward_publishes_on_origin_channel() {
        let gateway = Arc::new(RecordingGateway::new());
        let forwarder = TickForwarder::spawn(gateway.clone(), 16);

        forwarder.forward(&Tick::new("AAPL", "NASDAQ", 220.40, 1757494917.02));
        forwarder.forward(&Tick::new("IBM", "NYSE", 190.0, 1757494918.0));

        assert!(wait_until(Duration::from_secs(2), || forwarder.stats().forwarded == 2).await);

        let published = gateway.published();
        assert_eq!(published[0].0, "NASDAQ");
        assert_eq!(
            published[0].1,
            TickEvent {
                stock: "AAPL".to_string(),
                price: 220.40,
                timestamp: 1757494917.02,
            }
        );
        assert_eq!(published[1].0, "NYSE");
        assert_eq!(published[1].1.stock, "IBM");
    }

    #[tokio::test]
    async fn test_gateway_failures_are_counted_not_retried() {
        let gateway = Arc::new(RecordingGateway::new());
        gateway.set_failing(true);
        let forwarder = TickForwarder::spawn(gateway.clone(), 16);

        for i in 0..3 {
            forwarder.forward(&Tick::new("MSFT", "NASDAQ", i as f64, 1.0));
        }

        assert!(wait_until(Duration::from_secs(2), || forwarder.stats().failed == 3).await);
        assert_eq!(gateway.attempts(), 3);
        assert_eq!(forwarder.stats().forwarded, 0);
    }

    struct StalledGateway {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RealtimeGateway for StalledGateway {
        async fn publish(&self, _channel: &str, _event: &TickEvent) -> Result<(), ForwardError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_full_queue_drops_without_blocking() {
        let gateway = Arc::new(StalledGateway {
            calls: AtomicUsize::new(0),
        });
        let forwarder = TickForwarder::spawn(gateway.clone(), 1);

        // First event occupies the worker
        forwarder.forward(&Tick::new("A", "NYSE", 1.0, 1.0));
        assert!(
            wait_until(Duration::from_secs(2), || gateway.calls.load(Ordering::SeqCst) == 1)
                .await
        );

        forwarder.forward(&Tick::new("B", "NYSE", 2.0, 2.0));
        forwarder.forward(&Tick::new("C", "NYSE", 3.0, 3.0));
        forwarder.forward(&Tick::new("D", "NYSE", 4.0, 4.0));

        let stats = forwarder.stats();
        assert_eq!(stats.queued, 1);
        assert_eq!(stats.dropped, 2);
    }
}
