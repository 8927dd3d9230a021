use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use utoipa::ToSchema;

use super::accumulator::TickAccumulator;
use super::parser::TickParser;
use crate::gateway::TickForwarder;
use crate::models::{BatchRecord, RawMessage};
use crate::source::TickSource;

/// Connection state of the channel listener
///
/// `Disconnected -> Connecting -> Subscribed`, and back to `Disconnected` on
/// any failure. There is no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ListenerState {
    Disconnected,
    Connecting,
    Subscribed,
}

/// Statistics for the channel listener
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListenerStats {
    pub state: ListenerState,
    pub messages_received: u64,
    pub ticks_accepted: u64,
    pub parse_failures: u64,
    /// Times the subscription was lost or could not be opened
    pub reconnects: u64,
}

#[derive(Default)]
struct Counters {
    messages_received: AtomicU64,
    ticks_accepted: AtomicU64,
    parse_failures: AtomicU64,
    reconnects: AtomicU64,
}

/// Read-only view of a running listener
#[derive(Clone)]
pub struct ListenerHandle {
    state_rx: watch::Receiver<ListenerState>,
    counters: Arc<Counters>,
}

impl ListenerHandle {
    pub fn state(&self) -> ListenerState {
        *self.state_rx.borrow()
    }

    /// Receiver notified on every state transition
    pub fn watch_state(&self) -> watch::Receiver<ListenerState> {
        self.state_rx.clone()
    }

    pub fn stats(&self) -> ListenerStats {
        ListenerStats {
            state: self.state(),
            messages_received: self.counters.messages_received.load(Ordering::Relaxed),
            ticks_accepted: self.counters.ticks_accepted.load(Ordering::Relaxed),
            parse_failures: self.counters.parse_failures.load(Ordering::Relaxed),
            reconnects: self.counters.reconnects.load(Ordering::Relaxed),
        }
    }
}

/// Keeps a subscription open and feeds every decoded tick downstream
///
/// Each tick is appended to the accumulator and handed to the forwarder.
/// A malformed message is logged and dropped without touching either.
pub struct ChannelListener {
    source: Arc<dyn TickSource>,
    channels: Vec<String>,
    parser: TickParser,
    accumulator: Arc<TickAccumulator>,
    forwarder: TickForwarder,
    reconnect_delay: Duration,
    state_tx: watch::Sender<ListenerState>,
    counters: Arc<Counters>,
}

impl ChannelListener {
    pub fn new(
        source: Arc<dyn TickSource>,
        channels: Vec<String>,
        accumulator: Arc<TickAccumulator>,
        forwarder: TickForwarder,
        reconnect_delay: Duration,
    ) -> Self {
        let (state_tx, _) = watch::channel(ListenerState::Disconnected);

        Self {
            source,
            channels,
            parser: TickParser::new(),
            accumulator,
            forwarder,
            reconnect_delay,
            state_tx,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn handle(&self) -> ListenerHandle {
        ListenerHandle {
            state_rx: self.state_tx.subscribe(),
            counters: Arc::clone(&self.counters),
        }
    }

    /// Run the listener on its own task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Subscribe, consume, and reconnect after a fixed delay, forever
    pub async fn run(self) {
        let endpoint = self.source.endpoint();

        loop {
            self.set_state(ListenerState::Connecting);

            match self.source.subscribe(&self.channels).await {
                Ok(mut stream) => {
                    self.set_state(ListenerState::Subscribed);
                    tracing::info!("📡 Subscribed to {:?} on {}", self.channels, endpoint);

                    while let Some(message) = stream.next().await {
                        self.handle_message(&message);
                    }

                    tracing::warn!("Subscription to {} ended", endpoint);
                }
                Err(e) => {
                    tracing::error!("Failed to subscribe to {}: {}", endpoint, e);
                }
            }

            self.set_state(ListenerState::Disconnected);
            self.counters.reconnects.fetch_add(1, Ordering::Relaxed);

            tracing::warn!("Reconnecting to {} in {:?}", endpoint, self.reconnect_delay);
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    /// Decode one message and fan the tick out to the accumulator and forwarder
    pub fn handle_message(&self, message: &RawMessage) {
        self.counters.messages_received.fetch_add(1, Ordering::Relaxed);

        match self.parser.parse_message(message) {
            Ok(tick) => {
                self.accumulator.append(BatchRecord::from(&tick));
                self.forwarder.forward(&tick);
                self.counters.ticks_accepted.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.counters.parse_failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    "Discarding malformed message on {}: {} (payload: {:?})",
                    message.channel,
                    e,
                    String::from_utf8_lossy(&message.payload)
                );
            }
        }
    }

    fn set_state(&self, state: ListenerState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            tracing::debug!("Listener state {:?} -> {:?}", previous, state);
        }
    }
}
