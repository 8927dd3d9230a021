use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::ingest::errors::TransportError;
use crate::models::RawMessage;
use crate::source::{MessageStream, TickSource};

struct Subscriber {
    channels: Vec<String>,
    tx: mpsc::UnboundedSender<RawMessage>,
}

struct SourceState {
    available: bool,
    failing_pings: u32,
    ping_calls: u32,
    subscribe_calls: u32,
    subscribers: Vec<Subscriber>,
}

/// In-process pub/sub broker with outage simulation
///
/// Like a real broker it has no memory: a message published while nobody is
/// subscribed to its channel is gone.
pub struct InMemoryTickSource {
    state: Mutex<SourceState>,
}

impl InMemoryTickSource {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SourceState {
                available: true,
                failing_pings: 0,
                ping_calls: 0,
                subscribe_calls: 0,
                subscribers: Vec::new(),
            }),
        }
    }

    /// Deliver a message to every live subscription on `channel`
    ///
    /// Returns the number of subscriptions that received it.
    pub fn publish(&self, channel: &str, payload: impl Into<Vec<u8>>) -> usize {
        let message = RawMessage::new(channel, payload);
        let mut state = self.state.lock();

        state.subscribers.retain(|s| !s.tx.is_closed());
        state
            .subscribers
            .iter()
            .filter(|s| s.channels.iter().any(|c| c == channel))
            .filter(|s| s.tx.send(message.clone()).is_ok())
            .count()
    }

    /// Drop every open subscription; their streams end
    pub fn disconnect_all(&self) {
        self.state.lock().subscribers.clear();
    }

    /// While unavailable, pings and subscribes fail
    pub fn set_available(&self, available: bool) {
        self.state.lock().available = available;
    }

    /// Make the next `count` pings fail even while available
    pub fn fail_next_pings(&self, count: u32) {
        self.state.lock().failing_pings = count;
    }

    pub fn subscriber_count(&self) -> usize {
        let mut state = self.state.lock();
        state.subscribers.retain(|s| !s.tx.is_closed());
        state.subscribers.len()
    }

    pub fn ping_calls(&self) -> u32 {
        self.state.lock().ping_calls
    }

    pub fn subscribe_calls(&self) -> u32 {
        self.state.lock().subscribe_calls
    }
}

impl Default for InMemoryTickSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TickSource for InMemoryTickSource {
    async fn ping(&self) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        state.ping_calls += 1;

        if !state.available {
            return Err(TransportError::Unavailable);
        }
        if state.failing_pings > 0 {
            state.failing_pings -= 1;
            return Err(TransportError::Ping("connection reset".to_string()));
        }

        Ok(())
    }

    async fn subscribe(&self, channels: &[String]) -> Result<MessageStream, TransportError> {
        // A real subscribe is a round trip; let other tasks run meanwhile
        tokio::task::yield_now().await;

        let mut state = self.state.lock();
        state.subscribe_calls += 1;

        if !state.available {
            return Err(TransportError::Connection("connection refused".to_string()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        state.subscribers.push(Subscriber {
            channels: channels.to_vec(),
            tx,
        });

        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }

    fn endpoint(&self) -> String {
        "memory://ticks".to_string()
    }
}
