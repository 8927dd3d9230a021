/// Pub/sub tick sources
///
/// The listener only depends on the [`TickSource`] trait; the Redis
/// implementation is what the service runs against, and
/// [`crate::testing::InMemoryTickSource`] stands in for it in tests.

pub mod redis_source;

pub use redis_source::RedisTickSource;

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::ingest::errors::TransportError;
use crate::models::RawMessage;

/// Live subscription; the stream ends when the connection is lost
pub type MessageStream = Pin<Box<dyn Stream<Item = RawMessage> + Send>>;

#[async_trait]
pub trait TickSource: Send + Sync {
    /// Round-trip to the transport without subscribing
    async fn ping(&self) -> Result<(), TransportError>;

    /// Open a fresh subscription to `channels`
    ///
    /// Messages published while no subscription is open are never replayed.
    async fn subscribe(&self, channels: &[String]) -> Result<MessageStream, TransportError>;

    /// Human-readable endpoint for logs
    fn endpoint(&self) -> String;
}
