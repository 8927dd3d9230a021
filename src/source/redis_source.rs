use async_trait::async_trait;
use futures::StreamExt;

use super::{MessageStream, TickSource};
use crate::config::RedisConfig;
use crate::ingest::errors::TransportError;
use crate::models::RawMessage;

/// Redis pub/sub tick source
///
/// Each call to `subscribe` opens a dedicated pub/sub connection, so a
/// reconnect never reuses a half-broken socket.
pub struct RedisTickSource {
    client: redis::Client,
    endpoint: String,
}

impl RedisTickSource {
    pub fn new(config: &RedisConfig) -> Result<Self, TransportError> {
        let client = redis::Client::open(config.url())
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!("{}:{}", config.host, config.port),
        })
    }
}

#[async_trait]
impl TickSource for RedisTickSource {
    async fn ping(&self) -> Result<(), TransportError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| TransportError::Ping(e.to_string()))?;

        let _pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| TransportError::Ping(e.to_string()))?;

        Ok(())
    }

    async fn subscribe(&self, channels: &[String]) -> Result<MessageStream, TransportError> {
        let mut pubsub = self.client.get_async_pubsub().await?;

        for channel in channels {
            pubsub.subscribe(channel.as_str()).await?;
        }

        let stream = pubsub.into_on_message().map(|msg| {
            RawMessage::new(msg.get_channel_name(), msg.get_payload_bytes())
        });

        Ok(Box::pin(stream))
    }

    fn endpoint(&self) -> String {
        format!("redis://{}", self.endpoint)
    }
}
