/// Realtime gateway integration
///
/// Every parsed tick is pushed to the gateway as an individual event on the
/// channel it arrived on. Delivery is best-effort: failures are counted and
/// logged, never retried.

pub mod centrifugo;
pub mod forwarder;

pub use centrifugo::CentrifugoGateway;
pub use forwarder::{ForwarderStats, TickForwarder};

use async_trait::async_trait;
use thiserror::Error;

use crate::models::TickEvent;

/// Error types for gateway publish calls
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("HTTP client setup failed: {0}")]
    ClientSetup(String),

    #[error("gateway unreachable: {0}")]
    Network(String),

    #[error("gateway returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("gateway rejected publish (code {code}): {message}")]
    Rejected { code: i64, message: String },
}

#[async_trait]
pub trait RealtimeGateway: Send + Sync {
    /// Publish one event to subscribers of `channel`
    async fn publish(&self, channel: &str, event: &TickEvent) -> Result<(), ForwardError>;
}
