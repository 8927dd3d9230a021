use std::time::Duration;

use super::errors::{ReadinessError, TransportError};
use crate::source::TickSource;

/// Ping the tick source until it answers or the attempt budget runs out
///
/// Returns the attempt number that succeeded. Attempts are spaced by a fixed
/// `delay`; there is no backoff.
pub async fn wait_until_ready(
    source: &dyn TickSource,
    attempts: u32,
    delay: Duration,
) -> Result<u32, ReadinessError> {
    let attempts = attempts.max(1);
    let endpoint = source.endpoint();
    let mut last_error = TransportError::Unavailable;

    for attempt in 1..=attempts {
        match source.ping().await {
            Ok(()) => {
                tracing::info!("✅ Tick source {} ready (attempt {}/{})", endpoint, attempt, attempts);
                return Ok(attempt);
            }
            Err(e) => {
                tracing::warn!(
                    "Tick source {} not ready (attempt {}/{}): {}",
                    endpoint,
                    attempt,
                    attempts,
                    e
                );
                last_error = e;
            }
        }

        if attempt < attempts {
            tokio::time::sleep(delay).await;
        }
    }

    Err(ReadinessError {
        attempts,
        delay,
        last_error,
    })
}
