/// In-memory stand-ins for the external services
///
/// Used by the pipeline and API tests, and handy for running the ingestion
/// path locally without Redis, PostgreSQL or Centrifugo.

pub mod capture;
pub mod doubles;
pub mod source;

pub use capture::LogCapture;
pub use doubles::{RecordingGateway, RecordingRepository};
pub use source::InMemoryTickSource;

use std::time::Duration;

/// Poll `condition` until it holds or `timeout` elapses
pub async fn wait_until<F>(timeout: Duration, condition: F) -> bool
where
    F: Fn() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
