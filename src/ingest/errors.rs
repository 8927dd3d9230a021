use std::time::Duration;
use thiserror::Error;

/// Payload could not be decoded into a tick
///
/// Always handled at the message boundary: the offending message is logged
/// and dropped, the subscription carries on.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("payload is not valid UTF-8")]
    InvalidUtf8,

    #[error("missing ':' between symbol and price pair in {0:?}")]
    MissingSeparator(String),

    #[error("empty symbol in {0:?}")]
    EmptySymbol(String),

    #[error("malformed (price, timestamp) pair: {0:?}")]
    MalformedPair(String),

    #[error("invalid {field} value {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("invalid structured payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Pub/sub transport failures while connecting or listening
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("subscribe failed: {0}")]
    Subscribe(String),

    #[error("ping failed: {0}")]
    Ping(String),

    #[error("tick source unavailable")]
    Unavailable,
}

impl From<redis::RedisError> for TransportError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal() || err.is_io_error() || err.is_timeout() {
            TransportError::Connection(err.to_string())
        } else {
            TransportError::Subscribe(err.to_string())
        }
    }
}

/// Startup probe gave up on the tick source
#[derive(Debug, Error)]
#[error("tick source not ready after {attempts} attempts ({delay:?} apart): {last_error}")]
pub struct ReadinessError {
    pub attempts: u32,
    pub delay: Duration,
    #[source]
    pub last_error: TransportError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_messages() {
        let err = ParseError::InvalidNumber {
            field: "price",
            value: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "invalid price value \"abc\"");

        let err = ParseError::MissingSeparator("AAPL(1, 2)".to_string());
        assert!(err.to_string().contains("missing ':'"));
    }

    #[test]
    fn test_readiness_error_message() {
        let err = ReadinessError {
            attempts: 5,
            delay: Duration::from_secs(2),
            last_error: TransportError::Unavailable,
        };
        assert_eq!(
            err.to_string(),
            "tick source not ready after 5 attempts (2s apart): tick source unavailable"
        );
    }
}
