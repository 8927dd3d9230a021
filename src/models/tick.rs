use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Message exactly as delivered by the pub/sub transport
///
/// The transport enforces no schema on the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    /// Channel the message was published on (an exchange name such as `NASDAQ`)
    pub channel: String,
    /// Undecoded payload bytes
    pub payload: Vec<u8>,
}

impl RawMessage {
    pub fn new(channel: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            channel: channel.into(),
            payload: payload.into(),
        }
    }
}

/// One structured price observation
///
/// Produced by the parser and never mutated afterwards. Price sign and
/// magnitude are not validated, and `event_time` is taken verbatim from the
/// source, so it is not guaranteed to be monotonic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Tick {
    pub symbol: String,
    /// Exchange the tick was published on (the originating channel)
    pub exchange: String,
    pub price: f64,
    /// Unix seconds with fractional part
    pub event_time: f64,
}

impl Tick {
    pub fn new(
        symbol: impl Into<String>,
        exchange: impl Into<String>,
        price: f64,
        event_time: f64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            exchange: exchange.into(),
            price,
            event_time,
        }
    }

    /// Normalized event pushed to the realtime gateway
    pub fn to_event(&self) -> TickEvent {
        TickEvent {
            stock: self.symbol.clone(),
            price: self.price,
            timestamp: self.event_time,
        }
    }
}

/// Storage-shaped record waiting in the accumulator for the next flush
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRecord {
    pub stock_name: String,
    /// Destination exchange tag
    pub exchange: String,
    pub price: f64,
    pub event_time: f64,
}

impl From<Tick> for BatchRecord {
    fn from(tick: Tick) -> Self {
        Self {
            stock_name: tick.symbol,
            exchange: tick.exchange,
            price: tick.price,
            event_time: tick.event_time,
        }
    }
}

impl From<&Tick> for BatchRecord {
    fn from(tick: &Tick) -> Self {
        Self::from(tick.clone())
    }
}

impl BatchRecord {
    /// Absolute point in time for the unix-seconds float
    ///
    /// Returns `None` for NaN, infinities and values outside chrono's range.
    pub fn event_timestamp(&self) -> Option<DateTime<Utc>> {
        unix_seconds_to_datetime(self.event_time)
    }
}

/// Payload of one gateway publish call: `{stock, price, timestamp}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TickEvent {
    pub stock: String,
    pub price: f64,
    pub timestamp: f64,
}

/// Convert fractional unix seconds to a UTC timestamp with microsecond precision
pub fn unix_seconds_to_datetime(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }

    let micros = (seconds * 1_000_000.0).round();
    if micros < i64::MIN as f64 || micros > i64::MAX as f64 {
        return None;
    }

    DateTime::<Utc>::from_timestamp_micros(micros as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_to_event() {
        let tick = Tick::new("AAPL", "NASDAQ", 220.40, 1757494917.02);
        let event = tick.to_event();

        assert_eq!(event.stock, "AAPL");
        assert_eq!(event.price, 220.40);
        assert_eq!(event.timestamp, 1757494917.02);
    }

    #[test]
    fn test_batch_record_keeps_exchange_tag() {
        let record = BatchRecord::from(Tick::new("TSLA", "NYSE", 700.1, 1.5));

        assert_eq!(record.stock_name, "TSLA");
        assert_eq!(record.exchange, "NYSE");
        assert_eq!(record.price, 700.1);
        assert_eq!(record.event_time, 1.5);
    }

    #[test]
    fn test_unix_seconds_conversion() {
        let ts = unix_seconds_to_datetime(1757494917.02).unwrap();
        assert_eq!(ts.timestamp(), 1757494917);
        assert_eq!(ts.timestamp_subsec_millis(), 20);

        assert!(unix_seconds_to_datetime(f64::NAN).is_none());
        assert!(unix_seconds_to_datetime(f64::INFINITY).is_none());
        assert!(unix_seconds_to_datetime(1e30).is_none());
    }
}
