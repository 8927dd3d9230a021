use serde::{Deserialize, Serialize};

use super::errors::ParseError;
use crate::models::{RawMessage, Tick};

/// Structured tick payload: `{"symbol": "AAPL", "price": 220.4, "timestamp": 1757494917.02}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickPayload {
    pub symbol: String,
    pub price: f64,
    pub timestamp: f64,
}

/// Encode a tick in the structured JSON form accepted by [`TickParser`]
pub fn encode_payload(symbol: &str, price: f64, timestamp: f64) -> String {
    serde_json::json!({
        "symbol": symbol,
        "price": price,
        "timestamp": timestamp,
    })
    .to_string()
}

/// Decoder for price-update payloads
///
/// Accepts two encodings carrying the same three fields:
/// - text: `SYMBOL:(PRICE, TIMESTAMP)`, e.g. `AAPL:(220.40, 1757494917.02)`
/// - JSON: see [`TickPayload`]
///
/// The exchange of the resulting tick is the channel the payload arrived on.
#[derive(Debug, Default, Clone, Copy)]
pub struct TickParser;

impl TickParser {
    pub fn new() -> Self {
        Self
    }

    /// Decode one transport message
    pub fn parse_message(&self, message: &RawMessage) -> Result<Tick, ParseError> {
        let text = std::str::from_utf8(&message.payload).map_err(|_| ParseError::InvalidUtf8)?;
        self.parse(&message.channel, text)
    }

    /// Decode a payload string received on `channel`
    pub fn parse(&self, channel: &str, payload: &str) -> Result<Tick, ParseError> {
        let payload = payload.trim();

        if payload.starts_with('{') {
            Self::parse_structured(channel, payload)
        } else {
            Self::parse_text(channel, payload)
        }
    }

    fn parse_structured(channel: &str, payload: &str) -> Result<Tick, ParseError> {
        let decoded: TickPayload = serde_json::from_str(payload)?;
        let symbol = decoded.symbol.trim();

        if symbol.is_empty() {
            return Err(ParseError::EmptySymbol(payload.to_string()));
        }

        Ok(Tick::new(symbol, channel, decoded.price, decoded.timestamp))
    }

    fn parse_text(channel: &str, payload: &str) -> Result<Tick, ParseError> {
        // Symbol ends at the first colon
        let (symbol, pair) = payload
            .split_once(':')
            .ok_or_else(|| ParseError::MissingSeparator(payload.to_string()))?;

        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(ParseError::EmptySymbol(payload.to_string()));
        }

        let pair = pair.trim();
        let inner = pair
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| ParseError::MalformedPair(pair.to_string()))?;

        let (price, timestamp) = inner
            .split_once(',')
            .ok_or_else(|| ParseError::MalformedPair(pair.to_string()))?;

        if timestamp.contains(',') {
            return Err(ParseError::MalformedPair(pair.to_string()));
        }

        let price = parse_number("price", price)?;
        let timestamp = parse_number("timestamp", timestamp)?;

        Ok(Tick::new(symbol, channel, price, timestamp))
    }
}

fn parse_number(field: &'static str, raw: &str) -> Result<f64, ParseError> {
    let raw = raw.trim();
    raw.parse::<f64>().map_err(|_| ParseError::InvalidNumber {
        field,
        value: raw.to_string(),
    })
}
