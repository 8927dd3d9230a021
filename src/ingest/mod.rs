/// Tick ingestion: decode, buffer and listen
///
/// - `parser`: payload decoding into ticks
/// - `accumulator`: the shared buffer between listener and flush job
/// - `listener`: subscription loop with fixed-delay reconnect
/// - `readiness`: startup probe against the tick source

pub mod accumulator;
pub mod errors;
pub mod listener;
pub mod parser;
pub mod readiness;

pub use accumulator::{AccumulatorStats, TickAccumulator};
pub use errors::{ParseError, ReadinessError, TransportError};
pub use listener::{ChannelListener, ListenerHandle, ListenerState, ListenerStats};
pub use parser::{encode_payload, TickParser, TickPayload};
pub use readiness::wait_until_ready;
