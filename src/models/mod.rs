pub mod tick;

pub use tick::{unix_seconds_to_datetime, BatchRecord, RawMessage, Tick, TickEvent};
