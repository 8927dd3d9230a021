/// Background jobs
///
/// Contains jobs that run on a fixed interval:
/// - Flushing buffered ticks to the price table

pub mod flush_job;

pub use flush_job::{FlushHandle, FlushOutcome, FlushScheduler, FlushStats};
