use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use utoipa::ToSchema;

use crate::models::BatchRecord;

/// Statistics for the batch accumulator
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccumulatorStats {
    pub current_size: usize,
    pub total_appended: u64,
    pub total_drained: u64,
    /// Drains that returned at least one record
    pub batches_drained: u64,
}

/// Ordered in-memory buffer of records waiting for the next flush
///
/// Shared by the listener (which appends) and the flush scheduler (which
/// drains). The lock only ever covers an in-memory push or swap, never I/O.
///
/// Contents are volatile: anything still buffered when the process dies is
/// lost.
pub struct TickAccumulator {
    buffer: Mutex<Vec<BatchRecord>>,
    total_appended: AtomicU64,
    total_drained: AtomicU64,
    batches_drained: AtomicU64,
}

impl TickAccumulator {
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Mutex::new(Vec::with_capacity(capacity)),
            total_appended: AtomicU64::new(0),
            total_drained: AtomicU64::new(0),
            batches_drained: AtomicU64::new(0),
        }
    }

    /// Append a record to the tail of the buffer, preserving arrival order
    pub fn append(&self, record: BatchRecord) {
        let mut buffer = self.buffer.lock();
        buffer.push(record);
        self.total_appended.fetch_add(1, Ordering::Relaxed);
    }

    /// Take every buffered record, leaving the buffer empty
    ///
    /// This is the only operation that removes records. A record is returned
    /// by exactly one drain, and anything appended before the lock is taken
    /// here is part of the result. An empty result means nothing to flush.
    pub fn drain(&self) -> Vec<BatchRecord> {
        let records = {
            let mut buffer = self.buffer.lock();
            let records = std::mem::take(&mut *buffer);
            if !records.is_empty() {
                self.total_drained
                    .fetch_add(records.len() as u64, Ordering::Relaxed);
                self.batches_drained.fetch_add(1, Ordering::Relaxed);
            }
            records
        };

        if !records.is_empty() {
            tracing::debug!("Drained {} records from accumulator", records.len());
        }

        records
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.lock().is_empty()
    }

    /// Snapshot taken under the buffer lock, so
    /// `current_size == total_appended - total_drained` always holds
    pub fn stats(&self) -> AccumulatorStats {
        let buffer = self.buffer.lock();
        AccumulatorStats {
            current_size: buffer.len(),
            total_appended: self.total_appended.load(Ordering::Relaxed),
            total_drained: self.total_drained.load(Ordering::Relaxed),
            batches_drained: self.batches_drained.load(Ordering::Relaxed),
        }
    }
}

impl Default for TickAccumulator {
    fn default() -> Self {
        Self::new()
    }
}
