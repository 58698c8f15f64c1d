//! Bounded history of completed exchanges
//!
//! A single mutex guards the sequence, so append, eviction and snapshot are
//! mutually exclusive and no reader ever sees a partially applied append.

use crate::proxy::exchange::ExchangeRecord;
use crate::proxy::types::HistoryCapacity;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters describing store usage
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct HistoryStats {
    pub appended: u64,
    pub evicted: u64,
}

/// Fixed-capacity, insertion-ordered store with oldest-first eviction
pub struct HistoryStore {
    // Single mutex protecting the queue - simple and correct
    records: Mutex<VecDeque<Arc<ExchangeRecord>>>,
    capacity: HistoryCapacity,
    appended: AtomicU64,
    evicted: AtomicU64,
}

impl HistoryStore {
    pub fn new(capacity: HistoryCapacity) -> Self {
        Self {
            records: Mutex::new(VecDeque::with_capacity(*capacity.as_ref())),
            capacity,
            appended: AtomicU64::new(0),
            evicted: AtomicU64::new(0),
        }
    }

    /// Append a terminal record, evicting the oldest one when full.
    ///
    /// Returns the evicted record, if any.
    pub fn append(&self, record: ExchangeRecord) -> Option<Arc<ExchangeRecord>> {
        let record = Arc::new(record);
        let mut records = self.records.lock();

        let evicted = if records.len() >= *self.capacity.as_ref() {
            self.evicted.fetch_add(1, Ordering::Relaxed);
            records.pop_front()
        } else {
            None
        };
        records.push_back(record);
        self.appended.fetch_add(1, Ordering::Relaxed);

        evicted
    }

    /// Records oldest to newest, as an independent sequence.
    ///
    /// Records themselves are shared; they are never mutated once appended.
    pub fn snapshot(&self) -> Vec<Arc<ExchangeRecord>> {
        self.records.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn capacity(&self) -> HistoryCapacity {
        self.capacity
    }

    pub fn stats(&self) -> HistoryStats {
        HistoryStats {
            appended: self.appended.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
        }
    }
}
