//! Bounded in-memory record of captured requests

use super::types::CapturedRequest;
use crate::error::CaptureError;
use crate::metrics::CaptureMetrics;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    Open,
    Closed,
}

struct StoreInner {
    records: VecDeque<Arc<CapturedRequest>>,
    state: StoreState,
    evicted: u64,
}

/// Ordered, capacity-limited sequence of captures.
///
/// When full, the oldest capture is evicted to make room. All operations take
/// a single short-lived lock, so an append is either fully visible to a
/// snapshot or not at all.
pub struct CaptureStore {
    inner: Mutex<StoreInner>,
    capacity: usize,
    metrics: Option<Arc<CaptureMetrics>>,
}

impl CaptureStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(StoreInner {
                records: VecDeque::with_capacity(capacity.min(1024)),
                state: StoreState::Open,
                evicted: 0,
            }),
            capacity,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<CaptureMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        // Every critical section leaves the deque consistent, so a poisoned
        // lock is still safe to use.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn append(&self, record: CapturedRequest) -> Result<Arc<CapturedRequest>, CaptureError> {
        let record = Arc::new(record);
        let evicted = {
            let mut inner = self.lock();
            if inner.state == StoreState::Closed {
                return Err(CaptureError::StoreClosed);
            }

            let mut evicted = false;
            if inner.records.len() >= self.capacity {
                inner.records.pop_front();
                inner.evicted += 1;
                evicted = true;
            }
            inner.records.push_back(Arc::clone(&record));

            // Under the lock: the gauge must match the length after the last append.
            if let Some(metrics) = &self.metrics {
                if evicted {
                    metrics.record_eviction();
                }
                metrics.set_store_records(inner.records.len());
            }
            evicted
        };

        if evicted {
            tracing::debug!(capacity = self.capacity, "Capture store full, evicted oldest record");
        }

        Ok(record)
    }

    /// Point-in-time copy of the stored captures, oldest first
    pub fn snapshot(&self) -> Vec<Arc<CapturedRequest>> {
        self.lock().records.iter().cloned().collect()
    }

    /// Stops accepting captures. Existing records stay readable.
    pub fn close(&self) {
        let mut inner = self.lock();
        if inner.state == StoreState::Open {
            inner.state = StoreState::Closed;
            tracing::info!(records = inner.records.len(), "Capture store closed");
        }
    }

    pub fn state(&self) -> StoreState {
        self.lock().state
    }

    pub fn is_closed(&self) -> bool {
        self.state() == StoreState::Closed
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of captures dropped to respect the capacity
    pub fn evicted_count(&self) -> u64 {
        self.lock().evicted
    }
}
