//! Per-sink counters
//!
//! Kept in-process for the end-of-sample report; every write result is also
//! exported through `observability::record_frame_written`.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Counters of a single sink
#[derive(Debug, Default)]
pub struct SinkMetrics {
    queue_len: AtomicUsize,
    enqueued: AtomicU64,
    written: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

impl SinkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    pub fn inc_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a write result and export it
    pub fn record_write(&self, sink_name: &str, success: bool) {
        let counter = if success { &self.written } else { &self.failed };
        counter.fetch_add(1, Ordering::Relaxed);
        observability::record_frame_written(sink_name, success);
    }

    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queue_len: self.queue_len.load(Ordering::Relaxed),
            enqueued: self.enqueued.load(Ordering::Relaxed),
            written: self.written(),
            failed: self.failed(),
            dropped: self.dropped(),
        }
    }
}

/// Point-in-time copy of [`SinkMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub queue_len: usize,
    pub enqueued: u64,
    pub written: u64,
    pub failed: u64,
    pub dropped: u64,
}

impl MetricsSnapshot {
    /// Every enqueued frame was written
    pub fn is_complete(&self) -> bool {
        self.failed == 0 && self.written == self.enqueued
    }
}
