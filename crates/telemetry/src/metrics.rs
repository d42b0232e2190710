//! Sink metrics

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one sink
#[derive(Debug, Default)]
pub struct SinkMetrics {
    /// Commands sent
    send_count: AtomicU64,
    /// Commands lost to a send failure
    failure_count: AtomicU64,
    /// Payload bytes sent
    bytes_sent: AtomicU64,
}

impl SinkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send_count(&self) -> u64 {
        self.send_count.load(Ordering::Relaxed)
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::Relaxed)
    }

    /// Count a successful send of `bytes` payload bytes
    pub fn record_sent(&self, bytes: usize) {
        self.send_count.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            send_count: self.send_count(),
            failure_count: self.failure_count(),
            bytes_sent: self.bytes_sent(),
        }
    }
}

/// Snapshot of sink metrics (for reporting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub send_count: u64,
    pub failure_count: u64,
    pub bytes_sent: u64,
}
