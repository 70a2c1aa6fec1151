//! Supplemental free-running counters: atomic, `enable_metrics`-gated, and
//! never reset. These extend the `Blocked` stats in `stats.rs` (which are
//! read-and-reset) with monotonic totals useful for the same telemetry
//! consumer.

use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe, monotonic counters. Cheap to read; writers only increment.
#[derive(Debug, Default)]
pub(crate) struct Metrics {
    messages_sent: AtomicU64,
    messages_received: AtomicU64,
}

impl Metrics {
    #[inline]
    pub(crate) fn add_sent(&self, n: u64) {
        self.messages_sent.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_received(&self, n: u64) {
        self.messages_received.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time read of [`Metrics`]; does not reset the underlying
/// counters (unlike `Blocked`'s take-and-reset semantics).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    /// Total items committed by the producer since construction.
    pub messages_sent: u64,
    /// Total items consumed by the consumer since construction.
    pub messages_received: u64,
}
