//! Per-end blocking statistics, polled (and reset) by telemetry.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// A snapshot returned by `take_zero_read_stats` / `take_zero_write_stats`:
/// how many operations completed, and whether any of them had to block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Blocked {
    /// Number of operations completed since the last poll.
    pub count: u64,
    /// Whether any operation blocked (waited for space/data) since the
    /// last poll.
    pub blocked: bool,
}

/// Single-writer, single-reader counters for one end of the queue. The
/// owning end calls `record_op`/`record_blocked`; the telemetry poller
/// calls `take`, which atomically reads and resets.
#[derive(Debug, Default)]
pub(crate) struct EndStats {
    count: AtomicU64,
    blocked: AtomicBool,
}

impl EndStats {
    #[inline]
    pub(crate) fn record_ops(&self, n: u64) {
        if n > 0 {
            self.count.fetch_add(n, Ordering::Relaxed);
        }
    }

    /// Set-once: the first blocking iteration of a loop marks this; later
    /// iterations of the same loop are no-ops until the next poll resets it.
    #[inline]
    pub(crate) fn record_blocked(&self) {
        self.blocked.store(true, Ordering::Relaxed);
    }

    /// Reads and resets both counters. Tearing between the two loads is
    /// acceptable: stats are advisory, not used for correctness.
    pub(crate) fn take(&self) -> Blocked {
        Blocked {
            count: self.count.swap(0, Ordering::Relaxed),
            blocked: self.blocked.swap(false, Ordering::Relaxed),
        }
    }
}
