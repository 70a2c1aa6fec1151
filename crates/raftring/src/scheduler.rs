//! The single call pair the blocking path uses to yield back to an external
//! scheduler once a preempt limit is reached. Defined by the scheduler; the
//! FIFO only invokes it through this trait, injected at construction rather
//! than reached for as a global.

use crate::storage::KernelId;

/// Whether `set_running_state` is being entered for the first time since the
/// kernel last ran, or is a re-entrant call while already running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// First entry: the caller should follow up with `preempt`.
    FirstEntry,
    /// Already running; no preempt necessary.
    Resumed,
}

/// External scheduler hook consumed by the blocking loops' preempt escape.
/// Implementations are provided by the surrounding dataflow runtime, not by
/// this crate.
pub trait SchedulerHook: Send + Sync {
    /// Declares that `kernel` is about to run. Returns `FirstEntry` if this
    /// is a fresh activation (the caller should then call `preempt`), or
    /// `Resumed` if the kernel was already marked running.
    fn set_running_state(&self, kernel: KernelId) -> RunState;

    /// Hands control to the scheduler on behalf of `kernel`. Returns once
    /// the scheduler has decided to resume this kernel.
    fn preempt(&self, kernel: KernelId);
}

/// Tracks the blocking-loop iteration count against `preempt_limit`,
/// invoking the scheduler hook once the limit is exceeded and resetting on
/// resume. Lives inside `RingBufferCore`; one instance per end.
///
/// Backed by an `AtomicU32` (rather than a plain `Cell`) purely so that
/// `RingBufferCore` stays `Sync` and can be shared behind an `Arc` across
/// the producer and consumer threads; only the owning end ever touches its
/// own `PreemptState`, so `Relaxed` ordering is sufficient.
pub(crate) struct PreemptState {
    iterations: std::sync::atomic::AtomicU32,
    limit: u32,
}

impl PreemptState {
    pub(crate) fn new(limit: u32) -> Self {
        Self {
            iterations: std::sync::atomic::AtomicU32::new(0),
            limit,
        }
    }

    /// Call once per failed-predicate iteration of a blocking loop. Returns
    /// `true` if the preempt limit was hit and the scheduler hook (if any)
    /// should be consulted.
    pub(crate) fn tick(&self) -> bool {
        use std::sync::atomic::Ordering;
        let n = self.iterations.load(Ordering::Relaxed) + 1;
        if n > self.limit {
            self.iterations.store(0, Ordering::Relaxed);
            true
        } else {
            self.iterations.store(n, Ordering::Relaxed);
            false
        }
    }
}
