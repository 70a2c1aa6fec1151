//! `DataManager`: the resize-safety gate.
//!
//! The data plane never acquires a heavyweight lock. Every operation
//! brackets its critical section with `enter`/`exit`; a resize may only
//! proceed once both registrations are clear.

use crate::backoff::Backoff;
use crate::discipline::Discipline;
use crate::storage::BufferStorage;
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, Ordering};

/// Which end of the queue an operation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    Producer,
    Consumer,
}

/// The operation class an `enter`/`exit` pair brackets. Carried only for
/// debug-assertion messages; the gate itself only cares about `Side`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operation {
    Allocate,
    AllocateRange,
    Push,
    Insert,
    Pop,
    PopRange,
    Peek,
    PeekRange,
    Recycle,
    SignalPop,
}

impl Operation {
    fn side(self) -> Side {
        match self {
            Operation::Allocate | Operation::AllocateRange | Operation::Push | Operation::Insert => {
                Side::Producer
            }
            Operation::Pop
            | Operation::PopRange
            | Operation::Peek
            | Operation::PeekRange
            | Operation::Recycle
            | Operation::SignalPop => Side::Consumer,
        }
    }
}

/// Guards access to the current `BufferStorage`, and lets an external
/// supervisor atomically swap it for a resize without losing in-flight
/// operations.
pub(crate) struct DataManager<T, D: Discipline<T>> {
    storage: UnsafeCell<BufferStorage<T, D>>,
    producer_inside: AtomicBool,
    consumer_inside: AtomicBool,
    resizing: AtomicBool,
}

// Safety: `storage` is only ever dereferenced while the relevant `*_inside`
// flag is set by the dereferencing thread, and a resize only touches it
// once both flags read false — the same single-owner contract the SPSC ring
// relies on throughout this crate.
unsafe impl<T: Send, D: Discipline<T>> Send for DataManager<T, D> {}
unsafe impl<T: Send, D: Discipline<T>> Sync for DataManager<T, D> {}

impl<T, D: Discipline<T>> DataManager<T, D> {
    pub(crate) fn new(storage: BufferStorage<T, D>) -> Self {
        Self {
            storage: UnsafeCell::new(storage),
            producer_inside: AtomicBool::new(false),
            consumer_inside: AtomicBool::new(false),
            resizing: AtomicBool::new(false),
        }
    }

    #[inline]
    fn flag(&self, side: Side) -> &AtomicBool {
        match side {
            Side::Producer => &self.producer_inside,
            Side::Consumer => &self.consumer_inside,
        }
    }

    /// Registers the caller's presence for `op`. Non-blocking.
    #[inline]
    pub(crate) fn enter(&self, op: Operation) {
        let side = op.side();
        #[cfg(debug_assertions)]
        {
            let already = self.flag(side).load(Ordering::Relaxed);
            crate::invariants::debug_assert_gate_not_reentered!(already, op);
        }
        self.flag(side).store(true, Ordering::SeqCst);
    }

    /// Releases the registration made by [`DataManager::enter`].
    #[inline]
    pub(crate) fn exit(&self, op: Operation) {
        self.flag(op.side()).store(false, Ordering::SeqCst);
    }

    /// Returns `false` iff an external resize request is pending.
    #[inline]
    pub(crate) fn not_resizing(&self) -> bool {
        !self.resizing.load(Ordering::Acquire)
    }

    /// Borrows the current storage. The caller must already have called
    /// [`DataManager::enter`] for an operation on the relevant side (or,
    /// for the rare ungated read like `signal_peek`, at least briefly
    /// registered presence) — that registration is what keeps
    /// [`DataManager::resize`] from swapping the storage out from under
    /// this reference.
    #[inline]
    pub(crate) fn storage(&self) -> &BufferStorage<T, D> {
        // Safety: the gate's enter/exit protocol plus the SPSC contract (one
        // producer thread, one consumer thread) guarantee this reference
        // does not alias a concurrent resize, and that producer- and
        // consumer-side accesses touch disjoint slot indices.
        unsafe { &*self.storage.get() }
    }

    /// Requests a resize to `new_capacity`, draining the gate (waiting for
    /// both ends to be outside a critical section) before swapping in a
    /// freshly allocated `BufferStorage` with the live items copied across.
    /// Blocks the calling (supervisor) thread until the drain completes.
    pub(crate) fn resize(&self, new_capacity: u32) {
        self.resizing.store(true, Ordering::Release);
        let mut backoff = Backoff::new();
        while self.producer_inside.load(Ordering::Acquire) || self.consumer_inside.load(Ordering::Acquire) {
            backoff.snooze();
        }
        // Safety: both `*_inside` flags are false, and `resizing` is set so
        // no operation will re-enter until we clear it below — we have
        // exclusive access to `storage`.
        unsafe {
            let old = &*self.storage.get();
            let fresh = BufferStorage::new(new_capacity, old.dst_kernel);
            old.drain_into(&fresh);
            *self.storage.get() = fresh;
        }
        self.resizing.store(false, Ordering::Release);
    }
}
