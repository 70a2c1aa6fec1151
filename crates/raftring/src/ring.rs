//! `RingBufferCore`: the operation surface producers and consumers call.
//!
//! Every blocking method below follows the same shape: enter the gate,
//! check `not_resizing()` and the operation's predicate,
//! either make progress and return or exit the gate and back off. The
//! split operations (`allocate`/`send`, `peek`/`recycle`) instead return a
//! guard that keeps the gate held across the pair: the reserve call and the
//! commit call are really describing one critical section split across two
//! function calls — Rust's move semantics let us make that split statically
//! safe instead of runtime checked (see DESIGN.md).

use crate::backoff::Backoff;
use crate::config::RingConfig;
use crate::discipline::{Discipline, External};
use crate::error::{ClosedPortAccessError, PeekRangeError};
use crate::gate::{DataManager, Operation};
use crate::invariants::{debug_assert_no_dangling_peek, debug_assert_not_finished};
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::scheduler::{PreemptState, RunState, SchedulerHook};
use crate::stats::{Blocked, EndStats};
use crate::storage::{BufferStorage, KernelId, SignalCode};
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

enum LoopStep<R, E> {
    Done(R),
    Blocked,
    Closed(E),
}

/// A single-producer/single-consumer bounded FIFO with a pluggable storage
/// [`Discipline`]. See the type aliases [`crate::PodRing`],
/// [`crate::ClassRing`], and [`crate::ExternalRing`] for the common cases.
pub struct RingBufferCore<T, D: Discipline<T>> {
    gate: DataManager<T, D>,
    invalid: AtomicBool,
    write_finished: AtomicBool,
    allocate_called: AtomicBool,
    n_allocated: AtomicU32,
    peek_outstanding: AtomicBool,
    read_stats: EndStats,
    write_stats: EndStats,
    metrics: Metrics,
    enable_metrics: bool,
    scheduler: Option<Arc<dyn SchedulerHook>>,
    dst_kernel: Option<KernelId>,
    producer_preempt: PreemptState,
    consumer_preempt: PreemptState,
}

impl<T, D: Discipline<T>> RingBufferCore<T, D> {
    /// Builds a queue with no scheduler hook attached; the preempt escape
    /// in §4.6/§5 becomes a no-op.
    #[must_use]
    pub fn new(config: RingConfig) -> Self {
        Self::build(config, None, None)
    }

    /// Builds a queue whose blocking loops call into `scheduler` once a
    /// side's preempt limit is reached.
    #[must_use]
    pub fn with_scheduler(
        config: RingConfig,
        scheduler: Arc<dyn SchedulerHook>,
        dst_kernel: KernelId,
    ) -> Self {
        Self::build(config, Some(scheduler), Some(dst_kernel))
    }

    fn build(
        config: RingConfig,
        scheduler: Option<Arc<dyn SchedulerHook>>,
        dst_kernel: Option<KernelId>,
    ) -> Self {
        let storage = BufferStorage::new(config.capacity(), dst_kernel);
        Self {
            gate: DataManager::new(storage),
            invalid: AtomicBool::new(false),
            write_finished: AtomicBool::new(false),
            allocate_called: AtomicBool::new(false),
            n_allocated: AtomicU32::new(0),
            peek_outstanding: AtomicBool::new(false),
            read_stats: EndStats::default(),
            write_stats: EndStats::default(),
            metrics: Metrics::default(),
            enable_metrics: config.enable_metrics,
            scheduler,
            dst_kernel,
            producer_preempt: PreemptState::new(config.preempt_limit),
            consumer_preempt: PreemptState::new(config.preempt_limit),
        }
    }

    // -- state observation ---------------------------------------------

    /// Current occupancy, disambiguating the empty/full case by comparing
    /// both pointers' wrap bits. Briefly registers gate presence, like
    /// `signal_peek`, so a concurrent resize cannot swap the storage this
    /// reads out from under it.
    #[must_use]
    pub fn size(&self) -> u32 {
        self.gate.enter(Operation::SignalPop);
        let n = self.gate.storage().size();
        self.gate.exit(Operation::SignalPop);
        n
    }

    #[must_use]
    pub fn space_avail(&self) -> u32 {
        self.gate.enter(Operation::SignalPop);
        let n = self.gate.storage().space_avail();
        self.gate.exit(Operation::SignalPop);
        n
    }

    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.gate.enter(Operation::SignalPop);
        let n = self.gate.storage().capacity();
        self.gate.exit(Operation::SignalPop);
        n
    }

    #[must_use]
    pub fn is_invalid(&self) -> bool {
        self.invalid.load(Ordering::Acquire)
    }

    /// Marks the port closed. Blocked consumer operations unblock and raise
    /// once the queue is also drained.
    pub fn invalidate(&self) {
        self.invalid.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn write_finished(&self) -> bool {
        self.write_finished.load(Ordering::Acquire)
    }

    /// Atomically reads and resets the consumer's `Blocked` counters.
    pub fn take_zero_read_stats(&self) -> Blocked {
        self.read_stats.take()
    }

    /// Atomically reads and resets the producer's `Blocked` counters.
    pub fn take_zero_write_stats(&self) -> Blocked {
        self.write_stats.take()
    }

    /// Point-in-time read of the supplemental monotonic counters (always
    /// zero if `enable_metrics` was false at construction).
    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Requests a resize to `new_capacity`, blocking the calling thread
    /// until both ends are outside their critical section and the swap
    /// completes. Intended to be called by an external supervisor, never by
    /// the producer or consumer thread itself.
    pub fn resize(&self, new_capacity: u32) {
        self.gate.resize(new_capacity);
    }

    fn maybe_preempt(&self, preempt: &PreemptState) {
        if preempt.tick() {
            if let (Some(scheduler), Some(kernel)) = (&self.scheduler, self.dst_kernel) {
                if scheduler.set_running_state(kernel) == RunState::FirstEntry {
                    scheduler.preempt(kernel);
                }
            }
        }
    }

    // -- blocking-loop plumbing -----------------------------------------

    /// Waits for `predicate` to hold, leaving the gate *entered* on
    /// success. The caller is responsible for eventually calling
    /// `self.gate.exit(op)` (directly, or by consuming an `AllocateGuard`).
    fn producer_wait(&self, op: Operation, mut predicate: impl FnMut(&BufferStorage<T, D>) -> bool) {
        let mut backoff = Backoff::new();
        loop {
            self.gate.enter(op);
            if self.gate.not_resizing() && predicate(self.gate.storage()) {
                return;
            }
            self.gate.exit(op);
            self.write_stats.record_blocked();
            backoff.snooze();
            self.maybe_preempt(&self.producer_preempt);
        }
    }

    /// Runs a complete producer operation: waits for `predicate`, then runs
    /// `body` inside the gate and exits.
    fn producer_op<R>(
        &self,
        op: Operation,
        predicate: impl FnMut(&BufferStorage<T, D>) -> bool,
        body: impl FnOnce(&BufferStorage<T, D>) -> R,
    ) -> R {
        self.producer_wait(op, predicate);
        let result = body(self.gate.storage());
        self.gate.exit(op);
        result
    }

    /// Waits for `try_once` to report progress or closure, exiting the gate
    /// on every iteration (used by operations with no outstanding guard).
    fn consumer_block<R, E>(
        &self,
        op: Operation,
        mut try_once: impl FnMut(&BufferStorage<T, D>, bool) -> LoopStep<R, E>,
    ) -> Result<R, E> {
        let mut backoff = Backoff::new();
        loop {
            self.gate.enter(op);
            let step = if self.gate.not_resizing() {
                let invalid = self.is_invalid();
                try_once(self.gate.storage(), invalid)
            } else {
                LoopStep::Blocked
            };
            match step {
                LoopStep::Done(r) => {
                    self.gate.exit(op);
                    return Ok(r);
                }
                LoopStep::Closed(e) => {
                    self.gate.exit(op);
                    return Err(e);
                }
                LoopStep::Blocked => {
                    self.gate.exit(op);
                    self.read_stats.record_blocked();
                    backoff.snooze();
                    self.maybe_preempt(&self.consumer_preempt);
                }
            }
        }
    }

    /// Waits for `try_once` to report a result, leaving the gate entered on
    /// success (used by `peek`, whose guard must keep the gate held).
    fn consumer_hold<R>(
        &self,
        op: Operation,
        mut try_once: impl FnMut(&BufferStorage<T, D>) -> Option<R>,
    ) -> Result<R, ClosedPortAccessError> {
        let mut backoff = Backoff::new();
        loop {
            self.gate.enter(op);
            if self.gate.not_resizing() {
                if let Some(r) = try_once(self.gate.storage()) {
                    return Ok(r);
                }
                if self.is_invalid() {
                    self.gate.exit(op);
                    return Err(ClosedPortAccessError);
                }
            }
            self.gate.exit(op);
            self.read_stats.record_blocked();
            backoff.snooze();
            self.maybe_preempt(&self.consumer_preempt);
        }
    }

    // -- producer surface -------------------------------------------------

    /// Reserve-and-commit: waits for a free slot and returns a guard that
    /// must be resolved with [`AllocateGuard::send`] or
    /// [`AllocateGuard::deallocate`].
    pub fn allocate(&self) -> AllocateGuard<'_, T, D> {
        debug_assert_not_finished!(self.write_finished.load(Ordering::Relaxed));
        self.producer_wait(Operation::Allocate, |s| s.space_avail() > 0);
        let s = self.gate.storage();
        let capacity = s.capacity();
        let start = s.write_pt.load().val();
        self.allocate_called.store(true, Ordering::Relaxed);
        self.n_allocated.store(1, Ordering::Relaxed);
        AllocateGuard {
            ring: self,
            op: Operation::Allocate,
            start,
            len: 1,
            capacity,
            completed: false,
        }
    }

    /// Bulk reserve: waits for `n` free slots. Every slot's signal is reset
    /// to `None` immediately; [`AllocateGuard::send`] overwrites only the
    /// final one.
    ///
    /// # Panics
    ///
    /// Panics if `n` is zero.
    pub fn allocate_n(&self, n: u32) -> AllocateGuard<'_, T, D> {
        assert!(n > 0, "allocate_n requires n > 0");
        debug_assert_not_finished!(self.write_finished.load(Ordering::Relaxed));
        self.producer_wait(Operation::AllocateRange, |s| s.space_avail() >= n);
        let s = self.gate.storage();
        let capacity = s.capacity();
        let start = s.write_pt.load().val();
        for i in 0..n {
            s.set_signal_at((start + i) % capacity, SignalCode::None);
        }
        self.allocate_called.store(true, Ordering::Relaxed);
        self.n_allocated.store(n, Ordering::Relaxed);
        AllocateGuard {
            ring: self,
            op: Operation::AllocateRange,
            start,
            len: n,
            capacity,
            completed: false,
        }
    }

    /// Copy-push: waits for one free slot, writes `payload` (if any) and
    /// `signal`, advances `write_pt`. `payload: None` commits a
    /// signal-only slot (used for `Quit`) without touching the backing
    /// cell.
    pub fn push(&self, payload: Option<T>, signal: SignalCode) {
        self.push_with_op(Operation::Push, payload, signal);
    }

    fn push_with_op(&self, op: Operation, payload: Option<T>, signal: SignalCode) {
        debug_assert_not_finished!(self.write_finished.load(Ordering::Relaxed));
        self.producer_op(
            op,
            |s| s.space_avail() > 0,
            |s| {
                let wv = s.write_pt.load().val();
                let present = payload.is_some();
                if let Some(value) = payload {
                    let cell = s.cell(wv);
                    // Safety: the slot at `wv` is unoccupied — it lies in
                    // `[write_pt, write_pt + space_avail)`, which `push`'s
                    // predicate just confirmed is non-empty.
                    unsafe { D::write(&mut *cell.get(), value) };
                }
                s.set_payload_present(wv, present);
                s.set_signal_at(wv, signal);
                s.write_pt.inc(s.capacity());
                if present {
                    self.write_stats.record_ops(1);
                    if self.enable_metrics {
                        self.metrics.add_sent(1);
                    }
                }
                if signal == SignalCode::Quit {
                    self.write_finished.store(true, Ordering::Release);
                }
            },
        );
    }

    /// Copies every item of `iter` into the queue, attaching `signal` only
    /// to the final element (earlier elements carry `SignalCode::None`).
    /// Blocks as items drain; a no-op if `iter` yields nothing.
    pub fn insert<I: IntoIterator<Item = T>>(&self, iter: I, signal: SignalCode) {
        let mut it = iter.into_iter().peekable();
        while let Some(item) = it.next() {
            let is_last = it.peek().is_none();
            let sig = if is_last { signal } else { SignalCode::None };
            self.push_with_op(Operation::Insert, Some(item), sig);
        }
    }

    // -- consumer surface ---------------------------------------------------

    /// Waits for one item, moves it and its signal out, advances
    /// `read_pt`. Fails once the port is invalidated and the queue is
    /// drained.
    pub fn pop(&self) -> Result<(Option<T>, SignalCode), ClosedPortAccessError> {
        let (value, sig, present) = self.consumer_block(Operation::Pop, |s, invalid| {
            if s.size() > 0 {
                let rv = s.read_pt.load().val();
                let present = s.payload_present(rv);
                let value = if present {
                    let cell = s.cell(rv);
                    // Safety: `present` was just confirmed for this slot.
                    Some(unsafe { D::take(&mut *cell.get()) })
                } else {
                    None
                };
                let sig = s.signal_at(rv);
                s.read_pt.inc(s.capacity());
                LoopStep::Done((value, sig, present))
            } else if invalid {
                LoopStep::Closed(ClosedPortAccessError)
            } else {
                LoopStep::Blocked
            }
        })?;
        self.read_stats.record_ops(1);
        if present && self.enable_metrics {
            self.metrics.add_received(1);
        }
        Ok((value, sig))
    }

    /// `out.len()` successive [`RingBufferCore::pop`]s into a caller-sized
    /// buffer. Stops (leaving the remainder of `out` uninitialized) at the
    /// first `ClosedPortAccessError`.
    pub fn pop_range(
        &self,
        out: &mut [MaybeUninit<(Option<T>, SignalCode)>],
    ) -> Result<(), ClosedPortAccessError> {
        for slot in out.iter_mut() {
            slot.write(self.pop()?);
        }
        Ok(())
    }

    /// Waits for one item and returns a zero-copy guard over it without
    /// advancing `read_pt`. The guard must be resolved — with
    /// [`PeekGuard::recycle`] or [`PeekGuard::unpeek`] (or simply dropped,
    /// which behaves like `unpeek`) — before the next consumer operation.
    pub fn peek(&self) -> Result<PeekGuard<'_, T, D>, ClosedPortAccessError> {
        debug_assert_no_dangling_peek!(self.peek_outstanding.load(Ordering::Relaxed));
        let (at, present, signal) = self.consumer_hold(Operation::Peek, |s| {
            if s.size() > 0 {
                let at = s.read_pt.load().val();
                Some((at, s.payload_present(at), s.signal_at(at)))
            } else {
                None
            }
        })?;
        self.peek_outstanding.store(true, Ordering::Relaxed);
        Ok(PeekGuard {
            ring: self,
            at,
            present,
            signal,
            resolved: false,
        })
    }

    /// Waits for `n` items and returns a guard over slots
    /// `[read_pt, read_pt + n)` (mod capacity), without advancing
    /// `read_pt`.
    ///
    /// # Panics
    ///
    /// Panics if `n` is zero.
    pub fn peek_range(&self, n: u32) -> Result<PeekRangeGuard<'_, T, D>, PeekRangeError> {
        assert!(n > 0, "peek_range requires n > 0");
        debug_assert_no_dangling_peek!(self.peek_outstanding.load(Ordering::Relaxed));
        let mut backoff = Backoff::new();
        loop {
            self.gate.enter(Operation::PeekRange);
            if self.gate.not_resizing() {
                let s = self.gate.storage();
                let size = s.size();
                if size >= n {
                    let start = s.read_pt.load().val();
                    let capacity = s.capacity();
                    self.peek_outstanding.store(true, Ordering::Relaxed);
                    return Ok(PeekRangeGuard {
                        ring: self,
                        start,
                        len: n,
                        capacity,
                        resolved: false,
                    });
                }
                if self.is_invalid() {
                    self.gate.exit(Operation::PeekRange);
                    return Err(if size == 0 {
                        PeekRangeError::ClosedEmpty
                    } else {
                        PeekRangeError::ClosedShort {
                            available: size,
                            requested: n,
                        }
                    });
                }
            }
            self.gate.exit(Operation::PeekRange);
            self.read_stats.record_blocked();
            backoff.snooze();
            self.maybe_preempt(&self.consumer_preempt);
        }
    }

    /// Discards up to `k` items without copying them out. Stops early and
    /// returns the count actually recycled if the port becomes invalid
    /// while the queue is empty.
    pub fn recycle(&self, k: u32) -> u32 {
        let mut recycled = 0;
        while recycled < k {
            let outcome = self.consumer_block(Operation::Recycle, |s, invalid| {
                if s.size() > 0 {
                    let rv = s.read_pt.load().val();
                    if s.payload_present(rv) {
                        let cell = s.cell(rv);
                        // Safety: `payload_present` just confirmed this slot
                        // holds a live value.
                        unsafe { D::discard(&mut *cell.get()) };
                        s.set_payload_present(rv, false);
                    }
                    s.read_pt.inc(s.capacity());
                    LoopStep::Done(())
                } else if invalid {
                    LoopStep::Closed(())
                } else {
                    LoopStep::Blocked
                }
            });
            match outcome {
                Ok(()) => {
                    recycled += 1;
                    self.read_stats.record_ops(1);
                }
                Err(()) => break,
            }
        }
        recycled
    }

    /// Returns the current read slot's signal without participating in the
    /// blocking protocol: no wait, no backoff, no stats. Still briefly
    /// registers gate presence (a bare load/store, not a loop) so a
    /// concurrent resize cannot swap the storage out from under the read —
    /// Rust's aliasing rules make that bracket load-bearing even though the
    /// original left this access fully ungated (see DESIGN.md).
    #[must_use]
    pub fn signal_peek(&self) -> SignalCode {
        self.gate.enter(Operation::SignalPop);
        let s = self.gate.storage();
        let sig = s.signal_at(s.read_pt.load().val());
        self.gate.exit(Operation::SignalPop);
        sig
    }

    /// A `pop` whose payload is immediately dropped; used by a scheduler to
    /// consume a signal-only slot.
    pub fn signal_pop(&self) -> Result<SignalCode, ClosedPortAccessError> {
        self.pop().map(|(_, sig)| sig)
    }
}

/// A boxed payload reclaimed from an `External`-discipline [`PeekGuard`] via
/// [`PeekGuard::take_boxed`], for feeding back into
/// [`RingBufferCore::push_peeked`] on the same or another `External` queue
/// with no allocation and no copy — the ownership-transfer path of the
/// external discipline.
pub struct Peeked<T>(Box<T>);

impl<T> Peeked<T> {
    /// Unwraps the reclaimed value, for callers that do not want to hand it
    /// back into another queue.
    #[must_use]
    pub fn into_inner(self) -> Box<T> {
        self.0
    }
}

impl<'a, T> PeekGuard<'a, T, External<T>> {
    /// Moves the peeked slot's `Box<T>` out instead of dropping it, advances
    /// `read_pt`, and returns it wrapped as [`Peeked<T>`] so it can be
    /// handed to [`RingBufferCore::push_peeked`] without a fresh allocation.
    /// Returns `None` for a signal-only slot.
    #[must_use]
    pub fn take_boxed(mut self) -> Option<Peeked<T>> {
        let s = self.ring.gate.storage();
        let result = if self.present {
            let cell = s.cell(self.at);
            // Safety: `present` was confirmed when the guard was constructed.
            let boxed = unsafe { External::take_boxed(&mut *cell.get()) };
            s.set_payload_present(self.at, false);
            Some(Peeked(boxed))
        } else {
            None
        };
        s.read_pt.inc(s.capacity());
        self.ring.read_stats.record_ops(1);
        self.finish();
        result
    }
}

impl<T> RingBufferCore<T, External<T>> {
    /// Pushes a value previously reclaimed from a peek on an `External`
    /// queue, installing its existing `Box<T>` directly rather than
    /// box-allocating a new one.
    pub fn push_peeked(&self, peeked: Peeked<T>, signal: SignalCode) {
        debug_assert_not_finished!(self.write_finished.load(Ordering::Relaxed));
        self.producer_op(
            Operation::Push,
            |s| s.space_avail() > 0,
            |s| {
                let wv = s.write_pt.load().val();
                let cell = s.cell(wv);
                // Safety: `push`'s predicate just confirmed slot `wv` is
                // unoccupied.
                unsafe { External::write_boxed(&mut *cell.get(), peeked.0) };
                s.set_payload_present(wv, true);
                s.set_signal_at(wv, signal);
                s.write_pt.inc(s.capacity());
                self.write_stats.record_ops(1);
                if self.enable_metrics {
                    self.metrics.add_sent(1);
                }
                if signal == SignalCode::Quit {
                    self.write_finished.store(true, Ordering::Release);
                }
            },
        );
    }
}

/// Returned by [`RingBufferCore::allocate`] / [`RingBufferCore::allocate_n`].
/// Keeps the producer side of the gate held until resolved.
pub struct AllocateGuard<'a, T, D: Discipline<T>> {
    ring: &'a RingBufferCore<T, D>,
    op: Operation,
    start: u32,
    len: u32,
    capacity: u32,
    completed: bool,
}

impl<'a, T, D: Discipline<T>> AllocateGuard<'a, T, D> {
    /// Number of slots this allocation covers (`1` for `allocate`, `n` for
    /// `allocate_n`).
    #[must_use]
    pub fn len(&self) -> u32 {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Writes `value` into the single allocated slot.
    ///
    /// # Panics
    ///
    /// Panics (debug builds) if this guard covers more than one slot.
    pub fn write(&mut self, value: T) {
        debug_assert_eq!(self.len, 1, "write() is for allocate(); use write_at for allocate_n()");
        self.write_at(0, value);
    }

    /// Writes `value` into slot `index` of the allocated range.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    pub fn write_at(&mut self, index: u32, value: T) {
        assert!(
            index < self.len,
            "index {index} out of range for an allocation of {} slot(s)",
            self.len
        );
        let slot = (self.start + index) % self.capacity;
        let s = self.ring.gate.storage();
        let cell = s.cell(slot);
        // Safety: slots in `[start, start + len)` were reserved for the
        // producer exclusively by `allocate`/`allocate_n` and are unwritten.
        unsafe { D::write(&mut *cell.get(), value) };
        s.set_payload_present(slot, true);
    }

    /// Commits the allocation: writes `signal` into the final slot,
    /// advances `write_pt` by the whole range, and releases the gate.
    pub fn send(mut self, signal: SignalCode) {
        let s = self.ring.gate.storage();
        let last = (self.start + self.len - 1) % self.capacity;
        s.set_signal_at(last, signal);
        s.write_pt.inc_by(self.len, self.capacity);
        self.ring.write_stats.record_ops(u64::from(self.len));
        if self.ring.enable_metrics {
            self.ring.metrics.add_sent(u64::from(self.len));
        }
        if signal == SignalCode::Eof {
            self.ring.write_finished.store(true, Ordering::Release);
        }
        self.ring.allocate_called.store(false, Ordering::Relaxed);
        self.ring.n_allocated.store(0, Ordering::Relaxed);
        self.ring.gate.exit(self.op);
        self.completed = true;
    }

    /// Cancels the allocation: no pointer advance, no signal write. The
    /// slots remain reusable by the next `allocate`.
    pub fn deallocate(self) {
        // `Drop` performs the actual cleanup.
    }
}

impl<'a, T, D: Discipline<T>> Drop for AllocateGuard<'a, T, D> {
    fn drop(&mut self) {
        if !self.completed {
            self.ring.allocate_called.store(false, Ordering::Relaxed);
            self.ring.n_allocated.store(0, Ordering::Relaxed);
            self.ring.gate.exit(self.op);
        }
    }
}

/// Returned by [`RingBufferCore::peek`]. Keeps the consumer side of the
/// gate held until resolved.
pub struct PeekGuard<'a, T, D: Discipline<T>> {
    ring: &'a RingBufferCore<T, D>,
    at: u32,
    present: bool,
    signal: SignalCode,
    resolved: bool,
}

impl<'a, T, D: Discipline<T>> PeekGuard<'a, T, D> {
    /// The peeked slot's payload, or `None` for a signal-only slot.
    #[must_use]
    pub fn get(&self) -> Option<&T> {
        if !self.present {
            return None;
        }
        let s = self.ring.gate.storage();
        let cell = s.cell(self.at);
        // Safety: `present` was confirmed when the guard was constructed,
        // and the consumer side has exclusive access to this slot.
        Some(unsafe { D::peek_ref(&*cell.get()) })
    }

    #[must_use]
    pub fn signal(&self) -> SignalCode {
        self.signal
    }

    /// Consumes the peeked item: discards the payload (if any), advances
    /// `read_pt`, and records the read. Equivalent to `peek` immediately
    /// followed by `recycle(1)` of the same item.
    pub fn recycle(mut self) {
        let s = self.ring.gate.storage();
        if self.present {
            let cell = s.cell(self.at);
            // Safety: as in `get`.
            unsafe { D::discard(&mut *cell.get()) };
            s.set_payload_present(self.at, false);
        }
        s.read_pt.inc(s.capacity());
        self.ring.read_stats.record_ops(1);
        self.finish();
    }

    /// Leaves `read_pt` (and so `size()`) unchanged; just releases the
    /// gate. Equivalent to dropping the guard.
    pub fn unpeek(self) {
        // Drop does the work.
    }

    fn finish(&mut self) {
        self.ring.peek_outstanding.store(false, Ordering::Relaxed);
        self.ring.gate.exit(Operation::Peek);
        self.resolved = true;
    }
}

impl<'a, T, D: Discipline<T>> Drop for PeekGuard<'a, T, D> {
    fn drop(&mut self) {
        if !self.resolved {
            self.finish();
        }
    }
}

/// Returned by [`RingBufferCore::peek_range`]. Keeps the consumer side of
/// the gate held until resolved.
pub struct PeekRangeGuard<'a, T, D: Discipline<T>> {
    ring: &'a RingBufferCore<T, D>,
    start: u32,
    len: u32,
    capacity: u32,
    resolved: bool,
}

impl<'a, T, D: Discipline<T>> PeekRangeGuard<'a, T, D> {
    #[must_use]
    pub fn len(&self) -> u32 {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The payload of slot `index` within the peeked range, or `None` for a
    /// signal-only slot.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    #[must_use]
    pub fn get(&self, index: u32) -> Option<&T> {
        assert!(index < self.len, "index {index} out of range for a peek of {} slot(s)", self.len);
        let slot = (self.start + index) % self.capacity;
        let s = self.ring.gate.storage();
        if !s.payload_present(slot) {
            return None;
        }
        let cell = s.cell(slot);
        Some(unsafe { D::peek_ref(&*cell.get()) })
    }

    /// The signal of slot `index` within the peeked range.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    #[must_use]
    pub fn signal(&self, index: u32) -> SignalCode {
        assert!(index < self.len, "index {index} out of range for a peek of {} slot(s)", self.len);
        let slot = (self.start + index) % self.capacity;
        self.ring.gate.storage().signal_at(slot)
    }

    /// Consumes the whole peeked range: discards every payload, advances
    /// `read_pt` by `len()`, and records the reads.
    pub fn recycle(mut self) {
        let s = self.ring.gate.storage();
        for i in 0..self.len {
            let slot = (self.start + i) % self.capacity;
            if s.payload_present(slot) {
                let cell = s.cell(slot);
                unsafe { D::discard(&mut *cell.get()) };
                s.set_payload_present(slot, false);
            }
        }
        s.read_pt.inc_by(self.len, self.capacity);
        self.ring.read_stats.record_ops(u64::from(self.len));
        self.finish();
    }

    /// Leaves `read_pt` unchanged; just releases the gate. Equivalent to
    /// dropping the guard.
    pub fn unpeek(self) {
        // Drop does the work.
    }

    fn finish(&mut self) {
        self.ring.peek_outstanding.store(false, Ordering::Relaxed);
        self.ring.gate.exit(Operation::PeekRange);
        self.resolved = true;
    }
}

impl<'a, T, D: Discipline<T>> Drop for PeekRangeGuard<'a, T, D> {
    fn drop(&mut self) {
        if !self.resolved {
            self.finish();
        }
    }
}
