//! Stack-allocated SPSC FIFO with compile-time capacity. Trades the resize
//! gate and scheduler hook for zero heap allocation and no pointer
//! indirection through the backing array: a reduced-surface sibling of
//! `RingBufferCore`, not a drop-in replacement, so
//! `allocate`/`allocate_n`/`peek_range`/resize/preempt are intentionally
//! absent here.

use crate::backoff::Backoff;
use crate::discipline::Discipline;
use crate::invariants::{debug_assert_bounded_occupancy, debug_assert_not_finished};
use crate::pointer::Pointer;
use crate::storage::SignalCode;
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// A single-producer/single-consumer bounded FIFO embedded directly in the
/// struct (no heap allocation), with a compile-time-fixed capacity `N`.
///
/// Unlike [`crate::ring::RingBufferCore`], there is no resize gate (capacity
/// is fixed at compile time) and no scheduler hook (blocking loops always
/// spin-then-yield to completion).
pub struct StackRingBufferCore<T, D: Discipline<T>, const N: usize> {
    store: [UnsafeCell<D::Cell>; N],
    signal: [AtomicU8; N],
    has_payload: [AtomicBool; N],
    write_pt: Pointer,
    read_pt: Pointer,
    invalid: AtomicBool,
    write_finished: AtomicBool,
}

// Safety: exactly one producer thread advances `write_pt` and touches
// `store`/`signal`/`has_payload` at indices it alone writes; exactly one
// consumer thread does the same for the indices it alone reads, mirroring
// the aliasing discipline `BufferStorage` relies on.
unsafe impl<T: Send, D: Discipline<T>, const N: usize> Send for StackRingBufferCore<T, D, N> {}
unsafe impl<T: Send, D: Discipline<T>, const N: usize> Sync for StackRingBufferCore<T, D, N> {}

impl<T, D: Discipline<T>, const N: usize> StackRingBufferCore<T, D, N> {
    /// Builds a queue with `N` slots.
    ///
    /// # Panics
    ///
    /// Panics if `N` is zero.
    #[must_use]
    pub fn new() -> Self {
        assert!(N > 0, "StackRingBufferCore capacity must be > 0");
        Self {
            store: std::array::from_fn(|_| UnsafeCell::new(D::empty_cell())),
            signal: std::array::from_fn(|_| AtomicU8::new(SignalCode::None as u8)),
            has_payload: std::array::from_fn(|_| AtomicBool::new(false)),
            write_pt: Pointer::new(),
            read_pt: Pointer::new(),
            invalid: AtomicBool::new(false),
            write_finished: AtomicBool::new(false),
        }
    }

    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        N as u32
    }

    #[must_use]
    pub fn size(&self) -> u32 {
        loop {
            let r = self.read_pt.load();
            let w = self.write_pt.load();
            if r.val() == w.val() {
                if r.wrap_indicator() == w.wrap_indicator() {
                    return 0;
                }
                if !r.wrap_indicator() && w.wrap_indicator() {
                    return N as u32;
                }
                std::hint::spin_loop();
                continue;
            }
            let diff = (w.val() as i64 - r.val() as i64).rem_euclid(N as i64);
            let size = diff as u32;
            debug_assert_bounded_occupancy!(size, N as u32);
            return size;
        }
    }

    #[inline]
    #[must_use]
    pub fn space_avail(&self) -> u32 {
        self.capacity() - self.size()
    }

    #[inline]
    #[must_use]
    pub fn is_invalid(&self) -> bool {
        self.invalid.load(Ordering::Acquire)
    }

    pub fn invalidate(&self) {
        self.invalid.store(true, Ordering::Release);
    }

    #[inline]
    #[must_use]
    pub fn write_finished(&self) -> bool {
        self.write_finished.load(Ordering::Acquire)
    }

    #[inline]
    fn idx(&self, value: u32) -> usize {
        (value % self.capacity()) as usize
    }

    /// Copy-push: waits for one free slot, writes `payload` (if any) and
    /// `signal`, advances `write_pt`.
    pub fn push(&self, payload: Option<T>, signal: SignalCode) {
        debug_assert_not_finished!(self.write_finished.load(Ordering::Relaxed));
        let mut backoff = Backoff::new();
        while self.space_avail() == 0 {
            backoff.snooze();
        }
        let wv = self.write_pt.load().val();
        let i = self.idx(wv);
        let present = payload.is_some();
        if let Some(value) = payload {
            // Safety: `space_avail() > 0` guarantees slot `i` is unoccupied.
            unsafe { D::write(&mut *self.store[i].get(), value) };
        }
        self.has_payload[i].store(present, Ordering::Release);
        self.signal[i].store(signal as u8, Ordering::Release);
        self.write_pt.inc(self.capacity());
        if signal == SignalCode::Quit {
            self.write_finished.store(true, Ordering::Release);
        }
    }

    /// Waits for one item, moves it and its signal out, advances
    /// `read_pt`.
    pub fn pop(&self) -> Result<(Option<T>, SignalCode), crate::error::ClosedPortAccessError> {
        let mut backoff = Backoff::new();
        loop {
            if self.size() > 0 {
                let rv = self.read_pt.load().val();
                let i = self.idx(rv);
                let present = self.has_payload[i].load(Ordering::Acquire);
                let value = if present {
                    // Safety: `present` confirms slot `i` holds a live value.
                    Some(unsafe { D::take(&mut *self.store[i].get()) })
                } else {
                    None
                };
                let sig = SignalCode::from_u8(self.signal[i].load(Ordering::Acquire));
                self.read_pt.inc(self.capacity());
                return Ok((value, sig));
            }
            if self.is_invalid() {
                return Err(crate::error::ClosedPortAccessError);
            }
            backoff.snooze();
        }
    }

    /// Discards up to `k` items without copying them out. Stops early if
    /// the port becomes invalid while the queue is empty.
    pub fn recycle(&self, k: u32) -> u32 {
        let mut recycled = 0;
        let mut backoff = Backoff::new();
        while recycled < k {
            if self.size() > 0 {
                let rv = self.read_pt.load().val();
                let i = self.idx(rv);
                if self.has_payload[i].load(Ordering::Acquire) {
                    // Safety: just confirmed live.
                    unsafe { D::discard(&mut *self.store[i].get()) };
                    self.has_payload[i].store(false, Ordering::Release);
                }
                self.read_pt.inc(self.capacity());
                recycled += 1;
                backoff.reset();
            } else if self.is_invalid() {
                break;
            } else {
                backoff.snooze();
            }
        }
        recycled
    }
}

impl<T, D: Discipline<T>, const N: usize> Default for StackRingBufferCore<T, D, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, D: Discipline<T>, const N: usize> Drop for StackRingBufferCore<T, D, N> {
    fn drop(&mut self) {
        let mut cur = self.read_pt.load().val();
        let total = self.size();
        let mut moved = 0u32;
        while moved < total {
            let i = self.idx(cur);
            if *self.has_payload[i].get_mut() {
                // Safety: single-threaded drop; slot `i` holds a live value.
                unsafe { D::discard(&mut *self.store[i].get()) };
            }
            cur = (cur + 1) % self.capacity();
            moved += 1;
        }
    }
}
