//! The backing arena: a contiguous array of slots, a parallel array of
//! per-slot signal codes, and the two [`Pointer`]s that delimit the
//! occupied range.

use crate::discipline::Discipline;
use crate::pointer::Pointer;
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Out-of-band control signal carried alongside a slot's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SignalCode {
    /// No signal; an ordinary data item.
    None = 0,
    /// No further items will be produced; the producer has finished.
    Eof = 1,
    /// System-level termination, pushed with no payload.
    Quit = 2,
}

impl SignalCode {
    #[inline]
    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            0 => SignalCode::None,
            1 => SignalCode::Eof,
            2 => SignalCode::Quit,
            other => unreachable!("invalid signal byte {other}"),
        }
    }
}

/// Opaque handle to the kernel a queue end belongs to, forwarded verbatim to
/// a [`crate::scheduler::SchedulerHook`]. The FIFO never inspects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KernelId(pub u64);

/// The ring's backing storage: `capacity` slots, `capacity` signal words,
/// and the write/read pointers. Owned exclusively by one `DataManager` at a
/// time (see `gate.rs`); never touched directly by `RingBufferCore`.
pub(crate) struct BufferStorage<T, D: Discipline<T>> {
    store: Box<[UnsafeCell<D::Cell>]>,
    signal: Box<[AtomicU8]>,
    /// Whether slot `i` currently holds a live payload, as distinct from
    /// carrying a signal. A signal-only `push` (payload `None`, e.g. `Quit`)
    /// never writes `store[i]`, so this flag is what lets `pop`/`recycle`
    /// tell a committed-but-empty slot from a committed-with-data one
    /// without reading uninitialized memory — see DESIGN.md.
    has_payload: Box<[AtomicBool]>,
    capacity: u32,
    pub(crate) write_pt: Pointer,
    pub(crate) read_pt: Pointer,
    pub(crate) dst_kernel: Option<KernelId>,
}

// Safety: access to `store`/`signal` is always mediated by the gate in
// `gate.rs`, which guarantees at most one producer and one consumer index
// into these arrays concurrently, at disjoint indices.
unsafe impl<T: Send, D: Discipline<T>> Send for BufferStorage<T, D> {}
unsafe impl<T: Send, D: Discipline<T>> Sync for BufferStorage<T, D> {}

impl<T, D: Discipline<T>> BufferStorage<T, D> {
    pub(crate) fn new(capacity: u32, dst_kernel: Option<KernelId>) -> Self {
        assert!(capacity > 0, "capacity must be positive");
        let mut store = Vec::with_capacity(capacity as usize);
        store.resize_with(capacity as usize, || UnsafeCell::new(D::empty_cell()));
        let mut signal = Vec::with_capacity(capacity as usize);
        signal.resize_with(capacity as usize, || AtomicU8::new(SignalCode::None as u8));
        let mut has_payload = Vec::with_capacity(capacity as usize);
        has_payload.resize_with(capacity as usize, || AtomicBool::new(false));
        Self {
            store: store.into_boxed_slice(),
            signal: signal.into_boxed_slice(),
            has_payload: has_payload.into_boxed_slice(),
            capacity,
            write_pt: Pointer::new(),
            read_pt: Pointer::new(),
            dst_kernel,
        }
    }

    #[inline]
    pub(crate) fn capacity(&self) -> u32 {
        self.capacity
    }

    #[inline]
    fn idx(&self, value: u32) -> usize {
        (value % self.capacity) as usize
    }

    /// Current occupancy, resolving the transient inconsistency between a
    /// racing read of `write_pt` and `read_pt` by spinning locally (never
    /// yielding) until the two pointers are observed from a consistent pair
    /// of moments.
    pub(crate) fn size(&self) -> u32 {
        loop {
            let r = self.read_pt.load();
            let w = self.write_pt.load();
            if r.val() == w.val() {
                if r.wrap_indicator() == w.wrap_indicator() {
                    return 0;
                }
                if !r.wrap_indicator() && w.wrap_indicator() {
                    return self.capacity;
                }
                // r.wrap > w.wrap: transient inconsistency, retry.
                std::hint::spin_loop();
                continue;
            }
            let diff = (w.val() as i64 - r.val() as i64).rem_euclid(self.capacity as i64);
            let size = diff as u32;
            crate::invariants::debug_assert_bounded_occupancy!(size, self.capacity);
            return size;
        }
    }

    #[inline]
    pub(crate) fn space_avail(&self) -> u32 {
        self.capacity - self.size()
    }

    /// Raw pointer to the slot's payload cell at `value` (mod capacity).
    /// Caller (an operation already inside the gate) is responsible for the
    /// aliasing discipline: exactly one of the two ends touches a given
    /// index at a time.
    #[inline]
    pub(crate) fn cell(&self, value: u32) -> &UnsafeCell<D::Cell> {
        &self.store[self.idx(value)]
    }

    #[inline]
    pub(crate) fn signal_at(&self, value: u32) -> SignalCode {
        SignalCode::from_u8(self.signal[self.idx(value)].load(Ordering::Acquire))
    }

    #[inline]
    pub(crate) fn set_signal_at(&self, value: u32, signal: SignalCode) {
        self.signal[self.idx(value)].store(signal as u8, Ordering::Release);
    }

    #[inline]
    pub(crate) fn payload_present(&self, value: u32) -> bool {
        self.has_payload[self.idx(value)].load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn set_payload_present(&self, value: u32, present: bool) {
        self.has_payload[self.idx(value)].store(present, Ordering::Release);
    }

    /// Drains every live item with `discard`, used when the storage itself
    /// is being dropped (so discipline destructors still run) and when a
    /// resize needs to move live items into a fresh, larger arena.
    pub(crate) fn drain_into(&self, other: &Self) {
        let mut r = self.read_pt.load();
        let w = self.write_pt.load();
        let mut moved = 0u32;
        let total = self.size();
        while moved < total {
            let sig = self.signal_at(r.val());
            let present = self.payload_present(r.val());
            let dst_value = other.write_pt.load().val();
            if present {
                let cell = self.cell(r.val());
                // Safety: single-threaded drain, called only while both ends
                // are outside the gate (resize precondition).
                let value = unsafe { D::take(&mut *cell.get()) };
                let dst_cell = other.cell(dst_value);
                unsafe { D::write(&mut *dst_cell.get(), value) };
            }
            other.set_signal_at(dst_value, sig);
            other.set_payload_present(dst_value, present);
            other.write_pt.inc(other.capacity);
            self.read_pt.inc(self.capacity);
            r = self.read_pt.load();
            moved += 1;
        }
        debug_assert_eq!(w.val(), r.val());
    }
}

impl<T, D: Discipline<T>> Drop for BufferStorage<T, D> {
    fn drop(&mut self) {
        let r = self.read_pt.load();
        let total = self.size();
        let mut moved = 0u32;
        let mut cur = r.val();
        while moved < total {
            if self.payload_present(cur) {
                let cell = self.cell(cur);
                unsafe { D::discard(&mut *cell.get()) };
            }
            cur = (cur + 1) % self.capacity;
            moved += 1;
        }
    }
}
