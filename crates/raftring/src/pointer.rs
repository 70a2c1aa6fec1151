//! Head/tail pointer: a `(wrap : 1 bit, value : W bits)` counter.
//!
//! Packed into a single `AtomicU32` so that cross-thread reads never tear:
//! the owning end is the sole writer, the other end only loads.

use std::sync::atomic::{AtomicU32, Ordering};

const WRAP_BIT: u32 = 1 << 31;
const VALUE_MASK: u32 = WRAP_BIT - 1;

/// A packed `(wrap, value)` counter used for `write_pt` / `read_pt`.
///
/// `value` is always `< capacity`; capacity is not stored here since both
/// ends already know it from the owning `BufferStorage`.
#[derive(Debug)]
pub struct Pointer {
    packed: AtomicU32,
}

/// A snapshot of a [`Pointer`] taken at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerSnapshot {
    value: u32,
    wrap: bool,
}

impl PointerSnapshot {
    #[inline]
    #[must_use]
    pub fn val(self) -> u32 {
        self.value
    }

    #[inline]
    #[must_use]
    pub fn wrap_indicator(self) -> bool {
        self.wrap
    }

    #[inline]
    fn pack(self) -> u32 {
        (u32::from(self.wrap) << 31) | (self.value & VALUE_MASK)
    }

    #[inline]
    fn unpack(packed: u32) -> Self {
        Self {
            value: packed & VALUE_MASK,
            wrap: packed & WRAP_BIT != 0,
        }
    }
}

impl Pointer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            packed: AtomicU32::new(0),
        }
    }

    /// Single-writer, single-consistent-read load. Safe to call from either
    /// end; only the owning end should call the mutators below.
    #[inline]
    #[must_use]
    pub fn load(&self) -> PointerSnapshot {
        PointerSnapshot::unpack(self.packed.load(Ordering::Acquire))
    }

    /// Publishes a new snapshot with release ordering, making prior writes
    /// to the slot this pointer guards visible to the other end.
    #[inline]
    fn store(&self, snapshot: PointerSnapshot) {
        self.packed.store(snapshot.pack(), Ordering::Release);
    }

    /// Advances `value` by one modulo `capacity`, toggling `wrap` exactly
    /// when `value` wraps from `capacity - 1` to `0`.
    #[inline]
    pub fn inc(&self, capacity: u32) {
        self.inc_by(1, capacity);
    }

    /// Advances by `k` successive [`Pointer::inc`] steps, in one publish.
    #[inline]
    pub fn inc_by(&self, k: u32, capacity: u32) {
        debug_assert!(capacity > 0);
        // Relaxed: only the owning end ever reads this intermediate value
        // again before the Release store below.
        let cur = PointerSnapshot::unpack(self.packed.load(Ordering::Relaxed));
        let total = cur.value as u64 + k as u64;
        let wraps = total / capacity as u64;
        let new_value = (total % capacity as u64) as u32;
        let new_wrap = if wraps % 2 == 1 { !cur.wrap } else { cur.wrap };
        self.store(PointerSnapshot {
            value: new_value,
            wrap: new_wrap,
        });
    }
}

impl Default for Pointer {
    fn default() -> Self {
        Self::new()
    }
}
