//! Loom-based concurrency tests for the packed-pointer SPSC protocol.
//!
//! Run with: `cargo test --features loom --test loom_tests --release`
//!
//! `raftring`'s actual `Pointer`/`BufferStorage` types use `std::sync`
//! atomics directly, so they cannot be driven through loom without a
//! parallel atomic backend. Instead this file re-implements just the
//! synchronization protocol (the packed `(wrap, value)` counter and its
//! publish/acquire discipline) against `loom::sync` atomics and
//! exhaustively explores its interleavings.

#![cfg(feature = "loom")]

use loom::sync::atomic::{AtomicU32, Ordering};
use loom::sync::Arc;
use loom::thread;
use std::cell::UnsafeCell;

const WRAP_BIT: u32 = 1 << 31;
const VALUE_MASK: u32 = WRAP_BIT - 1;

struct LoomPointer {
    packed: AtomicU32,
}

impl LoomPointer {
    fn new() -> Self {
        Self { packed: AtomicU32::new(0) }
    }

    fn load(&self) -> (u32, bool) {
        let p = self.packed.load(Ordering::Acquire);
        (p & VALUE_MASK, p & WRAP_BIT != 0)
    }

    fn inc(&self, capacity: u32) {
        let (value, wrap) = {
            let p = self.packed.load(Ordering::Relaxed);
            (p & VALUE_MASK, p & WRAP_BIT != 0)
        };
        let next = value + 1;
        let (new_value, new_wrap) = if next == capacity { (0, !wrap) } else { (next, wrap) };
        let packed = (u32::from(new_wrap) << 31) | (new_value & VALUE_MASK);
        self.packed.store(packed, Ordering::Release);
    }
}

struct LoomRing {
    capacity: u32,
    store: UnsafeCell<[u64; 4]>,
    write_pt: LoomPointer,
    read_pt: LoomPointer,
}

unsafe impl Send for LoomRing {}
unsafe impl Sync for LoomRing {}

impl LoomRing {
    fn new() -> Self {
        Self {
            capacity: 4,
            store: UnsafeCell::new([0; 4]),
            write_pt: LoomPointer::new(),
            read_pt: LoomPointer::new(),
        }
    }

    fn size(&self) -> u32 {
        let (rv, rw) = self.read_pt.load();
        let (wv, ww) = self.write_pt.load();
        if rv == wv {
            return if rw == ww { 0 } else { self.capacity };
        }
        (wv as i64 - rv as i64).rem_euclid(self.capacity as i64) as u32
    }

    fn try_push(&self, value: u64) -> bool {
        if self.size() == self.capacity {
            return false;
        }
        let (wv, _) = self.write_pt.load();
        // Safety: size() < capacity guarantees slot wv is not owned by the
        // consumer.
        unsafe { (*self.store.get())[wv as usize] = value };
        self.write_pt.inc(self.capacity);
        true
    }

    fn try_pop(&self) -> Option<u64> {
        if self.size() == 0 {
            return None;
        }
        let (rv, _) = self.read_pt.load();
        // Safety: size() > 0 guarantees slot rv was published by the
        // producer's release store above.
        let value = unsafe { (*self.store.get())[rv as usize] };
        self.read_pt.inc(self.capacity);
        Some(value)
    }
}

#[test]
fn loom_push_then_pop_observes_published_value() {
    loom::model(|| {
        let ring = Arc::new(LoomRing::new());
        let producer_ring = Arc::clone(&ring);

        let producer = thread::spawn(move || {
            assert!(producer_ring.try_push(7));
        });

        let consumer = thread::spawn(move || {
            let mut seen = None;
            for _ in 0..4 {
                if let Some(v) = ring.try_pop() {
                    seen = Some(v);
                    break;
                }
                loom::thread::yield_now();
            }
            seen
        });

        producer.join().unwrap();
        let seen = consumer.join().unwrap();
        if let Some(v) = seen {
            assert_eq!(v, 7);
        }
    });
}

#[test]
fn loom_size_never_exceeds_capacity_under_concurrent_push_pop() {
    loom::model(|| {
        let ring = Arc::new(LoomRing::new());
        assert!(ring.try_push(1));
        assert!(ring.try_push(2));

        let producer_ring = Arc::clone(&ring);
        let producer = thread::spawn(move || {
            producer_ring.try_push(3);
        });

        let consumer_ring = Arc::clone(&ring);
        let consumer = thread::spawn(move || {
            consumer_ring.try_pop();
        });

        producer.join().unwrap();
        consumer.join().unwrap();

        assert!(ring.size() <= ring.capacity);
    });
}
