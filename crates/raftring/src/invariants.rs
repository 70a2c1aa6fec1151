//! Debug assertion macros for this crate's core invariants: bounded
//! occupancy, write-finished terminality, gate non-reentrancy, and
//! peek/recycle pairing. Only active in debug builds
//! (`#[cfg(debug_assertions)]`), so there is zero overhead in release
//! builds.

// =============================================================================
// Bounded occupancy
// =============================================================================

/// `0 <= size <= capacity` and `size + space_avail == capacity`.
macro_rules! debug_assert_bounded_occupancy {
    ($size:expr, $capacity:expr) => {
        debug_assert!(
            $size <= $capacity,
            "bounded occupancy violated: size {} exceeds capacity {}",
            $size,
            $capacity
        )
    };
}

// =============================================================================
// write-finished is terminal
// =============================================================================

/// Once `write_finished` is set, no further producer mutation should occur.
macro_rules! debug_assert_not_finished {
    ($write_finished:expr) => {
        debug_assert!(
            !$write_finished,
            "producer mutation occurred after write_finished was set"
        )
    };
}

// =============================================================================
// Gate occupancy: at most one producer and one consumer inside at a time
// =============================================================================

/// The gate is a two-party agreement; re-entering the same side twice
/// without exiting indicates a bug in the calling operation.
macro_rules! debug_assert_gate_not_reentered {
    ($already_inside:expr, $op:expr) => {
        debug_assert!(
            !$already_inside,
            "gate invariant violated: {:?} entered the gate while already inside",
            $op
        )
    };
}

// =============================================================================
// Peek/recycle pairing
// =============================================================================

/// A peeked item must be resolved (consumed or dropped) before the next
/// consumer-side gate entry.
macro_rules! debug_assert_no_dangling_peek {
    ($peek_outstanding:expr) => {
        debug_assert!(
            !$peek_outstanding,
            "consumer entered the gate with an unresolved peek still outstanding"
        )
    };
}

pub(crate) use debug_assert_bounded_occupancy;
pub(crate) use debug_assert_gate_not_reentered;
pub(crate) use debug_assert_no_dangling_peek;
pub(crate) use debug_assert_not_finished;
