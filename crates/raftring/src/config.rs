//! Construction-time configuration: a small `Copy` struct with a const-fn
//! constructor that panics on out-of-range values, plus a couple of named
//! presets.

/// Configuration for [`crate::ring::RingBufferCore::new`] and
/// [`crate::ring::RingBufferCore::with_scheduler`].
#[derive(Debug, Clone, Copy)]
pub struct RingConfig {
    /// Ring buffer size as a power of two (`capacity = 1 << capacity_bits`).
    pub capacity_bits: u8,
    /// How many failed-predicate iterations a blocking loop runs before
    /// consulting the scheduler hook (the "preempt escape").
    pub preempt_limit: u32,
    /// Whether to accumulate the supplemental `Metrics` counters (slight
    /// overhead; the `Blocked` stats in `stats.rs` are always collected).
    pub enable_metrics: bool,
}

impl RingConfig {
    /// Creates a new configuration.
    ///
    /// # Panics
    ///
    /// Panics if `capacity_bits` is `0` or greater than `20` (1M slots max,
    /// to prevent accidental unbounded allocation), or if `preempt_limit` is
    /// `0`.
    #[must_use]
    pub const fn new(capacity_bits: u8, preempt_limit: u32, enable_metrics: bool) -> Self {
        assert!(
            capacity_bits > 0 && capacity_bits <= 20,
            "capacity_bits must be between 1 and 20 (max 1M slots)"
        );
        assert!(preempt_limit > 0, "preempt_limit must be positive");
        Self {
            capacity_bits,
            preempt_limit,
            enable_metrics,
        }
    }

    /// The configured capacity, in slots.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        1 << self.capacity_bits
    }
}

impl Default for RingConfig {
    fn default() -> Self {
        Self::new(10, 1024, false) // 1024 slots
    }
}

/// Low-latency preset: a small ring that fits in L1 cache, with a short
/// preempt leash.
pub const LOW_LATENCY_CONFIG: RingConfig = RingConfig::new(6, 64, false);

/// High-throughput preset: a large ring, metrics enabled, a long preempt
/// leash so bursts don't thrash the scheduler hook.
pub const HIGH_THROUGHPUT_CONFIG: RingConfig = RingConfig::new(16, 4096, true);
