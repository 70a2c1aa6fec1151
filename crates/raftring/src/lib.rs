//! raftring — a lock-free single-producer/single-consumer bounded FIFO for
//! dataflow kernels running on separate threads.
//!
//! Each slot carries a payload and an out-of-band [`SignalCode`]
//! (end-of-stream, quit). Three storage disciplines ([`InlinePod`],
//! [`InlineClass`], [`External`]) select how a payload actually lives in a
//! slot, chosen as a type parameter on [`RingBufferCore`]; [`PodRing`],
//! [`ClassRing`], and [`ExternalRing`] name the common instantiations. An
//! external supervisor may grow or shrink the backing storage at runtime
//! through a lightweight resize gate without losing in-flight operations,
//! and a blocked end can optionally hand control to an injected
//! [`SchedulerHook`] once it has spun past a configurable preempt limit.
//!
//! # Example
//!
//! ```
//! use raftring::{PodRing, RingConfig, SignalCode};
//!
//! let ring: PodRing<u64> = PodRing::new(RingConfig::new(4, 1024, false)); // 16 slots
//! ring.push(Some(42), SignalCode::None);
//! let (value, signal) = ring.pop().unwrap();
//! assert_eq!(value, Some(42));
//! assert_eq!(signal, SignalCode::None);
//! ```
//!
//! # Storage disciplines
//!
//! ```
//! use raftring::{ClassRing, ExternalRing, RingConfig};
//!
//! struct Frame { bytes: Vec<u8> }
//!
//! let inline: ClassRing<Frame> = ClassRing::new(RingConfig::default());
//! let boxed: ExternalRing<Frame> = ExternalRing::new(RingConfig::default());
//! ```

mod backoff;
mod config;
mod discipline;
mod error;
mod gate;
mod invariants;
mod metrics;
mod pointer;
mod ring;
mod scheduler;
mod stack_ring;
mod stats;
mod storage;

pub use backoff::Backoff;
pub use config::{RingConfig, HIGH_THROUGHPUT_CONFIG, LOW_LATENCY_CONFIG};
pub use discipline::{Discipline, External, InlineClass, InlinePod};
pub use error::{ClosedPortAccessError, PeekRangeError};
pub use metrics::MetricsSnapshot;
pub use pointer::{Pointer, PointerSnapshot};
pub use ring::{AllocateGuard, Peeked, PeekGuard, PeekRangeGuard, RingBufferCore};
pub use scheduler::{RunState, SchedulerHook};
pub use stack_ring::StackRingBufferCore;
pub use stats::Blocked;
pub use storage::{KernelId, SignalCode};

/// A [`RingBufferCore`] for `T: Copy` payloads, stored by value with no
/// destructor.
pub type PodRing<T> = RingBufferCore<T, InlinePod<T>>;

/// A [`RingBufferCore`] for ordinary (non-`Copy`) payloads, stored by value.
pub type ClassRing<T> = RingBufferCore<T, InlineClass<T>>;

/// A [`RingBufferCore`] for payloads whose identity must survive the trip
/// through the queue unchanged, stored behind a `Box`.
pub type ExternalRing<T> = RingBufferCore<T, External<T>>;

/// A [`StackRingBufferCore`] for `T: Copy` payloads, embedded inline in the
/// struct with a compile-time-fixed capacity `N`.
pub type PodStackRing<T, const N: usize> = StackRingBufferCore<T, InlinePod<T>, N>;

/// A [`StackRingBufferCore`] for ordinary (non-`Copy`) payloads, embedded
/// inline with a compile-time-fixed capacity `N`.
pub type ClassStackRing<T, const N: usize> = StackRingBufferCore<T, InlineClass<T>, N>;
