//! seqring - bounded MPMC FIFO queues with a shared non-blocking contract
//!
//! - [`Queue`]: lock-free sequence-stamped ring buffer; CAS slot claim,
//!   release-store publish, linearizable FIFO under any mix of producers
//!   and consumers
//! - [`MutexQueue`]: the same contract behind one mutex per cursor; kept as
//!   a semantic oracle for differential tests and a contention baseline
//! - `CAP` must be a nonzero power of two, checked at compile time
//!
//! Both queues are strictly non-blocking: `try_push` / `try_pop` return
//! immediately with [`PushError`] / [`PopError`] when the queue is observed
//! full / empty. Back-off on contention is caller policy.

#![warn(missing_docs)]

use core::fmt;

#[cfg(not(loom))]
pub(crate) use core::sync::atomic::{AtomicUsize, Ordering};
#[cfg(loom)]
pub(crate) use loom::sync::atomic::{AtomicUsize, Ordering};

#[cfg(not(loom))]
pub(crate) use std::sync::Mutex;
#[cfg(loom)]
pub(crate) use loom::sync::Mutex;

mod mutex_queue;
mod queue;

pub use mutex_queue::MutexQueue;
pub use queue::Queue;

/// Cache-line padded wrapper; keeps the two cursors on distinct lines.
#[repr(align(64))]
pub(crate) struct CachePadded<T> {
    pub(crate) value: T,
}

impl<T> CachePadded<T> {
    pub(crate) fn new(value: T) -> Self {
        CachePadded { value }
    }
}

/// Pause briefly while another thread finishes a claim we are waiting on.
#[inline]
pub(crate) fn backoff() {
    #[cfg(loom)]
    loom::thread::yield_now();
    #[cfg(not(loom))]
    core::hint::spin_loop();
}

/// Error returned by a failed `try_push`; hands the rejected item back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushError<T>(pub T);

impl<T> fmt::Display for PushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "queue is full")
    }
}

/// Error returned by a failed `try_pop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopError;

impl fmt::Display for PopError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "queue is empty")
    }
}
