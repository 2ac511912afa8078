//! Two-lock reference queue: same contract as the lock-free ring, with one
//! mutex guarding each cursor.

use core::cell::UnsafeCell;
use core::mem::MaybeUninit;
use std::sync::PoisonError;

use crate::{AtomicUsize, CachePadded, Mutex, Ordering, PopError, PushError};

/// Bounded two-lock MPMC FIFO queue.
///
/// Producers serialize on the tail lock, consumers on the head lock; the two
/// sides only meet through the atomic cursors, which let the holder of one
/// lock compute full/empty without taking the other. The observable behavior
/// matches [`Queue`](crate::Queue), which is what makes it usable as an
/// oracle in differential tests and as the benchmark baseline.
pub struct MutexQueue<T, const CAP: usize> {
    buffer: Box<[UnsafeCell<MaybeUninit<T>>; CAP]>,
    tail_lock: CachePadded<Mutex<()>>,
    /// Write cursor; stored atomically so consumers can read it lock-free.
    tail: AtomicUsize,
    head_lock: CachePadded<Mutex<()>>,
    /// Read cursor; stored atomically so producers can read it lock-free.
    head: AtomicUsize,
}

impl<T, const CAP: usize> MutexQueue<T, CAP> {
    const CAPACITY_OK: () = assert!(
        CAP > 0 && CAP.is_power_of_two(),
        "capacity must be a nonzero power of two"
    );
    const MASK: usize = CAP - 1;

    /// Create an empty queue. Capacity violations fail at compile time.
    pub fn new() -> Self {
        let () = Self::CAPACITY_OK;

        let mut cells = Vec::with_capacity(CAP);
        for _ in 0..CAP {
            cells.push(UnsafeCell::new(MaybeUninit::uninit()));
        }
        let buffer: Box<[UnsafeCell<MaybeUninit<T>>; CAP]> = cells
            .into_boxed_slice()
            .try_into()
            .unwrap_or_else(|_| panic!("capacity mismatch"));

        MutexQueue {
            buffer,
            tail_lock: CachePadded::new(Mutex::new(())),
            tail: AtomicUsize::new(0),
            head_lock: CachePadded::new(Mutex::new(())),
            head: AtomicUsize::new(0),
        }
    }

    /// Try to append `item` at the tail.
    ///
    /// Returns `Err` with the item untouched if the queue is full.
    pub fn try_push(&self, item: T) -> Result<(), PushError<T>> {
        let _tail_guard = self
            .tail_lock
            .value
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        if tail.wrapping_sub(head) >= CAP {
            return Err(PushError(item));
        }

        // The tail lock serializes producers, and the cell at `tail` is
        // outside [head, tail), so no consumer reads it until the release
        // store below publishes it.
        let slot = &self.buffer[tail & Self::MASK];
        unsafe { (*slot.get()).write(item) };

        self.tail.store(tail.wrapping_add(1), Ordering::Release);
        Ok(())
    }

    /// Try to take the item at the head.
    ///
    /// Returns `Err` if the queue is empty.
    pub fn try_pop(&self) -> Result<T, PopError> {
        let _head_guard = self
            .head_lock
            .value
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        if tail.wrapping_sub(head) as isize <= 0 {
            return Err(PopError);
        }

        // The head lock serializes consumers; the acquire load of `tail`
        // above pairs with the producer's release store, so the cell at
        // `head` is fully written.
        let slot = &self.buffer[head & Self::MASK];
        let value = unsafe { (*slot.get()).assume_init_read() };

        self.head.store(head.wrapping_add(1), Ordering::Release);
        Ok(value)
    }

    /// Number of items in the queue. Approximate under concurrency, exact
    /// once quiescent; never exceeds `CAP`, never underflows.
    pub fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Acquire);
        let diff = tail.wrapping_sub(head) as isize;
        if diff > 0 {
            diff as usize
        } else {
            0
        }
    }

    /// Whether the queue is empty. Approximate, like [`MutexQueue::len`].
    pub fn is_empty(&self) -> bool {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        tail.wrapping_sub(head) as isize <= 0
    }

    /// Fixed capacity of the queue.
    pub const fn capacity(&self) -> usize {
        CAP
    }
}

impl<T, const CAP: usize> Default for MutexQueue<T, CAP> {
    fn default() -> Self {
        Self::new()
    }
}

// The lock-plus-cursor protocol makes shared access safe for T: Send.
unsafe impl<T: Send, const CAP: usize> Send for MutexQueue<T, CAP> {}
unsafe impl<T: Send, const CAP: usize> Sync for MutexQueue<T, CAP> {}

impl<T, const CAP: usize> Drop for MutexQueue<T, CAP> {
    fn drop(&mut self) {
        // Exclusive access: every cell in [head, tail) holds a live payload.
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Relaxed);

        let mut pos = head;
        while pos != tail {
            let slot = &mut self.buffer[pos & Self::MASK];
            unsafe { slot.get_mut().assume_init_drop() };
            pos = pos.wrapping_add(1);
        }
    }
}
