//! Lock-free bounded MPMC queue over a sequence-stamped ring.

use core::cell::UnsafeCell;
use core::mem::MaybeUninit;

use crate::{backoff, AtomicUsize, CachePadded, Ordering, PopError, PushError};

/// One ring cell: a sequence stamp plus storage for a single payload.
///
/// For a cursor value `c` landing on this cell, `seq == c` means the cell is
/// free for the write claiming `c`, and `seq == c + 1` means the write has
/// published and the read claiming `c` may take the payload. Each reuse of
/// the cell advances the stamp by `CAP`, so a thread resuming after a long
/// stall can never match a stale lap.
struct Slot<T> {
    seq: AtomicUsize,
    value: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Slot<T> {
    fn new(seq: usize) -> Self {
        Slot {
            seq: AtomicUsize::new(seq),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }
}

// Slot synchronization is carried by `seq`; sharing only needs T: Send.
unsafe impl<T: Send> Send for Slot<T> {}
unsafe impl<T: Send> Sync for Slot<T> {}

/// Bounded lock-free MPMC FIFO queue.
///
/// Producers claim the write cursor with a CAS, fill the cell, and publish
/// with a release store of the cell's stamp. Consumers mirror that on the
/// read cursor and re-arm the cell for the next lap. Successful operations
/// are linearized in cursor order, so the queue is FIFO across any number
/// of producers and consumers.
///
/// All storage is allocated once in [`Queue::new`]; no allocation happens
/// afterwards. The queue is shared by reference (typically inside an `Arc`)
/// and cannot be cloned or moved while in use.
pub struct Queue<T, const CAP: usize> {
    buffer: Box<[Slot<T>; CAP]>,
    /// Write cursor; counts claimed pushes, monotonic.
    tail: CachePadded<AtomicUsize>,
    /// Read cursor; counts claimed pops, monotonic.
    head: CachePadded<AtomicUsize>,
}

impl<T, const CAP: usize> Queue<T, CAP> {
    const CAPACITY_OK: () = assert!(
        CAP > 0 && CAP.is_power_of_two(),
        "capacity must be a nonzero power of two"
    );
    const MASK: usize = CAP - 1;

    /// Create an empty queue. Capacity violations fail at compile time.
    pub fn new() -> Self {
        let () = Self::CAPACITY_OK;

        let mut slots = Vec::with_capacity(CAP);
        for i in 0..CAP {
            slots.push(Slot::new(i));
        }
        let buffer: Box<[Slot<T>; CAP]> = slots
            .into_boxed_slice()
            .try_into()
            .unwrap_or_else(|_| panic!("capacity mismatch"));

        Queue {
            buffer,
            tail: CachePadded::new(AtomicUsize::new(0)),
            head: CachePadded::new(AtomicUsize::new(0)),
        }
    }

    /// Try to append `item` at the tail.
    ///
    /// Returns `Err` with the item untouched if the queue is observed full.
    /// Never blocks; retries internally only while other threads are making
    /// progress on the same cell.
    pub fn try_push(&self, item: T) -> Result<(), PushError<T>> {
        let mut pos = self.tail.value.load(Ordering::Relaxed);
        loop {
            let slot = &self.buffer[pos & Self::MASK];
            let seq = slot.seq.load(Ordering::Acquire);
            let diff = seq.wrapping_sub(pos) as isize;

            if diff == 0 {
                // Cell is free for this lap; claim the cursor.
                match self.tail.value.compare_exchange_weak(
                    pos,
                    pos.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        unsafe { (*slot.value.get()).write(item) };
                        // Publish: pairs with the acquire load in try_pop.
                        slot.seq.store(pos.wrapping_add(1), Ordering::Release);
                        return Ok(());
                    }
                    Err(current) => pos = current,
                }
            } else if diff < 0 {
                // Stamp is a lap behind: the matching pop has not re-armed
                // this cell yet. Full unless head has moved meanwhile.
                let head = self.head.value.load(Ordering::Acquire);
                if pos.wrapping_sub(head) >= CAP {
                    return Err(PushError(item));
                }
                backoff();
                pos = self.tail.value.load(Ordering::Relaxed);
            } else {
                // Another producer claimed this cell first.
                pos = self.tail.value.load(Ordering::Relaxed);
            }
        }
    }

    /// Try to take the item at the head.
    ///
    /// Returns `Err` if the queue is observed empty. Never blocks.
    pub fn try_pop(&self) -> Result<T, PopError> {
        let mut pos = self.head.value.load(Ordering::Relaxed);
        loop {
            let slot = &self.buffer[pos & Self::MASK];
            let seq = slot.seq.load(Ordering::Acquire);
            let diff = seq.wrapping_sub(pos.wrapping_add(1)) as isize;

            if diff == 0 {
                // Cell is published for this lap; claim the cursor.
                match self.head.value.compare_exchange_weak(
                    pos,
                    pos.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        let value = unsafe { (*slot.value.get()).assume_init_read() };
                        // Re-arm the cell for the push one lap ahead.
                        slot.seq.store(pos.wrapping_add(CAP), Ordering::Release);
                        return Ok(value);
                    }
                    Err(current) => pos = current,
                }
            } else if diff < 0 {
                // Nothing published here yet. Empty unless tail has moved.
                let tail = self.tail.value.load(Ordering::Acquire);
                if tail.wrapping_sub(pos) as isize <= 0 {
                    return Err(PopError);
                }
                backoff();
                pos = self.head.value.load(Ordering::Relaxed);
            } else {
                // Another consumer claimed this cell first.
                pos = self.head.value.load(Ordering::Relaxed);
            }
        }
    }

    /// Number of items in the queue.
    ///
    /// Approximate under concurrency: in-flight operations can skew the
    /// value either way, but it never exceeds `CAP` and never underflows.
    /// Exact once the queue is quiescent.
    pub fn len(&self) -> usize {
        // Tail first: head only grows, so a later head read can only shrink
        // the difference below the true bound.
        let tail = self.tail.value.load(Ordering::Acquire);
        let head = self.head.value.load(Ordering::Acquire);
        let diff = tail.wrapping_sub(head) as isize;
        if diff > 0 {
            diff as usize
        } else {
            0
        }
    }

    /// Whether the queue is empty. Approximate, like [`Queue::len`].
    pub fn is_empty(&self) -> bool {
        let head = self.head.value.load(Ordering::Acquire);
        let tail = self.tail.value.load(Ordering::Acquire);
        tail.wrapping_sub(head) as isize <= 0
    }

    /// Fixed capacity of the queue.
    pub const fn capacity(&self) -> usize {
        CAP
    }
}

impl<T, const CAP: usize> Default for Queue<T, CAP> {
    fn default() -> Self {
        Self::new()
    }
}

// The slot protocol makes concurrent shared access safe for T: Send.
unsafe impl<T: Send, const CAP: usize> Send for Queue<T, CAP> {}
unsafe impl<T: Send, const CAP: usize> Sync for Queue<T, CAP> {}

impl<T, const CAP: usize> Drop for Queue<T, CAP> {
    fn drop(&mut self) {
        // Exclusive access: every cell in [head, tail) holds a live payload.
        let head = self.head.value.load(Ordering::Relaxed);
        let tail = self.tail.value.load(Ordering::Relaxed);

        let mut pos = head;
        while pos != tail {
            let slot = &mut self.buffer[pos & Self::MASK];
            unsafe { slot.value.get_mut().assume_init_drop() };
            pos = pos.wrapping_add(1);
        }
    }
}
