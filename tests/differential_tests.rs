//! Side-by-side runs of the lock-free queue and the two-lock queue: both
//! must satisfy the same contract and produce identical observable output.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use seqring::{MutexQueue, PopError, PushError, Queue};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

// Stamp the same workload out for both implementations; the bodies must
// stay literally identical for the comparison to mean anything.
macro_rules! differential_suite {
    ($name:ident, $queue:ident) => {
        mod $name {
            use super::*;

            #[test]
            fn spsc_sequence_exact() {
                const COUNT: usize = 200_000;
                let q = Arc::new($queue::<usize, 1024>::new());
                let q_push = q.clone();
                let q_pop = q.clone();

                let producer = thread::spawn(move || {
                    for i in 0..COUNT {
                        let mut item = i;
                        loop {
                            match q_push.try_push(item) {
                                Ok(()) => break,
                                Err(PushError(back)) => {
                                    item = back;
                                    thread::yield_now();
                                }
                            }
                        }
                    }
                });

                let consumer = thread::spawn(move || {
                    for expected in 0..COUNT {
                        loop {
                            match q_pop.try_pop() {
                                Ok(value) => {
                                    assert_eq!(value, expected);
                                    break;
                                }
                                Err(PopError) => thread::yield_now(),
                            }
                        }
                    }
                });

                producer.join().unwrap();
                consumer.join().unwrap();
                assert!(q.is_empty());
            }

            #[test]
            fn mpmc_multiset_and_producer_order() {
                const PRODUCERS: usize = 4;
                const CONSUMERS: usize = 4;
                const PER_PRODUCER: usize = 50_000;
                const TOTAL: usize = PRODUCERS * PER_PRODUCER;

                let q = Arc::new($queue::<usize, 1024>::new());
                let popped = Arc::new(AtomicUsize::new(0));
                let mut producers = vec![];

                for p in 0..PRODUCERS {
                    let q = q.clone();
                    producers.push(thread::spawn(move || {
                        for i in 0..PER_PRODUCER {
                            let mut item = p * PER_PRODUCER + i;
                            loop {
                                match q.try_push(item) {
                                    Ok(()) => break,
                                    Err(PushError(back)) => {
                                        item = back;
                                        thread::yield_now();
                                    }
                                }
                            }
                        }
                    }));
                }

                let mut consumers = vec![];
                for _ in 0..CONSUMERS {
                    let q = q.clone();
                    let popped = popped.clone();
                    consumers.push(thread::spawn(move || {
                        let mut received = vec![];
                        loop {
                            match q.try_pop() {
                                Ok(value) => {
                                    received.push(value);
                                    popped.fetch_add(1, Ordering::Relaxed);
                                }
                                Err(PopError) => {
                                    if popped.load(Ordering::Relaxed) >= TOTAL {
                                        break;
                                    }
                                    thread::yield_now();
                                }
                            }
                        }
                        received
                    }));
                }

                for h in producers {
                    h.join().unwrap();
                }
                let streams: Vec<Vec<usize>> =
                    consumers.into_iter().map(|h| h.join().unwrap()).collect();

                // Identical multiset for both implementations: exactly 0..TOTAL.
                let mut merged: Vec<usize> = streams.iter().flatten().copied().collect();
                assert_eq!(merged.len(), TOTAL);
                merged.sort_unstable();
                for (i, v) in merged.iter().enumerate() {
                    assert_eq!(*v, i);
                }

                // Each producer's values arrive in push order within a stream.
                for stream in &streams {
                    let mut last = vec![None; PRODUCERS];
                    for &value in stream {
                        let p = value / PER_PRODUCER;
                        if let Some(prev) = last[p] {
                            assert!(value > prev);
                        }
                        last[p] = Some(value);
                    }
                }

                assert!(q.is_empty());
            }
        }
    };
}

differential_suite!(lock_free, Queue);
differential_suite!(two_lock, MutexQueue);

// Single-threaded, both queues fed the same seeded op stream must agree on
// every outcome, not just the final multiset.
#[test]
fn seeded_op_stream_agrees() {
    let mut rng = StdRng::seed_from_u64(0x5e9_1234);

    let lock_free = Queue::<u32, 16>::new();
    let two_lock = MutexQueue::<u32, 16>::new();

    for step in 0..10_000u32 {
        if rng.gen_bool(0.55) {
            let a = lock_free.try_push(step);
            let b = two_lock.try_push(step);
            assert_eq!(a, b, "push outcome diverged at step {}", step);
        } else {
            let a = lock_free.try_pop();
            let b = two_lock.try_pop();
            assert_eq!(a, b, "pop outcome diverged at step {}", step);
        }
        assert_eq!(lock_free.len(), two_lock.len());
        assert_eq!(lock_free.is_empty(), two_lock.is_empty());
    }

    loop {
        let a = lock_free.try_pop();
        let b = two_lock.try_pop();
        assert_eq!(a, b);
        if a.is_err() {
            break;
        }
    }
}
