//! Head-to-head wall-clock comparison: lock-free ring vs two-lock queue.
//!
//! Producer and consumer counts step through 1/1, 2/2, 4/4 and 6/6 with a
//! cache-line-sized payload. Workers wrap the non-blocking operations in a
//! cooperative yield loop, so the queue itself never sleeps.

use seqring::{MutexQueue, PushError, Queue};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const OPS_PER_THREAD: usize = 1_000_000;
const QUEUE_SIZE: usize = 1024;

/// One cache line of payload, so throughput numbers reflect data movement
/// rather than pointer-sized toys.
#[derive(Clone, Copy)]
struct TestData {
    value: u64,
    _padding: [u8; 56],
}

impl TestData {
    fn new(value: u64) -> Self {
        TestData {
            value,
            _padding: [0; 56],
        }
    }
}

struct BenchResult {
    name: String,
    duration: Duration,
    ops_per_sec: f64,
    mb_per_sec: f64,
}

fn main() {
    println!("Lock-free MPMC queue vs two-lock queue");
    println!(
        "queue capacity: {}, ops per producer thread: {}\n",
        QUEUE_SIZE, OPS_PER_THREAD
    );

    println!("┌──────────────────────────────┬──────────────┬──────────────────┬──────────────┐");
    println!("│ Scenario                     │ Time (ms)    │ Throughput       │ Data rate    │");
    println!("├──────────────────────────────┼──────────────┼──────────────────┼──────────────┤");

    for &(producers, consumers) in &[(1, 1), (2, 2), (4, 4), (6, 6)] {
        print_row(run_lock_free(producers, consumers));
        print_row(run_two_lock(producers, consumers));
    }

    println!("└──────────────────────────────┴──────────────┴──────────────────┴──────────────┘");
}

fn print_row(r: BenchResult) {
    println!(
        "│ {:<28} │ {:>12.2} │ {:>11.2} Mops │ {:>7.2} MB/s │",
        r.name,
        r.duration.as_secs_f64() * 1000.0,
        r.ops_per_sec / 1_000_000.0,
        r.mb_per_sec
    );
}

fn run_lock_free(producers: usize, consumers: usize) -> BenchResult {
    let queue = Arc::new(Queue::<TestData, QUEUE_SIZE>::new());
    let push_count = Arc::new(AtomicUsize::new(0));
    let pop_count = Arc::new(AtomicUsize::new(0));

    let total_ops = producers * OPS_PER_THREAD;
    let ops_per_consumer = total_ops / consumers;

    let start = Instant::now();
    let mut handles = vec![];

    for p in 0..producers {
        let q = queue.clone();
        let pushed = push_count.clone();
        handles.push(thread::spawn(move || {
            for i in 0..OPS_PER_THREAD {
                let mut item = TestData::new((p * OPS_PER_THREAD + i) as u64);
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
            pushed.fetch_add(OPS_PER_THREAD, Ordering::Relaxed);
        }));
    }

    for _ in 0..consumers {
        let q = queue.clone();
        let popped = pop_count.clone();
        handles.push(thread::spawn(move || {
            let mut received = 0usize;
            let mut checksum = 0u64;
            while received < ops_per_consumer {
                match q.try_pop() {
                    Ok(data) => {
                        checksum = checksum.wrapping_add(data.value);
                        received += 1;
                    }
                    Err(_) => thread::yield_now(),
                }
            }
            popped.fetch_add(received, Ordering::Relaxed);
            std::hint::black_box(checksum);
        }));
    }

    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(push_count.load(Ordering::Relaxed), total_ops);
    assert_eq!(pop_count.load(Ordering::Relaxed), total_ops);

    finish(format!("lock-free ({}P/{}C)", producers, consumers), start, total_ops)
}

fn run_two_lock(producers: usize, consumers: usize) -> BenchResult {
    let queue = Arc::new(MutexQueue::<TestData, QUEUE_SIZE>::new());
    let push_count = Arc::new(AtomicUsize::new(0));
    let pop_count = Arc::new(AtomicUsize::new(0));

    let total_ops = producers * OPS_PER_THREAD;
    let ops_per_consumer = total_ops / consumers;

    let start = Instant::now();
    let mut handles = vec![];

    for p in 0..producers {
        let q = queue.clone();
        let pushed = push_count.clone();
        handles.push(thread::spawn(move || {
            for i in 0..OPS_PER_THREAD {
                let mut item = TestData::new((p * OPS_PER_THREAD + i) as u64);
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
            pushed.fetch_add(OPS_PER_THREAD, Ordering::Relaxed);
        }));
    }

    for _ in 0..consumers {
        let q = queue.clone();
        let popped = pop_count.clone();
        handles.push(thread::spawn(move || {
            let mut received = 0usize;
            let mut checksum = 0u64;
            while received < ops_per_consumer {
                match q.try_pop() {
                    Ok(data) => {
                        checksum = checksum.wrapping_add(data.value);
                        received += 1;
                    }
                    Err(_) => thread::yield_now(),
                }
            }
            popped.fetch_add(received, Ordering::Relaxed);
            std::hint::black_box(checksum);
        }));
    }

    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(push_count.load(Ordering::Relaxed), total_ops);
    assert_eq!(pop_count.load(Ordering::Relaxed), total_ops);

    finish(format!("two-lock  ({}P/{}C)", producers, consumers), start, total_ops)
}

fn finish(name: String, start: Instant, total_ops: usize) -> BenchResult {
    let duration = start.elapsed();
    // A push and its matching pop both count as operations.
    let ops_per_sec = (total_ops * 2) as f64 / duration.as_secs_f64();
    let mb_per_sec = ops_per_sec * std::mem::size_of::<TestData>() as f64 / (1024.0 * 1024.0);

    BenchResult {
        name,
        duration,
        ops_per_sec,
        mb_per_sec,
    }
}
