//! Multi-worker job/result pipeline built from two queues.

use seqring::Queue;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const NUM_WORKERS: usize = 4;
const NUM_JOBS: usize = 20;

fn main() {
    let jobs = Arc::new(Queue::<String, 128>::new());
    let results = Arc::new(Queue::<String, 128>::new());

    let jobs_tx = jobs.clone();
    let producer = thread::spawn(move || {
        for i in 0..NUM_JOBS {
            let mut job = format!("job-{:02}", i);
            println!("enqueuing {}", job);
            while let Err(e) = jobs_tx.try_push(job) {
                job = e.0;
                thread::yield_now();
            }
            thread::sleep(Duration::from_millis(50));
        }
        println!("all jobs enqueued");
    });

    let mut workers = vec![];
    for worker_id in 0..NUM_WORKERS {
        let jobs_rx = jobs.clone();
        let results_tx = results.clone();

        workers.push(thread::spawn(move || {
            let mut processed = 0;
            loop {
                match jobs_rx.try_pop() {
                    Ok(job) => {
                        println!("worker {} processing {}", worker_id, job);
                        thread::sleep(Duration::from_millis(200));

                        let mut result = format!("{} done by worker {}", job, worker_id);
                        while let Err(e) = results_tx.try_push(result) {
                            result = e.0;
                            thread::yield_now();
                        }
                        processed += 1;
                    }
                    Err(_) => {
                        thread::sleep(Duration::from_millis(10));
                        if jobs_rx.is_empty() && processed > 0 {
                            break;
                        }
                    }
                }
            }
            println!("worker {} finished ({} jobs)", worker_id, processed);
        }));
    }

    let results_rx = results.clone();
    let collector = thread::spawn(move || {
        let mut collected = 0;
        while collected < NUM_JOBS {
            match results_rx.try_pop() {
                Ok(result) => {
                    println!("result: {}", result);
                    collected += 1;
                }
                Err(_) => thread::yield_now(),
            }
        }
        println!("all results collected");
    });

    producer.join().unwrap();
    for worker in workers {
        worker.join().unwrap();
    }
    collector.join().unwrap();
}
