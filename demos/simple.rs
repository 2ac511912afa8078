//! Minimal two-thread usage example.

use seqring::Queue;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn main() {
    // A queue with 16 slots, shared between one producer and one consumer.
    let queue = Arc::new(Queue::<String, 16>::new());

    let producer_queue = queue.clone();
    let consumer_queue = queue.clone();

    let producer = thread::spawn(move || {
        for i in 0..10 {
            let mut message = format!("message {}", i);
            println!("pushing:  {}", message);

            // Full queue: hand the message back and retry after a yield.
            while let Err(e) = producer_queue.try_push(message) {
                message = e.0;
                thread::yield_now();
            }

            // Small delay so the output stays readable.
            thread::sleep(Duration::from_millis(100));
        }
        println!("producer finished");
    });

    let consumer = thread::spawn(move || {
        for _ in 0..10 {
            loop {
                match consumer_queue.try_pop() {
                    Ok(message) => {
                        println!("received: {}", message);
                        break;
                    }
                    Err(_) => thread::yield_now(),
                }
            }
        }
        println!("consumer finished");
    });

    producer.join().unwrap();
    consumer.join().unwrap();
}
