//! Tests using the `loom` testing framework.
//!
//! Run with `RUSTFLAGS="--cfg loom" cargo test --profile loom --test loom`.
//!
//! Slot storage is a loom cell under `--cfg loom`, so every model here also
//! fails if a consumer can read a slot that is not ordered after the
//! producer's write of it. Models that reuse a slot run a single consumer: a
//! losing consumer's discarded copy may overlap the producer's rewrite, and
//! the cell reports that as a race.

#![cfg(loom)]

use loom::sync::Arc;
use loom::thread;

use spmc_queues::{Exact, MpmcQueue, SpmcQueue};

#[test]
fn loom_spmc_one_producer_two_consumers() {
   loom::model(|| {
      let queue = Arc::new(SpmcQueue::<usize>::with_capacity(4));

      let consumers: Vec<_> = (0..2)
         .map(|_| {
            let q = queue.clone();
            thread::spawn(move || q.pop().ok())
         })
         .collect();

      // the model's main thread is the producer
      let producer = queue.producer().unwrap();
      for i in 0..2 {
         while producer.push(i).is_err() {
            thread::yield_now();
         }
      }
      drop(producer);

      let mut seen: Vec<usize> = consumers
         .into_iter()
         .filter_map(|h| h.join().unwrap())
         .collect();
      while let Ok(v) = queue.pop() {
         seen.push(v);
      }
      seen.sort_unstable();
      assert_eq!(seen, vec![0, 1]);
   });
}

#[test]
fn loom_spmc_full_ring_reuse() {
   loom::model(|| {
      // two slots: the third push writes slot 0 again after the consumer
      // has read position 0 out of it
      let queue = Arc::new(SpmcQueue::<usize, Exact>::with_capacity(2));

      let consumer = {
         let q = queue.clone();
         thread::spawn(move || {
            let mut got = Vec::new();
            while got.len() < 3 {
               match q.pop() {
                  Ok(v) => got.push(v),
                  Err(_) => thread::yield_now(),
               }
            }
            got
         })
      };

      let producer = queue.producer().unwrap();
      for i in 0..3 {
         while producer.push(i).is_err() {
            thread::yield_now();
         }
      }
      drop(producer);

      assert_eq!(consumer.join().unwrap(), vec![0, 1, 2]);
      assert_eq!(queue.size(), 0);
   });
}

#[test]
fn loom_mpmc_two_producers_one_consumer() {
   loom::model(|| {
      let queue = Arc::new(MpmcQueue::<usize>::with_capacity(4));

      let producers: Vec<_> = (0..2)
         .map(|i| {
            let q = queue.clone();
            thread::spawn(move || {
               while q.push(i).is_err() {
                  thread::yield_now();
               }
            })
         })
         .collect();

      let consumer = {
         let q = queue.clone();
         thread::spawn(move || q.pop().ok())
      };

      for p in producers {
         p.join().unwrap();
      }
      let mut seen: Vec<usize> = consumer.join().unwrap().into_iter().collect();
      while let Ok(v) = queue.pop() {
         seen.push(v);
      }
      seen.sort_unstable();
      assert_eq!(seen, vec![0, 1]);
   });
}

#[test]
fn loom_mpmc_two_slot_ring_never_overfills() {
   loom::model(|| {
      let queue = Arc::new(MpmcQueue::<usize>::with_capacity(2));

      // the only consumer, and a producer racing the main thread for the
      // single usable slot
      let racer = {
         let q = queue.clone();
         thread::spawn(move || {
            let mut pending = Some(10);
            let mut got = Vec::new();
            while got.len() < 3 {
               if let Some(v) = pending {
                  if q.push(v).is_ok() {
                     pending = None;
                  }
               }
               if let Ok(v) = q.pop() {
                  got.push(v);
               }
               thread::yield_now();
            }
            got
         })
      };

      for v in [20, 21] {
         while queue.push(v).is_err() {
            thread::yield_now();
         }
      }

      let mut seen = racer.join().unwrap();
      seen.sort_unstable();
      assert_eq!(seen, vec![10, 20, 21]);
      assert!(queue.pop().is_err());
   });
}
