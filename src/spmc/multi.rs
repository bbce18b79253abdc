// Lock-free bounded multi-producer / multi-consumer (MPMC) queue.
//
// Same ring and consumer protocol as `SpmcQueue`, but producers first reserve
// a position with compare-and-swap on the write position, fill the slot, and
// then commit it by advancing a third counter, the commit position. Consumers
// read up to the commit position, so a reserved but unfilled slot looks
// empty. Commits happen in reservation order: a producer whose predecessor has
// not committed yet waits for it.

use crate::error::{PopError, PushError};
use crate::platform::{self, AtomicUsize, Ordering};
use crate::ring::{Approximate, Counting, RingState};
use crate::{RingProducer, RingQueue};
use crossbeam::utils::{Backoff, CachePadded};
use std::fmt;
use tracing::{debug, trace};

/*──────────────────────────────────────────────────────────────────────────*/
/*  Ring header                                                             */
/*──────────────────────────────────────────────────────────────────────────*/

pub struct MpmcQueue<T, C: Counting = Approximate> {
   ring  : RingState<T, C>,
   commit: CachePadded<AtomicUsize>, // one past the last published element
}

// SAFETY: as for `SpmcQueue`; each reserved position has one producer and
// each committed position one successful consumer.
unsafe impl<T: Send, C: Counting> Send for MpmcQueue<T, C> {}
unsafe impl<T: Send, C: Counting> Sync for MpmcQueue<T, C> {}

/*─────────────────────────────  constructor  ──────────────────────────────*/

impl<T, C: Counting> MpmcQueue<T, C> {
   /// Build a queue with `slots` slots, of which `slots - 1` are usable.
   ///
   /// # Panics
   /// If `slots` is smaller than 2 or not a power of two.
   pub fn with_capacity(slots: usize) -> Self {
      Self::starting_at(slots, 0)
   }

   pub(crate) fn starting_at(slots: usize, origin: usize) -> Self {
      let ring = RingState::new(slots, origin);
      debug!(slots, counting = C::NAME, "mpmc queue created");
      Self {
         ring,
         commit: CachePadded::new(AtomicUsize::new(origin)),
      }
   }
}

/*───────────────────────────────  producer  ───────────────────────────────*/

impl<T, C: Counting> MpmcQueue<T, C> {
   /// Enqueue `item`. Safe to call from any number of threads.
   pub fn push(&self, item: T) -> Result<(), PushError<T>> {
      let write = match self.reserve() {
         Some(write) => write,
         None => return Err(PushError(item)),
      };

      // SAFETY: the reservation makes `write` ours, and it was granted
      // against a `read` no older than the `write` it reserved, so the
      // element previously stored in this slot has been claimed.
      unsafe { self.ring.write_slot(write, item) };

      self.commit(write);
      C::record_push(&self.ring.count);
      Ok(())
   }
}

/*───────────────────────────────  reserve  ────────────────────────────────*/

impl<T, C: Counting> MpmcQueue<T, C> {
   /// Claim the next write position, or `None` when the ring is full.
   fn reserve(&self) -> Option<usize> {
      let backoff = Backoff::new();
      loop {
         // Acquire pairs with the reserving CAS of the producer that stored
         // this value, so the `read` below is at least as new as the one
         // that producer checked against.
         let write = self.ring.write.load(Ordering::Acquire);
         let read = self.ring.read.load(Ordering::Acquire);

         match self.ring.occupied(write, read) {
            // consumers already passed our `write`; it is stale
            None => {
               platform::spin(&backoff);
               continue;
            }
            Some(n) if n == self.ring.usable() => {
               trace!(write, read, "push rejected: queue full");
               return None;
            }
            Some(_) => {}
         }

         if self
            .ring
            .write
            .compare_exchange(write, write.wrapping_add(1), Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
         {
            return Some(write);
         }
         platform::spin(&backoff);
      }
   }
}

/*────────────────────────────────  commit  ────────────────────────────────*/

impl<T, C: Counting> MpmcQueue<T, C> {
   /// Publish `write` once every earlier reservation has been published.
   fn commit(&self, write: usize) {
      let backoff = Backoff::new();
      while self
         .commit
         .compare_exchange_weak(write, write.wrapping_add(1), Ordering::Release, Ordering::Relaxed)
         .is_err()
      {
         trace!(position = write, "push: waiting for earlier producer to commit");
         platform::snooze(&backoff);
      }
   }
}

/*───────────────────────────────  consumer  ───────────────────────────────*/

impl<T, C: Counting> MpmcQueue<T, C> {
   /// Claim the oldest committed element. Safe to call from any number of
   /// threads.
   pub fn pop(&self) -> Result<T, PopError> {
      loop {
         let read = self.ring.read.load(Ordering::Acquire);
         let commit = self.commit.load(Ordering::Acquire);

         if read == commit {
            trace!(read, "pop: queue empty or commit pending");
            return Err(PopError);
         }

         // SAFETY: only assumed initialised after the claim below succeeds.
         let value = unsafe { self.ring.read_slot(read) };

         match self.ring.read.compare_exchange(
            read,
            read.wrapping_add(1),
            Ordering::AcqRel,
            Ordering::Relaxed,
         ) {
            Ok(_) => {
               C::record_pop(&self.ring.count);
               // SAFETY: `read` was committed before we loaded `commit`, and no
               // producer can reserve its slot again until `read` moves past it.
               return Ok(unsafe { value.assume_init() });
            }
            Err(current) => {
               trace!(expected = read, current, "pop: lost claim race");
            }
         }
      }
   }
}

/*─────────────────────────────  diagnostics  ──────────────────────────────*/

impl<T, C: Counting> MpmcQueue<T, C> {
   /// Best-effort element count, reservations included.
   pub fn size(&self) -> usize {
      self.ring.size()
   }

   pub fn full(&self) -> bool {
      self.ring.full()
   }

   pub fn empty(&self) -> bool {
      self.ring.empty()
   }

   /// Usable capacity: one less than the slot count.
   pub fn capacity(&self) -> usize {
      self.ring.slots() - 1
   }
}

/*──────────────────────────────  trait glue  ──────────────────────────────*/

impl<T: Send, C: Counting> RingProducer<T> for MpmcQueue<T, C> {
   fn push(&self, item: T) -> Result<(), PushError<T>> {
      MpmcQueue::push(self, item)
   }
}

impl<T: Send, C: Counting> RingQueue<T> for MpmcQueue<T, C> {
   fn pop(&self) -> Result<T, PopError> {
      MpmcQueue::pop(self)
   }

   fn size(&self) -> usize {
      MpmcQueue::size(self)
   }

   fn full(&self) -> bool {
      MpmcQueue::full(self)
   }

   fn empty(&self) -> bool {
      MpmcQueue::empty(self)
   }

   fn capacity(&self) -> usize {
      MpmcQueue::capacity(self)
   }
}

impl<T, C: Counting> fmt::Debug for MpmcQueue<T, C> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("MpmcQueue")
         .field("slots", &self.ring.slots())
         .field("counting", &C::NAME)
         .field("write", &self.ring.write.load(Ordering::Relaxed))
         .field("commit", &self.commit.load(Ordering::Relaxed))
         .field("read", &self.ring.read.load(Ordering::Relaxed))
         .field("size", &self.size())
         .finish()
   }
}
