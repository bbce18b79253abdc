// Lock-free bounded single-producer / multi-consumer (SPMC) queue.
//
// The producer never loops: it checks for room, fills the slot and publishes
// it with one release increment of the write position. Consumers copy the slot
// optimistically and then race to advance the read position with
// compare-and-swap; the winner keeps its copy, the losers start over.

use crate::error::{PopError, PushError};
use crate::platform::{AtomicBool, Ordering};
use crate::ring::{Approximate, Counting, RingState};
use crate::{RingProducer, RingQueue};
use std::{cell::Cell, fmt, marker::PhantomData};
use tracing::{debug, trace};

/*──────────────────────────────────────────────────────────────────────────*/
/*  Ring header                                                             */
/*──────────────────────────────────────────────────────────────────────────*/

pub struct SpmcQueue<T, C: Counting = Approximate> {
   ring          : RingState<T, C>,
   producer_taken: AtomicBool, // set while a `Producer` handle is alive
}

// SAFETY: values move between threads through the ring, and each published
// value is claimed by exactly one consumer.
unsafe impl<T: Send, C: Counting> Send for SpmcQueue<T, C> {}
unsafe impl<T: Send, C: Counting> Sync for SpmcQueue<T, C> {}

/// The one handle allowed to push into a [`SpmcQueue`].
///
/// It can be sent to another thread but not shared, so pushes never overlap.
/// Dropping it lets [`SpmcQueue::producer`] hand out a new one.
pub struct Producer<'a, T, C: Counting = Approximate> {
   queue    : &'a SpmcQueue<T, C>,
   _not_sync: PhantomData<Cell<()>>,
}

// SAFETY: moving the handle moves the producer role with it.
unsafe impl<T: Send, C: Counting> Send for Producer<'_, T, C> {}

/*─────────────────────────────  constructor  ──────────────────────────────*/

impl<T, C: Counting> SpmcQueue<T, C> {
   /// Build a queue with `slots` slots, of which `slots - 1` are usable.
   ///
   /// # Panics
   /// If `slots` is smaller than 2 or not a power of two.
   pub fn with_capacity(slots: usize) -> Self {
      Self::starting_at(slots, 0)
   }

   pub(crate) fn starting_at(slots: usize, origin: usize) -> Self {
      let ring = RingState::new(slots, origin);
      debug!(slots, counting = C::NAME, "spmc queue created");
      Self {
         ring,
         producer_taken: AtomicBool::new(false),
      }
   }
}

/*───────────────────────────────  producer  ───────────────────────────────*/

impl<T, C: Counting> SpmcQueue<T, C> {
   /// Take the producer role. `None` while another handle is alive.
   pub fn producer(&self) -> Option<Producer<'_, T, C>> {
      // Acquire pairs with the previous handle's release in `drop`, so a new
      // producer sees every write position the old one stored.
      if self.producer_taken.swap(true, Ordering::Acquire) {
         return None;
      }
      Some(Producer {
         queue: self,
         _not_sync: PhantomData,
      })
   }

   /// Enqueue `item` without going through a [`Producer`].
   ///
   /// # Safety
   /// No other call to `push_unchecked` or [`Producer::push`] may run at the
   /// same time. Sequential calls from different threads need their own
   /// happens-before edge (a join, a channel, a lock).
   #[inline]
   pub unsafe fn push_unchecked(&self, item: T) -> Result<(), PushError<T>> {
      // Only this thread moves `write`.
      let write = self.ring.write.load(Ordering::Relaxed);
      // Acquire pairs with the consumers' claim so their reads of the slot we
      // may be about to reuse are finished.
      let read = self.ring.read.load(Ordering::Acquire);

      if self.ring.is_full(write, read) {
         trace!(write, read, "push rejected: queue full");
         return Err(PushError(item));
      }

      // `write` is unpublished and the full check guarantees that the
      // element previously stored in this slot has been claimed.
      self.ring.write_slot(write, item);

      // Publication point.
      self.ring.write.fetch_add(1, Ordering::Release);

      C::record_push(&self.ring.count);
      Ok(())
   }
}

/*───────────────────────────────  consumer  ───────────────────────────────*/

impl<T, C: Counting> SpmcQueue<T, C> {
   /// Claim the oldest published element.
   ///
   /// Any number of threads may call this concurrently. The retry loop only
   /// repeats when another consumer claimed the element first.
   #[inline]
   pub fn pop(&self) -> Result<T, PopError> {
      loop {
         let read = self.ring.read.load(Ordering::Acquire);
         let write = self.ring.write.load(Ordering::Acquire);

         if read == write {
            trace!(read, "pop: queue empty");
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
               // SAFETY: `read` was published before we loaded `write`, and
               // the producer cannot reuse its slot until `read` moved past
               // it, which our successful claim just did.
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

impl<T, C: Counting> SpmcQueue<T, C> {
   /// Best-effort element count. With [`Approximate`] the two positions are
   /// read separately and the result can be off while others push or pop.
   pub fn size(&self) -> usize {
      self.ring.size()
   }

   /// Best-effort capacity check for callers. `push` performs its own check.
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

/*───────────────────────────  producer handle  ────────────────────────────*/

impl<T, C: Counting> Producer<'_, T, C> {
   /// Enqueue `item`, handing it back if the queue is full.
   #[inline]
   pub fn push(&self, item: T) -> Result<(), PushError<T>> {
      // SAFETY: this handle is unique and `!Sync`, so no other push runs.
      unsafe { self.queue.push_unchecked(item) }
   }

   /// The queue this handle pushes into.
   pub fn queue(&self) -> &SpmcQueue<T, C> {
      self.queue
   }
}

impl<T, C: Counting> Drop for Producer<'_, T, C> {
   fn drop(&mut self) {
      self.queue.producer_taken.store(false, Ordering::Release);
   }
}

/*──────────────────────────────  trait glue  ──────────────────────────────*/

impl<T: Send, C: Counting> RingProducer<T> for Producer<'_, T, C> {
   fn push(&self, item: T) -> Result<(), PushError<T>> {
      Producer::push(self, item)
   }
}

impl<T: Send, C: Counting> RingQueue<T> for SpmcQueue<T, C> {
   fn pop(&self) -> Result<T, PopError> {
      SpmcQueue::pop(self)
   }

   fn size(&self) -> usize {
      SpmcQueue::size(self)
   }

   fn full(&self) -> bool {
      SpmcQueue::full(self)
   }

   fn empty(&self) -> bool {
      SpmcQueue::empty(self)
   }

   fn capacity(&self) -> usize {
      SpmcQueue::capacity(self)
   }
}

impl<T, C: Counting> fmt::Debug for SpmcQueue<T, C> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("SpmcQueue")
         .field("slots", &self.ring.slots())
         .field("counting", &C::NAME)
         .field("write", &self.ring.write.load(Ordering::Relaxed))
         .field("read", &self.ring.read.load(Ordering::Relaxed))
         .field("size", &self.size())
         .finish()
   }
}

impl<T, C: Counting> fmt::Debug for Producer<'_, T, C> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_tuple("Producer").field(self.queue).finish()
   }
}
