// Shared state of one ring: the slot buffer, the write and read positions and
// the optional exact counter. The queue variants drive all mutation; this type
// only hands out slots and answers the diagnostic queries.

use super::count::Counting;
use super::index;
use crate::platform::{AtomicUsize, Ordering, UnsafeCell};
use crossbeam::utils::CachePadded;
use std::{mem::MaybeUninit, ptr};

/*──────────────────────────────────────────────────────────────────────────*/
/*  Ring state                                                              */
/*──────────────────────────────────────────────────────────────────────────*/

pub(crate) struct RingState<T, C: Counting> {
   buffer: Box<[UnsafeCell<MaybeUninit<T>>]>,  // N slots, one always free
   mask  : usize,                              // N − 1
   /// One past the last reserved element. Producers only.
   pub(crate) write: CachePadded<AtomicUsize>,
   /// Next element to claim. Consumers only, via compare-and-swap.
   pub(crate) read : CachePadded<AtomicUsize>,
   pub(crate) count: C::Counter,
}

/*─────────────────────────────  constructor  ──────────────────────────────*/

impl<T, C: Counting> RingState<T, C> {
   /// Allocate `slots` slots with both positions at `origin`.
   pub(crate) fn new(slots: usize, origin: usize) -> Self {
      assert!(slots >= 2, "a ring needs at least 2 slots, got {slots}");
      assert!(slots.is_power_of_two(), "slot count must be a power of two, got {slots}");

      let buffer = (0..slots)
         .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
         .collect::<Vec<_>>()
         .into_boxed_slice();

      Self {
         buffer,
         mask : slots - 1,
         write: CachePadded::new(AtomicUsize::new(origin)),
         read : CachePadded::new(AtomicUsize::new(origin)),
         count: C::counter(),
      }
   }

   #[inline(always)]
   pub(crate) fn slots(&self) -> usize {
      self.mask + 1
   }

   #[inline(always)]
   pub(crate) fn is_full(&self, write: usize, read: usize) -> bool {
      index::is_full(write, read, self.mask)
   }

   /// Elements between `read` and `write`, see `index::occupied`.
   #[inline(always)]
   pub(crate) fn occupied(&self, write: usize, read: usize) -> Option<usize> {
      index::occupied(write, read, self.mask)
   }

   /// Usable capacity, N − 1.
   #[inline(always)]
   pub(crate) fn usable(&self) -> usize {
      self.mask
   }
}

/*─────────────────────────────  slot access  ──────────────────────────────*/

impl<T, C: Counting> RingState<T, C> {
   #[inline(always)]
   fn cell(&self, pos: usize) -> &UnsafeCell<MaybeUninit<T>> {
      let slot = index::slot_of(pos, self.mask);
      // SAFETY: `slot <= mask < buffer.len()`.
      unsafe { self.buffer.get_unchecked(slot) }
   }

   /// Store `value` in the slot of `pos`. Whatever the slot held before is
   /// stale and is overwritten without being dropped.
   ///
   /// # Safety
   /// The caller must own `pos`: it is reserved for this producer and not yet
   /// published, and every consumer that claimed `pos - slots` has finished
   /// reading.
   #[inline]
   pub(crate) unsafe fn write_slot(&self, pos: usize, value: T) {
      self.cell(pos).with_mut(|slot| unsafe {
         (*slot).write(value);
      });
   }

   /// Speculative bitwise copy of the slot of `pos`.
   ///
   /// # Safety
   /// The result may only be assumed initialised once the caller has claimed
   /// `pos`. Until then a producer may be overwriting the slot; the copy uses
   /// a volatile read, as crossbeam's seqlock fallback does, and an unclaimed
   /// copy must be discarded without being dropped.
   #[inline]
   pub(crate) unsafe fn read_slot(&self, pos: usize) -> MaybeUninit<T> {
      self.cell(pos).with(|slot| unsafe { ptr::read_volatile(slot) })
   }
}

/*─────────────────────────────  diagnostics  ──────────────────────────────*/

impl<T, C: Counting> RingState<T, C> {
   pub(crate) fn size(&self) -> usize {
      if let Some(n) = C::exact(&self.count) {
         return n;
      }
      // Two independent loads, not a snapshot.
      let write = self.write.load(Ordering::Relaxed);
      let read = self.read.load(Ordering::Relaxed);
      index::distance(write, read, self.slots())
   }

   pub(crate) fn full(&self) -> bool {
      if let Some(n) = C::exact(&self.count) {
         return n >= self.mask;
      }
      let write = self.write.load(Ordering::Relaxed);
      let read = self.read.load(Ordering::Relaxed);
      self.is_full(write, read)
   }

   pub(crate) fn empty(&self) -> bool {
      if let Some(n) = C::exact(&self.count) {
         return n == 0;
      }
      let write = self.write.load(Ordering::Relaxed);
      let read = self.read.load(Ordering::Relaxed);
      index::is_empty(write, read)
   }
}

/*─────────────────────────────────  drop  ─────────────────────────────────*/

impl<T, C: Counting> Drop for RingState<T, C> {
   fn drop(&mut self) {
      if !std::mem::needs_drop::<T>() {
         return;
      }
      // With `&mut self` every reservation has been published, so
      // `[read, write)` is exactly the set of unread elements.
      let mut pos = self.read.load(Ordering::Relaxed);
      let end = self.write.load(Ordering::Relaxed);
      while pos != end {
         // SAFETY: positions in `[read, write)` hold initialised values that
         // no consumer has moved out.
         self.cell(pos).with_mut(|slot| unsafe { (*slot).assume_init_drop() });
         pos = pos.wrapping_add(1);
      }
   }
}
