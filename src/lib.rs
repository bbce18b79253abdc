//! Fixed-capacity, array-backed, lock-free queues.
//!
//! Every queue in this crate shares one ring of pre-allocated slots and two
//! monotonically increasing positions. Producers publish a slot by advancing
//! the write position; consumers race with compare-and-swap on the read
//! position to claim the next unread slot. Nothing blocks and nothing is
//! allocated after construction.
//!
//! * [`SpmcQueue`] - one producer at a time, holding the queue's
//!   [`spmc::Producer`] handle, and any number of consumers.
//! * [`MpmcQueue`] - producers reserve a slot with compare-and-swap, then
//!   commit it in reservation order.
//!
//! Both are generic over a [`Counting`] policy: [`Approximate`] derives
//! `size` from the two positions, [`Exact`] keeps an extra atomic counter.

pub mod error;
pub mod ring;
pub mod spmc;

pub use error::{PopError, PushError};
pub use ring::{Approximate, Counting, Exact};
pub use spmc::{MpmcQueue, Producer, SpmcQueue};

/// Consumer side and diagnostics, shared by every queue.
pub trait RingQueue<T: Send>: Send + Sync {
   /// Claim the oldest committed element.
   fn pop(&self) -> Result<T, PopError>;

   /// Number of stored elements. Best effort under concurrent use.
   fn size(&self) -> usize;
   /// True when a subsequent `push` would *probably* fail.
   fn full(&self) -> bool;
   /// True when a subsequent `pop` would *probably* fail.
   fn empty(&self) -> bool;
   /// Maximum number of elements the queue can hold.
   fn capacity(&self) -> usize;
}

/// Producer side: whatever may push into a queue.
pub trait RingProducer<T: Send> {
   /// Enqueue `item`, handing it back if the queue is full.
   fn push(&self, item: T) -> Result<(), PushError<T>>;
}

// Under `--cfg loom` the atomics and the slot cells are swapped for loom's
// model-checked ones, so a slot read that is not ordered after its write fails
// the model.
#[cfg(not(loom))]
pub(crate) mod platform {
   pub use core::sync::atomic::{AtomicBool, AtomicIsize, AtomicUsize, Ordering};

   /// `std::cell::UnsafeCell` behind loom's closure-based access API.
   pub struct UnsafeCell<T>(core::cell::UnsafeCell<T>);

   impl<T> UnsafeCell<T> {
      #[inline(always)]
      pub fn new(data: T) -> Self {
         Self(core::cell::UnsafeCell::new(data))
      }

      #[inline(always)]
      pub fn with<R>(&self, f: impl FnOnce(*const T) -> R) -> R {
         f(self.0.get())
      }

      #[inline(always)]
      pub fn with_mut<R>(&self, f: impl FnOnce(*mut T) -> R) -> R {
         f(self.0.get())
      }
   }

   /// Wait a little before retrying a step owned by another thread.
   #[inline]
   pub fn snooze(backoff: &crossbeam::utils::Backoff) {
      backoff.snooze();
   }

   /// Back off after losing a race that another thread already won.
   #[inline]
   pub fn spin(backoff: &crossbeam::utils::Backoff) {
      backoff.spin();
   }
}

#[cfg(loom)]
pub(crate) mod platform {
   pub use loom::cell::UnsafeCell;
   pub use loom::sync::atomic::{AtomicBool, AtomicIsize, AtomicUsize, Ordering};

   #[inline]
   pub fn snooze(_backoff: &crossbeam::utils::Backoff) {
      loom::thread::yield_now();
   }

   #[inline]
   pub fn spin(_backoff: &crossbeam::utils::Backoff) {
      loom::thread::yield_now();
   }
}
