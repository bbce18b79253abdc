// Size-reporting policies.
//
// `Approximate` stores nothing and lets the ring derive its size from the two
// positions. `Exact` keeps an auxiliary counter that every successful push and
// pop adjusts after the fact. The counter is not coupled to the positions, so
// a pop can be recorded before the push that fed it; `size` clamps that
// transient negative value to zero.

use crate::platform::{AtomicIsize, Ordering};

mod sealed {
   pub trait Sealed {}
}

/// Selects how a queue answers `size` and `full`.
///
/// Implemented only by [`Approximate`] and [`Exact`].
pub trait Counting: sealed::Sealed + Send + Sync + 'static {
   #[doc(hidden)]
   type Counter: Send + Sync;

   /// Human-readable name, used in logs.
   const NAME: &'static str;

   #[doc(hidden)]
   fn counter() -> Self::Counter;
   #[doc(hidden)]
   fn record_push(counter: &Self::Counter);
   #[doc(hidden)]
   fn record_pop(counter: &Self::Counter);
   /// `Some(n)` when the policy tracks the element count itself.
   #[doc(hidden)]
   fn exact(counter: &Self::Counter) -> Option<usize>;
}

/// Size derived from the positions. No extra cost per operation; the value
/// can be transiently wrong while other threads push or pop.
#[derive(Debug, Clone, Copy, Default)]
pub struct Approximate;

/// Size tracked by an extra atomic counter, one more atomic operation per
/// successful push and pop.
#[derive(Debug, Clone, Copy, Default)]
pub struct Exact;

impl sealed::Sealed for Approximate {}
impl sealed::Sealed for Exact {}

impl Counting for Approximate {
   type Counter = ();

   const NAME: &'static str = "approximate";

   #[inline(always)]
   fn counter() -> Self::Counter {}

   #[inline(always)]
   fn record_push(_: &()) {}

   #[inline(always)]
   fn record_pop(_: &()) {}

   #[inline(always)]
   fn exact(_: &()) -> Option<usize> {
      None
   }
}

impl Counting for Exact {
   type Counter = AtomicIsize;

   const NAME: &'static str = "exact";

   fn counter() -> AtomicIsize {
      AtomicIsize::new(0)
   }

   #[inline]
   fn record_push(counter: &AtomicIsize) {
      counter.fetch_add(1, Ordering::Relaxed);
   }

   #[inline]
   fn record_pop(counter: &AtomicIsize) {
      counter.fetch_sub(1, Ordering::Relaxed);
   }

   #[inline]
   fn exact(counter: &AtomicIsize) -> Option<usize> {
      Some(counter.load(Ordering::Relaxed).max(0) as usize)
   }
}
