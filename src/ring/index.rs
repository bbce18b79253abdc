// Mapping from logical positions to physical slots.
//
// Positions are `usize` counters that only ever grow (wrapping on overflow).
// The slot count is a power of two, so `pos mod N` is `pos & mask` and stays
// continuous across the wrap from `usize::MAX` to 0.

/// Physical slot for logical position `pos`.
#[inline(always)]
pub(crate) const fn slot_of(pos: usize, mask: usize) -> usize {
   pos & mask
}

/// One slot is always left free, so the ring is full when the slot after
/// `write` is the slot `read` is about to consume.
#[inline(always)]
pub(crate) const fn is_full(write: usize, read: usize, mask: usize) -> bool {
   slot_of(write.wrapping_add(1), mask) == slot_of(read, mask)
}

#[inline(always)]
pub(crate) const fn is_empty(write: usize, read: usize) -> bool {
   write == read
}

/// Elements between `read` and `write` when `read` was loaded after `write`.
/// `None` when the difference exceeds the usable capacity: `read` overtook
/// the `write` snapshot, or one of the two is stale.
#[inline(always)]
pub(crate) const fn occupied(write: usize, read: usize, mask: usize) -> Option<usize> {
   let d = write.wrapping_sub(read);
   if d > mask {
      None
   } else {
      Some(d)
   }
}

/// `write - read`, corrected by one lap when the two positions were read at
/// different instants and `read` overtook the stale `write`.
#[inline]
pub(crate) const fn distance(write: usize, read: usize, slots: usize) -> usize {
   let d = write.wrapping_sub(read);
   if d >= slots {
      d.wrapping_add(slots)
   } else {
      d
   }
}
