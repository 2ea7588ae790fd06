//! A wait-free, fixed-capacity double-ended ring built over one [`Bucket`].

use core::fmt::Debug;
use core::fmt::Formatter;
use core::fmt::Result as FmtResult;

use sdd::Guard;

use crate::bucket::Bucket;
use crate::error::EmptyDeque;
use crate::padded::CachePadded;
use crate::params::DefaultParams;
use crate::params::Params;
use crate::sync::atomic::AtomicUsize;
use crate::sync::atomic::Ordering;

/// A fixed-capacity ring with independent front and back ends.
///
/// `indexFront`/`indexBack` are monotonic sequence numbers, not precise
/// occupancy indices: both ends are gated by a shared `preCount` admission
/// counter, bumped *before* the corresponding slot is touched so an
/// over-full push can be rejected without ever inspecting the ring. A push
/// that wins the admission race but then loses the slot CAS (because an
/// earlier push at the same ring position never drained) leaves that
/// position's admission slot "leaked" until a future wraparound reuses it
/// (see the asymmetry pinned in [`Self::add_back`]).
pub struct FixedSizeDeque<T, P = DefaultParams>
where
  T: 'static,
  P: Params + ?Sized,
{
  bucket: Bucket<T, P>,
  index_front: CachePadded<AtomicUsize>,
  index_back: CachePadded<AtomicUsize>,
  pre_count: CachePadded<AtomicUsize>,
}

impl<T, P> FixedSizeDeque<T, P>
where
  T: 'static,
  P: Params + ?Sized,
{
  /// Creates a new, empty deque of capacity [`Params::LENGTH`].
  pub fn new() -> Self {
    let capacity = P::LENGTH.as_usize();

    Self {
      bucket: Bucket::new(),
      index_front: CachePadded::new(AtomicUsize::new(0)),
      index_back: CachePadded::new(AtomicUsize::new(capacity.wrapping_sub(1))),
      pre_count: CachePadded::new(AtomicUsize::new(0)),
    }
  }

  /// The number of ring positions.
  #[inline]
  pub fn capacity(&self) -> usize {
    self.bucket.capacity()
  }

  /// The number of occupied ring positions, observed at the moment of the
  /// call.
  #[inline]
  pub fn count(&self) -> usize {
    self.bucket.count()
  }

  #[inline]
  fn mask(&self) -> usize {
    self.capacity() - 1
  }

  /// Pushes `value` onto the front. Fails if the deque is (admission-wise)
  /// full.
  ///
  /// On a failed slot insert (the admission counter passed, but the
  /// computed ring position was still occupied by an earlier, undrained
  /// push), the admission is rolled back so the position can be retried.
  pub fn add_front(&self, value: T, guard: &Guard) -> bool {
    let admitted = self.pre_count.fetch_add(1, Ordering::AcqRel) + 1;

    if admitted > self.capacity() {
      return false;
    }

    let index = self.index_front.fetch_add(1, Ordering::AcqRel) & self.mask();

    match self.bucket.insert(index, guard, value) {
      Ok(()) => true,
      Err(_) => {
        self.pre_count.fetch_sub(1, Ordering::AcqRel);
        false
      }
    }
  }

  /// Pushes `value` onto the back. Fails if the deque is (admission-wise)
  /// full.
  ///
  /// Unlike [`add_front`](Self::add_front), a failed slot insert here does
  /// *not* roll back the admission counter: `preCount` can drift above true
  /// occupancy. This is documented, pinned behavior, not an oversight.
  pub fn add_back(&self, value: T, guard: &Guard) -> bool {
    let admitted = self.pre_count.fetch_add(1, Ordering::AcqRel) + 1;

    if admitted > self.capacity() {
      return false;
    }

    let index = self.index_back.fetch_sub(1, Ordering::AcqRel) & self.mask();

    self.bucket.insert(index, guard, value).is_ok()
  }

  /// Pops and returns the most recently pushed front value, if any.
  pub fn try_take_front(&self, guard: &Guard) -> Option<T> {
    let previous = self.index_front.fetch_sub(1, Ordering::AcqRel);
    let index = previous.wrapping_sub(1) & self.mask();
    let value = self.bucket.remove(index, guard)?;
    self.pre_count.fetch_sub(1, Ordering::AcqRel);
    Some(value)
  }

  /// Pops and returns the most recently pushed back value, if any.
  pub fn try_take_back(&self, guard: &Guard) -> Option<T> {
    let previous = self.index_back.fetch_add(1, Ordering::AcqRel);
    let index = previous.wrapping_add(1) & self.mask();
    let value = self.bucket.remove(index, guard)?;
    self.pre_count.fetch_sub(1, Ordering::AcqRel);
    Some(value)
  }

  /// Returns a clone of the value at the front, without removing it.
  pub fn peek_front(&self, guard: &Guard) -> Result<T, EmptyDeque>
  where
    T: Clone,
  {
    let current = self.index_front.load(Ordering::Acquire);
    let index = current.wrapping_sub(1) & self.mask();
    self.bucket.get_cloned(index, guard).ok_or(EmptyDeque)
  }

  /// Returns a clone of the value at the back, without removing it.
  pub fn peek_back(&self, guard: &Guard) -> Result<T, EmptyDeque>
  where
    T: Clone,
  {
    let current = self.index_back.load(Ordering::Acquire);
    let index = current.wrapping_add(1) & self.mask();
    self.bucket.get_cloned(index, guard).ok_or(EmptyDeque)
  }

  /// Returns a clone of the value at raw ring position `index`, if occupied.
  pub fn get(&self, index: usize, guard: &Guard) -> Option<T>
  where
    T: Clone,
  {
    self.bucket.get_cloned(index & self.mask(), guard)
  }

  /// Iterates over occupied ring positions in index order.
  pub fn iter<'a>(&'a self, guard: &'a Guard) -> impl Iterator<Item = (usize, T)> + 'a
  where
    T: Clone,
  {
    self.bucket.iter(guard)
  }
}

impl<T, P> Default for FixedSizeDeque<T, P>
where
  T: 'static,
  P: Params + ?Sized,
{
  fn default() -> Self {
    Self::new()
  }
}

impl<T, P> Debug for FixedSizeDeque<T, P>
where
  T: 'static,
  P: Params + ?Sized,
{
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    f.debug_struct("FixedSizeDeque")
      .field("capacity", &self.capacity())
      .field("count", &self.count())
      .finish()
  }
}

#[cfg(all(test, not(loom)))]
mod tests {
  use super::*;
  use crate::params::ConstParams;

  type TestParams = ConstParams<2>;

  #[test]
  fn test_capacity_rounds_up_to_power_of_two() {
    let deque: FixedSizeDeque<u32, ConstParams<5>> = FixedSizeDeque::new();
    assert_eq!(deque.capacity(), 8);
  }

  #[test]
  fn test_front_back_push_pop_no_contention() {
    let deque: FixedSizeDeque<&str, TestParams> = FixedSizeDeque::new();
    let guard = Guard::new();

    assert!(deque.add_front("x", &guard));
    assert!(deque.add_back("y", &guard));
    assert!(!deque.add_front("z", &guard));

    assert_eq!(deque.try_take_front(&guard), Some("x"));
    assert_eq!(deque.try_take_back(&guard), Some("y"));
    assert_eq!(deque.try_take_front(&guard), None);
  }

  #[test]
  fn test_peek_back_reads_back_not_front() {
    let deque: FixedSizeDeque<&str, TestParams> = FixedSizeDeque::new();
    let guard = Guard::new();

    deque.add_front("front-item", &guard);
    deque.add_back("back-item", &guard);

    assert_eq!(deque.peek_front(&guard), Ok("front-item"));
    assert_eq!(deque.peek_back(&guard), Ok("back-item"));
  }

  #[test]
  fn test_peek_on_empty_reports_error() {
    let deque: FixedSizeDeque<&str, TestParams> = FixedSizeDeque::new();
    let guard = Guard::new();

    assert_eq!(deque.peek_front(&guard), Err(EmptyDeque));
    assert_eq!(deque.peek_back(&guard), Err(EmptyDeque));
  }

  #[test]
  fn test_pre_count_gate_rejects_once_full() {
    let deque: FixedSizeDeque<u32, TestParams> = FixedSizeDeque::new();
    let guard = Guard::new();

    assert!(deque.add_back(1, &guard));
    assert!(deque.add_back(2, &guard));
    assert!(!deque.add_back(3, &guard));

    assert_eq!(deque.try_take_back(&guard), Some(2));
    assert_eq!(deque.try_take_back(&guard), Some(1));
  }

  #[test]
  fn test_concurrent_saturation_capacity_1024() {
    use std::sync::Arc;
    use std::thread;

    use crate::params::ConstParams as CP;

    let deque: Arc<FixedSizeDeque<u32, CP<1024>>> = Arc::new(FixedSizeDeque::new());

    let handles: Vec<_> = (0..8)
      .map(|_| {
        let deque = Arc::clone(&deque);
        thread::spawn(move || {
          let guard = Guard::new();
          let mut successes = 0;

          for i in 0..512u32 {
            if deque.add_back(i, &guard) {
              successes += 1;
            }
          }

          successes
        })
      })
      .collect();

    let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(total, 1024);

    let guard = Guard::new();
    let mut taken = 0;
    while deque.try_take_back(&guard).is_some() {
      taken += 1;
    }
    assert_eq!(taken, 1024);
    assert_eq!(deque.try_take_back(&guard), None);
  }
}
