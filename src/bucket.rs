//! A fixed-capacity, power-of-two-sized array of [`Slot`]s with an accurate
//! live count.

use core::fmt::Debug;
use core::fmt::Formatter;
use core::fmt::Result as FmtResult;
use core::mem::MaybeUninit;

use sdd::Guard;

use crate::array::Array;
use crate::padded::CachePadded;
use crate::params::DefaultParams;
use crate::params::Params;
use crate::slot::Slot;
use crate::sync::atomic::AtomicUsize;
use crate::sync::atomic::Ordering;

/// A fixed-capacity array of slots, each holding at most one value.
///
/// All operations are wait-free: each makes a single attempt and reports
/// failure rather than retrying. See the [module-level overview](crate) for
/// how `Bucket` composes into [`FixedSizeHashBucket`](crate::FixedSizeHashBucket)
/// and [`FixedSizeDeque`](crate::FixedSizeDeque).
pub struct Bucket<T, P = DefaultParams>
where
  T: 'static,
  P: Params + ?Sized,
{
  slots: Array<Slot<T>, P>,
  count: CachePadded<AtomicUsize>,
}

impl<T, P> Bucket<T, P>
where
  T: 'static,
  P: Params + ?Sized,
{
  /// Creates a new, empty bucket of capacity [`Params::LENGTH`].
  pub fn new() -> Self {
    Self {
      slots: Array::new(|_, uninit: &mut MaybeUninit<Slot<T>>| {
        uninit.write(Slot::empty());
      }),
      count: CachePadded::new(AtomicUsize::new(0)),
    }
  }

  /// The number of slots in the bucket.
  #[inline]
  pub fn capacity(&self) -> usize {
    P::LENGTH.as_usize()
  }

  /// The number of occupied slots, observed at the moment of the call.
  ///
  /// The value may lag momentarily behind true occupancy under concurrent
  /// modification, but is never negative and never exceeds [`capacity`].
  ///
  /// [`capacity`]: Self::capacity
  #[inline]
  pub fn count(&self) -> usize {
    self.count.load(Ordering::Acquire)
  }

  #[inline]
  fn slot(&self, index: usize) -> &Slot<T> {
    assert!(index < self.capacity(), "Bucket index out of bounds");
    // SAFETY: bounds checked above.
    unsafe { self.slots.get_unchecked(index) }
  }

  /// Inserts `value` at `index` if that slot is empty.
  ///
  /// Returns `Err(value)` unharmed if the slot was already occupied.
  pub fn insert(&self, index: usize, guard: &Guard, value: T) -> Result<(), T> {
    match self.slot(index).insert(guard, value) {
      Ok(()) => {
        self.count.fetch_add(1, Ordering::AcqRel);
        Ok(())
      }
      Err(value) => Err(value),
    }
  }

  /// Calls `f` with the value at `index`, if occupied.
  pub fn with<F, R>(&self, index: usize, guard: &Guard, f: F) -> Option<R>
  where
    F: FnOnce(&T) -> R,
  {
    self.slot(index).with(guard, f)
  }

  /// Returns a clone of the value at `index`, if occupied.
  pub fn get_cloned(&self, index: usize, guard: &Guard) -> Option<T>
  where
    T: Clone,
  {
    self.slot(index).get_cloned(guard)
  }

  /// Unconditionally replaces the value at `index`.
  ///
  /// Returns `true` if the slot was empty beforehand.
  pub fn set(&self, index: usize, value: T) -> bool {
    let was_new = self.slot(index).set(value);

    if was_new {
      self.count.fetch_add(1, Ordering::AcqRel);
    }

    was_new
  }

  /// Replaces the value at `index` with `value`, but only if the slot is
  /// empty or currently holds a value for which `matches` returns `true`.
  ///
  /// Returns `Ok(was_new)` on success, or `Err(value)` if the occupant did
  /// not match.
  pub fn set_if<F>(&self, index: usize, guard: &Guard, matches: F, value: T) -> Result<bool, T>
  where
    F: FnOnce(&T) -> bool,
  {
    let was_new = self.slot(index).set_if(guard, matches, value)?;

    if was_new {
      self.count.fetch_add(1, Ordering::AcqRel);
    }

    Ok(was_new)
  }

  /// Removes and returns the value at `index`, if occupied.
  pub fn remove(&self, index: usize, guard: &Guard) -> Option<T> {
    let removed = self.slot(index).remove(guard)?;
    self.count.fetch_sub(1, Ordering::AcqRel);
    Some(removed)
  }

  /// Removes and returns the value at `index`, if occupied and `matches`
  /// returns `true` for it.
  ///
  /// This is a no-op if the slot's content changed between an earlier
  /// observation and this call: the caller's compare-and-swap simply loses.
  pub fn remove_if<F>(&self, index: usize, guard: &Guard, matches: F) -> Option<T>
  where
    F: FnOnce(&T) -> bool,
  {
    let removed = self.slot(index).remove_if(guard, matches)?;
    self.count.fetch_sub(1, Ordering::AcqRel);
    Some(removed)
  }

  /// Returns `true` if the slot at `index` is occupied.
  pub fn is_occupied(&self, index: usize, guard: &Guard) -> bool {
    self.slot(index).is_occupied(guard)
  }

  /// Returns `true` if no slot is occupied.
  ///
  /// This reads the live count, not every slot; see [`count`](Self::count)
  /// for its consistency guarantees.
  pub fn is_empty(&self) -> bool {
    self.count() == 0
  }

  /// Iterates over occupied slots in index order.
  ///
  /// This is snapshot-free: a slot mutated during iteration may or may not
  /// be observed in its new state, but iteration always terminates after
  /// visiting each index at most once.
  pub fn iter<'a>(&'a self, guard: &'a Guard) -> impl Iterator<Item = (usize, T)> + 'a
  where
    T: Clone,
  {
    (0..self.capacity()).filter_map(move |index| self.get_cloned(index, guard).map(|value| (index, value)))
  }
}

impl<T, P> Default for Bucket<T, P>
where
  T: 'static,
  P: Params + ?Sized,
{
  fn default() -> Self {
    Self::new()
  }
}

impl<T, P> Debug for Bucket<T, P>
where
  T: 'static,
  P: Params + ?Sized,
{
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    f.debug_struct("Bucket")
      .field("capacity", &self.capacity())
      .field("count", &self.count())
      .finish()
  }
}

// SAFETY: `Bucket` mediates all access to its slots through atomic
// operations; it is safe to share across threads whenever `T` is.
unsafe impl<T, P> Send for Bucket<T, P>
where
  T: Send + 'static,
  P: Params + ?Sized,
{
}

unsafe impl<T, P> Sync for Bucket<T, P>
where
  T: Send + Sync + 'static,
  P: Params + ?Sized,
{
}

#[cfg(all(test, not(loom)))]
mod tests {
  use super::*;
  use crate::params::ConstParams;

  type TestParams = ConstParams<64>;

  #[test]
  fn test_new() {
    let bucket: Bucket<usize, TestParams> = Bucket::new();

    assert_eq!(bucket.capacity(), 64);
    assert_eq!(bucket.count(), 0);
    assert!(bucket.is_empty());
  }

  #[test]
  fn test_insert_and_get() {
    let bucket: Bucket<usize, TestParams> = Bucket::new();
    let guard = Guard::new();

    assert!(bucket.insert(3, &guard, 123).is_ok());
    assert_eq!(bucket.count(), 1);
    assert_eq!(bucket.with(3, &guard, |v| *v), Some(123));
  }

  #[test]
  fn test_insert_occupied_fails() {
    let bucket: Bucket<usize, TestParams> = Bucket::new();
    let guard = Guard::new();

    assert!(bucket.insert(0, &guard, 1).is_ok());
    assert_eq!(bucket.insert(0, &guard, 2), Err(2));
    assert_eq!(bucket.count(), 1);
  }

  #[test]
  fn test_remove() {
    let bucket: Bucket<usize, TestParams> = Bucket::new();
    let guard = Guard::new();

    bucket.insert(5, &guard, 42).unwrap();
    assert_eq!(bucket.remove(5, &guard), Some(42));
    assert_eq!(bucket.remove(5, &guard), None);
    assert_eq!(bucket.count(), 0);
  }

  #[test]
  fn test_remove_reclaims_evicted_value() {
    let bucket: Bucket<String, TestParams> = Bucket::new();
    let guard = Guard::new();

    bucket.insert(0, &guard, "evicted".to_string()).unwrap();
    assert_eq!(bucket.remove(0, &guard), Some("evicted".to_string()));

    drop(guard);
    crate::reclaim::try_reclaim();
  }

  #[test]
  fn test_remove_if_mismatch_is_noop() {
    let bucket: Bucket<usize, TestParams> = Bucket::new();
    let guard = Guard::new();

    bucket.insert(1, &guard, 7).unwrap();
    assert_eq!(bucket.remove_if(1, &guard, |v| *v == 8), None);
    assert_eq!(bucket.count(), 1);
    assert_eq!(bucket.remove_if(1, &guard, |v| *v == 7), Some(7));
  }

  #[test]
  fn test_set_reports_was_new() {
    let bucket: Bucket<usize, TestParams> = Bucket::new();

    assert!(bucket.set(2, 1));
    assert!(!bucket.set(2, 2));
    assert_eq!(bucket.count(), 1);
  }

  #[test]
  fn test_count_never_exceeds_capacity() {
    let bucket: Bucket<usize, TestParams> = Bucket::new();
    let guard = Guard::new();

    for index in 0..bucket.capacity() {
      assert!(bucket.insert(index, &guard, index).is_ok());
    }

    assert_eq!(bucket.count(), bucket.capacity());
  }

  #[test]
  fn test_iter_visits_occupied_slots() {
    let bucket: Bucket<usize, TestParams> = Bucket::new();
    let guard = Guard::new();

    bucket.insert(0, &guard, 10).unwrap();
    bucket.insert(5, &guard, 50).unwrap();

    let collected: Vec<(usize, usize)> = bucket.iter(&guard).collect();
    assert_eq!(collected, vec![(0, 10), (5, 50)]);
  }
}
