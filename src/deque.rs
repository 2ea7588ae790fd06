//! An unbounded, lock-free deque that grows by cooperatively migrating
//! entries from one fixed-size ring to a doubled replacement.

use core::fmt::Debug;
use core::fmt::Formatter;
use core::fmt::Result as FmtResult;
use core::hint::spin_loop;
use core::mem::MaybeUninit;
use core::sync::atomic::Ordering;

use sdd::Guard;

use crate::error::EmptyDeque;
use crate::padded::CachePadded;
use crate::params::Capacity;
use crate::priority::PriorityBoost;
use crate::reclaim::Atomic;
use crate::slot::Slot;
use crate::sync::atomic::AtomicUsize;

const STABLE: usize = 0;
const RESIZE_REQUESTED: usize = 1;
const RESIZING: usize = 2;
const COPYING: usize = 3;
const CLEANUP: usize = 4;

/// A fixed-capacity ring, sized at runtime rather than through [`Params`].
///
/// This duplicates [`Bucket`](crate::Bucket)'s and
/// [`FixedSizeDeque`](crate::FixedSizeDeque)'s admission-gated ring logic
/// rather than reusing those types directly, because both are generic over
/// a compile-time [`Params`](crate::Params) capacity, while [`Deque`]'s
/// capacity is a runtime quantity that doubles under cooperative growth.
struct Ring<T>
where
  T: 'static,
{
  slots: Box<[Slot<T>]>,
  capacity: usize,
  count: CachePadded<AtomicUsize>,
  index_front: CachePadded<AtomicUsize>,
  index_back: CachePadded<AtomicUsize>,
  pre_count: CachePadded<AtomicUsize>,
}

impl<T> Ring<T>
where
  T: 'static,
{
  fn new(capacity: usize) -> Self {
    debug_assert!(capacity.is_power_of_two(), "Ring capacity must be a power of two");

    Self {
      slots: (0..capacity).map(|_| Slot::empty()).collect(),
      capacity,
      count: CachePadded::new(AtomicUsize::new(0)),
      index_front: CachePadded::new(AtomicUsize::new(0)),
      index_back: CachePadded::new(AtomicUsize::new(capacity.wrapping_sub(1))),
      pre_count: CachePadded::new(AtomicUsize::new(0)),
    }
  }

  #[inline]
  fn mask(&self) -> usize {
    self.capacity - 1
  }

  #[inline]
  fn slot(&self, index: usize) -> &Slot<T> {
    &self.slots[index & self.mask()]
  }

  fn add_front(&self, value: T, guard: &Guard) -> Result<(), T> {
    let admitted = self.pre_count.fetch_add(1, Ordering::AcqRel) + 1;

    if admitted > self.capacity {
      return Err(value);
    }

    let index = self.index_front.fetch_add(1, Ordering::AcqRel) & self.mask();

    match self.slot(index).insert(guard, value) {
      Ok(()) => {
        self.count.fetch_add(1, Ordering::AcqRel);
        Ok(())
      }
      Err(value) => {
        self.pre_count.fetch_sub(1, Ordering::AcqRel);
        Err(value)
      }
    }
  }

  fn add_back(&self, value: T, guard: &Guard) -> Result<(), T> {
    let admitted = self.pre_count.fetch_add(1, Ordering::AcqRel) + 1;

    if admitted > self.capacity {
      return Err(value);
    }

    let index = self.index_back.fetch_sub(1, Ordering::AcqRel) & self.mask();

    match self.slot(index).insert(guard, value) {
      Ok(()) => {
        self.count.fetch_add(1, Ordering::AcqRel);
        Ok(())
      }
      // Pinned asymmetry: unlike `add_front`, a lost slot CAS here does not
      // roll back `pre_count`. See `FixedSizeDeque::add_back`.
      Err(value) => Err(value),
    }
  }

  fn try_take_front(&self, guard: &Guard) -> Option<T> {
    let previous = self.index_front.fetch_sub(1, Ordering::AcqRel);
    let index = previous.wrapping_sub(1) & self.mask();
    let value = self.slot(index).remove(guard)?;
    self.count.fetch_sub(1, Ordering::AcqRel);
    self.pre_count.fetch_sub(1, Ordering::AcqRel);
    Some(value)
  }

  fn try_take_back(&self, guard: &Guard) -> Option<T> {
    let previous = self.index_back.fetch_add(1, Ordering::AcqRel);
    let index = previous.wrapping_add(1) & self.mask();
    let value = self.slot(index).remove(guard)?;
    self.count.fetch_sub(1, Ordering::AcqRel);
    self.pre_count.fetch_sub(1, Ordering::AcqRel);
    Some(value)
  }

  fn peek_front(&self, guard: &Guard) -> Option<T>
  where
    T: Clone,
  {
    let current = self.index_front.load(Ordering::Acquire);
    let index = current.wrapping_sub(1) & self.mask();
    self.slot(index).get_cloned(guard)
  }

  fn peek_back(&self, guard: &Guard) -> Option<T>
  where
    T: Clone,
  {
    let current = self.index_back.load(Ordering::Acquire);
    let index = current.wrapping_add(1) & self.mask();
    self.slot(index).get_cloned(guard)
  }

  fn get(&self, index: usize, guard: &Guard) -> Option<T>
  where
    T: Clone,
  {
    self.slot(index & self.mask()).get_cloned(guard)
  }
}

/// An unbounded, lock-free double-ended queue.
///
/// Every user-facing operation is wait-free *unless* it observes the deque
/// mid-resize, in which case it participates in the cooperative growth
/// protocol (bounded retries, no blocking) before completing. See the
/// [module overview](crate) for the state machine this drives.
pub struct Deque<T>
where
  T: 'static,
{
  entries_new: Atomic<Ring<T>>,
  entries_old: Atomic<Ring<T>>,
  status: CachePadded<AtomicUsize>,
  revision: CachePadded<AtomicUsize>,
  copying_threads: CachePadded<AtomicUsize>,
  count: CachePadded<AtomicUsize>,
}

impl<T> Deque<T>
where
  T: 'static,
{
  /// Creates a new, empty deque starting at [`Capacity::MIN`].
  pub fn new() -> Self {
    Self::with_capacity(Capacity::MIN.as_usize())
  }

  /// Creates a new, empty deque with at least the given starting capacity
  /// (rounded up to the next power of two and clamped to
  /// <code>[Capacity::MIN]..=[Capacity::MAX]</code>).
  pub fn with_capacity(capacity: usize) -> Self {
    let capacity = Capacity::new(capacity).as_usize();
    let entries_new = Atomic::null();

    entries_new.write(Ordering::Release, |uninit: &mut MaybeUninit<Ring<T>>| {
      uninit.write(Ring::new(capacity));
    });

    Self {
      entries_new,
      entries_old: Atomic::null(),
      status: CachePadded::new(AtomicUsize::new(STABLE)),
      revision: CachePadded::new(AtomicUsize::new(0)),
      copying_threads: CachePadded::new(AtomicUsize::new(0)),
      count: CachePadded::new(AtomicUsize::new(0)),
    }
  }

  /// The current ring capacity. Grows over time; never shrinks.
  pub fn capacity(&self) -> usize {
    let guard = Guard::new();
    self.entries_new.read(Ordering::Acquire, &guard).as_ref().map_or(0, |ring| ring.capacity)
  }

  /// Entries successfully added minus entries successfully taken.
  ///
  /// Updated with a `fetch_add`/`fetch_sub` pair per confirmed add/take
  /// rather than a single CAS straddling both operations, so a reader
  /// racing a confirmed take of a value whose matching add has not yet
  /// reached its own `fetch_add` can transiently observe a wrapped
  /// (`usize::MAX`-adjacent) value before the add catches up. The spec
  /// only guarantees this count for single-threaded interleavings, so the
  /// transient is tolerated rather than fixed with a wider CAS.
  pub fn count(&self) -> usize {
    self.count.load(Ordering::Acquire)
  }

  #[inline]
  fn is_operation_safe(&self) -> bool {
    self.status.load(Ordering::Acquire) == STABLE && self.copying_threads.load(Ordering::Acquire) == 0
  }

  /// Pushes `value` onto the front. Never fails; grows the deque instead.
  pub fn add_front(&self, value: T) {
    self.retrying_add(true, value);
  }

  /// Pushes `value` onto the back. Never fails; grows the deque instead.
  pub fn add_back(&self, value: T) {
    self.retrying_add(false, value);
  }

  /// Pops and returns the most recently pushed front value, if any.
  pub fn try_take_front(&self) -> Option<T> {
    self.attempt_take(true)
  }

  /// Pops and returns the most recently pushed back value, if any.
  pub fn try_take_back(&self) -> Option<T> {
    self.attempt_take(false)
  }

  /// Returns a clone of the value at the front, without removing it.
  pub fn peek_front(&self) -> Result<T, EmptyDeque>
  where
    T: Clone,
  {
    let guard = Guard::new();
    self.entries_new.read(Ordering::Acquire, &guard).as_ref().and_then(|ring| ring.peek_front(&guard)).ok_or(EmptyDeque)
  }

  /// Returns a clone of the value at the back, without removing it.
  pub fn peek_back(&self) -> Result<T, EmptyDeque>
  where
    T: Clone,
  {
    let guard = Guard::new();
    self.entries_new.read(Ordering::Acquire, &guard).as_ref().and_then(|ring| ring.peek_back(&guard)).ok_or(EmptyDeque)
  }

  /// Returns a clone of the value at raw ring position `index`, if occupied.
  ///
  /// Ring positions are not stable across a resize; this is a best-effort
  /// introspection primitive, not a random-access index into logical order.
  pub fn get(&self, index: usize) -> Option<T>
  where
    T: Clone,
  {
    let guard = Guard::new();
    self.entries_new.read(Ordering::Acquire, &guard).as_ref().and_then(|ring| ring.get(index, &guard))
  }

  /// Removes every entry, observed at the moment of the call.
  ///
  /// Concurrent adds during a `clear` may or may not be removed; this is
  /// not an atomic "drop everything" barrier.
  pub fn clear(&self) {
    while self.try_take_back().is_some() {}
  }

  /// Iterates over the entries currently in the live ring.
  ///
  /// Snapshot-free, like every other iterator in this crate: entries added
  /// or removed during iteration may or may not be observed. Always
  /// terminates, even across a concurrent resize.
  pub fn iter(&self) -> DequeIter<'_, T>
  where
    T: Clone,
  {
    DequeIter {
      deque: self,
      guard: Guard::new(),
      index: 0,
    }
  }

  fn retrying_add(&self, front: bool, mut value: T) {
    loop {
      if !self.is_operation_safe() {
        self.cooperative_grow();
        continue;
      }

      let revision_before = self.revision.load(Ordering::Acquire);
      let guard = Guard::new();
      let shared = self.entries_new.read(Ordering::Acquire, &guard);
      let ring = shared.as_ref().expect("entries_new is never null");

      let result = if front { ring.add_front(value, &guard) } else { ring.add_back(value, &guard) };
      let confirmed = self.confirmed(revision_before);

      match (confirmed, result) {
        (true, Ok(())) => {
          self.count.fetch_add(1, Ordering::AcqRel);
          return;
        }
        (true, Err(v)) => {
          value = v;
          self.request_resize();
        }
        (false, Ok(())) => {
          let undo = if front { ring.try_take_front(&guard) } else { ring.try_take_back(&guard) };

          match undo {
            Some(v) => value = v,
            None => {
              // Another thread already observed and consumed it.
              self.count.fetch_add(1, Ordering::AcqRel);
              return;
            }
          }
        }
        (false, Err(v)) => {
          value = v;
          self.request_resize();
        }
      }
    }
  }

  fn attempt_take(&self, front: bool) -> Option<T> {
    loop {
      if !self.is_operation_safe() {
        self.cooperative_grow();
        continue;
      }

      let revision_before = self.revision.load(Ordering::Acquire);
      let guard = Guard::new();
      let shared = self.entries_new.read(Ordering::Acquire, &guard);
      let ring = shared.as_ref().expect("entries_new is never null");

      let result = if front { ring.try_take_front(&guard) } else { ring.try_take_back(&guard) };
      let confirmed = self.confirmed(revision_before);

      match (confirmed, result) {
        (true, Some(value)) => {
          self.count.fetch_sub(1, Ordering::AcqRel);
          return Some(value);
        }
        (true, None) => return None,
        (false, Some(value)) => {
          let restored = if front { ring.add_front(value, &guard) } else { ring.add_back(value, &guard) };

          if let Err(value) = restored {
            self.count.fetch_sub(1, Ordering::AcqRel);
            return Some(value);
          }
        }
        (false, None) => {}
      }
    }
  }

  #[inline]
  fn confirmed(&self, revision_before: usize) -> bool {
    self.revision.load(Ordering::Acquire) == revision_before
      && self.status.load(Ordering::Acquire) == STABLE
      && self.copying_threads.load(Ordering::Acquire) == 0
  }

  #[inline]
  fn request_resize(&self) {
    let _ = self.status.compare_exchange(STABLE, RESIZE_REQUESTED, Ordering::AcqRel, Ordering::Acquire);
    self.revision.fetch_add(1, Ordering::AcqRel);
  }

  fn cooperative_grow(&self) {
    let guard = Guard::new();

    match self.status.load(Ordering::Acquire) {
      RESIZE_REQUESTED => self.begin_resize(&guard),
      RESIZING => spin_loop(),
      COPYING => self.copy_step(&guard),
      CLEANUP => self.finish_cleanup(),
      _ => spin_loop(),
    }
  }

  /// `1 → 2`: the thread that wins the CAS allocates the doubled ring,
  /// swaps it in, and publishes the displaced ring into `entries_old`. The
  /// winner holds a best-effort priority boost for the duration, restored
  /// on every exit path (including the early returns below) by the guard's
  /// `Drop`.
  fn begin_resize(&self, guard: &Guard) {
    if self.status.compare_exchange(RESIZE_REQUESTED, RESIZING, Ordering::AcqRel, Ordering::Acquire).is_err() {
      return;
    }

    let _priority = PriorityBoost::acquire();

    let old_capacity = self.entries_new.read(Ordering::Acquire, guard).as_ref().map_or(Capacity::MIN.as_usize(), |ring| ring.capacity);
    let new_capacity = old_capacity.saturating_mul(2).min(Capacity::MAX.as_usize());

    let evicted = self.entries_new.replace(Ordering::AcqRel, |uninit: &mut MaybeUninit<Ring<T>>| {
      uninit.write(Ring::new(new_capacity));
    });

    if let Some(evicted) = evicted {
      self.entries_old.publish(Ordering::Release, evicted);
    }

    self.revision.fetch_add(1, Ordering::AcqRel);
    let _ = self.status.compare_exchange(RESIZING, COPYING, Ordering::AcqRel, Ordering::Acquire);
  }

  /// `3`: drains `entries_old` into `entries_new` via front-pop/front-push,
  /// per the migration policy in [`Self::add_front`]'s documentation.
  /// Absolute order is not preserved across a resize.
  fn copy_step(&self, guard: &Guard) {
    self.revision.fetch_add(1, Ordering::AcqRel);
    self.copying_threads.fetch_add(1, Ordering::AcqRel);

    if let Some(old_ring) = self.entries_old.read(Ordering::Acquire, guard).as_ref() {
      while let Some(mut value) = old_ring.try_take_front(guard) {
        loop {
          let new_shared = self.entries_new.read(Ordering::Acquire, guard);
          let Some(new_ring) = new_shared.as_ref() else { break };

          match new_ring.add_front(value, guard) {
            Ok(()) => break,
            Err(v) => {
              value = v;
              spin_loop();
            }
          }
        }
      }
    }

    let _ = self.status.compare_exchange(COPYING, CLEANUP, Ordering::AcqRel, Ordering::Acquire);
    self.copying_threads.fetch_sub(1, Ordering::AcqRel);
  }

  /// `4`: re-enters state `2` as a serialization lock so only one thread
  /// nulls `entries_old`, then returns to `0 Stable`.
  fn finish_cleanup(&self) {
    if self.status.compare_exchange(CLEANUP, RESIZING, Ordering::AcqRel, Ordering::Acquire).is_err() {
      return;
    }

    self.entries_old.evict(Ordering::AcqRel);
    let _ = self.status.compare_exchange(RESIZING, STABLE, Ordering::AcqRel, Ordering::Acquire);
  }
}

impl<T> Default for Deque<T>
where
  T: 'static,
{
  fn default() -> Self {
    Self::new()
  }
}

impl<T> Debug for Deque<T>
where
  T: 'static,
{
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    f.debug_struct("Deque")
      .field("capacity", &self.capacity())
      .field("count", &self.count())
      .field("status", &self.status.load(Ordering::Relaxed))
      .finish()
  }
}

// SAFETY: all shared mutable state is reached only through atomics and the
// epoch-guarded `Atomic`/slot primitives.
unsafe impl<T> Send for Deque<T> where T: Send + 'static {}
unsafe impl<T> Sync for Deque<T> where T: Send + Sync + 'static {}

/// Snapshot-free iterator over a [`Deque`]'s live ring.
pub struct DequeIter<'a, T>
where
  T: 'static,
{
  deque: &'a Deque<T>,
  guard: Guard,
  index: usize,
}

impl<'a, T> Iterator for DequeIter<'a, T>
where
  T: Clone + 'static,
{
  type Item = T;

  fn next(&mut self) -> Option<T> {
    loop {
      let shared = self.deque.entries_new.read(Ordering::Acquire, &self.guard);
      let ring = shared.as_ref()?;

      if self.index >= ring.capacity {
        return None;
      }

      let value = ring.get(self.index, &self.guard);
      self.index += 1;

      if value.is_some() {
        return value;
      }
    }
  }
}
