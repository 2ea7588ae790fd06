//! A single logical cell holding either "empty" or a value.
//!
//! Every transition below is a single compare-and-swap: there is no retry
//! loop inside [`Slot`] itself. A lost race is reported to the caller as a
//! plain failure (`None`/`Err`/`false`), never retried internally. Retry
//! policy belongs to [`Bucket`](crate::Bucket) and the layers above it. This
//! is what keeps every [`Slot`] operation wait-free: bounded work per call,
//! regardless of what other threads are doing.

use core::mem::ManuallyDrop;
use core::ptr;
use core::sync::atomic::Ordering;

use sdd::AtomicOwned;
use sdd::Guard;
use sdd::Owned;
use sdd::Tag;

/// One logical cell: empty, or occupied by a value of type `T`.
#[repr(transparent)]
pub(crate) struct Slot<T> {
  inner: AtomicOwned<ManuallyDrop<T>>,
}

impl<T> Slot<T>
where
  T: 'static,
{
  /// Creates a new, empty slot.
  #[inline]
  pub(crate) const fn empty() -> Self {
    Self {
      inner: AtomicOwned::null(),
    }
  }

  /// Inserts `value` if the slot is currently empty.
  ///
  /// On success the slot becomes occupied. On failure (the slot was already
  /// occupied), `value` is handed back unharmed (nothing was read, written,
  /// or retried).
  #[inline]
  pub(crate) fn insert(&self, guard: &Guard, value: T) -> Result<(), T> {
    let current = self.inner.load(Ordering::Acquire, guard);

    if !current.is_null() {
      return Err(value);
    }

    let owned = Owned::new(ManuallyDrop::new(value));

    match self.inner.compare_exchange(current, (Some(owned), Tag::None), Ordering::AcqRel, Ordering::Acquire, guard) {
      Ok(_) => Ok(()),
      Err((Some(owned), _)) => Err(extract(owned)),
      Err((None, _)) => unreachable!("compare_exchange failure always returns the rejected value"),
    }
  }

  /// Calls `f` with the current value if the slot is occupied.
  #[inline]
  pub(crate) fn with<F, R>(&self, guard: &Guard, f: F) -> Option<R>
  where
    F: FnOnce(&T) -> R,
  {
    self.inner.load(Ordering::Acquire, guard).as_ref().map(|value| f(value))
  }

  /// Returns a clone of the current value if the slot is occupied.
  #[inline]
  pub(crate) fn get_cloned(&self, guard: &Guard) -> Option<T>
  where
    T: Clone,
  {
    self.with(guard, T::clone)
  }

  /// Unconditionally replaces the slot's content.
  ///
  /// Returns `true` if the slot was empty beforehand (the caller should treat
  /// this as a fresh occupant rather than a replacement).
  #[inline]
  pub(crate) fn set(&self, value: T) -> bool {
    let (old, _) = self.inner.swap((Some(Owned::new(ManuallyDrop::new(value))), Tag::None), Ordering::AcqRel);

    match old {
      Some(owned) => {
        extract(owned);
        false
      }
      None => true,
    }
  }

  /// Replaces the slot's content with `value` only if it is currently empty,
  /// or currently occupied by a value for which `matches` returns `true`.
  ///
  /// Returns `Ok(was_empty)` on success, or `Err(value)` if the occupant
  /// failed to match (the slot is left untouched and `value` is handed back).
  #[inline]
  pub(crate) fn set_if<F>(&self, guard: &Guard, matches: F, value: T) -> Result<bool, T>
  where
    F: FnOnce(&T) -> bool,
  {
    let current = self.inner.load(Ordering::Acquire, guard);
    let was_empty = current.is_null();

    if !was_empty && !current.as_ref().is_some_and(|value| matches(value)) {
      return Err(value);
    }

    let owned = Owned::new(ManuallyDrop::new(value));

    match self.inner.compare_exchange(current, (Some(owned), Tag::None), Ordering::AcqRel, Ordering::Acquire, guard) {
      Ok((Some(owned), _)) => {
        extract(owned);
        Ok(was_empty)
      }
      Ok((None, _)) => Ok(was_empty),
      Err((Some(owned), _)) => Err(extract(owned)),
      Err((None, _)) => unreachable!("compare_exchange failure always returns the rejected value"),
    }
  }

  /// Removes and returns the current value, if the slot is occupied.
  #[inline]
  pub(crate) fn remove(&self, guard: &Guard) -> Option<T> {
    self.remove_if(guard, |_| true)
  }

  /// Removes and returns the current value if it is occupied and `matches`
  /// returns `true` for it. The slot content may have changed between an
  /// earlier observation and this call; in that case nothing is removed.
  #[inline]
  pub(crate) fn remove_if<F>(&self, guard: &Guard, matches: F) -> Option<T>
  where
    F: FnOnce(&T) -> bool,
  {
    let current = self.inner.load(Ordering::Acquire, guard);

    if !current.as_ref().is_some_and(|value| matches(value)) {
      return None;
    }

    match self.inner.compare_exchange(current, (None, Tag::None), Ordering::AcqRel, Ordering::Acquire, guard) {
      Ok((Some(owned), _)) => Some(extract(owned)),
      Ok((None, _)) => None,
      Err(_) => None,
    }
  }

  /// Returns `true` if the slot is currently occupied.
  #[inline]
  pub(crate) fn is_occupied(&self, guard: &Guard) -> bool {
    !self.inner.load(Ordering::Acquire, guard).is_null()
  }
}

/// Moves the logical value out of a just-evicted `Owned<ManuallyDrop<T>>`.
///
/// Reading through the pointer is sound here because no other thread holds a
/// reference to `owned`'s allocation that is used to *write* through it: the
/// compare-exchange that produced `owned` already unlinked it. Wrapping the
/// payload in `ManuallyDrop` means `owned`'s eventual (possibly deferred)
/// drop only frees the allocation; it does not run `T`'s destructor, so the
/// value is moved out exactly once.
#[inline]
fn extract<T>(owned: Owned<ManuallyDrop<T>>) -> T {
  let value = unsafe { ptr::read(&*owned) };
  drop(owned);
  ManuallyDrop::into_inner(value)
}
