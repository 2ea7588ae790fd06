//! Epoch-based memory reclamation for structures the [`Deque`] swaps out from
//! under concurrent readers.
//!
//! [`Deque`]: crate::Deque

use core::mem::MaybeUninit;
use core::sync::atomic::Ordering;

use sdd::Guard;

/// An atomic pointer that can be safely shared between threads.
#[repr(transparent)]
pub(crate) struct Atomic<T> {
  inner: sdd::AtomicOwned<T>,
}

impl<T> Atomic<T> {
  /// Creates a null atomic pointer.
  #[inline]
  pub(crate) const fn null() -> Self {
    Self {
      inner: sdd::AtomicOwned::null(),
    }
  }

  /// Loads a value from the pointer.
  #[inline]
  pub(crate) fn read<'guard>(&self, order: Ordering, guard: &'guard Guard) -> Shared<'guard, T> {
    Shared {
      inner: self.inner.load(order, guard),
    }
  }

  /// Initializes and stores a value into the pointer, which must be null.
  #[inline]
  pub(crate) fn write<F>(&self, order: Ordering, init: F)
  where
    F: FnOnce(&mut MaybeUninit<T>),
    T: 'static,
  {
    let value: sdd::Owned<T> = sdd::Owned::new_with(|| {
      let mut uninit: MaybeUninit<T> = MaybeUninit::uninit();

      init(&mut uninit);

      // SAFETY: `init` is required to fully initialize `uninit`.
      unsafe { uninit.assume_init() }
    });

    let old: (Option<sdd::Owned<T>>, sdd::Tag) = self.inner.swap((Some(value), sdd::Tag::None), order);

    debug_assert!(old.0.is_none(), "Atomic<T>::write called on an occupied pointer");
  }

  /// Evicts the current occupant, if any, scheduling it for reclamation once
  /// no pinned guard can still observe it. Returns `true` if a value was
  /// present.
  #[inline]
  pub(crate) fn evict(&self, order: Ordering) -> bool {
    self.inner.swap((None, sdd::Tag::None), order).0.is_some()
  }

  /// Atomically replaces the pointer with a freshly-built value, handing
  /// back the evicted occupant (if any) instead of scheduling it for
  /// reclamation immediately, so the caller can republish it elsewhere
  /// (e.g. into `entries_old`) before it is ever dropped.
  #[inline]
  pub(crate) fn replace<F>(&self, order: Ordering, init: F) -> Option<Evicted<T>>
  where
    F: FnOnce(&mut MaybeUninit<T>),
    T: 'static,
  {
    let value: sdd::Owned<T> = sdd::Owned::new_with(|| {
      let mut uninit: MaybeUninit<T> = MaybeUninit::uninit();

      init(&mut uninit);

      // SAFETY: `init` is required to fully initialize `uninit`.
      unsafe { uninit.assume_init() }
    });

    self.inner.swap((Some(value), sdd::Tag::None), order).0.map(Evicted)
  }

  /// Publishes a previously-[`replace`](Self::replace)d occupant into this
  /// (must be null) pointer.
  #[inline]
  pub(crate) fn publish(&self, order: Ordering, evicted: Evicted<T>) {
    let old: (Option<sdd::Owned<T>>, sdd::Tag) = self.inner.swap((Some(evicted.0), sdd::Tag::None), order);

    debug_assert!(old.0.is_none(), "Atomic<T>::publish called on an occupied pointer");
  }
}

/// A value evicted from one [`Atomic`] pointer, not yet scheduled for
/// reclamation, pending republication into another [`Atomic`] pointer via
/// [`Atomic::publish`].
pub(crate) struct Evicted<T>(sdd::Owned<T>);

/// A pointer to an object protected by the epoch GC.
///
/// The pointer is valid for use only during the lifetime `'guard`.
#[repr(transparent)]
pub(crate) struct Shared<'guard, T> {
  inner: sdd::Ptr<'guard, T>,
}

impl<'guard, T> Shared<'guard, T> {
  /// Returns a shared reference to the value.
  #[inline]
  pub(crate) fn as_ref(&self) -> Option<&'guard T> {
    // SAFETY:
    // - `self.inner` is either null or points to a fully initialized `T`
    //   written via `Atomic::write`/`Atomic::swap`.
    // - Only shared references to `T` are created, so aliasing rules are not
    //   violated.
    // - The pointer carries no tag bits.
    unsafe { self.inner.as_ref_unchecked() }
  }
}

#[cfg(test)]
#[inline]
pub(crate) fn try_reclaim() {
  // sdd triggers reclamation after we've observed three new epochs.
  sdd::Guard::new().accelerate();
  sdd::Guard::new().accelerate();
  sdd::Guard::new().accelerate();

  drop(sdd::Guard::new());
}
