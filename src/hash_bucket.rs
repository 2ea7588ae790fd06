//! A wait-free, open-addressed hash table built over one [`Bucket`].

use core::fmt::Debug;
use core::fmt::Formatter;
use core::fmt::Result as FmtResult;

use sdd::Guard;

use crate::bucket::Bucket;
use crate::params::DefaultParams;
use crate::params::Params;

/// The result of [`FixedSizeHashBucket::add`].
#[derive(Debug)]
pub enum AddOutcome<K, V> {
  /// The entry was inserted at the returned slot index.
  Inserted(usize),
  /// The slot was already occupied by an entry with the same key; the
  /// table is unchanged.
  Duplicate,
  /// The slot was occupied by a different key. The caller's key and value
  /// are handed back so it can retry with a higher probe offset.
  Collision(K, V),
}

/// A fixed-capacity hash table with caller-driven open addressing.
///
/// The caller chooses the probe offset `o` for every operation; the table
/// itself never scans. This keeps every operation here wait-free (bounded
/// work per call) at the cost of exposing probing to the caller. See
/// [`probe::Prober`](crate::probe::Prober) for a convenience layer that
/// automates the offset walk (and is, consequently, only lock-free).
pub struct FixedSizeHashBucket<K, V, P = DefaultParams>
where
  K: 'static,
  V: 'static,
  P: Params + ?Sized,
{
  bucket: Bucket<(K, V), P>,
}

impl<K, V, P> FixedSizeHashBucket<K, V, P>
where
  K: 'static,
  V: 'static,
  P: Params + ?Sized,
{
  /// Creates a new, empty hash bucket of capacity [`Params::LENGTH`].
  pub fn new() -> Self {
    Self { bucket: Bucket::new() }
  }

  /// The number of slots in the table.
  #[inline]
  pub fn capacity(&self) -> usize {
    self.bucket.capacity()
  }

  /// The number of occupied slots, observed at the moment of the call.
  #[inline]
  pub fn count(&self) -> usize {
    self.bucket.count()
  }

  /// The slot index for `hash` at probe offset `o`: `(hash + o) & (N - 1)`.
  #[inline]
  pub fn index(&self, hash: u64, offset: usize) -> usize {
    (hash.wrapping_add(offset as u64) as usize) & (self.capacity() - 1)
  }

  /// Inserts `(key, value)` at `index(hash, offset)`.
  ///
  /// Succeeds only if that slot is empty. If the slot holds an entry with
  /// the same key, reports [`AddOutcome::Duplicate`] without touching the
  /// table. If it holds a different key, reports [`AddOutcome::Collision`]
  /// and hands the key/value back for a retry at a higher offset.
  pub fn add(&self, key: K, value: V, hash: u64, offset: usize, guard: &Guard) -> AddOutcome<K, V>
  where
    K: Eq,
  {
    let index = self.index(hash, offset);

    match self.bucket.insert(index, guard, (key, value)) {
      Ok(()) => AddOutcome::Inserted(index),
      Err((key, value)) => {
        let is_duplicate = self.bucket.with(index, guard, |existing: &(K, V)| existing.0 == key).unwrap_or(false);

        if is_duplicate {
          AddOutcome::Duplicate
        } else {
          AddOutcome::Collision(key, value)
        }
      }
    }
  }

  /// Returns the slot index holding `key` at offset `o`, if occupied by a
  /// matching key.
  pub fn contains_key(&self, key: &K, hash: u64, offset: usize, guard: &Guard) -> Option<usize>
  where
    K: Eq,
  {
    let index = self.index(hash, offset);

    self.bucket.with(index, guard, |existing: &(K, V)| &existing.0 == key).filter(|matched| *matched).map(|_| index)
  }

  /// Returns a clone of the value stored for `key` at offset `o`, if present.
  pub fn try_get_value(&self, key: &K, hash: u64, offset: usize, guard: &Guard) -> Option<V>
  where
    K: Eq,
    V: Clone,
  {
    let index = self.index(hash, offset);

    self.bucket.with(index, guard, |existing: &(K, V)| (existing.0 == *key).then(|| existing.1.clone())).flatten()
  }

  /// Removes and returns the value stored for `key` at offset `o`, if the
  /// slot is still occupied by a matching key.
  ///
  /// This is a no-op, not a retry, if the slot's content changed between
  /// an earlier observation and this call.
  pub fn remove(&self, key: &K, hash: u64, offset: usize, guard: &Guard) -> Option<V>
  where
    K: Eq,
  {
    let index = self.index(hash, offset);

    self.bucket.remove_if(index, guard, |existing: &(K, V)| existing.0 == *key).map(|(_, value)| value)
  }

  /// Replaces (or inserts) the value for `key` at offset `o`.
  ///
  /// Succeeds if the slot is empty, or occupied by a matching key. Reports
  /// whether the result is a fresh insertion. Fails (handing the key/value
  /// back) if the slot holds a different key.
  pub fn set(&self, key: K, value: V, hash: u64, offset: usize, guard: &Guard) -> Result<bool, (K, V)>
  where
    K: Eq + Clone,
  {
    let index = self.index(hash, offset);
    let probe_key = key.clone();

    self.bucket.set_if(index, guard, move |existing: &(K, V)| existing.0 == probe_key, (key, value))
  }

  /// Iterates over occupied `(key, value)` entries in index order.
  ///
  /// Snapshot-free: entries added or removed during iteration may or may
  /// not be observed.
  pub fn iter<'a>(&'a self, guard: &'a Guard) -> impl Iterator<Item = (K, V)> + 'a
  where
    K: Clone,
    V: Clone,
  {
    self.bucket.iter(guard).map(|(_, pair)| pair)
  }

  /// Iterates over occupied keys in index order.
  pub fn keys<'a>(&'a self, guard: &'a Guard) -> impl Iterator<Item = K> + 'a
  where
    K: Clone,
    V: Clone,
  {
    self.iter(guard).map(|(key, _)| key)
  }

  /// Iterates over occupied values in index order.
  pub fn values<'a>(&'a self, guard: &'a Guard) -> impl Iterator<Item = V> + 'a
  where
    K: Clone,
    V: Clone,
  {
    self.iter(guard).map(|(_, value)| value)
  }
}

impl<K, V, P> Default for FixedSizeHashBucket<K, V, P>
where
  K: 'static,
  V: 'static,
  P: Params + ?Sized,
{
  fn default() -> Self {
    Self::new()
  }
}

impl<K, V, P> Debug for FixedSizeHashBucket<K, V, P>
where
  K: 'static,
  V: 'static,
  P: Params + ?Sized,
{
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    f.debug_struct("FixedSizeHashBucket")
      .field("capacity", &self.capacity())
      .field("count", &self.count())
      .finish()
  }
}
