//! Convenience layer that drives [`FixedSizeHashBucket`] through increasing
//! probe offsets on behalf of the caller.
//!
//! Everything here is built purely from [`FixedSizeHashBucket`]'s public
//! operations and a [`BuildHasher`]. It is lock-free rather than wait-free:
//! a thread that keeps losing races to other probers can in principle keep
//! retrying, bounded only by the table's capacity per call.

use std::collections::hash_map::RandomState;
use std::hash::BuildHasher;
use std::hash::Hash;

use sdd::Guard;

use crate::hash_bucket::AddOutcome;
use crate::hash_bucket::FixedSizeHashBucket;
use crate::params::Params;

/// Walks probe offsets `0, 1, 2, ...` on behalf of the caller.
pub struct Prober<S = RandomState> {
  hasher: S,
}

impl Prober<RandomState> {
  /// Creates a new prober using `std`'s default, randomly-seeded hasher.
  pub fn new() -> Self {
    Self { hasher: RandomState::new() }
  }
}

impl Default for Prober<RandomState> {
  fn default() -> Self {
    Self::new()
  }
}

impl<S> Prober<S>
where
  S: BuildHasher,
{
  /// Creates a new prober using the given hasher.
  pub fn with_hasher(hasher: S) -> Self {
    Self { hasher }
  }

  fn hash<K>(&self, key: &K) -> u64
  where
    K: Hash,
  {
    self.hasher.hash_one(key)
  }

  /// Inserts `(key, value)`, retrying at increasing offsets until an empty
  /// or duplicate slot is found or the table is exhausted.
  ///
  /// Returns the slot index on a fresh insertion, `None` if the key was
  /// already present, or hands the key/value back if the table is full.
  pub fn insert<K, V, P>(&self, table: &FixedSizeHashBucket<K, V, P>, mut key: K, mut value: V, guard: &Guard) -> Result<Option<usize>, (K, V)>
  where
    K: Eq + Hash,
    P: Params + ?Sized,
  {
    let hash = self.hash(&key);

    for offset in 0..table.capacity() {
      match table.add(key, value, hash, offset, guard) {
        AddOutcome::Inserted(index) => return Ok(Some(index)),
        AddOutcome::Duplicate => return Ok(None),
        AddOutcome::Collision(k, v) => {
          key = k;
          value = v;
        }
      }
    }

    Err((key, value))
  }

  /// Returns the slot index holding `key`, searching increasing offsets
  /// until found or the table is exhausted.
  pub fn find<K, V, P>(&self, table: &FixedSizeHashBucket<K, V, P>, key: &K, guard: &Guard) -> Option<usize>
  where
    K: Eq + Hash,
    P: Params + ?Sized,
  {
    let hash = self.hash(key);
    (0..table.capacity()).find_map(|offset| table.contains_key(key, hash, offset, guard))
  }

  /// Returns a clone of the value stored for `key`, if present anywhere in
  /// the table's probe sequence.
  pub fn get<K, V, P>(&self, table: &FixedSizeHashBucket<K, V, P>, key: &K, guard: &Guard) -> Option<V>
  where
    K: Eq + Hash,
    V: Clone,
    P: Params + ?Sized,
  {
    let hash = self.hash(key);
    (0..table.capacity()).find_map(|offset| table.try_get_value(key, hash, offset, guard))
  }

  /// Removes and returns the value stored for `key`, searching increasing
  /// offsets until a matching occupied slot is found or the table is
  /// exhausted.
  pub fn remove<K, V, P>(&self, table: &FixedSizeHashBucket<K, V, P>, key: &K, guard: &Guard) -> Option<V>
  where
    K: Eq + Hash,
    P: Params + ?Sized,
  {
    let hash = self.hash(key);
    (0..table.capacity()).find_map(|offset| table.remove(key, hash, offset, guard))
  }
}

#[cfg(all(test, not(loom)))]
mod tests {
  use super::*;
  use crate::params::ConstParams;

  type TestParams = ConstParams<8>;

  #[test]
  fn test_insert_find_remove_roundtrip() {
    let table: FixedSizeHashBucket<String, u64, TestParams> = FixedSizeHashBucket::new();
    let prober = Prober::new();
    let guard = Guard::new();

    for i in 0..6u64 {
      let key = format!("key-{i}");
      assert!(matches!(prober.insert(&table, key, i, &guard), Ok(Some(_))));
    }

    assert!(prober.find(&table, &"key-3".to_string(), &guard).is_some());
    assert_eq!(prober.get(&table, &"key-3".to_string(), &guard), Some(3));
    assert_eq!(prober.get(&table, &"missing".to_string(), &guard), None);
  }

  #[test]
  fn test_insert_duplicate_reports_none() {
    let table: FixedSizeHashBucket<u64, &str, TestParams> = FixedSizeHashBucket::new();
    let prober = Prober::new();
    let guard = Guard::new();

    assert!(matches!(prober.insert(&table, 1, "a", &guard), Ok(Some(_))));
    assert_eq!(prober.insert(&table, 1, "b", &guard), Ok(None));
    assert_eq!(prober.get(&table, &1, &guard), Some("a"));
  }

  #[test]
  fn test_remove_then_reinsert() {
    let table: FixedSizeHashBucket<u64, u64, TestParams> = FixedSizeHashBucket::new();
    let prober = Prober::new();
    let guard = Guard::new();

    prober.insert(&table, 1, 100, &guard).unwrap();
    assert_eq!(prober.remove(&table, &1, &guard), Some(100));
    assert_eq!(prober.remove(&table, &1, &guard), None);
    assert!(matches!(prober.insert(&table, 1, 200, &guard), Ok(Some(_))));
    assert_eq!(prober.get(&table, &1, &guard), Some(200));
  }

  #[test]
  fn test_table_full_hands_back_ownership() {
    let table: FixedSizeHashBucket<u64, u64, ConstParams<2>> = FixedSizeHashBucket::new();
    let prober = Prober::new();
    let guard = Guard::new();

    prober.insert(&table, 0, 0, &guard).unwrap();
    prober.insert(&table, 1, 1, &guard).unwrap();

    assert_eq!(prober.insert(&table, 2, 2, &guard), Err((2, 2)));
  }
}
