//! Wait-free fixed-capacity buckets, and a lock-free growable deque built on
//! top of them.
//!
//! # Overview
//!
//! - [`Slot`]: one cell holding "empty" or a value.
//! - [`Bucket`]: a fixed-capacity array of slots with an accurate live count.
//! - [`FixedSizeHashBucket`]: an open-addressed hash table over one `Bucket`,
//!   with caller-driven probe offsets.
//! - [`FixedSizeDeque`]: a fixed-capacity ring with independent front/back
//!   ends.
//! - [`Deque`]: an unbounded deque that grows by cooperatively migrating
//!   entries from one `FixedSizeDeque`-like ring to a doubled replacement.
//!
//! Every operation on the fixed-size types is wait-free: a single
//! compare-and-swap attempt, reported as success or failure, never retried
//! internally. [`Deque`] is lock-free: it retries internally, bounded by the
//! resize protocol eventually completing.
//!
//! # Usage
//!
//! ```
//! use bucketq::{Bucket, ConstParams};
//! use sdd::Guard;
//!
//! let bucket: Bucket<String, ConstParams<64>> = Bucket::new();
//! let guard = Guard::new();
//!
//! assert!(bucket.insert(3, &guard, "hello".to_string()).is_ok());
//! assert_eq!(bucket.with(3, &guard, |s: &String| s.to_uppercase()), Some("HELLO".to_string()));
//! assert_eq!(bucket.remove(3, &guard), Some("hello".to_string()));
//! ```
//!
//! The growable [`Deque`] needs no capacity parameter up front:
//!
//! ```
//! use bucketq::Deque;
//!
//! let deque: Deque<u64> = Deque::new();
//! deque.add_back(1);
//! deque.add_front(0);
//! assert_eq!(deque.try_take_front(), Some(0));
//! assert_eq!(deque.try_take_back(), Some(1));
//! ```
//!
//! # Configuration
//!
//! Fixed-size component capacity is configured at compile time through the
//! [`Params`] trait. The default configuration ([`DefaultParams`]) provides
//! [`Capacity::DEF`] slots; [`ConstParams<N>`] rounds `N` up to the next
//! power of two. Capacity is always clamped to
//! <code>[Capacity::MIN]..=[Capacity::MAX]</code>.
//!
//! # Concurrency
//!
//! All operations are thread-safe. The fixed-size types never block and
//! never retry internally; [`Deque`] never blocks but does retry internally
//! while participating in a resize.
//!
//! ## Memory Reclamation
//!
//! Slot values removed from a [`Bucket`] are reclaimed using epoch-based
//! memory management via [`sdd`]. [`Deque`]'s old ring, displaced during a
//! resize, is reclaimed the same way: concurrent readers that observed it
//! before the swap can keep reading it safely until no such reader remains
//! pinned.
//!
//! # Memory Layout
//!
//! Hot, independently-mutated counters (live counts, front/back/pre-count,
//! revision, status, copying-threads) are cache-line padded away from each
//! other and from the read-mostly slot arrays, to minimize false sharing
//! between threads operating on unrelated state.
//!
//! [`sdd`]: https://docs.rs/sdd

mod array;
mod bucket;
mod deque;
mod error;
mod fixed_deque;
mod hash_bucket;
mod padded;
mod params;
mod priority;
mod probe;
mod reclaim;
mod slot;
#[cfg(test)]
mod utils;

pub use self::bucket::Bucket;
pub use self::deque::Deque;
pub use self::deque::DequeIter;
pub use self::error::EmptyDeque;
pub use self::fixed_deque::FixedSizeDeque;
pub use self::hash_bucket::AddOutcome;
pub use self::hash_bucket::FixedSizeHashBucket;
pub use self::params::CACHE_LINE;
pub use self::params::Capacity;
pub use self::params::ConstParams;
pub use self::params::DebugParams;
pub use self::params::DefaultParams;
pub use self::params::Params;
pub use self::params::ParamsExt;
pub use self::probe::Prober;

mod alloc {
  #[cfg(loom)]
  mod exports {
    pub(crate) use ::loom::alloc::alloc;
    pub(crate) use ::loom::alloc::dealloc;
    pub(crate) use ::std::alloc::handle_alloc_error;
  }

  #[cfg(not(loom))]
  mod exports {
    pub(crate) use ::std::alloc::alloc;
    pub(crate) use ::std::alloc::dealloc;
    pub(crate) use ::std::alloc::handle_alloc_error;
  }

  pub(crate) use self::exports::*;
}

mod sync {
  #[cfg(not(loom))]
  mod exports {
    pub(crate) mod atomic {
      pub(crate) use ::core::sync::atomic::AtomicUsize;
      pub(crate) use ::core::sync::atomic::Ordering;
    }
  }

  #[cfg(loom)]
  mod exports {
    pub(crate) mod atomic {
      pub(crate) use ::loom::sync::atomic::AtomicUsize;
      pub(crate) use ::loom::sync::atomic::Ordering;
    }
  }

  pub(crate) use self::exports::*;
}
