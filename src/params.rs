//! Compile-time capacity configuration for the fixed-size components.

use core::fmt::Debug;
use core::fmt::Formatter;
use core::fmt::Result as FmtResult;
use core::mem;
use core::num::NonZeroUsize;

use crate::padded::CachePadded;

/// The size of a cache line in bytes.
///
/// Hot, independently-mutated counters (live counts, front/back indices,
/// revision, status) are padded to this width to avoid false sharing between
/// threads touching unrelated fields. On most modern x86-64 systems this is
/// 64 bytes; wider values are used on architectures with larger cache lines.
pub const CACHE_LINE: usize = size_of::<CachePadded<u8>>();

// -----------------------------------------------------------------------------
// Configurable Params
// -----------------------------------------------------------------------------

/// Configuration parameters for a fixed-size component.
///
/// This trait allows customizing capacity at compile time. The simplest way
/// to use custom parameters is through [`ConstParams`]:
///
/// ```
/// use bucketq::ConstParams;
/// use bucketq::Bucket;
///
/// // A bucket with 8,192 slots.
/// type MyBucket<T> = Bucket<T, ConstParams<8192>>;
/// ```
///
/// Note that [`Capacity::new`] clamps values to the valid range and rounds up
/// to the nearest power of two.
pub trait Params {
  /// The number of slots the component can hold.
  ///
  /// This value is rounded up to the nearest power of two and clamped to
  /// [`Capacity::MIN`]`..=`[`Capacity::MAX`].
  const LENGTH: Capacity = DefaultParams::LENGTH;
}

/// Derived parameters computed from [`Params`].
///
/// This trait is automatically implemented for all types that implement
/// [`Params`]; users do not implement it directly.
pub trait ParamsExt: Params + Sealed {
  fn validate() {
    assert!(
      Self::LENGTH.as_usize().checked_mul(size_of::<usize>()).is_some(),
      "invalid params: `LENGTH` is not representable",
    );
  }

  #[inline]
  fn debug() -> DebugParams<Self> {
    DebugParams {
      marker: core::marker::PhantomData,
    }
  }
}

/// A helper type for displaying [`Params`] configuration.
#[derive(Clone, Copy)]
pub struct DebugParams<P>
where
  P: ?Sized,
{
  marker: core::marker::PhantomData<fn(P)>,
}

impl<P> Debug for DebugParams<P>
where
  P: Params + ?Sized,
{
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    f.debug_struct(core::any::type_name::<P>())
      .field("LENGTH", &P::LENGTH)
      .finish()
  }
}

/// The default configuration: 1,024 slots.
#[derive(Clone, Copy)]
#[non_exhaustive]
pub struct DefaultParams;

impl Debug for DefaultParams {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    Debug::fmt(&<Self as ParamsExt>::debug(), f)
  }
}

impl Params for DefaultParams {
  const LENGTH: Capacity = Capacity::DEF;
}

/// A [`Params`] implementation with compile-time configurable capacity.
///
/// `N` is rounded up to the nearest power of two and clamped to
/// [`Capacity::MIN`]`..=`[`Capacity::MAX`].
///
/// ```
/// use bucketq::ConstParams;
/// use bucketq::Params;
///
/// assert_eq!(<ConstParams<1000> as Params>::LENGTH.as_usize(), 1024);
/// ```
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
#[non_exhaustive]
pub struct ConstParams<const N: usize>;

impl<const N: usize> Params for ConstParams<N> {
  const LENGTH: Capacity = Capacity::new(N);
}

mod private {
  pub trait Sealed {}
}

use private::Sealed;

impl<P> Sealed for P where P: Params + ?Sized {}
impl<P> ParamsExt for P where P: Params + ?Sized {}

// -----------------------------------------------------------------------------
// Capacity
// -----------------------------------------------------------------------------

/// A validated component capacity.
///
/// `Capacity` represents a power-of-two value in the range
/// [`MIN`]`..=`[`MAX`]. `MIN` is large enough that a [`FixedSizeDeque`] can
/// accept a front push and a back push without the two counters aliasing the
/// same ring slot; `MAX` is chosen so that ring-index arithmetic (`& (N-1)`)
/// never overflows `usize`.
///
/// [`MIN`]: Self::MIN
/// [`MAX`]: Self::MAX
/// [`FixedSizeDeque`]: crate::FixedSizeDeque
#[derive(Copy, Clone, PartialEq, Eq)]
#[repr(transparent)]
pub struct Capacity(NonZeroUsize);

impl Capacity {
  /// The minimum supported capacity: 2 entries.
  pub const MIN: Self = Self(NonZeroUsize::new(1 << 1).unwrap());

  /// The maximum supported capacity: 2³⁰ entries.
  pub const MAX: Self = Self(NonZeroUsize::new(1 << 30).unwrap());

  /// The default capacity: 1,024 entries.
  pub const DEF: Self = Self(NonZeroUsize::new(1 << 10).unwrap());

  /// Creates a new `Capacity` from an arbitrary value.
  ///
  /// The value is rounded up to the nearest power of two and clamped to
  /// [`MIN`]`..=`[`MAX`].
  ///
  /// ```
  /// use bucketq::Capacity;
  ///
  /// assert_eq!(Capacity::new(5).as_usize(), 8);
  /// assert_eq!(Capacity::new(0), Capacity::MIN);
  /// ```
  ///
  /// [`MIN`]: Self::MIN
  /// [`MAX`]: Self::MAX
  #[inline]
  pub const fn new(value: usize) -> Self {
    let Some(capacity) = value.checked_next_power_of_two() else {
      return Self::MAX;
    };

    if capacity < Self::MIN.as_usize() {
      Self::MIN
    } else if capacity > Self::MAX.as_usize() {
      Self::MAX
    } else {
      // SAFETY: `capacity` is a power of two in `MIN..=MAX` by the branches above.
      unsafe { Self::new_unchecked(capacity) }
    }
  }

  /// Creates a new `Capacity` without validation.
  ///
  /// # Safety
  ///
  /// `value` must be a power of two in the range [`MIN`]`..=`[`MAX`].
  ///
  /// [`MIN`]: Self::MIN
  /// [`MAX`]: Self::MAX
  #[inline]
  pub const unsafe fn new_unchecked(value: usize) -> Self {
    // SAFETY: Caller guarantees `value` is non-zero.
    Self(unsafe { NonZeroUsize::new_unchecked(value) })
  }

  /// Returns the capacity as a [`usize`].
  #[inline]
  pub const fn as_usize(self) -> usize {
    self.0.get()
  }

  /// Returns the capacity as a [`NonZeroUsize`].
  #[inline]
  pub const fn as_nonzero(self) -> NonZeroUsize {
    self.0
  }

  /// Returns the base-2 logarithm of the capacity.
  #[inline]
  pub const fn log2(self) -> u32 {
    self.0.trailing_zeros()
  }

  /// Returns the bitmask used for ring-index wraparound (`N - 1`).
  #[inline]
  pub const fn mask(self) -> usize {
    self.as_usize() - 1
  }
}

impl Debug for Capacity {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    write!(f, "{:?} (1 << {:?})", self.0, self.log2())
  }
}

impl Default for Capacity {
  #[inline]
  fn default() -> Capacity {
    Capacity::DEF
  }
}

impl From<Capacity> for NonZeroUsize {
  #[inline]
  fn from(other: Capacity) -> NonZeroUsize {
    other.as_nonzero()
  }
}

impl From<Capacity> for usize {
  #[inline]
  fn from(other: Capacity) -> usize {
    other.as_usize()
  }
}

const _: () = assert!(mem::size_of::<Capacity>() == mem::size_of::<usize>());
