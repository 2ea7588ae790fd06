//! The one error type the core surfaces: `peek` on an empty deque.

use core::error::Error;
use core::fmt::Display;
use core::fmt::Formatter;
use core::fmt::Result as FmtResult;

/// Returned by `peek_front`/`peek_back` when the deque has nothing at that
/// end to look at.
///
/// Every other failure in this crate (full, absent, collision, no match) is
/// an expected, non-exceptional outcome reported by `bool`/`Option`; `peek`
/// is the one operation with no value to hand back on failure, so it gets
/// a real error type instead of a sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmptyDeque;

impl Display for EmptyDeque {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    f.write_str("deque is empty at that end")
  }
}

impl Error for EmptyDeque {}
