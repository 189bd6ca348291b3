//! Allocator-level error kinds. The public allocate/free/reallocate contract
//! (spec §7) surfaces failures as null pointers, matching a C allocator's
//! ABI, so `AllocError` is consumed internally and by `Allocator::initialize`
//! rather than threaded through every public method's return type.

use std::fmt;

/// Failure modes the core allocator can encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
  /// The region provider refused to grow the heap.
  OutOfMemory,
  /// `initialize` could not obtain its initial sentinel region.
  InitFailed,
}

impl fmt::Display for AllocError {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      AllocError::OutOfMemory => write!(f, "heap growth failed: region provider exhausted"),
      AllocError::InitFailed => write!(f, "heap initialization failed: could not obtain sentinel region"),
    }
  }
}

impl std::error::Error for AllocError {}
