//! The region provider: the low-level `sbrk`-like service that supplies
//! contiguous heap growth. This is an external collaborator referenced only
//! by its interface — the core allocator never reaches for `libc::sbrk`
//! directly, it goes through [`RegionProvider`], so tests can substitute a
//! fixed-size in-process buffer instead of mutating the real process break.

use std::fmt;

use crate::block::DSIZE;

/// Failure signaled by a [`RegionProvider`] when it cannot extend the
/// region any further.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionError {
  /// The provider has no more contiguous space to hand out.
  Exhausted,
}

impl fmt::Display for RegionError {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      RegionError::Exhausted => write!(f, "region provider is exhausted"),
    }
  }
}

impl std::error::Error for RegionError {}

/// A source of contiguous, monotonically-growing heap memory.
///
/// Mirrors the `sbrk(2)` contract the teacher crate's `BumpAllocator`
/// already consumes: each call extends the region by exactly `n` bytes and
/// returns the address of the first new byte, which is always the previous
/// region end.
pub trait RegionProvider {
  /// Extends the region by `n` bytes, returning the address of the first
  /// new byte. `n` is always a positive multiple of 16 when called from the
  /// core allocator.
  fn request(
    &mut self,
    n: usize,
  ) -> Result<*mut u8, RegionError>;

  /// Lowest address ever handed out by this provider. Used only by
  /// `check_heap`'s bounds queries, never by the core algorithm itself.
  fn heap_low(&self) -> *const u8;

  /// Address one past the last byte ever handed out by this provider.
  fn heap_high(&self) -> *const u8;
}

/// A [`RegionProvider`] backed by the real process break, via `libc::sbrk`.
///
/// This is the production provider: the allocator grows into genuine
/// process memory, exactly like the teacher crate's `BumpAllocator` does.
pub struct SbrkRegion {
  low: *mut u8,
  high: *mut u8,
}

impl SbrkRegion {
  /// Creates a provider anchored at the current program break.
  pub fn new() -> Self {
    let cur = unsafe { libc::sbrk(0) } as *mut u8;
    Self { low: cur, high: cur }
  }
}

impl Default for SbrkRegion {
  fn default() -> Self {
    Self::new()
  }
}

impl RegionProvider for SbrkRegion {
  fn request(
    &mut self,
    n: usize,
  ) -> Result<*mut u8, RegionError> {
    // The raw program break has no alignment guarantee of its own; pad it
    // up to DSIZE first, the same "request slack, align up" idiom the
    // teacher's `BumpAllocator::allocate` uses for `layout.align()`, just
    // applied to a fixed 16-byte target instead of a caller-supplied one.
    let current = unsafe { libc::sbrk(0) };
    if current == usize::MAX as *mut libc::c_void {
      return Err(RegionError::Exhausted);
    }
    let misalignment = current as usize % DSIZE;
    if misalignment != 0 {
      let pad = DSIZE - misalignment;
      if unsafe { libc::sbrk(pad as libc::intptr_t) } == usize::MAX as *mut libc::c_void {
        return Err(RegionError::Exhausted);
      }
    }

    let raw = unsafe { libc::sbrk(n as libc::intptr_t) };
    // sbrk returns (void*)-1 on failure, matching the teacher's sentinel check.
    if raw == usize::MAX as *mut libc::c_void {
      return Err(RegionError::Exhausted);
    }

    let old_break = raw as *mut u8;
    debug_assert_eq!(old_break as usize % DSIZE, 0);
    self.high = unsafe { old_break.add(n) };
    Ok(old_break)
  }

  fn heap_low(&self) -> *const u8 {
    self.low
  }

  fn heap_high(&self) -> *const u8 {
    self.high
  }
}

/// A [`RegionProvider`] backed by a fixed-capacity in-process buffer.
///
/// Used by the test suite and nowhere else: real `sbrk` is global
/// process state, and the Rust test harness runs tests concurrently, so
/// independent tests calling `initialize` against `SbrkRegion` would race
/// on the same program break. `VecRegion` gives each test its own private
/// heap of bounded size instead.
pub struct VecRegion {
  // Backed by `u128` rather than `u8`: a `Vec<u8>`'s allocation is only
  // byte-aligned, but every address `request` hands out must be DSIZE
  // (16-byte) aligned, same as the real `sbrk` break after `SbrkRegion`
  // pads it. `u128` has a 16-byte alignment, so the whole buffer (and
  // every 16-byte-multiple offset into it) is aligned for free.
  storage: Box<[u128]>,
  used: usize,
}

impl VecRegion {
  /// Creates a region backed by at least `capacity` bytes of private,
  /// 16-byte-aligned storage. The backing allocation never moves or grows
  /// past its capacity, so pointers handed out by `request` stay valid for
  /// the provider's lifetime.
  pub fn with_capacity(capacity: usize) -> Self {
    let words = capacity.div_ceil(DSIZE);
    Self {
      storage: vec![0u128; words].into_boxed_slice(),
      used: 0,
    }
  }

  fn base(&mut self) -> *mut u8 {
    self.storage.as_mut_ptr() as *mut u8
  }

  fn capacity_bytes(&self) -> usize {
    self.storage.len() * DSIZE
  }
}

impl RegionProvider for VecRegion {
  fn request(
    &mut self,
    n: usize,
  ) -> Result<*mut u8, RegionError> {
    if self.used + n > self.capacity_bytes() {
      return Err(RegionError::Exhausted);
    }

    let used = self.used;
    let ptr = unsafe { self.base().add(used) };
    self.used += n;
    Ok(ptr)
  }

  fn heap_low(&self) -> *const u8 {
    self.storage.as_ptr() as *const u8
  }

  fn heap_high(&self) -> *const u8 {
    unsafe { (self.storage.as_ptr() as *const u8).add(self.used) }
  }
}
