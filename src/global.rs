//! A [`core::alloc::GlobalAlloc`] adapter over [`Allocator`], so this crate
//! can stand in as `#[global_allocator]` for a hosted test harness — the
//! purpose stated at the top of the spec. The core itself (`alloc`) is
//! deliberately unsynchronized (spec §5: "Operations are serialized by the
//! caller"); this module is where that serialization is actually supplied,
//! kept outside the core so the core's Non-goals around thread safety stay
//! honest.

use std::alloc::{GlobalAlloc, Layout};
use std::sync::Mutex;

use crate::alloc::Allocator;
use crate::region::SbrkRegion;

/// Thread-safe [`GlobalAlloc`] wrapper around an [`Allocator<SbrkRegion>`].
///
/// `initialize` must be called (exactly once, before the first allocation
/// request reaches this allocator) or every `alloc` call will return null.
pub struct SystemAllocator {
  inner: Mutex<Allocator<SbrkRegion>>,
}

impl SystemAllocator {
  /// Creates an uninitialized system allocator anchored at the current
  /// process break.
  pub fn new() -> Self {
    Self {
      inner: Mutex::new(Allocator::new(SbrkRegion::new())),
    }
  }

  /// Performs the heap-skeleton initialization described in spec §4.1.
  /// Must be called before the allocator is installed as
  /// `#[global_allocator]` and put to use.
  pub fn initialize(&self) -> Result<(), crate::error::AllocError> {
    self.inner.lock().unwrap().initialize()
  }
}

impl Default for SystemAllocator {
  fn default() -> Self {
    Self::new()
  }
}

unsafe impl GlobalAlloc for SystemAllocator {
  unsafe fn alloc(
    &self,
    layout: Layout,
  ) -> *mut u8 {
    // The core only guarantees 16-byte alignment; anything coarser is out
    // of scope (spec §3: "every user-facing payload pointer is aligned to
    // 16 bytes").
    if layout.align() > 16 {
      return std::ptr::null_mut();
    }
    self.inner.lock().unwrap().allocate(layout.size())
  }

  unsafe fn dealloc(
    &self,
    ptr: *mut u8,
    _layout: Layout,
  ) {
    self.inner.lock().unwrap().free(ptr);
  }

  unsafe fn realloc(
    &self,
    ptr: *mut u8,
    layout: Layout,
    new_size: usize,
  ) -> *mut u8 {
    if layout.align() > 16 {
      return std::ptr::null_mut();
    }
    self.inner.lock().unwrap().reallocate(ptr, new_size)
  }
}
