//! # expfree_allocator — an explicit free-list heap allocator
//!
//! This crate provides a **drop-in dynamic memory allocator** built around
//! an explicit, doubly-linked free list with boundary-tag coalescing —
//! the classic first-fit/boundary-tag design, generalized from this
//! crate's original bump allocator into a real reuse-capable heap manager.
//!
//! ## Overview
//!
//! Unlike a bump allocator (which never reclaims freed space until the
//! whole arena is dropped), this allocator tracks free blocks explicitly
//! and reuses them:
//!
//! ```text
//!   Explicit Free List Allocator Concept:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                         HEAP MEMORY                                  │
//!   │                                                                      │
//!   │  ┌──────┐ ┌────┐ ┌──────┐ ┌────┐ ┌──────┐ ┌────┐ ┌───────────────┐  │
//!   │  │ prol │ │ A1 │ │ free │ │ A2 │ │ free │ │ A3 │ │   epilogue    │  │
//!   │  └──────┘ └────┘ └──────┘ └────┘ └──────┘ └────┘ └───────────────┘  │
//!   │             ▲        │               │                              │
//!   │             └────────┴───────────────┘                              │
//!   │                 free list, threaded through payloads, LIFO order    │
//!   └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every block carries a header and footer word (a "boundary tag") so that
//! freeing a block can examine both physical neighbors in O(1) and merge
//! with whichever ones are also free — no linear scan of the heap is ever
//! needed to coalesce.
//!
//! ## Crate Structure
//!
//! ```text
//!   expfree_allocator
//!   ├── align    - Alignment macros (align!, align_to!)
//!   ├── block    - Pure header/footer/link accessors over raw addresses
//!   ├── region   - The sbrk-like region provider interface + implementations
//!   ├── error    - Allocator and region failure kinds
//!   ├── alloc    - The Allocator core: placement, growth, coalescing
//!   └── global   - A GlobalAlloc adapter over Allocator<SbrkRegion>
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use expfree_allocator::{Allocator, SbrkRegion};
//!
//! let mut allocator = Allocator::new(SbrkRegion::new());
//! allocator.initialize().expect("heap init failed");
//!
//! unsafe {
//!     let p = allocator.allocate(40) as *mut u8;
//!     assert!(!p.is_null());
//!     p.write(0x42);
//!     assert_eq!(p.read(), 0x42);
//!     allocator.free(p);
//! }
//! ```
//!
//! ## Block Layout
//!
//! ```text
//!   Single Allocated Block:
//!   ┌──────────┬──────────────────────────────────┬──────────┐
//!   │  header  │             payload              │  footer  │
//!   │ (8 bytes)│     (size - 16 bytes usable)      │ (8 bytes)│
//!   └──────────┴──────────────────────────────────┴──────────┘
//!              ▲
//!              └── pointer returned to the caller (16-byte aligned)
//!
//!   Single Free Block (payload repurposed as free-list links):
//!   ┌──────────┬────────────┬────────────┬────────────────────┬──────────┐
//!   │  header  │ prev link  │ next link  │   unused payload    │  footer  │
//!   │ (8 bytes)│  (8 bytes) │  (8 bytes) │    (may be empty)   │ (8 bytes)│
//!   └──────────┴────────────┴────────────┴────────────────────┴──────────┘
//! ```
//!
//! ## Heap Skeleton
//!
//! ```text
//!   ┌──────┬───────────────┬──────────────... real blocks ...┬───────────┐
//!   │ pad  │   prologue    │                                  │ epilogue  │
//!   │ (8B) │ (32B, alloc)  │                                  │ (0B hdr)  │
//!   └──────┴───────────────┴──────────────────────────────────┴───────────┘
//! ```
//!
//! The prologue and epilogue are permanently allocated sentinels: the
//! prologue gives every real block a non-null, always-allocated physical
//! predecessor, and the epilogue gives every real block a non-null,
//! always-allocated physical successor — so coalescing never needs a
//! special case for the heap's two ends.
//!
//! ## Features
//!
//! - **First-fit placement** with block splitting when a residue would
//!   still meet the minimum block size.
//! - **Immediate boundary-tag coalescing**, on both `free` and heap growth.
//! - **LIFO explicit free list**, threaded through freed payloads — no
//!   separate free-list storage is allocated.
//! - **Pluggable region provider**: production code grows into the real
//!   process break via `sbrk`; tests grow into a private fixed buffer.
//!
//! ## Limitations
//!
//! - **Single-threaded core**: callers must serialize access themselves
//!   (the `global` module's `SystemAllocator` supplies a mutex for exactly
//!   this purpose).
//! - **No heap shrinking**: the region only grows; freed tail space is
//!   never returned to the region provider.
//! - **Fixed 16-byte alignment**: every payload pointer is 16-byte
//!   aligned; requests for coarser alignment are not supported.
//!
//! ## Safety
//!
//! This crate is inherently unsafe as it deals with raw memory management
//! over a single shared byte buffer. `Allocator::allocate`/`free`/
//! `reallocate` are safe to *call* (the unsafety is internal to the block
//! bookkeeping), but using the returned pointers is exactly as unsafe as
//! using any other raw pointer: they alias caller-managed memory with no
//! Rust-level lifetime tracking.

pub mod align;
mod block;
pub mod alloc;
pub mod error;
pub mod global;
pub mod region;

pub use alloc::{Allocator, HeapReport};
pub use error::AllocError;
pub use global::SystemAllocator;
pub use region::{RegionError, RegionProvider, SbrkRegion, VecRegion};
