//! Pure functions on raw block addresses.
//!
//! A "block pointer" (`bp`) always points at the first byte of a block's
//! payload area. The header word lives at `bp - WSIZE`, the footer word at
//! `bp + size - DSIZE`. None of these functions mutate allocator state beyond
//! the single word they are asked to touch; all allocator-level bookkeeping
//! (the free list, the heap bounds) lives in [`crate::alloc`].
//!
//! The low 4 bits of a header/footer word are reserved for flags. Only bit 0
//! (the allocation flag) is currently defined; the other three must stay
//! zero, since `size_of` masks them out rather than validating them.

/// Machine word size in bytes.
pub(crate) const WSIZE: usize = 8;
/// Double-word size in bytes; also the required block-size granularity and
/// payload alignment.
pub(crate) const DSIZE: usize = 16;
/// Smallest possible block: header + two free-list link words + footer.
pub(crate) const MIN_BLOCK_SIZE: usize = 32;
/// Default heap growth quantum when no fit exists.
pub(crate) const CHUNKSIZE: usize = 4096;

const ALLOC_BIT: usize = 0x1;
const SIZE_MASK: usize = !0x0F;

/// Packs a block size and allocation flag into a header/footer word.
#[inline]
pub(crate) fn pack(
  size: usize,
  alloc: bool,
) -> usize {
  size | (alloc as usize)
}

#[inline]
unsafe fn read_word(addr: *mut usize) -> usize {
  unsafe { addr.read() }
}

#[inline]
unsafe fn write_word(
  addr: *mut usize,
  value: usize,
) {
  unsafe { addr.write(value) }
}

/// Address of `bp`'s header word.
#[inline]
pub(crate) unsafe fn header(bp: *mut u8) -> *mut usize {
  unsafe { bp.sub(WSIZE) as *mut usize }
}

/// Address of `bp`'s footer word, using `bp`'s current stored size.
#[inline]
pub(crate) unsafe fn footer(bp: *mut u8) -> *mut usize {
  unsafe { footer_for_size(bp, size_of(bp)) }
}

#[inline]
unsafe fn footer_for_size(
  bp: *mut u8,
  size: usize,
) -> *mut usize {
  unsafe { bp.add(size - DSIZE) as *mut usize }
}

/// Total block size in bytes (header + payload + footer), masking off the
/// reserved low bits.
#[inline]
pub(crate) unsafe fn size_of(bp: *mut u8) -> usize {
  unsafe { read_word(header(bp)) & SIZE_MASK }
}

/// Whether `bp`'s allocation bit is set.
#[inline]
pub(crate) unsafe fn is_allocated(bp: *mut u8) -> bool {
  unsafe { read_word(header(bp)) & ALLOC_BIT != 0 }
}

/// Raw header word, including the reserved bits. Used by `check_heap` to
/// compare header and footer for exact equality rather than just size+alloc.
#[inline]
pub(crate) unsafe fn header_word(bp: *mut u8) -> usize {
  unsafe { read_word(header(bp)) }
}

/// Raw footer word for the block's currently stored size.
#[inline]
pub(crate) unsafe fn footer_word(bp: *mut u8) -> usize {
  unsafe { read_word(footer(bp)) }
}

/// Writes `(size, alloc)` to both header and footer of `bp`.
///
/// Callers choose `size` explicitly (rather than reusing `size_of(bp)`)
/// because this is exactly the operation used to change a block's size,
/// e.g. when splitting off a residue.
pub(crate) unsafe fn set_block(
  bp: *mut u8,
  size: usize,
  alloc: bool,
) {
  let word = pack(size, alloc);
  unsafe {
    write_word(header(bp), word);
    write_word(footer_for_size(bp, size), word);
  }
}

/// Block pointer of the next block in physical (address) order.
#[inline]
pub(crate) unsafe fn next_phys(bp: *mut u8) -> *mut u8 {
  unsafe { bp.add(size_of(bp)) }
}

/// Block pointer of the previous block in physical (address) order, found
/// via its footer at `bp - DSIZE`.
#[inline]
pub(crate) unsafe fn prev_phys(bp: *mut u8) -> *mut u8 {
  unsafe {
    let prev_footer = bp.sub(DSIZE) as *mut usize;
    let prev_size = read_word(prev_footer) & SIZE_MASK;
    bp.sub(prev_size)
  }
}

/// Reads the "previous free block" link from a free block's payload.
///
/// # Safety
///
/// `bp` must currently be in the free state; an allocated block's payload
/// holds caller data at this offset, not a link pointer.
#[inline]
pub(crate) unsafe fn read_link_prev(bp: *mut u8) -> *mut u8 {
  unsafe { (bp as *mut *mut u8).read() }
}

/// # Safety
///
/// See [`read_link_prev`].
#[inline]
pub(crate) unsafe fn write_link_prev(
  bp: *mut u8,
  value: *mut u8,
) {
  unsafe { (bp as *mut *mut u8).write(value) }
}

/// Reads the "next free block" link from a free block's payload.
///
/// # Safety
///
/// See [`read_link_prev`].
#[inline]
pub(crate) unsafe fn read_link_next(bp: *mut u8) -> *mut u8 {
  unsafe { (bp.add(WSIZE) as *mut *mut u8).read() }
}

/// # Safety
///
/// See [`read_link_prev`].
#[inline]
pub(crate) unsafe fn write_link_next(
  bp: *mut u8,
  value: *mut u8,
) {
  unsafe { (bp.add(WSIZE) as *mut *mut u8).write(value) }
}
