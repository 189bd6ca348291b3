use std::io::Read;

use expfree_allocator::{Allocator, SbrkRegion};
use libc::sbrk;

/// Waits until the user presses ENTER.
/// Useful when you want to inspect memory state with tools like `pmap`,
/// `htop`, `gdb`, or just visually track how allocations change the
/// program break.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

/// Prints the current program break using `sbrk(0)`.
unsafe fn print_program_break(label: &str) {
  println!(
    "[{}] PID = {}, program break (sbrk(0)) = {:?}",
    label,
    std::process::id(),
    unsafe { sbrk(0) },
  );
}

fn main() {
  let mut allocator = Allocator::new(SbrkRegion::new());
  allocator.initialize().expect("heap init failed");

  unsafe {
    print_program_break("start");
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 1) Allocate 40 bytes and write a byte pattern into them.
    // --------------------------------------------------------------------
    let first_block = allocator.allocate(40);
    println!("\n[1] Allocate 40 bytes -> {:?}", first_block);
    first_block.write(0xAB);
    println!("[1] Value written to first_block = 0x{:X}", first_block.read());

    let report = allocator.check_heap(false);
    println!("[1] check_heap ok = {}", report.is_ok());
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 2) Allocate another block, observe the free-list / block counts.
    // --------------------------------------------------------------------
    let second_block = allocator.allocate(128);
    println!("\n[2] Allocate 128 bytes -> {:?}", second_block);
    println!(
      "[2] block_count={} free_block_count={}",
      allocator.block_count(),
      allocator.free_block_count()
    );
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 3) Free the first block; watch it rejoin the free list.
    // --------------------------------------------------------------------
    allocator.free(first_block);
    println!("\n[3] Freed first_block at {:?}", first_block);
    println!(
      "[3] block_count={} free_block_count={}",
      allocator.block_count(),
      allocator.free_block_count()
    );
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 4) Allocate a small block, observe whether it reuses the freed one.
    // --------------------------------------------------------------------
    let third_block = allocator.allocate(16);
    println!("\n[4] Allocate 16 bytes -> {:?}", third_block);
    println!(
      "[4] third_block == first_block? {}",
      if third_block == first_block {
        "yes, reused the freed block"
      } else {
        "no, placed elsewhere"
      }
    );
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 5) Grow the heap with a large allocation, observe program break move.
    // --------------------------------------------------------------------
    print_program_break("before large alloc");
    let big_block = allocator.allocate(64 * 1024);
    println!("\n[5] Allocate 64 KiB -> {:?}", big_block);
    print_program_break("after large alloc");
    block_until_enter_pressed();

    // --------------------------------------------------------------------
    // 6) Reallocate the second block larger; observe in-place vs relocate.
    // --------------------------------------------------------------------
    let grown = allocator.reallocate(second_block, 4000);
    println!(
      "\n[6] Reallocate second_block(128 -> 4000) -> {:?} (same pointer? {})",
      grown,
      grown == second_block
    );

    let report = allocator.check_heap(true);
    println!("[6] check_heap ok = {}", report.is_ok());

    println!("\n[7] End of demo. Process will exit and the OS reclaims everything.");
  }
}
