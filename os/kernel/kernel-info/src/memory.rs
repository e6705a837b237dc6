//! # Memory Layout and Capacities

use kernel_memory_addresses::FRAME_SIZE;

/// Highest amount of physical memory the frame bitmap can describe.
pub const PHYSICAL_MEMORY_LIMIT: u64 = 4 * 1024 * 1024 * 1024; // 4 GiB

/// Number of frames covered by the frame bitmap.
#[allow(clippy::cast_possible_truncation)]
pub const TOTAL_FRAMES: usize = (PHYSICAL_MEMORY_LIMIT / FRAME_SIZE) as usize;

/// Size of the frame bitmap in bytes (one bit per frame).
pub const FRAME_BITMAP_SIZE: usize = TOTAL_FRAMES / 8;

/// Capacity of the thread table.
pub const MAX_THREADS: usize = 64;

/// Frames backing each kernel thread stack.
pub const THREAD_STACK_FRAMES: usize = 1;

/// Code segment selector every interrupt gate runs with.
pub const KERNEL_CODE_SELECTOR: u16 = 0x08;

/// Number of interrupt vectors on the reference target.
pub const VECTOR_COUNT: usize = 256;

const _: () = {
    assert!(PHYSICAL_MEMORY_LIMIT.is_multiple_of(FRAME_SIZE * 8));
    assert!(FRAME_BITMAP_SIZE * 8 == TOTAL_FRAMES);
    assert!(MAX_THREADS > 0);
    assert!(THREAD_STACK_FRAMES > 0);
    assert!(KERNEL_CODE_SELECTOR & 0b111 == 0);
};
