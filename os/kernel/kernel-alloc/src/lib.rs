//! # Physical Frame Allocation
//!
//! Tracks every 4 KiB physical frame in a bitmap and hands them out one at a
//! time.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │          FrameAllocator (ReentrantLock)             │
//! │    • process-wide singleton                         │
//! │    • interrupts disabled for every operation        │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │                FrameBitmap                          │
//! │    • one bit per frame, 1 = allocated               │
//! │    • next-frame hint, circular byte scan            │
//! │    • rebuilt from the boot memory map               │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Allocation
//!
//! [`FrameBitmap::allocate`] returns the lowest free frame at or after the
//! hint. It checks the rest of the hint's byte, then skips whole full bytes to
//! the end and wraps once to the start. Allocating and freeing both move the
//! hint, so a just-freed frame is the next one handed out.
//!
//! ```rust
//! use kernel_alloc::FrameAllocator;
//! use kernel_interrupts::emulated::EmulatedInterrupts;
//! use kernel_memory_addresses::PhysicalAddress;
//!
//! let frames = FrameAllocator::<1, _>::new(8, EmulatedInterrupts::new());
//! frames.mark_range_free(PhysicalAddress::new(0x1000), PhysicalAddress::new(0x7000));
//! frames.mark_range_free(PhysicalAddress::zero(), PhysicalAddress::zero());
//!
//! assert_eq!(frames.allocate(), Some(PhysicalAddress::new(0x0000)));
//! assert_eq!(frames.allocate(), Some(PhysicalAddress::new(0x1000)));
//! frames.free(PhysicalAddress::new(0x0000));
//! assert_eq!(frames.allocate(), Some(PhysicalAddress::new(0x0000)));
//! ```
//!
//! ## Initialization
//!
//! [`FrameAllocator::reset`] marks all memory allocated, frees the whole
//! frames of each `Available` region of the boot memory map, and reserves
//! everything from address `0` through the end of the kernel image.

#![cfg_attr(not(any(test, doctest)), no_std)]

mod bitmap;
mod frame_alloc;

pub use bitmap::FrameBitmap;
pub use frame_alloc::{FrameAlloc, FrameAllocator};
