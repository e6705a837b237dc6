//! The locked, process-wide physical frame allocator.

use crate::bitmap::FrameBitmap;
use core::cell::RefCell;
use kernel_info::boot::{KernelImage, MemoryRegion};
use kernel_interrupts::InterruptControl;
use kernel_memory_addresses::PhysicalAddress;
use kernel_sync::ReentrantLock;

/// Source of single 4 KiB physical frames.
///
/// Consumers (the heap, thread stacks) only ever see this trait.
pub trait FrameAlloc {
    /// One free, frame-aligned physical frame, or `None` when memory is exhausted.
    fn alloc_frame(&self) -> Option<PhysicalAddress>;

    /// Give back a frame obtained from [`alloc_frame`](Self::alloc_frame).
    fn free_frame(&self, frame: PhysicalAddress);
}

/// A [`FrameBitmap`] behind a [`ReentrantLock`].
///
/// Every operation runs with interrupts disabled, so an interrupt handler that
/// allocates can never observe a half-updated bitmap.
pub struct FrameAllocator<const BYTES: usize, I: InterruptControl> {
    bitmap: ReentrantLock<RefCell<FrameBitmap<BYTES>>, I>,
}

impl<const BYTES: usize, I: InterruptControl> FrameAllocator<BYTES, I> {
    /// An allocator for `frames` frames, all allocated until [`reset`](Self::reset).
    #[must_use]
    pub const fn new(frames: usize, irq: I) -> Self {
        Self {
            bitmap: ReentrantLock::new(RefCell::new(FrameBitmap::new(frames)), irq),
        }
    }

    /// Rebuild the bitmap from the boot memory map and kernel footprint.
    pub fn reset(&self, memory_map: &[MemoryRegion], kernel: KernelImage) {
        self.with_bitmap(|b| b.reset(memory_map, kernel));
    }

    #[must_use]
    pub fn allocate(&self) -> Option<PhysicalAddress> {
        self.with_bitmap(FrameBitmap::allocate)
    }

    /// # Panics
    /// If `frame` is unaligned, outside the bitmap, or not allocated.
    pub fn free(&self, frame: PhysicalAddress) {
        self.with_bitmap(|b| b.free(frame));
    }

    #[must_use]
    pub fn is_allocated(&self, frame: PhysicalAddress) -> bool {
        self.bitmap.lock().borrow().is_allocated(frame)
    }

    pub fn mark_range_allocated(&self, start: PhysicalAddress, end: PhysicalAddress) {
        self.with_bitmap(|b| b.mark_range_allocated(start, end));
    }

    pub fn mark_range_free(&self, start: PhysicalAddress, end: PhysicalAddress) {
        self.with_bitmap(|b| b.mark_range_free(start, end));
    }

    #[must_use]
    pub fn free_frames(&self) -> usize {
        self.bitmap.lock().borrow().free_frames()
    }

    #[must_use]
    pub fn total_frames(&self) -> usize {
        self.bitmap.lock().borrow().total_frames()
    }

    #[must_use]
    pub fn next_frame_hint(&self) -> usize {
        self.bitmap.lock().borrow().next_frame_hint()
    }

    /// Run `f` on the bitmap with the lock held.
    pub fn with_bitmap<R>(&self, f: impl FnOnce(&mut FrameBitmap<BYTES>) -> R) -> R {
        let guard = self.bitmap.lock();
        let mut bitmap = guard.borrow_mut();
        f(&mut bitmap)
    }
}

impl<const BYTES: usize, I: InterruptControl> FrameAlloc for FrameAllocator<BYTES, I> {
    #[inline]
    fn alloc_frame(&self) -> Option<PhysicalAddress> {
        self.allocate()
    }

    #[inline]
    fn free_frame(&self, frame: PhysicalAddress) {
        self.free(frame);
    }
}

impl<A: FrameAlloc + ?Sized> FrameAlloc for &A {
    #[inline]
    fn alloc_frame(&self) -> Option<PhysicalAddress> {
        (**self).alloc_frame()
    }

    #[inline]
    fn free_frame(&self, frame: PhysicalAddress) {
        (**self).free_frame(frame);
    }
}
