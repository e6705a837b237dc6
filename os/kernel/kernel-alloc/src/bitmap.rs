use kernel_info::boot::{KernelImage, MemoryRegion};
use kernel_memory_addresses::{PhysicalAddress, PhysicalFrame};
use utils_ring_scan::find_from;

/// One bit per physical frame: `1` allocated or unavailable, `0` free.
///
/// `BYTES` fixes the storage at compile time; `frames` says how many of the
/// `8 * BYTES` bits describe real frames. The remaining bits stay set, so they
/// are never handed out.
///
/// ### Invariants
/// - A free frame's bit is `0`; [`allocate`](Self::allocate) never returns a
///   frame whose bit was already `1`.
/// - `free` counts exactly the zero bits below `frames`.
pub struct FrameBitmap<const BYTES: usize> {
    bitmap: [u8; BYTES],
    frames: usize,
    free: usize,
    /// Frame most likely to be free; the scan starts here.
    next_frame: usize,
}

impl<const BYTES: usize> FrameBitmap<BYTES> {
    /// A bitmap of `frames` frames, all allocated.
    ///
    /// # Panics
    /// If `frames` exceeds the `8 * BYTES` bits of storage.
    #[must_use]
    pub const fn new(frames: usize) -> Self {
        assert!(frames <= BYTES * 8, "frame count exceeds bitmap storage");
        Self {
            bitmap: [0xFF; BYTES],
            frames,
            free: 0,
            next_frame: 0,
        }
    }

    /// Take the lowest free frame at or after the hint, wrapping once.
    ///
    /// The hint's own byte is checked from the hint's bit upward; after that
    /// whole bytes are scanned, and the wrap pass ends with the low bits of
    /// the hint's byte.
    ///
    /// Returns `None` when every frame is allocated.
    pub fn allocate(&mut self) -> Option<PhysicalAddress> {
        if self.frames == 0 {
            return None;
        }

        let hint_byte = self.next_frame / 8;
        let at_or_above_hint = !self.bitmap[hint_byte] & (0xFF << (self.next_frame % 8));
        let (byte, bit) = if at_or_above_hint == 0 {
            let bitmap = &self.bitmap;
            let byte = find_from(hint_byte + 1, self.used_bytes(), |i| bitmap[i] != 0xFF)?;
            (byte, bitmap[byte].trailing_ones() as usize)
        } else {
            (hint_byte, at_or_above_hint.trailing_zeros() as usize)
        };
        let index = byte * 8 + bit;
        debug_assert!(index < self.frames, "padding bit {index} was clear");

        self.bitmap[byte] |= 1 << bit;
        self.free -= 1;
        self.next_frame = index;

        let frame = PhysicalFrame::from_index(index).base();
        log::trace!("allocated frame {frame}");
        Some(frame)
    }

    /// Return `frame` to the pool and make it the next candidate.
    ///
    /// # Panics
    /// If `frame` is unaligned, outside the bitmap, or not allocated.
    pub fn free(&mut self, frame: PhysicalAddress) {
        let index = self.checked_index(frame);
        assert!(self.test(index), "double free of frame {frame}");

        self.clear(index);
        self.next_frame = index;
        log::trace!("freed frame {frame}");
    }

    /// Whether `frame` is allocated. Frames past the bitmap are always unavailable.
    ///
    /// # Panics
    /// If `frame` is unaligned.
    #[must_use]
    pub fn is_allocated(&self, frame: PhysicalAddress) -> bool {
        assert!(frame.is_frame_aligned(), "unaligned frame {frame}");
        let index = frame.frame_index();
        index >= self.frames || self.test(index)
    }

    /// Mark every frame from `start` to `end` (inclusive) allocated.
    ///
    /// # Panics
    /// If either bound is unaligned or `end` lies outside the bitmap.
    pub fn mark_range_allocated(&mut self, start: PhysicalAddress, end: PhysicalAddress) {
        let (first, last) = self.checked_range(start, end);
        for index in first..=last {
            self.set(index);
        }
        log::trace!("marked {start}..={end} allocated");
    }

    /// Mark every frame from `start` to `end` (inclusive) free; the hint moves
    /// to `end`.
    ///
    /// # Panics
    /// If either bound is unaligned or `end` lies outside the bitmap.
    pub fn mark_range_free(&mut self, start: PhysicalAddress, end: PhysicalAddress) {
        let (first, last) = self.checked_range(start, end);
        for index in first..=last {
            self.clear(index);
        }
        self.next_frame = last;
        log::trace!("marked {start}..={end} free");
    }

    /// Rebuild the bitmap from the boot memory map.
    ///
    /// Everything starts allocated. Each whole frame inside an `Available`
    /// region is freed, clamped to the bitmap's coverage. Finally every frame
    /// from `0` through the end of the kernel image is marked allocated again.
    pub fn reset(&mut self, memory_map: &[MemoryRegion], kernel: KernelImage) {
        self.bitmap.fill(0xFF);
        self.free = 0;
        self.next_frame = 0;

        if self.frames == 0 {
            log::warn!("frame bitmap covers no memory");
            return;
        }
        let top = PhysicalFrame::from_index(self.frames - 1).base();

        for region in memory_map.iter().filter(|r| r.is_available()) {
            let Some((first, last)) = region.whole_frames() else {
                log::debug!("skipping region {} with no whole frame", region.start);
                continue;
            };
            if first > top {
                log::warn!("ignoring region {first}..={last} above the frame bitmap");
                continue;
            }
            let last = if last > top {
                log::warn!("clamping region {first}..={last} to {top}");
                top
            } else {
                last
            };
            self.mark_range_free(first, last);
        }

        if let Some(last) = kernel.last_frame() {
            self.mark_range_allocated(PhysicalAddress::zero(), last.min(top));
        }

        log::info!(
            "frame bitmap ready: {} of {} frames free",
            self.free,
            self.frames
        );
    }

    #[inline]
    #[must_use]
    pub const fn free_frames(&self) -> usize {
        self.free
    }

    #[inline]
    #[must_use]
    pub const fn total_frames(&self) -> usize {
        self.frames
    }

    #[inline]
    #[must_use]
    pub const fn next_frame_hint(&self) -> usize {
        self.next_frame
    }

    const fn used_bytes(&self) -> usize {
        self.frames.div_ceil(8)
    }

    fn checked_index(&self, frame: PhysicalAddress) -> usize {
        assert!(frame.is_frame_aligned(), "unaligned frame {frame}");
        let index = frame.frame_index();
        assert!(index < self.frames, "frame {frame} outside the frame bitmap");
        index
    }

    fn checked_range(&self, start: PhysicalAddress, end: PhysicalAddress) -> (usize, usize) {
        assert!(start.is_frame_aligned(), "unaligned range start {start}");
        (start.frame_index(), self.checked_index(end))
    }

    const fn test(&self, index: usize) -> bool {
        self.bitmap[index / 8] & (1 << (index % 8)) != 0
    }

    fn set(&mut self, index: usize) {
        if !self.test(index) {
            self.bitmap[index / 8] |= 1 << (index % 8);
            self.free -= 1;
        }
    }

    fn clear(&mut self, index: usize) {
        if self.test(index) {
            self.bitmap[index / 8] &= !(1 << (index % 8));
            self.free += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const fn pa(v: u64) -> PhysicalAddress {
        PhysicalAddress::new(v)
    }

    #[test]
    fn new_bitmap_has_nothing_to_give() {
        let mut b = FrameBitmap::<2>::new(16);
        assert_eq!(b.free_frames(), 0);
        assert_eq!(b.allocate(), None);
    }

    #[test]
    fn padding_bits_are_never_allocated() {
        let mut b = FrameBitmap::<2>::new(10);
        b.mark_range_free(pa(0), pa(9 * 0x1000));
        assert_eq!(b.free_frames(), 10);
        for _ in 0..10 {
            assert!(b.allocate().is_some());
        }
        assert_eq!(b.allocate(), None);
        assert!(b.is_allocated(pa(10 * 0x1000)));
        assert!(b.is_allocated(pa(100 * 0x1000)));
    }

    #[test]
    fn scan_starts_at_the_hint_frame() {
        let mut b = FrameBitmap::<4>::new(32);
        b.mark_range_free(pa(0), pa(31 * 0x1000));
        // Frames 24..=30 share the hint's byte but lie below it.
        assert_eq!(b.allocate(), Some(pa(31 * 0x1000)));
        assert_eq!(b.next_frame_hint(), 31);
    }

    #[test]
    fn never_allocates_below_the_hint_while_frames_above_are_free() {
        let mut b = FrameBitmap::<2>::new(16);
        b.mark_range_free(pa(14 * 0x1000), pa(15 * 0x1000));
        b.mark_range_free(pa(0), pa(12 * 0x1000));
        assert_eq!(b.next_frame_hint(), 12);

        assert_eq!(b.allocate(), Some(pa(12 * 0x1000)));
        assert_eq!(b.allocate(), Some(pa(14 * 0x1000)));
        assert_eq!(b.allocate(), Some(pa(15 * 0x1000)));
        // Nothing left above: wrap to the low frames.
        assert_eq!(b.allocate(), Some(pa(0)));
        assert_eq!(b.allocate(), Some(pa(0x1000)));
    }

    #[test]
    fn hint_mid_byte_wraps_to_the_bits_below_it() {
        let mut b = FrameBitmap::<1>::new(8);
        b.mark_range_free(pa(0), pa(5 * 0x1000));
        b.mark_range_allocated(pa(5 * 0x1000), pa(5 * 0x1000));
        assert_eq!(b.next_frame_hint(), 5);
        assert_eq!(b.allocate(), Some(pa(0)));
    }

    #[test]
    #[should_panic(expected = "unaligned")]
    fn is_allocated_rejects_unaligned() {
        let b = FrameBitmap::<1>::new(8);
        let _ = b.is_allocated(pa(0x1001));
    }

    #[test]
    #[should_panic(expected = "outside the frame bitmap")]
    fn range_past_coverage_panics() {
        let mut b = FrameBitmap::<1>::new(8);
        b.mark_range_free(pa(0), pa(8 * 0x1000));
    }
}
