use kernel_alloc::{FrameAlloc, FrameAllocator, FrameBitmap};
use kernel_info::boot::{KernelImage, MemoryRegion, MemoryRegionKind};
use kernel_info::memory::{FRAME_BITMAP_SIZE, TOTAL_FRAMES};
use kernel_interrupts::InterruptControl;
use kernel_interrupts::emulated::EmulatedInterrupts;
use kernel_memory_addresses::PhysicalAddress;
use std::collections::HashSet;
use std::panic;

const fn pa(v: u64) -> PhysicalAddress {
    PhysicalAddress::new(v)
}

const TOP: PhysicalAddress = pa(0xFFFF_F000);

fn full_bitmap() -> Box<FrameBitmap<FRAME_BITMAP_SIZE>> {
    Box::new(FrameBitmap::new(TOTAL_FRAMES))
}

#[test]
fn boot_allocator_walkthrough() {
    let mut b = full_bitmap();
    b.mark_range_free(pa(0x1000), TOP);

    assert!(!b.is_allocated(TOP));
    b.mark_range_allocated(TOP, TOP);
    assert!(b.is_allocated(TOP));
    b.free(TOP);
    assert!(!b.is_allocated(TOP));

    // Frees frame 0 and rewinds the hint to it.
    b.mark_range_free(pa(0), pa(0));
    assert_eq!(b.next_frame_hint(), 0);

    assert!(!b.is_allocated(pa(0)));
    assert_eq!(b.allocate(), Some(pa(0x0000)));
    assert_eq!(b.allocate(), Some(pa(0x1000)));
    assert_eq!(b.allocate(), Some(pa(0x2000)));
    assert!(b.is_allocated(pa(0)));
    assert!(!b.is_allocated(TOP));

    b.free(pa(0x1000));
    assert_eq!(b.allocate(), Some(pa(0x1000)));

    b.free(pa(0x0000));
    b.free(pa(0x1000));
    b.free(pa(0x2000));
    let mut handed_out = 0;
    while b.allocate().is_some() {
        handed_out += 1;
    }
    assert_eq!(handed_out, TOTAL_FRAMES);
    assert_eq!(b.free_frames(), 0);
    assert_eq!(b.allocate(), None);

    b.free(pa(1234 * 0x1000));
    assert_eq!(b.allocate(), Some(pa(1234 * 0x1000)));
    assert_eq!(b.allocate(), None);

    b.free(TOP);
    assert_eq!(b.allocate(), Some(TOP));
    assert_eq!(b.allocate(), None);

    b.free(pa(0));
    assert_eq!(b.allocate(), Some(pa(0)));
    assert_eq!(b.allocate(), None);
    assert!(b.is_allocated(pa(0)));
    assert!(b.is_allocated(TOP));
}

#[test]
fn allocations_are_distinct_and_marked() {
    let mut b = FrameBitmap::<8>::new(64);
    b.mark_range_free(pa(0), pa(63 * 0x1000));

    let mut seen = HashSet::new();
    while let Some(frame) = b.allocate() {
        assert!(frame.is_frame_aligned());
        assert!(b.is_allocated(frame));
        assert!(seen.insert(frame), "frame {frame} handed out twice");
    }
    assert_eq!(seen.len(), 64);
}

#[test]
fn allocate_then_free_restores_every_bit() {
    let mut b = FrameBitmap::<4>::new(32);
    b.mark_range_free(pa(0x3000), pa(0x9000));
    b.mark_range_free(pa(0x14000), pa(0x1A000));
    let snapshot = |b: &FrameBitmap<4>| {
        (0..32u64)
            .map(|i| b.is_allocated(pa(i * 0x1000)))
            .collect::<Vec<_>>()
    };
    let before = snapshot(&b);
    let free_before = b.free_frames();

    let frame = b.allocate().unwrap();
    assert_eq!(b.free_frames(), free_before - 1);
    b.free(frame);

    assert_eq!(snapshot(&b), before);
    assert_eq!(b.free_frames(), free_before);
}

#[test]
fn scan_wraps_to_low_frames() {
    let mut b = FrameBitmap::<4>::new(32);
    b.mark_range_free(pa(0), pa(0x1000));
    b.mark_range_free(pa(31 * 0x1000), pa(31 * 0x1000));

    assert_eq!(b.allocate(), Some(pa(31 * 0x1000)));
    assert_eq!(b.allocate(), Some(pa(0)));
    assert_eq!(b.allocate(), Some(pa(0x1000)));
    assert_eq!(b.allocate(), None);
}

#[test]
fn reset_frees_available_memory_above_kernel() {
    let map = [
        MemoryRegion::new(0x0000_0000, 0x0009_FC00, MemoryRegionKind::Available),
        MemoryRegion::new(0x0009_FC00, 0x0000_0400, MemoryRegionKind::Reserved),
        MemoryRegion::new(0x000F_0000, 0x0001_0000, MemoryRegionKind::Reserved),
        MemoryRegion::new(0x0010_0000, 0x0010_0800, MemoryRegionKind::Available),
        MemoryRegion::new(0x0030_0000, 0x0001_0000, MemoryRegionKind::AcpiReclaimable),
    ];
    let kernel = KernelImage::new(0x0015_0010);

    let mut b = full_bitmap();
    b.reset(&map, kernel);

    // Everything up to and including the kernel's last frame is reserved.
    assert!(b.is_allocated(pa(0)));
    assert!(b.is_allocated(pa(0x0008_0000)));
    assert!(b.is_allocated(pa(0x0015_0000)));

    // The rest of the second available region is free, minus the partial tail frame.
    assert!(!b.is_allocated(pa(0x0015_1000)));
    assert!(!b.is_allocated(pa(0x001F_F000)));
    assert!(b.is_allocated(pa(0x0020_0000)));

    // Non-available kinds stay allocated.
    assert!(b.is_allocated(pa(0x0030_0000)));
    assert!(b.is_allocated(pa(0x000F_0000)));

    assert_eq!(b.free_frames(), 0x200 - 0x151);
    assert_eq!(b.total_frames(), TOTAL_FRAMES);
}

#[test]
fn reset_clamps_regions_to_coverage() {
    let map = [MemoryRegion::new(
        0x0000_0000,
        0x2_0000_0000,
        MemoryRegionKind::Available,
    )];

    let mut b = full_bitmap();
    b.reset(&map, KernelImage::new(0x0020_0000));

    assert!(b.is_allocated(pa(0x001F_F000)));
    assert!(!b.is_allocated(pa(0x0020_0000)));
    assert!(!b.is_allocated(TOP));
    assert!(b.is_allocated(pa(0x1_0000_0000)));
    assert_eq!(b.free_frames(), TOTAL_FRAMES - 0x200);
}

#[test]
fn reset_is_repeatable() {
    let map = [MemoryRegion::new(0x0010_0000, 0x0010_0000, MemoryRegionKind::Available)];
    let mut b = full_bitmap();
    b.reset(&map, KernelImage::new(0x0010_0000));
    let first = b.free_frames();
    let _ = b.allocate();
    b.reset(&map, KernelImage::new(0x0010_0000));
    assert_eq!(b.free_frames(), first);
}

#[test]
fn double_free_is_fatal() {
    let mut b = FrameBitmap::<1>::new(8);
    b.mark_range_free(pa(0), pa(0x7000));
    let res = panic::catch_unwind(panic::AssertUnwindSafe(|| b.free(pa(0x2000))));
    assert!(res.is_err());
}

#[test]
fn unaligned_free_is_fatal() {
    let mut b = FrameBitmap::<1>::new(8);
    let res = panic::catch_unwind(panic::AssertUnwindSafe(|| b.free(pa(0x2010))));
    assert!(res.is_err());
}

#[test]
fn locked_allocator_restores_interrupts() {
    let irq = EmulatedInterrupts::new();
    let frames = FrameAllocator::<1, _>::new(8, &irq);
    frames.mark_range_free(pa(0x1000), pa(0x7000));

    irq.enable();
    let frame = frames.alloc_frame().unwrap();
    assert!(irq.are_enabled());
    assert!(frames.is_allocated(frame));

    frames.free_frame(frame);
    assert!(irq.are_enabled());
    assert!(!frames.is_allocated(frame));
    assert_eq!(frames.free_frames(), 7);
    assert_eq!(frames.next_frame_hint(), frame.frame_index());
}

#[test]
fn allocation_inside_a_held_lock_does_not_deadlock() {
    let irq = EmulatedInterrupts::new();
    let frames = FrameAllocator::<1, _>::new(8, &irq);
    frames.mark_range_free(pa(0), pa(0x7000));

    let (a, b) = frames.with_bitmap(|bm| (bm.allocate(), bm.allocate()));
    assert_ne!(a, b);
    assert_eq!(frames.free_frames(), 6);
}
