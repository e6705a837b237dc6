//! # Boot Information
//!
//! What the core needs from the boot-information collaborator: the firmware
//! memory map and the physical extent of the loaded kernel image. Parsing the
//! multiboot structure itself happens elsewhere; it only has to produce these
//! records.

use kernel_memory_addresses::{FRAME_SIZE, PhysicalAddress};

/// Everything the physical memory manager consumes at initialization.
#[derive(Copy, Clone, Debug)]
pub struct BootInfo<'a> {
    /// Firmware-reported regions, in the order the firmware listed them.
    pub memory_map: &'a [MemoryRegion],

    /// Physical footprint of the loaded kernel image.
    pub kernel: KernelImage,
}

/// Usability of a memory region, numbered like the multiboot `type` field.
#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MemoryRegionKind {
    /// RAM free for general use.
    Available = 1,
    /// Reserved by firmware or hardware.
    Reserved = 2,
    /// ACPI tables; reclaimable once they have been parsed.
    AcpiReclaimable = 3,
    /// ACPI non-volatile storage; must be preserved across sleep states.
    AcpiNvs = 4,
    /// Defective RAM.
    BadMemory = 5,
}

impl MemoryRegionKind {
    /// Decode a multiboot memory type. Unknown values are treated as reserved.
    #[inline]
    #[must_use]
    pub const fn from_multiboot(v: u32) -> Self {
        match v {
            1 => Self::Available,
            3 => Self::AcpiReclaimable,
            4 => Self::AcpiNvs,
            5 => Self::BadMemory,
            _ => Self::Reserved,
        }
    }
}

/// One `{start, length, type}` record of the boot memory map.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MemoryRegion {
    pub start: PhysicalAddress,
    /// Length in **bytes**.
    pub len: u64,
    pub kind: MemoryRegionKind,
}

impl MemoryRegion {
    #[must_use]
    pub const fn new(start: u64, len: u64, kind: MemoryRegionKind) -> Self {
        Self {
            start: PhysicalAddress::new(start),
            len,
            kind,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_available(&self) -> bool {
        matches!(self.kind, MemoryRegionKind::Available)
    }

    /// First and last (inclusive) frame base lying entirely inside this region.
    ///
    /// Partial frames at either end are excluded, so a frame returned here never
    /// straddles memory the firmware did not report. `None` when the region does
    /// not contain a single whole frame.
    #[must_use]
    pub const fn whole_frames(&self) -> Option<(PhysicalAddress, PhysicalAddress)> {
        let first = self.start.align_up();
        let Some(end) = self.start.checked_add(self.len) else {
            return None;
        };
        let end = end.align_down();
        if end.as_u64() <= first.as_u64() {
            return None;
        }
        Some((first, PhysicalAddress::new(end.as_u64() - FRAME_SIZE)))
    }
}

/// Physical extent of the loaded kernel image.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct KernelImage {
    /// Address just past the last byte of the image.
    pub phys_end: PhysicalAddress,
}

impl KernelImage {
    #[must_use]
    pub const fn new(phys_end: u64) -> Self {
        Self {
            phys_end: PhysicalAddress::new(phys_end),
        }
    }

    /// Last frame base the image touches, counted from physical address zero.
    ///
    /// Everything from `0` up to and including this frame stays reserved: the
    /// image itself plus the legacy low memory below its load address.
    #[must_use]
    pub const fn last_frame(&self) -> Option<PhysicalAddress> {
        let end = self.phys_end.align_up();
        if end.as_u64() == 0 {
            None
        } else {
            Some(PhysicalAddress::new(end.as_u64() - FRAME_SIZE))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_frames_trims_partial_edges() {
        let r = MemoryRegion::new(0x0000_0800, 0x3000, MemoryRegionKind::Available);
        let (first, last) = r.whole_frames().unwrap();
        assert_eq!(first.as_u64(), 0x1000);
        assert_eq!(last.as_u64(), 0x2000);
    }

    #[test]
    fn region_smaller_than_a_frame_has_no_frames() {
        let r = MemoryRegion::new(0x1800, 0x800, MemoryRegionKind::Available);
        assert_eq!(r.whole_frames(), None);
    }

    #[test]
    fn unknown_multiboot_type_is_reserved() {
        assert_eq!(MemoryRegionKind::from_multiboot(1), MemoryRegionKind::Available);
        assert_eq!(MemoryRegionKind::from_multiboot(42), MemoryRegionKind::Reserved);
    }

    #[test]
    fn kernel_last_frame_covers_partial_tail() {
        assert_eq!(
            KernelImage::new(0x0020_0001).last_frame(),
            Some(PhysicalAddress::new(0x0020_0000))
        );
        assert_eq!(
            KernelImage::new(0x0020_0000).last_frame(),
            Some(PhysicalAddress::new(0x001F_F000))
        );
        assert_eq!(KernelImage::new(0).last_frame(), None);
    }
}
