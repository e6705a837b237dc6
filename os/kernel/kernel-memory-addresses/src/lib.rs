//! # Physical Memory Address Types
//!
//! Strongly typed wrappers for physical addresses and the page-sized frames
//! the physical memory manager hands out.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`PhysicalAddress`] | A raw 64-bit physical address (RAM or MMIO). |
//! | [`PhysicalFrame`] | The frame-aligned base of one [`FRAME_SIZE`] unit of RAM. |
//!
//! A frame is identified either by its base address or by its *index*, the
//! base divided by [`FRAME_SIZE`]. The frame bitmap is indexed by the latter.
//!
//! ```rust
//! # use kernel_memory_addresses::*;
//! let pa = PhysicalAddress::new(0x0000_2042);
//! assert!(!pa.is_frame_aligned());
//! assert_eq!(pa.align_down().as_u64(), 0x2000);
//! assert_eq!(pa.align_up().as_u64(), 0x3000);
//!
//! let frame = PhysicalFrame::containing(pa);
//! assert_eq!(frame.index(), 2);
//! assert_eq!(PhysicalFrame::from_index(2).base(), PhysicalAddress::new(0x2000));
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![forbid(unsafe_code)]

mod physical_address;
mod physical_frame;

pub use physical_address::PhysicalAddress;
pub use physical_frame::PhysicalFrame;

/// Size of one physical frame in bytes.
pub const FRAME_SIZE: u64 = 4096;

/// `log2(FRAME_SIZE)`.
pub const FRAME_SHIFT: u32 = 12;

const _: () = assert!(1 << FRAME_SHIFT == FRAME_SIZE);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alignment_helpers() {
        let a = PhysicalAddress::new(0x12345);
        assert_eq!(a.align_down().as_u64(), 0x12000);
        assert_eq!(a.align_up().as_u64(), 0x13000);
        assert_eq!(a.frame_offset(), 0x345);
        assert!(PhysicalAddress::new(0x7000).is_frame_aligned());
    }

    #[test]
    fn aligned_address_does_not_round_up() {
        let a = PhysicalAddress::new(0x5000);
        assert_eq!(a.align_up(), a);
    }

    #[test]
    fn frame_index_roundtrip() {
        for index in [0usize, 1, 1234, 0xF_FFFF] {
            let frame = PhysicalFrame::from_index(index);
            assert!(frame.base().is_frame_aligned());
            assert_eq!(frame.index(), index);
            assert_eq!(PhysicalFrame::from_aligned(frame.base()), Some(frame));
        }
    }

    #[test]
    fn unaligned_base_is_rejected() {
        assert_eq!(PhysicalFrame::from_aligned(PhysicalAddress::new(0x1001)), None);
    }

    #[test]
    fn frame_next_steps_one_frame() {
        let f = PhysicalFrame::from_index(7);
        assert_eq!(f.next().base().as_u64(), 8 * FRAME_SIZE);
    }
}
