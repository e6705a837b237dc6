use crate::{FRAME_SHIFT, FRAME_SIZE, PhysicalAddress};
use core::fmt;

/// One physical frame, represented by its frame-aligned base address.
///
/// ### Invariants
/// - The low [`FRAME_SHIFT`] bits of the base are always zero.
///
/// ### Examples
/// ```rust
/// # use kernel_memory_addresses::*;
/// let frame = PhysicalFrame::from_index(3);
/// assert_eq!(frame.base().as_u64(), 3 * FRAME_SIZE);
/// assert_eq!(frame.end().as_u64(), 4 * FRAME_SIZE - 1);
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalFrame(PhysicalAddress);

impl PhysicalFrame {
    /// The frame that contains `addr`.
    #[inline]
    #[must_use]
    pub const fn containing(addr: PhysicalAddress) -> Self {
        Self(addr.align_down())
    }

    /// The frame whose base is exactly `addr`, or `None` if `addr` is unaligned.
    #[inline]
    #[must_use]
    pub const fn from_aligned(addr: PhysicalAddress) -> Option<Self> {
        if addr.is_frame_aligned() {
            Some(Self(addr))
        } else {
            None
        }
    }

    #[inline]
    #[must_use]
    pub const fn from_index(index: usize) -> Self {
        Self(PhysicalAddress::new((index as u64) << FRAME_SHIFT))
    }

    #[inline]
    #[must_use]
    pub const fn base(self) -> PhysicalAddress {
        self.0
    }

    /// Last byte address covered by this frame.
    #[inline]
    #[must_use]
    pub const fn end(self) -> PhysicalAddress {
        PhysicalAddress::new(self.0.as_u64() + (FRAME_SIZE - 1))
    }

    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0.frame_index()
    }

    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(PhysicalAddress::new(self.0.as_u64() + FRAME_SIZE))
    }
}

impl fmt::Debug for PhysicalFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhysicalFrame({:#018X})", self.0.as_u64())
    }
}

impl fmt::Display for PhysicalFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<PhysicalFrame> for PhysicalAddress {
    #[inline]
    fn from(value: PhysicalFrame) -> Self {
        value.base()
    }
}
