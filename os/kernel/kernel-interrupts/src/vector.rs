//! # Interrupt vector table
//!
//! A 256-entry table of x86-64 gate descriptors. The table is plain data: it
//! can be built and inspected anywhere, and only the x86 backend ever points
//! the CPU at it.
//!
//! Each gate is 16 bytes (Intel SDM, "Interrupt Descriptor Table"):
//!
//! ```text
//! 127            96 95                          64
//! +----------------+------------------------------+
//! |      zero      |        offset[63:32]         |
//! +----------------+------------------------------+
//! 63            48 47 46 45 44 43   40 39   35 34 32 31        16 15         0
//! +---------------+--+-----+--+-------+-------+-----+------------+------------+
//! | offset[31:16] |P | DPL |0 | type  | zero  | IST |  selector  |offset[15:0]|
//! +---------------+--+-----+--+-------+-------+-----+------------+------------+
//! ```

use bitfield_struct::bitfield;
use core::mem::size_of;
use kernel_info::memory::VECTOR_COUNT;

const _: () = assert!(size_of::<VectorEntry>() == 16);
const _: () = assert!(align_of::<VectorTable>() == 16);

/// Returned by operations addressing a vector outside the table.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VectorError {
    #[error("interrupt vector {0} is out of range")]
    OutOfRange(usize),
}

/// Descriptor privilege level of a gate: the least privileged ring allowed to
/// raise the vector with a software `int`.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[repr(u8)]
pub enum Dpl {
    Ring0 = 0,
    Ring1 = 1,
    Ring2 = 2,
    Ring3 = 3,
}

impl Dpl {
    #[inline]
    #[must_use]
    pub const fn into_bits(self) -> u8 {
        self as u8
    }

    #[inline]
    #[must_use]
    pub const fn from_bits(v: u8) -> Self {
        match v & 0b11 {
            0 => Self::Ring0,
            1 => Self::Ring1,
            2 => Self::Ring2,
            _ => Self::Ring3,
        }
    }
}

/// Gate kinds.
///
/// - [`GateType::Interrupt`] clears `IF` on entry, so the handler starts with
///   interrupts disabled.
/// - [`GateType::Trap`] leaves `IF` untouched.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[repr(u8)]
pub enum GateType {
    Interrupt = 0xE,
    Trap = 0xF,
}

impl GateType {
    #[inline]
    #[must_use]
    pub const fn from_bits(v: u8) -> Option<Self> {
        match v {
            0xE => Some(Self::Interrupt),
            0xF => Some(Self::Trap),
            _ => None,
        }
    }
}

/// The attribute word of a gate (bits 32..48).
#[bitfield(u16)]
pub struct GateAttributes {
    /// Interrupt Stack Table slot, `0` keeps the current stack.
    #[bits(3)]
    pub ist: u8,

    #[bits(5)]
    __reserved: u8,

    /// Gate type, see [`GateType`].
    #[bits(4)]
    pub gate: u8,

    /// Must be `0` for interrupt and trap gates.
    #[bits(1)]
    pub storage_segment: bool,

    #[bits(2)]
    pub dpl: u8,

    #[bits(1)]
    pub present: bool,
}

/// One gate descriptor.
#[repr(C)]
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct VectorEntry {
    offset_lo: u16,
    selector: u16,
    attributes: u16,
    offset_mid: u16,
    offset_hi: u32,
    zero: u32,
}

impl VectorEntry {
    /// A zeroed, non-present entry.
    pub const MISSING: Self = Self {
        offset_lo: 0,
        selector: 0,
        attributes: GateAttributes::new().into_bits(),
        offset_mid: 0,
        offset_hi: 0,
        zero: 0,
    };

    /// A present gate jumping to `handler` in code segment `selector`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn new(handler: usize, selector: u16, dpl: Dpl, gate: GateType) -> Self {
        let addr = handler as u64;
        Self {
            offset_lo: (addr & 0xFFFF) as u16,
            selector,
            attributes: GateAttributes::new()
                .with_present(true)
                .with_dpl(dpl.into_bits())
                .with_gate(gate as u8)
                .with_storage_segment(false)
                .with_ist(0)
                .into_bits(),
            offset_mid: ((addr >> 16) & 0xFFFF) as u16,
            offset_hi: (addr >> 32) as u32,
            zero: 0,
        }
    }

    #[inline]
    #[must_use]
    pub const fn attributes(&self) -> GateAttributes {
        GateAttributes::from_bits(self.attributes)
    }

    #[inline]
    #[must_use]
    pub const fn is_present(&self) -> bool {
        self.attributes().present()
    }

    #[inline]
    pub const fn set_present(&mut self, present: bool) {
        self.attributes = self.attributes().with_present(present).into_bits();
    }

    /// Handler address reassembled from the three offset fields.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn handler(&self) -> usize {
        (self.offset_lo as u64 | (self.offset_mid as u64) << 16 | (self.offset_hi as u64) << 32)
            as usize
    }

    #[inline]
    #[must_use]
    pub const fn selector(&self) -> u16 {
        self.selector
    }

    #[inline]
    #[must_use]
    pub const fn dpl(&self) -> Dpl {
        Dpl::from_bits(self.attributes().dpl())
    }

    #[inline]
    #[must_use]
    pub const fn gate_type(&self) -> Option<GateType> {
        GateType::from_bits(self.attributes().gate())
    }

    /// Whether the entry was ever given a handler.
    #[inline]
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.handler() != 0 && self.gate_type().is_some()
    }
}

impl core::fmt::Debug for VectorEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("VectorEntry")
            .field("handler", &format_args!("{:#018x}", self.handler()))
            .field("selector", &format_args!("{:#06x}", self.selector))
            .field("dpl", &self.dpl())
            .field("gate", &self.gate_type())
            .field("present", &self.is_present())
            .finish()
    }
}

/// The full table of [`VECTOR_COUNT`] gates.
#[repr(C, align(16))]
pub struct VectorTable {
    entries: [VectorEntry; VECTOR_COUNT],
}

impl Default for VectorTable {
    fn default() -> Self {
        Self::new()
    }
}

impl VectorTable {
    /// A table with every gate non-present.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: [VectorEntry::MISSING; VECTOR_COUNT],
        }
    }

    /// Overwrite one gate. Any `u8` addresses a valid slot.
    pub const fn set_vector(
        &mut self,
        vector: u8,
        handler: usize,
        selector: u16,
        dpl: Dpl,
        gate: GateType,
    ) {
        self.entries[vector as usize] = VectorEntry::new(handler, selector, dpl, gate);
    }

    /// Flip the present bit of one gate.
    ///
    /// # Errors
    /// [`VectorError::OutOfRange`] if `vector` is not below [`VECTOR_COUNT`].
    pub fn set_present(&mut self, vector: usize, present: bool) -> Result<(), VectorError> {
        let entry = self
            .entries
            .get_mut(vector)
            .ok_or(VectorError::OutOfRange(vector))?;
        entry.set_present(present);
        Ok(())
    }

    #[must_use]
    pub fn entry(&self, vector: usize) -> Option<&VectorEntry> {
        self.entries.get(vector)
    }

    pub fn iter(&self) -> impl Iterator<Item = &VectorEntry> {
        self.entries.iter()
    }

    /// Whether every gate has a handler, i.e. no vector can reach an unset entry.
    #[must_use]
    pub fn is_fully_configured(&self) -> bool {
        self.entries.iter().all(VectorEntry::is_configured)
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_address_is_split_and_rejoined() {
        let e = VectorEntry::new(0xFFFF_FFFF_8012_3456, 0x08, Dpl::Ring0, GateType::Interrupt);
        assert_eq!(e.handler(), 0xFFFF_FFFF_8012_3456);
        assert_eq!(e.offset_lo, 0x3456);
        assert_eq!(e.offset_mid, 0x8012);
        assert_eq!(e.offset_hi, 0xFFFF_FFFF);
    }

    #[test]
    fn attribute_bits_match_hardware_layout() {
        let e = VectorEntry::new(0x1000, 0x08, Dpl::Ring3, GateType::Trap);
        // P=1, DPL=3, S=0, type=0xF in the high byte; IST=0 in the low byte.
        assert_eq!(e.attributes >> 8, 0b1110_1111);
        assert_eq!(e.attributes & 0xFF, 0);
    }

    #[test]
    fn missing_entry_is_not_configured() {
        assert!(!VectorEntry::MISSING.is_present());
        assert!(!VectorEntry::MISSING.is_configured());
    }

    #[test]
    fn set_present_rejects_out_of_range() {
        let mut t = VectorTable::new();
        assert_eq!(t.set_present(256, true), Err(VectorError::OutOfRange(256)));
        assert_eq!(t.set_present(255, true), Ok(()));
    }
}
