//! Legacy 8259 PIC programming over the x86 I/O port space.

const PIC1_COMMAND: u16 = 0x20;
const PIC1_DATA: u16 = 0x21;
const PIC2_COMMAND: u16 = 0xA0;
const PIC2_DATA: u16 = 0xA1;

/// Vector of master IRQ 0 after [`pic_remap`].
pub const PIC1_OFFSET: u8 = 0x20;

/// Vector of slave IRQ 8 after [`pic_remap`].
pub const PIC2_OFFSET: u8 = 0x28;

/// ICW1: start initialization, ICW4 follows.
const ICW1_INIT: u8 = 0x11;

/// ICW4: 8086 mode.
const ICW4_8086: u8 = 0x01;

/// Non-specific end-of-interrupt command.
#[cfg_attr(not(all(target_arch = "x86_64", target_os = "none")), allow(dead_code))]
const PIC_EOI: u8 = 0x20;

/// Port writes that reinitialize both PICs, in order.
///
/// Master IRQs land on [`PIC1_OFFSET`], slave IRQs on [`PIC2_OFFSET`], and
/// only IRQ 0 (the timer) is left unmasked.
pub(crate) const PIC_REMAP: [(u16, u8); 10] = [
    (PIC1_COMMAND, ICW1_INIT),
    (PIC2_COMMAND, ICW1_INIT),
    (PIC1_DATA, PIC1_OFFSET),
    (PIC2_DATA, PIC2_OFFSET),
    (PIC1_DATA, 0x04), // slave on IRQ 2
    (PIC2_DATA, 0x02), // cascade identity
    (PIC1_DATA, ICW4_8086),
    (PIC2_DATA, ICW4_8086),
    (PIC1_DATA, 0xFE),
    (PIC2_DATA, 0xFF),
];

/// Write one byte to an I/O port.
///
/// # Safety
/// Must run at CPL0 (or with I/O permission for `port`), and `port` must
/// belong to a device that accepts `val` in its current state.
#[cfg(all(target_arch = "x86_64", target_os = "none"))]
#[inline]
unsafe fn outb(port: u16, val: u8) {
    unsafe {
        core::arch::asm!(
            "out dx, al",
            in("dx") port,
            in("al") val,
            options(nomem, nostack, preserves_flags)
        );
    }
}

/// Reinitialize both PICs with [`PIC_REMAP`], moving their IRQs off the
/// exception vectors.
#[cfg(all(target_arch = "x86_64", target_os = "none"))]
pub fn pic_remap() {
    for (port, val) in PIC_REMAP {
        // SAFETY: the core runs at CPL0 and these ports belong to the PICs.
        unsafe { outb(port, val) };
    }
    log::info!("PIC remapped to {PIC1_OFFSET:#04x}/{PIC2_OFFSET:#04x}");
}

#[cfg(not(all(target_arch = "x86_64", target_os = "none")))]
pub fn pic_remap() {
    log::debug!("no PIC on this target; skipped {} port writes", PIC_REMAP.len());
}

/// Acknowledge the interrupt being serviced at the master PIC.
#[cfg(all(target_arch = "x86_64", target_os = "none"))]
#[inline]
pub fn pic_end_of_interrupt() {
    // SAFETY: the core runs at CPL0 and the master PIC always accepts EOI.
    unsafe { outb(PIC1_COMMAND, PIC_EOI) };
}

#[cfg(not(all(target_arch = "x86_64", target_os = "none")))]
#[inline]
pub const fn pic_end_of_interrupt() {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TIMER_VECTOR;

    #[test]
    fn remap_moves_timer_irq_onto_the_timer_gate() {
        let icw2: Vec<_> = PIC_REMAP.iter().skip(2).take(2).copied().collect();
        assert_eq!(icw2, [(PIC1_DATA, TIMER_VECTOR), (PIC2_DATA, PIC2_OFFSET)]);
        // Past the 32 exception vectors, and no overlap between the two PICs.
        assert!(PIC1_OFFSET >= 32);
        assert_eq!(PIC2_OFFSET, PIC1_OFFSET + 8);
    }

    #[test]
    fn remap_starts_both_pics_and_leaves_only_the_timer_unmasked() {
        assert_eq!(PIC_REMAP[0], (PIC1_COMMAND, ICW1_INIT));
        assert_eq!(PIC_REMAP[1], (PIC2_COMMAND, ICW1_INIT));
        assert_eq!(PIC_REMAP[8], (PIC1_DATA, 0b1111_1110));
        assert_eq!(PIC_REMAP[9], (PIC2_DATA, 0xFF));
    }
}
