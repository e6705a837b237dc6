//! x86-64 interrupt controller.
//!
//! Owns the single global IDT, flips `IF` with `cli`/`sti`, and reads it back
//! through `RFLAGS`. All of this requires CPL0.

use crate::control::{InterruptControl, InterruptState};
use crate::install_default_vectors;
use crate::vector::{Dpl, GateType, VectorError, VectorTable};
use bitfield_struct::bitfield;
use core::arch::{asm, naked_asm};
use core::cell::UnsafeCell;
use core::sync::atomic::{Ordering, fence};
use kernel_info::memory::KERNEL_CODE_SELECTOR;

/// The `RFLAGS` bits the controller cares about.
#[bitfield(u64)]
struct Rflags {
    #[bits(9)]
    __low: u16,

    /// Interrupt Enable Flag
    interrupt_enable: bool,

    #[bits(54)]
    __high: u64,
}

#[inline]
fn rflags() -> Rflags {
    let r: u64;
    unsafe { asm!("pushfq; pop {}", out(reg) r, options(nostack, preserves_flags)) }
    Rflags::from_bits(r)
}

#[repr(C, packed)]
struct Idtr {
    limit: u16,
    base: u64,
}

struct GlobalIdt(UnsafeCell<VectorTable>);

// SAFETY: mutated only by `X86Interrupts::update_in_place` with interrupts off
// on the single CPU the core runs on.
unsafe impl Sync for GlobalIdt {}

static IDT: GlobalIdt = GlobalIdt(UnsafeCell::new(VectorTable::new()));

/// Handle to the processor's interrupt machinery. Zero-sized; every copy
/// addresses the same IDT and flag.
#[derive(Copy, Clone, Debug, Default)]
pub struct X86Interrupts;

impl X86Interrupts {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Point every vector at the unhandled-interrupt stub and load the table.
    ///
    /// # Safety
    /// Must run at CPL0 with a GDT whose [`KERNEL_CODE_SELECTOR`] is a valid
    /// 64-bit code segment.
    pub unsafe fn init(&self) {
        install_default_vectors(self, unhandled_interrupt as usize, KERNEL_CODE_SELECTOR);
        unsafe { self.load() };
    }

    /// Load the global table into IDTR.
    ///
    /// # Safety
    /// Must run at CPL0. Every present entry must reference valid handler code.
    #[inline]
    pub unsafe fn load(&self) {
        #[allow(clippy::cast_possible_truncation)]
        let idtr = Idtr {
            limit: (size_of::<VectorTable>() - 1) as u16,
            base: IDT.0.get() as u64,
        };
        unsafe {
            asm!("lidt [{}]", in(reg) &raw const idtr, options(nostack, preserves_flags, readonly));
        }
    }

    /// Mutate the live table with interrupts off, fencing before they return.
    fn update_in_place<R>(&self, f: impl FnOnce(&mut VectorTable) -> R) -> R {
        let state = self.push_state();
        self.disable();

        // SAFETY: interrupts are off and the core runs on a single CPU, so no
        // other reference to the table is live.
        let r = f(unsafe { &mut *IDT.0.get() });

        fence(Ordering::SeqCst);
        self.pop_state(state);
        r
    }
}

impl InterruptControl for X86Interrupts {
    fn set_vector(&self, vector: u8, handler: usize, selector: u16, dpl: Dpl, gate: GateType) {
        self.update_in_place(|t| t.set_vector(vector, handler, selector, dpl, gate));
    }

    fn mask(&self, vector: usize) -> Result<(), VectorError> {
        self.update_in_place(|t| t.set_present(vector, false))
    }

    fn unmask(&self, vector: usize) -> Result<(), VectorError> {
        self.update_in_place(|t| t.set_present(vector, true))
    }

    #[inline]
    fn enable(&self) {
        unsafe { asm!("sti", options(nomem, nostack)) }
    }

    #[inline]
    fn disable(&self) {
        unsafe { asm!("cli", options(nomem, nostack)) }
    }

    #[inline]
    fn push_state(&self) -> InterruptState {
        InterruptState::from_enabled(self.are_enabled())
    }

    #[inline]
    fn pop_state(&self, state: InterruptState) {
        if state.were_enabled() {
            self.enable();
        } else {
            self.disable();
        }
    }

    #[inline]
    fn are_enabled(&self) -> bool {
        rflags().interrupt_enable()
    }
}

/// Default gate target. Aligns the stack and reports; never returns.
#[unsafe(naked)]
extern "C" fn unhandled_interrupt() {
    naked_asm!(
        "cld",
        "mov rdi, rsp", // interrupt frame
        "and rsp, -16",
        "call {rust}",
        "ud2",
        rust = sym unhandled_interrupt_rust,
    );
}

extern "C" fn unhandled_interrupt_rust(frame: *const u64) -> ! {
    log::error!("unhandled interrupt, frame at {frame:p}");
    panic!("unhandled interrupt");
}
