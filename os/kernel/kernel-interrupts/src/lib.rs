//! # Interrupt Vector Layer
//!
//! Installs interrupt gates, masks and unmasks individual vectors, and
//! controls the processor's global interrupt-enable flag.
//!
//! ## Controllers
//!
//! Everything above this crate is written against [`InterruptControl`]:
//!
//! * [`x86::X86Interrupts`] drives the real IDT with `lidt`, `cli` and `sti`.
//! * [`emulated::EmulatedInterrupts`] keeps the flag and table in memory, for
//!   host builds and tests.
//!
//! [`Platform`] names whichever one the current target uses.
//!
//! ## Default table
//!
//! [`install_default_vectors`] points all 256 vectors at one handler, so no
//! vector can ever reach an uninitialized gate. Drivers later override the
//! vectors they own with [`InterruptControl::set_vector`].
//!
//! ```
//! use kernel_interrupts::{InterruptControl, install_default_vectors};
//! use kernel_interrupts::emulated::EmulatedInterrupts;
//!
//! let irq = EmulatedInterrupts::new();
//! install_default_vectors(&irq, 0xDEAD_0000, 0x08);
//! irq.mask(0x20).unwrap();
//! assert!(!irq.vector(0x20).unwrap().is_present());
//! assert!(irq.vector(0x21).unwrap().is_present());
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

mod control;
pub mod emulated;
mod vector;
#[cfg(target_arch = "x86_64")]
pub mod x86;

pub use control::{InterruptControl, InterruptState};
pub use vector::{Dpl, GateAttributes, GateType, VectorEntry, VectorError, VectorTable};

/// The controller for the current target.
#[cfg(all(target_arch = "x86_64", target_os = "none"))]
pub type Platform = x86::X86Interrupts;

/// The controller for the current target.
#[cfg(not(all(target_arch = "x86_64", target_os = "none")))]
pub type Platform = emulated::EmulatedInterrupts;

/// What an interrupt handler asks of the common epilogue.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum HandlerReturn {
    /// Resume the interrupted thread.
    Continue,
    /// Pick another thread before resuming.
    Reschedule,
}

/// Point every vector at `handler` as a ring-0 interrupt gate.
pub fn install_default_vectors<I: InterruptControl + ?Sized>(
    irq: &I,
    handler: usize,
    selector: u16,
) {
    for vector in 0..=u8::MAX {
        irq.set_vector(vector, handler, selector, Dpl::Ring0, GateType::Interrupt);
    }
    log::info!("installed default handler {handler:#x} on all vectors");
}
