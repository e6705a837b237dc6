//! Gate setup and the timer entry path.

use crate::ports::PIC1_OFFSET;
use kernel_info::memory::KERNEL_CODE_SELECTOR;
use kernel_interrupts::{Dpl, GateType, InterruptControl, Platform};

/// Timer IRQ 0, as delivered once the PIC has been remapped.
pub const TIMER_VECTOR: u8 = PIC1_OFFSET;

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
pub(crate) fn install_default_vectors(irq: &Platform) {
    // SAFETY: `init` runs at CPL0 on the boot CPU with the kernel GDT loaded.
    unsafe { irq.init() };
}

#[cfg(not(all(target_arch = "x86_64", target_os = "none")))]
pub(crate) fn install_default_vectors(irq: &Platform) {
    kernel_interrupts::install_default_vectors(
        irq,
        unhandled_interrupt as usize,
        KERNEL_CODE_SELECTOR,
    );
}

#[cfg(not(all(target_arch = "x86_64", target_os = "none")))]
extern "C" fn unhandled_interrupt() {
    log::error!("unhandled interrupt");
}

pub(crate) fn install_timer_gate(irq: &Platform) {
    irq.set_vector(
        TIMER_VECTOR,
        timer_entry as usize,
        KERNEL_CODE_SELECTOR,
        Dpl::Ring0,
        GateType::Interrupt,
    );
    log::info!("timer on vector {TIMER_VECTOR:#04x}");
}

/// Hardware entry for [`TIMER_VECTOR`]. Saves the interrupted registers,
/// runs [`timer_tick`] on a 16-byte aligned stack and returns with `iretq`.
///
/// A reschedule inside `timer_tick` suspends this frame on the interrupted
/// thread's stack; the `iretq` runs once that thread is chosen again.
#[cfg(all(target_arch = "x86_64", target_os = "none"))]
#[unsafe(naked)]
extern "C" fn timer_entry() {
    core::arch::naked_asm!(
        "cld",
        "push rax",
        "push rbx",
        "push rcx",
        "push rdx",
        "push rsi",
        "push rdi",
        "push rbp",
        "push r8",
        "push r9",
        "push r10",
        "push r11",
        "push r12",
        "push r13",
        "push r14",
        "push r15",
        // rbp is callee-saved, so it survives the call.
        "mov rbp, rsp",
        "and rsp, -16",
        "call {tick}",
        "mov rsp, rbp",
        "pop r15",
        "pop r14",
        "pop r13",
        "pop r12",
        "pop r11",
        "pop r10",
        "pop r9",
        "pop r8",
        "pop rbp",
        "pop rdi",
        "pop rsi",
        "pop rdx",
        "pop rcx",
        "pop rbx",
        "pop rax",
        "iretq",
        tick = sym timer_tick,
    )
}

/// Stand-in gate target on hosts, where nothing raises the vector.
#[cfg(not(all(target_arch = "x86_64", target_os = "none")))]
extern "C" fn timer_entry() {
    timer_tick();
}

extern "C" fn timer_tick() {
    // Acknowledge before a possible switch, or the PIC stays blocked until
    // this thread runs again.
    crate::ports::pic_end_of_interrupt();
    crate::interrupt_epilogue(crate::timer_interrupt());
}
