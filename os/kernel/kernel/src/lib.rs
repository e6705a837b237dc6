//! # Kernel Core
//!
//! Wires the interrupt layer, the frame allocator and the scheduler into the
//! process-wide singletons the rest of the kernel uses.
//!
//! ```text
//!         ┌───────────────┐
//!         │      IRQ      │ Platform interrupt controller
//!         └──┬─────────┬──┘
//!            │ &IRQ    │ &IRQ
//!  ┌─────────▼──┐   ┌──▼──────────┐
//!  │   FRAMES   │◀──│  SCHEDULER  │ thread stacks come from FRAMES
//!  └────────────┘   └─────────────┘
//! ```
//!
//! Both locks share the one controller, so nesting them keeps a single,
//! consistent interrupt state.
//!
//! ## Bring-up
//!
//! [`init`] runs once on the boot CPU with interrupts disabled:
//!
//! 1. Attach the QEMU debug-port logger
//! 2. Point every vector at the unhandled-interrupt handler
//! 3. Rebuild the frame bitmap from the boot memory map
//! 4. Adopt the boot context as thread `#0`
//! 5. Move the legacy PIC's IRQs above the exceptions
//! 6. Install the timer gate
//!
//! The caller then starts the timer and enables interrupts.
//!
//! ## Interrupt epilogue
//!
//! Handlers return a [`HandlerReturn`]. Only [`interrupt_epilogue`] acts on
//! [`HandlerReturn::Reschedule`], after the handler has fully returned.

#![cfg_attr(not(any(test, doctest)), no_std)]

mod interrupts;
mod ports;
mod threads;

pub use interrupts::TIMER_VECTOR;
pub use threads::{reap, spawn, thread_bootstrap};

use kernel_alloc::FrameAllocator;
use kernel_info::boot::BootInfo;
use kernel_info::memory::{FRAME_BITMAP_SIZE, MAX_THREADS, TOTAL_FRAMES};
use kernel_interrupts::{HandlerReturn, Platform};
use kernel_sched::{Scheduler, Tid};
use log::LevelFilter;

/// Context switch for the current target.
#[cfg(all(target_arch = "x86_64", target_os = "none"))]
pub type PlatformSwitch = kernel_sched::X86ContextSwitch;

/// Context switch for the current target.
#[cfg(not(all(target_arch = "x86_64", target_os = "none")))]
pub type PlatformSwitch = kernel_sched::EmulatedContextSwitch;

/// Verbosity of the debug-port logger.
pub const LOG_LEVEL: LevelFilter = LevelFilter::Debug;

/// The interrupt controller every lock in the core goes through.
pub static IRQ: Platform = Platform::new();

/// Physical frame allocator.
pub static FRAMES: FrameAllocator<FRAME_BITMAP_SIZE, &'static Platform> =
    FrameAllocator::new(TOTAL_FRAMES, &IRQ);

/// Thread scheduler.
pub static SCHEDULER: Scheduler<MAX_THREADS, &'static Platform, PlatformSwitch> =
    Scheduler::new(&IRQ, PlatformSwitch::new());

/// Bring up the core on the boot CPU. Returns the boot thread's id.
///
/// # Panics
/// If called twice.
pub fn init(boot: &BootInfo<'_>) -> Tid {
    if kernel_qemu::init(LOG_LEVEL).is_err() {
        log::warn!("a logger was already installed");
    }

    interrupts::install_default_vectors(&IRQ);
    FRAMES.reset(boot.memory_map, boot.kernel);
    let boot_thread = SCHEDULER.adopt_boot_thread("boot");
    ports::pic_remap();
    interrupts::install_timer_gate(&IRQ);

    log::info!(
        "core ready: {} of {} frames free",
        FRAMES.free_frames(),
        FRAMES.total_frames()
    );
    boot_thread
}

/// Timer tick handler.
#[must_use]
pub fn timer_interrupt() -> HandlerReturn {
    SCHEDULER.timer_interrupt()
}

/// Common tail of every interrupt: honors a reschedule request once the
/// handler has returned.
pub fn interrupt_epilogue(ret: HandlerReturn) {
    match ret {
        HandlerReturn::Continue => {}
        HandlerReturn::Reschedule => SCHEDULER.preempt(),
    }
}
