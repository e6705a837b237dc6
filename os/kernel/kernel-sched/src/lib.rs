//! # Thread Scheduler
//!
//! Round-robin scheduling of kernel threads on a single CPU.
//!
//! Threads live in a fixed-capacity [`ThreadTable`] guarded by a
//! [`ReentrantLock`](kernel_sync::ReentrantLock). A thread runs until it
//! yields, blocks, exits, or a timer tick asks the interrupt epilogue to
//! [`preempt`](Scheduler::preempt) it.
//!
//! ## Selection
//!
//! [`Scheduler::reschedule`] scans from the slot after the current thread to
//! the end of the table, then wraps around to the current slot. The first
//! `Runnable` thread wins. With three runnable threads `0`, `1` and `2`,
//! successive yields therefore switch `0 → 1`, `1 → 2`, `2 → 0`.
//!
//! ## Context switching
//!
//! The scheduler treats saved [`Context`]s as opaque and hands them to a
//! [`ContextSwitch`] implementation. The switch always happens with the
//! thread-table lock held once: the thread switched to either returns into
//! its own `reschedule` call and drops its guard, or, if it never ran, its
//! [`Bootstrap`] releases the lock before entering the thread.

#![cfg_attr(not(any(test, doctest)), no_std)]

mod context;
mod scheduler;
mod table;
mod thread;

#[cfg(target_arch = "x86_64")]
pub use context::X86ContextSwitch;
pub use context::{Context, ContextSwitch, EmulatedContextSwitch};
pub use scheduler::{SchedError, Scheduler, TableGuard};
pub use table::ThreadTable;
pub use thread::{Bootstrap, Stack, Thread, ThreadEntry, ThreadState, Tid};
