//! # Kernel synchronization primitives
//!
//! * [`IrqGuard`] disables interrupts for a scope and restores the saved state.
//! * [`ReentrantLock`] is the kernel's one lock: interrupt-disabling, per-CPU
//!   owned, and re-acquirable by its owner.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod irq;
mod reentrant;

pub use irq::IrqGuard;
pub use reentrant::{ReentrantGuard, ReentrantLock};
