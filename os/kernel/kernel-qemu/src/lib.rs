//! # QEMU Debug Console Logging
//!
//! The kernel's [`log`] backend. Records are written as
//! `[LEVEL] target: message` lines to QEMU's debug port `0x402`, which the
//! host captures with `-debugcon`:
//!
//! ```bash
//! qemu-system-x86_64 -kernel kernel.bin -debugcon stdio
//! ```
//!
//! ## Features
//!
//! * `enabled` (default): port writes are compiled in on the bare-metal
//!   x86-64 target. Without it, or on any other target, the logger accepts
//!   records and discards them.
//!
//! ```rust,no_run
//! use log::{LevelFilter, info};
//!
//! kernel_qemu::init(LevelFilter::Debug).ok();
//! info!("frame allocator ready");
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod logger;
mod port;

pub use logger::{QemuLogger, init};
