//! # Kernel Configuration and Boot Interface
//!
//! This crate is the single source of truth for the build-time layout of the
//! kernel core and for the records the boot-information collaborator hands to
//! it.
//!
//! ## Modules
//!
//! ### Boot Information ([`boot`])
//! The boot-to-core contract:
//! * **Memory Map**: ordered `{start, length, kind}` records from firmware
//! * **Kernel Image**: the address just past the loaded kernel, so its frames
//!   are never handed out
//!
//! ### Memory Layout ([`memory`])
//! Compile-time capacities:
//! * **Frame bitmap**: [`memory::FRAME_BITMAP_SIZE`] bytes covering
//!   [`memory::PHYSICAL_MEMORY_LIMIT`] of RAM
//! * **Thread table**: [`memory::MAX_THREADS`] slots with
//!   [`memory::THREAD_STACK_FRAMES`] frames of stack each
//! * **Interrupt gates**: [`memory::VECTOR_COUNT`] vectors running in
//!   [`memory::KERNEL_CODE_SELECTOR`]
//!
//! ```text
//! Physical Memory Layout:
//! 0x0000_0000 ┌─────────────────────────────────┐
//!             │     Low Memory (< 1MiB)         │ reserved with the image
//! 0x0010_0000 ├─────────────────────────────────┤ (1 MiB)
//!             │       Kernel Image              │
//! phys_end    ├─────────────────────────────────┤
//!             │    Available RAM                │ managed by the frame bitmap
//!             └─────────────────────────────────┘
//! ```
//!
//! All values are `const` and checked with compile-time assertions.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod boot;
pub mod memory;
