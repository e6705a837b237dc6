//! Software interrupt controller.
//!
//! Keeps the enable flag and the vector table in memory. Nothing is ever
//! delivered; the controller exists so the locking, allocation and scheduling
//! layers run unchanged on a host.

use crate::control::{InterruptControl, InterruptState};
use crate::vector::{Dpl, GateType, VectorEntry, VectorError, VectorTable};
use core::cell::UnsafeCell;
use core::hint::spin_loop;
use core::sync::atomic::{AtomicBool, Ordering};

/// Stand-in for one CPU on a host.
///
/// Every caller sees the same [`cpu_id`](InterruptControl::cpu_id), so all
/// code sharing one controller must run on a single host thread. Locks built
/// on it would otherwise let two threads own them at once. Tests that model
/// several CPUs wrap it in a controller that reports a distinct id per
/// thread, or give each CPU its own [`with_cpu_id`](Self::with_cpu_id).
pub struct EmulatedInterrupts {
    enabled: AtomicBool,
    cpu: usize,
    table_busy: AtomicBool,
    table: UnsafeCell<VectorTable>,
}

// SAFETY: `table` is only reached through `with_table`, which serializes on
// `table_busy`. The fixed `cpu` makes it a single-CPU model: sharing it between
// host threads is sound for the table and flag, while owner tracking is only
// meaningful from one thread.
unsafe impl Sync for EmulatedInterrupts {}

impl Default for EmulatedInterrupts {
    fn default() -> Self {
        Self::new()
    }
}

struct TableGuard<'a>(&'a AtomicBool);

impl Drop for TableGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl EmulatedInterrupts {
    /// A controller for CPU `0`, interrupts disabled, every vector missing.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_cpu_id(0)
    }

    /// A controller modelling CPU `cpu`.
    #[must_use]
    pub const fn with_cpu_id(cpu: usize) -> Self {
        Self {
            enabled: AtomicBool::new(false),
            cpu,
            table_busy: AtomicBool::new(false),
            table: UnsafeCell::new(VectorTable::new()),
        }
    }

    /// Run `f` with exclusive access to the vector table.
    pub fn with_table<R>(&self, f: impl FnOnce(&mut VectorTable) -> R) -> R {
        while self
            .table_busy
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            spin_loop();
        }
        let _guard = TableGuard(&self.table_busy);

        // SAFETY: `table_busy` is held until `_guard` drops.
        f(unsafe { &mut *self.table.get() })
    }

    /// Copy of one installed gate.
    #[must_use]
    pub fn vector(&self, vector: usize) -> Option<VectorEntry> {
        self.with_table(|t| t.entry(vector).copied())
    }
}

impl InterruptControl for EmulatedInterrupts {
    fn set_vector(&self, vector: u8, handler: usize, selector: u16, dpl: Dpl, gate: GateType) {
        self.with_table(|t| t.set_vector(vector, handler, selector, dpl, gate));
    }

    fn mask(&self, vector: usize) -> Result<(), VectorError> {
        self.with_table(|t| t.set_present(vector, false))
    }

    fn unmask(&self, vector: usize) -> Result<(), VectorError> {
        self.with_table(|t| t.set_present(vector, true))
    }

    #[inline]
    fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
    }

    #[inline]
    fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
    }

    #[inline]
    fn push_state(&self) -> InterruptState {
        InterruptState::from_enabled(self.are_enabled())
    }

    #[inline]
    fn pop_state(&self, state: InterruptState) {
        self.enabled.store(state.were_enabled(), Ordering::SeqCst);
    }

    #[inline]
    fn are_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    #[inline]
    fn cpu_id(&self) -> usize {
        self.cpu
    }
}
