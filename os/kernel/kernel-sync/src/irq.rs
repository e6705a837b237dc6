use kernel_interrupts::{InterruptControl, InterruptState};

/// RAII guard that disables interrupts on creation and restores them on drop.
///
/// `IrqGuard::new()` pushes the current interrupt state and disables
/// interrupts. On drop it pops that state, so interrupts come back on
/// **only** if they were on before. Guards nest: each restores exactly what
/// it saw.
///
/// # Examples
///
/// ```
/// use kernel_interrupts::InterruptControl;
/// use kernel_interrupts::emulated::EmulatedInterrupts;
/// use kernel_sync::IrqGuard;
///
/// let irq = EmulatedInterrupts::new();
/// irq.enable();
/// {
///     let _g = IrqGuard::new(&irq);
///     assert!(!irq.are_enabled());
/// }
/// assert!(irq.are_enabled());
/// ```
pub struct IrqGuard<'a, I: InterruptControl> {
    irq: &'a I,
    state: InterruptState,
}

impl<'a, I: InterruptControl> IrqGuard<'a, I> {
    #[inline]
    #[must_use]
    pub fn new(irq: &'a I) -> Self {
        let state = irq.push_state();
        irq.disable();
        Self { irq, state }
    }

    /// The state that will be restored on drop.
    #[inline]
    #[must_use]
    pub const fn saved(&self) -> InterruptState {
        self.state
    }
}

impl<I: InterruptControl> Drop for IrqGuard<'_, I> {
    fn drop(&mut self) {
        self.irq.pop_state(self.state);
    }
}
