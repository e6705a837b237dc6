use crate::vector::{Dpl, GateType, VectorError};

/// Saved interrupt-enable state, handed back to [`InterruptControl::pop_state`].
///
/// Tokens restore in LIFO order: the innermost push is popped first.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[must_use = "a pushed interrupt state must be popped to restore it"]
pub struct InterruptState {
    enabled: bool,
}

impl InterruptState {
    /// Interrupts were on when the state was captured.
    pub const ENABLED: Self = Self { enabled: true };

    /// Interrupts were off when the state was captured.
    pub const DISABLED: Self = Self { enabled: false };

    #[inline]
    pub const fn from_enabled(enabled: bool) -> Self {
        Self { enabled }
    }

    #[inline]
    #[must_use]
    pub const fn were_enabled(self) -> bool {
        self.enabled
    }
}

/// The platform's interrupt controller as the core sees it.
///
/// Implementations provide vector installation, per-vector masking, the
/// global enable flag, and save/restore of that flag. Everything above this
/// trait is written against it and never touches the hardware directly.
pub trait InterruptControl {
    /// Point `vector` at `handler` in code segment `selector`.
    fn set_vector(&self, vector: u8, handler: usize, selector: u16, dpl: Dpl, gate: GateType);

    /// Make `vector` non-present.
    ///
    /// # Errors
    /// [`VectorError::OutOfRange`] if the vector does not exist.
    fn mask(&self, vector: usize) -> Result<(), VectorError>;

    /// Make `vector` present again.
    ///
    /// # Errors
    /// [`VectorError::OutOfRange`] if the vector does not exist.
    fn unmask(&self, vector: usize) -> Result<(), VectorError>;

    fn enable(&self);

    fn disable(&self);

    /// Capture the current enable flag. Does not change it.
    fn push_state(&self) -> InterruptState;

    /// Restore a flag captured by [`push_state`](Self::push_state).
    fn pop_state(&self, state: InterruptState);

    fn are_enabled(&self) -> bool;

    /// Identity of the executing processor, used as lock owner. Two contexts
    /// that run at the same time must never report the same id.
    fn cpu_id(&self) -> usize {
        0
    }
}

impl<I: InterruptControl + ?Sized> InterruptControl for &I {
    #[inline]
    fn set_vector(&self, vector: u8, handler: usize, selector: u16, dpl: Dpl, gate: GateType) {
        (**self).set_vector(vector, handler, selector, dpl, gate);
    }

    #[inline]
    fn mask(&self, vector: usize) -> Result<(), VectorError> {
        (**self).mask(vector)
    }

    #[inline]
    fn unmask(&self, vector: usize) -> Result<(), VectorError> {
        (**self).unmask(vector)
    }

    #[inline]
    fn enable(&self) {
        (**self).enable();
    }

    #[inline]
    fn disable(&self) {
        (**self).disable();
    }

    #[inline]
    fn push_state(&self) -> InterruptState {
        (**self).push_state()
    }

    #[inline]
    fn pop_state(&self, state: InterruptState) {
        (**self).pop_state(state);
    }

    #[inline]
    fn are_enabled(&self) -> bool {
        (**self).are_enabled()
    }

    #[inline]
    fn cpu_id(&self) -> usize {
        (**self).cpu_id()
    }
}
