use crate::context::Context;
use core::fmt;
use kernel_memory_addresses::{FRAME_SIZE, PhysicalAddress};

/// Thread identifier; equal to the thread's slot in the table.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct Tid(usize);

impl Tid {
    #[inline]
    #[must_use]
    pub const fn new(slot: usize) -> Self {
        Self(slot)
    }

    #[inline]
    #[must_use]
    pub const fn slot(self) -> usize {
        self.0
    }
}

impl fmt::Display for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of a thread-table slot.
///
/// ```text
///   Unused ──spawn──▶ Runnable ◀──yield/preempt/wake── Running
///                        │                               │  │
///                        └──────────reschedule──────────▶┘  │
///                                              block ◀──────┤
///                                              exit ──▶ Zombie ──reap──▶ Unused
/// ```
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ThreadState {
    /// Free slot.
    Unused,
    /// Ready to run, waiting for the CPU.
    Runnable,
    /// On the CPU. Exactly one thread is in this state.
    Running,
    /// Waiting for [`wake`](crate::Scheduler::wake).
    Blocked,
    /// Exited; its stack is released by [`reap`](crate::Scheduler::reap).
    Zombie,
}

/// Function a spawned thread starts in.
pub type ThreadEntry = extern "C" fn();

/// First code a spawned thread runs. It receives the thread's entry point and
/// must release the thread-table lock inherited from the switch before
/// calling it. Never returns.
pub type Bootstrap = extern "C" fn(ThreadEntry) -> !;

/// Frames backing a kernel thread stack.
#[derive(Debug, Eq, PartialEq)]
pub struct Stack {
    base: PhysicalAddress,
    frames: usize,
}

impl Stack {
    /// # Safety
    /// `frames` frames starting at `base` must be writable at their physical
    /// addresses and owned by the stack until it is handed back by `reap`.
    #[must_use]
    pub const unsafe fn from_frames(base: PhysicalAddress, frames: usize) -> Self {
        Self { base, frames }
    }

    #[inline]
    #[must_use]
    pub const fn base(&self) -> PhysicalAddress {
        self.base
    }

    #[inline]
    #[must_use]
    pub const fn frames(&self) -> usize {
        self.frames
    }

    /// One past the highest stack byte; stacks grow down from here.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn top(&self) -> usize {
        (self.base.as_u64() + self.frames as u64 * FRAME_SIZE) as usize
    }
}

/// One thread-table record.
#[derive(Debug)]
pub struct Thread {
    pub(crate) name: &'static str,
    pub(crate) state: ThreadState,
    pub(crate) context: Context,
    pub(crate) stack: Option<Stack>,
}

impl Thread {
    pub(crate) const UNUSED: Self = Self {
        name: "",
        state: ThreadState::Unused,
        context: Context::EMPTY,
        stack: None,
    };

    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    #[must_use]
    pub const fn state(&self) -> ThreadState {
        self.state
    }

    #[inline]
    #[must_use]
    pub const fn stack(&self) -> Option<&Stack> {
        self.stack.as_ref()
    }
}
