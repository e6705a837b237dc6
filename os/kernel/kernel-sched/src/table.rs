use crate::thread::{Thread, ThreadState, Tid};
use utils_ring_scan::find_from;

/// Fixed-capacity thread table, indexed by [`Tid`].
#[derive(Debug)]
pub struct ThreadTable<const N: usize> {
    pub(crate) threads: [Thread; N],
    pub(crate) current: usize,
}

impl<const N: usize> ThreadTable<N> {
    pub(crate) const fn new() -> Self {
        Self {
            threads: [Thread::UNUSED; N],
            current: 0,
        }
    }

    #[inline]
    #[must_use]
    pub const fn current(&self) -> Tid {
        Tid::new(self.current)
    }

    #[must_use]
    pub fn get(&self, tid: Tid) -> Option<&Thread> {
        self.threads
            .get(tid.slot())
            .filter(|t| t.state != ThreadState::Unused)
    }

    /// Live (non-`Unused`) threads with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (Tid, &Thread)> {
        self.threads
            .iter()
            .enumerate()
            .filter(|(_, t)| t.state != ThreadState::Unused)
            .map(|(i, t)| (Tid::new(i), t))
    }

    pub(crate) fn current_mut(&mut self) -> &mut Thread {
        &mut self.threads[self.current]
    }

    /// Round-robin choice: the first `Runnable` slot after the current one,
    /// wrapping around to the current slot itself. A still-`Running` current
    /// thread keeps the CPU when nothing else is runnable.
    pub(crate) fn pick_next(&self) -> Option<usize> {
        find_from(self.current + 1, N, |i| {
            self.threads[i].state == ThreadState::Runnable
        })
        .or_else(|| {
            (self.threads[self.current].state == ThreadState::Running).then_some(self.current)
        })
    }

    pub(crate) fn free_slot(&self) -> Option<usize> {
        self.threads
            .iter()
            .position(|t| t.state == ThreadState::Unused)
    }
}
