use crate::context::{Context, ContextSwitch};
use crate::table::ThreadTable;
use crate::thread::{Bootstrap, Stack, Thread, ThreadEntry, ThreadState, Tid};
use core::cell::RefCell;
use kernel_interrupts::{HandlerReturn, InterruptControl, InterruptState};
use kernel_memory_addresses::PhysicalAddress;
use kernel_sync::{ReentrantGuard, ReentrantLock};

/// Recoverable scheduler failures.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedError {
    #[error("thread table is full")]
    TableFull,
    #[error("no stack memory for a new thread")]
    OutOfMemory,
    #[error("no thread {0}")]
    NoSuchThread(Tid),
    #[error("thread {0} is not blocked")]
    NotBlocked(Tid),
}

/// Guard over the thread table, as returned by [`Scheduler::lock`].
pub type TableGuard<'a, const N: usize, I> = ReentrantGuard<'a, RefCell<ThreadTable<N>>, I>;

/// Round-robin scheduler over `N` thread slots.
///
/// The thread table sits behind a [`ReentrantLock`], so every state change
/// runs with interrupts disabled. [`reschedule`](Self::reschedule) expects the
/// caller to already hold that lock; the switch itself happens at lock depth 1
/// and the thread switched to inherits the held lock.
pub struct Scheduler<const N: usize, I: InterruptControl, S: ContextSwitch> {
    table: ReentrantLock<RefCell<ThreadTable<N>>, I>,
    switcher: S,
}

impl<const N: usize, I: InterruptControl, S: ContextSwitch> Scheduler<N, I, S> {
    #[must_use]
    pub const fn new(irq: I, switcher: S) -> Self {
        Self {
            table: ReentrantLock::new(RefCell::new(ThreadTable::new()), irq),
            switcher,
        }
    }

    /// Acquire the thread-table lock.
    #[must_use]
    pub fn lock(&self) -> TableGuard<'_, N, I> {
        self.table.lock()
    }

    #[inline]
    #[must_use]
    pub fn holding_lock(&self) -> bool {
        self.table.holding()
    }

    #[inline]
    #[must_use]
    pub const fn interrupts(&self) -> &I {
        self.table.interrupts()
    }

    #[inline]
    #[must_use]
    pub const fn switcher(&self) -> &S {
        &self.switcher
    }

    /// Release the thread-table lock a freshly started thread inherited from
    /// the switch that started it, then restore `state`.
    ///
    /// # Safety
    /// Must be the first thing a [`Bootstrap`] does, before any other use of
    /// the scheduler on the new stack.
    pub unsafe fn release_inherited_lock(&self, state: InterruptState) {
        unsafe { self.table.force_unlock(state) };
    }

    /// Make the running boot context thread `0`.
    ///
    /// # Panics
    /// If slot `0` is already in use.
    pub fn adopt_boot_thread(&self, name: &'static str) -> Tid {
        let guard = self.table.lock();
        let mut table = guard.borrow_mut();
        let boot = &mut table.threads[0];
        assert_eq!(boot.state, ThreadState::Unused, "boot thread adopted twice");

        boot.name = name;
        boot.state = ThreadState::Running;
        boot.context = Context::EMPTY;
        table.current = 0;
        log::info!("boot context is thread #0 ({name})");
        Tid::new(0)
    }

    /// Create a `Runnable` thread that will enter `bootstrap(entry)` on a stack
    /// obtained from `stack`.
    ///
    /// # Errors
    /// [`SchedError::TableFull`] if no slot is free, [`SchedError::OutOfMemory`]
    /// if `stack` yields nothing.
    pub fn spawn(
        &self,
        name: &'static str,
        entry: ThreadEntry,
        bootstrap: Bootstrap,
        stack: impl FnOnce() -> Option<Stack>,
    ) -> Result<Tid, SchedError> {
        let guard = self.table.lock();
        let mut table = guard.borrow_mut();
        let slot = table.free_slot().ok_or(SchedError::TableFull)?;
        let stack = stack().ok_or(SchedError::OutOfMemory)?;

        // SAFETY: `Stack::from_frames` guarantees the memory is writable and ours.
        let context = unsafe { self.switcher.prepare(stack.top(), entry, bootstrap) };

        let thread = &mut table.threads[slot];
        thread.name = name;
        thread.context = context;
        thread.stack = Some(stack);
        thread.state = ThreadState::Runnable;

        let tid = Tid::new(slot);
        log::debug!("spawned thread {tid} ({name})");
        Ok(tid)
    }

    /// Choose the next thread and switch to it.
    ///
    /// The first `Runnable` slot after the current thread wins, wrapping around
    /// to the current slot; if none is found, a still-`Running` current thread
    /// continues. The chosen thread becomes `Running`, and a previous thread
    /// that is still `Running` is demoted to `Runnable`.
    ///
    /// # Panics
    /// If interrupts are enabled, if the caller does not hold the thread-table
    /// lock, if a switch is needed while the lock is nested, or if no thread
    /// can run at all.
    pub fn reschedule(&self) {
        assert!(
            !self.table.interrupts().are_enabled(),
            "reschedule with interrupts enabled"
        );
        assert!(self.table.holding(), "reschedule without the thread-table lock");

        let guard = self.table.lock();
        let (prev, next) = {
            let mut table = guard.borrow_mut();
            let prev = table.current;
            let next = table
                .pick_next()
                .unwrap_or_else(|| panic!("no runnable thread after #{prev}"));

            table.threads[next].state = ThreadState::Running;
            if next == prev {
                return;
            }
            if table.threads[prev].state == ThreadState::Running {
                table.threads[prev].state = ThreadState::Runnable;
            }
            table.current = next;
            log::debug!(
                "switching #{prev} ({}) -> #{next} ({})",
                table.threads[prev].name,
                table.threads[next].name
            );
            (prev, next)
        };

        // Ours plus the caller's; anything deeper would outlive the switch.
        assert_eq!(guard.depth(), 2, "context switch with nested thread-table locks");

        let cell = guard.as_ptr();
        // SAFETY: the table lives as long as `self`; slots are never moved.
        let (old, new) = unsafe {
            (
                &raw mut (*cell).threads[prev].context,
                &raw const (*cell).threads[next].context,
            )
        };
        drop(guard);

        // SAFETY: interrupts are off and both contexts stay in place.
        unsafe { self.switcher.switch(old, new) };
    }

    /// Give up the CPU. Returns when this thread is chosen again, possibly
    /// immediately.
    ///
    /// # Panics
    /// If the current thread is not `Running`.
    pub fn yield_now(&self) {
        let guard = self.table.lock();
        {
            let mut table = guard.borrow_mut();
            let current = table.current_mut();
            assert_eq!(
                current.state,
                ThreadState::Running,
                "yield from a thread that is not running"
            );
            current.state = ThreadState::Runnable;
        }
        self.reschedule();
        drop(guard);
    }

    /// Epilogue half of a timer reschedule: demote the interrupted thread and
    /// pick the next one.
    pub fn preempt(&self) {
        let guard = self.table.lock();
        {
            let mut table = guard.borrow_mut();
            let current = table.current_mut();
            if current.state == ThreadState::Running {
                current.state = ThreadState::Runnable;
            }
        }
        self.reschedule();
        drop(guard);
    }

    /// Timer handler: request a reschedule from the interrupt epilogue.
    #[must_use]
    pub fn timer_interrupt(&self) -> HandlerReturn {
        log::trace!("timer tick");
        HandlerReturn::Reschedule
    }

    /// Park the current thread until [`wake`](Self::wake) is called for it.
    ///
    /// # Panics
    /// If the current thread is not `Running`.
    pub fn block_current(&self) {
        let guard = self.table.lock();
        {
            let mut table = guard.borrow_mut();
            let current = table.current_mut();
            assert_eq!(
                current.state,
                ThreadState::Running,
                "block from a thread that is not running"
            );
            current.state = ThreadState::Blocked;
        }
        self.reschedule();
        drop(guard);
    }

    /// Make a blocked thread runnable again.
    ///
    /// # Errors
    /// [`SchedError::NoSuchThread`] for an unused or out-of-range id,
    /// [`SchedError::NotBlocked`] if the thread is not blocked.
    pub fn wake(&self, tid: Tid) -> Result<(), SchedError> {
        let guard = self.table.lock();
        let mut table = guard.borrow_mut();
        let thread = table
            .threads
            .get_mut(tid.slot())
            .filter(|t| t.state != ThreadState::Unused)
            .ok_or(SchedError::NoSuchThread(tid))?;
        if thread.state != ThreadState::Blocked {
            return Err(SchedError::NotBlocked(tid));
        }
        thread.state = ThreadState::Runnable;
        log::debug!("woke thread {tid}");
        Ok(())
    }

    /// Terminate the current thread. Its slot becomes a zombie until reaped.
    ///
    /// # Panics
    /// If no other thread can run, or if the exited thread is ever resumed.
    pub fn exit_current(&self) -> ! {
        let guard = self.table.lock();
        let tid = {
            let mut table = guard.borrow_mut();
            let tid = table.current();
            table.current_mut().state = ThreadState::Zombie;
            log::debug!("thread {tid} exited");
            tid
        };
        self.reschedule();
        drop(guard);
        panic!("exited thread {tid} was resumed");
    }

    /// Free the slots of exited threads, handing each stack to `release`.
    /// Returns how many were reaped. The current thread is never reaped.
    pub fn reap(&self, mut release: impl FnMut(Stack)) -> usize {
        let guard = self.table.lock();
        let mut table = guard.borrow_mut();
        let current = table.current;
        let mut reaped = 0;
        for (slot, thread) in table.threads.iter_mut().enumerate() {
            if slot == current || thread.state != ThreadState::Zombie {
                continue;
            }
            if let Some(stack) = thread.stack.take() {
                release(stack);
            }
            log::debug!("reaped thread #{slot} ({})", thread.name);
            *thread = Thread::UNUSED;
            reaped += 1;
        }
        reaped
    }

    #[must_use]
    pub fn current(&self) -> Tid {
        self.table.lock().borrow().current()
    }

    #[must_use]
    pub fn state_of(&self, tid: Tid) -> Option<ThreadState> {
        self.table.lock().borrow().get(tid).map(Thread::state)
    }

    /// Base of the stack a spawned thread runs on. `None` for unused slots and
    /// for the adopted boot thread, whose stack the core does not own.
    #[must_use]
    pub fn stack_base(&self, tid: Tid) -> Option<PhysicalAddress> {
        self.table
            .lock()
            .borrow()
            .get(tid)
            .and_then(Thread::stack)
            .map(Stack::base)
    }

    /// Number of slots in use, zombies included.
    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.table.lock().borrow().iter().count()
    }
}
