use crate::IrqGuard;
use core::cell::UnsafeCell;
use core::hint::spin_loop;
use core::marker::PhantomData;
use core::ops::Deref;
use core::sync::atomic::{AtomicUsize, Ordering};
use kernel_interrupts::{InterruptControl, InterruptState};

const NO_OWNER: usize = usize::MAX;

/// A spin lock that disables interrupts while held and may be re-acquired by
/// the CPU that already owns it.
///
/// Acquisition saves the interrupt state and disables interrupts **before**
/// touching the lock word, so an interrupt handler on the same CPU can never
/// spin on a lock its own CPU holds. Release drops the lock first and then
/// restores the saved interrupt state.
///
/// Ownership is tracked per CPU ([`InterruptControl::cpu_id`]). Re-acquiring
/// on the owning CPU bumps a depth counter; the lock is free again once every
/// acquisition has been released.
///
/// Because two guards of the same lock can be live at once, guards only hand
/// out `&T`. Wrap mutable state in a `RefCell`.
///
/// # Examples
///
/// ```
/// use core::cell::Cell;
/// use kernel_interrupts::InterruptControl;
/// use kernel_interrupts::emulated::EmulatedInterrupts;
/// use kernel_sync::ReentrantLock;
///
/// let lock = ReentrantLock::new(Cell::new(0), EmulatedInterrupts::new());
/// lock.interrupts().enable();
///
/// let outer = lock.lock();
/// let inner = lock.lock();
/// inner.set(inner.get() + 1);
/// drop(inner);
/// assert!(lock.holding());
/// assert!(!lock.interrupts().are_enabled());
///
/// drop(outer);
/// assert!(!lock.holding());
/// assert!(lock.interrupts().are_enabled());
/// ```
pub struct ReentrantLock<T, I: InterruptControl> {
    /// CPU holding the lock, or `NO_OWNER`.
    owner: AtomicUsize,
    /// Number of unreleased acquisitions by `owner`.
    depth: AtomicUsize,
    irq: I,
    value: UnsafeCell<T>,
}

// Safety: one CPU at a time reaches `value`; only T: Send may cross CPUs.
unsafe impl<T: Send, I: InterruptControl + Sync> Sync for ReentrantLock<T, I> {}

impl<T, I: InterruptControl> ReentrantLock<T, I> {
    #[must_use]
    pub const fn new(value: T, irq: I) -> Self {
        Self {
            owner: AtomicUsize::new(NO_OWNER),
            depth: AtomicUsize::new(0),
            irq,
            value: UnsafeCell::new(value),
        }
    }

    /// Disable interrupts, then acquire (or re-acquire) the lock.
    #[must_use]
    pub fn lock(&self) -> ReentrantGuard<'_, T, I> {
        let irq = IrqGuard::new(&self.irq);
        let me = self.irq.cpu_id();

        // Only this CPU ever stores `me`, so a relaxed read of our own id is exact.
        if self.owner.load(Ordering::Relaxed) == me {
            self.depth.fetch_add(1, Ordering::Relaxed);
        } else {
            while self
                .owner
                .compare_exchange_weak(NO_OWNER, me, Ordering::Acquire, Ordering::Relaxed)
                .is_err()
            {
                while self.owner.load(Ordering::Relaxed) != NO_OWNER {
                    spin_loop();
                }
            }
            self.depth.store(1, Ordering::Relaxed);
        }

        ReentrantGuard {
            lock: self,
            _irq: irq,
            _not_send: PhantomData,
        }
    }

    /// Closure convenience, built on the guard.
    #[inline]
    pub fn with_lock<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let g = self.lock();
        f(&g)
    }

    /// Whether the executing CPU holds the lock.
    #[inline]
    #[must_use]
    pub fn holding(&self) -> bool {
        self.depth.load(Ordering::Relaxed) > 0
            && self.owner.load(Ordering::Relaxed) == self.irq.cpu_id()
    }

    /// Whether any CPU holds the lock.
    #[inline]
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.owner.load(Ordering::Relaxed) != NO_OWNER
    }

    /// Unreleased acquisitions by the current owner.
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }

    #[inline]
    #[must_use]
    pub const fn interrupts(&self) -> &I {
        &self.irq
    }

    /// Mutable access when you have `&mut self` (no contention possible).
    #[inline]
    pub const fn get_mut(&mut self) -> &mut T {
        self.value.get_mut()
    }

    /// Release one acquisition whose guard lives on another stack. Restores
    /// `state` if that was the last one.
    ///
    /// A thread that starts running right after a context switch inherits the
    /// lock from the thread that switched away; it never saw that guard and
    /// releases the lock through this call instead.
    ///
    /// # Safety
    /// The executing CPU must hold the lock, and the acquisition released here
    /// must not also be released by a guard on the current stack.
    ///
    /// # Panics
    /// If the executing CPU does not hold the lock.
    pub unsafe fn force_unlock(&self, state: InterruptState) {
        assert!(self.holding(), "force_unlock on a lock this CPU does not hold");
        if self.release() {
            self.irq.pop_state(state);
        }
    }

    /// Drop one acquisition; `true` when the lock became free.
    fn release(&self) -> bool {
        if self.depth.fetch_sub(1, Ordering::Relaxed) == 1 {
            self.owner.store(NO_OWNER, Ordering::Release);
            true
        } else {
            false
        }
    }
}

/// Shared access to a [`ReentrantLock`]'s value.
///
/// Dropping the guard releases one acquisition, then restores the interrupt
/// state saved when it was taken.
pub struct ReentrantGuard<'a, T, I: InterruptControl> {
    lock: &'a ReentrantLock<T, I>,
    _irq: IrqGuard<'a, I>,
    _not_send: PhantomData<*const ()>,
}

impl<T, I: InterruptControl> ReentrantGuard<'_, T, I> {
    /// Number of guards currently outstanding on this lock, this one included.
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.lock.depth()
    }
}

impl<T, I: InterruptControl> Deref for ReentrantGuard<'_, T, I> {
    type Target = T;
    fn deref(&self) -> &T {
        unsafe { &*self.lock.value.get() }
    }
}

impl<T, I: InterruptControl> Drop for ReentrantGuard<'_, T, I> {
    fn drop(&mut self) {
        // `_irq` drops after this body, so the lock is free before interrupts return.
        self.lock.release();
    }
}
