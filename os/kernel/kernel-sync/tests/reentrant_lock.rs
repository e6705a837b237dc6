use kernel_interrupts::{Dpl, GateType, InterruptControl, InterruptState, VectorError};
use kernel_sync::{IrqGuard, ReentrantLock};
use std::cell::{Cell, RefCell};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::{panic, thread};

/// Each OS thread plays one CPU with its own interrupt flag.
#[derive(Copy, Clone, Default)]
struct ThreadCpu;

static NEXT_CPU: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static IF: Cell<bool> = const { Cell::new(true) };
    static CPU: usize = NEXT_CPU.fetch_add(1, Ordering::Relaxed);
}

impl InterruptControl for ThreadCpu {
    fn set_vector(&self, _: u8, _: usize, _: u16, _: Dpl, _: GateType) {}

    fn mask(&self, _: usize) -> Result<(), VectorError> {
        Ok(())
    }

    fn unmask(&self, _: usize) -> Result<(), VectorError> {
        Ok(())
    }

    fn enable(&self) {
        IF.with(|f| f.set(true));
    }

    fn disable(&self) {
        IF.with(|f| f.set(false));
    }

    fn push_state(&self) -> InterruptState {
        InterruptState::from_enabled(self.are_enabled())
    }

    fn pop_state(&self, state: InterruptState) {
        IF.with(|f| f.set(state.were_enabled()));
    }

    fn are_enabled(&self) -> bool {
        IF.with(Cell::get)
    }

    fn cpu_id(&self) -> usize {
        CPU.with(|c| *c)
    }
}

#[test]
fn lock_disables_and_release_restores_interrupts() {
    let l = ReentrantLock::new(0u32, ThreadCpu);
    assert!(ThreadCpu.are_enabled());
    {
        let g = l.lock();
        assert_eq!(*g, 0);
        assert!(!ThreadCpu.are_enabled());
        assert!(l.holding());
    }
    assert!(ThreadCpu.are_enabled());
    assert!(!l.holding());
    assert!(!l.is_locked());
}

#[test]
fn disabled_interrupts_stay_disabled_after_release() {
    let l = ReentrantLock::new((), ThreadCpu);
    ThreadCpu.disable();
    drop(l.lock());
    assert!(!ThreadCpu.are_enabled());
    ThreadCpu.enable();
}

#[test]
fn reacquire_needs_matching_releases() {
    let l = ReentrantLock::new(RefCell::new(Vec::new()), ThreadCpu);

    let outer = l.lock();
    outer.borrow_mut().push(1);
    let inner = l.lock();
    inner.borrow_mut().push(2);
    assert_eq!(l.depth(), 2);

    drop(inner);
    assert!(l.holding());
    assert_eq!(l.depth(), 1);
    assert!(!ThreadCpu.are_enabled(), "inner release must not re-enable");

    drop(outer);
    assert!(!l.holding());
    assert_eq!(l.depth(), 0);
    assert!(ThreadCpu.are_enabled());
    assert_eq!(*l.lock().borrow(), [1, 2]);
}

#[test]
fn lock_and_irq_guard_nest() {
    let l = ReentrantLock::new((), ThreadCpu);
    let outer = IrqGuard::new(&ThreadCpu);
    assert!(outer.saved().were_enabled());
    {
        let _g = l.lock();
        assert!(!ThreadCpu.are_enabled());
    }
    assert!(!ThreadCpu.are_enabled(), "outer guard still holds interrupts off");
    drop(outer);
    assert!(ThreadCpu.are_enabled());
}

#[test]
fn holding_is_per_cpu() {
    let l = Arc::new(ReentrantLock::new((), ThreadCpu));
    let g = l.lock();

    let other = Arc::clone(&l);
    let seen = thread::spawn(move || (other.is_locked(), other.holding()))
        .join()
        .unwrap();
    assert_eq!(seen, (true, false));
    drop(g);
}

#[test]
fn force_unlock_releases_and_restores() {
    let l = ReentrantLock::new((), ThreadCpu);
    core::mem::forget(l.lock());
    assert!(l.holding());

    unsafe { l.force_unlock(InterruptState::ENABLED) };
    assert!(!l.is_locked());
    assert!(ThreadCpu.are_enabled());
}

#[test]
fn lock_is_released_on_panic() {
    let l = ReentrantLock::new(Cell::new(0u32), ThreadCpu);

    let res = panic::catch_unwind(panic::AssertUnwindSafe(|| {
        l.with_lock(|v| {
            v.set(123);
            panic!("boom");
        });
    }));
    assert!(res.is_err(), "expected panic");

    assert!(!l.is_locked());
    assert!(ThreadCpu.are_enabled());
    assert_eq!(l.with_lock(Cell::get), 123);
}

#[test]
fn contended_increments_are_exact_and_exclusive() {
    let threads = 8;
    let iters = 5_000;

    let lock = Arc::new(ReentrantLock::new(Cell::new(0usize), ThreadCpu));
    let in_cs = Arc::new(AtomicUsize::new(0));
    let start = Arc::new(Barrier::new(threads));

    let mut handles = Vec::with_capacity(threads);
    for _ in 0..threads {
        let lock = Arc::clone(&lock);
        let in_cs = Arc::clone(&in_cs);
        let start = Arc::clone(&start);
        handles.push(thread::spawn(move || {
            start.wait();
            for _ in 0..iters {
                let outer = lock.lock();
                let prev = in_cs.fetch_add(1, Ordering::SeqCst);
                assert_eq!(prev, 0, "mutual exclusion violated");
                {
                    let inner = lock.lock();
                    inner.set(inner.get() + 1);
                }
                in_cs.fetch_sub(1, Ordering::SeqCst);
                drop(outer);
                assert!(ThreadCpu.are_enabled());

                thread::yield_now();
            }
        }));
    }

    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(lock.with_lock(Cell::get), threads * iters);
    assert_eq!(in_cs.load(Ordering::SeqCst), 0);
}
