//! The core singletons share process-wide state, so the whole life cycle runs
//! as one test.

use kernel::{
    FRAMES, IRQ, SCHEDULER, TIMER_VECTOR, init, interrupt_epilogue, reap, spawn, timer_interrupt,
};
use kernel_info::boot::{BootInfo, KernelImage, MemoryRegion, MemoryRegionKind};
use kernel_interrupts::{HandlerReturn, InterruptControl};
use kernel_sched::{ThreadState, Tid};
use std::panic;

extern "C" fn worker() {}

#[test]
fn boot_spawn_preempt_exit_reap() {
    let map = [
        MemoryRegion::new(0x0000_0000, 0x0009_FC00, MemoryRegionKind::Available),
        MemoryRegion::new(0x000F_0000, 0x0001_0000, MemoryRegionKind::Reserved),
        MemoryRegion::new(0x0010_0000, 0x0010_0000, MemoryRegionKind::Available),
    ];
    let boot = BootInfo {
        memory_map: &map,
        kernel: KernelImage::new(0x0015_0010),
    };

    let t0 = init(&boot);
    assert_eq!(t0, Tid::new(0));
    assert!(!IRQ.are_enabled());

    // Every gate is present; the timer gate has its own handler.
    assert!(IRQ.with_table(|t| t.is_fully_configured()));
    let default = IRQ.vector(0x21).unwrap().handler();
    let timer = IRQ.vector(usize::from(TIMER_VECTOR)).unwrap();
    assert!(timer.is_present());
    assert_ne!(timer.handler(), default);

    let initial_free = FRAMES.free_frames();
    assert_eq!(initial_free, 0x200 - 0x151);

    assert_eq!(SCHEDULER.stack_base(t0), None);

    // The stack is the first free frame at or after the allocator's hint.
    let hint = FRAMES.next_frame_hint();
    let t1 = spawn("worker", worker).unwrap();
    assert_eq!(t1, Tid::new(1));
    assert_eq!(SCHEDULER.state_of(t1), Some(ThreadState::Runnable));
    assert_eq!(FRAMES.free_frames(), initial_free - 1);
    let stack = SCHEDULER.stack_base(t1).unwrap();
    assert!(FRAMES.is_allocated(stack));
    assert!(stack.frame_index() >= hint);
    assert!(stack.frame_index() > 0x150, "stack inside the kernel image");

    // A tick only asks; the epilogue switches.
    let ret = timer_interrupt();
    assert_eq!(ret, HandlerReturn::Reschedule);
    assert_eq!(SCHEDULER.current(), t0);
    interrupt_epilogue(ret);
    assert_eq!(SCHEDULER.current(), t1);
    assert_eq!(SCHEDULER.state_of(t0), Some(ThreadState::Runnable));

    interrupt_epilogue(HandlerReturn::Continue);
    assert_eq!(SCHEDULER.current(), t1);

    SCHEDULER.yield_now();
    assert_eq!(SCHEDULER.current(), t0);
    SCHEDULER.yield_now();
    assert_eq!(SCHEDULER.current(), t1);

    // Host switches return immediately, so the exit path reports a resume.
    let res = panic::catch_unwind(|| {
        SCHEDULER.exit_current();
    });
    assert!(res.is_err());
    assert_eq!(SCHEDULER.current(), t0);
    assert_eq!(SCHEDULER.state_of(t1), Some(ThreadState::Zombie));

    assert_eq!(reap(), 1);
    assert_eq!(SCHEDULER.state_of(t1), None);
    assert_eq!(FRAMES.free_frames(), initial_free);
    assert!(!FRAMES.is_allocated(stack));
    assert_eq!(SCHEDULER.stack_base(t1), None);

    assert!(!IRQ.are_enabled());
    assert!(!SCHEDULER.holding_lock());
}
