//! Kernel threads backed by frames from [`FRAMES`](crate::FRAMES).

use crate::{FRAMES, SCHEDULER};
use kernel_alloc::FrameAlloc;
use kernel_info::memory::THREAD_STACK_FRAMES;
use kernel_interrupts::InterruptState;
use kernel_memory_addresses::PhysicalFrame;
use kernel_sched::{SchedError, Stack, ThreadEntry, Tid};

// The allocator hands out single frames; larger stacks would need contiguous runs.
const _: () = assert!(THREAD_STACK_FRAMES == 1);

/// Start a kernel thread running `entry`. It becomes `Runnable` and first
/// runs at the next reschedule. When `entry` returns, the thread exits.
///
/// # Errors
/// [`SchedError::TableFull`] if all thread slots are taken,
/// [`SchedError::OutOfMemory`] if no frame is left for its stack.
pub fn spawn(name: &'static str, entry: ThreadEntry) -> Result<Tid, SchedError> {
    SCHEDULER.spawn(name, entry, thread_bootstrap, || allocate_stack(&FRAMES))
}

fn allocate_stack(frames: &impl FrameAlloc) -> Option<Stack> {
    let base = frames.alloc_frame()?;
    // SAFETY: physical memory is identity mapped and the frame stays
    // allocated until `release_stack` hands it back.
    Some(unsafe { Stack::from_frames(base, THREAD_STACK_FRAMES) })
}

fn release_stack(frames: &impl FrameAlloc, stack: &Stack) {
    let mut frame = PhysicalFrame::containing(stack.base());
    for _ in 0..stack.frames() {
        frames.free_frame(frame.base());
        frame = frame.next();
    }
}

/// First code on every spawned thread's stack.
pub extern "C" fn thread_bootstrap(entry: ThreadEntry) -> ! {
    // SAFETY: nothing has touched the scheduler on this stack yet, and the
    // switch that got us here held the thread-table lock.
    unsafe { SCHEDULER.release_inherited_lock(InterruptState::ENABLED) };
    entry();
    SCHEDULER.exit_current()
}

/// Release the slots and stacks of exited threads. Returns how many were
/// reaped.
pub fn reap() -> usize {
    SCHEDULER.reap(|stack| release_stack(&FRAMES, &stack))
}
