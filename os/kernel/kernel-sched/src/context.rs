//! Saved execution state and the hardware switch between two of them.

use crate::thread::{Bootstrap, ThreadEntry};

/// Execution state of a suspended thread. The scheduler never looks inside;
/// only the [`ContextSwitch`] implementation that produced it does.
#[repr(C)]
#[derive(Debug, Default, Eq, PartialEq)]
pub struct Context {
    sp: usize,
}

impl Context {
    /// Placeholder for a thread that has not been suspended yet.
    pub const EMPTY: Self = Self { sp: 0 };

    #[inline]
    #[must_use]
    pub const fn from_stack_pointer(sp: usize) -> Self {
        Self { sp }
    }

    #[inline]
    #[must_use]
    pub const fn stack_pointer(&self) -> usize {
        self.sp
    }
}

/// Architecture hook for creating and switching thread contexts.
pub trait ContextSwitch {
    /// Build the context of a thread that has never run. When first switched
    /// to, it calls `bootstrap(entry)` on the stack ending at `stack_top`.
    ///
    /// # Safety
    /// `stack_top` must be the 16-byte aligned end of writable memory owned by
    /// the new thread.
    unsafe fn prepare(&self, stack_top: usize, entry: ThreadEntry, bootstrap: Bootstrap) -> Context;

    /// Save the running state into `old` and resume `new`. Returns when
    /// something later switches back to `old`.
    ///
    /// # Safety
    /// Interrupts must be disabled. `old` must be valid for writes, and `new`
    /// must hold a context from [`prepare`](Self::prepare) or an earlier switch.
    unsafe fn switch(&self, old: *mut Context, new: *const Context);
}

/// Bookkeeping-only switch for hosts. A prepared context records its stack
/// top; switching moves no register state and returns immediately.
#[derive(Copy, Clone, Debug, Default)]
pub struct EmulatedContextSwitch;

impl EmulatedContextSwitch {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ContextSwitch for EmulatedContextSwitch {
    unsafe fn prepare(&self, stack_top: usize, _: ThreadEntry, _: Bootstrap) -> Context {
        Context::from_stack_pointer(stack_top)
    }

    unsafe fn switch(&self, _: *mut Context, _: *const Context) {}
}

#[cfg(target_arch = "x86_64")]
pub use x86::X86ContextSwitch;

#[cfg(target_arch = "x86_64")]
mod x86 {
    use super::{Context, ContextSwitch};
    use crate::thread::{Bootstrap, ThreadEntry};
    use core::arch::naked_asm;

    /// Callee-saved register switch per the SysV ABI.
    ///
    /// A suspended stack looks like this, lowest address first:
    ///
    /// ```text
    /// sp ─▶ r15
    ///       r14
    ///       r13
    ///       r12
    ///       rbx
    ///       rbp
    ///       return address
    /// ```
    #[derive(Copy, Clone, Debug, Default)]
    pub struct X86ContextSwitch;

    impl X86ContextSwitch {
        #[must_use]
        pub const fn new() -> Self {
            Self
        }
    }

    const SAVED_WORDS: usize = 7;

    impl ContextSwitch for X86ContextSwitch {
        unsafe fn prepare(
            &self,
            stack_top: usize,
            entry: ThreadEntry,
            bootstrap: Bootstrap,
        ) -> Context {
            debug_assert!(stack_top.is_multiple_of(16), "unaligned stack top {stack_top:#x}");

            // After `ret` pops the trampoline, rsp == stack_top, 16-byte aligned for its `call`.
            let frame: [usize; SAVED_WORDS] = [
                0,                          // r15
                0,                          // r14
                bootstrap as usize,         // r13
                entry as usize,             // r12
                0,                          // rbx
                0,                          // rbp
                thread_trampoline as usize, // ret
            ];
            let sp = stack_top - SAVED_WORDS * size_of::<usize>();
            unsafe { (sp as *mut [usize; SAVED_WORDS]).write(frame) };
            Context::from_stack_pointer(sp)
        }

        unsafe fn switch(&self, old: *mut Context, new: *const Context) {
            unsafe { switch_stacks(&raw mut (*old).sp, &raw const (*new).sp) };
        }
    }

    #[unsafe(naked)]
    unsafe extern "C" fn switch_stacks(old_sp: *mut usize, new_sp: *const usize) {
        naked_asm!(
            "push rbp",
            "push rbx",
            "push r12",
            "push r13",
            "push r14",
            "push r15",
            "mov [rdi], rsp",
            "mov rsp, [rsi]",
            "pop r15",
            "pop r14",
            "pop r13",
            "pop r12",
            "pop rbx",
            "pop rbp",
            "ret",
        );
    }

    /// First return target of a fresh thread: `bootstrap(entry)`.
    #[unsafe(naked)]
    extern "C" fn thread_trampoline() {
        naked_asm!("mov rdi, r12", "call r13", "ud2");
    }
}
