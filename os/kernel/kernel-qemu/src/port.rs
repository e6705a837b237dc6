use core::fmt::{self, Write};

/// Byte sink for QEMU's debug port.
pub struct DebugPort;

impl DebugPort {
    #[cfg(all(feature = "enabled", target_arch = "x86_64", target_os = "none"))]
    #[allow(clippy::inline_always)]
    #[inline(always)]
    fn putc(c: u8) {
        const QEMU_DEBUG_PORT: u16 = 0x402;
        unsafe {
            core::arch::asm!(
                "out dx, al",
                in("dx") QEMU_DEBUG_PORT,
                in("al") c,
                options(nomem, nostack, preserves_flags)
            );
        }
    }

    #[cfg(not(all(feature = "enabled", target_arch = "x86_64", target_os = "none")))]
    #[inline]
    const fn putc(_: u8) {}
}

impl Write for DebugPort {
    #[inline]
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for b in s.bytes() {
            Self::putc(b);
        }
        Ok(())
    }
}

/// Best-effort formatted write; errors are dropped.
#[inline]
pub fn write(args: fmt::Arguments<'_>) {
    let _ = DebugPort.write_fmt(args);
}
