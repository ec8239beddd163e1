//! Architecture shim: register spilling and stack-growth direction.
//!
//! Conservative collection has to see pointers that currently live only in
//! registers. [`with_spilled_registers`] deposits the callee-preserved
//! general-purpose registers into a buffer on the current frame and hands the
//! caller a stack-top address that lies at-or-below every spilled slot, so a
//! stack scan down to that address covers the register file as well.
//!
//! Nothing outside this module may assume which way the stack grows; that
//! knowledge lives in [`stack_grows_down`] alone.

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
compile_error!("no register spill support for this target architecture");

/// Words the spill buffer holds (one per captured register).
#[cfg(target_arch = "x86_64")]
const SPILL_WORDS: usize = 6;
#[cfg(target_arch = "aarch64")]
const SPILL_WORDS: usize = 12;

/// Spill the callee-preserved registers onto the current frame and run
/// `scan` with a stack-top address covering them.
///
/// Every spilled slot lies at-or-above the address passed to `scan`, so a
/// conservative scan of `[stack_top, stack_base)` observes the captured
/// register values. The spill is released by ordinary scope exit; the buffer
/// stays addressable until `scan` returns.
#[inline(never)]
pub fn with_spilled_registers<R>(scan: impl FnOnce(*mut u8) -> R) -> R {
    let mut slots = [0usize; SPILL_WORDS];
    let stack_top = unsafe { spill(slots.as_mut_ptr()) };
    debug_assert!(!stack_grows_down(slots.as_ptr() as *const u8, stack_top));
    let result = scan(stack_top);
    std::hint::black_box(&slots);
    result
}

/// Whether `a` is deeper in the stack than `b`.
///
/// Every supported target grows the stack toward lower addresses.
#[inline]
pub fn stack_grows_down(a: *const u8, b: *const u8) -> bool {
    (a as usize) < (b as usize)
}

/// Store the callee-preserved integer registers at `slots` and return the
/// stack pointer read after the stores.
#[cfg(target_arch = "x86_64")]
unsafe fn spill(slots: *mut usize) -> *mut u8 {
    let sp: usize;
    unsafe {
        core::arch::asm!(
            "mov [{base}], rbx",
            "mov [{base} + 8], rbp",
            "mov [{base} + 16], r12",
            "mov [{base} + 24], r13",
            "mov [{base} + 32], r14",
            "mov [{base} + 40], r15",
            "mov {sp}, rsp",
            base = in(reg) slots,
            sp = out(reg) sp,
            options(nostack, preserves_flags),
        );
    }
    sp as *mut u8
}

/// Store the callee-preserved integer registers at `slots` and return the
/// stack pointer read after the stores.
#[cfg(target_arch = "aarch64")]
unsafe fn spill(slots: *mut usize) -> *mut u8 {
    let sp: usize;
    unsafe {
        core::arch::asm!(
            "stp x19, x20, [{base}]",
            "stp x21, x22, [{base}, #16]",
            "stp x23, x24, [{base}, #32]",
            "stp x25, x26, [{base}, #48]",
            "stp x27, x28, [{base}, #64]",
            "stp x29, x30, [{base}, #80]",
            "mov {sp}, sp",
            base = in(reg) slots,
            sp = out(reg) sp,
            options(nostack, preserves_flags),
        );
    }
    sp as *mut u8
}
