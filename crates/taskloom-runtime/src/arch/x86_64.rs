//! x86_64 context switching implementation
//!
//! System V AMD64 ABI: rsp, rbx, rbp, r12-r15 are callee-saved and are
//! the only registers that must survive a voluntary switch.

use std::arch::naked_asm;

/// Saved register block for a suspended flow of control.
///
/// Field order is load-bearing: the assembly below addresses fields by
/// byte offset.
#[repr(C)]
#[derive(Debug)]
pub struct SavedContext {
    pub rsp: u64, // 0x00
    pub rip: u64, // 0x08
    pub rbx: u64, // 0x10
    pub rbp: u64, // 0x18
    pub r12: u64, // 0x20
    pub r13: u64, // 0x28
    pub r14: u64, // 0x30
    pub r15: u64, // 0x38
}

impl SavedContext {
    pub const fn new() -> Self {
        Self {
            rsp: 0,
            rip: 0,
            rbx: 0,
            rbp: 0,
            r12: 0,
            r13: 0,
            r14: 0,
            r15: 0,
        }
    }
}

impl Default for SavedContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Prepare a fresh context so that the first switch into it enters
/// `entry(arg)` on the given stack.
///
/// `entry` must never return; it must leave by switching to another
/// context.
///
/// # Safety
///
/// `ctx` must point to valid `SavedContext` memory and `stack_top` must
/// be the high end of a live, writable stack.
pub unsafe fn init_context(
    ctx: *mut SavedContext,
    stack_top: *mut u8,
    entry: extern "C" fn(usize),
    arg: usize,
) {
    // The trampoline is entered by `jmp` with rsp 16-byte aligned; its
    // `call` then gives the entry function rsp % 16 == 8, the ABI state
    // at any function entry.
    let sp = stack_top as usize & !0xF;

    let ctx = &mut *ctx;
    ctx.rsp = sp as u64;
    ctx.rip = entry_trampoline as usize as u64;
    ctx.rbx = 0;
    ctx.rbp = 0;
    ctx.r12 = arg as u64;
    ctx.r13 = entry as usize as u64;
    ctx.r14 = 0;
    ctx.r15 = 0;
}

/// Trampoline that moves the entry argument into place and calls the
/// entry function. The entry function never returns; `ud2` traps if it
/// somehow does.
#[unsafe(naked)]
unsafe extern "C" fn entry_trampoline() {
    naked_asm!("mov rdi, r12", "call r13", "ud2",);
}

/// Save the current flow of control into `old` and resume `new`.
///
/// Returns when some other flow switches back into `old`.
///
/// # Safety
///
/// Both pointers must be valid. `new` must have been initialized by
/// `init_context` or by a previous `swap_context` save.
#[unsafe(naked)]
pub unsafe extern "C" fn swap_context(_old: *mut SavedContext, _new: *const SavedContext) {
    naked_asm!(
        // Save callee-saved registers into old (RDI)
        "mov [rdi + 0x00], rsp",
        "lea rax, [rip + 2f]",
        "mov [rdi + 0x08], rax",
        "mov [rdi + 0x10], rbx",
        "mov [rdi + 0x18], rbp",
        "mov [rdi + 0x20], r12",
        "mov [rdi + 0x28], r13",
        "mov [rdi + 0x30], r14",
        "mov [rdi + 0x38], r15",
        // Load callee-saved registers from new (RSI)
        "mov rsp, [rsi + 0x00]",
        "mov rax, [rsi + 0x08]",
        "mov rbx, [rsi + 0x10]",
        "mov rbp, [rsi + 0x18]",
        "mov r12, [rsi + 0x20]",
        "mov r13, [rsi + 0x28]",
        "mov r14, [rsi + 0x30]",
        "mov r15, [rsi + 0x38]",
        // Jump to the new flow's saved rip
        "jmp rax",
        // Resume point for the saved flow
        "2:",
        "ret",
    );
}
