/*
 * x86_64 continuation capture and resume (System V ABI).
 */

/// Saved execution state: the callee-saved registers, the stack pointer
/// as it will be after the `capture` call returns, and that call's return
/// address, which doubles as the resume target.
///
/// Field order is load-bearing; the assembly below addresses the struct
/// by byte offset.
#[repr(C)]
#[derive(Clone, Copy)]
pub(crate) struct JumpContext {
    rbx: usize,
    rbp: usize,
    r12: usize,
    r13: usize,
    r14: usize,
    r15: usize,
    rsp: usize,
    rip: usize,
}

impl JumpContext {
    pub(crate) const EMPTY: JumpContext = JumpContext {
        rbx: 0,
        rbp: 0,
        r12: 0,
        r13: 0,
        r14: 0,
        r15: 0,
        rsp: 0,
        rip: 0,
    };
}

/// Save the current execution state into `ctx` and return 0. A later
/// `resume` of `ctx` makes this call site return again, with the resumed
/// value.
///
/// # Safety
/// `ctx` must be valid for writes. See the module header for the rules a
/// matching `resume` must follow.
#[unsafe(naked)]
pub(crate) unsafe extern "C" fn capture(ctx: *mut JumpContext) -> usize {
    core::arch::naked_asm!(
        "mov [rdi + 0x00], rbx",
        "mov [rdi + 0x08], rbp",
        "mov [rdi + 0x10], r12",
        "mov [rdi + 0x18], r13",
        "mov [rdi + 0x20], r14",
        "mov [rdi + 0x28], r15",
        // stack pointer as it will be once this call has returned
        "lea rax, [rsp + 8]",
        "mov [rdi + 0x30], rax",
        "mov rax, [rsp]",
        "mov [rdi + 0x38], rax",
        "xor eax, eax",
        "ret",
    )
}

/// Restore the state saved in `ctx`. Control reappears at the matching
/// `capture` site returning `val`; a zero `val` is delivered as 1 so the
/// capture-time return stays distinguishable.
///
/// # Safety
/// The frame that captured `ctx` must still exist on the current stack.
#[unsafe(naked)]
pub(crate) unsafe extern "C" fn resume(ctx: *const JumpContext, val: usize) -> ! {
    core::arch::naked_asm!(
        "mov rbx, [rdi + 0x00]",
        "mov rbp, [rdi + 0x08]",
        "mov r12, [rdi + 0x10]",
        "mov r13, [rdi + 0x18]",
        "mov r14, [rdi + 0x20]",
        "mov r15, [rdi + 0x28]",
        "mov rsp, [rdi + 0x30]",
        "mov rax, rsi",
        "test rax, rax",
        "jnz 2f",
        "mov eax, 1",
        "2:",
        "jmp qword ptr [rdi + 0x38]",
    )
}
