//! End-to-end installs against functions with known byte layouts.
//!
//! The targets are written in assembly so every prologue byte is fixed:
//! each test knows exactly which instructions straddle the clobbered
//! window and what the trampoline must preserve.

#![cfg(all(target_os = "linux", target_arch = "x86_64"))]

use std::ffi::c_void;
use std::slice;

use libdivert::declare_trampoline;
use libdivert::hook::{HookError, begin_batch, end_batch, install};

core::arch::global_asm!(
    ".pushsection .text,\"ax\",@progbits",
    // Callee for the outgoing-call target; placed first so the call
    // displacement is negative and stays outside the hook window.
    ".globl dv_callee42",
    "dv_callee42:",
    "mov eax, 42",
    "ret",
    ".fill 16, 1, 0x90",
    // push rbp; mov rbp, rsp; mov eax, 7; pop rbp; ret
    ".globl dv_tiny_leaf",
    "dv_tiny_leaf:",
    "push rbp",
    "mov rbp, rsp",
    "mov eax, 7",
    "pop rbp",
    "ret",
    ".fill 24, 1, 0x90",
    // The movabs ends at offset 14 and straddles the 12-byte window.
    ".globl dv_wide_constant",
    "dv_wide_constant:",
    "push rbp",
    "mov rbp, rsp",
    "movabs rax, 0x1122334455667788",
    "pop rbp",
    "ret",
    ".fill 24, 1, 0x90",
    // Near call in the first instruction.
    ".globl dv_outgoing_call",
    "dv_outgoing_call:",
    "call dv_callee42",
    "add eax, 1",
    "nop",
    "nop",
    "nop",
    "nop",
    "ret",
    ".fill 24, 1, 0x90",
    // RIP-relative address materialisation.
    ".globl dv_lea_addr",
    "dv_lea_addr:",
    "lea rax, [rip + dv_lea_payload]",
    "ret",
    ".fill 24, 1, 0x90",
    // cmp edi, 0; je rel32 (forced wide) past the window; two exits.
    ".globl dv_jcc",
    "dv_jcc:",
    "cmp edi, 0",
    ".byte 0x0f, 0x84",
    ".long dv_jcc_far - (dv_jcc + 9)",
    "mov eax, 1",
    "ret",
    "dv_jcc_far:",
    "mov eax, 2",
    "ret",
    ".fill 24, 1, 0x90",
    // je targets offset 11, inside the clobbered window.
    ".globl dv_hazard",
    "dv_hazard:",
    "xor eax, eax",
    "test edi, edi",
    "je 1f",
    "mov eax, 1",
    "1:",
    "ret",
    ".fill 24, 1, 0x90",
    // Debugger-style breakpoint on the first byte.
    ".globl dv_int3",
    "dv_int3:",
    "int3",
    "ret",
    ".fill 24, 1, 0x90",
    // Target hooked without a trampoline.
    ".globl dv_no_tramp",
    "dv_no_tramp:",
    "mov eax, 5",
    "ret",
    ".fill 24, 1, 0x90",
    ".balign 8",
    ".globl dv_lea_payload",
    "dv_lea_payload:",
    ".quad 0",
    ".popsection",
);

unsafe extern "C" {
    fn dv_callee42() -> i32;
    fn dv_tiny_leaf() -> i32;
    fn dv_wide_constant() -> u64;
    fn dv_outgoing_call() -> i32;
    fn dv_lea_addr() -> usize;
    fn dv_jcc(x: i32) -> i32;
    fn dv_hazard(x: i32) -> i32;
    fn dv_int3() -> i32;
    fn dv_no_tramp() -> i32;
    static dv_lea_payload: u64;
}

declare_trampoline! {
    fn real_tiny_leaf() -> i32;
}
declare_trampoline! {
    fn real_wide_constant() -> u64;
}
declare_trampoline! {
    fn real_outgoing_call() -> i32;
}
declare_trampoline! {
    fn real_lea_addr() -> usize;
}
declare_trampoline! {
    fn real_jcc(x: i32) -> i32;
}

extern "C" fn repl_hundred() -> i32 {
    100
}

extern "C" fn repl_zero() -> u64 {
    0
}

extern "C" fn repl_neg() -> i32 {
    -1
}

extern "C" fn repl_null() -> usize {
    0
}

extern "C" fn repl_ninety_nine(_x: i32) -> i32 {
    99
}

extern "C" fn repl_fifty() -> i32 {
    50
}

fn code_ptr(f: usize) -> *const c_void {
    f as *const c_void
}

fn code_bytes(f: usize, len: usize) -> Vec<u8> {
    unsafe { slice::from_raw_parts(f as *const u8, len) }.to_vec()
}

#[test]
fn test_tiny_leaf_diverts_and_preserves() {
    unsafe {
        install(
            code_ptr(dv_tiny_leaf as usize),
            code_ptr(repl_hundred as usize),
            code_ptr(real_tiny_leaf as usize),
        )
        .expect("install");

        // Every call lands in the replacement now.
        assert_eq!(dv_tiny_leaf(), 100);
        // The trampoline still runs the original prologue and body.
        assert_eq!(real_tiny_leaf(), 7);
    }

    // Entry bytes are the absolute jump to the replacement.
    let entry = code_bytes(dv_tiny_leaf as usize, 12);
    assert_eq!(entry[..2], [0x48, 0xB8]);
    assert_eq!(
        entry[2..10],
        (repl_hundred as usize as u64).to_le_bytes()
    );
    assert_eq!(entry[10..12], [0xFF, 0xE0]);
}

#[test]
fn test_straddled_instruction_is_trapped() {
    unsafe {
        install(
            code_ptr(dv_wide_constant as usize),
            code_ptr(repl_zero as usize),
            code_ptr(real_wide_constant as usize),
        )
        .expect("install");

        assert_eq!(dv_wide_constant(), 0);
        assert_eq!(real_wide_constant(), 0x1122334455667788);
    }

    // The movabs ends at offset 14: its last two bytes must be int3.
    let entry = code_bytes(dv_wide_constant as usize, 16);
    assert_eq!(entry[12..14], [0xCC, 0xCC]);
    // Nothing past the straddle is touched.
    assert_eq!(entry[14], 0x5D);
    assert_eq!(entry[15], 0xC3);
}

#[test]
fn test_outgoing_call_keeps_callee_reachable() {
    unsafe {
        install(
            code_ptr(dv_outgoing_call as usize),
            code_ptr(repl_neg as usize),
            code_ptr(real_outgoing_call as usize),
        )
        .expect("install");

        assert_eq!(dv_outgoing_call(), -1);
        // Trampoline calls dv_callee42 through the jump table, then
        // continues with the displaced add.
        assert_eq!(real_outgoing_call(), 43);
        // The callee itself is untouched.
        assert_eq!(dv_callee42(), 42);
    }
}

#[test]
fn test_lea_is_rewritten_to_the_same_address() {
    unsafe {
        install(
            code_ptr(dv_lea_addr as usize),
            code_ptr(repl_null as usize),
            code_ptr(real_lea_addr as usize),
        )
        .expect("install");

        assert_eq!(dv_lea_addr(), 0);
        let expected = &raw const dv_lea_payload as usize;
        assert_eq!(real_lea_addr(), expected);
    }
}

#[test]
fn test_wide_jcc_keeps_both_exits() {
    unsafe {
        install(
            code_ptr(dv_jcc as usize),
            code_ptr(repl_ninety_nine as usize),
            code_ptr(real_jcc as usize),
        )
        .expect("install");

        assert_eq!(dv_jcc(0), 99);
        assert_eq!(dv_jcc(1), 99);
        // Taken branch reaches the far exit, fall-through the near one.
        assert_eq!(real_jcc(0), 2);
        assert_eq!(real_jcc(1), 1);
    }
}

#[test]
fn test_hazard_leaves_the_function_untouched() {
    let before = code_bytes(dv_hazard as usize, 16);
    let err = unsafe {
        install(
            code_ptr(dv_hazard as usize),
            code_ptr(repl_hundred as usize),
            std::ptr::null(),
        )
    }
    .unwrap_err();

    assert!(matches!(err, HookError::BranchHazard(_)));
    assert_eq!(before, code_bytes(dv_hazard as usize, 16));
    unsafe {
        assert_eq!(dv_hazard(0), 0);
        assert_eq!(dv_hazard(1), 1);
    }
}

#[test]
fn test_breakpoint_refuses_install() {
    let err = unsafe {
        install(
            code_ptr(dv_int3 as usize),
            code_ptr(repl_hundred as usize),
            std::ptr::null(),
        )
    }
    .unwrap_err();
    assert!(matches!(err, HookError::DebugBreakpoint));

    let entry = code_bytes(dv_int3 as usize, 2);
    assert_eq!(entry, [0xCC, 0xC3]);
}

#[test]
fn test_null_arguments_are_rejected() {
    let err = unsafe {
        install(
            std::ptr::null(),
            code_ptr(repl_hundred as usize),
            std::ptr::null(),
        )
    }
    .unwrap_err();
    assert!(matches!(err, HookError::NullPointer(_)));
}

#[test]
fn test_batched_install_without_trampoline() {
    begin_batch().expect("begin_batch");
    // Re-entrant.
    begin_batch().expect("begin_batch again");

    unsafe {
        install(
            code_ptr(dv_no_tramp as usize),
            code_ptr(repl_fifty as usize),
            std::ptr::null(),
        )
        .expect("install inside batch");

        assert_eq!(dv_no_tramp(), 50);
    }

    end_batch();
    // Idempotent.
    end_batch();

    // A fresh batch opens cleanly after the previous one closed.
    begin_batch().expect("begin_batch after close");
    end_batch();
}
