//! Trap entry adapters.
//!
//! One stub per supported vector. Each stub pushes a zero placeholder when
//! the CPU supplies no error word, then its vector number, and jumps to the
//! common stub. The common stub saves the general-purpose registers in
//! `InterruptContext` order, hands the frame to `trap_dispatch`, restores
//! everything and returns with `iretq`.
//!
//! Frame size is 176 bytes (CPU frame 40, error and vector 16, registers
//! 120), so the stack is 16-byte aligned at the call.

use core::arch::global_asm;

use dome_abi::arch::context::CONTEXT_GPR_BYTES;
use dome_abi::arch::idt::SUPPORTED_VECTORS;
use dome_abi::arch::InterruptContext;
use dome_lib::cpu;

use crate::dispatch::{self, DispatchOutcome, KernelTraps};

global_asm!(
    r#"
    .macro TRAP_NOERR vec
    trap_entry_\vec:
        push 0
        push \vec
        jmp trap_common
    .endm

    .macro TRAP_ERR vec
    trap_entry_\vec:
        push \vec
        jmp trap_common
    .endm

    .text
    .p2align 4

    .irp vec, 0,1,2,3,4,5,6,7,9,15,16,18,19,20,22,23,24,25,26,27,28,31
        TRAP_NOERR \vec
    .endr

    .irp vec, 8,10,11,12,13,14,17,21,29,30
        TRAP_ERR \vec
    .endr

    .irp vec, 32,33,34,35,36,37,38,39,40,41,42,43,44,45,46,47
        TRAP_NOERR \vec
    .endr

    trap_common:
        push rax
        push rbx
        push rcx
        push rdx
        push rsi
        push rdi
        push rbp
        push r8
        push r9
        push r10
        push r11
        push r12
        push r13
        push r14
        push r15
        mov rdi, rsp
        cld
        call trap_dispatch
        pop r15
        pop r14
        pop r13
        pop r12
        pop r11
        pop r10
        pop r9
        pop r8
        pop rbp
        pop rdi
        pop rsi
        pop rdx
        pop rcx
        pop rbx
        pop rax
        add rsp, 16
        iretq

    .pushsection .data.rel.ro.trap_entry_table, "aw"
    .p2align 3
    .global trap_entry_table
    trap_entry_table:
    .irp vec, 0,1,2,3,4,5,6,7,8,9,10,11,12,13,14,15,16,17,18,19,20,21,22,23,24,25,26,27,28,29,30,31,32,33,34,35,36,37,38,39,40,41,42,43,44,45,46,47
        .quad trap_entry_\vec
    .endr
    .popsection
    "#
);

const _: () = assert!(CONTEXT_GPR_BYTES == 15 * 8);
const _: () = assert!(core::mem::size_of::<InterruptContext>() % 16 == 0);

unsafe extern "C" {
    #[link_name = "trap_entry_table"]
    static TRAP_ENTRY_TABLE: [u64; SUPPORTED_VECTORS];
}

/// Adapter address for every supported vector, indexed by vector.
pub fn trap_entry_addresses() -> [u64; SUPPORTED_VECTORS] {
    // SAFETY: the table is immutable after link and sized by the `.irp` list above.
    unsafe { TRAP_ENTRY_TABLE }
}

/// Called by the common stub with the frame it just built.
#[unsafe(no_mangle)]
extern "C" fn trap_dispatch(ctx: *mut InterruptContext) {
    // SAFETY: the pointer is the current stack frame, valid until we return.
    let ctx = unsafe { &*ctx };
    if let DispatchOutcome::Halt = dispatch::dispatch(ctx, &mut KernelTraps) {
        cpu::halt_loop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn every_vector_has_a_distinct_adapter() {
        let addresses = trap_entry_addresses();
        assert!(addresses.iter().all(|&addr| addr != 0));
        let unique: BTreeSet<u64> = addresses.iter().copied().collect();
        assert_eq!(unique.len(), SUPPORTED_VECTORS);
    }
}
