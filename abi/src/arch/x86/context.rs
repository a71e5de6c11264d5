//! Interrupt context record shared by the trap entry adapters and the
//! dispatcher.
//!
//! Field order is the stack order produced by the adapters: general-purpose
//! registers pushed by the common stub (the last push sits at the lowest
//! address), then the vector and error word pushed by the per-vector stub,
//! then the frame the CPU pushed on entry.

use crate::arch::x86::idt::{EXCEPTION_VECTORS, IRQ_BASE_VECTOR, IRQ_LINES};

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InterruptContext {
    pub r15: u64,
    pub r14: u64,
    pub r13: u64,
    pub r12: u64,
    pub r11: u64,
    pub r10: u64,
    pub r9: u64,
    pub r8: u64,
    pub rbp: u64,
    pub rdi: u64,
    pub rsi: u64,
    pub rdx: u64,
    pub rcx: u64,
    pub rbx: u64,
    pub rax: u64,
    pub vector: u64,
    /// Zero for vectors where the CPU pushes no error word.
    pub error_code: u64,
    pub rip: u64,
    pub cs: u64,
    pub rflags: u64,
    pub rsp: u64,
    pub ss: u64,
}

/// Bytes the common stub pushes before the vector word.
pub const CONTEXT_GPR_BYTES: usize = 15 * 8;

impl InterruptContext {
    /// Context as seen for `vector` with every register zeroed.
    pub const fn for_vector(vector: u8, error_code: u64) -> Self {
        Self {
            r15: 0,
            r14: 0,
            r13: 0,
            r12: 0,
            r11: 0,
            r10: 0,
            r9: 0,
            r8: 0,
            rbp: 0,
            rdi: 0,
            rsi: 0,
            rdx: 0,
            rcx: 0,
            rbx: 0,
            rax: 0,
            vector: vector as u64,
            error_code,
            rip: 0,
            cs: 0,
            rflags: 0,
            rsp: 0,
            ss: 0,
        }
    }

    #[inline]
    pub const fn vector(&self) -> u8 {
        (self.vector & 0xFF) as u8
    }

    #[inline]
    pub const fn is_exception(&self) -> bool {
        (self.vector() as usize) < EXCEPTION_VECTORS
    }

    /// Legacy IRQ line for a remapped PIC vector.
    pub const fn irq_line(&self) -> Option<u8> {
        let vector = self.vector();
        if vector >= IRQ_BASE_VECTOR && ((vector - IRQ_BASE_VECTOR) as usize) < IRQ_LINES {
            Some(vector - IRQ_BASE_VECTOR)
        } else {
            None
        }
    }
}

const _: () = assert!(core::mem::size_of::<InterruptContext>() == 22 * 8);
const _: () = assert!(core::mem::offset_of!(InterruptContext, vector) == CONTEXT_GPR_BYTES);
const _: () = assert!(core::mem::offset_of!(InterruptContext, error_code) == CONTEXT_GPR_BYTES + 8);
const _: () = assert!(core::mem::offset_of!(InterruptContext, rip) == CONTEXT_GPR_BYTES + 16);
const _: () = assert!(core::mem::offset_of!(InterruptContext, ss) == CONTEXT_GPR_BYTES + 48);
