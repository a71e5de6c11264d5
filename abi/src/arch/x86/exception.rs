//! CPU exception vectors, their names, and the error words they push.

use bitflags::bitflags;

use crate::arch::x86::idt::EXCEPTION_VECTORS;

pub const EXCEPTION_DIVIDE_ERROR: u8 = 0;
pub const EXCEPTION_DEBUG: u8 = 1;
pub const EXCEPTION_NMI: u8 = 2;
pub const EXCEPTION_BREAKPOINT: u8 = 3;
pub const EXCEPTION_OVERFLOW: u8 = 4;
pub const EXCEPTION_BOUND_RANGE: u8 = 5;
pub const EXCEPTION_INVALID_OPCODE: u8 = 6;
pub const EXCEPTION_DEVICE_NOT_AVAIL: u8 = 7;
pub const EXCEPTION_DOUBLE_FAULT: u8 = 8;
pub const EXCEPTION_COPROCESSOR_OVERRUN: u8 = 9;
pub const EXCEPTION_INVALID_TSS: u8 = 10;
pub const EXCEPTION_SEGMENT_NOT_PRES: u8 = 11;
pub const EXCEPTION_STACK_FAULT: u8 = 12;
pub const EXCEPTION_GENERAL_PROTECTION: u8 = 13;
pub const EXCEPTION_PAGE_FAULT: u8 = 14;
pub const EXCEPTION_FPU_ERROR: u8 = 16;
pub const EXCEPTION_ALIGNMENT_CHECK: u8 = 17;
pub const EXCEPTION_MACHINE_CHECK: u8 = 18;
pub const EXCEPTION_SIMD_FP_EXCEPTION: u8 = 19;
pub const EXCEPTION_VIRTUALIZATION: u8 = 20;
pub const EXCEPTION_CONTROL_PROTECTION: u8 = 21;
pub const EXCEPTION_HYPERVISOR_INJECTION: u8 = 28;
pub const EXCEPTION_VMM_COMMUNICATION: u8 = 29;
pub const EXCEPTION_SECURITY: u8 = 30;

static EXCEPTION_NAMES: [&str; EXCEPTION_VECTORS] = [
    "Divide Error",
    "Debug",
    "Non-Maskable Interrupt",
    "Breakpoint",
    "Overflow",
    "Bound Range Exceeded",
    "Invalid Opcode",
    "Device Not Available",
    "Double Fault",
    "Coprocessor Segment Overrun",
    "Invalid TSS",
    "Segment Not Present",
    "Stack Segment Fault",
    "General Protection Fault",
    "Page Fault",
    "Reserved",
    "x87 FPU Error",
    "Alignment Check",
    "Machine Check",
    "SIMD Floating-Point Exception",
    "Virtualization Exception",
    "Control Protection Exception",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Reserved",
    "Hypervisor Injection Exception",
    "VMM Communication Exception",
    "Security Exception",
    "Reserved",
];

/// Descriptive label for an exception vector; "Unknown" above 31.
pub fn exception_name(vector: u8) -> &'static str {
    EXCEPTION_NAMES
        .get(vector as usize)
        .copied()
        .unwrap_or("Unknown")
}

/// Whether the CPU pushes an error word for this vector.
pub const fn has_error_code(vector: u8) -> bool {
    matches!(
        vector,
        EXCEPTION_DOUBLE_FAULT
            | EXCEPTION_INVALID_TSS
            | EXCEPTION_SEGMENT_NOT_PRES
            | EXCEPTION_STACK_FAULT
            | EXCEPTION_GENERAL_PROTECTION
            | EXCEPTION_PAGE_FAULT
            | EXCEPTION_ALIGNMENT_CHECK
            | EXCEPTION_CONTROL_PROTECTION
            | EXCEPTION_VMM_COMMUNICATION
            | EXCEPTION_SECURITY
    )
}

/// Descriptor table a selector error code points into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectorTable {
    Gdt,
    Idt,
    Ldt,
}

/// Selector-shaped error word pushed by vectors 10-13.
///
/// Layout: bit 0 external event, bits 1-2 table, bits 3-15 selector index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SelectorErrorCode {
    pub external: bool,
    /// Raw 2-bit table field (0 GDT, 1 IDT, 2 LDT, 3 IDT).
    pub table: u8,
    pub index: u16,
}

impl SelectorErrorCode {
    pub const fn decode(raw: u64) -> Self {
        Self {
            external: raw & 0x1 != 0,
            table: ((raw >> 1) & 0x3) as u8,
            index: ((raw >> 3) & 0x1FFF) as u16,
        }
    }

    pub const fn table_kind(&self) -> SelectorTable {
        match self.table {
            0 => SelectorTable::Gdt,
            2 => SelectorTable::Ldt,
            _ => SelectorTable::Idt,
        }
    }
}

bitflags! {
    /// Page-fault error word (vector 14).
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct PageFaultErrorCode: u64 {
        /// Protection violation; clear means the page was not present.
        const PROTECTION_VIOLATION = 1 << 0;
        const CAUSED_BY_WRITE = 1 << 1;
        const USER_MODE = 1 << 2;
        const MALFORMED_TABLE = 1 << 3;
        const INSTRUCTION_FETCH = 1 << 4;
        const PROTECTION_KEY = 1 << 5;
        const SHADOW_STACK = 1 << 6;
    }
}

/// Structured reading of an exception's error word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCodeDetail {
    None,
    Selector(SelectorErrorCode),
    PageFault(PageFaultErrorCode),
}

impl ErrorCodeDetail {
    /// Decode `raw` according to the error-word shape `vector` uses.
    ///
    /// Only invalid TSS, segment not present, stack fault and general
    /// protection carry a selector; the page fault word is a flag set.
    pub const fn for_vector(vector: u8, raw: u64) -> Self {
        match vector {
            EXCEPTION_INVALID_TSS
            | EXCEPTION_SEGMENT_NOT_PRES
            | EXCEPTION_STACK_FAULT
            | EXCEPTION_GENERAL_PROTECTION => Self::Selector(SelectorErrorCode::decode(raw)),
            EXCEPTION_PAGE_FAULT => {
                Self::PageFault(PageFaultErrorCode::from_bits_truncate(raw))
            }
            _ => Self::None,
        }
    }
}
