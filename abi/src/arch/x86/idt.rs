//! Interrupt Descriptor Table (IDT) gate encoders and vector layout.
//!
//! Long-mode gate (16 bytes):
//!
//! ```text
//! bytes  0-1   target offset 15:0
//! bytes  2-3   code segment selector
//! byte   4     IST index (bits 0-2)
//! byte   5     type (0-3) | 0 (4) | DPL (5-6) | present (7)
//! bytes  6-7   target offset 31:16
//! bytes  8-11  target offset 63:32
//! bytes 12-15  reserved, zero
//! ```
//!
//! Protected-mode gate (8 bytes): offset 15:0, selector, a zero byte, the
//! same attribute byte, offset 31:16.

use crate::arch::x86::gdt::{SegmentSelector, PRIVILEGE_MAX};
use crate::error::{DescriptorError, DescriptorResult};

/// Base vector for hardware IRQs (IRQ0 maps to this vector).
pub const IRQ_BASE_VECTOR: u8 = 32;

/// Vector the slave controller's IRQ8 lands on.
pub const IRQ_SLAVE_BASE_VECTOR: u8 = IRQ_BASE_VECTOR + 8;

/// Number of CPU exception vectors (0-31).
pub const EXCEPTION_VECTORS: usize = 32;

/// Number of legacy PIC IRQ lines.
pub const IRQ_LINES: usize = 16;

/// Vectors that have a trap entry adapter: every exception and every IRQ.
pub const SUPPORTED_VECTORS: usize = EXCEPTION_VECTORS + IRQ_LINES;

/// Architectural IDT size.
pub const IDT_ENTRIES: usize = 256;

/// Largest interrupt stack table index (0 means "no IST switch").
pub const IST_MAX: u8 = 7;

const GATE_PRESENT: u8 = 1 << 7;
const GATE_DPL_SHIFT: u32 = 5;

/// Gate kind stored in the low nibble of the attribute byte.
///
/// The same nibble values name 32-bit gates in protected mode and 64-bit
/// gates in long mode.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GateType {
    /// Clears IF on entry; `iret` restores it.
    Interrupt = 0xE,
    /// Leaves IF untouched.
    Trap = 0xF,
}

impl GateType {
    pub const fn from_bits(bits: u8) -> DescriptorResult<Self> {
        match bits & 0xF {
            0xE => Ok(Self::Interrupt),
            0xF => Ok(Self::Trap),
            other => Err(DescriptorError::UnknownGateType(other)),
        }
    }

    pub const fn bits(self) -> u8 {
        self as u8
    }
}

const fn attributes(gate_type: GateType, dpl: u8, present: bool) -> DescriptorResult<u8> {
    if dpl > PRIVILEGE_MAX {
        return Err(DescriptorError::PrivilegeOutOfRange(dpl));
    }
    let present = if present { GATE_PRESENT } else { 0 };
    Ok(gate_type.bits() | (dpl << GATE_DPL_SHIFT) | present)
}

/// Long-mode interrupt/trap gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Gate64 {
    pub offset: u64,
    pub selector: SegmentSelector,
    pub ist: u8,
    pub gate_type: GateType,
    pub dpl: u8,
    pub present: bool,
}

/// Encoded long-mode gate.
pub type GateBytes64 = [u8; 16];

impl Gate64 {
    /// Ring 0 interrupt gate through the kernel code segment.
    pub const fn kernel_interrupt(offset: u64) -> Self {
        Self {
            offset,
            selector: SegmentSelector::KERNEL_CODE,
            ist: 0,
            gate_type: GateType::Interrupt,
            dpl: 0,
            present: true,
        }
    }

    pub const fn encode(&self) -> DescriptorResult<GateBytes64> {
        if self.ist > IST_MAX {
            return Err(DescriptorError::IstOutOfRange(self.ist));
        }
        let attr = match attributes(self.gate_type, self.dpl, self.present) {
            Ok(attr) => attr,
            Err(e) => return Err(e),
        };

        let offset = self.offset as u128;
        let raw = (offset & 0xFFFF)
            | ((self.selector.bits() as u128) << 16)
            | ((self.ist as u128) << 32)
            | ((attr as u128) << 40)
            | (((offset >> 16) & 0xFFFF) << 48)
            | (((offset >> 32) & 0xFFFF_FFFF) << 64);
        Ok(raw.to_le_bytes())
    }

    pub const fn decode(bytes: GateBytes64) -> DescriptorResult<Self> {
        let raw = u128::from_le_bytes(bytes);
        let attr = (raw >> 40) as u8;
        let gate_type = match GateType::from_bits(attr) {
            Ok(ty) => ty,
            Err(e) => return Err(e),
        };
        Ok(Self {
            offset: ((raw & 0xFFFF) | (((raw >> 48) & 0xFFFF) << 16) | (((raw >> 64) & 0xFFFF_FFFF) << 32))
                as u64,
            selector: SegmentSelector((raw >> 16) as u16),
            ist: (raw >> 32) as u8 & IST_MAX,
            gate_type,
            dpl: (attr >> GATE_DPL_SHIFT) & 0x3,
            present: attr & GATE_PRESENT != 0,
        })
    }

    /// Present bit of an encoded gate; an all-zero entry is absent.
    pub const fn is_present(bytes: &GateBytes64) -> bool {
        bytes[5] & GATE_PRESENT != 0
    }
}

/// Protected-mode interrupt/trap gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Gate32 {
    pub offset: u32,
    pub selector: SegmentSelector,
    pub gate_type: GateType,
    pub dpl: u8,
    pub present: bool,
}

/// Encoded protected-mode gate.
pub type GateBytes32 = [u8; 8];

impl Gate32 {
    pub const fn kernel_interrupt(offset: u32) -> Self {
        Self {
            offset,
            selector: SegmentSelector::KERNEL_CODE,
            gate_type: GateType::Interrupt,
            dpl: 0,
            present: true,
        }
    }

    pub const fn encode(&self) -> DescriptorResult<GateBytes32> {
        let attr = match attributes(self.gate_type, self.dpl, self.present) {
            Ok(attr) => attr,
            Err(e) => return Err(e),
        };
        let offset = self.offset as u64;
        let raw = (offset & 0xFFFF)
            | ((self.selector.bits() as u64) << 16)
            | ((attr as u64) << 40)
            | (((offset >> 16) & 0xFFFF) << 48);
        Ok(raw.to_le_bytes())
    }

    pub const fn decode(bytes: GateBytes32) -> DescriptorResult<Self> {
        let raw = u64::from_le_bytes(bytes);
        let attr = (raw >> 40) as u8;
        let gate_type = match GateType::from_bits(attr) {
            Ok(ty) => ty,
            Err(e) => return Err(e),
        };
        Ok(Self {
            offset: ((raw & 0xFFFF) | (((raw >> 48) & 0xFFFF) << 16)) as u32,
            selector: SegmentSelector((raw >> 16) as u16),
            gate_type,
            dpl: (attr >> GATE_DPL_SHIFT) & 0x3,
            present: attr & GATE_PRESENT != 0,
        })
    }

    pub const fn is_present(bytes: &GateBytes32) -> bool {
        bytes[5] & GATE_PRESENT != 0
    }
}

const _: () = assert!(core::mem::size_of::<GateBytes64>() == 16);
const _: () = assert!(core::mem::size_of::<GateBytes32>() == 8);
const _: () = assert!(core::mem::size_of::<[GateBytes64; IDT_ENTRIES]>() == 4096);
