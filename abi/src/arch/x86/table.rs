//! Descriptor-table pointers, the operand of `lgdt` and `lidt`.

use crate::error::{DescriptorError, DescriptorResult};

/// Largest table a 16-bit limit can describe.
pub const MAX_TABLE_BYTES: usize = 1 << 16;

const fn table_limit(size: usize) -> DescriptorResult<u16> {
    if size == 0 || size > MAX_TABLE_BYTES {
        return Err(DescriptorError::TableSizeOutOfRange(size));
    }
    Ok((size - 1) as u16)
}

/// Long-mode table pointer: 16-bit byte limit followed by a 64-bit base.
#[repr(C, packed(2))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DescriptorTablePointer {
    /// Table size in bytes minus one.
    pub limit: u16,
    pub base: u64,
}

impl DescriptorTablePointer {
    /// Pointer for a table of `size` bytes starting at `base`.
    pub const fn new(base: u64, size: usize) -> DescriptorResult<Self> {
        match table_limit(size) {
            Ok(limit) => Ok(Self { limit, base }),
            Err(e) => Err(e),
        }
    }
}

/// Protected-mode table pointer: 16-bit byte limit followed by a 32-bit base.
#[repr(C, packed(2))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DescriptorTablePointer32 {
    pub limit: u16,
    pub base: u32,
}

impl DescriptorTablePointer32 {
    pub const fn new(base: u32, size: usize) -> DescriptorResult<Self> {
        match table_limit(size) {
            Ok(limit) => Ok(Self { limit, base }),
            Err(e) => Err(e),
        }
    }
}

const _: () = assert!(core::mem::size_of::<DescriptorTablePointer>() == 10);
const _: () = assert!(core::mem::size_of::<DescriptorTablePointer32>() == 6);
