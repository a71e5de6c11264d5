//! Global Descriptor Table (GDT) definitions.
//!
//! This module provides type-safe segment selectors and the segment
//! descriptor encoder. A segment descriptor is eight bytes:
//!
//! ```text
//!  63      56 55  52 51  48 47      40 39      16 15       0
//! +----------+------+------+----------+----------+----------+
//! | base hi  | flags| lim hi|  access  | base lo  | limit lo |
//! +----------+------+------+----------+----------+----------+
//! ```
//!
//! The access byte carries the descriptor privilege level in bits 5-6; it is
//! kept out of `SegmentAccess` and stored as a plain `dpl` so range errors can
//! be reported instead of silently truncated.

use bitflags::bitflags;

use crate::error::{DescriptorError, DescriptorResult};

/// x86 segment selector.
///
/// Layout (16 bits):
/// - Bits 0-1: Requested Privilege Level (RPL)
/// - Bit 2: Table Indicator (0 = GDT, 1 = LDT)
/// - Bits 3-15: Descriptor index
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct SegmentSelector(pub u16);

impl SegmentSelector {
    /// Null selector (index 0, GDT, RPL 0).
    pub const NULL: Self = Self(0);

    /// Kernel code segment (GDT index 1, RPL 0) = 0x08.
    pub const KERNEL_CODE: Self = Self::new(1, false, 0);

    /// Kernel data segment (GDT index 2, RPL 0) = 0x10.
    pub const KERNEL_DATA: Self = Self::new(2, false, 0);

    /// Create a new segment selector.
    ///
    /// # Arguments
    /// * `index` - Descriptor table index (0-8191)
    /// * `ldt` - Use LDT instead of GDT
    /// * `rpl` - Requested privilege level (0-3)
    #[inline]
    pub const fn new(index: u16, ldt: bool, rpl: u8) -> Self {
        let ti = if ldt { 1 << 2 } else { 0 };
        Self((index << 3) | ti | (rpl as u16 & 0x3))
    }

    /// Get the descriptor table index.
    #[inline]
    pub const fn index(self) -> u16 {
        self.0 >> 3
    }

    /// Check if this selector references the LDT.
    #[inline]
    pub const fn is_ldt(self) -> bool {
        self.0 & (1 << 2) != 0
    }

    /// Get the requested privilege level (0-3).
    #[inline]
    pub const fn rpl(self) -> u8 {
        (self.0 & 0x3) as u8
    }

    /// Get the raw selector value for loading into segment register.
    #[inline]
    pub const fn bits(self) -> u16 {
        self.0
    }
}

bitflags! {
    /// Access byte bits other than the privilege level.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct SegmentAccess: u8 {
        /// Set by the CPU on first use.
        const ACCESSED = 1 << 0;
        /// Code: readable. Data: writable.
        const READ_WRITE = 1 << 1;
        /// Code: conforming. Data: expands down.
        const DIRECTION_CONFORMING = 1 << 2;
        /// Code segment when set, data segment otherwise.
        const EXECUTABLE = 1 << 3;
        /// Code/data descriptor (clear for system descriptors).
        const CODE_DATA = 1 << 4;
        /// Segment is present in memory.
        const PRESENT = 1 << 7;
    }
}

bitflags! {
    /// Flags nibble (descriptor bits 52-55).
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct SegmentFlags: u8 {
        /// Available for system software.
        const AVAILABLE = 1 << 0;
        /// 64-bit code segment (L).
        const LONG_MODE = 1 << 1;
        /// 32-bit default operand size (D/B).
        const DEFAULT_SIZE = 1 << 2;
        /// Limit is counted in 4 KiB units (G).
        const GRANULARITY = 1 << 3;
    }
}

const DPL_SHIFT: u32 = 5;
const DPL_MASK: u8 = 0x3 << DPL_SHIFT;

/// Largest value the 20-bit limit field can hold.
pub const SEGMENT_LIMIT_MAX: u32 = 0xF_FFFF;

/// Highest privilege ring number.
pub const PRIVILEGE_MAX: u8 = 3;

/// Logical description of a code or data segment descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SegmentDescriptor {
    pub base: u32,
    /// Raw 20-bit limit; scaled by 4 KiB when `GRANULARITY` is set.
    pub limit: u32,
    pub access: SegmentAccess,
    pub dpl: u8,
    pub flags: SegmentFlags,
}

impl SegmentDescriptor {
    /// The mandatory all-zero first GDT entry.
    pub const NULL: Self = Self {
        base: 0,
        limit: 0,
        access: SegmentAccess::empty(),
        dpl: 0,
        flags: SegmentFlags::empty(),
    };

    /// Ring 0 long-mode code segment spanning the whole address space.
    pub const KERNEL_CODE_64: Self = Self::flat(
        SegmentAccess::PRESENT
            .union(SegmentAccess::CODE_DATA)
            .union(SegmentAccess::EXECUTABLE)
            .union(SegmentAccess::READ_WRITE),
        0,
        SegmentFlags::GRANULARITY.union(SegmentFlags::LONG_MODE),
    );

    /// Ring 0 protected-mode code segment spanning 4 GiB.
    pub const KERNEL_CODE_32: Self = Self::flat(
        SegmentAccess::PRESENT
            .union(SegmentAccess::CODE_DATA)
            .union(SegmentAccess::EXECUTABLE)
            .union(SegmentAccess::READ_WRITE),
        0,
        SegmentFlags::GRANULARITY.union(SegmentFlags::DEFAULT_SIZE),
    );

    /// Ring 0 writable data segment spanning 4 GiB.
    pub const KERNEL_DATA: Self = Self::flat(
        SegmentAccess::PRESENT
            .union(SegmentAccess::CODE_DATA)
            .union(SegmentAccess::READ_WRITE),
        0,
        SegmentFlags::GRANULARITY.union(SegmentFlags::DEFAULT_SIZE),
    );

    /// Flat segment: base 0, maximum limit.
    pub const fn flat(access: SegmentAccess, dpl: u8, flags: SegmentFlags) -> Self {
        Self {
            base: 0,
            limit: SEGMENT_LIMIT_MAX,
            access,
            dpl,
            flags,
        }
    }

    /// Pack into the raw 64-bit descriptor.
    pub const fn encode(&self) -> DescriptorResult<u64> {
        if self.dpl > PRIVILEGE_MAX {
            return Err(DescriptorError::PrivilegeOutOfRange(self.dpl));
        }
        if self.limit > SEGMENT_LIMIT_MAX {
            return Err(DescriptorError::LimitOutOfRange(self.limit));
        }

        let access = (self.access.bits() & !DPL_MASK) | (self.dpl << DPL_SHIFT);
        let base = self.base as u64;
        let limit = self.limit as u64;

        Ok((limit & 0xFFFF)
            | ((base & 0xFF_FFFF) << 16)
            | ((access as u64) << 40)
            | (((limit >> 16) & 0xF) << 48)
            | (((self.flags.bits() & 0xF) as u64) << 52)
            | (((base >> 24) & 0xFF) << 56))
    }

    /// Encode a descriptor that is part of a static table.
    ///
    /// Evaluated in `const` context, an invalid descriptor stops the build.
    pub const fn encode_static(&self) -> u64 {
        match self.encode() {
            Ok(raw) => raw,
            Err(_) => panic!("static segment descriptor does not encode"),
        }
    }

    /// Pack into the little-endian byte layout.
    pub const fn to_bytes(&self) -> DescriptorResult<[u8; 8]> {
        match self.encode() {
            Ok(raw) => Ok(raw.to_le_bytes()),
            Err(e) => Err(e),
        }
    }

    /// Unpack a raw 64-bit descriptor.
    pub const fn decode(raw: u64) -> Self {
        let access = (raw >> 40) as u8;
        Self {
            base: (((raw >> 16) & 0xFF_FFFF) | (((raw >> 56) & 0xFF) << 24)) as u32,
            limit: ((raw & 0xFFFF) | (((raw >> 48) & 0xF) << 16)) as u32,
            access: SegmentAccess::from_bits_retain(access & !DPL_MASK),
            dpl: (access & DPL_MASK) >> DPL_SHIFT,
            flags: SegmentFlags::from_bits_retain(((raw >> 52) & 0xF) as u8),
        }
    }

    /// Unpack from the little-endian byte layout.
    pub const fn from_bytes(bytes: [u8; 8]) -> Self {
        Self::decode(u64::from_le_bytes(bytes))
    }

    /// Highest valid byte offset inside the segment.
    pub const fn byte_limit(&self) -> u64 {
        if self.flags.contains(SegmentFlags::GRANULARITY) {
            ((self.limit as u64) << 12) | 0xFFF
        } else {
            self.limit as u64
        }
    }

    pub const fn is_code(&self) -> bool {
        self.access.contains(SegmentAccess::EXECUTABLE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_selector_values() {
        assert_eq!(SegmentSelector::NULL.bits(), 0x00);
        assert_eq!(SegmentSelector::KERNEL_CODE.bits(), 0x08);
        assert_eq!(SegmentSelector::KERNEL_DATA.bits(), 0x10);
    }

    #[test]
    fn segment_selector_decomposition() {
        let sel = SegmentSelector::new(5, true, 3);
        assert_eq!(sel.index(), 5);
        assert_eq!(sel.rpl(), 3);
        assert!(sel.is_ldt());
    }

    #[test]
    fn flat_kernel_segments_match_hardware_constants() {
        assert_eq!(SegmentDescriptor::NULL.encode(), Ok(0));
        assert_eq!(
            SegmentDescriptor::KERNEL_CODE_64.encode(),
            Ok(0x00AF_9A00_0000_FFFF)
        );
        assert_eq!(
            SegmentDescriptor::KERNEL_CODE_32.encode(),
            Ok(0x00CF_9A00_0000_FFFF)
        );
        assert_eq!(
            SegmentDescriptor::KERNEL_DATA.encode(),
            Ok(0x00CF_9200_0000_FFFF)
        );
    }

    #[test]
    fn flat_segment_covers_full_address_space() {
        assert_eq!(SegmentDescriptor::KERNEL_DATA.byte_limit(), 0xFFFF_FFFF);
    }

    #[test]
    fn decode_inverts_encode_across_field_ranges() {
        let bases = [0, 0x1234_5678, 0xFF00_00FF, u32::MAX];
        let limits = [0, 0x0_0FFF, 0xA_BCDE, SEGMENT_LIMIT_MAX];
        let accesses = [
            SegmentAccess::empty(),
            SegmentAccess::all(),
            SegmentAccess::PRESENT | SegmentAccess::CODE_DATA | SegmentAccess::READ_WRITE,
            SegmentAccess::PRESENT
                | SegmentAccess::CODE_DATA
                | SegmentAccess::EXECUTABLE
                | SegmentAccess::DIRECTION_CONFORMING,
        ];
        for &base in &bases {
            for &limit in &limits {
                for &access in &accesses {
                    for dpl in 0..=PRIVILEGE_MAX {
                        for flag_bits in 0..16u8 {
                            let desc = SegmentDescriptor {
                                base,
                                limit,
                                access,
                                dpl,
                                flags: SegmentFlags::from_bits_retain(flag_bits),
                            };
                            let raw = desc.encode().unwrap();
                            assert_eq!(SegmentDescriptor::decode(raw), desc);
                            let bytes = desc.to_bytes().unwrap();
                            assert_eq!(SegmentDescriptor::from_bytes(bytes), desc);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn out_of_range_fields_are_rejected() {
        let mut desc = SegmentDescriptor::KERNEL_DATA;
        desc.dpl = 4;
        assert_eq!(desc.encode(), Err(DescriptorError::PrivilegeOutOfRange(4)));

        let mut desc = SegmentDescriptor::KERNEL_DATA;
        desc.limit = SEGMENT_LIMIT_MAX + 1;
        assert_eq!(
            desc.encode(),
            Err(DescriptorError::LimitOutOfRange(0x10_0000))
        );
    }
}
