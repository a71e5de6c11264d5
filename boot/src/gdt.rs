use core::arch::asm;
use core::mem::size_of;

use dome_abi::arch::{DescriptorTablePointer, SegmentDescriptor, SegmentSelector};
use dome_abi::DescriptorResult;
use dome_lib::{klog_debug, InitFlag};

pub const GDT_ENTRIES: usize = 3;

pub type GdtTable = [u64; GDT_ENTRIES];

/// Null, flat ring 0 code, flat ring 0 data, in selector order.
pub const fn build_gdt() -> GdtTable {
    [
        SegmentDescriptor::NULL.encode_static(),
        SegmentDescriptor::KERNEL_CODE_64.encode_static(),
        SegmentDescriptor::KERNEL_DATA.encode_static(),
    ]
}

const _: () = assert!(size_of::<GdtTable>() == GDT_ENTRIES * 8);
const _: () = assert!(SegmentSelector::KERNEL_CODE.index() == 1);
const _: () = assert!(SegmentSelector::KERNEL_DATA.index() == 2);

// Writable: the CPU sets the accessed bit when a selector is loaded.
static mut GDT_TABLE: GdtTable = build_gdt();

static GDT_LOADED: InitFlag = InitFlag::new();

unsafe fn load_gdt(pointer: &DescriptorTablePointer) {
    unsafe { asm!("lgdt [{0}]", in(reg) pointer, options(readonly, nostack, preserves_flags)) };

    // Far return into the new code segment, then reload every data segment.
    unsafe {
        asm!(
            "pushq ${code}",
            "lea 2f(%rip), %rax",
            "pushq %rax",
            "lretq",
            "2:",
            "movw ${data}, %ax",
            "movw %ax, %ds",
            "movw %ax, %es",
            "movw %ax, %ss",
            "movw %ax, %fs",
            "movw %ax, %gs",
            code = const SegmentSelector::KERNEL_CODE.bits() as usize,
            data = const SegmentSelector::KERNEL_DATA.bits() as usize,
            out("rax") _,
            options(att_syntax)
        );
    }
}

/// Install the kernel GDT. Runs once; later calls are ignored.
pub fn gdt_init() -> DescriptorResult<()> {
    if GDT_LOADED.is_set() {
        return Ok(());
    }
    klog_debug!("GDT: loading {} descriptors", GDT_ENTRIES);

    let pointer = DescriptorTablePointer::new(
        (&raw const GDT_TABLE) as u64,
        size_of::<GdtTable>(),
    )?;
    // SAFETY: the table lives for the whole kernel lifetime and holds valid
    // code and data descriptors at the selectors loaded below.
    unsafe { load_gdt(&pointer) };

    klog_debug!(
        "GDT: loaded, code=0x{:x} data=0x{:x}",
        SegmentSelector::KERNEL_CODE.bits(),
        SegmentSelector::KERNEL_DATA.bits()
    );
    GDT_LOADED.mark_set();
    Ok(())
}

pub fn gdt_is_loaded() -> bool {
    GDT_LOADED.is_set()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dome_abi::arch::{SegmentAccess, SegmentFlags};

    #[test]
    fn table_holds_null_code_data() {
        let table = build_gdt();
        assert_eq!(table[0], 0);
        assert_eq!(table[1], 0x00AF_9A00_0000_FFFF);
        assert_eq!(table[2], 0x00CF_9200_0000_FFFF);
    }

    #[test]
    fn flat_segments_cover_the_address_space() {
        for raw in &build_gdt()[1..] {
            let desc = SegmentDescriptor::decode(*raw);
            assert_eq!(desc.base, 0);
            assert_eq!(desc.byte_limit(), 0xFFFF_FFFF);
            assert_eq!(desc.dpl, 0);
            assert!(desc.access.contains(SegmentAccess::PRESENT));
            assert!(desc.flags.contains(SegmentFlags::GRANULARITY));
        }
        assert!(SegmentDescriptor::decode(build_gdt()[1]).is_code());
        assert!(!SegmentDescriptor::decode(build_gdt()[2]).is_code());
    }

    #[test]
    fn pointer_limit_is_table_size_minus_one() {
        let pointer = DescriptorTablePointer::new(0x1000, size_of::<GdtTable>()).unwrap();
        let limit = pointer.limit;
        assert_eq!(limit, 23);
    }
}
