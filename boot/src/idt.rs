use core::arch::asm;
use core::mem::size_of;

use dome_abi::arch::idt::{
    GateBytes64, EXCEPTION_VECTORS, IDT_ENTRIES, IRQ_BASE_VECTOR, SUPPORTED_VECTORS,
};
use dome_abi::arch::{DescriptorTablePointer, Gate64};
use dome_abi::DescriptorResult;
use dome_drivers::pic;
use dome_lib::{klog_debug, klog_warn, InitFlag};

use crate::trap;

pub type IdtTable = [GateBytes64; IDT_ENTRIES];

pub const EMPTY_IDT: IdtTable = [[0; 16]; IDT_ENTRIES];

const _: () = assert!(size_of::<IdtTable>() == 4096);

#[repr(C, align(16))]
struct Idt(IdtTable);

static mut IDT: Idt = Idt(EMPTY_IDT);

static IDT_LOADED: InitFlag = InitFlag::new();

/// Point the exception gates, and the IRQ gates when `with_irqs` is set, at
/// `adapters`. Every other entry is cleared. Returns the number of gates
/// installed.
pub fn populate_idt(
    table: &mut IdtTable,
    adapters: &[u64; SUPPORTED_VECTORS],
    with_irqs: bool,
) -> DescriptorResult<usize> {
    let populated = if with_irqs {
        SUPPORTED_VECTORS
    } else {
        EXCEPTION_VECTORS
    };

    table.fill([0; 16]);
    for (gate, &adapter) in table.iter_mut().zip(adapters).take(populated) {
        *gate = Gate64::kernel_interrupt(adapter).encode()?;
    }
    Ok(populated)
}

/// Build the IDT from the trap adapters and load it. Runs once.
///
/// IRQ gates are only installed when the PIC has already been remapped;
/// before that, IRQ 0-7 would arrive on exception vectors.
pub fn idt_init() -> DescriptorResult<()> {
    if IDT_LOADED.is_set() {
        return Ok(());
    }

    let with_irqs = pic::pic_is_remapped();
    if !with_irqs {
        klog_warn!(
            "IDT: PIC not remapped, leaving vectors {}-{} absent",
            IRQ_BASE_VECTOR,
            SUPPORTED_VECTORS - 1
        );
    }

    // SAFETY: boot is single-threaded and interrupts are still disabled, so
    // nothing else can observe the table while it is rewritten.
    let table = unsafe { &mut (*(&raw mut IDT)).0 };
    let installed = populate_idt(table, &trap::trap_entry_addresses(), with_irqs)?;

    let pointer = DescriptorTablePointer::new((&raw const IDT) as u64, size_of::<IdtTable>())?;
    // SAFETY: the table is static and every present gate targets an adapter.
    unsafe { asm!("lidt [{}]", in(reg) &pointer, options(readonly, nostack, preserves_flags)) };

    IDT_LOADED.mark_set();
    klog_debug!("IDT: loaded {} gates", installed);
    Ok(())
}

pub fn idt_is_loaded() -> bool {
    IDT_LOADED.is_set()
}
