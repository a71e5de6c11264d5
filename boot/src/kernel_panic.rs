use core::fmt;

use dome_abi::arch::InterruptContext;
use dome_drivers::serial::{self, SerialConsole};
use dome_lib::{cpu, dump_interrupt_context, StateFlag};

static PANIC_IN_PROGRESS: StateFlag = StateFlag::new();

fn read_rsp() -> u64 {
    let rsp: u64;
    unsafe {
        core::arch::asm!("mov {}, rsp", out(reg) rsp, options(nomem, nostack, preserves_flags));
    }
    rsp
}

fn banner(message: fmt::Arguments<'_>) {
    serial::emergency_write(format_args!("\n\n=== KERNEL PANIC ===\nPANIC: {}\n", message));
}

/// Report `message` with a register snapshot and stop the machine.
pub fn kernel_panic(message: fmt::Arguments<'_>) -> ! {
    cpu::disable_interrupts();
    if !PANIC_IN_PROGRESS.enter() {
        cpu::halt_loop();
    }

    banner(message);
    serial::emergency_write(format_args!(
        "Register snapshot:\nRSP: 0x{:x}\nCR0: 0x{:x}\nCR2: 0x{:x}\nCR3: 0x{:x}\nCR4: 0x{:x}\n",
        read_rsp(),
        cpu::read_cr0(),
        cpu::read_cr2(),
        cpu::read_cr3(),
        cpu::read_cr4(),
    ));
    serial::emergency_write(format_args!("===================\nSystem halted.\n"));
    cpu::halt_loop()
}

/// Like [`kernel_panic`], with the interrupt frame that was being handled.
pub fn kernel_panic_with_context(message: fmt::Arguments<'_>, ctx: &InterruptContext) -> ! {
    cpu::disable_interrupts();
    if !PANIC_IN_PROGRESS.enter() {
        cpu::halt_loop();
    }

    banner(message);
    let _ = dump_interrupt_context(ctx, &mut SerialConsole);
    serial::emergency_write(format_args!("===================\nSystem halted.\n"));
    cpu::halt_loop()
}
