#![no_std]
#![allow(unsafe_op_in_unsafe_fn)]

#[cfg(test)]
extern crate std;

pub mod cpu {
    use core::arch::asm;

    pub use x86_64::instructions::interrupts::without_interrupts;

    #[inline(always)]
    pub fn hlt() {
        unsafe {
            asm!("hlt", options(nomem, nostack, preserves_flags));
        }
    }

    #[inline(always)]
    pub fn enable_interrupts() {
        unsafe {
            asm!("sti", options(nomem, nostack));
        }
    }

    #[inline(always)]
    pub fn disable_interrupts() {
        unsafe {
            asm!("cli", options(nomem, nostack));
        }
    }

    /// IF flag of the current RFLAGS.
    #[inline(always)]
    pub fn interrupts_enabled() -> bool {
        x86_64::instructions::interrupts::are_enabled()
    }

    /// Stop this CPU for good: interrupts off, then `hlt` forever.
    #[inline(always)]
    pub fn halt_loop() -> ! {
        disable_interrupts();
        loop {
            hlt();
        }
    }

    /// Linear address that caused the most recent page fault.
    #[inline(always)]
    pub fn read_cr2() -> u64 {
        x86_64::registers::control::Cr2::read_raw()
    }

    #[inline(always)]
    pub fn read_cr0() -> u64 {
        x86_64::registers::control::Cr0::read_raw()
    }

    /// Page-table root and PCID bits.
    #[inline(always)]
    pub fn read_cr3() -> u64 {
        let (frame, flags) = x86_64::registers::control::Cr3::read_raw();
        frame.start_address().as_u64() | flags as u64
    }

    #[inline(always)]
    pub fn read_cr4() -> u64 {
        x86_64::registers::control::Cr4::read_raw()
    }
}

pub mod init_flag;
pub mod io;
pub mod kdiag;
pub mod klog;
pub mod spinlock;

pub use init_flag::{InitFlag, StateFlag};
pub use kdiag::dump_interrupt_context;
pub use klog::{klog_attach, klog_get_level, klog_set_level, KlogLevel, KlogSink};
pub use spinlock::IrqMutex;
