#![no_std]
#![no_main]
#![forbid(unsafe_op_in_unsafe_fn)]

use core::panic::PanicInfo;

use dome_boot as boot;
use dome_drivers::{pit, serial, serial_println};
use dome_lib::cpu;

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    serial::init();
    boot::kernel_panic(format_args!("{}", info))
}

#[unsafe(no_mangle)]
pub extern "C" fn _start() -> ! {
    boot::boot_init_run_all();

    serial_println!("DomeOS: interrupt core online.");
    pit::pit_sleep_ms(100);
    serial_println!("DomeOS: {} timer ticks, idling.", pit::pit_ticks());

    loop {
        cpu::hlt();
    }
}
