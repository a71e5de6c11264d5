//! COM1 console.
//!
//! Polled 16550 output at 115200 8N1. It is the diagnostic sink for the
//! kernel log and for fault reports.

use core::fmt::{self, Write};
use core::ops::DerefMut;

use dome_abi::arch::Port;
use dome_lib::io::Port as IoPort;
use dome_lib::{klog_attach, InitFlag, IrqMutex};

// Register offsets from the port base.
const REG_DATA: u16 = 0;
const REG_IER: u16 = 1;
const REG_FCR: u16 = 2;
const REG_LCR: u16 = 3;
const REG_MCR: u16 = 4;
const REG_LSR: u16 = 5;

const LCR_DLAB: u8 = 0x80;
const LCR_8N1: u8 = 0x03;
const FCR_ENABLE_CLEAR_14: u8 = 0xC7;
const MCR_DTR_RTS_OUT2: u8 = 0x0B;
const LSR_TX_EMPTY: u8 = 0x20;

/// Divisor 1 of the 1.8432 MHz reference clock.
const BAUD_DIVISOR: u16 = 1;

struct SerialPort {
    base: Port,
}

impl SerialPort {
    const fn new(base: Port) -> Self {
        Self { base }
    }

    const fn com1() -> Self {
        Self::new(Port::COM1)
    }

    fn reg(&self, offset: u16) -> IoPort<u8> {
        IoPort::at(self.base.offset(offset))
    }

    /// # Safety
    /// The caller owns the UART at `base`.
    unsafe fn init(&mut self) {
        unsafe {
            self.reg(REG_IER).write(0x00);
            self.reg(REG_LCR).write(LCR_DLAB);
            self.reg(REG_DATA).write(BAUD_DIVISOR as u8);
            self.reg(REG_IER).write((BAUD_DIVISOR >> 8) as u8);
            self.reg(REG_LCR).write(LCR_8N1);
            self.reg(REG_FCR).write(FCR_ENABLE_CLEAR_14);
            self.reg(REG_MCR).write(MCR_DTR_RTS_OUT2);
        }
    }

    fn write_byte(&mut self, byte: u8) {
        // SAFETY: the port is only reachable through `SERIAL` or `emergency_write`.
        unsafe {
            while self.reg(REG_LSR).read() & LSR_TX_EMPTY == 0 {
                core::hint::spin_loop();
            }
            self.reg(REG_DATA).write(byte);
        }
    }
}

impl Write for SerialPort {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for b in s.bytes() {
            if b == b'\n' {
                self.write_byte(b'\r');
            }
            self.write_byte(b);
        }
        Ok(())
    }
}

// Interrupts stay off while the port is held, so an IRQ handler that prints
// cannot land on top of a half-written line on this CPU.
static SERIAL: IrqMutex<SerialPort> = IrqMutex::new(SerialPort::com1());
static SERIAL_READY: InitFlag = InitFlag::new();

/// Program COM1 and make it the kernel log sink. Idempotent.
pub fn init() {
    if !SERIAL_READY.init_once() {
        return;
    }
    // SAFETY: first and only initialisation of COM1.
    unsafe { SERIAL.lock().init() };
    klog_attach(klog_sink);
}

/// Log sink. Never waits on the port lock: the kernel log is written from
/// IRQ and fault paths that may have interrupted the lock holder.
fn klog_sink(s: &str) {
    write_unblocked(SERIAL.try_lock(), SerialPort::com1, format_args!("{}", s));
}

/// Write through `guard` when the lock was free, otherwise straight to a
/// port built by `bypass`.
pub(crate) fn write_unblocked<W, G>(
    guard: Option<G>,
    bypass: impl FnOnce() -> W,
    args: fmt::Arguments<'_>,
) where
    W: Write,
    G: DerefMut<Target = W>,
{
    match guard {
        Some(mut port) => {
            let _ = port.write_fmt(args);
        }
        None => {
            let _ = bypass().write_fmt(args);
        }
    }
}

pub fn write_line(s: &str) {
    let mut guard = SERIAL.lock();
    let _ = guard.write_str(s);
    let _ = guard.write_str("\n");
}

pub fn print_args(args: fmt::Arguments<'_>) {
    let _ = SERIAL.lock().write_fmt(args);
}

/// Write without waiting for the port lock.
///
/// For the panic and fault paths, where the interrupted code may hold it.
pub fn emergency_write(args: fmt::Arguments<'_>) {
    write_unblocked(SERIAL.try_lock(), SerialPort::com1, args);
}

/// `fmt::Write` handle on COM1 for code that reports through a writer.
pub struct SerialConsole;

impl Write for SerialConsole {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        emergency_write(format_args!("{}", s));
        Ok(())
    }
}

#[macro_export]
macro_rules! serial_println {
    () => {
        $crate::serial::write_line("");
    };
    ($fmt:expr) => {
        $crate::serial::write_line($fmt);
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::serial::print_args(core::format_args!(concat!($fmt, "\n"), $($arg)*));
    };
}
