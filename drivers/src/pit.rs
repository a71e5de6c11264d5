use core::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use dome_abi::arch::{InterruptContext, Port};
use dome_abi::IrqResult;
use dome_lib::io::{self, Port as IoPort};
use dome_lib::{cpu, klog_debug, klog_info, klog_trace};

use crate::irq::{self, Irq, IrqHandler};

pub const PIT_BASE_FREQUENCY_HZ: u32 = 1_193_182;
pub const PIT_DEFAULT_FREQUENCY_HZ: u32 = 100;

const PIT_COMMAND_CHANNEL0: u8 = 0x00;
const PIT_COMMAND_ACCESS_LOHI: u8 = 0x30;
const PIT_COMMAND_MODE_SQUARE: u8 = 0x06;
const PIT_COMMAND_BINARY: u8 = 0x00;

static CURRENT_FREQUENCY_HZ: AtomicU32 = AtomicU32::new(0);
static TICKS: AtomicU64 = AtomicU64::new(0);

/// Reload value for `frequency_hz`, clamped to what channel 0 can count.
/// Zero selects the default rate.
pub fn pit_calculate_divisor(frequency_hz: u32) -> u16 {
    let frequency_hz = match frequency_hz {
        0 => PIT_DEFAULT_FREQUENCY_HZ,
        f => f.min(PIT_BASE_FREQUENCY_HZ),
    };
    (PIT_BASE_FREQUENCY_HZ / frequency_hz).clamp(1, 0xFFFF) as u16
}

pub fn pit_set_frequency(frequency_hz: u32) {
    let divisor = pit_calculate_divisor(frequency_hz);
    klog_trace!("PIT: divisor {} for {} Hz", divisor, frequency_hz);
    let command = IoPort::<u8>::at(Port::PIT_COMMAND);
    let channel0 = IoPort::<u8>::at(Port::PIT_CHANNEL0);

    // SAFETY: channel 0 is owned by this driver.
    unsafe {
        command.write(
            PIT_COMMAND_CHANNEL0
                | PIT_COMMAND_ACCESS_LOHI
                | PIT_COMMAND_MODE_SQUARE
                | PIT_COMMAND_BINARY,
        );
        channel0.write((divisor & 0xFF) as u8);
        channel0.write((divisor >> 8) as u8);
        io::io_wait();
    }

    let actual = PIT_BASE_FREQUENCY_HZ / divisor as u32;
    CURRENT_FREQUENCY_HZ.store(actual, Ordering::SeqCst);
    klog_debug!("PIT: frequency set to {} Hz", actual);
}

pub fn pit_get_frequency() -> u32 {
    match CURRENT_FREQUENCY_HZ.load(Ordering::SeqCst) {
        0 => PIT_DEFAULT_FREQUENCY_HZ,
        f => f,
    }
}

struct PitTick;

impl IrqHandler for PitTick {
    fn handle(&self, _ctx: &InterruptContext) {
        TICKS.fetch_add(1, Ordering::Relaxed);
    }
}

static PIT_TICK: PitTick = PitTick;

/// Program channel 0 and count its interrupts on IRQ 0.
pub fn pit_init(frequency_hz: u32) -> IrqResult<()> {
    klog_info!("PIT: initializing timer at {} Hz", pit_actual_frequency(frequency_hz));
    pit_set_frequency(frequency_hz);
    irq::irq_register_handler(Irq::Timer.line(), "pit", &PIT_TICK)
}

fn pit_actual_frequency(frequency_hz: u32) -> u32 {
    PIT_BASE_FREQUENCY_HZ / pit_calculate_divisor(frequency_hz) as u32
}

/// Timer interrupts serviced since boot.
pub fn pit_ticks() -> u64 {
    TICKS.load(Ordering::Relaxed)
}

/// Halt until at least `ms` milliseconds of ticks have passed.
/// Interrupts must be enabled.
pub fn pit_sleep_ms(ms: u32) {
    if ms == 0 {
        return;
    }
    let ticks_needed = ((ms as u64 * pit_get_frequency() as u64) / 1000).max(1);
    let target = pit_ticks().wrapping_add(ticks_needed);
    while pit_ticks() < target {
        cpu::hlt();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn divisor_clamps_to_channel_range() {
        assert_eq!(pit_calculate_divisor(0), 11931);
        assert_eq!(pit_calculate_divisor(100), 11931);
        assert_eq!(pit_calculate_divisor(1), 0xFFFF);
        assert_eq!(pit_calculate_divisor(u32::MAX), 1);
        assert_eq!(pit_actual_frequency(1000), 1000);
    }

    #[test]
    fn tick_handler_counts() {
        let before = pit_ticks();
        PIT_TICK.handle(&InterruptContext::for_vector(32, 0));
        assert_eq!(pit_ticks(), before + 1);
    }
}
