//! x86 I/O port addresses and the fixed 8259 PIC protocol constants.

/// x86 I/O port address.
///
/// Ports are accessed via IN/OUT instructions. This newtype groups all
/// known port addresses and prevents accidentally using other u16 values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Port(pub u16);

impl Port {
    // =========================================================================
    // Serial (8250/16550 UART)
    // =========================================================================

    /// COM1 serial port base address.
    pub const COM1: Self = Self(0x3F8);

    // =========================================================================
    // Programmable Interval Timer (8254 PIT)
    // =========================================================================

    /// PIT Channel 0 data port.
    pub const PIT_CHANNEL0: Self = Self(0x40);

    /// PIT Command/mode register port.
    pub const PIT_COMMAND: Self = Self(0x43);

    // =========================================================================
    // Legacy PIC (8259)
    // =========================================================================

    /// Master PIC command port.
    pub const PIC1_COMMAND: Self = Self(0x20);

    /// Master PIC data port.
    pub const PIC1_DATA: Self = Self(0x21);

    /// Slave PIC command port.
    pub const PIC2_COMMAND: Self = Self(0xA0);

    /// Slave PIC data port.
    pub const PIC2_DATA: Self = Self(0xA1);

    // =========================================================================
    // Debug Ports
    // =========================================================================

    /// POST diagnostic port, written to for short I/O delays.
    pub const POST_DELAY: Self = Self(0x80);

    /// Get the raw port number for IN/OUT instructions.
    #[inline]
    pub const fn number(self) -> u16 {
        self.0
    }

    /// Create an offset port (e.g., COM1 + register offset).
    #[inline]
    pub const fn offset(self, off: u16) -> Self {
        Self(self.0 + off)
    }
}

// =============================================================================
// 8259 PIC Protocol
// =============================================================================

/// ICW1: initialise, ICW4 follows, cascade mode, edge triggered.
pub const PIC_ICW1_INIT: u8 = 0x11;

/// ICW2 for the master: first vector of IRQ0-7.
pub const PIC1_VECTOR_OFFSET: u8 = 0x20;

/// ICW2 for the slave: first vector of IRQ8-15.
pub const PIC2_VECTOR_OFFSET: u8 = 0x28;

/// ICW3 for the master: slave attached on line 2 (bit mask).
pub const PIC1_CASCADE: u8 = 0x04;

/// ICW3 for the slave: its cascade identity (line number).
pub const PIC2_CASCADE: u8 = 0x02;

/// ICW4: 8086/88 mode.
pub const PIC_ICW4_8086: u8 = 0x01;

/// OCW2 non-specific End of Interrupt.
pub const PIC_EOI: u8 = 0x20;

/// Master line the slave is wired to.
pub const PIC_CASCADE_LINE: u8 = 2;

/// Lines served by each controller.
pub const PIC_LINES_PER_CHIP: u8 = 8;

/// Master mask leaving only the timer (IRQ0) and keyboard (IRQ1) enabled.
pub const PIC1_DEFAULT_MASK: u8 = 0xFC;

/// Slave mask with every line disabled.
pub const PIC2_DEFAULT_MASK: u8 = 0xFF;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::x86::idt::{IRQ_BASE_VECTOR, IRQ_SLAVE_BASE_VECTOR};

    #[test]
    fn vector_offsets_match_irq_base() {
        assert_eq!(PIC1_VECTOR_OFFSET, IRQ_BASE_VECTOR);
        assert_eq!(PIC2_VECTOR_OFFSET, IRQ_SLAVE_BASE_VECTOR);
        assert_eq!(PIC1_CASCADE, 1 << PIC_CASCADE_LINE);
    }
}
