//! Legacy 8259 PIC pair.
//!
//! The master serves IRQ 0-7, the slave IRQ 8-15 through the master's line 2.
//! `remap` moves both off the CPU exception range (master to vector 32, slave
//! to vector 40). Every serviced IRQ must be acknowledged with an EOI or the
//! controller never raises that line again.

use spin::Mutex;

use dome_abi::arch::ports::{
    PIC1_CASCADE, PIC1_DEFAULT_MASK, PIC1_VECTOR_OFFSET, PIC2_CASCADE, PIC2_DEFAULT_MASK,
    PIC2_VECTOR_OFFSET, PIC_CASCADE_LINE, PIC_EOI, PIC_ICW1_INIT, PIC_ICW4_8086,
    PIC_LINES_PER_CHIP,
};
use dome_abi::arch::{idt::IRQ_LINES, Port};
use dome_abi::{IrqError, IrqResult};
use dome_lib::io::{self, Port as IoPort};
use dome_lib::{cpu, klog_debug, InitFlag};

/// Byte-wide access to the controller ports.
pub trait PicBus {
    fn write(&mut self, port: Port, value: u8);
    fn read(&mut self, port: Port) -> u8;
    /// Pause between initialisation words.
    fn delay(&mut self) {}
}

/// The real I/O ports.
pub struct PortBus {
    _private: (),
}

impl PortBus {
    /// # Safety
    /// Only one owner of the PIC ports may exist; the caller must hold it.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl PicBus for PortBus {
    #[inline]
    fn write(&mut self, port: Port, value: u8) {
        // SAFETY: a `PortBus` is only built for the singleton below.
        unsafe { IoPort::<u8>::at(port).write(value) }
    }

    #[inline]
    fn read(&mut self, port: Port) -> u8 {
        // SAFETY: see `write`.
        unsafe { IoPort::<u8>::at(port).read() }
    }

    #[inline]
    fn delay(&mut self) {
        unsafe { io::io_wait() }
    }
}

/// Interrupt mask registers of both chips; a set bit disables the line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PicMasks {
    pub master: u8,
    pub slave: u8,
}

impl PicMasks {
    /// Timer and keyboard enabled, everything else masked.
    pub const DEFAULT: Self = Self {
        master: PIC1_DEFAULT_MASK,
        slave: PIC2_DEFAULT_MASK,
    };

    pub const ALL_MASKED: Self = Self {
        master: 0xFF,
        slave: 0xFF,
    };

    pub const fn is_masked(&self, irq: u8) -> bool {
        if irq < PIC_LINES_PER_CHIP {
            self.master & (1 << irq) != 0
        } else {
            self.slave & (1 << (irq - PIC_LINES_PER_CHIP)) != 0
        }
    }
}

pub struct Pic8259<B: PicBus> {
    bus: B,
    masks: PicMasks,
    remapped: bool,
}

impl<B: PicBus> Pic8259<B> {
    pub const fn new(bus: B) -> Self {
        Self {
            bus,
            masks: PicMasks::ALL_MASKED,
            remapped: false,
        }
    }

    /// Run the four-word initialisation on both chips, then apply `masks`.
    pub fn remap(&mut self, masks: PicMasks) {
        let steps = [
            (Port::PIC1_COMMAND, Port::PIC2_COMMAND, PIC_ICW1_INIT, PIC_ICW1_INIT),
            (Port::PIC1_DATA, Port::PIC2_DATA, PIC1_VECTOR_OFFSET, PIC2_VECTOR_OFFSET),
            (Port::PIC1_DATA, Port::PIC2_DATA, PIC1_CASCADE, PIC2_CASCADE),
            (Port::PIC1_DATA, Port::PIC2_DATA, PIC_ICW4_8086, PIC_ICW4_8086),
        ];
        for (master_port, slave_port, master_word, slave_word) in steps {
            self.bus.write(master_port, master_word);
            self.bus.delay();
            self.bus.write(slave_port, slave_word);
            self.bus.delay();
        }

        self.set_masks(masks);
        self.remapped = true;
    }

    /// Acknowledge `irq`: slave first when it came through the cascade,
    /// master always.
    pub fn end_of_interrupt(&mut self, irq: u8) {
        if irq >= PIC_LINES_PER_CHIP {
            self.bus.write(Port::PIC2_COMMAND, PIC_EOI);
        }
        self.bus.write(Port::PIC1_COMMAND, PIC_EOI);
    }

    pub fn set_masks(&mut self, masks: PicMasks) {
        self.bus.write(Port::PIC1_DATA, masks.master);
        self.bus.write(Port::PIC2_DATA, masks.slave);
        self.masks = masks;
    }

    pub fn masks(&self) -> PicMasks {
        self.masks
    }

    /// Read the mask registers back from the hardware.
    pub fn read_masks(&mut self) -> PicMasks {
        PicMasks {
            master: self.bus.read(Port::PIC1_DATA),
            slave: self.bus.read(Port::PIC2_DATA),
        }
    }

    pub fn mask_line(&mut self, irq: u8) -> IrqResult<()> {
        check_line(irq)?;
        let mut masks = self.masks;
        if irq < PIC_LINES_PER_CHIP {
            masks.master |= 1 << irq;
        } else {
            masks.slave |= 1 << (irq - PIC_LINES_PER_CHIP);
        }
        self.set_masks(masks);
        Ok(())
    }

    /// Enable `irq`; a slave line also opens the cascade line on the master.
    pub fn unmask_line(&mut self, irq: u8) -> IrqResult<()> {
        check_line(irq)?;
        let mut masks = self.masks;
        if irq < PIC_LINES_PER_CHIP {
            masks.master &= !(1 << irq);
        } else {
            masks.slave &= !(1 << (irq - PIC_LINES_PER_CHIP));
            masks.master &= !(1 << PIC_CASCADE_LINE);
        }
        self.set_masks(masks);
        Ok(())
    }

    /// Mask every line on both chips.
    pub fn disable(&mut self) {
        self.set_masks(PicMasks::ALL_MASKED);
    }

    pub fn is_remapped(&self) -> bool {
        self.remapped
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }
}

fn check_line(irq: u8) -> IrqResult<()> {
    if irq as usize >= IRQ_LINES {
        return Err(IrqError::LineOutOfRange(irq));
    }
    Ok(())
}

// SAFETY: this is the only `PortBus` in the kernel.
pub static PICS: Mutex<Pic8259<PortBus>> = Mutex::new(Pic8259::new(unsafe { PortBus::new() }));

static PIC_REMAPPED: InitFlag = InitFlag::new();

/// Remap both controllers and apply the default masks.
pub fn pic_remap() {
    cpu::without_interrupts(|| PICS.lock().remap(PicMasks::DEFAULT));
    PIC_REMAPPED.mark_set();
    klog_debug!(
        "PIC: remapped to vectors 0x{:x}/0x{:x}, masks {:?}",
        PIC1_VECTOR_OFFSET,
        PIC2_VECTOR_OFFSET,
        PicMasks::DEFAULT
    );
}

pub fn pic_is_remapped() -> bool {
    PIC_REMAPPED.is_set()
}

pub fn pic_unmask_line(irq: u8) -> IrqResult<()> {
    cpu::without_interrupts(|| PICS.lock().unmask_line(irq))
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::vec::Vec;

    /// Records every port write in order.
    #[derive(Default)]
    pub struct RecordingBus {
        pub writes: Vec<(u16, u8)>,
    }

    impl PicBus for RecordingBus {
        fn write(&mut self, port: Port, value: u8) {
            self.writes.push((port.number(), value));
        }

        fn read(&mut self, port: Port) -> u8 {
            self.writes
                .iter()
                .rev()
                .find(|(p, _)| *p == port.number())
                .map(|&(_, v)| v)
                .unwrap_or(0)
        }
    }

    pub fn recording_pic() -> Pic8259<RecordingBus> {
        Pic8259::new(RecordingBus::default())
    }
}

#[cfg(test)]
mod tests {
    use super::testing::recording_pic;
    use super::*;

    #[test]
    fn remap_emits_documented_sequence() {
        let mut pic = recording_pic();
        pic.remap(PicMasks::DEFAULT);

        assert_eq!(
            pic.bus().writes,
            [
                (0x20, 0x11),
                (0xA0, 0x11),
                (0x21, 0x20),
                (0xA1, 0x28),
                (0x21, 0x04),
                (0xA1, 0x02),
                (0x21, 0x01),
                (0xA1, 0x01),
                (0x21, 0xFC),
                (0xA1, 0xFF),
            ]
        );
        assert!(pic.is_remapped());
        assert_eq!(pic.masks(), PicMasks::DEFAULT);
    }

    #[test]
    fn master_line_eoi_goes_to_master_only() {
        for irq in 0..8 {
            let mut pic = recording_pic();
            pic.end_of_interrupt(irq);
            assert_eq!(pic.bus().writes, [(0x20, 0x20)]);
        }
    }

    #[test]
    fn slave_line_eoi_goes_to_slave_then_master() {
        for irq in 8..16 {
            let mut pic = recording_pic();
            pic.end_of_interrupt(irq);
            assert_eq!(pic.bus().writes, [(0xA0, 0x20), (0x20, 0x20)]);
        }
    }

    #[test]
    fn unmasking_a_slave_line_opens_the_cascade() {
        let mut pic = recording_pic();
        pic.remap(PicMasks::ALL_MASKED);
        pic.unmask_line(12).unwrap();

        let masks = pic.masks();
        assert!(!masks.is_masked(12));
        assert!(!masks.is_masked(2));
        assert!(masks.is_masked(0));
        assert_eq!(pic.read_masks(), masks);

        pic.mask_line(12).unwrap();
        assert!(pic.masks().is_masked(12));
    }

    #[test]
    fn mask_changes_reject_unknown_lines() {
        let mut pic = recording_pic();
        assert_eq!(pic.mask_line(16), Err(IrqError::LineOutOfRange(16)));
        assert_eq!(pic.unmask_line(200), Err(IrqError::LineOutOfRange(200)));
        assert!(pic.bus().writes.is_empty());
    }

    #[test]
    fn default_masks_enable_timer_and_keyboard() {
        let masks = PicMasks::DEFAULT;
        assert!(!masks.is_masked(0));
        assert!(!masks.is_masked(1));
        for irq in 2..16 {
            assert!(masks.is_masked(irq));
        }
    }
}
