//! Ordered early boot.
//!
//! Steps run strictly in table order. Interrupts stay disabled until the
//! last step, so every table is written before anything can read it.

use core::fmt;

use dome_abi::{DescriptorError, IrqError};
use dome_drivers::{pic, pit, serial};
use dome_lib::{cpu, klog_debug, klog_info, InitFlag};

use crate::kernel_panic::kernel_panic;
use crate::{gdt, idt, limine_protocol};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BootStepError {
    Descriptor(DescriptorError),
    Irq(IrqError),
    Precondition(&'static str),
}

impl fmt::Display for BootStepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Descriptor(e) => write!(f, "descriptor: {}", e),
            Self::Irq(e) => write!(f, "irq: {}", e),
            Self::Precondition(what) => write!(f, "precondition: {}", what),
        }
    }
}

impl From<DescriptorError> for BootStepError {
    fn from(e: DescriptorError) -> Self {
        Self::Descriptor(e)
    }
}

impl From<IrqError> for BootStepError {
    fn from(e: IrqError) -> Self {
        Self::Irq(e)
    }
}

pub type BootStepResult = Result<(), BootStepError>;

pub struct BootInitStep {
    pub name: &'static str,
    pub func: fn() -> BootStepResult,
}

impl BootInitStep {
    pub const fn new(name: &'static str, func: fn() -> BootStepResult) -> Self {
        Self { name, func }
    }
}

fn boot_step_serial_init() -> BootStepResult {
    serial::init();
    Ok(())
}

fn boot_step_limine_protocol() -> BootStepResult {
    if !limine_protocol::base_revision_supported() {
        return Err(BootStepError::Precondition("Limine base revision not supported"));
    }
    Ok(())
}

fn boot_step_gdt() -> BootStepResult {
    gdt::gdt_init()?;
    Ok(())
}

fn boot_step_pic() -> BootStepResult {
    pic::pic_remap();
    Ok(())
}

fn boot_step_idt() -> BootStepResult {
    idt::idt_init()?;
    Ok(())
}

fn boot_step_pit() -> BootStepResult {
    pit::pit_init(pit::PIT_DEFAULT_FREQUENCY_HZ)?;
    Ok(())
}

fn boot_step_enable_interrupts() -> BootStepResult {
    if !gdt::gdt_is_loaded() || !idt::idt_is_loaded() {
        return Err(BootStepError::Precondition("descriptor tables not loaded"));
    }
    cpu::enable_interrupts();
    Ok(())
}

/// Boot order: diagnostics first, then GDT, PIC remap, IDT, handler
/// registration, and finally the global interrupt enable.
pub const BOOT_INIT_STEPS: [BootInitStep; 7] = [
    BootInitStep::new("serial", boot_step_serial_init),
    BootInitStep::new("limine", boot_step_limine_protocol),
    BootInitStep::new("gdt", boot_step_gdt),
    BootInitStep::new("pic", boot_step_pic),
    BootInitStep::new("idt", boot_step_idt),
    BootInitStep::new("pit", boot_step_pit),
    BootInitStep::new("interrupts", boot_step_enable_interrupts),
];

static BOOT_INITIALIZED: InitFlag = InitFlag::new();

/// Run every boot step in order. A failing step is fatal.
pub fn boot_init_run_all() {
    if !BOOT_INITIALIZED.init_once() {
        return;
    }
    for step in &BOOT_INIT_STEPS {
        klog_debug!("BOOT: step '{}'", step.name);
        if let Err(err) = (step.func)() {
            kernel_panic(format_args!("boot step '{}' failed: {}", step.name, err));
        }
    }
    klog_info!("BOOT: early init complete, interrupts enabled");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(name: &str) -> usize {
        BOOT_INIT_STEPS
            .iter()
            .position(|step| step.name == name)
            .unwrap()
    }

    #[test]
    fn tables_are_built_before_interrupts_are_enabled() {
        assert!(position("serial") < position("limine"));
        assert!(position("limine") < position("gdt"));
        assert!(position("gdt") < position("pic"));
        assert!(position("pic") < position("idt"));
        assert!(position("idt") < position("pit"));
        assert_eq!(position("interrupts"), BOOT_INIT_STEPS.len() - 1);
    }

    #[test]
    fn step_errors_describe_their_cause() {
        let err = BootStepError::from(IrqError::LineOutOfRange(16));
        assert_eq!(std::format!("{}", err), "irq: IRQ line 16 out of range (0-15)");
        let err = BootStepError::Precondition("no revision");
        assert_eq!(std::format!("{}", err), "precondition: no revision");
    }
}
