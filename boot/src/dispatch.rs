//! Single entry point for every trap.
//!
//! Vectors below 32 go to the fault handler and never come back; vectors
//! from 32 up go to the IRQ table and resume the interrupted code.

use dome_abi::arch::exception::EXCEPTION_PAGE_FAULT;
use dome_abi::arch::idt::EXCEPTION_VECTORS;
use dome_abi::arch::InterruptContext;
use dome_drivers::irq;
use dome_drivers::serial::SerialConsole;
use dome_lib::cpu;

use crate::fault::FAULT_HANDLER;
use crate::kernel_panic::kernel_panic_with_context;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Fault,
    Irq,
}

pub const fn route(vector: u8) -> Route {
    if (vector as usize) < EXCEPTION_VECTORS {
        Route::Fault
    } else {
        Route::Irq
    }
}

#[must_use]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Return to the interrupted code.
    Resume,
    /// Stop this CPU.
    Halt,
}

/// The two places a trap can be delivered to.
pub trait TrapTargets {
    /// Report a CPU exception. The CPU is halted afterwards regardless.
    fn fault(&mut self, ctx: &InterruptContext);
    fn irq(&mut self, ctx: &InterruptContext);
}

pub fn dispatch(ctx: &InterruptContext, targets: &mut dyn TrapTargets) -> DispatchOutcome {
    match route(ctx.vector()) {
        Route::Fault => {
            targets.fault(ctx);
            DispatchOutcome::Halt
        }
        Route::Irq => {
            targets.irq(ctx);
            DispatchOutcome::Resume
        }
    }
}

/// Global fault handler reporting to COM1, and the global IRQ table.
pub struct KernelTraps;

impl TrapTargets for KernelTraps {
    fn fault(&mut self, ctx: &InterruptContext) {
        // Held while the report is written; a fault raised meanwhile finds it taken.
        let Some(mut handler) = FAULT_HANDLER.try_lock() else {
            kernel_panic_with_context(format_args!("exception while reporting an exception"), ctx);
        };
        let cr2 = if ctx.vector() == EXCEPTION_PAGE_FAULT {
            cpu::read_cr2()
        } else {
            0
        };
        let _ = handler.handle(ctx, cr2, &mut SerialConsole);
    }

    fn irq(&mut self, ctx: &InterruptContext) {
        irq::irq_dispatch(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::{FaultHandler, FaultState};
    use crate::idt::{populate_idt, IdtTable, EMPTY_IDT};
    use dome_abi::arch::idt::{GateBytes64, IRQ_LINES, SUPPORTED_VECTORS};
    use dome_abi::arch::Gate64;
    use dome_drivers::irq::{IrqHandler, IrqTable};
    use dome_drivers::pic::{Pic8259, PicBus};
    use dome_abi::arch::Port;
    use spin::Mutex;
    use std::boxed::Box;
    use std::string::String;
    use std::vec::Vec;

    #[derive(Default)]
    struct Recording {
        faults: Vec<u8>,
        irqs: Vec<u8>,
    }

    impl TrapTargets for Recording {
        fn fault(&mut self, ctx: &InterruptContext) {
            self.faults.push(ctx.vector());
        }

        fn irq(&mut self, ctx: &InterruptContext) {
            self.irqs.push(ctx.vector());
        }
    }

    #[test]
    fn paths_never_cross() {
        for vector in 0..SUPPORTED_VECTORS as u8 {
            let mut targets = Recording::default();
            let outcome = dispatch(&InterruptContext::for_vector(vector, 0), &mut targets);
            if vector < 32 {
                assert_eq!(outcome, DispatchOutcome::Halt);
                assert_eq!(targets.faults, [vector]);
                assert!(targets.irqs.is_empty());
            } else {
                assert_eq!(outcome, DispatchOutcome::Resume);
                assert_eq!(targets.irqs, [vector]);
                assert!(targets.faults.is_empty());
            }
        }
    }

    /// Reports nothing and leaves its handler running.
    struct SilentFaults(FaultHandler);

    impl TrapTargets for SilentFaults {
        fn fault(&mut self, _ctx: &InterruptContext) {}

        fn irq(&mut self, _ctx: &InterruptContext) {}
    }

    #[test]
    fn faults_halt_even_when_the_target_keeps_running() {
        let mut targets = SilentFaults(FaultHandler::new());
        for vector in [0u8, 6, 13, 14, 31] {
            let outcome = dispatch(&InterruptContext::for_vector(vector, 0), &mut targets);
            assert_eq!(outcome, DispatchOutcome::Halt);
        }
        assert_eq!(targets.0.state(), FaultState::Running);
    }

    #[derive(Default)]
    struct Bus {
        writes: Vec<(u16, u8)>,
    }

    impl PicBus for Bus {
        fn write(&mut self, port: Port, value: u8) {
            self.writes.push((port.number(), value));
        }

        fn read(&mut self, _port: Port) -> u8 {
            0
        }
    }

    /// Fault handler and IRQ table wired like the kernel, with captured output.
    struct Harness {
        faults: FaultHandler,
        log: String,
        irqs: IrqTable,
        pic: Mutex<Pic8259<Bus>>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                faults: FaultHandler::new(),
                log: String::new(),
                irqs: IrqTable::new(),
                pic: Mutex::new(Pic8259::new(Bus::default())),
            }
        }
    }

    impl TrapTargets for Harness {
        fn fault(&mut self, ctx: &InterruptContext) {
            let _ = self.faults.handle(ctx, 0x1000, &mut self.log);
        }

        fn irq(&mut self, ctx: &InterruptContext) {
            self.irqs.dispatch(ctx, &self.pic);
        }
    }

    struct Count(Mutex<u32>);

    impl IrqHandler for Count {
        fn handle(&self, _ctx: &InterruptContext) {
            *self.0.lock() += 1;
        }
    }

    fn fake_adapters() -> [u64; SUPPORTED_VECTORS] {
        core::array::from_fn(|v| 0xFFFF_FFFF_8010_0000 + (v as u64) * 16)
    }

    fn adapter_vector(idt: &IdtTable, vector: usize) -> u8 {
        let gate = Gate64::decode(idt[vector]).unwrap();
        let adapters = fake_adapters();
        adapters.iter().position(|&a| a == gate.offset).unwrap() as u8
    }

    #[test]
    fn page_fault_through_the_idt_halts_with_a_report() {
        let mut idt: Box<IdtTable> = Box::new(EMPTY_IDT);
        populate_idt(&mut idt, &fake_adapters(), true).unwrap();

        let vector = adapter_vector(&idt, 14);
        assert_eq!(vector, 14);

        let mut harness = Harness::new();
        let mut ctx = InterruptContext::for_vector(vector, 0b11);
        ctx.rip = 0xFFFF_FFFF_8020_0000;
        ctx.cs = 0x08;

        assert_eq!(dispatch(&ctx, &mut harness), DispatchOutcome::Halt);
        assert_eq!(harness.faults.state(), FaultState::Halted);
        assert!(harness.log.contains("Page Fault"));
        assert!(harness.log.contains("EXCEPTION: Vector 14"));
        assert!(harness.pic.lock().bus().writes.is_empty());
    }

    #[test]
    fn irq_through_the_idt_resumes_and_acknowledges() {
        let mut idt: Box<IdtTable> = Box::new(EMPTY_IDT);
        populate_idt(&mut idt, &fake_adapters(), true).unwrap();

        let mut harness = Harness::new();
        let keyboard: &'static Count = Box::leak(Box::new(Count(Mutex::new(0))));
        harness.irqs.register(1, "keyboard", keyboard).unwrap();

        for line in 0..IRQ_LINES {
            let vector = adapter_vector(&idt, 32 + line);
            let outcome = dispatch(&InterruptContext::for_vector(vector, 0), &mut harness);
            assert_eq!(outcome, DispatchOutcome::Resume);
        }

        assert_eq!(*keyboard.0.lock(), 1);
        assert_eq!(harness.faults.state(), FaultState::Running);
        assert!(harness.log.is_empty());
        // 8 master-only EOIs and 8 slave-then-master EOIs.
        assert_eq!(harness.pic.lock().bus().writes.len(), 8 + 16);
    }

    #[test]
    fn unused_vectors_stay_absent() {
        let mut idt: Box<IdtTable> = Box::new(EMPTY_IDT);
        populate_idt(&mut idt, &fake_adapters(), true).unwrap();
        let empty: GateBytes64 = [0; 16];
        assert!(idt[SUPPORTED_VECTORS..].iter().all(|gate| *gate == empty));
    }
}
