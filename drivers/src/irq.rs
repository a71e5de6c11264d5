//! Legacy IRQ dispatch.
//!
//! One optional handler per PIC line. Handlers are installed during early
//! boot, before interrupts are enabled, and only looked up afterwards.
//! `dispatch` always acknowledges the line at the PIC, whether or not a
//! handler ran.

use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use spin::{Mutex, RwLock};

use dome_abi::arch::idt::{IRQ_BASE_VECTOR, IRQ_LINES};
use dome_abi::arch::InterruptContext;
use dome_abi::{IrqError, IrqResult};
use dome_lib::{cpu, klog_debug, klog_info, klog_warn};

use crate::pic::{self, Pic8259, PicBus, PICS};

/// Work done for one IRQ line.
///
/// Runs with interrupts disabled on the interrupted stack. It must not
/// register or unregister handlers.
pub trait IrqHandler: Sync {
    fn handle(&self, ctx: &InterruptContext);
}

/// Adapts a plain function to [`IrqHandler`].
pub struct IrqFn(pub fn(&InterruptContext));

impl IrqHandler for IrqFn {
    fn handle(&self, ctx: &InterruptContext) {
        (self.0)(ctx)
    }
}

/// Well-known legacy lines.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Irq {
    Timer = 0,
    Keyboard = 1,
    Cascade = 2,
    Com2 = 3,
    Com1 = 4,
    Lpt2 = 5,
    Floppy = 6,
    Lpt1 = 7,
    Rtc = 8,
    Mouse = 12,
    Fpu = 13,
    PrimaryAta = 14,
    SecondaryAta = 15,
}

impl Irq {
    #[inline]
    pub const fn line(self) -> u8 {
        self as u8
    }

    #[inline]
    pub const fn vector(self) -> u8 {
        IRQ_BASE_VECTOR + self as u8
    }
}

struct IrqEntry {
    handler: Option<&'static dyn IrqHandler>,
    name: &'static str,
    count: AtomicU64,
    reported_unhandled: AtomicBool,
}

impl IrqEntry {
    const fn new() -> Self {
        Self {
            handler: None,
            name: "",
            count: AtomicU64::new(0),
            reported_unhandled: AtomicBool::new(false),
        }
    }
}

pub struct IrqTable {
    entries: [IrqEntry; IRQ_LINES],
}

impl IrqTable {
    pub const fn new() -> Self {
        Self {
            entries: [const { IrqEntry::new() }; IRQ_LINES],
        }
    }

    fn entry(&self, irq: u8) -> IrqResult<&IrqEntry> {
        self.entries
            .get(irq as usize)
            .ok_or(IrqError::LineOutOfRange(irq))
    }

    /// Install `handler` on `irq`, replacing any previous one.
    pub fn register(
        &mut self,
        irq: u8,
        name: &'static str,
        handler: &'static dyn IrqHandler,
    ) -> IrqResult<()> {
        let entry = self
            .entries
            .get_mut(irq as usize)
            .ok_or(IrqError::LineOutOfRange(irq))?;
        if entry.handler.is_some() {
            klog_warn!("IRQ: replacing handler '{}' on line {}", entry.name, irq);
        }
        entry.handler = Some(handler);
        entry.name = name;
        entry.reported_unhandled.store(false, Ordering::Relaxed);
        Ok(())
    }

    pub fn unregister(&mut self, irq: u8) -> IrqResult<()> {
        let entry = self
            .entries
            .get_mut(irq as usize)
            .ok_or(IrqError::LineOutOfRange(irq))?;
        entry.handler = None;
        entry.name = "";
        Ok(())
    }

    pub fn is_registered(&self, irq: u8) -> bool {
        self.entry(irq).is_ok_and(|entry| entry.handler.is_some())
    }

    pub fn handler_name(&self, irq: u8) -> Option<&'static str> {
        let entry = self.entry(irq).ok()?;
        entry.handler.map(|_| entry.name)
    }

    /// Number of times a handler ran on `irq`.
    pub fn count(&self, irq: u8) -> u64 {
        self.entry(irq)
            .map_or(0, |entry| entry.count.load(Ordering::Relaxed))
    }

    /// Run the handler for the line `ctx` arrived on, then send EOI.
    ///
    /// Vectors outside the IRQ range are ignored; they never reach here
    /// because no gate routes them.
    pub fn dispatch<B: PicBus>(&self, ctx: &InterruptContext, pic: &Mutex<Pic8259<B>>) {
        let Some(irq) = ctx.irq_line() else {
            klog_warn!("IRQ: vector {} is not a legacy IRQ", ctx.vector);
            return;
        };

        let entry = &self.entries[irq as usize];
        match entry.handler {
            Some(handler) => {
                entry.count.fetch_add(1, Ordering::Relaxed);
                handler.handle(ctx);
            }
            None => {
                if !entry.reported_unhandled.swap(true, Ordering::Relaxed) {
                    klog_info!("IRQ: unhandled line {}", irq);
                }
            }
        }

        pic.lock().end_of_interrupt(irq);
    }
}

impl Default for IrqTable {
    fn default() -> Self {
        Self::new()
    }
}

static IRQ_TABLE: RwLock<IrqTable> = RwLock::new(IrqTable::new());

fn warn_if_live(irq: u8) {
    if cpu::interrupts_enabled() {
        klog_warn!("IRQ: line {} changed with interrupts enabled", irq);
    }
}

/// Install `handler` on `irq` and unmask the line at the PIC.
pub fn irq_register_handler(
    irq: u8,
    name: &'static str,
    handler: &'static dyn IrqHandler,
) -> IrqResult<()> {
    warn_if_live(irq);
    cpu::without_interrupts(|| IRQ_TABLE.write().register(irq, name, handler))?;
    pic::pic_unmask_line(irq)?;
    klog_debug!("IRQ: registered '{}' on line {}", name, irq);
    Ok(())
}

pub fn irq_get_count(irq: u8) -> u64 {
    IRQ_TABLE.read().count(irq)
}

/// Entry point from the trap path for vectors 32-47.
pub fn irq_dispatch(ctx: &InterruptContext) {
    IRQ_TABLE.read().dispatch(ctx, &PICS);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pic::testing::{recording_pic, RecordingBus};
    use std::boxed::Box;
    use std::vec::Vec;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<InterruptContext>>,
    }

    impl IrqHandler for Recorder {
        fn handle(&self, ctx: &InterruptContext) {
            self.seen.lock().push(*ctx);
        }
    }

    fn recorder() -> &'static Recorder {
        Box::leak(Box::new(Recorder::default()))
    }

    fn pic() -> Mutex<Pic8259<RecordingBus>> {
        Mutex::new(recording_pic())
    }

    #[test]
    fn handler_runs_once_with_the_context() {
        let mut table = IrqTable::new();
        let handler = recorder();
        table.register(1, "keyboard", handler).unwrap();

        let pic = pic();
        let mut ctx = InterruptContext::for_vector(33, 0);
        ctx.rax = 0x1234;
        table.dispatch(&ctx, &pic);

        let seen = handler.seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], ctx);
        assert_eq!(table.count(1), 1);
        assert_eq!(pic.lock().bus().writes, [(0x20, 0x20)]);
    }

    #[test]
    fn only_the_matching_line_runs() {
        let mut table = IrqTable::new();
        let timer = recorder();
        let mouse = recorder();
        table.register(Irq::Timer.line(), "timer", timer).unwrap();
        table.register(Irq::Mouse.line(), "mouse", mouse).unwrap();

        let pic = pic();
        table.dispatch(&InterruptContext::for_vector(Irq::Mouse.vector(), 0), &pic);

        assert!(timer.seen.lock().is_empty());
        assert_eq!(mouse.seen.lock().len(), 1);
        assert_eq!(pic.lock().bus().writes, [(0xA0, 0x20), (0x20, 0x20)]);
    }

    #[test]
    fn unhandled_lines_are_still_acknowledged() {
        let table = IrqTable::new();
        for irq in 0..16u8 {
            let pic = pic();
            table.dispatch(&InterruptContext::for_vector(32 + irq, 0), &pic);
            let expected: &[(u16, u8)] = if irq < 8 {
                &[(0x20, 0x20)]
            } else {
                &[(0xA0, 0x20), (0x20, 0x20)]
            };
            assert_eq!(pic.lock().bus().writes, expected);
            assert_eq!(table.count(irq), 0);
        }
    }

    #[test]
    fn out_of_range_lines_are_rejected() {
        let mut table = IrqTable::new();
        assert_eq!(
            table.register(16, "bogus", recorder()),
            Err(IrqError::LineOutOfRange(16))
        );
        assert_eq!(table.unregister(255), Err(IrqError::LineOutOfRange(255)));
        assert!(!table.is_registered(16));
        assert_eq!(table.count(16), 0);
    }

    #[test]
    fn unregister_clears_the_line() {
        let mut table = IrqTable::new();
        let handler = recorder();
        table.register(4, "com1", handler).unwrap();
        assert_eq!(table.handler_name(4), Some("com1"));
        table.unregister(4).unwrap();
        assert!(!table.is_registered(4));
        assert_eq!(table.handler_name(4), None);

        let pic = pic();
        table.dispatch(&InterruptContext::for_vector(36, 0), &pic);
        assert!(handler.seen.lock().is_empty());
        assert_eq!(pic.lock().bus().writes, [(0x20, 0x20)]);
    }

    #[test]
    fn exception_vectors_are_not_acknowledged() {
        let table = IrqTable::new();
        let pic = pic();
        table.dispatch(&InterruptContext::for_vector(14, 0), &pic);
        assert!(pic.lock().bus().writes.is_empty());
    }

    static CONSOLE_WRITES: AtomicU64 = AtomicU64::new(0);
    static BYPASS_WRITES: AtomicU64 = AtomicU64::new(0);

    struct Tally(&'static AtomicU64);

    impl core::fmt::Write for Tally {
        fn write_str(&mut self, _s: &str) -> core::fmt::Result {
            self.0.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
    }

    static CONSOLE: Mutex<Tally> = Mutex::new(Tally(&CONSOLE_WRITES));

    fn console_sink(s: &str) {
        crate::serial::write_unblocked(
            CONSOLE.try_lock(),
            || Tally(&BYPASS_WRITES),
            format_args!("{}", s),
        );
    }

    #[test]
    fn unhandled_line_is_acknowledged_while_the_console_is_held() {
        dome_lib::klog_attach(console_sink);
        let table = IrqTable::new();
        let pic = pic();

        let held = CONSOLE.lock();
        table.dispatch(&InterruptContext::for_vector(Irq::Keyboard.vector(), 0), &pic);
        drop(held);

        assert!(BYPASS_WRITES.load(Ordering::Relaxed) > 0);
        assert_eq!(pic.lock().bus().writes, [(0x20, 0x20)]);
    }

    #[test]
    fn function_handlers_adapt() {
        static CALLS: AtomicU64 = AtomicU64::new(0);
        fn tick(_: &InterruptContext) {
            CALLS.fetch_add(1, Ordering::Relaxed);
        }
        static TICK: IrqFn = IrqFn(tick);

        let mut table = IrqTable::new();
        table.register(0, "tick", &TICK).unwrap();
        let pic = pic();
        table.dispatch(&InterruptContext::for_vector(32, 0), &pic);
        table.dispatch(&InterruptContext::for_vector(32, 0), &pic);
        assert_eq!(CALLS.load(Ordering::Relaxed), 2);
        assert_eq!(table.count(0), 2);
    }
}
