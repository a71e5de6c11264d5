//! CPU exception reporting.
//!
//! Every exception is fatal. The handler starts in `Running`, writes one
//! report for the first exception it sees and moves to `Halted`, which it
//! never leaves. Stopping the CPU is left to the caller.

use core::fmt::{self, Write};

use spin::Mutex;

use dome_abi::arch::{exception_name, ErrorCodeDetail, InterruptContext};
use dome_lib::dump_interrupt_context;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaultState {
    Running,
    Halted,
}

pub struct FaultHandler {
    state: FaultState,
    vector: Option<u8>,
}

impl FaultHandler {
    pub const fn new() -> Self {
        Self {
            state: FaultState::Running,
            vector: None,
        }
    }

    pub fn state(&self) -> FaultState {
        self.state
    }

    /// Vector of the exception that halted the handler.
    pub fn fatal_vector(&self) -> Option<u8> {
        self.vector
    }

    /// Report `ctx` to `out` and move to `Halted`.
    ///
    /// `cr2` is the faulting linear address; it is printed for page faults
    /// only.
    pub fn handle(&mut self, ctx: &InterruptContext, cr2: u64, out: &mut dyn Write) -> FaultState {
        if self.state == FaultState::Halted {
            let _ = writeln!(
                out,
                "EXCEPTION: vector {} ({}) after halt",
                ctx.vector,
                exception_name(ctx.vector())
            );
            return self.state;
        }

        // Output errors cannot be reported anywhere; halt regardless.
        let _ = report(ctx, cr2, out);
        self.vector = Some(ctx.vector());
        self.state = FaultState::Halted;
        self.state
    }
}

impl Default for FaultHandler {
    fn default() -> Self {
        Self::new()
    }
}

fn report(ctx: &InterruptContext, cr2: u64, out: &mut dyn Write) -> fmt::Result {
    let vector = ctx.vector();
    out.write_str("\n=== CPU EXCEPTION ===\n")?;
    writeln!(out, "EXCEPTION: Vector {} ({})", vector, exception_name(vector))?;
    writeln!(out, "Error code: 0x{:x}", ctx.error_code)?;

    match ErrorCodeDetail::for_vector(vector, ctx.error_code) {
        ErrorCodeDetail::Selector(selector) => writeln!(
            out,
            "Selector: external={} table={} ({:?}) index={}",
            selector.external as u8,
            selector.table,
            selector.table_kind(),
            selector.index
        )?,
        ErrorCodeDetail::PageFault(flags) => {
            writeln!(out, "Faulting address: 0x{:016x}", cr2)?;
            writeln!(out, "Access: {:?}", flags)?;
        }
        ErrorCodeDetail::None => {}
    }

    dump_interrupt_context(ctx, out)?;
    out.write_str("System halted.\n")
}

pub static FAULT_HANDLER: Mutex<FaultHandler> = Mutex::new(FaultHandler::new());
