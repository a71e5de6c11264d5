//! Register dumps for diagnostic output.

use core::fmt::{self, Write};

use dome_abi::arch::{exception_name, InterruptContext};

const RFLAGS_BITS: [(u64, &str); 9] = [
    (1 << 0, "CF"),
    (1 << 2, "PF"),
    (1 << 4, "AF"),
    (1 << 6, "ZF"),
    (1 << 7, "SF"),
    (1 << 8, "TF"),
    (1 << 9, "IF"),
    (1 << 10, "DF"),
    (1 << 11, "OF"),
];

/// Write every register captured in `ctx` to `out`.
pub fn dump_interrupt_context(ctx: &InterruptContext, out: &mut dyn Write) -> fmt::Result {
    out.write_str("=== INTERRUPT FRAME DUMP ===\n")?;
    writeln!(
        out,
        "Vector: {} ({}) Error Code: 0x{:x}",
        ctx.vector,
        exception_name(ctx.vector()),
        ctx.error_code
    )?;
    writeln!(
        out,
        "RIP: 0x{:016x}  CS: 0x{:04x}  RFLAGS: 0x{:x}",
        ctx.rip, ctx.cs, ctx.rflags
    )?;
    writeln!(out, "RSP: 0x{:016x}  SS: 0x{:04x}", ctx.rsp, ctx.ss)?;
    writeln!(
        out,
        "RAX: 0x{:016x}  RBX: 0x{:016x}  RCX: 0x{:016x}",
        ctx.rax, ctx.rbx, ctx.rcx
    )?;
    writeln!(
        out,
        "RDX: 0x{:016x}  RSI: 0x{:016x}  RDI: 0x{:016x}",
        ctx.rdx, ctx.rsi, ctx.rdi
    )?;
    writeln!(
        out,
        "RBP: 0x{:016x}  R8 : 0x{:016x}  R9 : 0x{:016x}",
        ctx.rbp, ctx.r8, ctx.r9
    )?;
    writeln!(
        out,
        "R10: 0x{:016x}  R11: 0x{:016x}  R12: 0x{:016x}",
        ctx.r10, ctx.r11, ctx.r12
    )?;
    writeln!(
        out,
        "R13: 0x{:016x}  R14: 0x{:016x}  R15: 0x{:016x}",
        ctx.r13, ctx.r14, ctx.r15
    )?;

    out.write_str("Flags:")?;
    for (bit, name) in RFLAGS_BITS {
        if ctx.rflags & bit != 0 {
            out.write_char(' ')?;
            out.write_str(name)?;
        }
    }
    out.write_char('\n')?;
    out.write_str("=== END INTERRUPT FRAME DUMP ===\n")
}
