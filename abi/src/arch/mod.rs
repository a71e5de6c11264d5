//! Architecture-specific definitions.
//!
//! The x86 encoders are plain integer arithmetic and are compiled on every
//! host so the 32-bit and 64-bit descriptor layouts can both be exercised
//! from unit tests.

pub mod x86;

pub use x86::*;

/// Base vector for hardware IRQs (IRQ0 maps to this vector).
pub use x86::idt::IRQ_BASE_VECTOR;
