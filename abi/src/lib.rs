//! DomeOS hardware ABI types
//!
//! Canonical definitions for every structure whose layout is fixed by the
//! processor rather than by the kernel: segment and gate descriptors, the
//! descriptor-table pointer, the interrupt context pushed by the trap entry
//! adapters, and the error codes the CPU hands to fault handlers.
//!
//! Nothing in this crate touches hardware. Encoders are explicit shift/mask
//! functions over integers, so the byte layout never depends on how the
//! compiler arranges bit-fields.

#![no_std]
#![forbid(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod arch;
pub mod error;

pub use error::*;
