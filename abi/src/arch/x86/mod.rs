//! x86 architecture definitions.
//!
//! Raw integer constants are wrapped in newtypes and bitflags to prevent
//! misuse:
//! - `SegmentSelector(u16)` for GDT selectors
//! - `Port(u16)` for I/O port addresses
//! - `SegmentAccess` / `SegmentFlags` for segment descriptor bits
//! - `PageFaultErrorCode` for the page-fault error word
//!
//! Two gate layouts exist. `Gate32` is the protected-mode layout (8 bytes,
//! target address split in two), `Gate64` the long-mode layout (16 bytes,
//! target address split in three plus a reserved trailing dword).
//! `NativeGate` names whichever one the build target uses.

pub mod context;
pub mod exception;
pub mod gdt;
pub mod idt;
pub mod ports;
pub mod table;

pub use context::InterruptContext;
pub use exception::{
    exception_name, has_error_code, ErrorCodeDetail, PageFaultErrorCode, SelectorErrorCode,
    SelectorTable,
};
pub use gdt::{SegmentAccess, SegmentDescriptor, SegmentFlags, SegmentSelector};
pub use idt::{Gate32, Gate64, GateType};
pub use ports::Port;
pub use table::{DescriptorTablePointer, DescriptorTablePointer32};

#[cfg(target_pointer_width = "64")]
pub type NativeGate = Gate64;

#[cfg(target_pointer_width = "32")]
pub type NativeGate = Gate32;
