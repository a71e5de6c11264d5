#![no_std]
#![forbid(unsafe_op_in_unsafe_fn)]

#[cfg(test)]
extern crate std;

pub mod dispatch;
pub mod early_init;
pub mod fault;
pub mod gdt;
pub mod idt;
pub mod kernel_panic;
pub mod limine_protocol;
pub mod trap;

pub use dispatch::{dispatch, DispatchOutcome, Route, TrapTargets};
pub use early_init::boot_init_run_all;
pub use fault::{FaultHandler, FaultState};
pub use kernel_panic::{kernel_panic, kernel_panic_with_context};
