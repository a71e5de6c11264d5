#![no_std]
#![forbid(unsafe_op_in_unsafe_fn)]

#[cfg(test)]
extern crate std;

pub mod irq;
pub mod pic;
pub mod pit;
pub mod serial;
