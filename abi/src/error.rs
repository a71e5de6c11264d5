//! Configuration error types.
//!
//! These describe programmer mistakes caught before anything reaches the
//! hardware: a descriptor field outside its encodable range, or an IRQ line
//! the controller does not have. CPU faults are never reported through these
//! types; they are terminal and handled by the fault path.

use core::fmt;

/// Result type for descriptor encoding.
pub type DescriptorResult<T> = Result<T, DescriptorError>;

/// A descriptor field that cannot be represented in the hardware layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorError {
    /// Descriptor privilege level above ring 3.
    PrivilegeOutOfRange(u8),
    /// Segment limit wider than the 20-bit limit field.
    LimitOutOfRange(u32),
    /// Interrupt stack table index above 7.
    IstOutOfRange(u8),
    /// Gate type nibble that is neither an interrupt nor a trap gate.
    UnknownGateType(u8),
    /// Table byte size outside what a 16-bit limit can describe (1-65536).
    TableSizeOutOfRange(usize),
}

impl fmt::Display for DescriptorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::PrivilegeOutOfRange(dpl) => {
                write!(f, "privilege level {} out of range (0-3)", dpl)
            }
            Self::LimitOutOfRange(limit) => {
                write!(f, "segment limit 0x{:x} exceeds 20 bits", limit)
            }
            Self::IstOutOfRange(ist) => write!(f, "IST index {} out of range (0-7)", ist),
            Self::UnknownGateType(ty) => write!(f, "unknown gate type 0x{:x}", ty),
            Self::TableSizeOutOfRange(size) => {
                write!(f, "descriptor table size {} out of range (1-65536)", size)
            }
        }
    }
}

/// Result type for IRQ table operations.
pub type IrqResult<T> = Result<T, IrqError>;

/// Errors returned by IRQ line registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqError {
    /// The line number is not served by the interrupt controller.
    LineOutOfRange(u8),
}

impl fmt::Display for IrqError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::LineOutOfRange(irq) => write!(f, "IRQ line {} out of range (0-15)", irq),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::string::ToString;

    #[test]
    fn errors_render_the_offending_value() {
        assert_eq!(
            DescriptorError::PrivilegeOutOfRange(4).to_string(),
            "privilege level 4 out of range (0-3)"
        );
        assert_eq!(
            IrqError::LineOutOfRange(16).to_string(),
            "IRQ line 16 out of range (0-15)"
        );
    }
}
