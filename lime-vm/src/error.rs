//! Runtime and image error types.

use std::io;

use thiserror::Error;

/// Fatal interpreter error. Execution never resumes after one of these.
#[derive(Debug, Error)]
pub enum VmError {
    /// The byte under `ip` does not map to any opcode.
    #[error("unknown opcode {opcode:#04x} at {ip:#x}")]
    UnknownOpcode {
        /// The offending byte.
        opcode: u8,
        /// Code offset it was read from.
        ip: u32,
    },
    /// An instruction or immediate read ran past the code buffer.
    #[error("code address {addr:#x} out of bounds")]
    CodeOutOfBounds {
        /// First out-of-range offset.
        addr: u32,
    },
    /// A string address pointed outside the data buffer.
    #[error("data address {addr:#x} out of bounds")]
    DataOutOfBounds {
        /// The bad data offset.
        addr: u16,
    },
    /// More cells were popped than the stack holds.
    #[error("operand stack underflow at {ip:#x}")]
    StackUnderflow {
        /// Code offset of the faulting instruction.
        ip: u32,
    },
    /// A frame-relative slot fell outside the live stack.
    #[error("frame slot {slot} out of range at {ip:#x}")]
    SlotOutOfRange {
        /// The absolute stack index that was addressed.
        slot: u32,
        /// Code offset of the faulting instruction.
        ip: u32,
    },
    /// Integer division or remainder by zero.
    #[error("integer division by zero at {ip:#x}")]
    DivisionByZero {
        /// Code offset of the faulting instruction.
        ip: u32,
    },
    /// Writing program output failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Failure while reading or writing a persisted `.lmx` image.
#[derive(Debug, Error)]
pub enum ImageError {
    /// The file does not start with the `LIME!` magic.
    #[error("not a lime image: bad magic")]
    BadMagic,
    /// The file ended inside the header.
    #[error("truncated image header")]
    TruncatedHeader,
    /// The declared code/data sizes do not match the file tail.
    #[error("image sizes do not match file contents")]
    SizeMismatch,
    /// Underlying file I/O failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}
