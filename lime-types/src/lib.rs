//! Shared scalar types for the Lime toolchain.
//!
//! The compiler and the VM agree on two things: the scalar [`TypeTag`] set
//! and the untagged 64-bit [`Value`] cell. Typing lives in the instruction
//! stream, not in the data, so the cell carries no discriminant.

#![warn(missing_docs)]

mod tag;
mod value;

pub use tag::TypeTag;
pub use value::Value;

/// Native machine word of the VM.
pub type Word = u64;
