//! Instruction set of the Lime stack VM.
//!
//! An instruction is a one-byte opcode followed by zero to eight bytes of
//! little-endian immediate operands. This crate owns the opcode numbering,
//! the mnemonic table and the per-opcode immediate width; the interpreter
//! and the disassembler both decode against it.

#![warn(missing_docs)]

mod opcode;

pub use opcode::Opcode;

/// 8-bit immediate operand.
pub type Immediate08 = u8;

/// 16-bit immediate operand (code and data addresses, frame slots).
pub type Immediate16 = u16;

/// 32-bit immediate operand.
pub type Immediate32 = u32;

/// 64-bit immediate operand (`i64const` and `rconst` payloads).
pub type Immediate64 = u64;
