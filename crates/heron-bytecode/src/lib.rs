//! # Heron Bytecode
//!
//! This crate defines the instruction format executed by the Heron VM.
//!
//! ## Design Principles
//!
//! - **Stack-based**: Instructions pop operands from and push results onto
//!   a per-frame operand stack
//! - **Closed**: Every instruction is a variant of one enum, tagged by an
//!   enumerable [`Opcode`] registry with stable names and parameter lists
//! - **Label-addressed**: Jumps are emitted against opaque labels and
//!   resolved to absolute positions once the whole stream is known
//! - **Serializable**: Programs can be cached as JSON or a framed binary form

#![warn(clippy::all)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod instruction;
pub mod operand;
pub mod operator;
pub mod program;

pub use error::BytecodeError;
pub use instruction::{Instruction, Opcode};
pub use operand::{LabelId, Target};
pub use operator::{BinaryOperator, PropertyKind, UnaryOperator};
pub use program::{Program, ProgramBuilder, ProtectedRegion};

/// Bytecode format version
pub const BYTECODE_VERSION: u32 = 2;

/// Magic bytes for bytecode files
pub const BYTECODE_MAGIC: [u8; 8] = *b"HERONBC\0";
