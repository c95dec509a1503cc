//! Bytecode errors

use thiserror::Error;

use crate::operand::LabelId;

/// Errors that can occur while building, resolving or decoding bytecode.
///
/// All of these are compiler-side invariant violations: they are reported
/// before a program runs and are never visible to language-level try/catch.
#[derive(Debug, Error)]
pub enum BytecodeError {
    /// `LOAD_BOOLEAN` built from something other than 0 or 1
    #[error("Invalid boolean literal: {0} (expected 0 or 1)")]
    InvalidBooleanLiteral(u8),

    /// `LOAD_NUMBER` built from a non-numeric source literal
    #[error("Invalid number literal: {0:?}")]
    InvalidNumberLiteral(String),

    /// Unknown opcode tag name
    #[error("Unknown opcode: {0}")]
    UnknownOpcode(String),

    /// A label marker appears more than once in the same stream
    #[error("Label {0} is defined more than once")]
    DuplicateLabel(LabelId),

    /// A jump, region or function entry references a label with no marker
    #[error("Label {0} is referenced but never defined")]
    UnresolvedLabel(LabelId),

    /// A resolved jump or entry points past the end of the stream
    #[error("Jump target {0} is out of range")]
    TargetOutOfRange(u32),

    /// A protected region with no handler or with an inverted range
    #[error("Invalid protected region at index {0}")]
    InvalidRegion(usize),

    /// Invalid magic bytes in an encoded program
    #[error("Invalid magic bytes")]
    InvalidMagic,

    /// Unsupported bytecode version
    #[error("Unsupported version: {0}")]
    UnsupportedVersion(u32),

    /// Unexpected end of an encoded program
    #[error("Unexpected end of bytecode")]
    UnexpectedEnd,

    /// Payload could not be (de)serialized
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// IO error during serialization
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for bytecode operations
pub type Result<T> = std::result::Result<T, BytecodeError>;
