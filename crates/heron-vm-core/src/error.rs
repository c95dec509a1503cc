//! VM error types

use crate::realm::Realm;
use crate::value::Value;
use thiserror::Error;

/// VM execution errors
///
/// The first five variants are language-level exceptions and can be caught by
/// a protected region. The rest are invariant violations that abort the run.
#[derive(Debug, Error)]
pub enum VmError {
    /// Type error (e.g., calling non-function)
    #[error("TypeError: {0}")]
    TypeError(String),

    /// Reference error (undefined variable)
    #[error("ReferenceError: {0}")]
    ReferenceError(String),

    /// Range error (e.g., call depth exceeded)
    #[error("RangeError: {0}")]
    RangeError(String),

    /// Syntax error (e.g., bad regexp flags)
    #[error("SyntaxError: {0}")]
    SyntaxError(String),

    /// Thrown JS exception
    #[error("Uncaught exception: {0}")]
    Exception(Box<ThrownValue>),

    /// Internal error (placeholder read, bad stack height, unresolved label)
    #[error("InternalError: {0}")]
    InternalError(String),

    /// Bytecode error
    #[error("Bytecode error: {0}")]
    Bytecode(#[from] heron_bytecode::BytecodeError),

    /// Execution was interrupted (interrupt flag or instruction budget)
    #[error("Execution interrupted")]
    Interrupted,
}

/// A thrown JavaScript value
#[derive(Debug)]
pub struct ThrownValue {
    /// The thrown value
    pub value: Value,
    /// The thrown value (as a string representation)
    pub message: String,
}

impl std::fmt::Display for ThrownValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Native error constructors known to the realm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// `Error`
    Error,
    /// `TypeError`
    TypeError,
    /// `ReferenceError`
    ReferenceError,
    /// `RangeError`
    RangeError,
    /// `SyntaxError`
    SyntaxError,
}

impl ErrorKind {
    /// All error kinds
    pub const ALL: [ErrorKind; 5] = [
        Self::Error,
        Self::TypeError,
        Self::ReferenceError,
        Self::RangeError,
        Self::SyntaxError,
    ];

    /// Constructor name
    pub const fn name(self) -> &'static str {
        match self {
            Self::Error => "Error",
            Self::TypeError => "TypeError",
            Self::ReferenceError => "ReferenceError",
            Self::RangeError => "RangeError",
            Self::SyntaxError => "SyntaxError",
        }
    }

    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

impl VmError {
    /// Create a type error
    pub fn type_error(msg: impl Into<String>) -> Self {
        Self::TypeError(msg.into())
    }

    /// Create a reference error
    pub fn reference_error(msg: impl Into<String>) -> Self {
        Self::ReferenceError(msg.into())
    }

    /// Create a range error
    pub fn range_error(msg: impl Into<String>) -> Self {
        Self::RangeError(msg.into())
    }

    /// Create a syntax error
    pub fn syntax_error(msg: impl Into<String>) -> Self {
        Self::SyntaxError(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }

    /// Create an interrupted error (for timeout/cancellation)
    pub fn interrupted() -> Self {
        Self::Interrupted
    }

    /// Create an exception from a thrown JS value
    pub fn exception(value: Value) -> Self {
        let message = crate::convert::describe(&value);
        Self::Exception(Box::new(ThrownValue { value, message }))
    }

    /// Whether a protected region may handle this error
    pub fn is_catchable(&self) -> bool {
        match self {
            Self::TypeError(_)
            | Self::ReferenceError(_)
            | Self::RangeError(_)
            | Self::SyntaxError(_)
            | Self::Exception(_) => true,
            Self::InternalError(_) | Self::Bytecode(_) | Self::Interrupted => false,
        }
    }

    /// Native error kind of a language-level error raised by the VM
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::TypeError(_) => Some(ErrorKind::TypeError),
            Self::ReferenceError(_) => Some(ErrorKind::ReferenceError),
            Self::RangeError(_) => Some(ErrorKind::RangeError),
            Self::SyntaxError(_) => Some(ErrorKind::SyntaxError),
            _ => None,
        }
    }

    /// The value a catch handler observes
    ///
    /// VM-raised errors become fresh error objects; thrown values are passed
    /// through unchanged. Fatal errors have no language value.
    pub fn to_value(&self, realm: &Realm) -> Option<Value> {
        match self {
            Self::TypeError(msg)
            | Self::ReferenceError(msg)
            | Self::RangeError(msg)
            | Self::SyntaxError(msg) => {
                let kind = self.kind()?;
                Some(realm.new_error(kind, msg))
            }
            Self::Exception(thrown) => Some(thrown.value.clone()),
            Self::InternalError(_) | Self::Bytecode(_) | Self::Interrupted => None,
        }
    }

    /// The thrown value carried by an `Exception`
    pub fn thrown_value(&self) -> Option<&Value> {
        match self {
            Self::Exception(thrown) => Some(&thrown.value),
            _ => None,
        }
    }
}

/// Result type for VM operations
pub type VmResult<T> = std::result::Result<T, VmError>;
