//! Bytecode operands

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque compile-time label identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct LabelId(pub u32);

impl LabelId {
    /// Create a new label id
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw id
    #[inline]
    pub const fn id(self) -> u32 {
        self.0
    }
}

impl fmt::Display for LabelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Jump target
///
/// Emitted as a label and rewritten to an absolute position in the same
/// instruction stream once the whole stream is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Target {
    /// Not yet resolved
    Label(LabelId),
    /// Absolute instruction index
    Position(u32),
}

impl Target {
    /// Target for a label id
    #[inline]
    pub const fn label(id: u32) -> Self {
        Self::Label(LabelId(id))
    }

    /// Target for an absolute position
    #[inline]
    pub const fn position(pos: u32) -> Self {
        Self::Position(pos)
    }

    /// The absolute position, if resolved
    #[inline]
    pub const fn as_position(self) -> Option<u32> {
        match self {
            Self::Position(pos) => Some(pos),
            Self::Label(_) => None,
        }
    }

    /// The label id, if unresolved
    #[inline]
    pub const fn as_label(self) -> Option<LabelId> {
        match self {
            Self::Label(id) => Some(id),
            Self::Position(_) => None,
        }
    }
}

impl From<LabelId> for Target {
    fn from(id: LabelId) -> Self {
        Self::Label(id)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Label(id) => write!(f, "{}", id),
            Self::Position(pos) => write!(f, "@{}", pos),
        }
    }
}
