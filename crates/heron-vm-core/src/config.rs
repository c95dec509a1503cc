//! Interpreter configuration

use serde::{Deserialize, Serialize};

/// Default maximum call depth
pub const DEFAULT_MAX_CALL_DEPTH: usize = 1000;

/// Interpreter configuration, loadable from JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    /// Maximum number of live frames before a `RangeError`
    pub max_call_depth: usize,

    /// Instructions a single run may execute before it is interrupted.
    /// Compile-time markers are not counted
    pub instruction_limit: Option<u64>,

    /// Run top-level code in strict mode
    pub strict: bool,

    /// Emit a `trace!` event per executed instruction
    pub trace_instructions: bool,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            instruction_limit: None,
            strict: false,
            trace_instructions: false,
        }
    }
}

impl InterpreterConfig {
    /// Parse from JSON; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Set the maximum call depth
    pub fn max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Set the instruction budget
    pub fn instruction_limit(mut self, limit: u64) -> Self {
        self.instruction_limit = Some(limit);
        self
    }

    /// Set strict mode for top-level code
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Enable per-instruction tracing
    pub fn trace_instructions(mut self, enabled: bool) -> Self {
        self.trace_instructions = enabled;
        self
    }
}
