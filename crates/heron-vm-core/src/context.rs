//! VM execution context
//!
//! The context holds per-frame state: operand stack, scope, `this`, strict
//! flag, and handles to the realm and the program being executed.

use std::sync::Arc;

use heron_bytecode::{Program, Target};

use crate::error::{VmError, VmResult};
use crate::realm::Realm;
use crate::scope::Scope;
use crate::value::Value;

/// An operand stack slot
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    /// A language value
    Value(Value),
    /// Argument tuple built by `LOAD_N_TUPLE`
    Tuple(Vec<Value>),
    /// Placeholder pushed by `LOAD_NONE`
    Placeholder,
}

/// Per-frame execution context
pub struct ExecutionContext {
    stack: Vec<Slot>,
    scope: Scope,
    this: Value,
    strict: bool,
    realm: Arc<Realm>,
    program: Arc<Program>,
    /// Exception waiting for `END_FINALLY`
    parked: Option<VmError>,
}

impl ExecutionContext {
    /// Create a new context
    pub fn new(
        realm: Arc<Realm>,
        program: Arc<Program>,
        scope: Scope,
        this: Value,
        strict: bool,
    ) -> Self {
        Self {
            stack: Vec::with_capacity(16),
            scope,
            this,
            strict,
            realm,
            program,
            parked: None,
        }
    }

    /// Top-level context: global scope, global `this`, configured strictness
    pub fn global(realm: Arc<Realm>, program: Arc<Program>) -> Self {
        let scope = realm.global_scope().clone();
        let this = realm.global_this();
        let strict = realm.config().strict;
        Self::new(realm, program, scope, this, strict)
    }

    /// Current scope
    #[inline]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// `this` binding
    #[inline]
    pub fn this_value(&self) -> &Value {
        &self.this
    }

    /// Strict-mode flag
    #[inline]
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Realm
    #[inline]
    pub fn realm(&self) -> &Arc<Realm> {
        &self.realm
    }

    /// Program this frame executes
    #[inline]
    pub fn program(&self) -> &Arc<Program> {
        &self.program
    }

    // ==================== Operand stack ====================

    /// Operand stack, bottom first
    #[inline]
    pub fn stack(&self) -> &[Slot] {
        &self.stack
    }

    /// Operand stack height
    #[inline]
    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }

    /// Push a value
    #[inline]
    pub fn push(&mut self, value: Value) {
        self.stack.push(Slot::Value(value));
    }

    /// Push a raw slot
    #[inline]
    pub fn push_slot(&mut self, slot: Slot) {
        self.stack.push(slot);
    }

    /// Pop a raw slot
    pub fn pop_slot(&mut self) -> VmResult<Slot> {
        self.stack
            .pop()
            .ok_or_else(|| VmError::internal("operand stack underflow"))
    }

    /// Pop a value; placeholders and tuples are invariant violations
    pub fn pop_value(&mut self) -> VmResult<Value> {
        match self.pop_slot()? {
            Slot::Value(value) => Ok(value),
            Slot::Tuple(_) => Err(VmError::internal("argument tuple where a value was expected")),
            Slot::Placeholder => Err(VmError::internal("read of a LOAD_NONE placeholder")),
        }
    }

    /// Top value without popping
    pub fn peek_value(&self) -> VmResult<&Value> {
        match self.stack.last() {
            Some(Slot::Value(value)) => Ok(value),
            Some(Slot::Tuple(_)) => Err(VmError::internal("argument tuple where a value was expected")),
            Some(Slot::Placeholder) => Err(VmError::internal("read of a LOAD_NONE placeholder")),
            None => Err(VmError::internal("operand stack underflow")),
        }
    }

    /// Pop an argument tuple
    pub fn pop_tuple(&mut self) -> VmResult<Vec<Value>> {
        match self.pop_slot()? {
            Slot::Tuple(values) => Ok(values),
            _ => Err(VmError::internal("expected an argument tuple")),
        }
    }

    /// Pop `n` values, returned in stack order (bottom first)
    pub fn pop_values(&mut self, n: usize) -> VmResult<Vec<Value>> {
        let len = self.stack.len();
        if n > len {
            return Err(VmError::internal("operand stack underflow"));
        }
        self.stack
            .drain(len - n..)
            .map(|slot| match slot {
                Slot::Value(value) => Ok(value),
                Slot::Tuple(_) => Err(VmError::internal("argument tuple where a value was expected")),
                Slot::Placeholder => Err(VmError::internal("read of a LOAD_NONE placeholder")),
            })
            .collect()
    }

    /// Truncate the operand stack to `height`
    pub fn truncate(&mut self, height: usize) {
        self.stack.truncate(height);
    }

    /// Frame result: the top value, or `undefined` on an empty stack
    pub fn take_result(&mut self) -> VmResult<Value> {
        if self.stack.is_empty() {
            Ok(Value::undefined())
        } else {
            self.pop_value()
        }
    }

    // ==================== Control ====================

    /// Absolute position of a jump target in this frame's program
    pub fn resolve_target(&self, target: Target) -> VmResult<usize> {
        self.program.position_of(target).ok_or_else(|| {
            VmError::internal(format!("unresolved jump target {}", target))
        })
    }

    /// Park an exception until `END_FINALLY`
    pub fn park_exception(&mut self, error: VmError) {
        self.parked = Some(error);
    }

    /// Take the parked exception
    pub fn take_parked_exception(&mut self) -> Option<VmError> {
        self.parked.take()
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("stack", &self.stack)
            .field("this", &self.this)
            .field("strict", &self.strict)
            .finish()
    }
}
