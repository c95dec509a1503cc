//! Function objects

use std::sync::Arc;

use heron_bytecode::Program;

use crate::error::VmResult;
use crate::object::JsObject;
use crate::realm::Realm;
use crate::scope::Scope;
use crate::string::JsString;
use crate::value::Value;

/// Native function handler type: `(this, args, realm) -> result`
pub type NativeFn = Arc<dyn Fn(&Value, &[Value], &Arc<Realm>) -> VmResult<Value> + Send + Sync>;

/// Bytecode body of an interpreted function
#[derive(Clone, Debug)]
pub struct InterpretedFunction {
    /// Program holding the body
    pub program: Arc<Program>,
    /// Absolute position of the first body instruction
    pub entry: usize,
    /// Formal parameter names
    pub params: Arc<[Box<str>]>,
    /// Scope captured when the closure was created
    pub scope: Scope,
    /// Strict-mode body
    pub strict: bool,
}

/// How a function runs when called
#[derive(Clone)]
pub enum FunctionKind {
    /// Host function executed synchronously
    Native(NativeFn),
    /// Bytecode function executed in a new frame
    Interpreted(InterpretedFunction),
}

/// A callable object
pub struct JsFunction {
    object: Arc<JsObject>,
    name: JsString,
    kind: FunctionKind,
    is_constructor: bool,
}

impl JsFunction {
    /// Create a function over existing property storage
    pub fn new(object: Arc<JsObject>, name: JsString, kind: FunctionKind, is_constructor: bool) -> Self {
        Self {
            object,
            name,
            kind,
            is_constructor,
        }
    }

    /// Property storage
    #[inline]
    pub fn object(&self) -> &Arc<JsObject> {
        &self.object
    }

    /// Function name
    #[inline]
    pub fn name(&self) -> &JsString {
        &self.name
    }

    /// Function kind
    #[inline]
    pub fn kind(&self) -> &FunctionKind {
        &self.kind
    }

    /// Check if native
    #[inline]
    pub fn is_native(&self) -> bool {
        matches!(self.kind, FunctionKind::Native(_))
    }

    /// `IS_CONSTRUCTOR` flag
    #[inline]
    pub fn is_constructor(&self) -> bool {
        self.is_constructor
    }

    /// Bytecode body, if interpreted
    pub fn as_interpreted(&self) -> Option<&InterpretedFunction> {
        match &self.kind {
            FunctionKind::Interpreted(body) => Some(body),
            FunctionKind::Native(_) => None,
        }
    }
}

impl std::fmt::Debug for JsFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsFunction")
            .field("name", &self.name)
            .field("native", &self.is_native())
            .field("is_constructor", &self.is_constructor)
            .finish()
    }
}
