//! JavaScript values
//!
//! A closed tagged union. `Undefined`, `Null`, `Boolean`, `Number` and
//! `String` are primitives; `Object`, `Array` and `Function` are references
//! to shared storage and alias on clone.

use std::fmt;
use std::sync::Arc;

use crate::function::JsFunction;
use crate::object::JsObject;
use crate::string::JsString;

/// A JavaScript value
///
/// This type is `Send + Sync` because all heap-allocated data is behind `Arc`
/// with `parking_lot` locks around mutable state.
#[derive(Clone, Default)]
pub enum Value {
    /// `undefined`
    #[default]
    Undefined,
    /// `null`
    Null,
    /// `true` / `false`
    Boolean(bool),
    /// IEEE 754 double
    Number(f64),
    /// UTF-16 string
    String(JsString),
    /// Ordinary object (also error, regexp and primitive wrapper objects)
    Object(Arc<JsObject>),
    /// Array object with a dense element store
    Array(Arc<JsObject>),
    /// Callable object
    Function(Arc<JsFunction>),
}

impl Value {
    /// Create undefined value
    #[inline]
    pub const fn undefined() -> Self {
        Self::Undefined
    }

    /// Create null value
    #[inline]
    pub const fn null() -> Self {
        Self::Null
    }

    /// Create boolean value
    #[inline]
    pub const fn boolean(b: bool) -> Self {
        Self::Boolean(b)
    }

    /// Create number value
    #[inline]
    pub const fn number(n: f64) -> Self {
        Self::Number(n)
    }

    /// Create string value
    pub fn string(s: impl Into<JsString>) -> Self {
        Self::String(s.into())
    }

    /// Check if undefined
    #[inline]
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Check if null
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Check if null or undefined
    #[inline]
    pub fn is_nullish(&self) -> bool {
        matches!(self, Self::Undefined | Self::Null)
    }

    /// Check if this value is a primitive
    pub fn is_primitive(&self) -> bool {
        match self {
            Self::Undefined | Self::Null | Self::Boolean(_) | Self::Number(_) | Self::String(_) => {
                true
            }
            Self::Object(_) | Self::Array(_) | Self::Function(_) => false,
        }
    }

    /// Check if this value is a reference (object, array or function)
    #[inline]
    pub fn is_reference(&self) -> bool {
        !self.is_primitive()
    }

    /// Check if callable
    #[inline]
    pub fn is_function(&self) -> bool {
        matches!(self, Self::Function(_))
    }

    /// Get as boolean
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as string
    pub fn as_string(&self) -> Option<&JsString> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Property storage of a reference value
    pub fn as_object(&self) -> Option<&Arc<JsObject>> {
        match self {
            Self::Object(obj) | Self::Array(obj) => Some(obj),
            Self::Function(func) => Some(func.object()),
            _ => None,
        }
    }

    /// Get as function
    pub fn as_function(&self) -> Option<&Arc<JsFunction>> {
        match self {
            Self::Function(func) => Some(func),
            _ => None,
        }
    }

    /// Result of the `typeof` operator
    pub fn type_of(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "object",
            Self::Boolean(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Object(_) | Self::Array(_) => "object",
            Self::Function(_) => "function",
        }
    }

    /// Internal type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Undefined => "Undefined",
            Self::Null => "Null",
            Self::Boolean(_) => "Boolean",
            Self::Number(_) => "Number",
            Self::String(_) => "String",
            Self::Object(_) | Self::Array(_) | Self::Function(_) => "Object",
        }
    }

    /// Whether both values refer to the same storage
    pub fn same_reference(&self, other: &Value) -> bool {
        match (self.as_object(), other.as_object()) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Strict identity: primitives by value (`NaN != NaN`), references by pointer
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Object(a), Self::Object(b)) | (Self::Array(a), Self::Array(b)) => {
                Arc::ptr_eq(a, b)
            }
            (Self::Function(a), Self::Function(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => write!(f, "undefined"),
            Self::Null => write!(f, "null"),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Number(n) => write!(f, "{}", crate::convert::number_to_string(*n)),
            Self::String(s) => write!(f, "{:?}", s),
            Self::Object(_) => write!(f, "[object Object]"),
            Self::Array(obj) => write!(f, "[Array({})]", obj.len()),
            Self::Function(func) => write!(f, "[Function: {}]", func.name()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.into())
    }
}

impl From<JsString> for Value {
    fn from(s: JsString) -> Self {
        Self::String(s)
    }
}
