//! Bytecode instructions (opcodes)

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{BytecodeError, Result};
use crate::operand::{LabelId, Target};
use crate::operator::{BinaryOperator, PropertyKind, UnaryOperator};

/// Bytecode opcodes
///
/// Stack-based instruction set. The tag of every [`Instruction`] variant,
/// together with its canonical name and ordered parameter list. This is the
/// registry compilers and disassemblers rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    // ==================== Unary ====================
    /// Apply a unary operator: push op(pop)
    UnaryOp = 0x00,
    /// typeof identifier without ReferenceError
    TypeOf = 0x01,
    /// ++/-- on an identifier
    Postfix = 0x02,
    /// ++/-- on a computed property
    PostfixMember = 0x03,
    /// ++/-- on a literal property
    PostfixMemberDot = 0x04,
    /// delete identifier
    Delete = 0x05,
    /// delete obj\[key\]
    DeleteMember = 0x06,

    // ==================== Binary ====================
    /// Apply a binary operator: push op(left, right)
    BinaryOp = 0x10,

    // ==================== Jumps ====================
    /// Label marker (compile time only)
    Label = 0x20,
    /// Unconditional jump
    Jump = 0x21,
    /// Pop, jump if truthy
    JumpIfTrue = 0x22,
    /// Peek, jump if truthy
    JumpIfTrueWithoutPop = 0x23,
    /// Pop, jump if falsy
    JumpIfFalse = 0x24,
    /// Peek, jump if falsy
    JumpIfFalseWithoutPop = 0x25,

    // ==================== Stack ====================
    /// Discard top of stack
    Pop = 0x30,
    /// Collapse a two-element stack to its top
    Reduce = 0x31,

    // ==================== Loads ====================
    /// Push a placeholder slot
    LoadNone = 0x40,
    /// Pack n values into an argument tuple
    LoadNTuple = 0x41,
    /// Push undefined
    LoadUndefined = 0x42,
    /// Push null
    LoadNull = 0x43,
    /// Push a boolean literal
    LoadBoolean = 0x44,
    /// Push a string literal
    LoadString = 0x45,
    /// Push a number literal
    LoadNumber = 0x46,
    /// Push a fresh regexp object
    LoadRegExp = 0x47,
    /// Push a closure over the current scope
    LoadFunction = 0x48,
    /// Build an object literal
    LoadObject = 0x49,
    /// Build an array literal
    LoadArray = 0x4A,
    /// Push `this`
    LoadThis = 0x4B,
    /// Push identifier value
    Load = 0x4C,
    /// Push obj\[key\]
    LoadMember = 0x4D,
    /// Push obj.prop
    LoadMemberDot = 0x4E,

    // ==================== Stores ====================
    /// identifier = top (no pop)
    Store = 0x50,
    /// obj\[key\] = value
    StoreMember = 0x51,
    /// obj.prop = value
    StoreMemberDot = 0x52,
    /// identifier op= value
    StoreOp = 0x53,
    /// obj\[key\] op= value
    StoreMemberOp = 0x54,
    /// obj.prop op= value
    StoreMemberDotOp = 0x55,

    // ==================== Calls ====================
    /// func(args)
    Call = 0x60,
    /// obj\[key\](args)
    CallMethod = 0x61,
    /// obj.prop(args)
    CallMethodDot = 0x62,
    /// func()
    CallNoArgs = 0x63,
    /// obj\[key\]()
    CallMethodNoArgs = 0x64,
    /// obj.prop()
    CallMethodDotNoArgs = 0x65,
    /// Complete the current frame
    Return = 0x66,
    /// new func(args)
    New = 0x67,
    /// new func
    NewNoArgs = 0x68,

    // ==================== Exceptions ====================
    /// Throw the top of stack
    Throw = 0x70,
    /// try/catch/finally marker
    TryCatchFinally = 0x71,
    /// End of a finally block
    EndFinally = 0x72,
}

impl Opcode {
    /// Every opcode, in encoding order
    pub const ALL: [Opcode; 49] = [
        Self::UnaryOp,
        Self::TypeOf,
        Self::Postfix,
        Self::PostfixMember,
        Self::PostfixMemberDot,
        Self::Delete,
        Self::DeleteMember,
        Self::BinaryOp,
        Self::Label,
        Self::Jump,
        Self::JumpIfTrue,
        Self::JumpIfTrueWithoutPop,
        Self::JumpIfFalse,
        Self::JumpIfFalseWithoutPop,
        Self::Pop,
        Self::Reduce,
        Self::LoadNone,
        Self::LoadNTuple,
        Self::LoadUndefined,
        Self::LoadNull,
        Self::LoadBoolean,
        Self::LoadString,
        Self::LoadNumber,
        Self::LoadRegExp,
        Self::LoadFunction,
        Self::LoadObject,
        Self::LoadArray,
        Self::LoadThis,
        Self::Load,
        Self::LoadMember,
        Self::LoadMemberDot,
        Self::Store,
        Self::StoreMember,
        Self::StoreMemberDot,
        Self::StoreOp,
        Self::StoreMemberOp,
        Self::StoreMemberDotOp,
        Self::Call,
        Self::CallMethod,
        Self::CallMethodDot,
        Self::CallNoArgs,
        Self::CallMethodNoArgs,
        Self::CallMethodDotNoArgs,
        Self::Return,
        Self::New,
        Self::NewNoArgs,
        Self::Throw,
        Self::TryCatchFinally,
        Self::EndFinally,
    ];

    /// Convert from raw byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.to_byte() == byte)
    }

    /// Convert to raw byte
    #[inline]
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Parse a canonical tag name
    pub fn from_name(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.name() == name)
            .ok_or_else(|| BytecodeError::UnknownOpcode(name.to_string()))
    }

    /// Get the canonical tag name of this opcode
    pub const fn name(self) -> &'static str {
        match self {
            Self::UnaryOp => "UNARY_OP",
            Self::TypeOf => "TYPEOF",
            Self::Postfix => "POSTFIX",
            Self::PostfixMember => "POSTFIX_MEMBER",
            Self::PostfixMemberDot => "POSTFIX_MEMBER_DOT",
            Self::Delete => "DELETE",
            Self::DeleteMember => "DELETE_MEMBER",
            Self::BinaryOp => "BINARY_OP",
            Self::Label => "LABEL",
            Self::Jump => "JUMP",
            Self::JumpIfTrue => "JUMP_IF_TRUE",
            Self::JumpIfTrueWithoutPop => "JUMP_IF_TRUE_WITHOUT_POP",
            Self::JumpIfFalse => "JUMP_IF_FALSE",
            Self::JumpIfFalseWithoutPop => "JUMP_IF_FALSE_WITHOUT_POP",
            Self::Pop => "POP",
            Self::Reduce => "REDUCE",
            Self::LoadNone => "LOAD_NONE",
            Self::LoadNTuple => "LOAD_N_TUPLE",
            Self::LoadUndefined => "LOAD_UNDEFINED",
            Self::LoadNull => "LOAD_NULL",
            Self::LoadBoolean => "LOAD_BOOLEAN",
            Self::LoadString => "LOAD_STRING",
            Self::LoadNumber => "LOAD_NUMBER",
            Self::LoadRegExp => "LOAD_REGEXP",
            Self::LoadFunction => "LOAD_FUNCTION",
            Self::LoadObject => "LOAD_OBJECT",
            Self::LoadArray => "LOAD_ARRAY",
            Self::LoadThis => "LOAD_THIS",
            Self::Load => "LOAD",
            Self::LoadMember => "LOAD_MEMBER",
            Self::LoadMemberDot => "LOAD_MEMBER_DOT",
            Self::Store => "STORE",
            Self::StoreMember => "STORE_MEMBER",
            Self::StoreMemberDot => "STORE_MEMBER_DOT",
            Self::StoreOp => "STORE_OP",
            Self::StoreMemberOp => "STORE_MEMBER_OP",
            Self::StoreMemberDotOp => "STORE_MEMBER_DOT_OP",
            Self::Call => "CALL",
            Self::CallMethod => "CALL_METHOD",
            Self::CallMethodDot => "CALL_METHOD_DOT",
            Self::CallNoArgs => "CALL_NO_ARGS",
            Self::CallMethodNoArgs => "CALL_METHOD_NO_ARGS",
            Self::CallMethodDotNoArgs => "CALL_METHOD_DOT_NO_ARGS",
            Self::Return => "RETURN",
            Self::New => "NEW",
            Self::NewNoArgs => "NEW_NO_ARGS",
            Self::Throw => "THROW",
            Self::TryCatchFinally => "TRY_CATCH_FINALLY",
            Self::EndFinally => "END_FINALLY",
        }
    }

    /// Ordered parameter list fixed at compile time
    pub const fn params(self) -> &'static [&'static str] {
        match self {
            Self::UnaryOp | Self::BinaryOp => &["operator"],
            Self::TypeOf | Self::Load | Self::Store => &["identifier"],
            Self::Postfix => &["identifier", "post", "incr"],
            Self::PostfixMember => &["post", "incr"],
            Self::PostfixMemberDot => &["post", "incr", "prop"],
            Self::Delete => &["name"],
            Self::Label => &["num"],
            Self::Jump
            | Self::JumpIfTrue
            | Self::JumpIfTrueWithoutPop
            | Self::JumpIfFalse
            | Self::JumpIfFalseWithoutPop => &["label"],
            Self::LoadNTuple => &["n"],
            Self::LoadBoolean | Self::LoadString | Self::LoadNumber => &["val"],
            Self::LoadRegExp => &["body", "flags"],
            Self::LoadFunction => &["entry", "name", "params", "constructor", "strict"],
            Self::LoadObject => &["props"],
            Self::LoadArray => &["num"],
            Self::LoadMemberDot
            | Self::StoreMemberDot
            | Self::CallMethodDot
            | Self::CallMethodDotNoArgs => &["prop"],
            Self::StoreOp => &["identifier", "op"],
            Self::StoreMemberOp => &["op"],
            Self::StoreMemberDotOp => &["prop", "op"],
            Self::DeleteMember
            | Self::Pop
            | Self::Reduce
            | Self::LoadNone
            | Self::LoadUndefined
            | Self::LoadNull
            | Self::LoadThis
            | Self::LoadMember
            | Self::StoreMember
            | Self::Call
            | Self::CallMethod
            | Self::CallNoArgs
            | Self::CallMethodNoArgs
            | Self::Return
            | Self::New
            | Self::NewNoArgs
            | Self::Throw
            | Self::TryCatchFinally
            | Self::EndFinally => &[],
        }
    }

    /// Whether this opcode carries a jump target
    pub const fn is_jump(self) -> bool {
        matches!(
            self,
            Self::Jump
                | Self::JumpIfTrue
                | Self::JumpIfTrueWithoutPop
                | Self::JumpIfFalse
                | Self::JumpIfFalseWithoutPop
        )
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded instruction with its compile-time parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    // Unary
    /// Apply a unary operator to the top of the stack
    UnaryOp {
        /// Operator
        op: UnaryOperator,
    },
    /// typeof on an identifier; an unresolvable name yields "undefined"
    TypeOf {
        /// Name to look up
        identifier: Box<str>,
    },
    /// ++/-- on an identifier
    Postfix {
        /// Binding to update
        identifier: Box<str>,
        /// Push the old value (`x++`) instead of the new one (`++x`)
        post: bool,
        /// Increment rather than decrement
        incr: bool,
    },
    /// ++/-- on `obj[key]`
    PostfixMember {
        /// Push the old value
        post: bool,
        /// Increment rather than decrement
        incr: bool,
    },
    /// ++/-- on `obj.prop`
    PostfixMemberDot {
        /// Push the old value
        post: bool,
        /// Increment rather than decrement
        incr: bool,
        /// Property name
        prop: Box<str>,
    },
    /// delete an identifier
    Delete {
        /// Binding to remove
        name: Box<str>,
    },
    /// delete `obj[key]`
    DeleteMember,

    // Binary
    /// Apply a binary operator to the two topmost values
    BinaryOp {
        /// Operator
        op: BinaryOperator,
    },

    // Jumps
    /// Compile-time marker, stripped by label resolution
    Label {
        /// Label placed here
        id: LabelId,
    },
    /// Unconditional jump
    Jump {
        /// Destination
        target: Target,
    },
    /// Pop, jump if truthy
    JumpIfTrue {
        /// Destination
        target: Target,
    },
    /// Peek, jump if truthy
    JumpIfTrueWithoutPop {
        /// Destination
        target: Target,
    },
    /// Pop, jump if falsy
    JumpIfFalse {
        /// Destination
        target: Target,
    },
    /// Peek, jump if falsy
    JumpIfFalseWithoutPop {
        /// Destination
        target: Target,
    },

    // Stack management
    /// Discard the top slot
    Pop,
    /// Collapse a two-slot stack to its top
    Reduce,

    // Loads
    /// Placeholder slot that must be overwritten before it is read
    LoadNone,
    /// Pop `n` values into one tuple slot
    LoadNTuple {
        /// Arity
        n: u32,
    },
    /// Push undefined
    LoadUndefined,
    /// Push null
    LoadNull,
    /// Push a boolean
    LoadBoolean {
        /// Literal
        value: bool,
    },
    /// Push a string
    LoadString {
        /// UTF-16 code units
        value: Vec<u16>,
    },
    /// Push a number
    LoadNumber {
        /// Literal, encoded by its bit pattern
        #[serde(with = "f64_bits")]
        value: f64,
    },
    /// Construct a RegExp
    LoadRegExp {
        /// Pattern source
        body: Box<str>,
        /// Flag letters
        flags: Box<str>,
    },
    /// Create a function closing over the current scope
    LoadFunction {
        /// First instruction of the function body
        entry: Target,
        /// Own name, bound inside the body
        name: Option<Box<str>>,
        /// Parameter names
        params: Vec<Box<str>>,
        /// Whether `new` is allowed
        is_constructor: bool,
        /// Strict-mode body
        strict: bool,
    },
    /// Build an object literal from popped values
    LoadObject {
        /// Property names and kinds, in source order
        props: Vec<(Box<str>, PropertyKind)>,
    },
    /// Build an array from `n` popped values
    LoadArray {
        /// Element count
        n: u32,
    },
    /// Push the receiver
    LoadThis,
    /// Push the value of a binding
    Load {
        /// Name to look up
        identifier: Box<str>,
    },
    /// Push `obj[key]`
    LoadMember,
    /// Push `obj.prop`
    LoadMemberDot {
        /// Property name
        prop: Box<str>,
    },

    // Stores
    /// Assign without popping: assignment is an expression
    Store {
        /// Binding to assign
        identifier: Box<str>,
    },
    /// `obj[key] = value`
    StoreMember,
    /// `obj.prop = value`
    StoreMemberDot {
        /// Property name
        prop: Box<str>,
    },
    /// `identifier op= value`
    StoreOp {
        /// Binding to update
        identifier: Box<str>,
        /// Operator
        op: BinaryOperator,
    },
    /// `obj[key] op= value`
    StoreMemberOp {
        /// Operator
        op: BinaryOperator,
    },
    /// `obj.prop op= value`
    StoreMemberDotOp {
        /// Property name
        prop: Box<str>,
        /// Operator
        op: BinaryOperator,
    },

    // Calls
    /// `f(args)`
    Call,
    /// `obj[key](args)`
    CallMethod,
    /// `obj.prop(args)`
    CallMethodDot {
        /// Method name
        prop: Box<str>,
    },
    /// `f()`
    CallNoArgs,
    /// `obj[key]()`
    CallMethodNoArgs,
    /// `obj.prop()`
    CallMethodDotNoArgs {
        /// Method name
        prop: Box<str>,
    },
    /// Return the top of the stack from the current frame
    Return,
    /// `new F(args)`
    New,
    /// `new F`
    NewNoArgs,

    // Exceptions
    /// Throw the top of the stack
    Throw,
    /// No-op marker at the head of a protected region
    TryCatchFinally,
    /// Re-raises an exception parked by the driver when it entered a finally
    /// handler by unwinding
    EndFinally,
}

/// `LOAD_NUMBER` operands are encoded as their IEEE-754 bit pattern
mod f64_bits {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.to_bits())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        u64::deserialize(deserializer).map(f64::from_bits)
    }
}

impl Instruction {
    /// Get the opcode tag of this instruction
    pub const fn opcode(&self) -> Opcode {
        match self {
            Self::UnaryOp { .. } => Opcode::UnaryOp,
            Self::TypeOf { .. } => Opcode::TypeOf,
            Self::Postfix { .. } => Opcode::Postfix,
            Self::PostfixMember { .. } => Opcode::PostfixMember,
            Self::PostfixMemberDot { .. } => Opcode::PostfixMemberDot,
            Self::Delete { .. } => Opcode::Delete,
            Self::DeleteMember => Opcode::DeleteMember,
            Self::BinaryOp { .. } => Opcode::BinaryOp,
            Self::Label { .. } => Opcode::Label,
            Self::Jump { .. } => Opcode::Jump,
            Self::JumpIfTrue { .. } => Opcode::JumpIfTrue,
            Self::JumpIfTrueWithoutPop { .. } => Opcode::JumpIfTrueWithoutPop,
            Self::JumpIfFalse { .. } => Opcode::JumpIfFalse,
            Self::JumpIfFalseWithoutPop { .. } => Opcode::JumpIfFalseWithoutPop,
            Self::Pop => Opcode::Pop,
            Self::Reduce => Opcode::Reduce,
            Self::LoadNone => Opcode::LoadNone,
            Self::LoadNTuple { .. } => Opcode::LoadNTuple,
            Self::LoadUndefined => Opcode::LoadUndefined,
            Self::LoadNull => Opcode::LoadNull,
            Self::LoadBoolean { .. } => Opcode::LoadBoolean,
            Self::LoadString { .. } => Opcode::LoadString,
            Self::LoadNumber { .. } => Opcode::LoadNumber,
            Self::LoadRegExp { .. } => Opcode::LoadRegExp,
            Self::LoadFunction { .. } => Opcode::LoadFunction,
            Self::LoadObject { .. } => Opcode::LoadObject,
            Self::LoadArray { .. } => Opcode::LoadArray,
            Self::LoadThis => Opcode::LoadThis,
            Self::Load { .. } => Opcode::Load,
            Self::LoadMember => Opcode::LoadMember,
            Self::LoadMemberDot { .. } => Opcode::LoadMemberDot,
            Self::Store { .. } => Opcode::Store,
            Self::StoreMember => Opcode::StoreMember,
            Self::StoreMemberDot { .. } => Opcode::StoreMemberDot,
            Self::StoreOp { .. } => Opcode::StoreOp,
            Self::StoreMemberOp { .. } => Opcode::StoreMemberOp,
            Self::StoreMemberDotOp { .. } => Opcode::StoreMemberDotOp,
            Self::Call => Opcode::Call,
            Self::CallMethod => Opcode::CallMethod,
            Self::CallMethodDot { .. } => Opcode::CallMethodDot,
            Self::CallNoArgs => Opcode::CallNoArgs,
            Self::CallMethodNoArgs => Opcode::CallMethodNoArgs,
            Self::CallMethodDotNoArgs { .. } => Opcode::CallMethodDotNoArgs,
            Self::Return => Opcode::Return,
            Self::New => Opcode::New,
            Self::NewNoArgs => Opcode::NewNoArgs,
            Self::Throw => Opcode::Throw,
            Self::TryCatchFinally => Opcode::TryCatchFinally,
            Self::EndFinally => Opcode::EndFinally,
        }
    }

    /// `LOAD_BOOLEAN` from a 0/1 flag
    pub fn load_boolean(flag: u8) -> Result<Self> {
        match flag {
            0 => Ok(Self::LoadBoolean { value: false }),
            1 => Ok(Self::LoadBoolean { value: true }),
            other => Err(BytecodeError::InvalidBooleanLiteral(other)),
        }
    }

    /// `LOAD_NUMBER` from a value
    pub fn load_number(value: f64) -> Self {
        Self::LoadNumber { value }
    }

    /// `LOAD_NUMBER` from numeric source text (decimal, `0x`, `0o`, `0b`)
    pub fn load_number_literal(text: &str) -> Result<Self> {
        parse_numeric_literal(text)
            .map(|value| Self::LoadNumber { value })
            .ok_or_else(|| BytecodeError::InvalidNumberLiteral(text.to_string()))
    }

    /// `LOAD_STRING` from UTF-8 text
    pub fn load_string(text: &str) -> Self {
        Self::LoadString {
            value: text.encode_utf16().collect(),
        }
    }

    /// `LOAD_OBJECT` from `(name, kind)` entries
    pub fn load_object<I, S>(props: I) -> Self
    where
        I: IntoIterator<Item = (S, PropertyKind)>,
        S: Into<Box<str>>,
    {
        Self::LoadObject {
            props: props.into_iter().map(|(n, k)| (n.into(), k)).collect(),
        }
    }

    /// Markers that exist only for compilers and do no work at run time
    pub const fn is_marker(&self) -> bool {
        matches!(self, Self::Label { .. } | Self::TryCatchFinally)
    }

    /// The jump target carried by this instruction, if any
    pub fn target(&self) -> Option<Target> {
        match self {
            Self::Jump { target }
            | Self::JumpIfTrue { target }
            | Self::JumpIfTrueWithoutPop { target }
            | Self::JumpIfFalse { target }
            | Self::JumpIfFalseWithoutPop { target }
            | Self::LoadFunction { entry: target, .. } => Some(*target),
            _ => None,
        }
    }

    /// Mutable access to the jump target, used by label resolution
    pub fn target_mut(&mut self) -> Option<&mut Target> {
        match self {
            Self::Jump { target }
            | Self::JumpIfTrue { target }
            | Self::JumpIfTrueWithoutPop { target }
            | Self::JumpIfFalse { target }
            | Self::JumpIfFalseWithoutPop { target }
            | Self::LoadFunction { entry: target, .. } => Some(target),
            _ => None,
        }
    }
}

fn parse_numeric_literal(text: &str) -> Option<f64> {
    let radix = |digits: &str, radix: u32| -> Option<f64> {
        if digits.is_empty() {
            return None;
        }
        digits.chars().try_fold(0f64, |acc, c| {
            c.to_digit(radix).map(|d| acc * radix as f64 + d as f64)
        })
    };

    let lower = text.to_ascii_lowercase();
    if let Some(hex) = lower.strip_prefix("0x") {
        return radix(hex, 16);
    }
    if let Some(oct) = lower.strip_prefix("0o") {
        return radix(oct, 8);
    }
    if let Some(bin) = lower.strip_prefix("0b") {
        return radix(bin, 2);
    }

    // Rust also accepts "inf" and "nan", numeric literals do not
    let decimal = !text.is_empty()
        && text.chars().any(|c| c.is_ascii_digit())
        && text
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));
    if decimal { text.parse().ok() } else { None }
}

fn fmt_str(f: &mut fmt::Formatter<'_>, name: &str, value: &str) -> fmt::Result {
    write!(f, "{}={:?}", name, value)
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.opcode().name())?;
        match self {
            Self::UnaryOp { op } => write!(f, "(operator={:?})", op.symbol()),
            Self::BinaryOp { op } => write!(f, "(operator={:?})", op.symbol()),
            Self::TypeOf { identifier } | Self::Load { identifier } | Self::Store { identifier } => {
                f.write_str("(")?;
                fmt_str(f, "identifier", identifier)?;
                f.write_str(")")
            }
            Self::Postfix {
                identifier,
                post,
                incr,
            } => {
                f.write_str("(")?;
                fmt_str(f, "identifier", identifier)?;
                write!(f, ", post={}, incr={})", post, incr)
            }
            Self::PostfixMember { post, incr } => write!(f, "(post={}, incr={})", post, incr),
            Self::PostfixMemberDot { post, incr, prop } => {
                write!(f, "(post={}, incr={}, ", post, incr)?;
                fmt_str(f, "prop", prop)?;
                f.write_str(")")
            }
            Self::Delete { name } => {
                f.write_str("(")?;
                fmt_str(f, "name", name)?;
                f.write_str(")")
            }
            Self::Label { id } => write!(f, "(num={})", id.0),
            Self::Jump { target }
            | Self::JumpIfTrue { target }
            | Self::JumpIfTrueWithoutPop { target }
            | Self::JumpIfFalse { target }
            | Self::JumpIfFalseWithoutPop { target } => write!(f, "(label={})", target),
            Self::LoadNTuple { n } => write!(f, "(n={})", n),
            Self::LoadArray { n } => write!(f, "(num={})", n),
            Self::LoadBoolean { value } => write!(f, "(val={})", u8::from(*value)),
            Self::LoadString { value } => {
                write!(f, "(val={:?})", String::from_utf16_lossy(value))
            }
            Self::LoadNumber { value } => write!(f, "(val={})", value),
            Self::LoadRegExp { body, flags } => {
                f.write_str("(")?;
                fmt_str(f, "body", body)?;
                f.write_str(", ")?;
                fmt_str(f, "flags", flags)?;
                f.write_str(")")
            }
            Self::LoadFunction {
                entry,
                name,
                params,
                is_constructor,
                strict,
            } => {
                write!(
                    f,
                    "(entry={}, name={:?}, params={:?}, constructor={}, strict={})",
                    entry,
                    name.as_deref().unwrap_or(""),
                    params,
                    is_constructor,
                    strict
                )
            }
            Self::LoadObject { props } => {
                f.write_str("(props=[")?;
                for (i, (name, kind)) in props.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "({:?}, {:?})", name, kind.code())?;
                }
                f.write_str("])")
            }
            Self::LoadMemberDot { prop }
            | Self::StoreMemberDot { prop }
            | Self::CallMethodDot { prop }
            | Self::CallMethodDotNoArgs { prop } => {
                f.write_str("(")?;
                fmt_str(f, "prop", prop)?;
                f.write_str(")")
            }
            Self::StoreOp { identifier, op } => {
                f.write_str("(")?;
                fmt_str(f, "identifier", identifier)?;
                write!(f, ", op={:?})", op.symbol())
            }
            Self::StoreMemberOp { op } => write!(f, "(op={:?})", op.symbol()),
            Self::StoreMemberDotOp { prop, op } => {
                f.write_str("(")?;
                fmt_str(f, "prop", prop)?;
                write!(f, ", op={:?})", op.symbol())
            }
            Self::DeleteMember
            | Self::Pop
            | Self::Reduce
            | Self::LoadNone
            | Self::LoadUndefined
            | Self::LoadNull
            | Self::LoadThis
            | Self::LoadMember
            | Self::StoreMember
            | Self::Call
            | Self::CallMethod
            | Self::CallNoArgs
            | Self::CallMethodNoArgs
            | Self::Return
            | Self::New
            | Self::NewNoArgs
            | Self::Throw
            | Self::TryCatchFinally
            | Self::EndFinally => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_roundtrip() {
        let ops = [
            Opcode::UnaryOp,
            Opcode::BinaryOp,
            Opcode::Call,
            Opcode::Jump,
            Opcode::Return,
        ];

        for op in ops {
            let byte = op.to_byte();
            let decoded = Opcode::from_byte(byte);
            assert_eq!(decoded, Some(op));
        }
    }

    #[test]
    fn test_invalid_opcode() {
        assert_eq!(Opcode::from_byte(0xFF), None);
        assert!(matches!(
            Opcode::from_name("LOAD_FOO"),
            Err(BytecodeError::UnknownOpcode(_))
        ));
    }

    #[test]
    fn test_opcode_name() {
        assert_eq!(Opcode::StoreMemberDotOp.name(), "STORE_MEMBER_DOT_OP");
        assert_eq!(Opcode::from_name("JUMP_IF_FALSE_WITHOUT_POP").ok(), Some(Opcode::JumpIfFalseWithoutPop));
        assert_eq!(Opcode::Postfix.params(), &["identifier", "post", "incr"]);
    }

    #[test]
    fn test_registry_is_exhaustive_and_unique() {
        let mut bytes: Vec<u8> = Opcode::ALL.iter().map(|op| op.to_byte()).collect();
        bytes.sort_unstable();
        bytes.dedup();
        assert_eq!(bytes.len(), Opcode::ALL.len());

        for op in Opcode::ALL {
            assert_eq!(Opcode::from_name(op.name()).ok(), Some(op));
        }
    }

    #[test]
    fn test_load_boolean_rejects_other_values() {
        assert_eq!(
            Instruction::load_boolean(1).ok(),
            Some(Instruction::LoadBoolean { value: true })
        );
        assert!(matches!(
            Instruction::load_boolean(2),
            Err(BytecodeError::InvalidBooleanLiteral(2))
        ));
    }

    #[test]
    fn test_load_number_literal() {
        assert_eq!(
            Instruction::load_number_literal("0x1F").ok(),
            Some(Instruction::LoadNumber { value: 31.0 })
        );
        assert_eq!(
            Instruction::load_number_literal("2.5e3").ok(),
            Some(Instruction::LoadNumber { value: 2500.0 })
        );
        assert!(Instruction::load_number_literal("inf").is_err());
        assert!(Instruction::load_number_literal("'5'").is_err());
        assert!(Instruction::load_number_literal("").is_err());
    }

    #[test]
    fn test_display() {
        let insn = Instruction::Postfix {
            identifier: "x".into(),
            post: true,
            incr: false,
        };
        assert_eq!(insn.to_string(), "POSTFIX(identifier=\"x\", post=true, incr=false)");
        assert_eq!(
            Instruction::load_object([("y", PropertyKind::Get)]).to_string(),
            "LOAD_OBJECT(props=[(\"y\", 'g')])"
        );
        assert_eq!(
            Instruction::JumpIfTrue { target: Target::position(4) }.to_string(),
            "JUMP_IF_TRUE(label=@4)"
        );
    }
}
