//! Operator and property-kind operands

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unary operators dispatched by `UNARY_OP`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOperator {
    /// `+x`
    Plus,
    /// `-x`
    Minus,
    /// `!x`
    Not,
    /// `~x`
    BitNot,
    /// `void x`
    Void,
    /// `typeof x` on an already evaluated value
    TypeOf,
}

impl UnaryOperator {
    /// All unary operators
    pub const ALL: [UnaryOperator; 6] = [
        Self::Plus,
        Self::Minus,
        Self::Not,
        Self::BitNot,
        Self::Void,
        Self::TypeOf,
    ];

    /// Source symbol
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Not => "!",
            Self::BitNot => "~",
            Self::Void => "void",
            Self::TypeOf => "typeof",
        }
    }

    /// Parse a source symbol
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.symbol() == symbol)
    }
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Binary operators dispatched by `BINARY_OP` and the compound stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOperator {
    /// `+` (numeric addition or string concatenation)
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
    /// `<<`
    Shl,
    /// `>>`
    Shr,
    /// `>>>`
    UShr,
    /// `&`
    BitAnd,
    /// `|`
    BitOr,
    /// `^`
    BitXor,
    /// `==`
    Eq,
    /// `!=`
    NotEq,
    /// `===`
    StrictEq,
    /// `!==`
    StrictNotEq,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `in`
    In,
    /// `instanceof`
    InstanceOf,
}

impl BinaryOperator {
    /// All binary operators
    pub const ALL: [BinaryOperator; 21] = [
        Self::Add,
        Self::Sub,
        Self::Mul,
        Self::Div,
        Self::Mod,
        Self::Shl,
        Self::Shr,
        Self::UShr,
        Self::BitAnd,
        Self::BitOr,
        Self::BitXor,
        Self::Eq,
        Self::NotEq,
        Self::StrictEq,
        Self::StrictNotEq,
        Self::Lt,
        Self::Le,
        Self::Gt,
        Self::Ge,
        Self::In,
        Self::InstanceOf,
    ];

    /// Source symbol
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::UShr => ">>>",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::StrictEq => "===",
            Self::StrictNotEq => "!==",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::In => "in",
            Self::InstanceOf => "instanceof",
        }
    }

    /// Parse a source symbol
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.symbol() == symbol)
    }

    /// Whether swapping the operands can never change the result
    pub const fn is_commutative(self) -> bool {
        matches!(
            self,
            Self::Mul
                | Self::BitAnd
                | Self::BitOr
                | Self::BitXor
                | Self::Eq
                | Self::NotEq
                | Self::StrictEq
                | Self::StrictNotEq
        )
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Kind of an object-literal entry, used only by `LOAD_OBJECT`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyKind {
    /// Plain data property (`i`)
    #[serde(rename = "i")]
    Init,
    /// Getter half of an accessor (`g`)
    #[serde(rename = "g")]
    Get,
    /// Setter half of an accessor (`s`)
    #[serde(rename = "s")]
    Set,
}

impl PropertyKind {
    /// Compact one-letter code
    pub const fn code(self) -> char {
        match self {
            Self::Init => 'i',
            Self::Get => 'g',
            Self::Set => 's',
        }
    }

    /// Parse the one-letter code
    pub const fn from_code(code: char) -> Option<Self> {
        match code {
            'i' => Some(Self::Init),
            'g' => Some(Self::Get),
            's' => Some(Self::Set),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_symbols() {
        assert_eq!(BinaryOperator::from_symbol(">>>"), Some(BinaryOperator::UShr));
        assert_eq!(BinaryOperator::from_symbol("instanceof"), Some(BinaryOperator::InstanceOf));
        assert_eq!(BinaryOperator::from_symbol("**"), None);
        assert_eq!(UnaryOperator::from_symbol("typeof"), Some(UnaryOperator::TypeOf));
    }

    #[test]
    fn test_commutativity() {
        assert!(BinaryOperator::Mul.is_commutative());
        assert!(!BinaryOperator::Add.is_commutative());
        assert!(!BinaryOperator::Sub.is_commutative());
    }

    #[test]
    fn test_property_kind_codes() {
        for kind in [PropertyKind::Init, PropertyKind::Get, PropertyKind::Set] {
            assert_eq!(PropertyKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(PropertyKind::from_code('x'), None);
        assert_eq!(serde_json::to_string(&PropertyKind::Get).ok().as_deref(), Some("\"g\""));
    }
}
