//! Unary and binary operator tables

use std::sync::Arc;

use heron_bytecode::{BinaryOperator, UnaryOperator};

use crate::convert::{to_boolean, to_int32, to_number, to_primitive, to_string, to_uint32};
use crate::error::{VmError, VmResult};
use crate::member::{get_member_dot, property_key};
use crate::realm::Realm;
use crate::value::Value;

/// Apply a unary operator
pub fn unary_operation(op: UnaryOperator, value: &Value) -> Value {
    match op {
        UnaryOperator::Plus => Value::number(to_number(value)),
        UnaryOperator::Minus => Value::number(-to_number(value)),
        UnaryOperator::Not => Value::boolean(!to_boolean(value)),
        UnaryOperator::BitNot => Value::number(f64::from(!to_int32(to_number(value)))),
        UnaryOperator::Void => Value::undefined(),
        UnaryOperator::TypeOf => Value::string(value.type_of()),
    }
}

/// Apply a binary operator: `op(left, right)`
pub fn binary_operation(
    op: BinaryOperator,
    left: &Value,
    right: &Value,
    realm: &Arc<Realm>,
) -> VmResult<Value> {
    let result = match op {
        BinaryOperator::Add => add(left, right),
        BinaryOperator::Sub => Value::number(to_number(left) - to_number(right)),
        BinaryOperator::Mul => Value::number(to_number(left) * to_number(right)),
        BinaryOperator::Div => Value::number(to_number(left) / to_number(right)),
        BinaryOperator::Mod => Value::number(to_number(left) % to_number(right)),
        BinaryOperator::Shl => {
            let shift = to_uint32(to_number(right)) & 31;
            Value::number(f64::from(to_int32(to_number(left)).wrapping_shl(shift)))
        }
        BinaryOperator::Shr => {
            let shift = to_uint32(to_number(right)) & 31;
            Value::number(f64::from(to_int32(to_number(left)) >> shift))
        }
        BinaryOperator::UShr => {
            let shift = to_uint32(to_number(right)) & 31;
            Value::number(f64::from(to_uint32(to_number(left)) >> shift))
        }
        BinaryOperator::BitAnd => int32_op(left, right, |a, b| a & b),
        BinaryOperator::BitOr => int32_op(left, right, |a, b| a | b),
        BinaryOperator::BitXor => int32_op(left, right, |a, b| a ^ b),
        BinaryOperator::Eq => Value::boolean(abstract_equals(left, right)),
        BinaryOperator::NotEq => Value::boolean(!abstract_equals(left, right)),
        BinaryOperator::StrictEq => Value::boolean(strict_equals(left, right)),
        BinaryOperator::StrictNotEq => Value::boolean(!strict_equals(left, right)),
        BinaryOperator::Lt => Value::boolean(less_than(left, right).unwrap_or(false)),
        BinaryOperator::Gt => Value::boolean(less_than(right, left).unwrap_or(false)),
        BinaryOperator::Le => Value::boolean(less_than(right, left).is_some_and(|lt| !lt)),
        BinaryOperator::Ge => Value::boolean(less_than(left, right).is_some_and(|lt| !lt)),
        BinaryOperator::In => return has_property(left, right),
        BinaryOperator::InstanceOf => return instance_of(left, right, realm),
    };
    Ok(result)
}

fn int32_op(left: &Value, right: &Value, f: impl Fn(i32, i32) -> i32) -> Value {
    Value::number(f64::from(f(
        to_int32(to_number(left)),
        to_int32(to_number(right)),
    )))
}

fn add(left: &Value, right: &Value) -> Value {
    let left = to_primitive(left);
    let right = to_primitive(right);
    match (&left, &right) {
        (Value::String(a), b) => Value::String(a.concat(&to_string(b))),
        (a, Value::String(b)) => Value::String(to_string(a).concat(b)),
        _ => Value::number(to_number(&left) + to_number(&right)),
    }
}

/// `===`
pub fn strict_equals(left: &Value, right: &Value) -> bool {
    left == right
}

/// `==`
pub fn abstract_equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => true,
        (Value::Undefined | Value::Null, _) | (_, Value::Undefined | Value::Null) => false,
        (Value::Number(a), Value::String(_)) => *a == to_number(right),
        (Value::String(_), Value::Number(b)) => to_number(left) == *b,
        (Value::Boolean(_), _) => abstract_equals(&Value::number(to_number(left)), right),
        (_, Value::Boolean(_)) => abstract_equals(left, &Value::number(to_number(right))),
        (Value::Number(_) | Value::String(_), _) if right.is_reference() => {
            abstract_equals(left, &to_primitive(right))
        }
        (_, Value::Number(_) | Value::String(_)) if left.is_reference() => {
            abstract_equals(&to_primitive(left), right)
        }
        _ => strict_equals(left, right),
    }
}

/// Abstract relational comparison `left < right`; `None` when undefined
/// (a NaN operand)
fn less_than(left: &Value, right: &Value) -> Option<bool> {
    let left = to_primitive(left);
    let right = to_primitive(right);
    if let (Value::String(a), Value::String(b)) = (&left, &right) {
        return Some(a < b);
    }
    let a = to_number(&left);
    let b = to_number(&right);
    if a.is_nan() || b.is_nan() {
        return None;
    }
    Some(a < b)
}

fn has_property(key: &Value, target: &Value) -> VmResult<Value> {
    let Some(obj) = target.as_object() else {
        return Err(VmError::type_error(format!(
            "Cannot use 'in' operator to search for '{}' in {}",
            to_string(key),
            to_string(target)
        )));
    };
    Ok(Value::boolean(obj.has_property(&property_key(key))))
}

fn instance_of(value: &Value, ctor: &Value, realm: &Arc<Realm>) -> VmResult<Value> {
    if !ctor.is_function() {
        return Err(VmError::type_error(
            "Right-hand side of 'instanceof' is not callable",
        ));
    }
    let Some(obj) = value.as_object() else {
        return Ok(Value::boolean(false));
    };
    let prototype = get_member_dot(ctor, "prototype", realm)?;
    let Some(prototype) = prototype.as_object() else {
        return Err(VmError::type_error(
            "Function has non-object prototype in instanceof check",
        ));
    };

    let mut next = obj.prototype();
    while let Some(current) = next {
        if Arc::ptr_eq(&current, prototype) {
            return Ok(Value::boolean(true));
        }
        next = current.prototype();
    }
    Ok(Value::boolean(false))
}
