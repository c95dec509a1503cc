//! Type coercions
//!
//! The abstract conversions every instruction relies on. Reference values
//! convert with the default conversion of their class; no user-defined
//! `valueOf`/`toString` is consulted.

use std::sync::Arc;

use crate::error::{VmError, VmResult};
use crate::object::{JsObject, ObjectClass};
use crate::realm::Realm;
use crate::string::JsString;
use crate::value::Value;

/// ES ToBoolean
pub fn to_boolean(value: &Value) -> bool {
    match value {
        Value::Undefined | Value::Null => false,
        Value::Boolean(b) => *b,
        Value::Number(n) => !(*n == 0.0 || n.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Object(_) | Value::Array(_) | Value::Function(_) => true,
    }
}

/// ES ToNumber
pub fn to_number(value: &Value) -> f64 {
    match value {
        Value::Undefined => f64::NAN,
        Value::Null => 0.0,
        Value::Boolean(b) => f64::from(u8::from(*b)),
        Value::Number(n) => *n,
        Value::String(s) => string_to_number(&s.to_rust_string()),
        Value::Object(_) | Value::Array(_) | Value::Function(_) => to_number(&to_primitive(value)),
    }
}

/// StringToNumber: trimmed, empty is 0, radix prefixes, signed Infinity
pub fn string_to_number(text: &str) -> f64 {
    let trimmed = text.trim_matches(is_js_whitespace);
    if trimmed.is_empty() {
        return 0.0;
    }

    let lower = trimmed.to_ascii_lowercase();
    for (prefix, radix) in [("0x", 16), ("0o", 8), ("0b", 2)] {
        if let Some(digits) = lower.strip_prefix(prefix) {
            return parse_radix(digits, radix);
        }
    }

    let (sign, unsigned) = match trimmed.as_bytes()[0] {
        b'-' => (-1.0, &trimmed[1..]),
        b'+' => (1.0, &trimmed[1..]),
        _ => (1.0, trimmed),
    };
    if unsigned == "Infinity" {
        return sign * f64::INFINITY;
    }

    let well_formed = !unsigned.is_empty()
        && unsigned.bytes().any(|b| b.is_ascii_digit())
        && unsigned
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'));
    if !well_formed {
        return f64::NAN;
    }
    unsigned.parse::<f64>().map_or(f64::NAN, |n| sign * n)
}

fn parse_radix(digits: &str, radix: u32) -> f64 {
    if digits.is_empty() {
        return f64::NAN;
    }
    digits
        .chars()
        .try_fold(0f64, |acc, c| {
            c.to_digit(radix).map(|d| acc * f64::from(radix) + f64::from(d))
        })
        .unwrap_or(f64::NAN)
}

fn is_js_whitespace(c: char) -> bool {
    c.is_whitespace() || c == '\u{FEFF}'
}

/// ES2023 ToInt32 abstract operation.
pub fn to_int32(n: f64) -> i32 {
    to_uint32(n) as i32
}

/// ES2023 ToUint32 abstract operation.
pub fn to_uint32(n: f64) -> u32 {
    if n.is_nan() || n.is_infinite() || n == 0.0 {
        return 0;
    }
    n.trunc().rem_euclid(4_294_967_296.0) as u32
}

/// ES ToString
pub fn to_string(value: &Value) -> JsString {
    let mut seen = Vec::new();
    to_string_inner(value, &mut seen)
}

fn to_string_inner(value: &Value, seen: &mut Vec<*const JsObject>) -> JsString {
    match value {
        Value::Undefined => JsString::new("undefined"),
        Value::Null => JsString::new("null"),
        Value::Boolean(true) => JsString::new("true"),
        Value::Boolean(false) => JsString::new("false"),
        Value::Number(n) => JsString::new(&number_to_string(*n)),
        Value::String(s) => s.clone(),
        Value::Array(obj) => join_elements(obj, seen),
        Value::Function(func) => {
            JsString::new(&format!("function {}() {{ [native code] }}", func.name()))
        }
        Value::Object(obj) => match obj.class() {
            ObjectClass::Primitive(inner) => to_string_inner(&inner, seen),
            ObjectClass::Error => JsString::new(&error_summary(obj)),
            ObjectClass::RegExp => {
                let source = obj.get_data("source").map(|v| to_string(&v)).unwrap_or_default();
                let flags = obj.get_data("flags").map(|v| to_string(&v)).unwrap_or_default();
                JsString::new(&format!("/{}/{}", source, flags))
            }
            _ => JsString::new("[object Object]"),
        },
    }
}

fn join_elements(obj: &Arc<JsObject>, seen: &mut Vec<*const JsObject>) -> JsString {
    let ptr = Arc::as_ptr(obj);
    if seen.contains(&ptr) {
        return JsString::empty();
    }
    seen.push(ptr);
    let mut units: Vec<u16> = Vec::new();
    for (i, element) in obj.elements().iter().enumerate() {
        if i > 0 {
            units.push(u16::from(b','));
        }
        if !element.is_nullish() {
            units.extend_from_slice(to_string_inner(element, seen).units());
        }
    }
    seen.pop();
    JsString::from(units)
}

fn error_summary(obj: &JsObject) -> String {
    let name = obj
        .get_data("name")
        .map_or_else(|| "Error".to_string(), |v| to_string(&v).to_rust_string());
    let message = obj
        .get_data("message")
        .map(|v| to_string(&v).to_rust_string())
        .unwrap_or_default();
    match (name.is_empty(), message.is_empty()) {
        (_, true) => name,
        (true, false) => message,
        (false, false) => format!("{}: {}", name, message),
    }
}

/// Human-readable rendering used in error messages and logs
pub fn describe(value: &Value) -> String {
    to_string(value).to_rust_string()
}

/// Default ToPrimitive: references become their default string form,
/// wrappers unwrap to their primitive value
pub fn to_primitive(value: &Value) -> Value {
    match value {
        Value::Object(obj) => match obj.primitive_value() {
            Some(inner) => inner,
            None => Value::String(to_string(value)),
        },
        Value::Array(_) | Value::Function(_) => Value::String(to_string(value)),
        _ => value.clone(),
    }
}

/// ES ToObject
pub fn to_object(value: &Value, realm: &Realm) -> VmResult<Value> {
    match value {
        Value::Undefined | Value::Null => Err(VmError::type_error(format!(
            "Cannot convert {} to object",
            describe(value)
        ))),
        Value::Boolean(_) | Value::Number(_) | Value::String(_) => {
            Ok(realm.new_primitive_wrapper(value.clone()))
        }
        Value::Object(_) | Value::Array(_) | Value::Function(_) => Ok(value.clone()),
    }
}

/// Number::toString(10)
///
/// Shortest round-trip digits (via `ryu`), positioned the way JavaScript
/// prints them: plain notation for exponents in `[-7, 21)`, exponent
/// notation otherwise.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }

    let mut buffer = ryu::Buffer::new();
    let formatted = buffer.format_finite(n.abs());
    let (mantissa, exponent) = match formatted.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (formatted, 0),
    };
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));

    // value = 0.DIGITS * 10^point
    let mut digits: String = format!("{}{}", int_part, frac_part);
    let mut point = int_part.len() as i32 + exponent;
    let leading = digits.len() - digits.trim_start_matches('0').len();
    digits.drain(..leading);
    point -= leading as i32;
    let trimmed_len = digits.trim_end_matches('0').len();
    digits.truncate(trimmed_len);

    let k = digits.len() as i32;
    let sign = if n < 0.0 { "-" } else { "" };
    let body = if k <= point && point <= 21 {
        format!("{}{}", digits, "0".repeat((point - k) as usize))
    } else if 0 < point && point <= 21 {
        let (head, tail) = digits.split_at(point as usize);
        format!("{}.{}", head, tail)
    } else if -6 < point && point <= 0 {
        format!("0.{}{}", "0".repeat((-point) as usize), digits)
    } else {
        let e = point - 1;
        let exp_sign = if e < 0 { '-' } else { '+' };
        let (first, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{}e{}{}", first, exp_sign, e.abs())
        } else {
            format!("{}.{}e{}{}", first, rest, exp_sign, e.abs())
        }
    };
    format!("{}{}", sign, body)
}
