//! Property access
//!
//! Reads walk the prototype chain and run getters; writes run setters found
//! on the chain and otherwise create or overwrite an own data property.
//! Primitive bases read through their prototype and ignore writes.

use std::sync::Arc;

use crate::call::call_function;
use crate::convert::{to_object, to_string};
use crate::error::{VmError, VmResult};
use crate::object::{PropertyDescriptor, PropertyKey};
use crate::realm::Realm;
use crate::value::Value;

/// `base[key]`
pub fn get_member(base: &Value, key: &Value, realm: &Arc<Realm>) -> VmResult<Value> {
    get(base, &property_key(key), realm)
}

/// `base.name`
pub fn get_member_dot(base: &Value, name: &str, realm: &Arc<Realm>) -> VmResult<Value> {
    get(base, &PropertyKey::string(name), realm)
}

/// `base[key] = value`
pub fn put_member(base: &Value, key: &Value, value: Value, realm: &Arc<Realm>) -> VmResult<()> {
    set(base, property_key(key), value, realm)
}

/// `base.name = value`
pub fn put(base: &Value, name: &str, value: Value, realm: &Arc<Realm>) -> VmResult<()> {
    set(base, PropertyKey::string(name), value, realm)
}

/// `delete base[key]`
pub fn delete_member(base: &Value, key: &Value, realm: &Arc<Realm>) -> VmResult<bool> {
    let key = property_key(key);
    let obj = to_object(base, realm)?;
    Ok(obj.as_object().is_some_and(|o| o.delete(&key)))
}

/// Convert a key value with ToString
pub fn property_key(key: &Value) -> PropertyKey {
    match key {
        Value::Number(n) if *n >= 0.0 && n.fract() == 0.0 && *n < f64::from(u32::MAX) => {
            PropertyKey::Index(*n as u32)
        }
        _ => PropertyKey::from_js_string(to_string(key)),
    }
}

/// Read a property of any value
pub fn get(base: &Value, key: &PropertyKey, realm: &Arc<Realm>) -> VmResult<Value> {
    let desc = match base {
        Value::Undefined | Value::Null => {
            return Err(VmError::type_error(format!(
                "Cannot read property '{}' of {}",
                key.to_js_string(),
                to_string(base)
            )));
        }
        Value::String(s) => {
            if matches!(key, PropertyKey::String(name) if name.eq_str("length")) {
                return Ok(Value::number(s.len() as f64));
            }
            if let PropertyKey::Index(i) = key {
                if let Some(unit) = s.char_at(*i as usize) {
                    return Ok(Value::String(unit));
                }
            }
            realm.string_prototype().find_property(key)
        }
        Value::Number(_) => realm.number_prototype().find_property(key),
        Value::Boolean(_) => realm.boolean_prototype().find_property(key),
        Value::Object(obj) | Value::Array(obj) => obj.find_property(key),
        Value::Function(func) => func.object().find_property(key),
    };

    match desc {
        None => Ok(Value::undefined()),
        Some(PropertyDescriptor::Data(value)) => Ok(value),
        Some(PropertyDescriptor::Accessor { get: Some(getter), .. }) => {
            call_function(&getter, base.clone(), &[], realm)
        }
        Some(PropertyDescriptor::Accessor { get: None, .. }) => Ok(Value::undefined()),
    }
}

/// Write a property of any value
pub fn set(base: &Value, key: PropertyKey, value: Value, realm: &Arc<Realm>) -> VmResult<()> {
    let obj = match base {
        Value::Undefined | Value::Null => {
            return Err(VmError::type_error(format!(
                "Cannot set property '{}' of {}",
                key.to_js_string(),
                to_string(base)
            )));
        }
        Value::Boolean(_) | Value::Number(_) | Value::String(_) => return Ok(()),
        Value::Object(obj) | Value::Array(obj) => obj,
        Value::Function(func) => func.object(),
    };

    match obj.find_property(&key) {
        Some(PropertyDescriptor::Accessor { set: Some(setter), .. }) => {
            call_function(&setter, base.clone(), &[value], realm).map(|_| ())
        }
        Some(PropertyDescriptor::Accessor { set: None, .. }) => Ok(()),
        _ => obj.set(key, value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_of_nullish_names_property() {
        let realm = Realm::new();
        let err = get_member_dot(&Value::null(), "x", &realm).unwrap_err();
        assert_eq!(err.to_string(), "TypeError: Cannot read property 'x' of null");
        let err = get_member(&Value::undefined(), &Value::number(3.0), &realm).unwrap_err();
        assert_eq!(err.to_string(), "TypeError: Cannot read property '3' of undefined");
    }

    #[test]
    fn test_string_members() {
        let realm = Realm::new();
        let s = Value::string("abc");
        assert_eq!(get_member_dot(&s, "length", &realm).unwrap(), Value::number(3.0));
        assert_eq!(get_member(&s, &Value::number(1.0), &realm).unwrap(), Value::string("b"));
        assert_eq!(get_member(&s, &Value::number(9.0), &realm).unwrap(), Value::undefined());
    }

    #[test]
    fn test_primitive_write_is_ignored() {
        let realm = Realm::new();
        put(&Value::number(1.0), "x", Value::null(), &realm).unwrap();
        let err = put(&Value::undefined(), "x", Value::null(), &realm).unwrap_err();
        assert_eq!(err.to_string(), "TypeError: Cannot set property 'x' of undefined");
    }

    #[test]
    fn test_array_members() {
        let realm = Realm::new();
        let arr = realm.new_array(vec![Value::number(1.0)]);
        put_member(&arr, &Value::number(2.0), Value::number(3.0), &realm).unwrap();
        assert_eq!(get_member_dot(&arr, "length", &realm).unwrap(), Value::number(3.0));
        assert_eq!(get_member(&arr, &Value::string("2"), &realm).unwrap(), Value::number(3.0));
    }

    #[test]
    fn test_native_accessors() {
        let realm = Realm::new();
        let obj = realm.new_object();
        let getter = realm.new_native_function("get", false, |this, _, realm| {
            get_member_dot(this, "_v", realm)
        });
        let setter = realm.new_native_function("set", false, |this, args, realm| {
            let v = args.first().cloned().unwrap_or_default();
            put(this, "_v", v, realm)?;
            Ok(Value::undefined())
        });
        let storage = obj.as_object().unwrap();
        storage.define_getter("v".into(), getter);
        storage.define_setter("v".into(), setter);

        put(&obj, "v", Value::number(9.0), &realm).unwrap();
        assert_eq!(get_member_dot(&obj, "v", &realm).unwrap(), Value::number(9.0));
        assert_eq!(storage.get_data("_v"), Some(Value::number(9.0)));
    }

    #[test]
    fn test_delete_member() {
        let realm = Realm::new();
        let obj = realm.new_object();
        put(&obj, "x", Value::null(), &realm).unwrap();
        assert!(delete_member(&obj, &Value::string("x"), &realm).unwrap());
        assert_eq!(get_member_dot(&obj, "x", &realm).unwrap(), Value::undefined());
        assert!(delete_member(&Value::number(1.0), &Value::string("x"), &realm).unwrap());
        assert!(!delete_member(&Value::string("ab"), &Value::string("length"), &realm).unwrap());
        assert!(delete_member(&Value::null(), &Value::string("x"), &realm).is_err());
    }
}
