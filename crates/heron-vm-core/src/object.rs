//! JavaScript objects
//!
//! Objects keep an insertion-ordered property map and an optional prototype.
//! Arrays additionally keep a dense element store; `length` is derived from it.

use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::convert;
use crate::error::{VmError, VmResult};
use crate::string::JsString;
use crate::value::Value;

/// Largest length a dense element store may grow to
pub const MAX_DENSE_LENGTH: usize = 1 << 24;

/// Property key
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    /// String property key
    String(JsString),
    /// Integer index (canonical numeric string)
    Index(u32),
}

impl PropertyKey {
    /// Create a string property key, normalizing canonical indices
    pub fn string(s: &str) -> Self {
        Self::from_js_string(JsString::new(s))
    }

    /// Create from a JS string, normalizing canonical indices
    pub fn from_js_string(s: JsString) -> Self {
        match s.as_array_index() {
            Some(index) => Self::Index(index),
            None => Self::String(s),
        }
    }

    /// Create an index property key
    pub fn index(i: u32) -> Self {
        Self::Index(i)
    }

    /// The key as a JS string
    pub fn to_js_string(&self) -> JsString {
        match self {
            Self::String(s) => s.clone(),
            Self::Index(i) => JsString::new(&i.to_string()),
        }
    }

    fn is_length(&self) -> bool {
        matches!(self, Self::String(s) if s.eq_str("length"))
    }
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        Self::string(s)
    }
}

impl From<JsString> for PropertyKey {
    fn from(s: JsString) -> Self {
        Self::from_js_string(s)
    }
}

impl From<u32> for PropertyKey {
    fn from(i: u32) -> Self {
        Self::Index(i)
    }
}

/// Own property descriptor
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyDescriptor {
    /// Plain value
    Data(Value),
    /// Getter/setter pair; either half may be absent
    Accessor {
        /// Getter function
        get: Option<Value>,
        /// Setter function
        set: Option<Value>,
    },
}

/// Internal object class
#[derive(Clone, Debug, PartialEq)]
pub enum ObjectClass {
    /// Plain object
    Ordinary,
    /// Array exotic object
    Array,
    /// Property storage of a function
    Function,
    /// Error instance
    Error,
    /// RegExp instance (pattern kept as source text)
    RegExp,
    /// Wrapper created by `to_object`, keeps `[[PrimitiveValue]]`
    Primitive(Value),
}

struct ObjectData {
    prototype: Option<Arc<JsObject>>,
    class: ObjectClass,
    properties: IndexMap<PropertyKey, PropertyDescriptor>,
    elements: Vec<Value>,
}

/// A JavaScript object
pub struct JsObject {
    data: RwLock<ObjectData>,
}

impl JsObject {
    /// Create a new ordinary object
    pub fn new(prototype: Option<Arc<JsObject>>) -> Self {
        Self::with_class(prototype, ObjectClass::Ordinary)
    }

    /// Create an object of the given class
    pub fn with_class(prototype: Option<Arc<JsObject>>, class: ObjectClass) -> Self {
        Self {
            data: RwLock::new(ObjectData {
                prototype,
                class,
                properties: IndexMap::new(),
                elements: Vec::new(),
            }),
        }
    }

    /// Create an array with the given elements
    pub fn array(prototype: Option<Arc<JsObject>>, elements: Vec<Value>) -> Self {
        let obj = Self::with_class(prototype, ObjectClass::Array);
        obj.data.write().elements = elements;
        obj
    }

    /// Get prototype
    pub fn prototype(&self) -> Option<Arc<JsObject>> {
        self.data.read().prototype.clone()
    }

    /// Set prototype, refusing to create a cycle
    pub fn set_prototype(self: &Arc<Self>, prototype: Option<Arc<JsObject>>) -> bool {
        let mut next = prototype.clone();
        while let Some(obj) = next {
            if Arc::ptr_eq(&obj, self) {
                return false;
            }
            next = obj.prototype();
        }
        self.data.write().prototype = prototype;
        true
    }

    /// Internal class
    pub fn class(&self) -> ObjectClass {
        self.data.read().class.clone()
    }

    /// Check if array
    pub fn is_array(&self) -> bool {
        matches!(self.data.read().class, ObjectClass::Array)
    }

    /// `[[PrimitiveValue]]` of a wrapper object
    pub fn primitive_value(&self) -> Option<Value> {
        match &self.data.read().class {
            ObjectClass::Primitive(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// Array length (0 for non-arrays)
    pub fn len(&self) -> usize {
        self.data.read().elements.len()
    }

    /// Check if the element store is empty
    pub fn is_empty(&self) -> bool {
        self.data.read().elements.is_empty()
    }

    /// Snapshot of the element store
    pub fn elements(&self) -> Vec<Value> {
        self.data.read().elements.clone()
    }

    /// Get own property
    pub fn get_own_property(&self, key: &PropertyKey) -> Option<PropertyDescriptor> {
        let data = self.data.read();
        match &data.class {
            ObjectClass::Array => {
                if key.is_length() {
                    return Some(PropertyDescriptor::Data(Value::number(
                        data.elements.len() as f64,
                    )));
                }
                if let PropertyKey::Index(i) = key {
                    if let Some(value) = data.elements.get(*i as usize) {
                        return Some(PropertyDescriptor::Data(value.clone()));
                    }
                }
            }
            ObjectClass::Primitive(Value::String(s)) => {
                if key.is_length() {
                    return Some(PropertyDescriptor::Data(Value::number(s.len() as f64)));
                }
                if let PropertyKey::Index(i) = key {
                    if let Some(unit) = s.char_at(*i as usize) {
                        return Some(PropertyDescriptor::Data(Value::String(unit)));
                    }
                }
            }
            _ => {}
        }
        data.properties.get(key).cloned()
    }

    /// Look up a property along the prototype chain
    pub fn find_property(&self, key: &PropertyKey) -> Option<PropertyDescriptor> {
        if let Some(desc) = self.get_own_property(key) {
            return Some(desc);
        }
        let mut next = self.prototype();
        while let Some(obj) = next {
            if let Some(desc) = obj.get_own_property(key) {
                return Some(desc);
            }
            next = obj.prototype();
        }
        None
    }

    /// Check own property
    pub fn has_own_property(&self, key: &PropertyKey) -> bool {
        self.get_own_property(key).is_some()
    }

    /// Check property along the prototype chain
    pub fn has_property(&self, key: &PropertyKey) -> bool {
        self.find_property(key).is_some()
    }

    /// Data value of a property along the chain, without running getters
    pub fn get_data(&self, key: impl Into<PropertyKey>) -> Option<Value> {
        match self.find_property(&key.into())? {
            PropertyDescriptor::Data(value) => Some(value),
            PropertyDescriptor::Accessor { .. } => None,
        }
    }

    /// Create or overwrite an own data property
    ///
    /// Array indices land in the element store and `length` writes truncate
    /// or extend it.
    pub fn set(&self, key: PropertyKey, value: Value) -> VmResult<()> {
        if key.is_length() && self.is_array() {
            // converted before locking: the new length may be this array
            let len = array_length(&value)?;
            self.data.write().elements.resize(len, Value::undefined());
            return Ok(());
        }

        let mut data = self.data.write();
        if matches!(data.class, ObjectClass::Array) {
            if let PropertyKey::Index(i) = key {
                let index = i as usize;
                if index < data.elements.len() {
                    data.elements[index] = value;
                    return Ok(());
                }
                if index >= MAX_DENSE_LENGTH {
                    return Err(VmError::range_error("Invalid array length"));
                }
                data.elements.resize(index, Value::undefined());
                data.elements.push(value);
                return Ok(());
            }
        }
        data.properties.insert(key, PropertyDescriptor::Data(value));
        Ok(())
    }

    /// Define an own data property, bypassing array element and `length`
    /// handling
    pub fn define_data(&self, key: impl Into<PropertyKey>, value: Value) {
        self.data
            .write()
            .properties
            .insert(key.into(), PropertyDescriptor::Data(value));
    }

    /// Define an own getter, keeping an existing setter half
    pub fn define_getter(&self, key: PropertyKey, getter: Value) {
        self.define_accessor_half(key, Some(getter), None);
    }

    /// Define an own setter, keeping an existing getter half
    pub fn define_setter(&self, key: PropertyKey, setter: Value) {
        self.define_accessor_half(key, None, Some(setter));
    }

    fn define_accessor_half(&self, key: PropertyKey, get: Option<Value>, set: Option<Value>) {
        let mut data = self.data.write();
        let merged = match data.properties.get(&key) {
            Some(PropertyDescriptor::Accessor {
                get: old_get,
                set: old_set,
            }) => PropertyDescriptor::Accessor {
                get: get.or_else(|| old_get.clone()),
                set: set.or_else(|| old_set.clone()),
            },
            _ => PropertyDescriptor::Accessor { get, set },
        };
        data.properties.insert(key, merged);
    }

    /// Delete an own property
    ///
    /// Array elements are reset to `undefined` without changing `length`;
    /// the derived `length` of arrays and string wrappers cannot be deleted.
    pub fn delete(&self, key: &PropertyKey) -> bool {
        let mut data = self.data.write();
        let class = data.class.clone();
        match class {
            ObjectClass::Array | ObjectClass::Primitive(Value::String(_)) if key.is_length() => {
                return false;
            }
            ObjectClass::Primitive(Value::String(s)) => {
                if let PropertyKey::Index(i) = key {
                    if (*i as usize) < s.len() {
                        return false;
                    }
                }
            }
            ObjectClass::Array => {
                if let PropertyKey::Index(i) = key {
                    if let Some(slot) = data.elements.get_mut(*i as usize) {
                        *slot = Value::undefined();
                        return true;
                    }
                }
            }
            _ => {}
        }
        data.properties.shift_remove(key);
        true
    }

    /// Own property keys: element indices first, then named properties in
    /// insertion order
    pub fn keys(&self) -> Vec<PropertyKey> {
        let data = self.data.read();
        (0..data.elements.len() as u32)
            .map(PropertyKey::Index)
            .chain(data.properties.keys().cloned())
            .collect()
    }
}

fn array_length(value: &Value) -> VmResult<usize> {
    let number = convert::to_number(value);
    let len = convert::to_uint32(number);
    if f64::from(len) != number || len as usize > MAX_DENSE_LENGTH {
        return Err(VmError::range_error("Invalid array length"));
    }
    Ok(len as usize)
}

impl std::fmt::Debug for JsObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let data = self.data.read();
        f.debug_struct("JsObject")
            .field("class", &data.class)
            .field("properties", &data.properties.len())
            .field("elements", &data.elements.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prototype_chain_lookup() {
        let proto = Arc::new(JsObject::new(None));
        proto.set("inherited".into(), Value::number(1.0)).unwrap();
        let obj = JsObject::new(Some(proto));
        obj.set("own".into(), Value::number(2.0)).unwrap();

        assert_eq!(obj.get_data("own"), Some(Value::number(2.0)));
        assert_eq!(obj.get_data("inherited"), Some(Value::number(1.0)));
        assert!(!obj.has_own_property(&"inherited".into()));
        assert!(obj.has_property(&"inherited".into()));
        assert_eq!(obj.get_data("missing"), None);
    }

    #[test]
    fn test_define_data() {
        let obj = JsObject::new(None);
        obj.define_data("message", Value::string("boom"));
        obj.define_data("message", Value::string("bang"));
        assert_eq!(obj.get_data("message"), Some(Value::string("bang")));
        assert_eq!(obj.keys().len(), 1);

        let arr = JsObject::array(None, vec![Value::number(1.0)]);
        arr.define_data("tag", Value::null());
        assert_eq!(arr.get_data("tag"), Some(Value::null()));
        assert_eq!(arr.len(), 1);
    }

    #[test]
    fn test_prototype_cycle_rejected() {
        let a = Arc::new(JsObject::new(None));
        let b = Arc::new(JsObject::new(Some(a.clone())));
        assert!(!a.set_prototype(Some(b)));
    }

    #[test]
    fn test_array_elements_and_length() {
        let arr = JsObject::array(None, vec![Value::number(1.0), Value::number(2.0)]);
        assert_eq!(arr.get_data("length"), Some(Value::number(2.0)));
        assert_eq!(arr.get_data("1"), Some(Value::number(2.0)));

        arr.set("4".into(), Value::number(5.0)).unwrap();
        assert_eq!(arr.len(), 5);
        assert_eq!(arr.get_data(2u32), Some(Value::undefined()));

        arr.set("length".into(), Value::number(1.0)).unwrap();
        assert_eq!(arr.elements(), vec![Value::number(1.0)]);

        assert!(matches!(
            arr.set("length".into(), Value::number(-1.0)),
            Err(VmError::RangeError(_))
        ));
        assert!(!arr.delete(&"length".into()));
    }

    #[test]
    fn test_accessor_halves_merge() {
        let obj = JsObject::new(None);
        obj.define_getter("y".into(), Value::number(1.0));
        obj.define_setter("y".into(), Value::number(2.0));
        assert_eq!(
            obj.get_own_property(&"y".into()),
            Some(PropertyDescriptor::Accessor {
                get: Some(Value::number(1.0)),
                set: Some(Value::number(2.0)),
            })
        );
        assert_eq!(obj.get_data("y"), None);
    }

    #[test]
    fn test_string_wrapper() {
        let obj = JsObject::with_class(None, ObjectClass::Primitive(Value::string("hi")));
        assert_eq!(obj.get_data("length"), Some(Value::number(2.0)));
        assert_eq!(obj.get_data(1u32), Some(Value::string("i")));
        assert!(!obj.delete(&PropertyKey::index(0)));
        assert!(obj.delete(&"other".into()));
    }

    #[test]
    fn test_keys_order() {
        let obj = JsObject::new(None);
        obj.set("b".into(), Value::null()).unwrap();
        obj.set("a".into(), Value::null()).unwrap();
        obj.set("2".into(), Value::null()).unwrap();
        assert_eq!(
            obj.keys(),
            vec![PropertyKey::string("b"), PropertyKey::string("a"), PropertyKey::Index(2)]
        );
    }
}
