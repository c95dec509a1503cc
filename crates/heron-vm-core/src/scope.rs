//! Lexical scopes
//!
//! A scope chain is a linked list of declarative binding maps ending in the
//! global scope, whose bindings live on the global object.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::error::{VmError, VmResult};
use crate::member;
use crate::object::{JsObject, PropertyKey};
use crate::realm::Realm;
use crate::value::Value;

struct ScopeNode {
    bindings: RwLock<FxHashMap<Box<str>, Value>>,
    parent: Option<Scope>,
    global: Arc<JsObject>,
}

/// A lexical scope, shared by every closure created inside it
#[derive(Clone)]
pub struct Scope(Arc<ScopeNode>);

impl Scope {
    /// Create the global scope backed by `global`
    pub fn global(global: Arc<JsObject>) -> Self {
        Self(Arc::new(ScopeNode {
            bindings: RwLock::new(FxHashMap::default()),
            parent: None,
            global,
        }))
    }

    /// Create a child scope
    pub fn child(&self) -> Self {
        Self(Arc::new(ScopeNode {
            bindings: RwLock::new(FxHashMap::default()),
            parent: Some(self.clone()),
            global: self.0.global.clone(),
        }))
    }

    /// Whether this is the global scope
    #[inline]
    pub fn is_global(&self) -> bool {
        self.0.parent.is_none()
    }

    /// The global object at the end of the chain
    #[inline]
    pub fn global_object(&self) -> &Arc<JsObject> {
        &self.0.global
    }

    /// Create or overwrite a binding in this scope
    pub fn declare(&self, name: &str, value: Value) -> VmResult<()> {
        if self.is_global() {
            return self.0.global.set(PropertyKey::string(name), value);
        }
        self.0.bindings.write().insert(name.into(), value);
        Ok(())
    }

    /// Innermost declarative scope holding `name`
    fn find_declarative(&self, name: &str) -> Option<&Scope> {
        let mut scope = self;
        loop {
            if scope.0.bindings.read().contains_key(name) {
                return Some(scope);
            }
            scope = scope.0.parent.as_ref()?;
        }
    }

    /// Whether `name` resolves anywhere on the chain
    pub fn has_binding(&self, name: &str) -> bool {
        self.find_declarative(name).is_some()
            || self.0.global.has_property(&PropertyKey::string(name))
    }

    /// Resolve an identifier; `None` when it is unresolvable
    pub fn try_get(&self, name: &str, realm: &Arc<Realm>) -> VmResult<Option<Value>> {
        if let Some(scope) = self.find_declarative(name) {
            return Ok(scope.0.bindings.read().get(name).cloned());
        }
        let key = PropertyKey::string(name);
        if !self.0.global.has_property(&key) {
            return Ok(None);
        }
        let global = Value::Object(self.0.global.clone());
        member::get(&global, &key, realm).map(Some)
    }

    /// Resolve an identifier, raising `ReferenceError` when unresolvable
    pub fn get(&self, name: &str, realm: &Arc<Realm>) -> VmResult<Value> {
        self.try_get(name, realm)?
            .ok_or_else(|| VmError::reference_error(format!("{} is not defined", name)))
    }

    /// Assign to an identifier
    ///
    /// Writes the innermost binding; an unresolvable name becomes a global
    /// property, or a `ReferenceError` in strict code.
    pub fn put(&self, name: &str, value: Value, strict: bool, realm: &Arc<Realm>) -> VmResult<()> {
        if let Some(scope) = self.find_declarative(name) {
            scope.0.bindings.write().insert(name.into(), value);
            return Ok(());
        }
        let key = PropertyKey::string(name);
        if strict && !self.0.global.has_property(&key) {
            return Err(VmError::reference_error(format!("{} is not defined", name)));
        }
        let global = Value::Object(self.0.global.clone());
        member::set(&global, key, value, realm)
    }

    /// `delete name`: declared bindings cannot be deleted, global properties
    /// can, unresolvable names report success
    pub fn delete(&self, name: &str) -> bool {
        if self.find_declarative(name).is_some() {
            return false;
        }
        let key = PropertyKey::string(name);
        if self.0.global.has_own_property(&key) {
            return self.0.global.delete(&key);
        }
        true
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("bindings", &self.0.bindings.read().len())
            .field("global", &self.is_global())
            .finish()
    }
}
