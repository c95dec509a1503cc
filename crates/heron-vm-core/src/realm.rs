//! Realm: global object, intrinsic prototypes and object factories.
//!
//! A realm also carries the interpreter configuration and the execution
//! state shared by nested drivers (interrupt flag, live frame count).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::config::InterpreterConfig;
use crate::convert::{to_object, to_string};
use crate::error::{ErrorKind, VmError, VmResult};
use crate::function::{FunctionKind, InterpretedFunction, JsFunction};
use crate::object::{JsObject, ObjectClass, PropertyKey};
use crate::scope::Scope;
use crate::string::JsString;
use crate::value::Value;

const REGEXP_FLAGS: &str = "dgimsuy";

/// Execution realm
pub struct Realm {
    global: Arc<JsObject>,
    global_scope: Scope,
    object_prototype: Arc<JsObject>,
    function_prototype: Arc<JsObject>,
    array_prototype: Arc<JsObject>,
    string_prototype: Arc<JsObject>,
    number_prototype: Arc<JsObject>,
    boolean_prototype: Arc<JsObject>,
    regexp_prototype: Arc<JsObject>,
    error_prototypes: Vec<Arc<JsObject>>,
    config: InterpreterConfig,
    interrupt_flag: Arc<AtomicBool>,
    frame_count: AtomicUsize,
}

impl Realm {
    /// Create a realm with default configuration
    pub fn new() -> Arc<Self> {
        Self::with_config(InterpreterConfig::default())
    }

    /// Create a realm with custom configuration
    pub fn with_config(config: InterpreterConfig) -> Arc<Self> {
        let object_prototype = Arc::new(JsObject::new(None));
        let proto = || Arc::new(JsObject::new(Some(object_prototype.clone())));

        let function_prototype = proto();
        let array_prototype = proto();
        let string_prototype = proto();
        let number_prototype = proto();
        let boolean_prototype = proto();
        let regexp_prototype = proto();

        let base_error = proto();
        let error_prototypes: Vec<Arc<JsObject>> = ErrorKind::ALL
            .iter()
            .map(|kind| {
                let p = match kind {
                    ErrorKind::Error => base_error.clone(),
                    _ => Arc::new(JsObject::new(Some(base_error.clone()))),
                };
                p.define_data("name", Value::string(kind.name()));
                if *kind == ErrorKind::Error {
                    p.define_data("message", Value::string(""));
                }
                p
            })
            .collect();

        let global = proto();
        let global_scope = Scope::global(global.clone());

        let realm = Arc::new(Self {
            global,
            global_scope,
            object_prototype,
            function_prototype,
            array_prototype,
            string_prototype,
            number_prototype,
            boolean_prototype,
            regexp_prototype,
            error_prototypes,
            config,
            interrupt_flag: Arc::new(AtomicBool::new(false)),
            frame_count: AtomicUsize::new(0),
        });
        realm.install_globals();
        realm
    }

    fn install_globals(&self) {
        let define = |name: &str, value: Value| {
            self.global.define_data(name, value);
        };
        define("undefined", Value::undefined());
        define("NaN", Value::number(f64::NAN));
        define("Infinity", Value::number(f64::INFINITY));

        let object_ctor = self.new_native_function("Object", true, |_, args, realm| {
            match args.first() {
                Some(value) if !value.is_nullish() => to_object(value, realm),
                _ => Ok(realm.new_object()),
            }
        });
        self.link_constructor(&object_ctor, &self.object_prototype);
        define("Object", object_ctor);

        let array_ctor = self.new_native_function("Array", true, |_, args, realm| {
            Ok(realm.new_array(args.to_vec()))
        });
        self.link_constructor(&array_ctor, &self.array_prototype);
        define("Array", array_ctor);

        for kind in ErrorKind::ALL {
            let ctor = self.new_native_function(kind.name(), true, move |_, args, realm| {
                let message = match args.first() {
                    Some(value) if !value.is_undefined() => to_string(value).to_rust_string(),
                    _ => String::new(),
                };
                Ok(realm.new_error(kind, &message))
            });
            self.link_constructor(&ctor, self.error_prototype(kind));
            define(kind.name(), ctor);
        }
    }

    fn link_constructor(&self, ctor: &Value, prototype: &Arc<JsObject>) {
        if let Some(storage) = ctor.as_object() {
            storage.define_data("prototype", Value::Object(prototype.clone()));
        }
    }

    /// Interpreter configuration
    #[inline]
    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    /// The global object
    #[inline]
    pub fn global_object(&self) -> &Arc<JsObject> {
        &self.global
    }

    /// `this` at top level and for unqualified calls
    pub fn global_this(&self) -> Value {
        Value::Object(self.global.clone())
    }

    /// The global scope
    #[inline]
    pub fn global_scope(&self) -> &Scope {
        &self.global_scope
    }

    /// `Object.prototype`
    #[inline]
    pub fn object_prototype(&self) -> &Arc<JsObject> {
        &self.object_prototype
    }

    /// `Function.prototype`
    #[inline]
    pub fn function_prototype(&self) -> &Arc<JsObject> {
        &self.function_prototype
    }

    /// `Array.prototype`
    #[inline]
    pub fn array_prototype(&self) -> &Arc<JsObject> {
        &self.array_prototype
    }

    /// `String.prototype`
    #[inline]
    pub fn string_prototype(&self) -> &Arc<JsObject> {
        &self.string_prototype
    }

    /// `Number.prototype`
    #[inline]
    pub fn number_prototype(&self) -> &Arc<JsObject> {
        &self.number_prototype
    }

    /// `Boolean.prototype`
    #[inline]
    pub fn boolean_prototype(&self) -> &Arc<JsObject> {
        &self.boolean_prototype
    }

    /// `RegExp.prototype`
    #[inline]
    pub fn regexp_prototype(&self) -> &Arc<JsObject> {
        &self.regexp_prototype
    }

    /// Prototype of a native error kind
    pub fn error_prototype(&self, kind: ErrorKind) -> &Arc<JsObject> {
        &self.error_prototypes[kind.index()]
    }

    // ==================== Interruption ====================

    /// Get the interrupt flag (for external timeout/cancellation)
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupt_flag)
    }

    /// Check if execution was interrupted
    #[inline]
    pub fn is_interrupted(&self) -> bool {
        self.interrupt_flag.load(Ordering::Relaxed)
    }

    /// Request interruption of the running program
    pub fn interrupt(&self) {
        self.interrupt_flag.store(true, Ordering::Relaxed);
    }

    /// Clear the interrupt flag
    pub fn clear_interrupt(&self) {
        self.interrupt_flag.store(false, Ordering::Relaxed);
    }

    /// Frames live across all drivers running in this realm
    pub(crate) fn frame_count(&self) -> &AtomicUsize {
        &self.frame_count
    }

    // ==================== Factories ====================

    /// New ordinary object
    pub fn new_object(&self) -> Value {
        Value::Object(Arc::new(JsObject::new(Some(self.object_prototype.clone()))))
    }

    /// New dense array
    pub fn new_array(&self, elements: Vec<Value>) -> Value {
        Value::Array(Arc::new(JsObject::array(
            Some(self.array_prototype.clone()),
            elements,
        )))
    }

    /// New regexp object
    ///
    /// The pattern is kept as source text; flags must be distinct letters
    /// out of `dgimsuy`.
    pub fn new_regexp(&self, body: &str, flags: &str) -> VmResult<Value> {
        let mut seen = String::new();
        for flag in flags.chars() {
            if !REGEXP_FLAGS.contains(flag) || seen.contains(flag) {
                return Err(VmError::syntax_error(format!(
                    "Invalid regular expression flags '{}'",
                    flags
                )));
            }
            seen.push(flag);
        }

        let obj = JsObject::with_class(Some(self.regexp_prototype.clone()), ObjectClass::RegExp);
        obj.set("source".into(), Value::string(body))?;
        obj.set("flags".into(), Value::string(flags))?;
        obj.set("global".into(), Value::boolean(flags.contains('g')))?;
        obj.set("ignoreCase".into(), Value::boolean(flags.contains('i')))?;
        obj.set("multiline".into(), Value::boolean(flags.contains('m')))?;
        obj.set("lastIndex".into(), Value::number(0.0))?;
        Ok(Value::Object(Arc::new(obj)))
    }

    /// New error object with `message`; `name` comes from the prototype
    pub fn new_error(&self, kind: ErrorKind, message: &str) -> Value {
        let obj = JsObject::with_class(Some(self.error_prototype(kind).clone()), ObjectClass::Error);
        obj.define_data("message", Value::string(message));
        Value::Object(Arc::new(obj))
    }

    /// Wrapper object keeping `[[PrimitiveValue]]`
    pub fn new_primitive_wrapper(&self, value: Value) -> Value {
        let proto = match value {
            Value::String(_) => &self.string_prototype,
            Value::Number(_) => &self.number_prototype,
            Value::Boolean(_) => &self.boolean_prototype,
            _ => &self.object_prototype,
        };
        Value::Object(Arc::new(JsObject::with_class(
            Some(proto.clone()),
            ObjectClass::Primitive(value),
        )))
    }

    /// New host function
    pub fn new_native_function<F>(&self, name: &str, is_constructor: bool, f: F) -> Value
    where
        F: Fn(&Value, &[Value], &Arc<Realm>) -> VmResult<Value> + Send + Sync + 'static,
    {
        self.new_function(name, FunctionKind::Native(Arc::new(f)), is_constructor)
    }

    /// New closure over bytecode
    ///
    /// Constructors get a fresh `prototype` object.
    pub fn new_interpreted_function(
        &self,
        name: &str,
        body: InterpretedFunction,
        is_constructor: bool,
    ) -> Value {
        let func = self.new_function(name, FunctionKind::Interpreted(body), is_constructor);
        if is_constructor {
            if let Some(storage) = func.as_object() {
                storage.define_data("prototype", self.new_object());
            }
        }
        func
    }

    fn new_function(&self, name: &str, kind: FunctionKind, is_constructor: bool) -> Value {
        let object = Arc::new(JsObject::with_class(
            Some(self.function_prototype.clone()),
            ObjectClass::Function,
        ));
        object.define_data(PropertyKey::string("name"), Value::string(name));
        Value::Function(Arc::new(JsFunction::new(
            object,
            JsString::new(name),
            kind,
            is_constructor,
        )))
    }
}

impl std::fmt::Debug for Realm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Realm")
            .field("config", &self.config)
            .field("frames", &self.frame_count.load(Ordering::Relaxed))
            .finish()
    }
}
