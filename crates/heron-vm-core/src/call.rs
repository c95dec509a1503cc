//! Call and construct protocols
//!
//! Native functions run immediately and their result is pushed onto the
//! caller's stack. Interpreted functions never run here: dispatch builds the
//! callee context and hands it to the driver as an `Invoke` signal.

use std::sync::Arc;

use crate::context::ExecutionContext;
use crate::error::{VmError, VmResult};
use crate::function::{FunctionKind, InterpretedFunction};
use crate::interpreter::Interpreter;
use crate::member::get_member_dot;
use crate::object::JsObject;
use crate::realm::Realm;
use crate::step::StepResult;
use crate::value::Value;

/// Call `callee` with `this` and `args` on behalf of the current frame
pub fn dispatch_call(
    ctx: &mut ExecutionContext,
    callee: &Value,
    this: Value,
    args: Vec<Value>,
) -> VmResult<StepResult> {
    let Some(func) = callee.as_function() else {
        return Err(VmError::type_error(format!(
            "{} is not a function",
            callee.type_name()
        )));
    };

    match func.kind() {
        FunctionKind::Native(native) => {
            let result = native(&this, &args, ctx.realm())?;
            ctx.push(result);
            Ok(StepResult::Continue)
        }
        FunctionKind::Interpreted(body) => {
            let context = bind_frame(body, this, &args, ctx.realm())?;
            Ok(StepResult::invoke(context, body.entry, None))
        }
    }
}

/// `new callee(...args)` on behalf of the current frame
pub fn construct(
    ctx: &mut ExecutionContext,
    callee: &Value,
    args: Vec<Value>,
) -> VmResult<StepResult> {
    let func = match callee.as_function() {
        Some(func) if func.is_constructor() => func,
        _ => {
            return Err(VmError::type_error(format!(
                "{} is not a constructor",
                callee.type_name()
            )));
        }
    };

    let realm = ctx.realm().clone();
    let receiver = allocate_receiver(callee, &realm)?;

    match func.kind() {
        FunctionKind::Native(native) => {
            let result = native(&receiver, &args, &realm)?;
            ctx.push(if result.is_reference() { result } else { receiver });
            Ok(StepResult::Continue)
        }
        FunctionKind::Interpreted(body) => {
            let context = bind_frame(body, receiver.clone(), &args, &realm)?;
            Ok(StepResult::invoke(context, body.entry, Some(receiver)))
        }
    }
}

/// Call a function to completion from host code or from inside an
/// instruction (getters, setters)
///
/// Interpreted functions run on a nested driver sharing the realm's call
/// depth and interrupt flag.
pub fn call_function(
    func: &Value,
    this: Value,
    args: &[Value],
    realm: &Arc<Realm>,
) -> VmResult<Value> {
    let Some(function) = func.as_function() else {
        return Err(VmError::type_error(format!(
            "{} is not a function",
            func.type_name()
        )));
    };

    match function.kind() {
        FunctionKind::Native(native) => native(&this, args, realm),
        FunctionKind::Interpreted(body) => {
            let context = bind_frame(body, this, args, realm)?;
            Interpreter::with_realm(realm.clone()).execute(context, body.entry, None)
        }
    }
}

/// Fresh callee context: child of the closure scope with `arguments` and
/// the parameters bound
fn bind_frame(
    body: &InterpretedFunction,
    this: Value,
    args: &[Value],
    realm: &Arc<Realm>,
) -> VmResult<ExecutionContext> {
    let scope = body.scope.child();
    scope.declare("arguments", realm.new_array(args.to_vec()))?;
    for (i, param) in body.params.iter().enumerate() {
        scope.declare(param, args.get(i).cloned().unwrap_or_default())?;
    }
    Ok(ExecutionContext::new(
        realm.clone(),
        body.program.clone(),
        scope,
        this,
        body.strict,
    ))
}

fn allocate_receiver(callee: &Value, realm: &Arc<Realm>) -> VmResult<Value> {
    let prototype = get_member_dot(callee, "prototype", realm)?;
    let prototype = prototype
        .as_object()
        .cloned()
        .unwrap_or_else(|| realm.object_prototype().clone());
    Ok(Value::Object(Arc::new(JsObject::new(Some(prototype)))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use heron_bytecode::Program;

    fn context(realm: &Arc<Realm>) -> ExecutionContext {
        let program = Arc::new(Program::builder().build().unwrap());
        ExecutionContext::global(realm.clone(), program)
    }

    #[test]
    fn test_native_call_pushes_result() {
        let realm = Realm::new();
        let mut ctx = context(&realm);
        let add = realm.new_native_function("add", false, |_, args, _| {
            let sum: f64 = args.iter().filter_map(Value::as_number).sum();
            Ok(Value::number(sum))
        });

        let step = dispatch_call(&mut ctx, &add, Value::undefined(), vec![1.0.into(), 2.0.into()]);
        assert!(matches!(step, Ok(StepResult::Continue)));
        assert_eq!(ctx.pop_value().unwrap(), Value::number(3.0));
    }

    #[test]
    fn test_call_non_function() {
        let realm = Realm::new();
        let mut ctx = context(&realm);
        let err = dispatch_call(&mut ctx, &Value::number(1.0), Value::undefined(), vec![]).unwrap_err();
        assert_eq!(err.to_string(), "TypeError: Number is not a function");
        let err = dispatch_call(&mut ctx, &realm.new_object(), Value::undefined(), vec![]).unwrap_err();
        assert_eq!(err.to_string(), "TypeError: Object is not a function");
    }

    #[test]
    fn test_construct_rejects_non_constructors() {
        let realm = Realm::new();
        let mut ctx = context(&realm);
        let plain = realm.new_native_function("f", false, |_, _, _| Ok(Value::undefined()));

        let err = construct(&mut ctx, &plain, vec![]).unwrap_err();
        assert_eq!(err.to_string(), "TypeError: Object is not a constructor");
        let err = construct(&mut ctx, &Value::string("s"), vec![]).unwrap_err();
        assert_eq!(err.to_string(), "TypeError: String is not a constructor");
        assert_eq!(ctx.stack_len(), 0);
    }

    #[test]
    fn test_native_construct_keeps_receiver_for_primitive_result() {
        let realm = Realm::new();
        let mut ctx = context(&realm);
        let ctor = realm.new_native_function("Point", true, |this, _, realm| {
            crate::member::put(this, "x", Value::number(1.0), realm)?;
            Ok(Value::number(42.0))
        });
        let proto = realm.new_object();
        crate::member::put(&ctor, "prototype", proto.clone(), &realm).unwrap();

        construct(&mut ctx, &ctor, vec![]).unwrap();
        let obj = ctx.pop_value().unwrap();
        let storage = obj.as_object().unwrap();
        assert_eq!(storage.get_data("x"), Some(Value::number(1.0)));
        assert!(Value::Object(storage.prototype().unwrap()).same_reference(&proto));
    }
}
