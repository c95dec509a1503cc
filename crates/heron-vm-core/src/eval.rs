//! Instruction evaluation
//!
//! One `match` arm per instruction. Each arm mutates the operand stack of the
//! current context and returns the control-transfer signal for the driver.

use std::sync::Arc;

use heron_bytecode::{BinaryOperator, Instruction, PropertyKind};

use crate::call::{construct, dispatch_call};
use crate::context::{ExecutionContext, Slot};
use crate::convert::{to_boolean, to_number, to_string};
use crate::error::{VmError, VmResult};
use crate::function::InterpretedFunction;
use crate::member::{delete_member, get_member, get_member_dot, put, put_member};
use crate::object::PropertyKey;
use crate::operations::{binary_operation, unary_operation};
use crate::realm::Realm;
use crate::step::StepResult;
use crate::string::JsString;
use crate::value::Value;

/// Evaluate against an execution context
pub trait Evaluate {
    /// Run one step, returning the control-transfer signal
    fn eval(&self, ctx: &mut ExecutionContext) -> VmResult<StepResult>;
}

impl Evaluate for Instruction {
    fn eval(&self, ctx: &mut ExecutionContext) -> VmResult<StepResult> {
        match self {
            // ==================== Unary ====================
            Instruction::UnaryOp { op } => {
                let value = ctx.pop_value()?;
                ctx.push(unary_operation(*op, &value));
            }
            Instruction::TypeOf { identifier } => {
                let type_of = match ctx.scope().try_get(identifier, ctx.realm())? {
                    Some(value) => value.type_of(),
                    None => "undefined",
                };
                ctx.push(Value::string(type_of));
            }
            Instruction::Postfix {
                identifier,
                post,
                incr,
            } => {
                let old = to_number(&ctx.scope().get(identifier, ctx.realm())?);
                let new = step(old, *incr);
                ctx.scope()
                    .put(identifier, Value::number(new), ctx.is_strict(), ctx.realm())?;
                ctx.push(Value::number(if *post { old } else { new }));
            }
            Instruction::PostfixMember { post, incr } => {
                let key = ctx.pop_value()?;
                let base = ctx.pop_value()?;
                let old = to_number(&get_member(&base, &key, ctx.realm())?);
                let new = step(old, *incr);
                if !base.is_primitive() {
                    put_member(&base, &key, Value::number(new), ctx.realm())?;
                }
                ctx.push(Value::number(if *post { old } else { new }));
            }
            Instruction::PostfixMemberDot { post, incr, prop } => {
                let base = ctx.pop_value()?;
                let old = to_number(&get_member_dot(&base, prop, ctx.realm())?);
                let new = step(old, *incr);
                if !base.is_primitive() {
                    put(&base, prop, Value::number(new), ctx.realm())?;
                }
                ctx.push(Value::number(if *post { old } else { new }));
            }
            Instruction::Delete { name } => {
                let deleted = ctx.scope().delete(name);
                ctx.push(Value::boolean(deleted));
            }
            Instruction::DeleteMember => {
                let key = ctx.pop_value()?;
                let base = ctx.pop_value()?;
                let deleted = delete_member(&base, &key, ctx.realm())?;
                ctx.push(Value::boolean(deleted));
            }

            // ==================== Binary ====================
            Instruction::BinaryOp { op } => {
                let right = ctx.pop_value()?;
                let left = ctx.pop_value()?;
                let result = binary_operation(*op, &left, &right, ctx.realm())?;
                ctx.push(result);
            }

            // ==================== Jumps ====================
            Instruction::Label { .. } => {}
            Instruction::Jump { target } => {
                return Ok(StepResult::Jump(ctx.resolve_target(*target)?));
            }
            Instruction::JumpIfTrue { target } => {
                if to_boolean(&ctx.pop_value()?) {
                    return Ok(StepResult::Jump(ctx.resolve_target(*target)?));
                }
            }
            Instruction::JumpIfTrueWithoutPop { target } => {
                if to_boolean(ctx.peek_value()?) {
                    return Ok(StepResult::Jump(ctx.resolve_target(*target)?));
                }
            }
            Instruction::JumpIfFalse { target } => {
                if !to_boolean(&ctx.pop_value()?) {
                    return Ok(StepResult::Jump(ctx.resolve_target(*target)?));
                }
            }
            Instruction::JumpIfFalseWithoutPop { target } => {
                if !to_boolean(ctx.peek_value()?) {
                    return Ok(StepResult::Jump(ctx.resolve_target(*target)?));
                }
            }

            // ==================== Stack management ====================
            Instruction::Pop => {
                ctx.pop_slot()?;
            }
            Instruction::Reduce => {
                if ctx.stack_len() != 2 {
                    return Err(VmError::internal(format!(
                        "REDUCE expects a stack height of 2, found {}",
                        ctx.stack_len()
                    )));
                }
                let top = ctx.pop_slot()?;
                ctx.pop_slot()?;
                ctx.push_slot(top);
            }

            // ==================== Loads ====================
            Instruction::LoadNone => ctx.push_slot(Slot::Placeholder),
            Instruction::LoadNTuple { n } => {
                let values = ctx.pop_values(*n as usize)?;
                ctx.push_slot(Slot::Tuple(values));
            }
            Instruction::LoadUndefined => ctx.push(Value::undefined()),
            Instruction::LoadNull => ctx.push(Value::null()),
            Instruction::LoadBoolean { value } => ctx.push(Value::boolean(*value)),
            Instruction::LoadString { value } => {
                ctx.push(Value::String(JsString::from_utf16(value.as_slice())));
            }
            Instruction::LoadNumber { value } => ctx.push(Value::number(*value)),
            Instruction::LoadRegExp { body, flags } => {
                let regexp = ctx.realm().new_regexp(body, flags)?;
                ctx.push(regexp);
            }
            Instruction::LoadFunction {
                entry,
                name,
                params,
                is_constructor,
                strict,
            } => {
                let body = InterpretedFunction {
                    program: ctx.program().clone(),
                    entry: ctx.resolve_target(*entry)?,
                    params: params.clone().into(),
                    scope: ctx.scope().clone(),
                    strict: *strict,
                };
                let func = ctx.realm().new_interpreted_function(
                    name.as_deref().unwrap_or(""),
                    body,
                    *is_constructor,
                );
                ctx.push(func);
            }
            Instruction::LoadObject { props } => {
                let values = ctx.pop_values(props.len())?;
                let obj = build_object(ctx.realm(), props, values)?;
                ctx.push(obj);
            }
            Instruction::LoadArray { n } => {
                let values = ctx.pop_values(*n as usize)?;
                let array = ctx.realm().new_array(values);
                ctx.push(array);
            }
            Instruction::LoadThis => {
                let this = ctx.this_value().clone();
                ctx.push(this);
            }
            Instruction::Load { identifier } => {
                let value = ctx.scope().get(identifier, ctx.realm())?;
                ctx.push(value);
            }
            Instruction::LoadMember => {
                let key = ctx.pop_value()?;
                let base = ctx.pop_value()?;
                let value = get_member(&base, &key, ctx.realm())?;
                ctx.push(value);
            }
            Instruction::LoadMemberDot { prop } => {
                let base = ctx.pop_value()?;
                let value = get_member_dot(&base, prop, ctx.realm())?;
                ctx.push(value);
            }

            // ==================== Stores ====================
            Instruction::Store { identifier } => {
                let value = ctx.peek_value()?.clone();
                ctx.scope()
                    .put(identifier, value, ctx.is_strict(), ctx.realm())?;
            }
            Instruction::StoreMember => {
                let value = ctx.pop_value()?;
                let key = ctx.pop_value()?;
                let base = ctx.pop_value()?;
                put_member(&base, &key, value.clone(), ctx.realm())?;
                ctx.push(value);
            }
            Instruction::StoreMemberDot { prop } => {
                let value = ctx.pop_value()?;
                let base = ctx.pop_value()?;
                put(&base, prop, value.clone(), ctx.realm())?;
                ctx.push(value);
            }
            Instruction::StoreOp { identifier, op } => {
                let rhs = ctx.pop_value()?;
                let current = ctx.scope().get(identifier, ctx.realm())?;
                let value = binary_operation(*op, &current, &rhs, ctx.realm())?;
                ctx.scope()
                    .put(identifier, value.clone(), ctx.is_strict(), ctx.realm())?;
                ctx.push(value);
            }
            Instruction::StoreMemberOp { op } => {
                let rhs = ctx.pop_value()?;
                let key = ctx.pop_value()?;
                let base = ctx.pop_value()?;
                let value = compound_member(ctx.realm(), &base, &key, *op, &rhs)?;
                ctx.push(value);
            }
            Instruction::StoreMemberDotOp { prop, op } => {
                let rhs = ctx.pop_value()?;
                let base = ctx.pop_value()?;
                let key = Value::string(&**prop);
                let value = compound_member(ctx.realm(), &base, &key, *op, &rhs)?;
                ctx.push(value);
            }

            // ==================== Calls ====================
            Instruction::Call => {
                let args = ctx.pop_tuple()?;
                let callee = ctx.pop_value()?;
                let this = ctx.realm().global_this();
                return dispatch_call(ctx, &callee, this, args);
            }
            Instruction::CallMethod => {
                let args = ctx.pop_tuple()?;
                let key = ctx.pop_value()?;
                let base = ctx.pop_value()?;
                let callee = get_member(&base, &key, ctx.realm())?;
                return dispatch_call(ctx, &callee, base, args);
            }
            Instruction::CallMethodDot { prop } => {
                let args = ctx.pop_tuple()?;
                let base = ctx.pop_value()?;
                let callee = get_member_dot(&base, prop, ctx.realm())?;
                return dispatch_call(ctx, &callee, base, args);
            }
            Instruction::CallNoArgs => {
                let callee = ctx.pop_value()?;
                let this = ctx.realm().global_this();
                return dispatch_call(ctx, &callee, this, Vec::new());
            }
            Instruction::CallMethodNoArgs => {
                let key = ctx.pop_value()?;
                let base = ctx.pop_value()?;
                let callee = get_member(&base, &key, ctx.realm())?;
                return dispatch_call(ctx, &callee, base, Vec::new());
            }
            Instruction::CallMethodDotNoArgs { prop } => {
                let base = ctx.pop_value()?;
                let callee = get_member_dot(&base, prop, ctx.realm())?;
                return dispatch_call(ctx, &callee, base, Vec::new());
            }
            Instruction::Return => return Ok(StepResult::ReturnFrame),
            Instruction::New => {
                let args = ctx.pop_tuple()?;
                let callee = ctx.pop_value()?;
                return construct(ctx, &callee, args);
            }
            Instruction::NewNoArgs => {
                let callee = ctx.pop_value()?;
                return construct(ctx, &callee, Vec::new());
            }

            // ==================== Exceptions ====================
            Instruction::Throw => {
                let value = ctx.pop_value()?;
                return Err(VmError::exception(value));
            }
            Instruction::TryCatchFinally => {}
            Instruction::EndFinally => {
                if let Some(error) = ctx.take_parked_exception() {
                    return Err(error);
                }
            }
        }
        Ok(StepResult::Continue)
    }
}

#[inline]
fn step(n: f64, incr: bool) -> f64 {
    if incr { n + 1.0 } else { n - 1.0 }
}

/// `base[key] op= rhs`, computed as `op(rhs, current)`
fn compound_member(
    realm: &Arc<Realm>,
    base: &Value,
    key: &Value,
    op: BinaryOperator,
    rhs: &Value,
) -> VmResult<Value> {
    if base.is_nullish() {
        return Err(VmError::type_error(format!(
            "Cannot set property '{}' of {}",
            to_string(key),
            to_string(base)
        )));
    }
    let current = get_member(base, key, realm)?;
    let value = binary_operation(op, rhs, &current, realm)?;
    if !base.is_primitive() {
        put_member(base, key, value.clone(), realm)?;
    }
    Ok(value)
}

/// Object literal; getter and setter entries under one name merge into a
/// single accessor property
fn build_object(
    realm: &Arc<Realm>,
    props: &[(Box<str>, PropertyKind)],
    values: Vec<Value>,
) -> VmResult<Value> {
    let obj = realm.new_object();
    let Some(storage) = obj.as_object() else {
        return Err(VmError::internal("object literal without storage"));
    };
    for ((name, kind), value) in props.iter().zip(values) {
        let key = PropertyKey::string(name);
        match kind {
            PropertyKind::Init => storage.set(key, value)?,
            PropertyKind::Get => storage.define_getter(key, value),
            PropertyKind::Set => storage.define_setter(key, value),
        }
    }
    Ok(obj)
}
