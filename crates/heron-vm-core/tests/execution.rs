//! Driver Integration Tests
//!
//! Runs whole programs through the interpreter:
//! - protected regions (catch, finally, unwinding through frames)
//! - call, construct and accessor protocols
//! - call depth, interruption and fatal errors

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use heron_bytecode::{
    BinaryOperator, Instruction, LabelId, Program, ProgramBuilder, PropertyKind, ProtectedRegion,
};
use heron_vm_core::{
    Evaluate, ExecutionContext, Interpreter, InterpreterConfig, StepResult, Value, VmError,
};
use tracing_subscriber::filter::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn num(n: f64) -> Instruction {
    Instruction::load_number(n)
}

fn load(id: &str) -> Instruction {
    Instruction::Load { identifier: id.into() }
}

fn store(id: &str) -> Instruction {
    Instruction::Store { identifier: id.into() }
}

fn dot(prop: &str) -> Instruction {
    Instruction::LoadMemberDot { prop: prop.into() }
}

fn function(entry: LabelId, name: &str, params: &[&str], is_constructor: bool) -> Instruction {
    Instruction::LoadFunction {
        entry: entry.into(),
        name: Some(name.into()),
        params: params.iter().map(|p| (*p).into()).collect(),
        is_constructor,
        strict: false,
    }
}

fn catch_region(start: u32, end: u32, handler: LabelId) -> ProtectedRegion {
    ProtectedRegion {
        start,
        end,
        catch: Some(handler.into()),
        finally: None,
        stack_depth: 0,
    }
}

fn run(b: ProgramBuilder) -> Result<Value, VmError> {
    init_tracing();
    Interpreter::new().run(b.build().expect("valid program"))
}

// ============================================================================
// Protected Regions
// ============================================================================

#[test]
fn test_catch_type_error_from_instruction() {
    let mut b = Program::builder();
    let handler = b.new_label();
    let end = b.new_label();

    let start = b.position();
    b.emit_all([Instruction::LoadNull, dot("x"), Instruction::Jump { target: end.into() }]);
    let stop = b.position();
    b.place_label(handler);
    b.emit(dot("message"));
    b.place_label(end);
    b.protect(catch_region(start, stop, handler));

    assert_eq!(run(b).unwrap(), Value::string("Cannot read property 'x' of null"));
}

#[test]
fn test_catch_thrown_value_unchanged() {
    let mut b = Program::builder();
    let handler = b.new_label();

    let start = b.position();
    b.emit_all([num(41.0), Instruction::Throw]);
    let stop = b.position();
    b.place_label(handler);
    b.emit_all([num(1.0), Instruction::BinaryOp { op: BinaryOperator::Add }]);
    b.protect(catch_region(start, stop, handler));

    assert_eq!(run(b).unwrap(), Value::number(42.0));
}

#[test]
fn test_catch_truncates_operand_stack() {
    let mut b = Program::builder();
    let handler = b.new_label();

    b.emit(num(1.0));
    let start = b.position();
    b.emit_all([num(2.0), num(3.0), Instruction::LoadNull, dot("x")]);
    let stop = b.position();
    b.place_label(handler);
    b.emit(Instruction::Reduce);
    b.protect(ProtectedRegion {
        stack_depth: 1,
        ..catch_region(start, stop, handler)
    });

    // [1, error] reduces to the error object
    let result = run(b).unwrap();
    assert!(result.as_object().is_some());
}

fn finally_program(throw: bool) -> ProgramBuilder {
    let mut b = Program::builder();
    let finally = b.new_label();

    let start = b.position();
    if throw {
        b.emit_all([num(1.0), Instruction::Throw]);
    } else {
        b.emit_all([num(5.0), Instruction::Pop]);
    }
    let stop = b.position();
    b.place_label(finally);
    b.emit_all([
        Instruction::LoadBoolean { value: true },
        store("ran"),
        Instruction::Pop,
        Instruction::EndFinally,
        Instruction::load_string("after"),
    ]);
    b.protect(ProtectedRegion {
        start,
        end: stop,
        catch: None,
        finally: Some(finally.into()),
        stack_depth: 0,
    });
    b
}

#[test]
fn test_finally_runs_on_normal_completion() {
    init_tracing();
    let interp = Interpreter::new();
    let result = interp.run(finally_program(false).build().unwrap()).unwrap();
    assert_eq!(result, Value::string("after"));
    assert_eq!(interp.realm().global_object().get_data("ran"), Some(Value::boolean(true)));
}

#[test]
fn test_finally_reraises_exception() {
    init_tracing();
    let interp = Interpreter::new();
    let err = interp.run(finally_program(true).build().unwrap()).unwrap_err();
    assert_eq!(err.thrown_value(), Some(&Value::number(1.0)));
    assert_eq!(interp.realm().global_object().get_data("ran"), Some(Value::boolean(true)));
}

#[test]
fn test_outer_catch_sees_exception_reraised_by_finally() {
    let mut b = Program::builder();
    let finally = b.new_label();
    let handler = b.new_label();

    let outer_start = b.position();
    let inner_start = b.position();
    b.emit_all([Instruction::load_string("boom"), Instruction::Throw]);
    let inner_stop = b.position();
    b.place_label(finally);
    b.emit(Instruction::EndFinally);
    let outer_stop = b.position();
    b.place_label(handler);
    b.emit(num(0.0));
    b.emit(Instruction::BinaryOp { op: BinaryOperator::Add });

    b.protect(ProtectedRegion {
        start: inner_start,
        end: inner_stop,
        catch: None,
        finally: Some(finally.into()),
        stack_depth: 0,
    });
    b.protect(catch_region(outer_start, outer_stop, handler));

    assert_eq!(run(b).unwrap(), Value::string("boom0"));
}

#[test]
fn test_error_unwinds_through_interpreted_frames() {
    let mut b = Program::builder();
    let body = b.new_label();
    let start_label = b.new_label();
    let handler = b.new_label();
    let end = b.new_label();

    b.emit(Instruction::Jump { target: start_label.into() });
    b.place_label(body);
    b.emit_all([Instruction::LoadNull, dot("x"), Instruction::Return]);
    b.place_label(start_label);
    b.emit_all([function(body, "f", &[], false), store("f"), Instruction::Pop]);

    let start = b.position();
    b.emit_all([load("f"), Instruction::CallNoArgs, Instruction::Jump { target: end.into() }]);
    let stop = b.position();
    b.place_label(handler);
    b.emit(dot("name"));
    b.place_label(end);
    b.protect(catch_region(start, stop, handler));

    assert_eq!(run(b).unwrap(), Value::string("TypeError"));
}

#[test]
fn test_uncaught_error_reaches_host() {
    let mut b = Program::builder();
    b.emit_all([Instruction::LoadUndefined, num(1.0), Instruction::StoreMemberDot { prop: "p".into() }]);
    let err = run(b).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: Cannot set property 'p' of undefined");
}

// ============================================================================
// Call Depth, Interruption, Fatal Errors
// ============================================================================

fn runaway_recursion(protected: bool) -> Program {
    let mut b = Program::builder();
    let body = b.new_label();
    let start_label = b.new_label();
    let handler = b.new_label();

    b.emit(Instruction::Jump { target: start_label.into() });
    b.place_label(body);
    b.emit_all([load("f"), Instruction::CallNoArgs, Instruction::Return]);
    b.place_label(start_label);
    b.emit_all([function(body, "f", &[], false), store("f"), Instruction::Pop]);
    let start = b.position();
    b.emit_all([load("f"), Instruction::CallNoArgs]);
    let stop = b.position();
    b.emit(Instruction::Return);
    b.place_label(handler);
    b.emit(dot("message"));
    if protected {
        b.protect(catch_region(start, stop, handler));
    }
    b.build().unwrap()
}

#[test]
fn test_call_depth_raises_catchable_range_error() {
    init_tracing();
    let interp = Interpreter::with_config(InterpreterConfig::default().max_call_depth(50));
    let program = Arc::new(runaway_recursion(true));

    for _ in 0..2 {
        let result = interp.run(program.clone()).unwrap();
        assert_eq!(result, Value::string("Maximum call stack size exceeded"));
    }

    let err = interp.run(runaway_recursion(false)).unwrap_err();
    assert!(matches!(err, VmError::RangeError(_)));
}

#[test]
fn test_interrupt_flag_stops_infinite_loop() {
    init_tracing();
    let mut b = Program::builder();
    let head = b.new_label();
    let handler = b.new_label();
    b.place_label(head);
    let start = b.position();
    b.emit(Instruction::Jump { target: head.into() });
    let stop = b.position();
    b.place_label(handler);
    b.protect(catch_region(start, stop, handler));

    let interp = Interpreter::new();
    let flag = interp.interrupt_flag();
    let setter = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        flag.store(true, Ordering::Relaxed);
    });

    let err = interp.run(b.build().unwrap()).unwrap_err();
    setter.join().unwrap();
    assert!(matches!(err, VmError::Interrupted));

    interp.realm().clear_interrupt();
    assert_eq!(interp.run(Program::builder().build().unwrap()).unwrap(), Value::undefined());
}

#[test]
fn test_internal_errors_are_not_caught() {
    let mut b = Program::builder();
    let handler = b.new_label();
    let start = b.position();
    b.emit_all([num(1.0), Instruction::Reduce]);
    let stop = b.position();
    b.place_label(handler);
    b.protect(catch_region(start, stop, handler));
    assert!(matches!(run(b), Err(VmError::InternalError(_))));

    let mut b = Program::builder();
    b.emit_all([Instruction::LoadNone, store("x")]);
    assert!(matches!(run(b), Err(VmError::InternalError(_))));
}

// ============================================================================
// Call and Construct Protocols
// ============================================================================

#[test]
fn test_native_call_continues_interpreted_call_invokes() {
    let mut b = Program::builder();
    let body = b.new_label();
    b.place_label(body);
    b.emit(load("a"));
    let program = Arc::new(b.build().unwrap());

    let interp = Interpreter::new();
    let realm = interp.realm().clone();
    let mut ctx = ExecutionContext::global(realm.clone(), program);

    load("Array").eval(&mut ctx).unwrap();
    num(1.0).eval(&mut ctx).unwrap();
    Instruction::LoadNTuple { n: 1 }.eval(&mut ctx).unwrap();
    assert!(matches!(Instruction::Call.eval(&mut ctx), Ok(StepResult::Continue)));
    assert!(ctx.pop_value().unwrap().as_object().is_some_and(|a| a.is_array()));

    let receiver = realm.new_object();
    ctx.push(receiver.clone());
    function(body, "m", &["a"], false).eval(&mut ctx).unwrap();
    Instruction::StoreMemberDot { prop: "m".into() }.eval(&mut ctx).unwrap();
    ctx.pop_value().unwrap();

    ctx.push(receiver.clone());
    num(7.0).eval(&mut ctx).unwrap();
    Instruction::LoadNTuple { n: 1 }.eval(&mut ctx).unwrap();
    let step = Instruction::CallMethodDot { prop: "m".into() }.eval(&mut ctx).unwrap();
    let StepResult::Invoke(invocation) = step else {
        panic!("interpreted call must invoke");
    };
    assert_eq!(invocation.entry, 0);
    assert!(invocation.construct.is_none());
    assert!(invocation.context.this_value().same_reference(&receiver));
    assert_eq!(
        invocation.context.scope().get("a", &realm).unwrap(),
        Value::number(7.0)
    );
    assert_eq!(ctx.stack_len(), 0);
}

#[test]
fn test_missing_arguments_are_undefined() {
    let mut b = Program::builder();
    let body = b.new_label();
    let start = b.new_label();
    b.emit(Instruction::Jump { target: start.into() });
    b.place_label(body);
    b.emit_all([
        Instruction::TypeOf { identifier: "b".into() },
        load("arguments"),
        dot("length"),
        Instruction::BinaryOp { op: BinaryOperator::Add },
        Instruction::Return,
    ]);
    b.place_label(start);
    b.emit_all([
        function(body, "f", &["a", "b"], false),
        num(1.0),
        Instruction::LoadNTuple { n: 1 },
        Instruction::Call,
    ]);

    assert_eq!(run(b).unwrap(), Value::string("undefined1"));
}

#[test]
fn test_construct_interpreted() {
    let mut b = Program::builder();
    let body = b.new_label();
    let start = b.new_label();
    b.emit(Instruction::Jump { target: start.into() });
    b.place_label(body);
    b.emit_all([
        Instruction::LoadThis,
        load("x"),
        Instruction::StoreMemberDot { prop: "x".into() },
        Instruction::Pop,
        Instruction::LoadUndefined,
        Instruction::Return,
    ]);
    b.place_label(start);
    b.emit_all([
        function(body, "P", &["x"], true),
        store("P"),
        Instruction::Pop,
        load("P"),
        num(3.0),
        Instruction::LoadNTuple { n: 1 },
        Instruction::New,
    ]);

    init_tracing();
    let interp = Interpreter::new();
    let result = interp.run(b.build().unwrap()).unwrap();
    let obj = result.as_object().unwrap();
    assert_eq!(obj.get_data("x"), Some(Value::number(3.0)));

    let ctor = interp.realm().global_object().get_data("P").unwrap();
    let prototype = ctor.as_object().unwrap().get_data("prototype").unwrap();
    assert!(Value::Object(obj.prototype().unwrap()).same_reference(&prototype));
}

#[test]
fn test_new_on_non_constructor() {
    let mut b = Program::builder();
    let body = b.new_label();
    b.emit_all([function(body, "f", &[], false), Instruction::NewNoArgs]);
    b.place_label(body);
    let err = run(b).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: Object is not a constructor");

    let mut b = Program::builder();
    b.emit_all([num(1.0), Instruction::LoadNTuple { n: 0 }, Instruction::New]);
    let err = run(b).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: Number is not a constructor");
}

#[test]
fn test_interpreted_accessors_run_on_nested_driver() {
    let mut b = Program::builder();
    let getter = b.new_label();
    let setter = b.new_label();
    let start = b.new_label();
    b.emit(Instruction::Jump { target: start.into() });
    b.place_label(getter);
    b.emit_all([Instruction::LoadThis, dot("_v"), Instruction::Return]);
    b.place_label(setter);
    b.emit_all([
        Instruction::LoadThis,
        load("v"),
        Instruction::StoreMemberDot { prop: "_v".into() },
        Instruction::Return,
    ]);
    b.place_label(start);
    b.emit_all([
        function(getter, "y", &[], false),
        function(setter, "y", &["v"], false),
        Instruction::load_object([("y", PropertyKind::Get), ("y", PropertyKind::Set)]),
        store("o"),
        Instruction::Pop,
        load("o"),
        num(9.0),
        Instruction::StoreMemberDot { prop: "y".into() },
        Instruction::Pop,
        load("o"),
        dot("y"),
    ]);

    assert_eq!(run(b).unwrap(), Value::number(9.0));
}

// ============================================================================
// Stores and Compound Assignment
// ============================================================================

#[test]
fn test_strict_store_to_undeclared() {
    let mut b = Program::builder();
    b.emit_all([num(1.0), store("ghost")]);
    let program = Arc::new(b.build().unwrap());

    let sloppy = Interpreter::new();
    assert_eq!(sloppy.run(program.clone()).unwrap(), Value::number(1.0));
    assert_eq!(sloppy.realm().global_object().get_data("ghost"), Some(Value::number(1.0)));

    let strict = Interpreter::with_config(InterpreterConfig::default().strict(true));
    let err = strict.run(program).unwrap_err();
    assert_eq!(err.to_string(), "ReferenceError: ghost is not defined");
}

#[test]
fn test_compound_member_order_is_rhs_first() {
    let mut b = Program::builder();
    b.emit_all([
        num(10.0),
        Instruction::load_object([("x", PropertyKind::Init)]),
        store("o"),
        Instruction::Pop,
        load("o"),
        num(3.0),
        Instruction::StoreMemberDotOp { prop: "x".into(), op: BinaryOperator::Sub },
        Instruction::Pop,
        load("o"),
        Instruction::load_string("x"),
        Instruction::load_string("a"),
        Instruction::StoreMemberOp { op: BinaryOperator::Add },
    ]);
    // 3 - 10, then "a" + -7
    assert_eq!(run(b).unwrap(), Value::string("a-7"));
}

#[test]
fn test_store_op_order_is_current_first() {
    let mut b = Program::builder();
    b.emit_all([
        num(10.0),
        store("x"),
        Instruction::Pop,
        num(3.0),
        Instruction::StoreOp { identifier: "x".into(), op: BinaryOperator::Sub },
        Instruction::Pop,
        Instruction::load_string("b"),
        Instruction::StoreOp { identifier: "x".into(), op: BinaryOperator::Add },
    ]);
    assert_eq!(run(b).unwrap(), Value::string("7b"));
}

#[test]
fn test_compound_member_on_nullish_base() {
    let mut b = Program::builder();
    b.emit_all([
        Instruction::LoadNull,
        num(1.0),
        Instruction::StoreMemberDotOp { prop: "x".into(), op: BinaryOperator::Add },
    ]);
    let err = run(b).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: Cannot set property 'x' of null");
}

#[test]
fn test_postfix_member_on_primitive_skips_write() {
    let mut b = Program::builder();
    b.emit_all([
        num(5.0),
        Instruction::PostfixMemberDot { post: false, incr: true, prop: "x".into() },
    ]);
    // (5).x is undefined, so the result is NaN and nothing is written
    let result = run(b).unwrap();
    assert!(result.as_number().is_some_and(f64::is_nan));
}

#[test]
fn test_delete_and_regexp_loads() {
    let mut b = Program::builder();
    b.emit_all([
        Instruction::LoadRegExp { body: "a+".into(), flags: "g".into() },
        Instruction::LoadRegExp { body: "a+".into(), flags: "g".into() },
        Instruction::BinaryOp { op: BinaryOperator::StrictEq },
        store("same"),
        Instruction::Pop,
        Instruction::Delete { name: "same".into() },
        Instruction::Pop,
        Instruction::TypeOf { identifier: "same".into() },
    ]);
    assert_eq!(run(b).unwrap(), Value::string("undefined"));

    let mut b = Program::builder();
    b.emit(Instruction::LoadRegExp { body: "a".into(), flags: "gg".into() });
    assert!(matches!(run(b), Err(VmError::SyntaxError(_))));
}

/// `left && right` or `left || right`: the short-circuited operand is the
/// expression's value
fn logical(left: f64, right: f64, and: bool) -> Result<Value, VmError> {
    let mut b = Program::builder();
    let end = b.new_label();
    b.emit(num(left));
    b.emit(if and {
        Instruction::JumpIfFalseWithoutPop { target: end.into() }
    } else {
        Instruction::JumpIfTrueWithoutPop { target: end.into() }
    });
    b.emit_all([Instruction::Pop, num(right)]);
    b.place_label(end);
    run(b)
}

#[test]
fn test_logical_operators_keep_tested_value() {
    assert_eq!(logical(0.0, 9.0, true).unwrap(), Value::number(0.0));
    assert_eq!(logical(1.0, 9.0, true).unwrap(), Value::number(9.0));
    assert_eq!(logical(5.0, 9.0, false).unwrap(), Value::number(5.0));
    assert_eq!(logical(0.0, 9.0, false).unwrap(), Value::number(9.0));
}

#[test]
fn test_json_round_trip_executes_identically() {
    let mut b = Program::builder();
    let skip = b.new_label();
    b.emit_all([
        num(2.0),
        Instruction::JumpIfTrueWithoutPop { target: skip.into() },
        num(100.0),
    ]);
    b.place_label(skip);
    b.emit_all([num(40.0), Instruction::BinaryOp { op: BinaryOperator::Add }]);
    let program = b.build().unwrap();

    let decoded = Program::from_json(&program.to_json().unwrap()).unwrap();
    let interp = Interpreter::new();
    assert_eq!(interp.run(program).unwrap(), Value::number(42.0));
    assert_eq!(interp.run(decoded).unwrap(), Value::number(42.0));
}
