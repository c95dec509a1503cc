//! # Heron VM Core
//!
//! Execution engine for Heron bytecode.
//!
//! ## Design Principles
//!
//! - **Thread-safe**: Values are `Send + Sync`; shared storage sits behind
//!   `parking_lot` locks
//! - **Step signals**: Instructions never call the driver; they return a
//!   [`StepResult`] telling it to continue, jump, push or pop a frame
//! - **Region-based handlers**: try/catch/finally is a table of protected
//!   ranges consulted by the driver, not a control-flow instruction
//! - **Realm-scoped limits**: call depth, instruction budget and the
//!   interrupt flag are shared by every driver running in a realm

#![warn(clippy::all)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod call;
pub mod config;
pub mod context;
pub mod convert;
pub mod error;
pub mod eval;
pub mod function;
pub mod interpreter;
pub mod member;
pub mod object;
pub mod operations;
pub mod realm;
pub mod scope;
pub mod step;
pub mod string;
pub mod value;

pub use call::call_function;
pub use config::InterpreterConfig;
pub use context::{ExecutionContext, Slot};
pub use error::{ErrorKind, VmError, VmResult};
pub use eval::Evaluate;
pub use function::{FunctionKind, InterpretedFunction, JsFunction, NativeFn};
pub use interpreter::Interpreter;
pub use object::{JsObject, PropertyDescriptor, PropertyKey};
pub use realm::Realm;
pub use scope::Scope;
pub use step::{Invocation, StepResult};
pub use string::JsString;
pub use value::Value;
