//! Bytecode interpreter
//!
//! Drives frames over a `Program`: fetches the instruction at `pc`, evaluates
//! it, and applies the returned `StepResult`. Errors are routed through the
//! protected-region table of each frame's program.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use heron_bytecode::Program;
use tracing::{debug, trace, warn};

use crate::call::call_function;
use crate::config::InterpreterConfig;
use crate::context::ExecutionContext;
use crate::error::{VmError, VmResult};
use crate::eval::Evaluate;
use crate::realm::Realm;
use crate::step::{Invocation, StepResult};
use crate::value::Value;

/// An activation record
struct Frame {
    program: Arc<Program>,
    ctx: ExecutionContext,
    pc: usize,
    /// Receiver of a construct call
    construct: Option<Value>,
}

impl Frame {
    fn new(ctx: ExecutionContext, pc: usize, construct: Option<Value>) -> Self {
        Self {
            program: ctx.program().clone(),
            ctx,
            pc,
            construct,
        }
    }
}

/// Counts the frames one driver holds in the realm-wide frame counter.
///
/// Frames still held when the driver exits (fatal error, interruption) are
/// released on drop.
struct DepthGuard<'a> {
    counter: &'a AtomicUsize,
    held: usize,
}

impl<'a> DepthGuard<'a> {
    fn new(counter: &'a AtomicUsize) -> Self {
        Self { counter, held: 0 }
    }

    fn enter(&mut self, max_depth: usize) -> VmResult<()> {
        if self.counter.load(Ordering::Relaxed) >= max_depth {
            return Err(VmError::range_error("Maximum call stack size exceeded"));
        }
        self.counter.fetch_add(1, Ordering::Relaxed);
        self.held += 1;
        Ok(())
    }

    fn leave(&mut self) {
        if self.held > 0 {
            self.held -= 1;
            self.counter.fetch_sub(1, Ordering::Relaxed);
        }
    }
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(self.held, Ordering::Relaxed);
    }
}

/// The bytecode interpreter
pub struct Interpreter {
    realm: Arc<Realm>,
}

impl Interpreter {
    /// Create an interpreter with a fresh realm and default configuration
    pub fn new() -> Self {
        Self::with_config(InterpreterConfig::default())
    }

    /// Create an interpreter with a fresh realm
    pub fn with_config(config: InterpreterConfig) -> Self {
        Self {
            realm: Realm::with_config(config),
        }
    }

    /// Create an interpreter over an existing realm
    pub fn with_realm(realm: Arc<Realm>) -> Self {
        Self { realm }
    }

    /// The realm
    #[inline]
    pub fn realm(&self) -> &Arc<Realm> {
        &self.realm
    }

    /// Configuration
    #[inline]
    pub fn config(&self) -> &InterpreterConfig {
        self.realm.config()
    }

    /// Get the interrupt flag (for external timeout/cancellation)
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        self.realm.interrupt_flag()
    }

    /// Run a program from position 0 in the global scope
    ///
    /// Returns the top of the operand stack when the program completes.
    pub fn run(&self, program: impl Into<Arc<Program>>) -> VmResult<Value> {
        let ctx = ExecutionContext::global(self.realm.clone(), program.into());
        self.execute(ctx, 0, None)
    }

    /// Run from `entry` in a caller-provided context
    pub fn run_in_context(&self, ctx: ExecutionContext, entry: usize) -> VmResult<Value> {
        self.execute(ctx, entry, None)
    }

    /// Call a function to completion
    pub fn call(&self, func: &Value, this: Value, args: &[Value]) -> VmResult<Value> {
        call_function(func, this, args, &self.realm)
    }

    /// Main execution loop
    pub(crate) fn execute(
        &self,
        ctx: ExecutionContext,
        entry: usize,
        construct: Option<Value>,
    ) -> VmResult<Value> {
        let config = self.realm.config();
        let mut depth = DepthGuard::new(self.realm.frame_count());
        depth.enter(config.max_call_depth)?;

        let mut frames = vec![Frame::new(ctx, entry, construct)];
        let mut executed: u64 = 0;

        loop {
            if self.realm.is_interrupted() {
                debug!(executed, "interrupt flag set");
                return Err(VmError::interrupted());
            }

            let height = frames.len();
            let Some(frame) = frames.last_mut() else {
                return Err(VmError::internal("driver has no frame"));
            };

            let outcome = match frame.program.get(frame.pc) {
                Some(insn) => {
                    // Label and TRY_CATCH_FINALLY markers are not counted
                    if !insn.is_marker() {
                        if config.instruction_limit.is_some_and(|limit| executed >= limit) {
                            debug!(executed, "instruction limit reached");
                            return Err(VmError::interrupted());
                        }
                        executed += 1;
                    }
                    if config.trace_instructions {
                        trace!(pc = frame.pc, depth = height, "{}", insn);
                    }
                    insn.eval(&mut frame.ctx)
                }
                None => Ok(StepResult::ReturnFrame),
            };

            match outcome {
                Ok(StepResult::Continue) => frame.pc += 1,
                Ok(StepResult::Jump(target)) => frame.pc = target,
                Ok(StepResult::Invoke(invocation)) => {
                    let Invocation {
                        context,
                        entry,
                        construct,
                    } = *invocation;
                    match depth.enter(config.max_call_depth) {
                        Ok(()) => {
                            debug!(entry, depth = height + 1, "push frame");
                            frames.push(Frame::new(context, entry, construct));
                        }
                        Err(err) => self.unwind(&mut frames, &mut depth, err)?,
                    }
                }
                Ok(StepResult::ReturnFrame) => {
                    let result = frame.ctx.take_result()?;
                    let finished = frames.pop();
                    depth.leave();
                    debug!(depth = height - 1, "pop frame");

                    let result = match finished.and_then(|f| f.construct) {
                        Some(receiver) if !result.is_reference() => receiver,
                        _ => result,
                    };
                    match frames.last_mut() {
                        Some(caller) => {
                            caller.pc += 1;
                            caller.ctx.push(result);
                        }
                        None => return Ok(result),
                    }
                }
                Err(err) => self.unwind(&mut frames, &mut depth, err)?,
            }
        }
    }

    /// Route an error to the innermost covering handler, popping frames that
    /// have none
    fn unwind(
        &self,
        frames: &mut Vec<Frame>,
        depth: &mut DepthGuard<'_>,
        error: VmError,
    ) -> VmResult<()> {
        if !error.is_catchable() {
            return Err(error);
        }

        while let Some(frame) = frames.last_mut() {
            if let Some(region) = frame.program.covering_region(frame.pc).copied() {
                frame.ctx.truncate(region.stack_depth as usize);

                if let Some(catch) = region.catch {
                    let value = error
                        .to_value(&self.realm)
                        .ok_or_else(|| VmError::internal("caught error has no value"))?;
                    frame.pc = frame.ctx.resolve_target(catch)?;
                    frame.ctx.push(value);
                    debug!(pc = frame.pc, error = %error, "entering catch handler");
                    return Ok(());
                }
                if let Some(finally) = region.finally {
                    frame.pc = frame.ctx.resolve_target(finally)?;
                    debug!(pc = frame.pc, error = %error, "entering finally handler");
                    frame.ctx.park_exception(error);
                    return Ok(());
                }
            }

            frames.pop();
            depth.leave();
            debug!(depth = frames.len(), "pop frame while unwinding");
        }

        if self.realm.frame_count().load(Ordering::Relaxed) == 0 {
            warn!(error = %error, "uncaught exception");
        }
        Err(error)
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}
