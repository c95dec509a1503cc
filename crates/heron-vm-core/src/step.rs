//! Control-transfer signals returned by instruction evaluation

use crate::context::ExecutionContext;
use crate::value::Value;

/// Outcome of evaluating one instruction
#[derive(Debug)]
pub enum StepResult {
    /// Proceed to the next instruction
    Continue,
    /// Branch to an absolute position in the current program
    Jump(usize),
    /// Push a new frame for an interpreted function
    Invoke(Box<Invocation>),
    /// The current frame is complete
    ReturnFrame,
}

/// A frame to be pushed by the driver
#[derive(Debug)]
pub struct Invocation {
    /// Context of the callee frame
    pub context: ExecutionContext,
    /// First instruction of the callee body
    pub entry: usize,
    /// Receiver allocated by a construct call
    pub construct: Option<Value>,
}

impl StepResult {
    /// Wrap an invocation
    pub fn invoke(context: ExecutionContext, entry: usize, construct: Option<Value>) -> Self {
        Self::Invoke(Box::new(Invocation {
            context,
            entry,
            construct,
        }))
    }
}
