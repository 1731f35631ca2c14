//! Call frames.

use runmod_bytecode::{RoutineId, ValueType};

use super::modules::Origin;
use super::value::Value;

/// Activation of a routine.
#[derive(Debug)]
pub(crate) struct Frame {
    pub origin: Origin,
    pub routine: RoutineId,
    /// Offset of the next instruction in the routine's code.
    pub ip: usize,
    pub args: Vec<Value>,
    pub locals: Vec<Value>,
    /// Operand stack height at entry. The frame never pops below it.
    pub stack_base: usize,
    pub return_type: ValueType,
}

/// Stack of active frames, outermost first.
#[derive(Debug, Default)]
pub(crate) struct CallStack {
    frames: Vec<Frame>,
}

impl CallStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    pub fn top(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut Frame> {
        self.frames.last_mut()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Frames from innermost to outermost.
    pub fn innermost_first(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter().rev()
    }
}
