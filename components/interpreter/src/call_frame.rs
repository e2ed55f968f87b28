//! Call frame: one activation record of a script or function body.
//!
//! A frame owns everything needed to continue executing its body from its
//! resume cursor: name-keyed locals, the operand stack, the sticky result
//! register, and the stack of try scopes entered and not yet left. Frames
//! are plain data over an `Arc`-shared chunk, which is what lets a whole
//! call stack be captured at a yield point and serialized.

use bytecode_system::BytecodeChunk;
use core_types::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// An active try region of a frame.
///
/// `table` names the catch clauses in the frame's chunk; `stack_height`
/// records where the operand stack stood when the region was entered, so a
/// catch transfer can drop any half-evaluated expression state above it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TryScope {
    /// Index into the chunk's try tables.
    pub table: u16,
    /// Operand-stack height at `PushTry`.
    pub stack_height: usize,
}

/// One activation record owned by a [`CallStack`](crate::CallStack).
#[derive(Debug, Clone, PartialEq)]
pub struct CallFrame {
    /// Code this frame executes.
    pub chunk: Arc<BytecodeChunk>,
    /// Function name for function frames, `None` for program frames.
    pub function: Option<String>,
    /// Resume cursor: index of the next instruction to execute.
    pub ip: usize,
    /// Frame locals keyed by sigil-prefixed name (`%vc`).
    pub locals: HashMap<String, Value>,
    /// Operand stack.
    pub stack: Vec<Value>,
    /// Sticky result register (value of the last expression statement).
    pub result: Value,
    /// Try scopes entered and not yet left, innermost last.
    pub try_scopes: Vec<TryScope>,
}

impl CallFrame {
    /// Create a frame for a top-level program or nested evaluation body.
    pub fn program(chunk: Arc<BytecodeChunk>) -> Self {
        Self {
            chunk,
            function: None,
            ip: 0,
            locals: HashMap::new(),
            stack: Vec::new(),
            result: Value::Empty,
            try_scopes: Vec::new(),
        }
    }

    /// Create a frame for a function call, binding arguments to parameter
    /// names. Missing arguments read as Empty; extra arguments are dropped.
    pub fn call(name: &str, chunk: Arc<BytecodeChunk>, params: &[String], args: Vec<Value>) -> Self {
        let mut locals = HashMap::with_capacity(params.len());
        let mut args = args.into_iter();
        for param in params {
            locals.insert(param.clone(), args.next().unwrap_or(Value::Empty));
        }
        Self {
            chunk,
            function: Some(name.to_string()),
            ip: 0,
            locals,
            stack: Vec::new(),
            result: Value::Empty,
            try_scopes: Vec::new(),
        }
    }

    /// Read a local; unset locals read as Empty.
    pub fn local(&self, name: &str) -> Value {
        self.locals.get(name).cloned().unwrap_or(Value::Empty)
    }

    /// Write a local.
    pub fn set_local(&mut self, name: &str, value: Value) {
        self.locals.insert(name.to_string(), value);
    }

    /// Pop the operand stack; an empty stack reads as Empty.
    pub fn pop(&mut self) -> Value {
        self.stack.pop().unwrap_or(Value::Empty)
    }

    /// Push onto the operand stack.
    pub fn push(&mut self, value: Value) {
        self.stack.push(value);
    }
}
