//! The virtual machine facade.
//!
//! `Vm` owns the globals, the function table, the native registry, and the
//! fiber table, and exposes the embedding surface: evaluate source, drive
//! fibers, snapshot and restore them. Source text reaches the VM only
//! through the compiler callback installed by the embedder; the interpreter
//! itself never links against the frontend.

use crate::call_frame::CallFrame;
use crate::call_stack::CallStack;
use crate::fiber::{Fiber, FiberId, FiberState, FiberTable};
use crate::natives::{install_intrinsics, NativeRegistry, NativeResult};
use crate::signal::{RunOutcome, StackKind};
use crate::snapshot::{self, FiberImage};
use bytecode_system::{BytecodeChunk, FunctionProto};
use core_types::{ScriptError, Value};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Compiler callback turning source text into a program chunk.
pub type CompilerFn = Arc<dyn Fn(&str) -> Result<BytecodeChunk, ScriptError> + Send + Sync>;

/// Console output consumer.
pub type ConsumerFn = Arc<dyn Fn(&str) + Send + Sync>;

/// A function registered in the VM's dispatch table.
#[derive(Debug, Clone)]
pub struct FunctionDef {
    /// Function name.
    pub name: String,
    /// Parameter names with sigils.
    pub params: Vec<String>,
    /// Compiled body, shared with every frame executing it.
    pub chunk: Arc<BytecodeChunk>,
}

/// The Loomscript virtual machine.
pub struct Vm {
    pub(crate) globals: HashMap<String, Value>,
    pub(crate) functions: HashMap<String, FunctionDef>,
    pub(crate) natives: NativeRegistry,
    pub(crate) fibers: FiberTable,
    compiler: Option<CompilerFn>,
    consumers: Vec<ConsumerFn>,
}

impl fmt::Debug for Vm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vm")
            .field("globals", &self.globals.len())
            .field("functions", &self.functions.len())
            .field("natives", &self.natives)
            .field("fibers", &self.fibers.len())
            .field("has_compiler", &self.compiler.is_some())
            .field("consumers", &self.consumers.len())
            .finish()
    }
}

impl Vm {
    /// Create a VM with the fiber and evaluation intrinsics registered.
    pub fn new() -> Self {
        let mut natives = NativeRegistry::new();
        install_intrinsics(&mut natives);
        Self {
            globals: HashMap::new(),
            functions: HashMap::new(),
            natives,
            fibers: FiberTable::new(),
            compiler: None,
            consumers: Vec::new(),
        }
    }

    /// Install the compiler callback used by `evaluate`, `eval`, and
    /// `evalInFiber`.
    pub fn set_compiler<F>(&mut self, compiler: F)
    where
        F: Fn(&str) -> Result<BytecodeChunk, ScriptError> + Send + Sync + 'static,
    {
        self.compiler = Some(Arc::new(compiler));
    }

    /// Add a console output consumer. With no consumers registered, output
    /// goes to stdout.
    pub fn add_consumer<F>(&mut self, consumer: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.consumers.push(Arc::new(consumer));
    }

    /// Write one line of console output.
    pub fn echo(&self, line: &str) {
        if self.consumers.is_empty() {
            println!("{}", line);
        } else {
            for consumer in &self.consumers {
                consumer.as_ref()(line);
            }
        }
    }

    /// Register a native function.
    pub fn register_native<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&mut Vm, &[Value]) -> NativeResult + Send + Sync + 'static,
    {
        self.natives.register(name, f);
    }

    /// Register a compiled function prototype into the dispatch table.
    pub fn define_function(&mut self, proto: FunctionProto) {
        self.functions.insert(
            proto.name.clone(),
            FunctionDef {
                name: proto.name,
                params: proto.params,
                chunk: Arc::new(proto.chunk),
            },
        );
    }

    /// True if a function with the name has been defined.
    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Read a global; unset globals read as Empty.
    pub fn global(&self, name: &str) -> Value {
        self.globals.get(name).cloned().unwrap_or(Value::Empty)
    }

    /// Write a global.
    pub fn set_global(&mut self, name: &str, value: Value) {
        self.globals.insert(name.to_string(), value);
    }

    /// Compile source text through the installed compiler callback.
    pub fn compile(&self, source: &str) -> Result<BytecodeChunk, ScriptError> {
        match &self.compiler {
            Some(compiler) => compiler.as_ref()(source),
            None => Err(ScriptError::Native(
                "no compiler installed on this VM".to_string(),
            )),
        }
    }

    /// Evaluate source text as a top-level script and return its value.
    pub fn evaluate(&mut self, source: &str) -> Result<Value, ScriptError> {
        let chunk = self.compile(source)?;
        self.run_program(chunk, StackKind::Script)
    }

    /// Execute an already-compiled chunk as a top-level script.
    pub fn execute(&mut self, chunk: &BytecodeChunk) -> Result<Value, ScriptError> {
        self.run_program(chunk.clone(), StackKind::Script)
    }

    /// Evaluate source text behind a native call boundary: unmatched
    /// throws, hard or soft, never escape the nested evaluation.
    pub fn eval_boundary(&mut self, source: &str) -> Result<Value, ScriptError> {
        let chunk = self.compile(source)?;
        self.run_program(chunk, StackKind::Boundary)
    }

    fn run_program(&mut self, chunk: BytecodeChunk, kind: StackKind) -> Result<Value, ScriptError> {
        let mut stack = CallStack::new();
        stack.push(CallFrame::program(Arc::new(chunk)));
        match self.run_stack(&mut stack, kind)? {
            RunOutcome::Completed(value) => Ok(value),
            RunOutcome::Yielded(_) => Err(ScriptError::InvalidFiberOperation(
                "yieldFiber called outside a fiber".to_string(),
            )),
        }
    }

    // ------------------------------------------------------------------
    // Fiber API
    // ------------------------------------------------------------------

    /// Allocate a new fiber in state Created. Nothing executes.
    pub fn create_fiber(&mut self) -> FiberId {
        self.fibers.create()
    }

    /// Begin executing `source` as the fiber's program. Runs until the
    /// first yield (returning the yielded value) or completion (returning
    /// the program's value).
    pub fn eval_in_fiber(&mut self, id: FiberId, source: &str) -> Result<Value, ScriptError> {
        let chunk = self.compile(source)?;
        {
            let fiber = self.fiber(id)?;
            let idle = matches!(fiber.state, FiberState::Created)
                || (fiber.state == FiberState::Suspended && fiber.call_stack.is_empty());
            if !idle {
                return Err(ScriptError::InvalidFiberOperation(format!(
                    "fiber {} is {} and cannot start a new evaluation",
                    id,
                    fiber.state.name()
                )));
            }
        }
        let mut stack = CallStack::new();
        stack.push(CallFrame::program(Arc::new(chunk)));
        self.drive_fiber(id, stack)
    }

    /// Resume a suspended fiber, injecting `value` as the result of its
    /// pending yield. Runs until the next yield or completion.
    pub fn resume_fiber(&mut self, id: FiberId, value: Value) -> Result<Value, ScriptError> {
        let fiber = match self.fibers.get_mut(id) {
            Some(fiber) => fiber,
            None => return Err(unknown_fiber(id)),
        };
        if fiber.state != FiberState::Suspended {
            return Err(ScriptError::InvalidFiberOperation(format!(
                "fiber {} is {}, not suspended",
                id,
                fiber.state.name()
            )));
        }
        if fiber.call_stack.is_empty() {
            return Err(ScriptError::InvalidFiberOperation(format!(
                "fiber {} has no pending yield to resume",
                id
            )));
        }
        let stack = std::mem::take(&mut fiber.call_stack);
        fiber.pending = Some(value);
        self.drive_fiber(id, stack)
    }

    /// Run a fiber's stack, then record the outcome on the fiber record.
    fn drive_fiber(&mut self, id: FiberId, mut stack: CallStack) -> Result<Value, ScriptError> {
        if let Some(fiber) = self.fibers.get_mut(id) {
            fiber.state = FiberState::Running;
            if let Some(value) = fiber.pending.take() {
                if let Some(top) = stack.top_mut() {
                    top.push(value);
                }
            }
        }
        let outcome = self.run_stack(&mut stack, StackKind::Fiber);
        let Some(fiber) = self.fibers.get_mut(id) else {
            // The fiber stopped itself mid-run; the outcome still belongs
            // to the resumer.
            return match outcome? {
                RunOutcome::Completed(value) | RunOutcome::Yielded(value) => Ok(value),
            };
        };
        match outcome {
            Ok(RunOutcome::Yielded(value)) => {
                fiber.call_stack = stack;
                fiber.state = FiberState::Suspended;
                Ok(value)
            }
            Ok(RunOutcome::Completed(value)) => {
                fiber.state = FiberState::Finished;
                fiber.result = Some(value.clone());
                fiber.call_stack = CallStack::new();
                Ok(value)
            }
            Err(err) => {
                fiber.state = FiberState::Finished;
                fiber.result = None;
                fiber.call_stack = CallStack::new();
                Err(err)
            }
        }
    }

    /// Read a local from the topmost frame of a suspended fiber. Reads as
    /// Empty for finished fibers, unknown ids, or names not in scope.
    pub fn read_fiber_local(&self, id: FiberId, name: &str) -> Value {
        match self.fibers.get(id) {
            Some(fiber) if fiber.state == FiberState::Suspended => fiber
                .call_stack
                .top()
                .map(|frame| frame.local(name))
                .unwrap_or(Value::Empty),
            _ => Value::Empty,
        }
    }

    /// Lifecycle state of a fiber, or `None` for unknown/stopped ids.
    pub fn fiber_state(&self, id: FiberId) -> Option<FiberState> {
        self.fibers.get(id).map(|fiber| fiber.state)
    }

    /// Final return value of a finished fiber.
    pub fn fiber_result(&self, id: FiberId) -> Option<Value> {
        self.fibers.get(id).and_then(|fiber| fiber.result.clone())
    }

    /// Number of live fibers.
    pub fn fiber_count(&self) -> usize {
        self.fibers.len()
    }

    /// Serialize one or more suspended fibers to a snapshot file.
    ///
    /// Every listed fiber must be Suspended; nothing is written otherwise.
    pub fn save_fibers<P: AsRef<Path>>(&self, ids: &[FiberId], path: P) -> Result<(), ScriptError> {
        let mut images = Vec::with_capacity(ids.len());
        for &id in ids {
            let fiber = self.fiber(id)?;
            if fiber.state != FiberState::Suspended {
                return Err(ScriptError::InvalidFiberOperation(format!(
                    "fiber {} is {}; only suspended fibers can be saved",
                    id,
                    fiber.state.name()
                )));
            }
            images.push(FiberImage::capture(fiber));
        }
        snapshot::write_to_path(path, images)
    }

    /// Restore fibers from a snapshot file, registering them Suspended
    /// under fresh ids. All-or-nothing: a malformed snapshot leaves the
    /// fiber table untouched.
    pub fn restore_fibers<P: AsRef<Path>>(&mut self, path: P) -> Result<Vec<FiberId>, ScriptError> {
        let images = snapshot::read_from_path(path)?;
        let mut restored = Vec::with_capacity(images.len());
        for image in images {
            restored.push(image.into_parts());
        }
        Ok(restored
            .into_iter()
            .map(|(stack, pending)| self.fibers.adopt(stack, pending))
            .collect())
    }

    /// Destroy a fiber immediately, whatever its state. Its id becomes
    /// invalid.
    pub fn stop_fiber(&mut self, id: FiberId) -> Result<(), ScriptError> {
        match self.fibers.remove(id) {
            Some(_) => Ok(()),
            None => Err(unknown_fiber(id)),
        }
    }

    fn fiber(&self, id: FiberId) -> Result<&Fiber, ScriptError> {
        self.fibers.get(id).ok_or_else(|| unknown_fiber(id))
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

fn unknown_fiber(id: FiberId) -> ScriptError {
    ScriptError::InvalidFiberOperation(format!("unknown fiber {}", id))
}
