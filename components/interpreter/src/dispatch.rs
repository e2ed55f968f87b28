//! Dispatch loop for bytecode execution.
//!
//! Executes the top frame of an explicit [`CallStack`]: a user-function
//! call pushes a frame, `Return` pops one, a native yield suspends the
//! whole stack, and a native throw runs the two-phase exception protocol.
//!
//! Exception handling runs in two phases: a non-destructive handler
//! search, then a destructive unwind. A soft throw that no catch clause
//! in the entire stack matches resumes at the statement after the throw
//! with every frame intact, so no frame may be torn down before a handler
//! is found.

use crate::call_frame::{CallFrame, TryScope};
use crate::call_stack::CallStack;
use crate::signal::{ExceptionSignal, NativeOutcome, RunOutcome, StackKind};
use crate::vm::Vm;
use bytecode_system::Opcode;
use core_types::{ScriptError, Value};

/// Where a handler search landed.
struct HandlerSite {
    frame_index: usize,
    scope_index: usize,
    stack_height: usize,
    target: usize,
}

fn top_frame(stack: &mut CallStack) -> Result<&mut CallFrame, ScriptError> {
    stack
        .top_mut()
        .ok_or_else(|| ScriptError::Native("dispatch on an empty call stack".to_string()))
}

/// Phase one: walk frames top-down, try scopes innermost-first, catch
/// clauses in declaration order; the first clause whose mask intersects
/// the signal wins. Touches nothing.
fn find_handler(stack: &CallStack, mask: u32) -> Option<HandlerSite> {
    for frame_index in (0..stack.depth()).rev() {
        let frame = &stack.frames()[frame_index];
        for scope_index in (0..frame.try_scopes.len()).rev() {
            let scope = &frame.try_scopes[scope_index];
            let Some(table) = frame.chunk.try_tables.get(scope.table as usize) else {
                continue;
            };
            if let Some(clause) = table.catches.iter().find(|c| c.mask & mask != 0) {
                return Some(HandlerSite {
                    frame_index,
                    scope_index,
                    stack_height: scope.stack_height,
                    target: clause.target,
                });
            }
        }
    }
    None
}

/// Phase two: drop frames above the handler, cut the handler frame's
/// operand stack back to the try entry height, drop the matched scope and
/// everything inside it, and move the cursor to the clause body.
fn unwind_to(stack: &mut CallStack, site: &HandlerSite) {
    stack.truncate(site.frame_index + 1);
    if let Some(frame) = stack.top_mut() {
        frame.stack.truncate(site.stack_height);
        frame.try_scopes.truncate(site.scope_index);
        frame.ip = site.target;
    }
}

fn binary_number(
    stack: &mut CallStack,
    f: impl FnOnce(f64, f64) -> f64,
) -> Result<(), ScriptError> {
    let frame = top_frame(stack)?;
    let rhs = frame.pop().to_number();
    let lhs = frame.pop().to_number();
    frame.push(Value::Number(f(lhs, rhs)));
    Ok(())
}

fn binary_compare(
    stack: &mut CallStack,
    f: impl FnOnce(f64, f64) -> bool,
) -> Result<(), ScriptError> {
    let frame = top_frame(stack)?;
    let rhs = frame.pop().to_number();
    let lhs = frame.pop().to_number();
    frame.push(Value::Boolean(f(lhs, rhs)));
    Ok(())
}

fn binary_bits(
    stack: &mut CallStack,
    f: impl FnOnce(i64, i64) -> i64,
) -> Result<(), ScriptError> {
    let frame = top_frame(stack)?;
    let rhs = frame.pop().to_integer();
    let lhs = frame.pop().to_integer();
    frame.push(Value::Number(f(lhs, rhs) as f64));
    Ok(())
}

impl Vm {
    /// Run a call stack until it completes, yields, or dies on an uncaught
    /// hard throw.
    pub(crate) fn run_stack(
        &mut self,
        stack: &mut CallStack,
        kind: StackKind,
    ) -> Result<RunOutcome, ScriptError> {
        loop {
            let op = {
                let Some(frame) = stack.top_mut() else {
                    return Ok(RunOutcome::Completed(Value::Empty));
                };
                if frame.ip < frame.chunk.instructions.len() {
                    let op = frame.chunk.instructions[frame.ip].opcode.clone();
                    frame.ip += 1;
                    op
                } else {
                    // Falling off the end of a chunk behaves like `return;`.
                    Opcode::Return
                }
            };

            match op {
                Opcode::LoadConstant(idx) => {
                    let frame = top_frame(stack)?;
                    let value = frame
                        .chunk
                        .constants
                        .get(idx as usize)
                        .cloned()
                        .unwrap_or(Value::Empty);
                    frame.push(value);
                }
                Opcode::LoadEmpty => top_frame(stack)?.push(Value::Empty),

                Opcode::LoadLocal(idx) => {
                    let frame = top_frame(stack)?;
                    let value = frame
                        .chunk
                        .names
                        .get(idx as usize)
                        .and_then(|name| frame.locals.get(name))
                        .cloned()
                        .unwrap_or(Value::Empty);
                    frame.push(value);
                }
                Opcode::StoreLocal(idx) => {
                    let frame = top_frame(stack)?;
                    let value = frame.pop();
                    let name = chunk_name(frame, idx)?;
                    frame.locals.insert(name, value);
                }
                Opcode::LoadGlobal(idx) => {
                    let frame = top_frame(stack)?;
                    let name = chunk_name(frame, idx)?;
                    let value = self.globals.get(&name).cloned().unwrap_or(Value::Empty);
                    top_frame(stack)?.push(value);
                }
                Opcode::StoreGlobal(idx) => {
                    let frame = top_frame(stack)?;
                    let value = frame.pop();
                    let name = chunk_name(frame, idx)?;
                    self.globals.insert(name, value);
                }
                Opcode::LoadGlobalIndexed(idx) => {
                    let frame = top_frame(stack)?;
                    let index = frame.pop();
                    let name = format!("{}{}", chunk_name(frame, idx)?, index);
                    let value = self.globals.get(&name).cloned().unwrap_or(Value::Empty);
                    top_frame(stack)?.push(value);
                }
                Opcode::StoreGlobalIndexed(idx) => {
                    let frame = top_frame(stack)?;
                    let index = frame.pop();
                    let value = frame.pop();
                    let name = format!("{}{}", chunk_name(frame, idx)?, index);
                    self.globals.insert(name, value);
                }

                Opcode::Pop => {
                    top_frame(stack)?.pop();
                }
                Opcode::SetResult => {
                    let frame = top_frame(stack)?;
                    let value = frame.pop();
                    frame.result = value;
                }
                Opcode::LoadResult => {
                    let frame = top_frame(stack)?;
                    let value = frame.result.clone();
                    frame.push(value);
                }

                Opcode::Add => binary_number(stack, |a, b| a + b)?,
                Opcode::Sub => binary_number(stack, |a, b| a - b)?,
                Opcode::Mul => binary_number(stack, |a, b| a * b)?,
                Opcode::Div => binary_number(stack, |a, b| a / b)?,
                Opcode::Mod => binary_number(stack, |a, b| a % b)?,
                Opcode::Neg => {
                    let frame = top_frame(stack)?;
                    let value = frame.pop().to_number();
                    frame.push(Value::Number(-value));
                }
                Opcode::Not => {
                    let frame = top_frame(stack)?;
                    let value = frame.pop();
                    frame.push(Value::Boolean(!value.is_truthy()));
                }
                Opcode::Concat => {
                    let frame = top_frame(stack)?;
                    let rhs = frame.pop();
                    let lhs = frame.pop();
                    frame.push(Value::String(format!("{}{}", lhs, rhs)));
                }

                Opcode::Equal => binary_compare(stack, |a, b| a == b)?,
                Opcode::NotEqual => binary_compare(stack, |a, b| a != b)?,
                Opcode::StrEqual => {
                    let frame = top_frame(stack)?;
                    let rhs = frame.pop();
                    let lhs = frame.pop();
                    frame.push(Value::Boolean(lhs.to_string() == rhs.to_string()));
                }
                Opcode::StrNotEqual => {
                    let frame = top_frame(stack)?;
                    let rhs = frame.pop();
                    let lhs = frame.pop();
                    frame.push(Value::Boolean(lhs.to_string() != rhs.to_string()));
                }
                Opcode::LessThan => binary_compare(stack, |a, b| a < b)?,
                Opcode::LessThanEqual => binary_compare(stack, |a, b| a <= b)?,
                Opcode::GreaterThan => binary_compare(stack, |a, b| a > b)?,
                Opcode::GreaterThanEqual => binary_compare(stack, |a, b| a >= b)?,

                Opcode::And => {
                    let frame = top_frame(stack)?;
                    let rhs = frame.pop();
                    let lhs = frame.pop();
                    frame.push(Value::Boolean(lhs.is_truthy() && rhs.is_truthy()));
                }
                Opcode::Or => {
                    let frame = top_frame(stack)?;
                    let rhs = frame.pop();
                    let lhs = frame.pop();
                    frame.push(Value::Boolean(lhs.is_truthy() || rhs.is_truthy()));
                }
                Opcode::BitOr => binary_bits(stack, |a, b| a | b)?,
                Opcode::BitAnd => binary_bits(stack, |a, b| a & b)?,

                Opcode::Jump(target) => top_frame(stack)?.ip = target,
                Opcode::JumpIfFalse(target) => {
                    let frame = top_frame(stack)?;
                    if !frame.pop().is_truthy() {
                        frame.ip = target;
                    }
                }
                Opcode::JumpIfTrue(target) => {
                    let frame = top_frame(stack)?;
                    if frame.pop().is_truthy() {
                        frame.ip = target;
                    }
                }

                Opcode::Return => {
                    let value = match stack.pop() {
                        Some(mut frame) => frame.pop(),
                        None => Value::Empty,
                    };
                    match stack.top_mut() {
                        Some(caller) => caller.push(value),
                        None => return Ok(RunOutcome::Completed(value)),
                    }
                }

                Opcode::Call(name_idx, argc) => {
                    let (name, args) = {
                        let frame = top_frame(stack)?;
                        let name = chunk_name(frame, name_idx)?;
                        let mut args = Vec::with_capacity(argc as usize);
                        for _ in 0..argc {
                            args.push(frame.pop());
                        }
                        args.reverse();
                        (name, args)
                    };
                    if let Some(outcome) = self.dispatch_call(stack, kind, &name, args)? {
                        return Ok(outcome);
                    }
                }

                Opcode::DefineFunction(idx) => {
                    let proto = {
                        let frame = top_frame(stack)?;
                        frame
                            .chunk
                            .functions
                            .get(idx as usize)
                            .cloned()
                            .ok_or_else(|| {
                                ScriptError::Native("invalid function index in chunk".to_string())
                            })?
                    };
                    self.define_function(proto);
                }

                Opcode::PushTry(table) => {
                    let frame = top_frame(stack)?;
                    let stack_height = frame.stack.len();
                    frame.try_scopes.push(TryScope {
                        table,
                        stack_height,
                    });
                }
                Opcode::PopTry => {
                    top_frame(stack)?.try_scopes.pop();
                }
            }
        }
    }

    /// Resolve a call: the function table wins over the native registry;
    /// an unknown name warns and evaluates to Empty.
    ///
    /// Returns `Some(outcome)` when the call ends the whole run (a yield
    /// surfacing out of a fiber stack).
    fn dispatch_call(
        &mut self,
        stack: &mut CallStack,
        kind: StackKind,
        name: &str,
        args: Vec<Value>,
    ) -> Result<Option<RunOutcome>, ScriptError> {
        if let Some(func) = self.functions.get(name).cloned() {
            stack.push(CallFrame::call(name, func.chunk, &func.params, args));
            return Ok(None);
        }
        let Some(native) = self.natives.get(name) else {
            self.echo(&format!("Warning: unknown function '{}'", name));
            top_frame(stack)?.push(Value::Empty);
            return Ok(None);
        };
        match native.as_ref()(self, &args)? {
            NativeOutcome::Value(value) => {
                top_frame(stack)?.push(value);
                Ok(None)
            }
            NativeOutcome::Yield(value) => match kind {
                StackKind::Fiber => Ok(Some(RunOutcome::Yielded(value))),
                StackKind::Script => Err(ScriptError::InvalidFiberOperation(
                    "yieldFiber called outside a fiber".to_string(),
                )),
                StackKind::Boundary => Err(ScriptError::InvalidFiberOperation(
                    "yieldFiber called across a native call boundary".to_string(),
                )),
            },
            NativeOutcome::Throw(signal) => {
                self.raise(stack, kind, signal)?;
                Ok(None)
            }
        }
    }

    /// Run the throw protocol for one signal.
    fn raise(
        &mut self,
        stack: &mut CallStack,
        kind: StackKind,
        signal: ExceptionSignal,
    ) -> Result<(), ScriptError> {
        if let Some(site) = find_handler(stack, signal.mask) {
            unwind_to(stack, &site);
            return Ok(());
        }
        if signal.soft || kind == StackKind::Boundary {
            // Nothing matched and nothing was unwound: the throwing call
            // evaluates to Empty and execution continues after it. Inside a
            // native boundary this holds for hard throws too.
            top_frame(stack)?.push(Value::Empty);
            return Ok(());
        }
        Err(ScriptError::UncaughtException { mask: signal.mask })
    }
}

fn chunk_name(frame: &CallFrame, idx: u16) -> Result<String, ScriptError> {
    frame
        .chunk
        .names
        .get(idx as usize)
        .cloned()
        .ok_or_else(|| ScriptError::Native("invalid name index in chunk".to_string()))
}
