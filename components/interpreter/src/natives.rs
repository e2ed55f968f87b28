//! Native function registry and the built-in fiber intrinsics.
//!
//! Script calls resolve against the VM's function table first, then this
//! registry. Natives receive the VM and the evaluated arguments and answer
//! with a [`NativeOutcome`]: a plain value, a yield, or a throw. The fiber
//! and exception surface of the language is implemented here as ordinary
//! registry entries over the `Vm` API.

use crate::fiber::FiberId;
use crate::signal::{ExceptionSignal, NativeOutcome};
use crate::vm::Vm;
use core_types::{ScriptError, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Result of a native function call.
pub type NativeResult = Result<NativeOutcome, ScriptError>;

/// A registered native function.
pub type NativeFn = Arc<dyn Fn(&mut Vm, &[Value]) -> NativeResult + Send + Sync>;

/// Name-keyed registry of native functions.
#[derive(Default)]
pub struct NativeRegistry {
    natives: HashMap<String, NativeFn>,
}

impl fmt::Debug for NativeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeRegistry")
            .field("count", &self.natives.len())
            .finish()
    }
}

impl NativeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a native under a name, replacing any previous entry.
    pub fn register<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&mut Vm, &[Value]) -> NativeResult + Send + Sync + 'static,
    {
        self.natives.insert(name.to_string(), Arc::new(f));
    }

    /// Look up a native by name.
    pub fn get(&self, name: &str) -> Option<NativeFn> {
        self.natives.get(name).cloned()
    }

    /// True if a native is registered under the name.
    pub fn contains(&self, name: &str) -> bool {
        self.natives.contains_key(name)
    }
}

/// Fetch an argument; missing arguments read as Empty.
pub fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or(Value::Empty)
}

fn fiber_arg(args: &[Value], index: usize) -> FiberId {
    FiberId(arg(args, index).to_integer().max(0) as u32)
}

/// Register the fiber, exception, and nested-evaluation intrinsics.
pub(crate) fn install_intrinsics(registry: &mut NativeRegistry) {
    registry.register("createFiber", |vm, _args| {
        let id = vm.create_fiber();
        Ok(NativeOutcome::Value(Value::Number(id.0 as f64)))
    });

    registry.register("evalInFiber", |vm, args| {
        let id = fiber_arg(args, 0);
        let code = arg(args, 1).to_string();
        vm.eval_in_fiber(id, &code).map(NativeOutcome::Value)
    });

    registry.register("yieldFiber", |_vm, args| {
        Ok(NativeOutcome::Yield(arg(args, 0)))
    });

    registry.register("resumeFiber", |vm, args| {
        vm.resume_fiber(fiber_arg(args, 0), arg(args, 1))
            .map(NativeOutcome::Value)
    });

    registry.register("readFiberLocalVariable", |vm, args| {
        let value = vm.read_fiber_local(fiber_arg(args, 0), &arg(args, 1).to_string());
        // The script surface is string-or-empty.
        Ok(NativeOutcome::Value(match value {
            Value::Empty => Value::Empty,
            other => Value::String(other.to_string()),
        }))
    });

    registry.register("saveFibers", |vm, args| {
        let id = fiber_arg(args, 0);
        let path = arg(args, 1).to_string();
        match vm.save_fibers(&[id], &path) {
            Ok(()) => Ok(NativeOutcome::Value(Value::Boolean(true))),
            Err(err) => {
                vm.echo(&format!("Warning: saveFibers failed: {}", err));
                Ok(NativeOutcome::Value(Value::Boolean(false)))
            }
        }
    });

    registry.register("restoreFibers", |vm, args| {
        let path = arg(args, 0).to_string();
        let ids = vm.restore_fibers(&path)?;
        let first = ids
            .first()
            .copied()
            .ok_or_else(|| ScriptError::Snapshot("snapshot contains no fibers".to_string()))?;
        Ok(NativeOutcome::Value(Value::Number(first.0 as f64)))
    });

    registry.register("stopFiber", |vm, args| {
        vm.stop_fiber(fiber_arg(args, 0))?;
        Ok(NativeOutcome::Value(Value::Empty))
    });

    registry.register("getFiberState", |vm, args| {
        let name = match vm.fiber_state(fiber_arg(args, 0)) {
            Some(state) => state.name(),
            None => "Stopped",
        };
        Ok(NativeOutcome::Value(Value::String(name.to_string())))
    });

    registry.register("throwFiber", |_vm, args| {
        let mask = arg(args, 0).to_integer();
        if mask <= 0 || mask > u32::MAX as i64 {
            return Err(ScriptError::Native(
                "throwFiber requires a non-zero positive mask".to_string(),
            ));
        }
        Ok(NativeOutcome::Throw(ExceptionSignal {
            mask: mask as u32,
            soft: arg(args, 1).is_truthy(),
        }))
    });

    registry.register("eval", |vm, args| {
        let code = arg(args, 0).to_string();
        vm.eval_boundary(&code).map(NativeOutcome::Value)
    });
}
