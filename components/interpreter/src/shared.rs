//! Mutex-wrapped VM handle for multi-threaded embedders.
//!
//! The VM itself is single-threaded and cooperative: exactly one call
//! stack executes at any instant and the fiber table has no internal
//! locking. A host that calls in from multiple threads must serialize
//! every entry point; `SharedVm` is that single lock.

use crate::fiber::{FiberId, FiberState};
use crate::vm::Vm;
use core_types::{ScriptError, Value};
use parking_lot::{Mutex, MutexGuard};
use std::path::Path;
use std::sync::Arc;

/// A cloneable, thread-safe handle to a [`Vm`].
#[derive(Clone)]
pub struct SharedVm {
    inner: Arc<Mutex<Vm>>,
}

impl SharedVm {
    /// Wrap a VM in a shared handle.
    pub fn new(vm: Vm) -> Self {
        Self {
            inner: Arc::new(Mutex::new(vm)),
        }
    }

    /// Lock the VM for a sequence of operations.
    pub fn lock(&self) -> MutexGuard<'_, Vm> {
        self.inner.lock()
    }

    /// Evaluate source text as a top-level script.
    pub fn evaluate(&self, source: &str) -> Result<Value, ScriptError> {
        self.inner.lock().evaluate(source)
    }

    /// Allocate a new fiber.
    pub fn create_fiber(&self) -> FiberId {
        self.inner.lock().create_fiber()
    }

    /// Begin executing source in a fiber.
    pub fn eval_in_fiber(&self, id: FiberId, source: &str) -> Result<Value, ScriptError> {
        self.inner.lock().eval_in_fiber(id, source)
    }

    /// Resume a suspended fiber with a value.
    pub fn resume_fiber(&self, id: FiberId, value: Value) -> Result<Value, ScriptError> {
        self.inner.lock().resume_fiber(id, value)
    }

    /// Read a local from a suspended fiber's top frame.
    pub fn read_fiber_local(&self, id: FiberId, name: &str) -> Value {
        self.inner.lock().read_fiber_local(id, name)
    }

    /// Lifecycle state of a fiber.
    pub fn fiber_state(&self, id: FiberId) -> Option<FiberState> {
        self.inner.lock().fiber_state(id)
    }

    /// Serialize suspended fibers to a snapshot file.
    pub fn save_fibers<P: AsRef<Path>>(&self, ids: &[FiberId], path: P) -> Result<(), ScriptError> {
        self.inner.lock().save_fibers(ids, path)
    }

    /// Restore fibers from a snapshot file.
    pub fn restore_fibers<P: AsRef<Path>>(&self, path: P) -> Result<Vec<FiberId>, ScriptError> {
        self.inner.lock().restore_fibers(path)
    }

    /// Destroy a fiber.
    pub fn stop_fiber(&self, id: FiberId) -> Result<(), ScriptError> {
        self.inner.lock().stop_fiber(id)
    }
}
