//! Fibers: named, independently suspendable call stacks.

use crate::call_stack::CallStack;
use core_types::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Identifier of a fiber in the fiber table.
///
/// Ids are stable for the lifetime of the fiber; restoring a snapshot
/// allocates fresh ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FiberId(pub u32);

impl fmt::Display for FiberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a fiber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FiberState {
    /// Allocated, nothing executed yet.
    Created,
    /// Currently executing (its stack is checked out of the table).
    Running,
    /// Suspended at a yield point; resumable and serializable.
    Suspended,
    /// Entry evaluation finished; the stack is gone but the record and its
    /// result remain queryable.
    Finished,
}

impl FiberState {
    /// Human-readable state name, as reported to scripts.
    pub fn name(&self) -> &'static str {
        match self {
            FiberState::Created => "Created",
            FiberState::Running => "Running",
            FiberState::Suspended => "Suspended",
            FiberState::Finished => "Finished",
        }
    }
}

/// A fiber: one schedulable execution context.
#[derive(Debug)]
pub struct Fiber {
    /// Table identifier.
    pub id: FiberId,
    /// Lifecycle state.
    pub state: FiberState,
    /// The fiber's own call stack. Empty while Created, Running (checked
    /// out by the driver), or Finished.
    pub call_stack: CallStack,
    /// Resume value waiting to be injected as the pending yield's result.
    pub pending: Option<Value>,
    /// Final return value once Finished.
    pub result: Option<Value>,
}

/// Registry of all live fibers.
///
/// Accessed only from the single execution thread driving the interpreter;
/// threaded embedders serialize entry through
/// [`SharedVm`](crate::SharedVm).
#[derive(Debug, Default)]
pub struct FiberTable {
    fibers: HashMap<u32, Fiber>,
    next_id: u32,
}

impl FiberTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            fibers: HashMap::new(),
            next_id: 1,
        }
    }

    /// Allocate a new fiber in state Created.
    pub fn create(&mut self) -> FiberId {
        let id = FiberId(self.next_id);
        self.next_id += 1;
        self.fibers.insert(
            id.0,
            Fiber {
                id,
                state: FiberState::Created,
                call_stack: CallStack::new(),
                pending: None,
                result: None,
            },
        );
        id
    }

    /// Register a restored fiber under a fresh id, already Suspended.
    pub fn adopt(&mut self, call_stack: CallStack, pending: Option<Value>) -> FiberId {
        let id = FiberId(self.next_id);
        self.next_id += 1;
        self.fibers.insert(
            id.0,
            Fiber {
                id,
                state: FiberState::Suspended,
                call_stack,
                pending,
                result: None,
            },
        );
        id
    }

    /// Look up a fiber.
    pub fn get(&self, id: FiberId) -> Option<&Fiber> {
        self.fibers.get(&id.0)
    }

    /// Look up a fiber mutably.
    pub fn get_mut(&mut self, id: FiberId) -> Option<&mut Fiber> {
        self.fibers.get_mut(&id.0)
    }

    /// Remove a fiber, releasing its stack immediately.
    pub fn remove(&mut self, id: FiberId) -> Option<Fiber> {
        self.fibers.remove(&id.0)
    }

    /// Number of live fibers.
    pub fn len(&self) -> usize {
        self.fibers.len()
    }

    /// True when no fibers are registered.
    pub fn is_empty(&self) -> bool {
        self.fibers.is_empty()
    }
}
