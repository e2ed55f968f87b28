//! Execution engine for the Loomscript runtime.
//!
//! This crate owns the call-stack-as-value machinery: explicit call frames
//! with resume cursors, bitmask exception propagation with hard/soft throw
//! semantics, cooperative fibers with yield/resume value transfer, and
//! snapshot save/restore of suspended fibers.
//!
//! # Example
//!
//! ```
//! use bytecode_system::{BytecodeChunk, Opcode};
//! use core_types::Value;
//! use interpreter::Vm;
//!
//! let mut vm = Vm::new();
//! let mut chunk = BytecodeChunk::new();
//! let idx = chunk.add_constant(Value::Number(42.0));
//! chunk.emit(Opcode::LoadConstant(idx));
//! chunk.emit(Opcode::Return);
//!
//! let result = vm.execute(&chunk).unwrap();
//! assert_eq!(result, Value::Number(42.0));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod call_frame;
pub mod call_stack;
pub mod dispatch;
pub mod fiber;
pub mod natives;
pub mod shared;
pub mod signal;
pub mod snapshot;
pub mod vm;

// Re-export main types at crate root
pub use call_frame::{CallFrame, TryScope};
pub use call_stack::CallStack;
pub use fiber::{Fiber, FiberId, FiberState, FiberTable};
pub use natives::{NativeFn, NativeRegistry, NativeResult};
pub use shared::SharedVm;
pub use signal::{ExceptionSignal, NativeOutcome};
pub use snapshot::{FiberGroupImage, FiberImage, FrameImage, SNAPSHOT_VERSION};
pub use vm::{CompilerFn, ConsumerFn, FunctionDef, Vm};
