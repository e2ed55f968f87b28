//! Bytecode system for the Loomscript runtime.
//!
//! This crate defines the compiled representation executed by the
//! interpreter: a stack-machine instruction set, chunks with constant and
//! symbol pools, try tables for bitmask exception handling, and function
//! prototypes.
//!
//! # Example
//!
//! ```
//! use bytecode_system::{BytecodeChunk, Opcode};
//! use core_types::Value;
//!
//! let mut chunk = BytecodeChunk::new();
//! let idx = chunk.add_constant(Value::Number(42.0));
//! chunk.emit(Opcode::LoadConstant(idx));
//! chunk.emit(Opcode::Return);
//!
//! assert_eq!(chunk.instruction_count(), 2);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chunk;
pub mod instruction;
pub mod opcode;

// Re-export main types at crate root
pub use chunk::{BytecodeChunk, CatchClause, FunctionProto, TryTable};
pub use instruction::Instruction;
pub use opcode::Opcode;
