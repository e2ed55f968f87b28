//! Lexer, parser, and bytecode generator for Loomscript source.
//!
//! The interpreter never links against this crate; it consumes compiled
//! chunks through the compiler callback installed on the VM. Embedders and
//! the CLI wire the two together with [`compile`].
//!
//! # Example
//!
//! ```
//! use parser::compile;
//!
//! let chunk = compile("%x = 1 + 2; echo(%x);").unwrap();
//! assert!(chunk.instruction_count() > 0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ast;
pub mod codegen;
pub mod lexer;
pub mod parser;

pub use codegen::CodeGenerator;
pub use lexer::{Lexer, Token};
pub use parser::Parser;

use bytecode_system::BytecodeChunk;
use core_types::ScriptError;

/// Compile source text to a program chunk.
pub fn compile(source: &str) -> Result<BytecodeChunk, ScriptError> {
    let program = Parser::new(source).parse()?;
    CodeGenerator::new().generate(&program)
}
