//! Bytecode instruction representation.

use crate::opcode::Opcode;
use serde::{Deserialize, Serialize};

/// A single bytecode instruction with its source line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    /// The opcode for this instruction.
    pub opcode: Opcode,
    /// Source line the instruction was compiled from (1-based, 0 when
    /// assembled by hand).
    pub line: u32,
}

impl Instruction {
    /// Create a new instruction without source mapping.
    pub fn new(opcode: Opcode) -> Self {
        Self { opcode, line: 0 }
    }

    /// Create a new instruction tagged with a source line.
    pub fn with_line(opcode: Opcode, line: u32) -> Self {
        Self { opcode, line }
    }
}
