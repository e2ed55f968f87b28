//! Bytecode opcodes for the Loomscript stack machine.
//!
//! Operands index into the owning chunk's constant pool, symbol-name table,
//! try tables, or function-prototype list. Jump targets are absolute
//! instruction indices.

use serde::{Deserialize, Serialize};

/// Bytecode opcodes executed by the interpreter's dispatch loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Opcode {
    // Literals
    /// Push constant from the constant pool.
    LoadConstant(u16),
    /// Push the empty value.
    LoadEmpty,

    // Variables
    /// Push a frame local by name-table index; unset locals read as Empty.
    LoadLocal(u16),
    /// Pop into a frame local by name-table index.
    StoreLocal(u16),
    /// Push a global by name-table index; unset globals read as Empty.
    LoadGlobal(u16),
    /// Pop into a global by name-table index.
    StoreGlobal(u16),
    /// Pop an index value, then push the global whose name is the base
    /// name with the index's display form appended (`$log[%i]`).
    LoadGlobalIndexed(u16),
    /// Pop an index value, then pop the value to store under the mangled
    /// global name.
    StoreGlobalIndexed(u16),

    // Stack
    /// Discard the top of the operand stack.
    Pop,
    /// Pop into the frame's sticky result register. Expression statements
    /// end with this, so a script body's value is the value of its last
    /// expression statement even when assignments follow it.
    SetResult,
    /// Push the frame's sticky result register.
    LoadResult,

    // Arithmetic
    /// Numeric add of the top two values.
    Add,
    /// Numeric subtract (second-top minus top).
    Sub,
    /// Numeric multiply.
    Mul,
    /// Numeric divide (second-top over top).
    Div,
    /// Numeric modulo.
    Mod,
    /// Numeric negate of the top value.
    Neg,
    /// Logical NOT of the top value's truthiness.
    Not,

    // Strings
    /// Concatenate display forms of the top two values.
    Concat,

    // Comparison
    /// Numeric equality.
    Equal,
    /// Numeric inequality.
    NotEqual,
    /// String equality of display forms (`$=`).
    StrEqual,
    /// String inequality of display forms (`!$=`).
    StrNotEqual,
    /// Numeric less-than.
    LessThan,
    /// Numeric less-than-or-equal.
    LessThanEqual,
    /// Numeric greater-than.
    GreaterThan,
    /// Numeric greater-than-or-equal.
    GreaterThanEqual,

    // Logical / bitwise
    /// Truthiness AND of the top two values.
    And,
    /// Truthiness OR of the top two values.
    Or,
    /// Integer bitwise OR.
    BitOr,
    /// Integer bitwise AND.
    BitAnd,

    // Control flow
    /// Unconditional jump to an instruction index.
    Jump(usize),
    /// Pop; jump if falsy.
    JumpIfFalse(usize),
    /// Pop; jump if truthy.
    JumpIfTrue(usize),
    /// Pop the return value and leave the current frame.
    Return,

    // Calls
    /// Call by name-table index with the given argument count. Arguments
    /// are popped from the operand stack; the result is pushed.
    Call(u16, u8),

    // Functions
    /// Register the function prototype at the given index into the VM's
    /// function table.
    DefineFunction(u16),

    // Exception handling
    /// Enter a try region: push a try scope referencing the try table at
    /// the given index.
    PushTry(u16),
    /// Leave a try region normally.
    PopTry,
}

impl Opcode {
    /// True for opcodes that end a basic block.
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Opcode::Return | Opcode::Jump(_) | Opcode::JumpIfFalse(_) | Opcode::JumpIfTrue(_)
        )
    }

    /// True for binary operators that pop two values and push one.
    pub fn is_binary(&self) -> bool {
        matches!(
            self,
            Opcode::Add
                | Opcode::Sub
                | Opcode::Mul
                | Opcode::Div
                | Opcode::Mod
                | Opcode::Concat
                | Opcode::Equal
                | Opcode::NotEqual
                | Opcode::StrEqual
                | Opcode::StrNotEqual
                | Opcode::LessThan
                | Opcode::LessThanEqual
                | Opcode::GreaterThan
                | Opcode::GreaterThanEqual
                | Opcode::And
                | Opcode::Or
                | Opcode::BitOr
                | Opcode::BitAnd
        )
    }
}
