//! Runtime wrapper wiring the frontend and builtins into a VM.

use crate::error::CliResult;
use bytecode_system::BytecodeChunk;
use core_types::Value;
use interpreter::Vm;

/// A ready-to-use Loomscript runtime: VM + compiler + default natives.
pub struct Runtime {
    vm: Vm,
    print_bytecode: bool,
}

impl Runtime {
    /// Create a runtime with the parser and default builtins installed.
    pub fn new() -> Self {
        let mut vm = Vm::new();
        vm.set_compiler(parser::compile);
        builtins::install(&mut vm);
        Self {
            vm,
            print_bytecode: false,
        }
    }

    /// Print compiled bytecode before executing.
    pub fn with_print_bytecode(mut self, enabled: bool) -> Self {
        self.print_bytecode = enabled;
        self
    }

    /// Access the underlying VM.
    pub fn vm(&mut self) -> &mut Vm {
        &mut self.vm
    }

    /// Execute a script file and return its value.
    pub fn execute_file(&mut self, path: &str) -> CliResult<Value> {
        let source = std::fs::read_to_string(path)?;
        self.execute_string(&source)
    }

    /// Evaluate source text and return its value.
    pub fn execute_string(&mut self, source: &str) -> CliResult<Value> {
        if self.print_bytecode {
            let chunk = self.vm.compile(source)?;
            print!("{}", disassemble(&chunk));
            return Ok(self.vm.execute(&chunk)?);
        }
        Ok(self.vm.evaluate(source)?)
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

/// Render a chunk's instructions, constants, and try tables as text.
pub fn disassemble(chunk: &BytecodeChunk) -> String {
    use std::fmt::Write;

    let mut out = String::new();
    for (index, inst) in chunk.instructions.iter().enumerate() {
        let _ = writeln!(out, "{:4}  {:?}  ; line {}", index, inst.opcode, inst.line);
    }
    for (index, table) in chunk.try_tables.iter().enumerate() {
        let _ = write!(out, "try table {}:", index);
        for clause in &table.catches {
            let _ = write!(out, " catch(0x{:x}) -> {}", clause.mask, clause.target);
        }
        let _ = writeln!(out);
    }
    for proto in &chunk.functions {
        let _ = writeln!(out, "function {}({}):", proto.name, proto.params.join(", "));
        for line in disassemble(&proto.chunk).lines() {
            let _ = writeln!(out, "    {}", line);
        }
    }
    out
}
