//! Bytecode generation from the AST.
//!
//! Two chunk shapes come out of here. A *program* chunk (top-level script
//! or `eval` text) finishes with `LoadResult; Return`, so its value is the
//! value of the last expression statement executed. A *function* chunk
//! falls off its end with `LoadEmpty; Return`; functions only produce a
//! value through an explicit `return`.

use crate::ast::{BinaryOp, CatchArm, Expr, Located, Program, Stmt, UnaryOp};
use bytecode_system::{BytecodeChunk, CatchClause, FunctionProto, Opcode};
use core_types::{ScriptError, Value};

/// Bytecode generator that converts an AST into a chunk.
pub struct CodeGenerator {
    chunk: BytecodeChunk,
    line: u32,
}

impl CodeGenerator {
    /// Create a new code generator.
    pub fn new() -> Self {
        Self {
            chunk: BytecodeChunk::new(),
            line: 0,
        }
    }

    /// Generate a program chunk from a parsed program.
    pub fn generate(mut self, program: &Program) -> Result<BytecodeChunk, ScriptError> {
        self.gen_statements(&program.statements)?;
        self.emit(Opcode::LoadResult);
        self.emit(Opcode::Return);
        Ok(self.chunk)
    }

    /// Generate a function-body chunk.
    fn generate_function_body(
        mut self,
        body: &[Located<Stmt>],
    ) -> Result<BytecodeChunk, ScriptError> {
        self.gen_statements(body)?;
        self.emit(Opcode::LoadEmpty);
        self.emit(Opcode::Return);
        Ok(self.chunk)
    }

    fn emit(&mut self, opcode: Opcode) -> usize {
        self.chunk.emit_at_line(opcode, self.line)
    }

    fn here(&self) -> usize {
        self.chunk.instruction_count()
    }

    fn gen_statements(&mut self, statements: &[Located<Stmt>]) -> Result<(), ScriptError> {
        for stmt in statements {
            self.line = stmt.line;
            self.gen_statement(&stmt.node)?;
        }
        Ok(())
    }

    fn gen_statement(&mut self, stmt: &Stmt) -> Result<(), ScriptError> {
        match stmt {
            Stmt::Expression(expr) => {
                self.gen_expression(expr)?;
                self.emit(Opcode::SetResult);
            }
            Stmt::AssignLocal { name, value } => {
                self.gen_expression(value)?;
                let idx = self.chunk.add_name(name);
                self.emit(Opcode::StoreLocal(idx));
            }
            Stmt::AssignGlobal { name, index, value } => {
                self.gen_expression(value)?;
                let idx = self.chunk.add_name(name);
                match index {
                    Some(index_expr) => {
                        self.gen_expression(index_expr)?;
                        self.emit(Opcode::StoreGlobalIndexed(idx));
                    }
                    None => {
                        self.emit(Opcode::StoreGlobal(idx));
                    }
                }
            }
            Stmt::If {
                cond,
                then_body,
                else_body,
            } => {
                self.gen_expression(cond)?;
                let to_else = self.emit(Opcode::JumpIfFalse(0));
                self.gen_statements(then_body)?;
                if else_body.is_empty() {
                    let end = self.here();
                    self.chunk.patch_jump(to_else, end);
                } else {
                    let to_end = self.emit(Opcode::Jump(0));
                    let else_start = self.here();
                    self.chunk.patch_jump(to_else, else_start);
                    self.gen_statements(else_body)?;
                    let end = self.here();
                    self.chunk.patch_jump(to_end, end);
                }
            }
            Stmt::While { cond, body } => {
                let loop_start = self.here();
                self.gen_expression(cond)?;
                let to_end = self.emit(Opcode::JumpIfFalse(0));
                self.gen_statements(body)?;
                self.emit(Opcode::Jump(loop_start));
                let end = self.here();
                self.chunk.patch_jump(to_end, end);
            }
            Stmt::Return { value } => {
                match value {
                    Some(expr) => self.gen_expression(expr)?,
                    None => {
                        self.emit(Opcode::LoadEmpty);
                    }
                }
                self.emit(Opcode::Return);
            }
            Stmt::Function { name, params, body } => {
                let body_chunk = CodeGenerator::new().generate_function_body(body)?;
                let proto = FunctionProto {
                    name: name.clone(),
                    params: params.clone(),
                    chunk: body_chunk,
                };
                let idx = self.chunk.add_function(proto);
                self.emit(Opcode::DefineFunction(idx));
            }
            Stmt::Try { body, catches } => self.gen_try(body, catches)?,
        }
        Ok(())
    }

    fn gen_try(
        &mut self,
        body: &[Located<Stmt>],
        catches: &[CatchArm],
    ) -> Result<(), ScriptError> {
        let table = self.chunk.add_try_table();
        self.emit(Opcode::PushTry(table));
        self.gen_statements(body)?;
        self.emit(Opcode::PopTry);

        let mut end_jumps = vec![self.emit(Opcode::Jump(0))];
        let mut clauses = Vec::with_capacity(catches.len());
        for (i, arm) in catches.iter().enumerate() {
            let mask = fold_catch_mask(&arm.mask)?;
            clauses.push(CatchClause {
                mask,
                target: self.here(),
            });
            self.gen_statements(&arm.body)?;
            if i + 1 < catches.len() {
                end_jumps.push(self.emit(Opcode::Jump(0)));
            }
        }

        let end = self.here();
        for at in end_jumps {
            self.chunk.patch_jump(at, end);
        }
        self.chunk.try_tables[table as usize].catches = clauses;
        Ok(())
    }

    fn gen_expression(&mut self, expr: &Expr) -> Result<(), ScriptError> {
        match expr {
            Expr::Number(n) => {
                let idx = self.chunk.add_constant(Value::Number(*n));
                self.emit(Opcode::LoadConstant(idx));
            }
            Expr::Str(s) => {
                let idx = self.chunk.add_constant(Value::String(s.clone()));
                self.emit(Opcode::LoadConstant(idx));
            }
            Expr::Bool(b) => {
                let idx = self.chunk.add_constant(Value::Boolean(*b));
                self.emit(Opcode::LoadConstant(idx));
            }
            Expr::Local(name) => {
                let idx = self.chunk.add_name(name);
                self.emit(Opcode::LoadLocal(idx));
            }
            Expr::Global(name) => {
                let idx = self.chunk.add_name(name);
                self.emit(Opcode::LoadGlobal(idx));
            }
            Expr::GlobalIndexed { name, index } => {
                self.gen_expression(index)?;
                let idx = self.chunk.add_name(name);
                self.emit(Opcode::LoadGlobalIndexed(idx));
            }
            Expr::Call { name, args } => {
                if args.len() > u8::MAX as usize {
                    return Err(ScriptError::Syntax(format!(
                        "too many arguments in call to '{}'",
                        name
                    )));
                }
                for arg in args {
                    self.gen_expression(arg)?;
                }
                let idx = self.chunk.add_name(name);
                self.emit(Opcode::Call(idx, args.len() as u8));
            }
            Expr::Unary { op, operand } => {
                self.gen_expression(operand)?;
                match op {
                    UnaryOp::Neg => self.emit(Opcode::Neg),
                    UnaryOp::Not => self.emit(Opcode::Not),
                };
            }
            Expr::Binary { op, lhs, rhs } => {
                self.gen_expression(lhs)?;
                self.gen_expression(rhs)?;
                let opcode = match op {
                    BinaryOp::Add => Opcode::Add,
                    BinaryOp::Sub => Opcode::Sub,
                    BinaryOp::Mul => Opcode::Mul,
                    BinaryOp::Div => Opcode::Div,
                    BinaryOp::Mod => Opcode::Mod,
                    BinaryOp::Concat => Opcode::Concat,
                    BinaryOp::Equal => Opcode::Equal,
                    BinaryOp::NotEqual => Opcode::NotEqual,
                    BinaryOp::StrEqual => Opcode::StrEqual,
                    BinaryOp::StrNotEqual => Opcode::StrNotEqual,
                    BinaryOp::Less => Opcode::LessThan,
                    BinaryOp::LessEqual => Opcode::LessThanEqual,
                    BinaryOp::Greater => Opcode::GreaterThan,
                    BinaryOp::GreaterEqual => Opcode::GreaterThanEqual,
                    BinaryOp::And => Opcode::And,
                    BinaryOp::Or => Opcode::Or,
                    BinaryOp::BitOr => Opcode::BitOr,
                    BinaryOp::BitAnd => Opcode::BitAnd,
                };
                self.emit(opcode);
            }
        }
        Ok(())
    }
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Fold a catch-mask expression to a constant.
///
/// Masks are part of the try table, so they must be known at compile time;
/// literal integers combined with `|` and `&` cover the language surface.
fn fold_catch_mask(expr: &Expr) -> Result<u32, ScriptError> {
    match expr {
        Expr::Number(n) if n.fract() == 0.0 && *n >= 0.0 && *n <= u32::MAX as f64 => {
            Ok(*n as u32)
        }
        Expr::Binary {
            op: BinaryOp::BitOr,
            lhs,
            rhs,
        } => Ok(fold_catch_mask(lhs)? | fold_catch_mask(rhs)?),
        Expr::Binary {
            op: BinaryOp::BitAnd,
            lhs,
            rhs,
        } => Ok(fold_catch_mask(lhs)? & fold_catch_mask(rhs)?),
        _ => Err(ScriptError::Syntax(
            "catch mask must be a constant integer expression".to_string(),
        )),
    }
}
