//! Recursive-descent parser for Loomscript.

use crate::ast::{BinaryOp, CatchArm, Expr, Located, Program, Stmt, UnaryOp};
use crate::lexer::{Keyword, Lexer, Punct, Token};
use core_types::ScriptError;

/// Parser over Loomscript source text.
pub struct Parser {
    lexer: Lexer,
}

impl Parser {
    /// Create a new parser for the given source code.
    pub fn new(source: &str) -> Self {
        Self {
            lexer: Lexer::new(source),
        }
    }

    /// Parse the whole input as a program.
    pub fn parse(&mut self) -> Result<Program, ScriptError> {
        let mut statements = Vec::new();
        while self.lexer.peek_token()? != &Token::Eof {
            statements.push(self.parse_statement()?);
        }
        Ok(Program { statements })
    }

    fn error(&self, msg: impl Into<String>) -> ScriptError {
        ScriptError::Syntax(format!("{} at line {}", msg.into(), self.lexer.line()))
    }

    fn expect_punct(&mut self, p: Punct, what: &str) -> Result<(), ScriptError> {
        match self.lexer.next_token()? {
            Token::Punct(got) if got == p => Ok(()),
            got => Err(self.error(format!("expected {}, found {:?}", what, got))),
        }
    }

    fn eat_punct(&mut self, p: Punct) -> Result<bool, ScriptError> {
        if self.lexer.peek_token()? == &Token::Punct(p) {
            self.lexer.next_token()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn parse_statement(&mut self) -> Result<Located<Stmt>, ScriptError> {
        // Force the next token in so the recorded line is the statement's
        // own first line, not the end of the previous statement.
        self.lexer.peek_token()?;
        let line = self.lexer.line();
        let stmt = match self.lexer.peek_token()? {
            Token::Keyword(Keyword::Function) => self.parse_function()?,
            Token::Keyword(Keyword::If) => self.parse_if()?,
            Token::Keyword(Keyword::While) => self.parse_while()?,
            Token::Keyword(Keyword::Return) => self.parse_return()?,
            Token::Keyword(Keyword::Try) => self.parse_try()?,
            _ => self.parse_expression_or_assignment()?,
        };
        Ok(Located::new(stmt, line))
    }

    /// Parse `{ stmt* }`.
    fn parse_block(&mut self) -> Result<Vec<Located<Stmt>>, ScriptError> {
        self.expect_punct(Punct::LBrace, "'{'")?;
        let mut body = Vec::new();
        loop {
            match self.lexer.peek_token()? {
                Token::Punct(Punct::RBrace) => {
                    self.lexer.next_token()?;
                    return Ok(body);
                }
                Token::Eof => return Err(self.error("unterminated block")),
                _ => body.push(self.parse_statement()?),
            }
        }
    }

    fn parse_function(&mut self) -> Result<Stmt, ScriptError> {
        self.lexer.next_token()?; // function
        let name = match self.lexer.next_token()? {
            Token::Ident(name) => name,
            got => return Err(self.error(format!("expected function name, found {:?}", got))),
        };
        self.expect_punct(Punct::LParen, "'('")?;
        let mut params = Vec::new();
        if !self.eat_punct(Punct::RParen)? {
            loop {
                match self.lexer.next_token()? {
                    Token::Local(p) => params.push(p),
                    got => {
                        return Err(self.error(format!("expected %parameter, found {:?}", got)))
                    }
                }
                if self.eat_punct(Punct::Comma)? {
                    continue;
                }
                self.expect_punct(Punct::RParen, "')'")?;
                break;
            }
        }
        let body = self.parse_block()?;
        Ok(Stmt::Function { name, params, body })
    }

    fn parse_if(&mut self) -> Result<Stmt, ScriptError> {
        self.lexer.next_token()?; // if
        self.expect_punct(Punct::LParen, "'('")?;
        let cond = self.parse_expression()?;
        self.expect_punct(Punct::RParen, "')'")?;
        let then_body = self.parse_block()?;
        let else_body = if self.lexer.peek_token()? == &Token::Keyword(Keyword::Else) {
            self.lexer.next_token()?;
            if self.lexer.peek_token()? == &Token::Keyword(Keyword::If) {
                let line = self.lexer.line();
                vec![Located::new(self.parse_if()?, line)]
            } else {
                self.parse_block()?
            }
        } else {
            Vec::new()
        };
        Ok(Stmt::If {
            cond,
            then_body,
            else_body,
        })
    }

    fn parse_while(&mut self) -> Result<Stmt, ScriptError> {
        self.lexer.next_token()?; // while
        self.expect_punct(Punct::LParen, "'('")?;
        let cond = self.parse_expression()?;
        self.expect_punct(Punct::RParen, "')'")?;
        let body = self.parse_block()?;
        Ok(Stmt::While { cond, body })
    }

    fn parse_return(&mut self) -> Result<Stmt, ScriptError> {
        self.lexer.next_token()?; // return
        if self.eat_punct(Punct::Semicolon)? {
            return Ok(Stmt::Return { value: None });
        }
        let value = self.parse_expression()?;
        self.expect_punct(Punct::Semicolon, "';'")?;
        Ok(Stmt::Return { value: Some(value) })
    }

    fn parse_try(&mut self) -> Result<Stmt, ScriptError> {
        self.lexer.next_token()?; // try
        let body = self.parse_block()?;
        let mut catches = Vec::new();
        while self.lexer.peek_token()? == &Token::Keyword(Keyword::Catch) {
            self.lexer.next_token()?;
            self.expect_punct(Punct::LParen, "'('")?;
            let mask = self.parse_expression()?;
            self.expect_punct(Punct::RParen, "')'")?;
            let handler = self.parse_block()?;
            catches.push(CatchArm { mask, body: handler });
        }
        if catches.is_empty() {
            return Err(self.error("try without catch"));
        }
        Ok(Stmt::Try { body, catches })
    }

    /// Parse an expression statement, reinterpreting `lvalue = expr;` as an
    /// assignment.
    fn parse_expression_or_assignment(&mut self) -> Result<Stmt, ScriptError> {
        let expr = self.parse_expression()?;
        if self.eat_punct(Punct::Assign)? {
            let value = self.parse_expression()?;
            self.expect_punct(Punct::Semicolon, "';'")?;
            return match expr {
                Expr::Local(name) => Ok(Stmt::AssignLocal { name, value }),
                Expr::Global(name) => Ok(Stmt::AssignGlobal {
                    name,
                    index: None,
                    value,
                }),
                Expr::GlobalIndexed { name, index } => Ok(Stmt::AssignGlobal {
                    name,
                    index: Some(*index),
                    value,
                }),
                _ => Err(self.error("invalid assignment target")),
            };
        }
        self.expect_punct(Punct::Semicolon, "';'")?;
        Ok(Stmt::Expression(expr))
    }

    fn parse_expression(&mut self) -> Result<Expr, ScriptError> {
        self.parse_or()
    }

    fn parse_binary_level(
        &mut self,
        next: fn(&mut Self) -> Result<Expr, ScriptError>,
        table: &[(Punct, BinaryOp)],
    ) -> Result<Expr, ScriptError> {
        let mut lhs = next(self)?;
        loop {
            let op = match self.lexer.peek_token()? {
                Token::Punct(p) => table.iter().find(|(tp, _)| tp == p).map(|(_, op)| *op),
                _ => None,
            };
            let Some(op) = op else { return Ok(lhs) };
            self.lexer.next_token()?;
            let rhs = next(self)?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn parse_or(&mut self) -> Result<Expr, ScriptError> {
        self.parse_binary_level(Self::parse_and, &[(Punct::OrOr, BinaryOp::Or)])
    }

    fn parse_and(&mut self) -> Result<Expr, ScriptError> {
        self.parse_binary_level(Self::parse_bit_or, &[(Punct::AndAnd, BinaryOp::And)])
    }

    fn parse_bit_or(&mut self) -> Result<Expr, ScriptError> {
        self.parse_binary_level(Self::parse_bit_and, &[(Punct::Pipe, BinaryOp::BitOr)])
    }

    fn parse_bit_and(&mut self) -> Result<Expr, ScriptError> {
        self.parse_binary_level(Self::parse_equality, &[(Punct::Amp, BinaryOp::BitAnd)])
    }

    fn parse_equality(&mut self) -> Result<Expr, ScriptError> {
        self.parse_binary_level(
            Self::parse_relational,
            &[
                (Punct::EqEq, BinaryOp::Equal),
                (Punct::BangEq, BinaryOp::NotEqual),
                (Punct::StrEq, BinaryOp::StrEqual),
                (Punct::StrBangEq, BinaryOp::StrNotEqual),
            ],
        )
    }

    fn parse_relational(&mut self) -> Result<Expr, ScriptError> {
        self.parse_binary_level(
            Self::parse_concat,
            &[
                (Punct::Lt, BinaryOp::Less),
                (Punct::Le, BinaryOp::LessEqual),
                (Punct::Gt, BinaryOp::Greater),
                (Punct::Ge, BinaryOp::GreaterEqual),
            ],
        )
    }

    fn parse_concat(&mut self) -> Result<Expr, ScriptError> {
        self.parse_binary_level(Self::parse_additive, &[(Punct::At, BinaryOp::Concat)])
    }

    fn parse_additive(&mut self) -> Result<Expr, ScriptError> {
        self.parse_binary_level(
            Self::parse_multiplicative,
            &[(Punct::Plus, BinaryOp::Add), (Punct::Minus, BinaryOp::Sub)],
        )
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ScriptError> {
        self.parse_binary_level(
            Self::parse_unary,
            &[
                (Punct::Star, BinaryOp::Mul),
                (Punct::Slash, BinaryOp::Div),
                (Punct::Percent, BinaryOp::Mod),
            ],
        )
    }

    fn parse_unary(&mut self) -> Result<Expr, ScriptError> {
        match self.lexer.peek_token()? {
            Token::Punct(Punct::Minus) => {
                self.lexer.next_token()?;
                let operand = self.parse_unary()?;
                Ok(Expr::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(operand),
                })
            }
            Token::Punct(Punct::Bang) => {
                self.lexer.next_token()?;
                let operand = self.parse_unary()?;
                Ok(Expr::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                })
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ScriptError> {
        match self.lexer.next_token()? {
            Token::Number(n) => Ok(Expr::Number(n)),
            Token::Str(s) => Ok(Expr::Str(s)),
            Token::Keyword(Keyword::True) => Ok(Expr::Bool(true)),
            Token::Keyword(Keyword::False) => Ok(Expr::Bool(false)),
            Token::Local(name) => Ok(Expr::Local(name)),
            Token::Global(name) => {
                if self.eat_punct(Punct::LBracket)? {
                    let index = self.parse_expression()?;
                    self.expect_punct(Punct::RBracket, "']'")?;
                    Ok(Expr::GlobalIndexed {
                        name,
                        index: Box::new(index),
                    })
                } else {
                    Ok(Expr::Global(name))
                }
            }
            Token::Ident(name) => {
                self.expect_punct(Punct::LParen, "'(' after function name")?;
                let mut args = Vec::new();
                if !self.eat_punct(Punct::RParen)? {
                    loop {
                        args.push(self.parse_expression()?);
                        if self.eat_punct(Punct::Comma)? {
                            continue;
                        }
                        self.expect_punct(Punct::RParen, "')'")?;
                        break;
                    }
                }
                Ok(Expr::Call { name, args })
            }
            Token::Punct(Punct::LParen) => {
                let inner = self.parse_expression()?;
                self.expect_punct(Punct::RParen, "')'")?;
                Ok(inner)
            }
            got => Err(self.error(format!("unexpected token {:?}", got))),
        }
    }
}
