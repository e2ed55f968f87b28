//! Lexer for Loomscript source code.
//!
//! Console-script surface: `%local` and `$global` sigil variables,
//! double-quoted strings, `@` concatenation, `$=` string comparison, and
//! C-style comments.

use core_types::ScriptError;

/// Reserved words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    /// `function`
    Function,
    /// `if`
    If,
    /// `else`
    Else,
    /// `while`
    While,
    /// `return`
    Return,
    /// `try`
    Try,
    /// `catch`
    Catch,
    /// `true`
    True,
    /// `false`
    False,
}

fn keyword_of(ident: &str) -> Option<Keyword> {
    match ident {
        "function" => Some(Keyword::Function),
        "if" => Some(Keyword::If),
        "else" => Some(Keyword::Else),
        "while" => Some(Keyword::While),
        "return" => Some(Keyword::Return),
        "try" => Some(Keyword::Try),
        "catch" => Some(Keyword::Catch),
        "true" => Some(Keyword::True),
        "false" => Some(Keyword::False),
        _ => None,
    }
}

/// Punctuators and operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Punct {
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semicolon,
    Comma,
    Assign,
    At,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqEq,
    BangEq,
    StrEq,
    StrBangEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
    Bang,
    Pipe,
    Amp,
}

/// A lexical token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Numeric literal.
    Number(f64),
    /// String literal (escapes resolved).
    Str(String),
    /// Bare identifier (function names).
    Ident(String),
    /// `%name` local variable, stored with its sigil.
    Local(String),
    /// `$name` global variable, stored with its sigil.
    Global(String),
    /// Reserved word.
    Keyword(Keyword),
    /// Punctuator or operator.
    Punct(Punct),
    /// End of input.
    Eof,
}

/// Lexer over Loomscript source text.
pub struct Lexer {
    chars: Vec<char>,
    position: usize,
    line: u32,
    current_token: Option<Token>,
}

impl Lexer {
    /// Create a new lexer for the given source code.
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            position: 0,
            line: 1,
            current_token: None,
        }
    }

    /// Current source line (1-based).
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Get the next token, consuming it.
    pub fn next_token(&mut self) -> Result<Token, ScriptError> {
        if let Some(token) = self.current_token.take() {
            return Ok(token);
        }
        self.scan_token()
    }

    /// Peek at the next token without consuming it.
    pub fn peek_token(&mut self) -> Result<&Token, ScriptError> {
        if self.current_token.is_none() {
            self.current_token = Some(self.scan_token()?);
        }
        Ok(self.current_token.as_ref().unwrap())
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.chars.len()
    }

    fn peek(&self) -> char {
        self.chars[self.position]
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.position + 1).copied()
    }

    fn advance(&mut self) -> char {
        let c = self.chars[self.position];
        self.position += 1;
        if c == '\n' {
            self.line += 1;
        }
        c
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), ScriptError> {
        loop {
            while !self.is_at_end() && self.peek().is_whitespace() {
                self.advance();
            }
            if self.is_at_end() {
                return Ok(());
            }
            if self.peek() == '/' && self.peek_next() == Some('/') {
                while !self.is_at_end() && self.peek() != '\n' {
                    self.advance();
                }
            } else if self.peek() == '/' && self.peek_next() == Some('*') {
                let start_line = self.line;
                self.advance();
                self.advance();
                loop {
                    if self.is_at_end() {
                        return Err(ScriptError::Syntax(format!(
                            "unterminated block comment starting at line {}",
                            start_line
                        )));
                    }
                    if self.peek() == '*' && self.peek_next() == Some('/') {
                        self.advance();
                        self.advance();
                        break;
                    }
                    self.advance();
                }
            } else {
                return Ok(());
            }
        }
    }

    fn scan_token(&mut self) -> Result<Token, ScriptError> {
        self.skip_whitespace_and_comments()?;
        if self.is_at_end() {
            return Ok(Token::Eof);
        }

        let c = self.peek();
        match c {
            '0'..='9' => self.scan_number(),
            '"' => self.scan_string(),
            '%' => {
                if self
                    .peek_next()
                    .map(|n| n.is_ascii_alphabetic() || n == '_')
                    .unwrap_or(false)
                {
                    self.advance();
                    let name = self.scan_ident_text();
                    Ok(Token::Local(format!("%{}", name)))
                } else {
                    self.advance();
                    Ok(Token::Punct(Punct::Percent))
                }
            }
            '$' => {
                if self.peek_next() == Some('=') {
                    self.advance();
                    self.advance();
                    Ok(Token::Punct(Punct::StrEq))
                } else if self
                    .peek_next()
                    .map(|n| n.is_ascii_alphabetic() || n == '_')
                    .unwrap_or(false)
                {
                    self.advance();
                    let name = self.scan_ident_text();
                    Ok(Token::Global(format!("${}", name)))
                } else {
                    Err(ScriptError::Syntax(format!(
                        "stray '$' at line {}",
                        self.line
                    )))
                }
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let ident = self.scan_ident_text();
                match keyword_of(&ident) {
                    Some(kw) => Ok(Token::Keyword(kw)),
                    None => Ok(Token::Ident(ident)),
                }
            }
            _ => self.scan_punct(),
        }
    }

    fn scan_ident_text(&mut self) -> String {
        let mut out = String::new();
        while !self.is_at_end() {
            let c = self.peek();
            if c.is_ascii_alphanumeric() || c == '_' {
                out.push(self.advance());
            } else {
                break;
            }
        }
        out
    }

    fn scan_number(&mut self) -> Result<Token, ScriptError> {
        let start_line = self.line;
        let mut text = String::new();
        while !self.is_at_end() && self.peek().is_ascii_digit() {
            text.push(self.advance());
        }
        if !self.is_at_end()
            && self.peek() == '.'
            && self.peek_next().map(|n| n.is_ascii_digit()).unwrap_or(false)
        {
            text.push(self.advance());
            while !self.is_at_end() && self.peek().is_ascii_digit() {
                text.push(self.advance());
            }
        }
        if !self.is_at_end() && matches!(self.peek(), 'e' | 'E') {
            let mut lookahead = self.position + 1;
            if self
                .chars
                .get(lookahead)
                .map(|c| *c == '+' || *c == '-')
                .unwrap_or(false)
            {
                lookahead += 1;
            }
            if self
                .chars
                .get(lookahead)
                .map(|c| c.is_ascii_digit())
                .unwrap_or(false)
            {
                text.push(self.advance());
                if matches!(self.peek(), '+' | '-') {
                    text.push(self.advance());
                }
                while !self.is_at_end() && self.peek().is_ascii_digit() {
                    text.push(self.advance());
                }
            }
        }
        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| ScriptError::Syntax(format!("bad number literal at line {}", start_line)))
    }

    fn scan_string(&mut self) -> Result<Token, ScriptError> {
        let start_line = self.line;
        self.advance(); // opening quote
        let mut out = String::new();
        loop {
            if self.is_at_end() {
                return Err(ScriptError::Syntax(format!(
                    "unterminated string starting at line {}",
                    start_line
                )));
            }
            let c = self.advance();
            match c {
                '"' => return Ok(Token::Str(out)),
                '\\' => {
                    if self.is_at_end() {
                        return Err(ScriptError::Syntax(format!(
                            "unterminated string starting at line {}",
                            start_line
                        )));
                    }
                    let esc = self.advance();
                    match esc {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        '"' => out.push('"'),
                        '\\' => out.push('\\'),
                        other => {
                            return Err(ScriptError::Syntax(format!(
                                "unknown escape '\\{}' at line {}",
                                other, self.line
                            )))
                        }
                    }
                }
                other => out.push(other),
            }
        }
    }

    fn scan_punct(&mut self) -> Result<Token, ScriptError> {
        let c = self.advance();
        let p = match c {
            '(' => Punct::LParen,
            ')' => Punct::RParen,
            '{' => Punct::LBrace,
            '}' => Punct::RBrace,
            '[' => Punct::LBracket,
            ']' => Punct::RBracket,
            ';' => Punct::Semicolon,
            ',' => Punct::Comma,
            '@' => Punct::At,
            '+' => Punct::Plus,
            '-' => Punct::Minus,
            '*' => Punct::Star,
            '/' => Punct::Slash,
            '=' => {
                if !self.is_at_end() && self.peek() == '=' {
                    self.advance();
                    Punct::EqEq
                } else {
                    Punct::Assign
                }
            }
            '!' => {
                if !self.is_at_end() && self.peek() == '=' {
                    self.advance();
                    Punct::BangEq
                } else if !self.is_at_end() && self.peek() == '$' && self.peek_next() == Some('=') {
                    self.advance();
                    self.advance();
                    Punct::StrBangEq
                } else {
                    Punct::Bang
                }
            }
            '<' => {
                if !self.is_at_end() && self.peek() == '=' {
                    self.advance();
                    Punct::Le
                } else {
                    Punct::Lt
                }
            }
            '>' => {
                if !self.is_at_end() && self.peek() == '=' {
                    self.advance();
                    Punct::Ge
                } else {
                    Punct::Gt
                }
            }
            '&' => {
                if !self.is_at_end() && self.peek() == '&' {
                    self.advance();
                    Punct::AndAnd
                } else {
                    Punct::Amp
                }
            }
            '|' => {
                if !self.is_at_end() && self.peek() == '|' {
                    self.advance();
                    Punct::OrOr
                } else {
                    Punct::Pipe
                }
            }
            other => {
                return Err(ScriptError::Syntax(format!(
                    "unexpected character '{}' at line {}",
                    other, self.line
                )))
            }
        };
        Ok(Token::Punct(p))
    }
}
