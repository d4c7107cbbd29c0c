//=====================================================
// File: tokenizer/mod.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: RuleScript lexical analysis
// Objective: Convert raw script text into a flat token stream, resolving
//            significant indentation into explicit Indent/Dedent markers
//=====================================================

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;
use tracing::trace;

//=====================================================
// Section 1: Positions & Tokens
//=====================================================

/// Width of one indentation level, in spaces.
pub const INDENT_UNIT: usize = 4;

/// 1-based source location of the first character of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// All token kinds produced by the tokenizer.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Number(f64),
    String(String),
    Boolean(bool),
    Identifier(String),

    // Keywords
    If,
    Else,
    For,
    In,
    Return,
    Subscribe,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Power,
    EqualEqual,
    NotEqual,
    Greater,
    Less,
    GreaterEqual,
    LessEqual,
    And,
    Or,
    Not,
    Assign,

    // Delimiters
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Comma,
    Colon,
    Dot,

    // Structure
    Newline,
    Indent,
    Dedent,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Number(n) => write!(f, "number {}", n),
            TokenKind::String(s) => write!(f, "string {:?}", s),
            TokenKind::Boolean(b) => write!(f, "'{}'", b),
            TokenKind::Identifier(name) => write!(f, "identifier '{}'", name),
            TokenKind::If => f.write_str("'if'"),
            TokenKind::Else => f.write_str("'else'"),
            TokenKind::For => f.write_str("'for'"),
            TokenKind::In => f.write_str("'in'"),
            TokenKind::Return => f.write_str("'return'"),
            TokenKind::Subscribe => f.write_str("'subscribe'"),
            TokenKind::Plus => f.write_str("'+'"),
            TokenKind::Minus => f.write_str("'-'"),
            TokenKind::Star => f.write_str("'*'"),
            TokenKind::Slash => f.write_str("'/'"),
            TokenKind::Percent => f.write_str("'%'"),
            TokenKind::Power => f.write_str("'**'"),
            TokenKind::EqualEqual => f.write_str("'=='"),
            TokenKind::NotEqual => f.write_str("'!='"),
            TokenKind::Greater => f.write_str("'>'"),
            TokenKind::Less => f.write_str("'<'"),
            TokenKind::GreaterEqual => f.write_str("'>='"),
            TokenKind::LessEqual => f.write_str("'<='"),
            TokenKind::And => f.write_str("'&&'"),
            TokenKind::Or => f.write_str("'||'"),
            TokenKind::Not => f.write_str("'!'"),
            TokenKind::Assign => f.write_str("'='"),
            TokenKind::LeftParen => f.write_str("'('"),
            TokenKind::RightParen => f.write_str("')'"),
            TokenKind::LeftBracket => f.write_str("'['"),
            TokenKind::RightBracket => f.write_str("']'"),
            TokenKind::Comma => f.write_str("','"),
            TokenKind::Colon => f.write_str("':'"),
            TokenKind::Dot => f.write_str("'.'"),
            TokenKind::Newline => f.write_str("end of line"),
            TokenKind::Indent => f.write_str("indent"),
            TokenKind::Dedent => f.write_str("dedent"),
            TokenKind::Eof => f.write_str("end of input"),
        }
    }
}

/// A token with its kind and position information
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: Position,
}

impl Token {
    pub fn new(kind: TokenKind, position: Position) -> Self {
        Self { kind, position }
    }
}

//=====================================================
// Section 2: Lex Errors
//=====================================================

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    #[error("Unexpected character '{character}' at {position}")]
    UnexpectedCharacter { character: char, position: Position },
    #[error("Unterminated string at {position}")]
    UnterminatedString { position: Position },
    #[error("Unterminated comment at {position}")]
    UnterminatedComment { position: Position },
    #[error("Invalid number literal '{literal}' at {position}")]
    InvalidNumber { literal: String, position: Position },
    #[error("Invalid indentation at {position}: {reason}")]
    InvalidIndentation { reason: String, position: Position },
}

impl LexError {
    pub fn position(&self) -> Position {
        match self {
            LexError::UnexpectedCharacter { position, .. }
            | LexError::UnterminatedString { position }
            | LexError::UnterminatedComment { position }
            | LexError::InvalidNumber { position, .. }
            | LexError::InvalidIndentation { position, .. } => *position,
        }
    }
}

//=====================================================
// Section 3: Tokenizer
//=====================================================

/// Tokenize a complete script. The stream always ends with [`TokenKind::Eof`].
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Tokenizer::new(source).tokenize()
}

pub struct Tokenizer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    keywords: HashMap<&'static str, TokenKind>,
    tokens: Vec<Token>,
    indent_stack: Vec<usize>,
}

impl Tokenizer {
    pub fn new(input: &str) -> Self {
        let mut keywords = HashMap::new();
        keywords.insert("if", TokenKind::If);
        keywords.insert("else", TokenKind::Else);
        keywords.insert("for", TokenKind::For);
        keywords.insert("in", TokenKind::In);
        keywords.insert("return", TokenKind::Return);
        keywords.insert("subscribe", TokenKind::Subscribe);
        keywords.insert("true", TokenKind::Boolean(true));
        keywords.insert("false", TokenKind::Boolean(false));

        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            keywords,
            tokens: Vec::new(),
            indent_stack: vec![0],
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut at_line_start = true;

        while !self.is_at_end() {
            if at_line_start {
                at_line_start = false;
                self.handle_indentation()?;
                continue;
            }

            let Some(ch) = self.current() else {
                break;
            };

            match ch {
                '\n' => {
                    self.emit_token(TokenKind::Newline, self.current_position());
                    self.advance();
                    at_line_start = true;
                }
                ' ' | '\t' | '\r' => {
                    self.advance();
                }
                '/' if self.peek_next() == Some('/') => self.skip_line_comment(),
                '/' if self.peek_next() == Some('*') => self.skip_block_comment()?,
                '"' | '\'' => self.handle_string(ch)?,
                c if c.is_ascii_digit() => self.handle_number()?,
                c if c.is_ascii_alphabetic() || c == '_' => self.handle_identifier(),
                _ => self.handle_operator_or_delimiter()?,
            }
        }

        Ok(self.finish())
    }

    fn finish(mut self) -> Vec<Token> {
        let end = self.current_position();
        if matches!(self.tokens.last(), Some(token) if token.kind != TokenKind::Newline) {
            self.emit_token(TokenKind::Newline, end);
        }

        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            self.emit_token(TokenKind::Dedent, end);
        }

        self.emit_token(TokenKind::Eof, end);
        trace!(count = self.tokens.len(), "tokenized script");
        self.tokens
    }

    //=====================================================
    // Section 4: Cursor Helpers
    //=====================================================

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn current(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.current()?;
        self.position += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.current() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn current_position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn emit_token(&mut self, kind: TokenKind, position: Position) {
        self.tokens.push(Token::new(kind, position));
    }

    //=====================================================
    // Section 5: Indentation & Comments
    //=====================================================

    // Measures the leading spaces of the next line that carries code. Blank and
    // comment-only lines are consumed here and never touch the indent stack.
    fn handle_indentation(&mut self) -> Result<(), LexError> {
        loop {
            let mut width = 0;
            let mut tab_at = None;
            while let Some(ch) = self.current() {
                match ch {
                    ' ' => width += 1,
                    '\t' => {
                        tab_at.get_or_insert(self.current_position());
                    }
                    '\r' => {}
                    _ => break,
                }
                self.advance();
            }

            match (self.current(), self.peek_next()) {
                (None, _) => return Ok(()),
                (Some('\n'), _) => {
                    self.advance();
                }
                (Some('/'), Some('/')) => self.skip_line_comment(),
                (Some('/'), Some('*')) => {
                    self.skip_block_comment()?;
                    while matches!(self.current(), Some(' ' | '\t' | '\r')) {
                        self.advance();
                    }
                    if matches!(self.current(), None | Some('\n')) {
                        continue;
                    }
                    return self.apply_indentation(width, tab_at);
                }
                _ => return self.apply_indentation(width, tab_at),
            }
        }
    }

    fn apply_indentation(&mut self, width: usize, tab_at: Option<Position>) -> Result<(), LexError> {
        if let Some(position) = tab_at {
            return Err(LexError::InvalidIndentation {
                reason: "tabs are not allowed in indentation".to_string(),
                position,
            });
        }

        let position = Position::new(self.line, width + 1);
        if width % INDENT_UNIT != 0 {
            return Err(LexError::InvalidIndentation {
                reason: format!(
                    "expected a multiple of {} spaces, found {}",
                    INDENT_UNIT, width
                ),
                position,
            });
        }

        let current = self.indent_stack.last().copied().unwrap_or(0);
        if width > current {
            self.indent_stack.push(width);
            self.emit_token(TokenKind::Indent, position);
        } else if width < current {
            while let Some(&level) = self.indent_stack.last() {
                if level <= width {
                    break;
                }
                self.indent_stack.pop();
                self.emit_token(TokenKind::Dedent, position);
            }
            if self.indent_stack.last().copied().unwrap_or(0) != width {
                return Err(LexError::InvalidIndentation {
                    reason: format!("dedent to {} spaces matches no enclosing block", width),
                    position,
                });
            }
        }

        Ok(())
    }

    fn skip_line_comment(&mut self) {
        while !matches!(self.current(), None | Some('\n')) {
            self.advance();
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), LexError> {
        let start = self.current_position();
        self.advance(); // '/'
        self.advance(); // '*'
        loop {
            match self.advance() {
                None => return Err(LexError::UnterminatedComment { position: start }),
                Some('*') if self.current() == Some('/') => {
                    self.advance();
                    return Ok(());
                }
                Some(_) => {}
            }
        }
    }

    //=====================================================
    // Section 6: Literals, Identifiers & Operators
    //=====================================================

    // Interpolation markers such as `{{hp}}` are kept verbatim; they are
    // resolved against the environment each time the literal is evaluated.
    fn handle_string(&mut self, quote: char) -> Result<(), LexError> {
        let start = self.current_position();
        self.advance(); // opening quote

        let mut value = String::new();
        loop {
            match self.current() {
                None | Some('\n') => return Err(LexError::UnterminatedString { position: start }),
                Some(ch) if ch == quote => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    match self.current() {
                        None | Some('\n') => {
                            return Err(LexError::UnterminatedString { position: start });
                        }
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some('\\') => value.push('\\'),
                        Some(ch) if ch == quote => value.push(ch),
                        Some(other) => {
                            value.push('\\');
                            value.push(other);
                        }
                    }
                    self.advance();
                }
                Some(ch) => {
                    value.push(ch);
                    self.advance();
                }
            }
        }

        self.emit_token(TokenKind::String(value), start);
        Ok(())
    }

    fn handle_number(&mut self) -> Result<(), LexError> {
        let start = self.current_position();
        let mut literal = String::new();

        while let Some(ch) = self.current().filter(char::is_ascii_digit) {
            literal.push(ch);
            self.advance();
        }

        if self.current() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            literal.push('.');
            self.advance();
            while let Some(ch) = self.current().filter(char::is_ascii_digit) {
                literal.push(ch);
                self.advance();
            }
        }

        match literal.parse::<f64>() {
            Ok(value) => {
                self.emit_token(TokenKind::Number(value), start);
                Ok(())
            }
            Err(_) => Err(LexError::InvalidNumber {
                literal,
                position: start,
            }),
        }
    }

    fn handle_identifier(&mut self) {
        let start = self.current_position();
        let mut identifier = String::new();
        while let Some(ch) = self
            .current()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        {
            identifier.push(ch);
            self.advance();
        }

        let kind = self
            .keywords
            .get(identifier.as_str())
            .cloned()
            .unwrap_or(TokenKind::Identifier(identifier));
        self.emit_token(kind, start);
    }

    fn handle_operator_or_delimiter(&mut self) -> Result<(), LexError> {
        let start = self.current_position();
        let Some(ch) = self.advance() else {
            return Ok(());
        };

        let kind = match ch {
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => {
                if self.eat('*') {
                    TokenKind::Power
                } else {
                    TokenKind::Star
                }
            }
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '=' => {
                if self.eat('=') {
                    TokenKind::EqualEqual
                } else {
                    TokenKind::Assign
                }
            }
            '!' => {
                if self.eat('=') {
                    TokenKind::NotEqual
                } else {
                    TokenKind::Not
                }
            }
            '>' => {
                if self.eat('=') {
                    TokenKind::GreaterEqual
                } else {
                    TokenKind::Greater
                }
            }
            '<' => {
                if self.eat('=') {
                    TokenKind::LessEqual
                } else {
                    TokenKind::Less
                }
            }
            '&' if self.eat('&') => TokenKind::And,
            '|' if self.eat('|') => TokenKind::Or,
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '.' => TokenKind::Dot,
            other => {
                return Err(LexError::UnexpectedCharacter {
                    character: other,
                    position: start,
                });
            }
        };

        self.emit_token(kind, start);
        Ok(())
    }
}


//=====================================================
// End of file
//=====================================================
