//=====================================================
// File: interpreter/errors.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: RuleScript runtime and aggregate error types
// Objective: Describe evaluation failures with source positions and map every
//            failure class to a stable error code for hosts
//=====================================================

use std::fmt;

use thiserror::Error;

use crate::parser::ParseError;
use crate::tokenizer::{LexError, Position};

/// What went wrong during evaluation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeErrorKind {
    #[error("Undefined variable '{0}'")]
    UndefinedVariable(String),
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Modulo by zero")]
    ModuloByZero,
    #[error("Array index out of bounds: index {index} for length {length}")]
    IndexOutOfBounds { index: f64, length: usize },
    #[error("Cannot index non-array value of type {0}")]
    NotIndexable(String),
    #[error("Cannot iterate over {0}")]
    NotIterable(String),
    #[error("'{0}' is not a function")]
    NotCallable(String),
    #[error("Undefined property '{property}' on {type_name}")]
    UndefinedProperty { type_name: String, property: String },
    #[error("Unknown method '{method}' on {type_name}")]
    UnknownMethod { type_name: String, method: String },
    #[error("Type error: {0}")]
    TypeError(String),
    #[error("Argument error: {0}")]
    ArgumentError(String),
    #[error("Maximum call depth of {0} exceeded")]
    CallDepthExceeded(usize),
    #[error("{0}")]
    Host(String),
}

/// A runtime failure plus the position of the innermost node that raised it.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub position: Option<Position>,
}

impl RuntimeError {
    pub fn new(kind: RuntimeErrorKind) -> Self {
        Self {
            kind,
            position: None,
        }
    }

    /// Attach `position` unless a more precise one is already recorded.
    pub fn at(mut self, position: Position) -> Self {
        self.position.get_or_insert(position);
        self
    }

    /// The message without the position suffix.
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

impl From<RuntimeErrorKind> for RuntimeError {
    fn from(kind: RuntimeErrorKind) -> Self {
        Self::new(kind)
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(position) => write!(f, "{} at {}", self.kind, position),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for RuntimeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

//=====================================================
// Aggregate script errors
//=====================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Lex,
    Parse,
    Runtime,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Lex => "E001",
            ErrorCode::Parse => "E002",
            ErrorCode::Runtime => "E003",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Any failure from the tokenize, parse, eval pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl ScriptError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ScriptError::Lex(_) => ErrorCode::Lex,
            ScriptError::Parse(_) => ErrorCode::Parse,
            ScriptError::Runtime(_) => ErrorCode::Runtime,
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code().as_str()
    }

    pub fn position(&self) -> Option<Position> {
        match self {
            ScriptError::Lex(err) => Some(err.position()),
            ScriptError::Parse(err) => Some(err.position()),
            ScriptError::Runtime(err) => err.position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_error_keeps_innermost_position() {
        let err = RuntimeError::new(RuntimeErrorKind::DivisionByZero)
            .at(Position::new(3, 7))
            .at(Position::new(1, 1));
        assert_eq!(err.position, Some(Position::new(3, 7)));
        assert_eq!(err.to_string(), "Division by zero at line 3, column 7");
        assert_eq!(err.message(), "Division by zero");
    }

    #[test]
    fn script_error_codes() {
        let lex = ScriptError::from(LexError::UnterminatedString {
            position: Position::new(1, 1),
        });
        let runtime = ScriptError::from(RuntimeError::new(RuntimeErrorKind::UndefinedVariable(
            "hp".into(),
        )));
        assert_eq!(lex.code_str(), "E001");
        assert_eq!(runtime.code(), ErrorCode::Runtime);
        assert_eq!(runtime.position(), None);
        assert_eq!(runtime.to_string(), "Undefined variable 'hp'");
    }
}

//=====================================================
// End of file
//=====================================================
