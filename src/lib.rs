//=====================================================
// File: lib.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: RuleScript library root
// Objective: Expose the tokenizer, parser, evaluator, host contract and the
//            runtime facade to embedding applications
//=====================================================

pub mod ast;
pub mod config;
pub mod host;
pub mod interpreter;
pub mod parser;
pub mod runtime;
pub mod tokenizer;

pub use ast::{Node, NodeKind, Program};
pub use config::EngineConfig;
pub use host::{Attribute, Character, Scriptable};
pub use interpreter::{Evaluator, RuntimeError, RuntimeErrorKind, ScriptError, Value};
pub use parser::{ParseError, parse};
pub use runtime::{ExecutionResult, ScriptRunner, compile, subscriptions};
pub use tokenizer::{LexError, Position, Token, TokenKind, tokenize};

//=====================================================
// End of file
//=====================================================
