//=====================================================
// File: runtime/mod.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: One-call execution facade for hosts
// Objective: Run source text through tokenize, parse and eval, returning an
//            execution result that keeps output even when the script fails
//=====================================================

//=====================================================
// Section 1: Imports
//=====================================================

use serde_json::json;
use tracing::warn;

use crate::ast::{NodeKind, Program};
use crate::config::EngineConfig;
use crate::interpreter::{Evaluator, ScriptError, Value};
use crate::parser::parse;
use crate::tokenizer::tokenize;

//=====================================================
// Section 2: Compilation
//=====================================================

/// Tokenize and parse `source`.
pub fn compile(source: &str) -> Result<Program, ScriptError> {
    let tokens = tokenize(source)?;
    Ok(parse(tokens)?)
}

/// String-literal names passed to any `subscribe(...)` call in the program,
/// deduplicated in first-seen order.
pub fn subscriptions(program: &Program) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    program.walk(&mut |node| {
        if let NodeKind::SubscribeCall { arguments } = &node.kind {
            for argument in arguments {
                if let NodeKind::StringLiteral { value } = &argument.kind {
                    if !names.contains(value) {
                        names.push(value.clone());
                    }
                }
            }
        }
    });
    names
}

//=====================================================
// Section 3: Execution Results
//=====================================================

/// Everything one run produced. `value` is null when `error` is set.
#[derive(Debug, Clone, Default)]
pub struct ExecutionResult {
    pub value: Value,
    pub announce_messages: Vec<String>,
    pub log_messages: Vec<Vec<Value>>,
    pub error: Option<ScriptError>,
}

impl ExecutionResult {
    fn failed(error: ScriptError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn to_json(&self) -> serde_json::Value {
        let error = self.error.as_ref().map(|err| {
            let position = err.position();
            json!({
                "code": err.code_str(),
                "message": err.to_string(),
                "line": position.map(|p| p.line),
                "column": position.map(|p| p.column),
            })
        });
        json!({
            "value": self.value.to_json(),
            "announceMessages": self.announce_messages,
            "logMessages": self
                .log_messages
                .iter()
                .map(|group| group.iter().map(Value::to_json).collect::<Vec<_>>())
                .collect::<Vec<_>>(),
            "error": error,
        })
    }
}

//=====================================================
// Section 4: Script Runner
//=====================================================

/// Runs scripts with a fixed configuration and host bindings. Every run gets
/// its own evaluator, so runs never share state.
#[derive(Default)]
pub struct ScriptRunner {
    config: EngineConfig,
    bindings: Vec<(String, Value)>,
}

impl ScriptRunner {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            bindings: Vec::new(),
        }
    }

    /// Bind a host value (e.g. `Self`, `Target`) for every subsequent run.
    pub fn bind(mut self, name: impl Into<String>, value: Value) -> Self {
        self.bindings.push((name.into(), value));
        self
    }

    pub fn run(&self, source: &str) -> ExecutionResult {
        match compile(source) {
            Ok(program) => self.run_program(&program),
            Err(err) => {
                warn!(code = err.code_str(), error = %err, "script failed to compile");
                ExecutionResult::failed(err)
            }
        }
    }

    pub fn run_program(&self, program: &Program) -> ExecutionResult {
        let mut evaluator = Evaluator::with_config(&self.config);
        for (name, value) in &self.bindings {
            evaluator.define(name.clone(), value.clone());
        }

        let outcome = evaluator.eval(program);
        let (announce_messages, log_messages) = evaluator.take_output();
        match outcome {
            Ok(value) => ExecutionResult {
                value,
                announce_messages,
                log_messages,
                error: None,
            },
            Err(err) => {
                warn!(error = %err, "script failed at runtime");
                ExecutionResult {
                    value: Value::Null,
                    announce_messages,
                    log_messages,
                    error: Some(err.into()),
                }
            }
        }
    }
}


//=====================================================
// End of file
//=====================================================
