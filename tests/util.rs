//==============================================
// File: tests/util.rs
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Shared helpers for integration suites
// Objective: Compile and evaluate RuleScript snippets with a seeded evaluator
//==============================================

#![allow(dead_code)]

use rulescript::interpreter::Evaluator;
use rulescript::{ScriptError, Value, compile};

/// Evaluate `source` with a fresh seeded evaluator and return the evaluator
/// alongside the outcome so tests can inspect announce/log output.
pub fn eval_with(source: &str, evaluator: &mut Evaluator) -> Result<Value, ScriptError> {
    let program = compile(source)?;
    Ok(evaluator.eval(&program)?)
}

pub fn eval_source(source: &str) -> Result<Value, ScriptError> {
    eval_with(source, &mut Evaluator::with_seed(7))
}

pub fn run(source: &str) -> Value {
    match eval_source(source) {
        Ok(value) => value,
        Err(err) => panic!("script failed: {err}\n---\n{source}"),
    }
}

pub fn run_err(source: &str) -> ScriptError {
    match eval_source(source) {
        Ok(value) => panic!("expected failure, got {value}\n---\n{source}"),
        Err(err) => err,
    }
}

pub fn num(value: f64) -> Value {
    Value::Number(value)
}

//==============================================
// End of file
//==============================================
