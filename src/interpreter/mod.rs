//=====================================================
// File: interpreter/mod.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: RuleScript tree-walking evaluator
// Objective: Execute parsed programs against a lexical scope chain, collecting
//            announce/log output and reporting positioned runtime errors
//=====================================================

//=====================================================
// Section 1: Modules & Imports
//=====================================================

pub mod builtins;
pub mod dice;
pub mod environment;
pub mod errors;
pub mod value;

use std::collections::HashSet;
use std::rc::Rc;

use once_cell::sync::Lazy;
use rand::SeedableRng;
use rand::rngs::StdRng;
use regex::{Captures, Regex};
use tracing::{debug, instrument};

use crate::ast::{BinaryOperator, Node, NodeKind, Program, UnaryOperator};
use crate::config::EngineConfig;

pub use environment::{Environment, SharedEnv};
pub use errors::{ErrorCode, RuntimeError, RuntimeErrorKind, ScriptError};
pub use value::{ArrayRef, NativeArity, NativeFunction, ScriptFunction, Value};

static INTERPOLATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{([A-Za-z_][A-Za-z0-9_]*)\}\}").expect("interpolation regex must compile")
});

//=====================================================
// Section 2: Evaluator State
//=====================================================

/// How a statement finished: normally, or by unwinding to the nearest call.
#[derive(Debug)]
enum Completion {
    Normal(Value),
    Return(Value),
}

pub struct Evaluator {
    globals: SharedEnv,
    rng: StdRng,
    announce_messages: Vec<String>,
    log_messages: Vec<Vec<Value>>,
    call_depth: usize,
    max_call_depth: Option<usize>,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator {
    /// Fresh evaluator with builtins bound and an entropy-seeded dice source.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic `roll()` results for tests and replays.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    //Function: with_config
    //Purpose: Build an evaluator from engine configuration, pre-seeding
    //         configured globals and the Owner host object
    pub fn with_config(config: &EngineConfig) -> Self {
        let mut evaluator = match config.seed {
            Some(seed) => Self::with_seed(seed),
            None => Self::new(),
        };
        evaluator.max_call_depth = config.max_call_depth;
        for (name, value) in config.global_bindings() {
            evaluator.define(name, value);
        }
        if let Some(owner) = config.owner_character() {
            evaluator.define("Owner", Value::host(owner));
        }
        evaluator
    }

    fn with_rng(rng: StdRng) -> Self {
        let globals = Environment::new_global();
        builtins::register_builtins(&mut globals.borrow_mut());
        Self {
            globals,
            rng,
            announce_messages: Vec::new(),
            log_messages: Vec::new(),
            call_depth: 0,
            max_call_depth: None,
        }
    }

    pub fn set_max_call_depth(&mut self, limit: Option<usize>) {
        self.max_call_depth = limit;
    }

    pub fn global_env(&self) -> SharedEnv {
        self.globals.clone()
    }

    /// Pre-seed a global binding such as `Owner` or `Target`.
    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.globals.borrow_mut().define(name, value);
    }

    pub fn announce_messages(&self) -> &[String] {
        &self.announce_messages
    }

    pub fn log_messages(&self) -> &[Vec<Value>] {
        &self.log_messages
    }

    /// Drain both output channels, leaving them empty for the next run.
    pub fn take_output(&mut self) -> (Vec<String>, Vec<Vec<Value>>) {
        (
            std::mem::take(&mut self.announce_messages),
            std::mem::take(&mut self.log_messages),
        )
    }

    pub(crate) fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    pub(crate) fn push_announce(&mut self, message: String) {
        self.announce_messages.push(message);
    }

    pub(crate) fn push_log(&mut self, group: Vec<Value>) {
        debug!(group = ?group, "script log");
        self.log_messages.push(group);
    }

    //=====================================================
    // Section 3: Entry Points
    //=====================================================

    /// Run `program` in the global scope and return the value of its last
    /// statement, or the value of a top-level `return`.
    #[instrument(skip_all, fields(statements = program.statements.len()))]
    pub fn eval(&mut self, program: &Program) -> Result<Value, RuntimeError> {
        let globals = self.globals.clone();
        match self.exec_block(&program.statements, &globals)? {
            Completion::Normal(value) | Completion::Return(value) => Ok(value),
        }
    }

    /// Invoke a global function by name, e.g. an event handler the host fires.
    pub fn call_global(&mut self, name: &str, args: Vec<Value>) -> Result<Value, RuntimeError> {
        let callee = self
            .globals
            .borrow()
            .get(name)
            .ok_or_else(|| RuntimeErrorKind::UndefinedVariable(name.to_string()))?;
        self.call_value(name, callee, args)
    }

    //=====================================================
    // Section 4: Statements
    //=====================================================

    fn exec_block(&mut self, statements: &[Node], env: &SharedEnv) -> Result<Completion, RuntimeError> {
        let mut last = Value::Null;
        for statement in statements {
            match self.exec_statement(statement, env)? {
                Completion::Normal(value) => last = value,
                Completion::Return(value) => return Ok(Completion::Return(value)),
            }
        }
        Ok(Completion::Normal(last))
    }

    fn exec_statement(&mut self, node: &Node, env: &SharedEnv) -> Result<Completion, RuntimeError> {
        self.exec_statement_inner(node, env)
            .map_err(|err| err.at(node.position))
    }

    fn exec_statement_inner(&mut self, node: &Node, env: &SharedEnv) -> Result<Completion, RuntimeError> {
        match &node.kind {
            NodeKind::FunctionDef { name, params, body } => {
                let function = ScriptFunction {
                    name: name.clone(),
                    params: params.clone(),
                    body: Rc::new(body.clone()),
                    closure: env.clone(),
                };
                env.borrow_mut()
                    .define(name.clone(), Value::Function(Rc::new(function)));
                Ok(Completion::Normal(Value::Null))
            }

            NodeKind::IfStatement {
                condition,
                then_block,
                else_if_blocks,
                else_block,
            } => {
                if self.eval_expr(condition, env)?.is_truthy() {
                    return self.exec_block(then_block, env);
                }
                for clause in else_if_blocks {
                    if self.eval_expr(&clause.condition, env)?.is_truthy() {
                        return self.exec_block(&clause.block, env);
                    }
                }
                match else_block {
                    Some(block) => self.exec_block(block, env),
                    None => Ok(Completion::Normal(Value::Null)),
                }
            }

            NodeKind::ForLoop {
                variable,
                iterable,
                body,
            } => self.exec_for(variable, iterable, body, env),

            NodeKind::ReturnStatement { value } => {
                let value = match value {
                    Some(expr) => self.eval_expr(expr, env)?,
                    None => Value::Null,
                };
                Ok(Completion::Return(value))
            }

            _ => Ok(Completion::Normal(self.eval_expr(node, env)?)),
        }
    }

    // The loop variable follows assignment rules, so it stays visible after
    // the loop. Arrays are snapshotted before the first iteration.
    fn exec_for(
        &mut self,
        variable: &str,
        iterable: &Node,
        body: &[Node],
        env: &SharedEnv,
    ) -> Result<Completion, RuntimeError> {
        let mut last = Value::Null;
        let mut run = |evaluator: &mut Self, item: Value| -> Result<Option<Completion>, RuntimeError> {
            env.borrow_mut().set(variable, item);
            match evaluator.exec_block(body, env)? {
                Completion::Normal(value) => {
                    last = value;
                    Ok(None)
                }
                returned @ Completion::Return(_) => Ok(Some(returned)),
            }
        };

        match self.eval_expr(iterable, env)? {
            Value::Number(limit) => {
                let mut i = 0.0;
                while i < limit {
                    if let Some(returned) = run(self, Value::Number(i))? {
                        return Ok(returned);
                    }
                    i += 1.0;
                }
            }
            Value::Array(array) => {
                for item in array.snapshot() {
                    if let Some(returned) = run(self, item)? {
                        return Ok(returned);
                    }
                }
            }
            other => {
                return Err(RuntimeError::new(RuntimeErrorKind::NotIterable(other.type_name()))
                    .at(iterable.position));
            }
        }

        Ok(Completion::Normal(last))
    }

    //=====================================================
    // Section 5: Expressions
    //=====================================================

    fn eval_expr(&mut self, node: &Node, env: &SharedEnv) -> Result<Value, RuntimeError> {
        self.eval_expr_inner(node, env)
            .map_err(|err| err.at(node.position))
    }

    fn eval_expr_inner(&mut self, node: &Node, env: &SharedEnv) -> Result<Value, RuntimeError> {
        match &node.kind {
            NodeKind::NumberLiteral { value } => Ok(Value::Number(*value)),
            NodeKind::StringLiteral { value } => Ok(Value::String(interpolate(value, env))),
            NodeKind::BooleanLiteral { value } => Ok(Value::Boolean(*value)),

            NodeKind::Identifier { name } => env
                .borrow()
                .get(name)
                .ok_or_else(|| RuntimeErrorKind::UndefinedVariable(name.clone()).into()),

            NodeKind::BinaryOp {
                operator: BinaryOperator::And,
                left,
                right,
            } => {
                if !self.eval_expr(left, env)?.is_truthy() {
                    return Ok(Value::Boolean(false));
                }
                Ok(Value::Boolean(self.eval_expr(right, env)?.is_truthy()))
            }

            NodeKind::BinaryOp {
                operator: BinaryOperator::Or,
                left,
                right,
            } => {
                if self.eval_expr(left, env)?.is_truthy() {
                    return Ok(Value::Boolean(true));
                }
                Ok(Value::Boolean(self.eval_expr(right, env)?.is_truthy()))
            }

            NodeKind::BinaryOp {
                operator,
                left,
                right,
            } => {
                let left = self.eval_expr(left, env)?;
                let right = self.eval_expr(right, env)?;
                Ok(eval_binary_op(*operator, &left, &right)?)
            }

            NodeKind::UnaryOp { operator, operand } => {
                let operand = self.eval_expr(operand, env)?;
                match operator {
                    UnaryOperator::Not => Ok(Value::Boolean(!operand.is_truthy())),
                    UnaryOperator::Minus => match operand {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        other => Err(RuntimeErrorKind::TypeError(format!(
                            "Cannot negate {}",
                            other.type_name()
                        ))
                        .into()),
                    },
                }
            }

            NodeKind::Assignment { name, value } => {
                let value = self.eval_expr(value, env)?;
                env.borrow_mut().set(name, value.clone());
                Ok(value)
            }

            NodeKind::ArrayLiteral { elements } => {
                let values = self.eval_arguments(elements, env)?;
                Ok(Value::array(values))
            }

            NodeKind::ArrayAccess { object, index } => {
                let object = self.eval_expr(object, env)?;
                let index = self.eval_expr(index, env)?;
                Ok(eval_index_access(&object, &index)?)
            }

            NodeKind::MemberAccess { object, property } => {
                let object = self.eval_expr(object, env)?;
                object
                    .as_scriptable()
                    .and_then(|target| target.get_property(property))
                    .ok_or_else(|| {
                        RuntimeErrorKind::UndefinedProperty {
                            type_name: object.type_name(),
                            property: property.clone(),
                        }
                        .into()
                    })
            }

            NodeKind::MethodCall {
                object,
                method,
                arguments,
            } => {
                let object = self.eval_expr(object, env)?;
                let args = self.eval_arguments(arguments, env)?;
                match object.as_scriptable() {
                    Some(target) if target.has_method(method) => {
                        Ok(target.call_method(method, &args)?)
                    }
                    _ => Err(RuntimeErrorKind::UnknownMethod {
                        type_name: object.type_name(),
                        method: method.clone(),
                    }
                    .into()),
                }
            }

            NodeKind::FunctionCall { name, arguments } => {
                let callee = env
                    .borrow()
                    .get(name)
                    .ok_or_else(|| RuntimeErrorKind::UndefinedVariable(name.clone()))?;
                let args = self.eval_arguments(arguments, env)?;
                self.call_value(name, callee, args)
            }

            NodeKind::SubscribeCall { arguments } => {
                let names = self.eval_arguments(arguments, env)?;
                Ok(Value::array(names))
            }

            NodeKind::FunctionDef { .. }
            | NodeKind::IfStatement { .. }
            | NodeKind::ForLoop { .. }
            | NodeKind::ReturnStatement { .. } => match self.exec_statement(node, env)? {
                Completion::Normal(value) | Completion::Return(value) => Ok(value),
            },
        }
    }

    fn eval_arguments(&mut self, nodes: &[Node], env: &SharedEnv) -> Result<Vec<Value>, RuntimeError> {
        nodes.iter().map(|node| self.eval_expr(node, env)).collect()
    }

    //=====================================================
    // Section 6: Calls
    //=====================================================

    fn call_value(&mut self, name: &str, callee: Value, args: Vec<Value>) -> Result<Value, RuntimeError> {
        match callee {
            Value::Function(function) => self.call_function(&function, args),
            Value::Native(native) => {
                if !native.arity.accepts(args.len()) {
                    return Err(RuntimeErrorKind::ArgumentError(format!(
                        "{}() expects {}, got {}",
                        native.name,
                        native.arity.describe(),
                        args.len()
                    ))
                    .into());
                }
                Ok((native.func)(self, &args)?)
            }
            _ => Err(RuntimeErrorKind::NotCallable(name.to_string()).into()),
        }
    }

    //Function: call_function
    //Purpose: Run a user function in a fresh scope whose parent is the
    //         closure scope; missing arguments bind null, extras are dropped
    fn call_function(&mut self, function: &ScriptFunction, args: Vec<Value>) -> Result<Value, RuntimeError> {
        if let Some(limit) = self.max_call_depth {
            if self.call_depth >= limit {
                return Err(RuntimeErrorKind::CallDepthExceeded(limit).into());
            }
        }

        debug!(function = %function.name, args = args.len(), depth = self.call_depth, "calling function");
        let frame = Environment::with_enclosing(function.closure.clone());
        {
            let mut frame = frame.borrow_mut();
            let mut args = args.into_iter();
            for param in &function.params {
                frame.define(param.clone(), args.next().unwrap_or_default());
            }
        }

        self.call_depth += 1;
        let result = self.exec_block(&function.body, &frame);
        self.call_depth -= 1;

        match result? {
            Completion::Return(value) => Ok(value),
            Completion::Normal(_) => Ok(Value::Null),
        }
    }
}

// Functions hold their defining frame and frames hold functions, so the Rc
// graph is cyclic. Teardown empties every frame reachable from the globals.
impl Drop for Evaluator {
    fn drop(&mut self) {
        let mut visited = HashSet::new();
        let mut frames = vec![self.globals.clone()];
        while let Some(frame) = frames.pop() {
            if !visited.insert(Rc::as_ptr(&frame)) {
                continue;
            }
            let (mut values, parent) = frame.borrow_mut().clear();
            frames.extend(parent);
            while let Some(value) = values.pop() {
                match value {
                    Value::Function(function) => frames.push(function.closure.clone()),
                    Value::Array(array) => values.extend(array.snapshot()),
                    _ => {}
                }
            }
        }
    }
}

//=====================================================
// Section 7: Operators
//=====================================================

/// Replace each `{{name}}` bound in `env` with its string form; unbound
/// markers are left as written.
fn interpolate(text: &str, env: &SharedEnv) -> String {
    if !text.contains("{{") {
        return text.to_string();
    }
    let scope = env.borrow();
    INTERPOLATION
        .replace_all(text, |caps: &Captures| match scope.get(&caps[1]) {
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

fn eval_binary_op(operator: BinaryOperator, left: &Value, right: &Value) -> Result<Value, RuntimeErrorKind> {
    match operator {
        BinaryOperator::Equal => return Ok(Value::Boolean(left == right)),
        BinaryOperator::NotEqual => return Ok(Value::Boolean(left != right)),
        BinaryOperator::And => return Ok(Value::Boolean(left.is_truthy() && right.is_truthy())),
        BinaryOperator::Or => return Ok(Value::Boolean(left.is_truthy() || right.is_truthy())),
        BinaryOperator::Greater
        | BinaryOperator::Less
        | BinaryOperator::GreaterEqual
        | BinaryOperator::LessEqual => return compare(operator, left, right),
        _ => {}
    }

    let (Value::Number(a), Value::Number(b)) = (left, right) else {
        return Err(RuntimeErrorKind::TypeError(format!(
            "Unsupported operand types for {}: {} and {}",
            operator.symbol(),
            left.type_name(),
            right.type_name()
        )));
    };
    let (a, b) = (*a, *b);

    let result = match operator {
        BinaryOperator::Add => a + b,
        BinaryOperator::Subtract => a - b,
        BinaryOperator::Multiply => a * b,
        BinaryOperator::Divide if b == 0.0 => return Err(RuntimeErrorKind::DivisionByZero),
        BinaryOperator::Divide => a / b,
        BinaryOperator::Modulo if b == 0.0 => return Err(RuntimeErrorKind::ModuloByZero),
        BinaryOperator::Modulo => a % b,
        BinaryOperator::Power => a.powf(b),
        other => {
            return Err(RuntimeErrorKind::TypeError(format!(
                "'{}' is not an arithmetic operator",
                other.symbol()
            )));
        }
    };
    Ok(Value::Number(result))
}

fn compare(operator: BinaryOperator, left: &Value, right: &Value) -> Result<Value, RuntimeErrorKind> {
    fn apply<T: PartialOrd + ?Sized>(operator: BinaryOperator, a: &T, b: &T) -> bool {
        match operator {
            BinaryOperator::Greater => a > b,
            BinaryOperator::Less => a < b,
            BinaryOperator::GreaterEqual => a >= b,
            _ => a <= b,
        }
    }

    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Boolean(apply(operator, a, b))),
        (Value::String(a), Value::String(b)) => {
            Ok(Value::Boolean(apply(operator, a.as_str(), b.as_str())))
        }
        _ => Err(RuntimeErrorKind::TypeError(format!(
            "Cannot compare {} with {} using {}",
            left.type_name(),
            right.type_name(),
            operator.symbol()
        ))),
    }
}

fn eval_index_access(object: &Value, index: &Value) -> Result<Value, RuntimeErrorKind> {
    let Value::Array(array) = object else {
        return Err(RuntimeErrorKind::NotIndexable(object.type_name()));
    };
    let Value::Number(position) = index else {
        return Err(RuntimeErrorKind::TypeError(format!(
            "Array index must be a number, got {}",
            index.type_name()
        )));
    };

    let length = array.len();
    let out_of_bounds = RuntimeErrorKind::IndexOutOfBounds {
        index: *position,
        length,
    };
    if *position < 0.0 || position.fract() != 0.0 {
        return Err(out_of_bounds);
    }
    array.get(*position as usize).ok_or(out_of_bounds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::tokenizer::tokenize;

    fn run(source: &str) -> Result<Value, RuntimeError> {
        let program = parse(tokenize(source).unwrap()).unwrap();
        Evaluator::with_seed(1).eval(&program)
    }

    #[test]
    fn empty_program_is_null() {
        assert_eq!(run("").unwrap(), Value::Null);
    }

    #[test]
    fn arithmetic_and_precedence() {
        assert_eq!(run("2 + 3 * 4").unwrap(), Value::Number(14.0));
        assert_eq!(run("(2 + 3) * 4").unwrap(), Value::Number(20.0));
        assert_eq!(run("2 * 3 ** 2").unwrap(), Value::Number(18.0));
        assert_eq!(run("-(-5)").unwrap(), Value::Number(5.0));
        assert_eq!(run("7 % 3").unwrap(), Value::Number(1.0));
    }

    #[test]
    fn division_errors_carry_operator_position() {
        let err = run("x = 1\ny = x / 0").unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::DivisionByZero);
        assert_eq!(err.position.map(|p| p.line), Some(2));
        assert_eq!(run("5 % 0").unwrap_err().kind, RuntimeErrorKind::ModuloByZero);
    }

    #[test]
    fn plus_is_numeric_only() {
        let err = run("\"a\" + 1").unwrap_err();
        assert!(matches!(err.kind, RuntimeErrorKind::TypeError(_)));
    }

    #[test]
    fn short_circuit_skips_right_operand() {
        assert_eq!(run("false && missing").unwrap(), Value::Boolean(false));
        assert_eq!(run("1 || missing").unwrap(), Value::Boolean(true));
    }

    #[test]
    fn index_rules() {
        assert_eq!(run("[10, 20, 30][1]").unwrap(), Value::Number(20.0));
        for source in ["[1, 2, 3][5]", "[1, 2, 3][-1]", "[1, 2][0.5]"] {
            let err = run(source).unwrap_err();
            assert!(err.to_string().starts_with("Array index out of bounds"), "{err}");
        }
        let err = run("x = 5\nx[0]").unwrap_err();
        assert!(err.to_string().contains("Cannot index non-array"), "{err}");
    }

    #[test]
    fn return_unwinds_through_nested_blocks() {
        let source = "find(xs, target):\n    for x in xs:\n        if x == target:\n            return x * 10\n    return -1\nfind([1, 2, 3], 2)";
        assert_eq!(run(source).unwrap(), Value::Number(20.0));
    }

    #[test]
    fn call_depth_limit() {
        let program = parse(tokenize("f(n):\n    return f(n + 1)\nf(0)").unwrap()).unwrap();
        let mut evaluator = Evaluator::with_seed(1);
        evaluator.set_max_call_depth(Some(25));
        let err = evaluator.eval(&program).unwrap_err();
        assert_eq!(err.kind, RuntimeErrorKind::CallDepthExceeded(25));
    }

    #[test]
    fn call_global_invokes_script_functions() {
        let program = parse(tokenize("double(x):\n    return x * 2").unwrap()).unwrap();
        let mut evaluator = Evaluator::with_seed(1);
        evaluator.eval(&program).unwrap();
        assert_eq!(
            evaluator.call_global("double", vec![21.0.into()]).unwrap(),
            Value::Number(42.0)
        );
    }
}

//=====================================================
// End of file
//=====================================================
