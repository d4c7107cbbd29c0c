//=====================================================
// File: interpreter/value.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Runtime value model for RuleScript
// Objective: Define the values scripts manipulate, their truthiness, string
//            forms and equality, plus the shared array type and its methods
//=====================================================

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::ast::Node;
use crate::host::Scriptable;

use super::Evaluator;
use super::environment::SharedEnv;
use super::errors::RuntimeErrorKind;

//=====================================================
// Section 1: Callables
//=====================================================

/// Signature shared by every built-in function.
pub type NativeFn = fn(&mut Evaluator, &[Value]) -> Result<Value, RuntimeErrorKind>;

/// Arity metadata for native functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeArity {
    Exact(usize),
    AtLeast(usize),
}

impl NativeArity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            NativeArity::Exact(expected) => count == expected,
            NativeArity::AtLeast(min) => count >= min,
        }
    }

    pub fn describe(self) -> String {
        match self {
            NativeArity::Exact(1) => "exactly 1 argument".to_string(),
            NativeArity::Exact(expected) => format!("exactly {} arguments", expected),
            NativeArity::AtLeast(1) => "at least 1 argument".to_string(),
            NativeArity::AtLeast(min) => format!("at least {} arguments", min),
        }
    }
}

#[derive(Clone)]
pub struct NativeFunction {
    pub name: &'static str,
    pub arity: NativeArity,
    pub func: NativeFn,
}

/// A user-defined function and the scope it closes over.
pub struct ScriptFunction {
    pub name: String,
    pub params: Vec<String>,
    pub body: Rc<Vec<Node>>,
    pub closure: SharedEnv,
}

//=====================================================
// Section 2: Arrays
//=====================================================

/// Shared, mutable array storage. Clones alias the same elements.
#[derive(Clone, Default)]
pub struct ArrayRef(Rc<RefCell<Vec<Value>>>);

impl ArrayRef {
    pub fn new(elements: Vec<Value>) -> Self {
        Self(Rc::new(RefCell::new(elements)))
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.borrow().get(index).cloned()
    }

    /// Append `value`. Arrays stay acyclic: pushing an array that is, or
    /// contains, this array is rejected.
    pub fn push(&self, value: Value) -> Result<(), RuntimeErrorKind> {
        if self.is_reachable_from(&value) {
            return Err(RuntimeErrorKind::ArgumentError(
                "push() cannot insert an array into itself".to_string(),
            ));
        }
        self.0.borrow_mut().push(value);
        Ok(())
    }

    fn is_reachable_from(&self, value: &Value) -> bool {
        match value {
            Value::Array(other) => {
                other.ptr_eq(self)
                    || other
                        .0
                        .borrow()
                        .iter()
                        .any(|element| self.is_reachable_from(element))
            }
            _ => false,
        }
    }

    /// Copy of the current elements, so callers can iterate while scripts mutate.
    pub fn snapshot(&self) -> Vec<Value> {
        self.0.borrow().clone()
    }

    pub fn ptr_eq(&self, other: &ArrayRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Scriptable for ArrayRef {
    fn type_name(&self) -> &str {
        "array"
    }

    fn get_property(&self, name: &str) -> Option<Value> {
        match name {
            "length" => Some(Value::Number(self.len() as f64)),
            _ => None,
        }
    }

    fn has_method(&self, name: &str) -> bool {
        matches!(
            name,
            "count" | "push" | "pop" | "contains" | "join" | "first" | "last"
        )
    }

    fn call_method(&self, name: &str, args: &[Value]) -> Result<Value, RuntimeErrorKind> {
        match name {
            "count" => {
                expect_args("count", args, 0)?;
                Ok(Value::Number(self.len() as f64))
            }
            "push" => {
                expect_args("push", args, 1)?;
                self.push(args[0].clone())?;
                Ok(Value::Number(self.len() as f64))
            }
            "pop" => {
                expect_args("pop", args, 0)?;
                Ok(self.0.borrow_mut().pop().unwrap_or(Value::Null))
            }
            "contains" => {
                expect_args("contains", args, 1)?;
                Ok(Value::Boolean(self.0.borrow().contains(&args[0])))
            }
            "join" => {
                if args.len() > 1 {
                    return Err(RuntimeErrorKind::ArgumentError(
                        "join() takes at most 1 argument".to_string(),
                    ));
                }
                let separator = match args.first() {
                    Some(Value::String(sep)) => sep.clone(),
                    Some(other) => {
                        return Err(RuntimeErrorKind::TypeError(format!(
                            "join() separator must be a string, got {}",
                            other.type_name()
                        )));
                    }
                    None => ", ".to_string(),
                };
                let parts: Vec<String> = self.0.borrow().iter().map(Value::to_string).collect();
                Ok(Value::String(parts.join(&separator)))
            }
            "first" => {
                expect_args("first", args, 0)?;
                Ok(self.get(0).unwrap_or(Value::Null))
            }
            "last" => {
                expect_args("last", args, 0)?;
                Ok(self.0.borrow().last().cloned().unwrap_or(Value::Null))
            }
            _ => Err(RuntimeErrorKind::UnknownMethod {
                type_name: "array".to_string(),
                method: name.to_string(),
            }),
        }
    }
}

fn expect_args(method: &str, args: &[Value], expected: usize) -> Result<(), RuntimeErrorKind> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(RuntimeErrorKind::ArgumentError(format!(
            "{}() expects {} argument(s), got {}",
            method,
            expected,
            args.len()
        )))
    }
}

//=====================================================
// Section 3: Values
//=====================================================

/// Runtime values in RuleScript
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Number(f64),
    String(String),
    Boolean(bool),
    Array(ArrayRef),
    Function(Rc<ScriptFunction>),
    Native(NativeFunction),
    Host(Rc<dyn Scriptable>),
}

impl Value {
    pub fn array(elements: Vec<Value>) -> Self {
        Value::Array(ArrayRef::new(elements))
    }

    pub fn host<T: Scriptable + 'static>(object: T) -> Self {
        Value::Host(Rc::new(object))
    }

    /// 0, NaN, "" and null are false; every array, function and host object is true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Boolean(b) => *b,
            Value::Array(_) | Value::Function(_) | Value::Native(_) | Value::Host(_) => true,
        }
    }

    pub fn type_name(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Number(_) => "number".to_string(),
            Value::String(_) => "string".to_string(),
            Value::Boolean(_) => "boolean".to_string(),
            Value::Array(_) => "array".to_string(),
            Value::Function(_) | Value::Native(_) => "function".to_string(),
            Value::Host(object) => object.type_name().to_string(),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The property/method surface of this value, if it has one.
    pub fn as_scriptable(&self) -> Option<&dyn Scriptable> {
        match self {
            Value::Array(array) => Some(array as &dyn Scriptable),
            Value::Host(object) => Some(&**object),
            _ => None,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_) | Value::Native(_))
    }

    /// Lossy JSON form used by hosts and the CLI.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 9.0e15 => {
                serde_json::Value::from(*n as i64)
            }
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Array(array) => {
                serde_json::Value::Array(array.snapshot().iter().map(Value::to_json).collect())
            }
            other => serde_json::Value::String(other.to_string()),
        }
    }
}

/// Integral numbers print without a fractional part.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let sign = if n > 0.0 { "" } else { "-" };
        format!("{}Infinity", sign)
    } else if n == 0.0 {
        "0".to_string()
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::String(s) => f.write_str(s),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Array(array) => {
                f.write_str("[")?;
                for (i, element) in array.snapshot().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                f.write_str("]")
            }
            Value::Function(function) => write!(f, "<function {}>", function.name),
            Value::Native(native) => write!(f, "<builtin {}>", native.name),
            Value::Host(object) => f.write_str(&object.display()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            Value::Array(array) => f.debug_list().entries(array.snapshot()).finish(),
            other => write!(f, "{}", other),
        }
    }
}

// Primitives and arrays compare structurally; callables and host objects by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b) || a.snapshot() == b.snapshot(),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => a.name == b.name,
            (Value::Host(a), Value::Host(b)) => std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b)),
            _ => false,
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(elements: Vec<Value>) -> Self {
        Value::array(elements)
    }
}


//=====================================================
// End of file
//=====================================================
