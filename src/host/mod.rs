//=====================================================
// File: host/mod.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Host object contract for RuleScript
// Objective: Define the capability trait hosts implement to expose objects to
//            scripts, plus reference attribute and character proxies
//=====================================================

use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::interpreter::errors::RuntimeErrorKind;
use crate::interpreter::value::{Value, format_number};

//=====================================================
// Section 1: Scriptable Contract
//=====================================================

/// Anything scripts can read properties from or call methods on.
///
/// The evaluator never inspects concrete host types; member access and method
/// calls go through this trait for host objects and arrays alike.
pub trait Scriptable {
    fn type_name(&self) -> &str;

    fn get_property(&self, name: &str) -> Option<Value>;

    fn has_method(&self, name: &str) -> bool;

    fn call_method(&self, name: &str, args: &[Value]) -> Result<Value, RuntimeErrorKind>;

    /// String form used by interpolation, `announce` and the CLI.
    fn display(&self) -> String {
        format!("<{}>", self.type_name())
    }
}

fn single_number(owner: &str, method: &str, args: &[Value]) -> Result<f64, RuntimeErrorKind> {
    match args {
        [Value::Number(n)] => Ok(*n),
        [other] => Err(RuntimeErrorKind::TypeError(format!(
            "{}.{}() expects a number, got {}",
            owner,
            method,
            other.type_name()
        ))),
        _ => Err(RuntimeErrorKind::ArgumentError(format!(
            "{}.{}() expects exactly 1 argument, got {}",
            owner,
            method,
            args.len()
        ))),
    }
}

//=====================================================
// Section 2: Attribute Proxy
//=====================================================

/// A named numeric stat that scripts can read and mutate.
#[derive(Debug)]
pub struct Attribute {
    name: String,
    value: Cell<f64>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value: Cell::new(value),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> f64 {
        self.value.get()
    }

    pub fn set(&self, value: f64) {
        self.value.set(value);
    }
}

impl Scriptable for Attribute {
    fn type_name(&self) -> &str {
        "Attribute"
    }

    fn get_property(&self, name: &str) -> Option<Value> {
        match name {
            "value" => Some(Value::Number(self.value())),
            "name" => Some(Value::String(self.name.clone())),
            _ => None,
        }
    }

    fn has_method(&self, name: &str) -> bool {
        matches!(name, "add" | "subtract" | "set")
    }

    fn call_method(&self, name: &str, args: &[Value]) -> Result<Value, RuntimeErrorKind> {
        let amount = match name {
            "add" | "subtract" | "set" => single_number(&self.name, name, args)?,
            _ => {
                return Err(RuntimeErrorKind::UnknownMethod {
                    type_name: "Attribute".to_string(),
                    method: name.to_string(),
                });
            }
        };
        let updated = match name {
            "add" => self.value() + amount,
            "subtract" => self.value() - amount,
            _ => amount,
        };
        self.set(updated);
        Ok(Value::Number(updated))
    }

    fn display(&self) -> String {
        format_number(self.value())
    }
}

//=====================================================
// Section 3: Character Proxy
//=====================================================

/// A character exposing its attributes through `.Attribute(name)`.
#[derive(Debug, Default)]
pub struct Character {
    name: String,
    attributes: BTreeMap<String, Rc<Attribute>>,
}

impl Character {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: f64) -> Self {
        let name = name.into();
        self.attributes
            .insert(name.clone(), Rc::new(Attribute::new(name, value)));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The shared proxy for `name`; scripts and host see the same value.
    pub fn attribute(&self, name: &str) -> Option<Rc<Attribute>> {
        self.attributes.get(name).cloned()
    }
}

impl Scriptable for Character {
    fn type_name(&self) -> &str {
        "Character"
    }

    fn get_property(&self, name: &str) -> Option<Value> {
        match name {
            "name" => Some(Value::String(self.name.clone())),
            _ => None,
        }
    }

    fn has_method(&self, name: &str) -> bool {
        name == "Attribute"
    }

    fn call_method(&self, name: &str, args: &[Value]) -> Result<Value, RuntimeErrorKind> {
        if name != "Attribute" {
            return Err(RuntimeErrorKind::UnknownMethod {
                type_name: "Character".to_string(),
                method: name.to_string(),
            });
        }
        let [Value::String(attribute)] = args else {
            return Err(RuntimeErrorKind::ArgumentError(
                "Attribute() expects a single attribute name".to_string(),
            ));
        };
        match self.attribute(attribute) {
            Some(proxy) => Ok(Value::Host(proxy)),
            None => Err(RuntimeErrorKind::Host(format!(
                "{} has no attribute '{}'",
                self.name, attribute
            ))),
        }
    }

    fn display(&self) -> String {
        format!("<Character {}>", self.name)
    }
}


//=====================================================
// End of file
//=====================================================
