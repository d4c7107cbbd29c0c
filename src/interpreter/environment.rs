//=====================================================
// File: interpreter/environment.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Lexical scope records for the evaluator
// Objective: Provide shared, mutable scope frames linked to their enclosing
//            scope so closures observe later writes to captured bindings
//=====================================================

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::value::Value;

/// A scope frame shared between the evaluator and any closures capturing it.
pub type SharedEnv = Rc<RefCell<Environment>>;

#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<SharedEnv>,
}

impl Environment {
    pub fn new_global() -> SharedEnv {
        Rc::new(RefCell::new(Self::default()))
    }

    pub fn with_enclosing(enclosing: SharedEnv) -> SharedEnv {
        Rc::new(RefCell::new(Self {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }))
    }

    /// Bind `name` in this frame, shadowing any outer binding.
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    /// Look `name` up through the scope chain.
    pub fn get(&self, name: &str) -> Option<Value> {
        match self.values.get(name) {
            Some(value) => Some(value.clone()),
            None => self
                .enclosing
                .as_ref()
                .and_then(|parent| parent.borrow().get(name)),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
            || self
                .enclosing
                .as_ref()
                .is_some_and(|parent| parent.borrow().contains(name))
    }

    /// Overwrite the nearest existing binding. Returns false when unbound.
    pub fn assign(&mut self, name: &str, value: Value) -> bool {
        if let Some(slot) = self.values.get_mut(name) {
            *slot = value;
            return true;
        }
        match &self.enclosing {
            Some(parent) => parent.borrow_mut().assign(name, value),
            None => false,
        }
    }

    /// Assignment semantics: update the nearest binding, or create one here.
    pub fn set(&mut self, name: &str, value: Value) {
        if self.values.contains_key(name) {
            self.values.insert(name.to_string(), value);
            return;
        }
        let bound_outside = self
            .enclosing
            .as_ref()
            .is_some_and(|parent| parent.borrow().contains(name));
        if bound_outside {
            if let Some(parent) = &self.enclosing {
                parent.borrow_mut().assign(name, value);
            }
        } else {
            self.values.insert(name.to_string(), value);
        }
    }

    /// Empty this frame and detach it from its parent, handing back what it held.
    pub(crate) fn clear(&mut self) -> (Vec<Value>, Option<SharedEnv>) {
        let values = self.values.drain().map(|(_, value)| value).collect();
        (values, self.enclosing.take())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_outward() {
        let global = Environment::new_global();
        global.borrow_mut().define("x", Value::Number(10.0));
        let inner = Environment::with_enclosing(global.clone());
        assert_eq!(inner.borrow().get("x"), Some(Value::Number(10.0)));
        assert_eq!(inner.borrow().get("y"), None);
    }

    #[test]
    fn set_mutates_nearest_binding_or_defines_locally() {
        let global = Environment::new_global();
        global.borrow_mut().define("x", Value::Number(1.0));
        let inner = Environment::with_enclosing(global.clone());

        inner.borrow_mut().set("x", Value::Number(2.0));
        inner.borrow_mut().set("y", Value::Number(3.0));

        assert_eq!(global.borrow().get("x"), Some(Value::Number(2.0)));
        assert_eq!(global.borrow().get("y"), None);
        assert_eq!(inner.borrow().get("y"), Some(Value::Number(3.0)));
    }

    #[test]
    fn define_shadows_outer_binding() {
        let global = Environment::new_global();
        global.borrow_mut().define("x", Value::Number(1.0));
        let inner = Environment::with_enclosing(global.clone());
        inner.borrow_mut().define("x", Value::Number(5.0));
        inner.borrow_mut().set("x", Value::Number(6.0));
        assert_eq!(global.borrow().get("x"), Some(Value::Number(1.0)));
        assert_eq!(inner.borrow().get("x"), Some(Value::Number(6.0)));
    }

    #[test]
    fn clear_releases_bindings_and_parent() {
        let global = Environment::new_global();
        let inner = Environment::with_enclosing(global.clone());
        inner.borrow_mut().define("x", Value::Number(1.0));

        let (values, parent) = inner.borrow_mut().clear();
        assert_eq!(values, vec![Value::Number(1.0)]);
        assert!(parent.is_some_and(|parent| Rc::ptr_eq(&parent, &global)));
        assert_eq!(inner.borrow().get("x"), None);
        assert_eq!(Rc::strong_count(&global), 1);
    }

    #[test]
    fn assign_reports_unbound_names() {
        let global = Environment::new_global();
        assert!(!global.borrow_mut().assign("missing", Value::Null));
    }
}

//=====================================================
// End of file
//=====================================================
