//! Lexical environments
//!
//! A scope chain mirrors the nesting of functions and blocks. `var` bindings
//! live in the nearest function scope, `let`/`const` in the nearest block.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::value::Value;

/// Shared handle to a scope
pub type ScopeRef = Rc<Scope>;

/// Whether a scope is a hoisting target for `var`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// Function body, module or global scope
    Function,
    /// Block, loop body or catch clause
    Block,
}

/// How a binding was declared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// `var`, function declarations and parameters
    Var,
    /// `let`
    Let,
    /// `const`
    Const,
}

#[derive(Debug, Clone)]
struct Binding {
    value: Value,
    kind: BindingKind,
    initialized: bool,
}

/// Result of resolving an identifier
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// Binding found and initialized
    Found(Value),
    /// Binding found but still in its temporal dead zone
    Uninitialized,
    /// No binding with that name on the chain
    NotFound,
}

/// Result of assigning to an identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assign {
    /// Value stored
    Ok,
    /// Target is a `const`
    Const,
    /// Target is in its temporal dead zone
    Uninitialized,
    /// No binding with that name on the chain
    NotFound,
}

/// A single lexical environment
#[derive(Debug)]
pub struct Scope {
    bindings: RefCell<HashMap<Rc<str>, Binding>>,
    parent: Option<ScopeRef>,
    kind: ScopeKind,
    this_value: Option<Value>,
}

impl Scope {
    /// Create a root scope
    pub fn global() -> ScopeRef {
        Rc::new(Scope {
            bindings: RefCell::new(HashMap::new()),
            parent: None,
            kind: ScopeKind::Function,
            this_value: Some(Value::Undefined),
        })
    }

    /// Create a function scope. `this_value` is `None` for arrow functions,
    /// which resolve `this` through their parent.
    pub fn function(parent: &ScopeRef, this_value: Option<Value>) -> ScopeRef {
        Rc::new(Scope {
            bindings: RefCell::new(HashMap::new()),
            parent: Some(parent.clone()),
            kind: ScopeKind::Function,
            this_value,
        })
    }

    /// Create a block scope
    pub fn block(parent: &ScopeRef) -> ScopeRef {
        Rc::new(Scope {
            bindings: RefCell::new(HashMap::new()),
            parent: Some(parent.clone()),
            kind: ScopeKind::Block,
            this_value: None,
        })
    }

    /// Scope kind
    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    /// Enclosing scope
    pub fn parent(&self) -> Option<&ScopeRef> {
        self.parent.as_ref()
    }

    /// Host convenience: create or overwrite an initialized mutable binding
    pub fn define(&self, name: &str, value: Value) {
        self.bindings.borrow_mut().insert(
            name.into(),
            Binding {
                value,
                kind: BindingKind::Var,
                initialized: true,
            },
        );
    }

    /// Declare a `var` binding initialized to `undefined` unless one exists
    pub fn declare_var(&self, name: &str) {
        self.bindings
            .borrow_mut()
            .entry(name.into())
            .or_insert_with(|| Binding {
                value: Value::Undefined,
                kind: BindingKind::Var,
                initialized: true,
            });
    }

    /// Declare an uninitialized `let`/`const` binding. Returns `false` when
    /// the name is already declared in this scope.
    pub fn declare_lexical(&self, name: &str, kind: BindingKind) -> bool {
        let mut bindings = self.bindings.borrow_mut();
        if bindings.contains_key(name) {
            return false;
        }
        bindings.insert(
            name.into(),
            Binding {
                value: Value::Undefined,
                kind,
                initialized: false,
            },
        );
        true
    }

    /// Initialize a binding declared in this scope (ends its dead zone)
    pub fn initialize(&self, name: &str, value: Value) {
        let mut bindings = self.bindings.borrow_mut();
        match bindings.get_mut(name) {
            Some(binding) => {
                binding.value = value;
                binding.initialized = true;
            }
            None => {
                bindings.insert(
                    name.into(),
                    Binding {
                        value,
                        kind: BindingKind::Var,
                        initialized: true,
                    },
                );
            }
        }
    }

    /// True if this scope itself declares `name`
    pub fn has_own(&self, name: &str) -> bool {
        self.bindings.borrow().contains_key(name)
    }

    /// Resolve an identifier along the chain
    pub fn lookup(&self, name: &str) -> Lookup {
        let mut scope = self;
        loop {
            if let Some(binding) = scope.bindings.borrow().get(name) {
                return if binding.initialized {
                    Lookup::Found(binding.value.clone())
                } else {
                    Lookup::Uninitialized
                };
            }
            match &scope.parent {
                Some(parent) => scope = parent,
                None => return Lookup::NotFound,
            }
        }
    }

    /// Assign to an existing binding along the chain
    pub fn set(&self, name: &str, value: Value) -> Assign {
        let mut scope = self;
        loop {
            if let Some(binding) = scope.bindings.borrow_mut().get_mut(name) {
                if !binding.initialized {
                    return Assign::Uninitialized;
                }
                if binding.kind == BindingKind::Const {
                    return Assign::Const;
                }
                binding.value = value;
                return Assign::Ok;
            }
            match &scope.parent {
                Some(parent) => scope = parent,
                None => return Assign::NotFound,
            }
        }
    }

    /// The `this` value visible from this scope
    pub fn this_value(&self) -> Value {
        let mut scope = self;
        loop {
            if let Some(this) = &scope.this_value {
                return this.clone();
            }
            match &scope.parent {
                Some(parent) => scope = parent,
                None => return Value::Undefined,
            }
        }
    }

    /// Snapshot of this scope's `let` bindings, used to give each `for`
    /// iteration its own copy
    pub(crate) fn copy_lexical_into(&self, target: &Scope) {
        let bindings = self.bindings.borrow();
        let mut target_bindings = target.bindings.borrow_mut();
        for (name, binding) in bindings.iter() {
            target_bindings.insert(name.clone(), binding.clone());
        }
    }

    /// Drop every binding so closures captured here release their values
    pub(crate) fn clear(&self) {
        if let Ok(mut bindings) = self.bindings.try_borrow_mut() {
            bindings.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_walks_parents() {
        let global = Scope::global();
        global.define("x", Value::Number(1.0));
        let inner = Scope::block(&global);
        assert_eq!(inner.lookup("x"), Lookup::Found(Value::Number(1.0)));
        assert_eq!(inner.lookup("y"), Lookup::NotFound);
    }

    #[test]
    fn test_temporal_dead_zone() {
        let scope = Scope::global();
        assert!(scope.declare_lexical("x", BindingKind::Let));
        assert_eq!(scope.lookup("x"), Lookup::Uninitialized);
        assert_eq!(scope.set("x", Value::Null), Assign::Uninitialized);
        scope.initialize("x", Value::Number(2.0));
        assert_eq!(scope.lookup("x"), Lookup::Found(Value::Number(2.0)));
    }

    #[test]
    fn test_const_assignment_rejected() {
        let scope = Scope::global();
        scope.declare_lexical("c", BindingKind::Const);
        scope.initialize("c", Value::Number(1.0));
        assert_eq!(scope.set("c", Value::Number(2.0)), Assign::Const);
        assert!(!scope.declare_lexical("c", BindingKind::Let));
    }

    #[test]
    fn test_shadowing() {
        let outer = Scope::global();
        outer.define("x", Value::Number(1.0));
        let inner = Scope::block(&outer);
        inner.declare_lexical("x", BindingKind::Let);
        inner.initialize("x", Value::Number(2.0));
        assert_eq!(inner.set("x", Value::Number(3.0)), Assign::Ok);
        assert_eq!(outer.lookup("x"), Lookup::Found(Value::Number(1.0)));
    }

    #[test]
    fn test_arrow_scope_inherits_this() {
        let global = Scope::global();
        let method = Scope::function(&global, Some(Value::from("receiver")));
        let arrow = Scope::function(&method, None);
        assert_eq!(arrow.this_value(), Value::from("receiver"));
    }
}
