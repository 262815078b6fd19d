//! Interpreter entry points, calls and the coercions that may run user code

use std::collections::HashSet;
use std::rc::Rc;

use core_types::{ErrorKind, JsError};
use parser::ast::{FunctionBody, Pattern};
use parser::{FunctionNode, Program, Statement};

use crate::budget::StepBudget;
use crate::error::{Completion, Control};
use crate::eval::BindingMode;
use crate::object::{requested_array_length, FunctionKind, NativeFn, ObjectKind, ObjectRef, MAX_ARRAY_LENGTH};
use crate::realm::Realm;
use crate::scope::{Scope, ScopeRef};
use crate::value::{exceeds_string_limit, number_to_string, strict_equals, string_to_number, Value};

/// Default limit on nested calls
pub const DEFAULT_MAX_CALL_DEPTH: usize = 64;

/// Preferred primitive type for ToPrimitive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hint {
    /// No preference (`+`, `==`)
    Default,
    /// Numeric context
    Number,
    /// String context
    String,
}

enum Callable {
    Closure(Rc<FunctionNode>, ScopeRef),
    Native(NativeFn),
}

/// Tree-walking evaluator bound to one realm
pub struct Interpreter {
    /// Global environment and intrinsics
    pub realm: Realm,
    budget: StepBudget,
    call_depth: usize,
    max_call_depth: usize,
}

impl Interpreter {
    /// Interpreter with a fresh realm, no step limit and the default call depth
    pub fn new() -> Self {
        Self::with_limits(StepBudget::unlimited(), DEFAULT_MAX_CALL_DEPTH)
    }

    /// Interpreter with explicit limits
    pub fn with_limits(budget: StepBudget, max_call_depth: usize) -> Self {
        Self {
            realm: Realm::new(),
            budget,
            call_depth: 0,
            max_call_depth,
        }
    }

    /// Replace the step budget
    pub fn set_budget(&mut self, budget: StepBudget) {
        self.budget = budget;
    }

    /// Current step budget
    pub fn budget(&self) -> &StepBudget {
        &self.budget
    }

    /// Restart step counting
    pub fn reset_budget(&mut self) {
        self.budget.reset();
    }

    /// Replace the call depth limit
    pub fn set_max_call_depth(&mut self, depth: usize) {
        self.max_call_depth = depth;
    }

    /// Consume one execution step
    #[inline]
    pub fn step(&mut self) -> Result<(), Control> {
        self.budget.consume().map_err(Control::Halt)
    }

    /// Run a program in `scope`, which should be a function-kind scope.
    ///
    /// Returns the value of the last expression statement, or the argument
    /// of a top-level `return`.
    pub fn run_program(&mut self, program: &Program, scope: &ScopeRef) -> Result<Value, Control> {
        self.hoist_function_body(&program.body, scope)?;

        let mut completion_value = Value::Undefined;
        for statement in &program.body {
            if let Statement::ExpressionStatement { expression, .. } = statement {
                self.step()?;
                completion_value = self.eval_expression(expression, scope)?;
                continue;
            }
            match self.exec_statement(statement, scope)? {
                Completion::Return(value) => return Ok(value),
                Completion::Normal | Completion::Break | Completion::Continue => {}
            }
        }
        Ok(completion_value)
    }

    /// Parse and run source text in the global scope
    pub fn eval_source(&mut self, source: &str) -> Result<Value, Control> {
        let program = parser::parse(source).map_err(|e| self.throw_js_error(&e))?;
        let global = self.realm.global().clone();
        self.run_program(&program, &global)
    }

    /// Call a function value
    pub fn call(&mut self, callee: &Value, this: Value, args: &[Value]) -> Result<Value, Control> {
        let function = match callee {
            Value::Object(object) if object.is_callable() => object.clone(),
            other => {
                let message = format!("{} is not a function", self.describe(other));
                return Err(self.type_error(message));
            }
        };

        if self.call_depth >= self.max_call_depth {
            return Err(self.throw_error(ErrorKind::RangeError, "Maximum call stack size exceeded"));
        }
        self.step()?;

        self.call_depth += 1;
        let result = self.call_function(&function, this, args);
        self.call_depth -= 1;
        result
    }

    fn call_function(&mut self, function: &ObjectRef, this: Value, args: &[Value]) -> Result<Value, Control> {
        let callable = match &function.borrow().kind {
            ObjectKind::Function(FunctionKind::Closure(closure)) => {
                Callable::Closure(closure.node.clone(), closure.scope.clone())
            }
            ObjectKind::Function(FunctionKind::Native(native)) => Callable::Native(native.func.clone()),
            _ => return Ok(Value::Undefined),
        };

        match callable {
            Callable::Native(func) => func(self, this, args),
            Callable::Closure(node, scope) => self.call_closure(&node, &scope, this, args),
        }
    }

    fn call_closure(
        &mut self,
        node: &FunctionNode,
        closure_scope: &ScopeRef,
        this: Value,
        args: &[Value],
    ) -> Result<Value, Control> {
        let this_value = if node.is_arrow { None } else { Some(this) };
        let scope = Scope::function(closure_scope, this_value);

        for (index, param) in node.params.iter().enumerate() {
            match param {
                Pattern::RestElement(target) => {
                    let rest = args.get(index..).map(<[Value]>::to_vec).unwrap_or_default();
                    let rest = Value::Object(self.realm.new_array(rest));
                    self.bind_pattern(target, rest, &scope, BindingMode::Initialize)?;
                }
                _ => {
                    let arg = args.get(index).cloned().unwrap_or(Value::Undefined);
                    self.bind_pattern(param, arg, &scope, BindingMode::Initialize)?;
                }
            }
        }

        match &node.body {
            FunctionBody::Expression(expression) => self.eval_expression(expression, &scope),
            FunctionBody::Block(body) => {
                self.hoist_function_body(body, &scope)?;
                match self.exec_statements(body, &scope)? {
                    Completion::Return(value) => Ok(value),
                    _ => Ok(Value::Undefined),
                }
            }
        }
    }

    /// The `new` operator
    pub fn construct(&mut self, callee: &Value, args: &[Value]) -> Result<Value, Control> {
        let constructor = match callee {
            Value::Object(object) if object.is_constructor() => object.clone(),
            other => {
                let message = format!("{} is not a constructor", self.describe(other));
                return Err(self.type_error(message));
            }
        };

        let prototype = match constructor.get("prototype") {
            Value::Object(prototype) => prototype,
            _ => self.realm.intrinsics().object_prototype.clone(),
        };
        let this = Value::Object(self.realm.new_object_with_proto(Some(prototype)));
        let result = self.call(callee, this.clone(), args)?;
        Ok(if result.is_object() { result } else { this })
    }

    /// Error object of a built-in kind, wrapped as a throw
    pub fn throw_error(&self, kind: ErrorKind, message: impl AsRef<str>) -> Control {
        Control::Throw(Value::Object(self.realm.new_error(kind, message.as_ref())))
    }

    /// `TypeError` throw
    pub fn type_error(&self, message: impl AsRef<str>) -> Control {
        self.throw_error(ErrorKind::TypeError, message)
    }

    /// `RangeError: Invalid string length` throw
    pub fn invalid_string_length(&self) -> Control {
        self.throw_error(ErrorKind::RangeError, "Invalid string length")
    }

    /// `RangeError: Invalid array length` throw
    pub fn invalid_array_length(&self) -> Control {
        self.throw_error(ErrorKind::RangeError, "Invalid array length")
    }

    /// Fails with `Invalid array length` past [`MAX_ARRAY_LENGTH`]
    pub fn check_array_length(&self, length: usize) -> Result<(), Control> {
        if length > MAX_ARRAY_LENGTH {
            return Err(self.invalid_array_length());
        }
        Ok(())
    }

    /// Concatenate `parts`, failing with `Invalid string length` past
    /// [`MAX_STRING_LENGTH`](crate::value::MAX_STRING_LENGTH)
    pub fn concat_strings(&self, parts: &[&str]) -> Result<String, Control> {
        if exceeds_string_limit(parts) {
            return Err(self.invalid_string_length());
        }
        Ok(parts.concat())
    }

    /// `ReferenceError` throw
    pub fn reference_error(&self, message: impl AsRef<str>) -> Control {
        self.throw_error(ErrorKind::ReferenceError, message)
    }

    /// Throw carrying an engine error (e.g. a parse failure)
    pub fn throw_js_error(&self, error: &JsError) -> Control {
        Control::Throw(Value::Object(self.realm.error_from_js_error(error)))
    }

    /// Short rendering of a value for error messages
    pub fn describe(&self, value: &Value) -> String {
        match value {
            Value::String(s) => format!("\"{}\"", s),
            Value::Number(n) => number_to_string(*n),
            Value::Object(object) if object.is_callable() => match object.get("name") {
                Value::String(name) if !name.is_empty() => name.to_string(),
                _ => "function".to_string(),
            },
            Value::Object(object) if object.is_array() => "array".to_string(),
            Value::Object(_) => "object".to_string(),
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Boolean(b) => b.to_string(),
        }
    }

    /// Property read with primitive wrapping
    pub fn get(&self, base: &Value, key: &str) -> Result<Value, Control> {
        let prototype = match base {
            Value::Object(object) => return Ok(object.get(key)),
            Value::Undefined | Value::Null => {
                return Err(self.type_error(format!(
                    "Cannot read properties of {} (reading '{}')",
                    self.describe(base),
                    key
                )))
            }
            Value::String(s) => {
                if key == "length" {
                    return Ok(Value::Number(crate::value::utf16_len(s) as f64));
                }
                if let Some(index) = crate::value::array_index(key) {
                    return Ok(string_code_unit(s, index).map(Value::from).unwrap_or(Value::Undefined));
                }
                &self.realm.intrinsics().string_prototype
            }
            Value::Number(_) => &self.realm.intrinsics().number_prototype,
            Value::Boolean(_) => &self.realm.intrinsics().boolean_prototype,
        };
        Ok(prototype.get(key))
    }

    /// Property write; rejected writes are silently ignored
    pub fn set(&self, base: &Value, key: &str, value: Value) -> Result<(), Control> {
        match base {
            Value::Object(object) => {
                if object.is_array()
                    && matches!(requested_array_length(key, &value), Some(length) if length > MAX_ARRAY_LENGTH)
                {
                    return Err(self.invalid_array_length());
                }
                object.set(key, value);
                Ok(())
            }
            Value::Undefined | Value::Null => Err(self.type_error(format!(
                "Cannot set properties of {} (setting '{}')",
                self.describe(base),
                key
            ))),
            _ => Ok(()),
        }
    }

    /// Look up a method and call it with `base` as receiver
    pub fn invoke(&mut self, base: &Value, method: &str, args: &[Value]) -> Result<Value, Control> {
        let function = self.get(base, method)?;
        if !function.is_callable() {
            let message = format!("{}.{} is not a function", self.describe(base), method);
            return Err(self.type_error(message));
        }
        self.call(&function, base.clone(), args)
    }

    /// ToPrimitive
    pub fn to_primitive(&mut self, value: &Value, hint: Hint) -> Result<Value, Control> {
        let object = match value {
            Value::Object(object) => object.clone(),
            primitive => return Ok(primitive.clone()),
        };

        let order = match hint {
            Hint::String => ["toString", "valueOf"],
            Hint::Number | Hint::Default => ["valueOf", "toString"],
        };
        let mut found_method = false;
        for name in order {
            let method = object.get(name);
            if method.is_callable() {
                found_method = true;
                let result = self.call(&method, value.clone(), &[])?;
                if !result.is_object() {
                    return Ok(result);
                }
            }
        }
        if found_method {
            return Err(self.type_error("Cannot convert object to primitive value"));
        }
        self.default_primitive(&object)
    }

    fn default_primitive(&mut self, object: &ObjectRef) -> Result<Value, Control> {
        if object.is_array() {
            let mut parts = Vec::new();
            for element in object.array_elements() {
                parts.push(match element {
                    Value::Undefined | Value::Null => String::new(),
                    other => self.to_string(&other)?.to_string(),
                });
            }
            return Ok(Value::from(parts.join(",")));
        }
        if object.is_callable() {
            let name = self.describe(&Value::Object(object.clone()));
            return Ok(Value::from(format!("function {}() {{ [native code] }}", name)));
        }
        if object.is_error() {
            let name = self.to_string(&object.get("name"))?;
            let message = self.to_string(&object.get("message"))?;
            return Ok(Value::from(if message.is_empty() {
                name.to_string()
            } else {
                format!("{}: {}", name, message)
            }));
        }
        Ok(Value::from("[object Object]"))
    }

    /// ToNumber
    pub fn to_number(&mut self, value: &Value) -> Result<f64, Control> {
        Ok(match value {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(n) => *n,
            Value::String(s) => string_to_number(s),
            Value::Object(_) => {
                let primitive = self.to_primitive(value, Hint::Number)?;
                return self.to_number(&primitive);
            }
        })
    }

    /// ToString
    pub fn to_string(&mut self, value: &Value) -> Result<Rc<str>, Control> {
        Ok(match value {
            Value::Undefined => "undefined".into(),
            Value::Null => "null".into(),
            Value::Boolean(true) => "true".into(),
            Value::Boolean(false) => "false".into(),
            Value::Number(n) => number_to_string(*n).into(),
            Value::String(s) => s.clone(),
            Value::Object(_) => {
                let primitive = self.to_primitive(value, Hint::String)?;
                return self.to_string(&primitive);
            }
        })
    }

    /// ToPropertyKey
    pub fn to_property_key(&mut self, value: &Value) -> Result<Rc<str>, Control> {
        self.to_string(value)
    }

    /// Abstract equality (`==`)
    pub fn loose_equals(&mut self, a: &Value, b: &Value) -> Result<bool, Control> {
        Ok(match (a, b) {
            (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => true,
            (Value::Undefined | Value::Null, _) | (_, Value::Undefined | Value::Null) => false,
            (Value::Number(x), Value::String(s)) | (Value::String(s), Value::Number(x)) => *x == string_to_number(s),
            (Value::Boolean(x), other) | (other, Value::Boolean(x)) => {
                let number = Value::Number(if *x { 1.0 } else { 0.0 });
                return self.loose_equals(&number, other);
            }
            (Value::Object(_), Value::Object(_)) => strict_equals(a, b),
            (Value::Object(_), primitive) | (primitive, Value::Object(_)) => {
                let object = if a.is_object() { a } else { b };
                let converted = self.to_primitive(object, Hint::Default)?;
                return self.loose_equals(&converted, primitive);
            }
            _ => strict_equals(a, b),
        })
    }

    /// The `instanceof` operator
    pub fn instance_of(&mut self, value: &Value, constructor: &Value) -> Result<bool, Control> {
        let constructor = match constructor {
            Value::Object(object) if object.is_callable() => object,
            _ => return Err(self.type_error("Right-hand side of 'instanceof' is not callable")),
        };
        let object = match value {
            Value::Object(object) => object,
            _ => return Ok(false),
        };
        let prototype = match constructor.get("prototype") {
            Value::Object(prototype) => prototype,
            other => {
                let message = format!(
                    "Function has non-object prototype '{}' in instanceof check",
                    self.describe(&other)
                );
                return Err(self.type_error(message));
            }
        };

        let mut current = object.prototype();
        while let Some(candidate) = current {
            if candidate.ptr_eq(&prototype) {
                return Ok(true);
            }
            current = candidate.prototype();
        }
        Ok(false)
    }

    /// Values produced by `for...of`, spread and array destructuring
    pub fn iterate(&mut self, value: &Value) -> Result<Vec<Value>, Control> {
        match value {
            Value::Object(object) if object.is_array() => Ok(object.array_elements()),
            Value::String(s) => Ok(s.chars().map(|c| Value::from(c.to_string())).collect()),
            other => {
                let message = format!("{} is not iterable", self.describe(other));
                Err(self.type_error(message))
            }
        }
    }

    /// Keys visited by `for...in`: enumerable string keys along the prototype chain
    pub fn for_in_keys(&self, value: &Value) -> Vec<Rc<str>> {
        match value {
            Value::Object(object) => {
                let mut seen = HashSet::new();
                let mut keys = Vec::new();
                let mut current = Some(object.clone());
                while let Some(object) = current {
                    for key in object.own_keys() {
                        if seen.insert(key.clone()) {
                            keys.push(key);
                        }
                    }
                    current = object.prototype();
                }
                keys
            }
            Value::String(s) => (0..crate::value::utf16_len(s)).map(|i| Rc::from(i.to_string())).collect(),
            _ => Vec::new(),
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Interpreter {
    fn drop(&mut self) {
        self.realm.dispose();
    }
}

/// The UTF-16 code unit at `index` as a one-unit string
fn string_code_unit(s: &str, index: usize) -> Option<String> {
    let unit = s.encode_utf16().nth(index)?;
    Some(char::decode_utf16([unit]).map(|r| r.unwrap_or('\u{FFFD}')).collect())
}
