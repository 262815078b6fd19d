//! Realm: the global scope, intrinsic prototypes and object allocation
//!
//! Every object is allocated through [`Realm::alloc`], which keeps a weak
//! handle to it. Closures and their scopes form reference cycles, so when a
//! realm is discarded [`Realm::dispose`] severs every object's outgoing
//! references and lets the cycles drop.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use core_types::{ErrorKind, JsError};
use parser::FunctionNode;
use regex::RegexBuilder;

use crate::object::{
    Closure, ErrorData, FunctionKind, JsObject, NativeFn, NativeFunction, ObjectKind, ObjectRef, Property,
    RegExpData,
};
use crate::scope::{Scope, ScopeRef};
use crate::value::Value;

const INITIAL_PRUNE_THRESHOLD: usize = 1024;

/// Prototypes shared by every object of a realm
#[derive(Debug)]
pub struct Intrinsics {
    /// `Object.prototype`
    pub object_prototype: ObjectRef,
    /// `Function.prototype`
    pub function_prototype: ObjectRef,
    /// `Array.prototype`
    pub array_prototype: ObjectRef,
    /// `String.prototype`
    pub string_prototype: ObjectRef,
    /// `Number.prototype`
    pub number_prototype: ObjectRef,
    /// `Boolean.prototype`
    pub boolean_prototype: ObjectRef,
    /// `RegExp.prototype`
    pub regexp_prototype: ObjectRef,
    error_prototypes: HashMap<ErrorKind, ObjectRef>,
}

impl Intrinsics {
    /// Prototype for errors of the given kind (`Error.prototype` for kinds
    /// without a constructor of their own)
    pub fn error_prototype(&self, kind: ErrorKind) -> &ObjectRef {
        self.error_prototypes
            .get(&kind)
            .or_else(|| self.error_prototypes.get(&ErrorKind::Error))
            .unwrap_or(&self.object_prototype)
    }
}

/// An isolated global environment
pub struct Realm {
    global: ScopeRef,
    intrinsics: Intrinsics,
    heap: RefCell<Vec<Weak<RefCell<JsObject>>>>,
    prune_at: Cell<usize>,
}

impl Realm {
    /// Create a realm with bare intrinsics and the value globals
    /// (`undefined`, `NaN`, `Infinity`, `globalThis`)
    pub fn new() -> Self {
        let mut heap = Vec::new();
        let mut alloc = |kind: ObjectKind, prototype: Option<&ObjectRef>| {
            let object = ObjectRef::new(JsObject::new(kind, prototype.cloned()));
            heap.push(object.downgrade());
            object
        };

        let object_prototype = alloc(ObjectKind::Ordinary, None);
        let function_prototype = alloc(ObjectKind::Ordinary, Some(&object_prototype));
        let array_prototype = alloc(ObjectKind::Array(Vec::new()), Some(&object_prototype));
        let string_prototype = alloc(ObjectKind::Ordinary, Some(&object_prototype));
        let number_prototype = alloc(ObjectKind::Ordinary, Some(&object_prototype));
        let boolean_prototype = alloc(ObjectKind::Ordinary, Some(&object_prototype));
        let regexp_prototype = alloc(ObjectKind::Ordinary, Some(&object_prototype));

        let base_error = alloc(ObjectKind::Ordinary, Some(&object_prototype));
        let mut error_prototypes = HashMap::new();
        for kind in ErrorKind::constructible() {
            let prototype = if kind == ErrorKind::Error {
                base_error.clone()
            } else {
                alloc(ObjectKind::Ordinary, Some(&base_error))
            };
            prototype.put_hidden("name", Value::from(kind.name()));
            prototype.put_hidden("message", Value::from(""));
            error_prototypes.insert(kind, prototype);
        }

        let global = Scope::global();
        let global_object = alloc(ObjectKind::Ordinary, Some(&object_prototype));
        global.define("undefined", Value::Undefined);
        global.define("NaN", Value::Number(f64::NAN));
        global.define("Infinity", Value::Number(f64::INFINITY));
        global.define("globalThis", Value::Object(global_object));

        Realm {
            global,
            intrinsics: Intrinsics {
                object_prototype,
                function_prototype,
                array_prototype,
                string_prototype,
                number_prototype,
                boolean_prototype,
                regexp_prototype,
                error_prototypes,
            },
            prune_at: Cell::new(heap.len().max(INITIAL_PRUNE_THRESHOLD)),
            heap: RefCell::new(heap),
        }
    }

    /// The global scope
    pub fn global(&self) -> &ScopeRef {
        &self.global
    }

    /// Intrinsic prototypes
    pub fn intrinsics(&self) -> &Intrinsics {
        &self.intrinsics
    }

    /// Allocate and track an object
    pub fn alloc(&self, object: JsObject) -> ObjectRef {
        let handle = ObjectRef::new(object);
        let mut heap = self.heap.borrow_mut();
        if heap.len() >= self.prune_at.get() {
            heap.retain(|weak| weak.strong_count() > 0);
            self.prune_at.set((heap.len() * 2).max(INITIAL_PRUNE_THRESHOLD));
        }
        heap.push(handle.downgrade());
        handle
    }

    /// Number of tracked objects that are still alive
    pub fn live_objects(&self) -> usize {
        self.heap.borrow().iter().filter(|weak| weak.strong_count() > 0).count()
    }

    /// Plain object inheriting from `Object.prototype`
    pub fn new_object(&self) -> ObjectRef {
        self.new_object_with_proto(Some(self.intrinsics.object_prototype.clone()))
    }

    /// Plain object with an explicit prototype
    pub fn new_object_with_proto(&self, prototype: Option<ObjectRef>) -> ObjectRef {
        self.alloc(JsObject::new(ObjectKind::Ordinary, prototype))
    }

    /// Array with the given elements
    pub fn new_array(&self, elements: Vec<Value>) -> ObjectRef {
        self.alloc(JsObject::new(
            ObjectKind::Array(elements),
            Some(self.intrinsics.array_prototype.clone()),
        ))
    }

    /// Host function that `new` may not be applied to
    pub fn new_native_function(&self, name: &str, length: usize, func: NativeFn) -> ObjectRef {
        self.native(name, length, func, false)
    }

    /// Host function usable with `new`
    pub fn new_native_constructor(&self, name: &str, length: usize, func: NativeFn) -> ObjectRef {
        self.native(name, length, func, true)
    }

    fn native(&self, name: &str, length: usize, func: NativeFn, constructible: bool) -> ObjectRef {
        let function = self.alloc(JsObject::new(
            ObjectKind::Function(FunctionKind::Native(NativeFunction { func, constructible })),
            Some(self.intrinsics.function_prototype.clone()),
        ));
        function.define("name", non_writable(Value::from(name)));
        function.define("length", non_writable(Value::Number(length as f64)));
        function
    }

    /// Closure over `scope`. `name` supplies the inferred name of an
    /// anonymous function (`const f = () => {}`).
    pub fn new_closure(&self, node: Rc<FunctionNode>, scope: ScopeRef, name: Option<&str>) -> ObjectRef {
        let display_name = node.name.as_deref().or(name).unwrap_or("").to_string();
        let length = node.length();
        let is_arrow = node.is_arrow;

        let function = self.alloc(JsObject::new(
            ObjectKind::Function(FunctionKind::Closure(Closure { node, scope })),
            Some(self.intrinsics.function_prototype.clone()),
        ));
        function.define("name", non_writable(Value::from(display_name)));
        function.define("length", non_writable(Value::Number(length as f64)));

        if !is_arrow {
            let prototype = self.new_object();
            prototype.put_hidden("constructor", Value::Object(function.clone()));
            function.put_hidden("prototype", Value::Object(prototype));
        }
        function
    }

    /// Error object of a built-in kind
    pub fn new_error(&self, kind: ErrorKind, message: &str) -> ObjectRef {
        let error = self.alloc(JsObject::new(
            ObjectKind::Error(ErrorData::default()),
            Some(self.intrinsics.error_prototype(kind).clone()),
        ));
        error.put_hidden("message", Value::from(message));
        error
    }

    /// Error object with its own `name` and an optional host payload
    pub fn new_custom_error(&self, name: &str, message: &str, payload: Option<Rc<dyn Any>>) -> ObjectRef {
        let error = self.alloc(JsObject::new(
            ObjectKind::Error(ErrorData { payload }),
            Some(self.intrinsics.error_prototype(ErrorKind::Error).clone()),
        ));
        error.put_hidden("name", Value::from(name));
        error.put_hidden("message", Value::from(message));
        error
    }

    /// Error object describing an engine error; the position is folded into the message
    pub fn error_from_js_error(&self, error: &JsError) -> ObjectRef {
        let message = match &error.source_position {
            Some(position) => format!("{} ({})", error.message, position),
            None => error.message.clone(),
        };
        self.new_error(error.kind, &message)
    }

    /// Regular expression object
    pub fn new_regexp(&self, pattern: &str, flags: &str) -> Result<ObjectRef, JsError> {
        let regex = compile_regex(pattern, flags)?;
        let regexp = self.alloc(JsObject::new(
            ObjectKind::RegExp(RegExpData {
                source: pattern.to_string(),
                flags: flags.to_string(),
                regex,
            }),
            Some(self.intrinsics.regexp_prototype.clone()),
        ));
        regexp.put_hidden("lastIndex", Value::Number(0.0));
        regexp.define("source", non_writable(Value::from(pattern)));
        regexp.define("flags", non_writable(Value::from(flags)));
        for (flag, name) in [('g', "global"), ('i', "ignoreCase"), ('m', "multiline"), ('y', "sticky")] {
            regexp.define(name, non_writable(Value::Boolean(flags.contains(flag))));
        }
        Ok(regexp)
    }

    /// Sever every object's references and empty the global scope
    pub fn dispose(&self) {
        self.global.clear();
        let heap = std::mem::take(&mut *self.heap.borrow_mut());
        for weak in heap {
            if let Some(object) = weak.upgrade() {
                ObjectRef::from_rc(object).clear();
            }
        }
    }
}

impl Default for Realm {
    fn default() -> Self {
        Self::new()
    }
}

fn non_writable(value: Value) -> Property {
    Property {
        value,
        writable: false,
        enumerable: false,
    }
}

/// Translate a JavaScript pattern and flags into a compiled matcher
fn compile_regex(pattern: &str, flags: &str) -> Result<regex::Regex, JsError> {
    let mut seen = String::new();
    for flag in flags.chars() {
        if !"gimsuy".contains(flag) || seen.contains(flag) {
            return Err(JsError::new(
                ErrorKind::SyntaxError,
                format!("Invalid regular expression flags '{}'", flags),
            ));
        }
        seen.push(flag);
    }

    let mut translated = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'/') => {
                chars.next();
                translated.push('/');
            }
            '\\' => {
                translated.push('\\');
                if let Some(next) = chars.next() {
                    translated.push(next);
                }
            }
            _ => translated.push(c),
        }
    }

    RegexBuilder::new(&translated)
        .case_insensitive(flags.contains('i'))
        .multi_line(flags.contains('m'))
        .dot_matches_new_line(flags.contains('s'))
        .build()
        .map_err(|e| {
            let detail = e.to_string();
            let summary = detail.lines().last().unwrap_or("invalid pattern").trim().to_string();
            JsError::new(
                ErrorKind::SyntaxError,
                format!("Invalid regular expression: /{}/: {}", pattern, summary),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_prototype_chain() {
        let realm = Realm::new();
        let error = realm.new_error(ErrorKind::TypeError, "bad");
        assert_eq!(error.get("name"), Value::from("TypeError"));
        assert_eq!(error.get("message"), Value::from("bad"));
        assert!(error.is_error());
        assert!(error.own_keys().is_empty());

        let base = realm.intrinsics().error_prototype(ErrorKind::Error);
        let type_proto = realm.intrinsics().error_prototype(ErrorKind::TypeError);
        assert!(type_proto.prototype().unwrap().ptr_eq(base));
    }

    #[test]
    fn test_custom_error_payload() {
        let realm = Realm::new();
        let error = realm.new_custom_error("AssertionError", "nope", Some(Rc::new(7u32)));
        assert_eq!(error.get("name"), Value::from("AssertionError"));
        let payload = error.error_payload().unwrap();
        assert_eq!(payload.downcast_ref::<u32>(), Some(&7));
    }

    #[test]
    fn test_regexp_flags() {
        let realm = Realm::new();
        assert!(realm.new_regexp("a\\/b", "gi").is_ok());
        let err = realm.new_regexp("a", "gg").unwrap_err();
        assert_eq!(err.kind, ErrorKind::SyntaxError);
        let err = realm.new_regexp("(", "").unwrap_err();
        assert!(err.message.starts_with("Invalid regular expression: /(/"));
    }

    #[test]
    fn test_dispose_releases_cycles() {
        let realm = Realm::new();
        let a = realm.new_object();
        let b = realm.new_object();
        a.put("b", Value::Object(b.clone()));
        b.put("a", Value::Object(a.clone()));
        let weak = a.downgrade();
        drop(a);
        drop(b);
        assert!(weak.upgrade().is_some());
        realm.dispose();
        assert!(weak.upgrade().is_none());
    }
}
