//! Object model: shared handles, property storage and object kinds

use std::any::Any;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use parser::FunctionNode;

use crate::error::Control;
use crate::interpreter::Interpreter;
use crate::scope::ScopeRef;
use crate::value::{array_index, Value};

/// Longest array the engine will build; arrays are stored densely
pub const MAX_ARRAY_LENGTH: usize = 1 << 24;

/// Length an array needs after `array[key] = value`, when the write can grow it
pub fn requested_array_length(key: &str, value: &Value) -> Option<usize> {
    if key == "length" {
        return match value {
            Value::Number(n) if *n >= 0.0 && n.fract() == 0.0 && *n < u32::MAX as f64 => Some(*n as usize),
            _ => None,
        };
    }
    array_index(key).map(|index| index + 1)
}

/// Signature of host-implemented functions: `(interpreter, this, arguments)`
pub type NativeFn = Rc<dyn Fn(&mut Interpreter, Value, &[Value]) -> Result<Value, Control>>;

/// An own data property
#[derive(Debug, Clone)]
pub struct Property {
    /// Stored value
    pub value: Value,
    /// Assignment allowed
    pub writable: bool,
    /// Visible to `for...in` and `Object.keys`
    pub enumerable: bool,
}

impl Property {
    /// Writable, enumerable property (what assignment creates)
    pub fn data(value: Value) -> Self {
        Self {
            value,
            writable: true,
            enumerable: true,
        }
    }

    /// Writable, non-enumerable property (methods installed on prototypes)
    pub fn hidden(value: Value) -> Self {
        Self {
            value,
            writable: true,
            enumerable: false,
        }
    }
}

/// A function defined in JavaScript source
pub struct Closure {
    /// Parsed definition
    pub node: Rc<FunctionNode>,
    /// Captured lexical environment
    pub scope: ScopeRef,
}

/// A function implemented by the host
pub struct NativeFunction {
    /// Implementation
    pub func: NativeFn,
    /// Whether `new` may be applied
    pub constructible: bool,
}

/// Callable object variants
pub enum FunctionKind {
    /// JavaScript function
    Closure(Closure),
    /// Host function
    Native(NativeFunction),
}

/// Internal data of error objects
#[derive(Default)]
pub struct ErrorData {
    /// Opaque host tag attached to errors raised by the embedder
    pub payload: Option<Rc<dyn Any>>,
}

/// Internal data of regular expression objects
pub struct RegExpData {
    /// Pattern source as written
    pub source: String,
    /// Flags as written
    pub flags: String,
    /// Compiled matcher
    pub regex: regex::Regex,
}

/// What kind of object this is, with its internal slots
pub enum ObjectKind {
    /// Plain object
    Ordinary,
    /// Array with dense element storage (holes read as `undefined`)
    Array(Vec<Value>),
    /// Function object
    Function(FunctionKind),
    /// Error object
    Error(ErrorData),
    /// Regular expression
    RegExp(RegExpData),
}

/// Heap object
pub struct JsObject {
    /// Prototype link
    pub prototype: Option<ObjectRef>,
    /// Own properties in insertion order
    pub properties: IndexMap<Rc<str>, Property>,
    /// Internal kind
    pub kind: ObjectKind,
    /// New properties may be added
    pub extensible: bool,
    /// Set by `Object.freeze`; also blocks array element writes
    pub frozen: bool,
}

impl JsObject {
    /// Create an object of the given kind
    pub fn new(kind: ObjectKind, prototype: Option<ObjectRef>) -> Self {
        Self {
            prototype,
            properties: IndexMap::new(),
            kind,
            extensible: true,
            frozen: false,
        }
    }
}

/// Shared handle to a heap object; equality is identity
#[derive(Clone)]
pub struct ObjectRef(Rc<RefCell<JsObject>>);

impl ObjectRef {
    pub(crate) fn new(object: JsObject) -> Self {
        ObjectRef(Rc::new(RefCell::new(object)))
    }

    pub(crate) fn from_rc(inner: Rc<RefCell<JsObject>>) -> Self {
        ObjectRef(inner)
    }

    pub(crate) fn downgrade(&self) -> Weak<RefCell<JsObject>> {
        Rc::downgrade(&self.0)
    }

    /// Immutably borrow the object
    pub fn borrow(&self) -> Ref<'_, JsObject> {
        self.0.borrow()
    }

    /// Mutably borrow the object
    pub fn borrow_mut(&self) -> RefMut<'_, JsObject> {
        self.0.borrow_mut()
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Stable identity for cycle detection while the object is alive
    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    /// Prototype link
    pub fn prototype(&self) -> Option<ObjectRef> {
        self.borrow().prototype.clone()
    }

    /// True for function objects
    pub fn is_callable(&self) -> bool {
        matches!(self.borrow().kind, ObjectKind::Function(_))
    }

    /// True for objects `new` may be applied to
    pub fn is_constructor(&self) -> bool {
        match &self.borrow().kind {
            ObjectKind::Function(FunctionKind::Closure(c)) => !c.node.is_arrow,
            ObjectKind::Function(FunctionKind::Native(n)) => n.constructible,
            _ => false,
        }
    }

    /// True for arrays
    pub fn is_array(&self) -> bool {
        matches!(self.borrow().kind, ObjectKind::Array(_))
    }

    /// True for error objects
    pub fn is_error(&self) -> bool {
        matches!(self.borrow().kind, ObjectKind::Error(_))
    }

    /// True for regular expressions
    pub fn is_regexp(&self) -> bool {
        matches!(self.borrow().kind, ObjectKind::RegExp(_))
    }

    /// Host payload attached to an error object
    pub fn error_payload(&self) -> Option<Rc<dyn Any>> {
        match &self.borrow().kind {
            ObjectKind::Error(data) => data.payload.clone(),
            _ => None,
        }
    }

    /// Snapshot of array elements (empty for non-arrays)
    pub fn array_elements(&self) -> Vec<Value> {
        match &self.borrow().kind {
            ObjectKind::Array(elements) => elements.clone(),
            _ => Vec::new(),
        }
    }

    /// Own property lookup, including array elements and `length`
    pub fn get_own(&self, key: &str) -> Option<Value> {
        let object = self.borrow();
        if let ObjectKind::Array(elements) = &object.kind {
            if key == "length" {
                return Some(Value::Number(elements.len() as f64));
            }
            if let Some(index) = array_index(key) {
                return elements.get(index).cloned();
            }
        }
        object.properties.get(key).map(|p| p.value.clone())
    }

    /// Property lookup along the prototype chain
    pub fn get(&self, key: &str) -> Value {
        let mut current = Some(self.clone());
        while let Some(object) = current {
            if let Some(value) = object.get_own(key) {
                return value;
            }
            current = object.prototype();
        }
        Value::Undefined
    }

    /// Own property check
    pub fn has_own(&self, key: &str) -> bool {
        let object = self.borrow();
        if let ObjectKind::Array(elements) = &object.kind {
            if key == "length" {
                return true;
            }
            if let Some(index) = array_index(key) {
                return index < elements.len();
            }
        }
        object.properties.contains_key(key)
    }

    /// Property check along the prototype chain (the `in` operator)
    pub fn has_property(&self, key: &str) -> bool {
        let mut current = Some(self.clone());
        while let Some(object) = current {
            if object.has_own(key) {
                return true;
            }
            current = object.prototype();
        }
        false
    }

    /// Ordinary assignment. Returns `false` when the write is rejected
    /// (frozen object, read-only property, or invalid array length).
    pub fn set(&self, key: &str, value: Value) -> bool {
        let mut object = self.borrow_mut();
        let frozen = object.frozen;

        if let ObjectKind::Array(elements) = &mut object.kind {
            if key == "length" {
                let length = match value {
                    Value::Number(n) if n >= 0.0 && n.fract() == 0.0 && n <= MAX_ARRAY_LENGTH as f64 => n as usize,
                    _ => return false,
                };
                if frozen {
                    return false;
                }
                elements.resize(length, Value::Undefined);
                return true;
            }
            if let Some(index) = array_index(key) {
                if frozen || index >= MAX_ARRAY_LENGTH {
                    return false;
                }
                if index >= elements.len() {
                    elements.resize(index + 1, Value::Undefined);
                }
                elements[index] = value;
                return true;
            }
        }

        if let Some(property) = object.properties.get_mut(key) {
            if !property.writable {
                return false;
            }
            property.value = value;
            return true;
        }
        if !object.extensible {
            return false;
        }
        object.properties.insert(key.into(), Property::data(value));
        true
    }

    /// Define or overwrite an own property regardless of writability
    pub fn define(&self, key: &str, property: Property) {
        let mut object = self.borrow_mut();
        if let ObjectKind::Array(elements) = &mut object.kind {
            match array_index(key) {
                Some(index) if index < MAX_ARRAY_LENGTH => {
                    if index >= elements.len() {
                        elements.resize(index + 1, Value::Undefined);
                    }
                    elements[index] = property.value;
                    return;
                }
                _ => {}
            }
        }
        object.properties.insert(key.into(), property);
    }

    /// Define a writable, enumerable own property
    pub fn put(&self, key: &str, value: Value) {
        self.define(key, Property::data(value));
    }

    /// Define a writable, non-enumerable own property
    pub fn put_hidden(&self, key: &str, value: Value) {
        self.define(key, Property::hidden(value));
    }

    /// The `delete` operator on an own property
    pub fn delete(&self, key: &str) -> bool {
        let mut object = self.borrow_mut();
        if object.frozen {
            return false;
        }
        if let ObjectKind::Array(elements) = &mut object.kind {
            if key == "length" {
                return false;
            }
            if let Some(index) = array_index(key) {
                if let Some(slot) = elements.get_mut(index) {
                    *slot = Value::Undefined;
                }
                return true;
            }
        }
        object.properties.shift_remove(key);
        true
    }

    /// Own enumerable string keys in property order:
    /// array indices, then integer keys ascending, then insertion order
    pub fn own_keys(&self) -> Vec<Rc<str>> {
        let object = self.borrow();
        let mut keys: Vec<Rc<str>> = Vec::new();
        if let ObjectKind::Array(elements) = &object.kind {
            keys.extend((0..elements.len()).map(|i| Rc::from(i.to_string())));
        }

        let mut integer_keys: Vec<(usize, Rc<str>)> = Vec::new();
        let mut string_keys: Vec<Rc<str>> = Vec::new();
        for (key, property) in &object.properties {
            if !property.enumerable {
                continue;
            }
            match array_index(key) {
                Some(index) => integer_keys.push((index, key.clone())),
                None => string_keys.push(key.clone()),
            }
        }
        integer_keys.sort_by_key(|(index, _)| *index);
        keys.extend(integer_keys.into_iter().map(|(_, key)| key));
        keys.extend(string_keys);
        keys
    }

    /// Short name of the object's kind for diagnostics
    pub fn class_name(&self) -> &'static str {
        match &self.borrow().kind {
            ObjectKind::Ordinary => "Object",
            ObjectKind::Array(_) => "Array",
            ObjectKind::Function(_) => "Function",
            ObjectKind::Error(_) => "Error",
            ObjectKind::RegExp(_) => "RegExp",
        }
    }

    /// Drop every outgoing reference so reference cycles can be reclaimed
    pub(crate) fn clear(&self) {
        if let Ok(mut object) = self.0.try_borrow_mut() {
            object.prototype = None;
            object.properties.clear();
            object.kind = ObjectKind::Ordinary;
        }
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(object) => match &object.kind {
                ObjectKind::Array(elements) => write!(f, "Array(len={})", elements.len()),
                _ => write!(f, "{}({} props)", self.class_name(), object.properties.len()),
            },
            Err(_) => write!(f, "Object(<borrowed>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object() -> ObjectRef {
        ObjectRef::new(JsObject::new(ObjectKind::Ordinary, None))
    }

    #[test]
    fn test_prototype_chain_lookup() {
        let proto = object();
        proto.put("greeting", Value::from("hi"));
        let child = ObjectRef::new(JsObject::new(ObjectKind::Ordinary, Some(proto.clone())));

        assert_eq!(child.get("greeting"), Value::from("hi"));
        assert!(child.get_own("greeting").is_none());
        assert!(child.has_property("greeting"));
        assert!(!child.has_own("greeting"));
    }

    #[test]
    fn test_array_length_and_elements() {
        let array = ObjectRef::new(JsObject::new(ObjectKind::Array(vec![Value::Number(1.0)]), None));
        assert!(array.set("3", Value::Number(4.0)));
        assert_eq!(array.get("length"), Value::Number(4.0));
        assert_eq!(array.get("1"), Value::Undefined);

        assert!(array.set("length", Value::Number(1.0)));
        assert_eq!(array.array_elements(), vec![Value::Number(1.0)]);
        assert!(!array.set("length", Value::Number(-1.0)));
    }

    #[test]
    fn test_array_growth_is_capped() {
        let array = ObjectRef::new(JsObject::new(ObjectKind::Array(Vec::new()), None));
        assert!(!array.set("length", Value::Number(4e9)));
        assert!(!array.set(&MAX_ARRAY_LENGTH.to_string(), Value::Null));
        assert_eq!(array.get("length"), Value::Number(0.0));

        assert_eq!(requested_array_length("length", &Value::Number(10.0)), Some(10));
        assert_eq!(requested_array_length("7", &Value::Null), Some(8));
        assert_eq!(requested_array_length("name", &Value::Null), None);
    }

    #[test]
    fn test_key_order() {
        let obj = object();
        obj.put("b", Value::Null);
        obj.put("2", Value::Null);
        obj.put("a", Value::Null);
        obj.put("1", Value::Null);
        obj.put_hidden("hidden", Value::Null);

        let keys: Vec<String> = obj.own_keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["1", "2", "b", "a"]);
    }

    #[test]
    fn test_frozen_rejects_writes() {
        let obj = object();
        obj.put("a", Value::Number(1.0));
        {
            let mut inner = obj.borrow_mut();
            inner.frozen = true;
            inner.extensible = false;
            for property in inner.properties.values_mut() {
                property.writable = false;
            }
        }
        assert!(!obj.set("a", Value::Number(2.0)));
        assert!(!obj.set("b", Value::Number(2.0)));
        assert_eq!(obj.get("a"), Value::Number(1.0));
        assert!(!obj.delete("a"));
    }

    #[test]
    fn test_identity_equality() {
        let a = object();
        let b = object();
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }
}
