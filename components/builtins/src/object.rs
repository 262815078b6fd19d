//! Object constructor, Object.prototype and Function.prototype methods

use std::rc::Rc;

use interpreter::{Control, Interpreter, NativeFn, ObjectRef, Property, Value};

use crate::value::{arg, define_constructor, define_method, Builtin, JsResult};

/// Object constructor and prototype methods
pub struct ObjectPrototype;

impl ObjectPrototype {
    /// Install `Object` and `Object.prototype`
    pub fn install(interp: &mut Interpreter) {
        let prototype = interp.realm.intrinsics().object_prototype.clone();
        let constructor = define_constructor(interp, "Object", 1, &prototype, Self::construct);

        let statics: &[(&str, usize, Builtin)] = &[
            ("keys", 1, Self::keys),
            ("values", 1, Self::values),
            ("entries", 1, Self::entries),
            ("assign", 2, Self::assign),
            ("freeze", 1, Self::freeze),
            ("isFrozen", 1, Self::is_frozen),
            ("create", 2, Self::create),
            ("getPrototypeOf", 1, Self::get_prototype_of),
            ("setPrototypeOf", 2, Self::set_prototype_of),
            ("fromEntries", 1, Self::from_entries),
            ("defineProperty", 3, Self::define_property),
        ];
        for (name, length, func) in statics {
            define_method(interp, &constructor, name, *length, *func);
        }

        let methods: &[(&str, usize, Builtin)] = &[
            ("hasOwnProperty", 1, Self::has_own_property),
            ("isPrototypeOf", 1, Self::is_prototype_of),
            ("propertyIsEnumerable", 1, Self::property_is_enumerable),
            ("toString", 0, Self::to_string),
            ("valueOf", 0, Self::value_of),
        ];
        for (name, length, func) in methods {
            define_method(interp, &prototype, name, *length, *func);
        }
    }

    /// Object(value)
    pub fn construct(interp: &mut Interpreter, _this: Value, args: &[Value]) -> JsResult {
        match args.first() {
            Some(value @ Value::Object(_)) => Ok(value.clone()),
            _ => Ok(Value::Object(interp.realm.new_object())),
        }
    }

    /// Object.keys(obj)
    pub fn keys(interp: &mut Interpreter, _this: Value, args: &[Value]) -> JsResult {
        let keys = own_keys(interp, &arg(args, 0))?.into_iter().map(Value::String).collect();
        Ok(Value::Object(interp.realm.new_array(keys)))
    }

    /// Object.values(obj)
    pub fn values(interp: &mut Interpreter, _this: Value, args: &[Value]) -> JsResult {
        let target = arg(args, 0);
        let mut values = Vec::new();
        for key in own_keys(interp, &target)? {
            values.push(interp.get(&target, &key)?);
        }
        Ok(Value::Object(interp.realm.new_array(values)))
    }

    /// Object.entries(obj)
    pub fn entries(interp: &mut Interpreter, _this: Value, args: &[Value]) -> JsResult {
        let target = arg(args, 0);
        let mut entries = Vec::new();
        for key in own_keys(interp, &target)? {
            let value = interp.get(&target, &key)?;
            entries.push(Value::Object(interp.realm.new_array(vec![Value::String(key), value])));
        }
        Ok(Value::Object(interp.realm.new_array(entries)))
    }

    /// Object.assign(target, ...sources)
    pub fn assign(interp: &mut Interpreter, _this: Value, args: &[Value]) -> JsResult {
        let target = match args.first() {
            Some(Value::Object(target)) => target.clone(),
            other => {
                let message = format!(
                    "Cannot convert {} to object",
                    interp.describe(other.unwrap_or(&Value::Undefined))
                );
                return Err(interp.type_error(message));
            }
        };
        for source in args.iter().skip(1) {
            if source.is_nullish() {
                continue;
            }
            for key in own_keys(interp, source)? {
                let value = interp.get(source, &key)?;
                if !target.set(&key, value) {
                    let message = format!("Cannot assign to read only property '{}' of object", key);
                    return Err(interp.type_error(message));
                }
            }
        }
        Ok(Value::Object(target))
    }

    /// Object.freeze(obj)
    pub fn freeze(_interp: &mut Interpreter, _this: Value, args: &[Value]) -> JsResult {
        let target = arg(args, 0);
        if let Value::Object(object) = &target {
            let mut inner = object.borrow_mut();
            inner.frozen = true;
            inner.extensible = false;
            for property in inner.properties.values_mut() {
                property.writable = false;
            }
        }
        Ok(target)
    }

    /// Object.isFrozen(obj)
    pub fn is_frozen(_interp: &mut Interpreter, _this: Value, args: &[Value]) -> JsResult {
        Ok(Value::Boolean(match args.first() {
            Some(Value::Object(object)) => object.borrow().frozen,
            _ => true,
        }))
    }

    /// Object.create(proto, properties)
    pub fn create(interp: &mut Interpreter, _this: Value, args: &[Value]) -> JsResult {
        let prototype = match args.first() {
            Some(Value::Object(prototype)) => Some(prototype.clone()),
            Some(Value::Null) => None,
            other => {
                let message = format!(
                    "Object prototype may only be an Object or null: {}",
                    interp.describe(other.unwrap_or(&Value::Undefined))
                );
                return Err(interp.type_error(message));
            }
        };
        let object = interp.realm.new_object_with_proto(prototype);
        if let Some(Value::Object(descriptors)) = args.get(1) {
            for key in descriptors.own_keys() {
                let descriptor = descriptors.get(&key);
                apply_descriptor(interp, &object, &key, &descriptor)?;
            }
        }
        Ok(Value::Object(object))
    }

    /// Object.getPrototypeOf(obj)
    pub fn get_prototype_of(interp: &mut Interpreter, _this: Value, args: &[Value]) -> JsResult {
        let intrinsics = interp.realm.intrinsics();
        let prototype = match arg(args, 0) {
            Value::Object(object) => object.prototype(),
            Value::String(_) => Some(intrinsics.string_prototype.clone()),
            Value::Number(_) => Some(intrinsics.number_prototype.clone()),
            Value::Boolean(_) => Some(intrinsics.boolean_prototype.clone()),
            other => {
                let message = format!("Cannot convert {} to object", interp.describe(&other));
                return Err(interp.type_error(message));
            }
        };
        Ok(prototype.map(Value::Object).unwrap_or(Value::Null))
    }

    /// Object.setPrototypeOf(obj, proto)
    pub fn set_prototype_of(interp: &mut Interpreter, _this: Value, args: &[Value]) -> JsResult {
        let target = arg(args, 0);
        let prototype = match arg(args, 1) {
            Value::Object(prototype) => Some(prototype),
            Value::Null => None,
            _ => return Err(interp.type_error("Object prototype may only be an Object or null")),
        };
        if let Value::Object(object) = &target {
            let mut cursor = prototype.clone();
            while let Some(candidate) = cursor {
                if candidate.ptr_eq(object) {
                    return Err(interp.type_error("Cyclic __proto__ value"));
                }
                cursor = candidate.prototype();
            }
            object.borrow_mut().prototype = prototype;
        }
        Ok(target)
    }

    /// Object.fromEntries(entries)
    pub fn from_entries(interp: &mut Interpreter, _this: Value, args: &[Value]) -> JsResult {
        let entries = interp.iterate(&arg(args, 0))?;
        let object = interp.realm.new_object();
        for entry in entries {
            let key = interp.get(&entry, "0")?;
            let key = interp.to_property_key(&key)?;
            let value = interp.get(&entry, "1")?;
            object.put(&key, value);
        }
        Ok(Value::Object(object))
    }

    /// Object.defineProperty(obj, key, descriptor)
    pub fn define_property(interp: &mut Interpreter, _this: Value, args: &[Value]) -> JsResult {
        let target = match args.first() {
            Some(Value::Object(target)) => target.clone(),
            _ => return Err(interp.type_error("Object.defineProperty called on non-object")),
        };
        let key = interp.to_property_key(&arg(args, 1))?;
        apply_descriptor(interp, &target, &key, &arg(args, 2))?;
        Ok(Value::Object(target))
    }

    /// Object.prototype.hasOwnProperty(key)
    pub fn has_own_property(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let key = interp.to_property_key(&arg(args, 0))?;
        Ok(Value::Boolean(match &this {
            Value::Object(object) => object.has_own(&key),
            Value::String(s) => {
                key.as_ref() == "length"
                    || interpreter::value::array_index(&key)
                        .is_some_and(|index| index < interpreter::value::utf16_len(s))
            }
            _ => false,
        }))
    }

    /// Object.prototype.isPrototypeOf(obj)
    pub fn is_prototype_of(_interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let (Value::Object(prototype), Value::Object(object)) = (&this, arg(args, 0)) else {
            return Ok(Value::Boolean(false));
        };
        let mut cursor = object.prototype();
        while let Some(candidate) = cursor {
            if candidate.ptr_eq(prototype) {
                return Ok(Value::Boolean(true));
            }
            cursor = candidate.prototype();
        }
        Ok(Value::Boolean(false))
    }

    /// Object.prototype.propertyIsEnumerable(key)
    pub fn property_is_enumerable(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let key = interp.to_property_key(&arg(args, 0))?;
        Ok(Value::Boolean(match &this {
            Value::Object(object) => object.own_keys().contains(&key),
            _ => false,
        }))
    }

    /// Object.prototype.toString()
    pub fn to_string(_interp: &mut Interpreter, this: Value, _args: &[Value]) -> JsResult {
        let tag = match &this {
            Value::Undefined => "Undefined",
            Value::Null => "Null",
            Value::Boolean(_) => "Boolean",
            Value::Number(_) => "Number",
            Value::String(_) => "String",
            Value::Object(object) => object.class_name(),
        };
        Ok(Value::from(format!("[object {}]", tag)))
    }

    /// Object.prototype.valueOf()
    pub fn value_of(_interp: &mut Interpreter, this: Value, _args: &[Value]) -> JsResult {
        Ok(this)
    }
}

fn own_keys(interp: &Interpreter, value: &Value) -> Result<Vec<Rc<str>>, Control> {
    match value {
        Value::Undefined | Value::Null => {
            let message = format!("Cannot convert {} to object", interp.describe(value));
            Err(interp.type_error(message))
        }
        Value::String(s) => Ok((0..interpreter::value::utf16_len(s))
            .map(|i| Rc::from(i.to_string()))
            .collect()),
        Value::Object(object) => Ok(object.own_keys()),
        _ => Ok(Vec::new()),
    }
}

/// Data descriptor `{ value, writable, enumerable }`; absent flags default to false
fn apply_descriptor(interp: &mut Interpreter, target: &ObjectRef, key: &str, descriptor: &Value) -> Result<(), Control> {
    let Value::Object(descriptor) = descriptor else {
        let message = format!("Property description must be an object: {}", interp.describe(descriptor));
        return Err(interp.type_error(message));
    };
    if target.borrow().frozen {
        return Err(interp.type_error(format!("Cannot define property {}, object is not extensible", key)));
    }
    target.define(
        key,
        Property {
            value: descriptor.get("value"),
            writable: descriptor.get("writable").to_boolean(),
            enumerable: descriptor.get("enumerable").to_boolean(),
        },
    );
    Ok(())
}

/// Function.prototype methods
pub struct FunctionPrototype;

impl FunctionPrototype {
    /// Install `Function.prototype` methods
    pub fn install(interp: &mut Interpreter) {
        let prototype = interp.realm.intrinsics().function_prototype.clone();
        let methods: &[(&str, usize, Builtin)] = &[
            ("call", 1, Self::call),
            ("apply", 2, Self::apply),
            ("bind", 1, Self::bind),
            ("toString", 0, Self::to_string),
        ];
        for (name, length, func) in methods {
            define_method(interp, &prototype, name, *length, *func);
        }
    }

    /// Function.prototype.call(thisArg, ...args)
    pub fn call(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let rest = args.get(1..).unwrap_or(&[]);
        interp.call(&this, arg(args, 0), rest)
    }

    /// Function.prototype.apply(thisArg, argsArray)
    pub fn apply(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let call_args = match args.get(1) {
            None | Some(Value::Undefined) | Some(Value::Null) => Vec::new(),
            Some(Value::Object(list)) if list.is_array() => list.array_elements(),
            Some(_) => return Err(interp.type_error("CreateListFromArrayLike called on non-object")),
        };
        interp.call(&this, arg(args, 0), &call_args)
    }

    /// Function.prototype.bind(thisArg, ...args)
    pub fn bind(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let target = match &this {
            Value::Object(object) if object.is_callable() => object.clone(),
            _ => return Err(interp.type_error("Bind must be called on a function")),
        };
        let bound_this = arg(args, 0);
        let bound_args: Vec<Value> = args.get(1..).unwrap_or(&[]).to_vec();

        let name = match target.get("name") {
            Value::String(name) => format!("bound {}", name),
            _ => "bound ".to_string(),
        };
        let length = match target.get("length") {
            Value::Number(n) => (n as usize).saturating_sub(bound_args.len()),
            _ => 0,
        };
        let callee = Value::Object(target);
        let func: NativeFn = Rc::new(move |interp: &mut Interpreter, _this: Value, args: &[Value]| -> JsResult {
            let mut call_args = bound_args.clone();
            call_args.extend_from_slice(args);
            interp.call(&callee, bound_this.clone(), &call_args)
        });
        Ok(Value::Object(interp.realm.new_native_function(&name, length, func)))
    }

    /// Function.prototype.toString()
    pub fn to_string(interp: &mut Interpreter, this: Value, _args: &[Value]) -> JsResult {
        if !this.is_callable() {
            return Err(interp.type_error("Function.prototype.toString requires that 'this' be a Function"));
        }
        let name = interp.describe(&this);
        Ok(Value::from(format!("function {}() {{ [native code] }}", name)))
    }
}
