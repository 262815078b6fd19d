//! Array constructor and Array.prototype methods

use std::cmp::Ordering;

use interpreter::object::ObjectKind;
use interpreter::value::{exceeds_string_limit, same_value_zero, strict_equals};
use interpreter::{Control, Interpreter, ObjectRef, Value, MAX_ARRAY_LENGTH};

use crate::value::{arg, callback_arg, define_constructor, define_method, relative_index, to_integer, JsResult};

/// Array constructor and prototype methods
pub struct ArrayPrototype;

impl ArrayPrototype {
    /// Install `Array` and `Array.prototype`
    pub fn install(interp: &mut Interpreter) {
        let prototype = interp.realm.intrinsics().array_prototype.clone();
        let constructor = define_constructor(interp, "Array", 1, &prototype, Self::construct);
        define_method(interp, &constructor, "isArray", 1, Self::is_array);
        define_method(interp, &constructor, "of", 0, Self::of);
        define_method(interp, &constructor, "from", 1, Self::from);

        let methods: &[(&str, usize, crate::value::Builtin)] = &[
            ("push", 1, Self::push),
            ("pop", 0, Self::pop),
            ("shift", 0, Self::shift),
            ("unshift", 1, Self::unshift),
            ("slice", 2, Self::slice),
            ("splice", 2, Self::splice),
            ("concat", 1, Self::concat),
            ("join", 1, Self::join),
            ("reverse", 0, Self::reverse),
            ("indexOf", 1, Self::index_of),
            ("lastIndexOf", 1, Self::last_index_of),
            ("includes", 1, Self::includes),
            ("find", 1, Self::find),
            ("findIndex", 1, Self::find_index),
            ("findLast", 1, Self::find_last),
            ("filter", 1, Self::filter),
            ("map", 1, Self::map),
            ("forEach", 1, Self::for_each),
            ("some", 1, Self::some),
            ("every", 1, Self::every),
            ("reduce", 1, Self::reduce),
            ("reduceRight", 1, Self::reduce_right),
            ("sort", 1, Self::sort),
            ("flat", 0, Self::flat),
            ("flatMap", 1, Self::flat_map),
            ("fill", 1, Self::fill),
            ("at", 1, Self::at),
            ("keys", 0, Self::keys),
            ("entries", 0, Self::entries),
            ("toString", 0, Self::to_string),
        ];
        for (name, length, func) in methods {
            define_method(interp, &prototype, name, *length, *func);
        }
    }

    /// Array(...items) / Array(length)
    pub fn construct(interp: &mut Interpreter, _this: Value, args: &[Value]) -> JsResult {
        if let [Value::Number(length)] = args {
            if *length < 0.0 || length.fract() != 0.0 || *length > MAX_ARRAY_LENGTH as f64 {
                return Err(interp.invalid_array_length());
            }
            let elements = vec![Value::Undefined; *length as usize];
            return Ok(Value::Object(interp.realm.new_array(elements)));
        }
        Ok(Value::Object(interp.realm.new_array(args.to_vec())))
    }

    /// Array.isArray(value)
    pub fn is_array(_interp: &mut Interpreter, _this: Value, args: &[Value]) -> JsResult {
        Ok(Value::Boolean(matches!(args.first(), Some(Value::Object(o)) if o.is_array())))
    }

    /// Array.of(...items)
    pub fn of(interp: &mut Interpreter, _this: Value, args: &[Value]) -> JsResult {
        Ok(Value::Object(interp.realm.new_array(args.to_vec())))
    }

    /// Array.from(source, mapFn)
    pub fn from(interp: &mut Interpreter, _this: Value, args: &[Value]) -> JsResult {
        let source = arg(args, 0);
        let items = match &source {
            Value::Object(object) if !object.is_array() => {
                let length = to_integer(interp, &object.get("length"))?.max(0.0);
                if length > MAX_ARRAY_LENGTH as f64 {
                    return Err(interp.invalid_array_length());
                }
                (0..length as usize).map(|i| object.get(&i.to_string())).collect()
            }
            Value::Undefined | Value::Null => {
                let message = format!("{} is not iterable", interp.describe(&source));
                return Err(interp.type_error(message));
            }
            Value::Object(_) | Value::String(_) => interp.iterate(&source)?,
            _ => Vec::new(),
        };

        let mapper = arg(args, 1);
        let items = if mapper.is_undefined() {
            items
        } else {
            let mapper = callback_arg(interp, args, 1)?;
            let mut mapped = Vec::with_capacity(items.len());
            for (index, item) in items.into_iter().enumerate() {
                mapped.push(interp.call(&mapper, Value::Undefined, &[item, Value::Number(index as f64)])?);
            }
            mapped
        };
        Ok(Value::Object(interp.realm.new_array(items)))
    }

    /// Array.prototype.push(...items)
    pub fn push(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let array = this_array(interp, &this, "push")?;
        let length = mutate(interp, &array, |elements| {
            if elements.len() + args.len() > MAX_ARRAY_LENGTH {
                return None;
            }
            elements.extend_from_slice(args);
            Some(elements.len())
        })?
        .ok_or_else(|| interp.invalid_array_length())?;
        Ok(Value::Number(length as f64))
    }

    /// Array.prototype.pop()
    pub fn pop(interp: &mut Interpreter, this: Value, _args: &[Value]) -> JsResult {
        let array = this_array(interp, &this, "pop")?;
        let popped = mutate(interp, &array, Vec::pop)?;
        Ok(popped.unwrap_or(Value::Undefined))
    }

    /// Array.prototype.shift()
    pub fn shift(interp: &mut Interpreter, this: Value, _args: &[Value]) -> JsResult {
        let array = this_array(interp, &this, "shift")?;
        let shifted = mutate(interp, &array, |elements| {
            if elements.is_empty() {
                Value::Undefined
            } else {
                elements.remove(0)
            }
        })?;
        Ok(shifted)
    }

    /// Array.prototype.unshift(...items)
    pub fn unshift(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let array = this_array(interp, &this, "unshift")?;
        let length = mutate(interp, &array, |elements| {
            if elements.len() + args.len() > MAX_ARRAY_LENGTH {
                return None;
            }
            elements.splice(0..0, args.iter().cloned());
            Some(elements.len())
        })?
        .ok_or_else(|| interp.invalid_array_length())?;
        Ok(Value::Number(length as f64))
    }

    /// Array.prototype.slice(start, end)
    pub fn slice(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let elements = this_elements(interp, &this, "slice")?;
        let start = relative_index(interp, &arg(args, 0), elements.len(), 0)?;
        let end = relative_index(interp, &arg(args, 1), elements.len(), elements.len())?;
        let sliced = if start < end { elements[start..end].to_vec() } else { Vec::new() };
        Ok(Value::Object(interp.realm.new_array(sliced)))
    }

    /// Array.prototype.splice(start, deleteCount, ...items)
    pub fn splice(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let array = this_array(interp, &this, "splice")?;
        let len = array.array_elements().len();
        let start = relative_index(interp, &arg(args, 0), len, 0)?;
        let delete_count = match args.len() {
            0 => 0,
            1 => len - start,
            _ => (to_integer(interp, &args[1])?.max(0.0) as usize).min(len - start),
        };
        let inserted = args.get(2..).unwrap_or(&[]);
        interp.check_array_length(len - delete_count + inserted.len())?;
        let removed = mutate(interp, &array, |elements| {
            elements
                .splice(start..start + delete_count, inserted.iter().cloned())
                .collect::<Vec<_>>()
        })?;
        Ok(Value::Object(interp.realm.new_array(removed)))
    }

    /// Array.prototype.concat(...values)
    pub fn concat(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let mut elements = this_elements(interp, &this, "concat")?;
        for value in args {
            match value {
                Value::Object(object) if object.is_array() => {
                    let other = object.array_elements();
                    interp.check_array_length(elements.len() + other.len())?;
                    elements.extend(other);
                }
                other => elements.push(other.clone()),
            }
        }
        Ok(Value::Object(interp.realm.new_array(elements)))
    }

    /// Array.prototype.join(separator)
    pub fn join(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let elements = this_elements(interp, &this, "join")?;
        let separator = match args.first() {
            None | Some(Value::Undefined) => ",".into(),
            Some(value) => interp.to_string(value)?,
        };
        let mut text = String::new();
        for (index, element) in elements.iter().enumerate() {
            let piece = match element {
                Value::Undefined | Value::Null => "".into(),
                other => interp.to_string(other)?,
            };
            let separator = if index == 0 { "" } else { &*separator };
            if exceeds_string_limit(&[&text, separator, &piece]) {
                return Err(interp.invalid_string_length());
            }
            text.push_str(separator);
            text.push_str(&piece);
        }
        Ok(Value::from(text))
    }

    /// Array.prototype.toString()
    pub fn to_string(interp: &mut Interpreter, this: Value, _args: &[Value]) -> JsResult {
        Self::join(interp, this, &[])
    }

    /// Array.prototype.reverse()
    pub fn reverse(interp: &mut Interpreter, this: Value, _args: &[Value]) -> JsResult {
        let array = this_array(interp, &this, "reverse")?;
        mutate(interp, &array, |elements| elements.reverse())?;
        Ok(this)
    }

    /// Array.prototype.indexOf(value, fromIndex)
    pub fn index_of(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let elements = this_elements(interp, &this, "indexOf")?;
        let target = arg(args, 0);
        let from = relative_index(interp, &arg(args, 1), elements.len(), 0)?;
        let found = elements.iter().skip(from).position(|e| strict_equals(e, &target));
        Ok(Value::Number(found.map(|i| (i + from) as f64).unwrap_or(-1.0)))
    }

    /// Array.prototype.lastIndexOf(value)
    pub fn last_index_of(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let elements = this_elements(interp, &this, "lastIndexOf")?;
        let target = arg(args, 0);
        let found = elements.iter().rposition(|e| strict_equals(e, &target));
        Ok(Value::Number(found.map(|i| i as f64).unwrap_or(-1.0)))
    }

    /// Array.prototype.includes(value)
    pub fn includes(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let elements = this_elements(interp, &this, "includes")?;
        let target = arg(args, 0);
        Ok(Value::Boolean(elements.iter().any(|e| same_value_zero(e, &target))))
    }

    /// Array.prototype.find(predicate)
    pub fn find(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let found = search(interp, &this, args, "find", false)?;
        Ok(found.map(|(_, value)| value).unwrap_or(Value::Undefined))
    }

    /// Array.prototype.findLast(predicate)
    pub fn find_last(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let found = search(interp, &this, args, "findLast", true)?;
        Ok(found.map(|(_, value)| value).unwrap_or(Value::Undefined))
    }

    /// Array.prototype.findIndex(predicate)
    pub fn find_index(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let found = search(interp, &this, args, "findIndex", false)?;
        Ok(Value::Number(found.map(|(index, _)| index as f64).unwrap_or(-1.0)))
    }

    /// Array.prototype.filter(predicate)
    pub fn filter(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let mut kept = Vec::new();
        for_each_element(interp, &this, args, "filter", |element, result| {
            if result.to_boolean() {
                kept.push(element.clone());
            }
            true
        })?;
        Ok(Value::Object(interp.realm.new_array(kept)))
    }

    /// Array.prototype.map(callback)
    pub fn map(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let mut mapped = Vec::new();
        for_each_element(interp, &this, args, "map", |_, result| {
            mapped.push(result);
            true
        })?;
        Ok(Value::Object(interp.realm.new_array(mapped)))
    }

    /// Array.prototype.forEach(callback)
    pub fn for_each(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        for_each_element(interp, &this, args, "forEach", |_, _| true)?;
        Ok(Value::Undefined)
    }

    /// Array.prototype.some(predicate)
    pub fn some(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let mut any = false;
        for_each_element(interp, &this, args, "some", |_, result| {
            any = result.to_boolean();
            !any
        })?;
        Ok(Value::Boolean(any))
    }

    /// Array.prototype.every(predicate)
    pub fn every(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let mut all = true;
        for_each_element(interp, &this, args, "every", |_, result| {
            all = result.to_boolean();
            all
        })?;
        Ok(Value::Boolean(all))
    }

    /// Array.prototype.reduce(callback, initial)
    pub fn reduce(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let elements = this_elements(interp, &this, "reduce")?;
        fold(interp, &this, args, elements.into_iter().enumerate().collect())
    }

    /// Array.prototype.reduceRight(callback, initial)
    pub fn reduce_right(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let elements = this_elements(interp, &this, "reduceRight")?;
        fold(interp, &this, args, elements.into_iter().enumerate().rev().collect())
    }

    /// Array.prototype.sort(comparator)
    pub fn sort(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let array = this_array(interp, &this, "sort")?;
        let comparator = arg(args, 0);
        if !comparator.is_undefined() && !comparator.is_callable() {
            return Err(interp.type_error("The comparison function must be either a function or undefined"));
        }

        let elements = array.array_elements();
        let (mut defined, undefined): (Vec<Value>, Vec<Value>) =
            elements.into_iter().partition(|value| !value.is_undefined());
        defined = merge_sort(interp, defined, &comparator)?;
        defined.extend(undefined);
        mutate(interp, &array, |elements| *elements = defined)?;
        Ok(this)
    }

    /// Array.prototype.flat(depth)
    pub fn flat(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let elements = this_elements(interp, &this, "flat")?;
        let depth = match args.first() {
            None | Some(Value::Undefined) => 1.0,
            Some(value) => to_integer(interp, value)?,
        };
        let mut out = Vec::new();
        if !flatten_into(&mut out, elements, depth.min(MAX_FLAT_DEPTH)) {
            return Err(interp.invalid_array_length());
        }
        Ok(Value::Object(interp.realm.new_array(out)))
    }

    /// Array.prototype.flatMap(callback)
    pub fn flat_map(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let mut mapped = Vec::new();
        for_each_element(interp, &this, args, "flatMap", |_, result| {
            mapped.push(result);
            true
        })?;
        let mut out = Vec::new();
        if !flatten_into(&mut out, mapped, 1.0) {
            return Err(interp.invalid_array_length());
        }
        Ok(Value::Object(interp.realm.new_array(out)))
    }

    /// Array.prototype.fill(value, start, end)
    pub fn fill(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let array = this_array(interp, &this, "fill")?;
        let len = array.array_elements().len();
        let start = relative_index(interp, &arg(args, 1), len, 0)?;
        let end = relative_index(interp, &arg(args, 2), len, len)?;
        let value = arg(args, 0);
        mutate(interp, &array, |elements| {
            for slot in elements.iter_mut().take(end).skip(start) {
                *slot = value.clone();
            }
        })?;
        Ok(this)
    }

    /// Array.prototype.at(index)
    pub fn at(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let elements = this_elements(interp, &this, "at")?;
        let index = to_integer(interp, &arg(args, 0))?;
        let index = if index < 0.0 { elements.len() as f64 + index } else { index };
        if index < 0.0 {
            return Ok(Value::Undefined);
        }
        Ok(elements.get(index as usize).cloned().unwrap_or(Value::Undefined))
    }

    /// Array.prototype.keys(), materialized as an array
    pub fn keys(interp: &mut Interpreter, this: Value, _args: &[Value]) -> JsResult {
        let elements = this_elements(interp, &this, "keys")?;
        let keys = (0..elements.len()).map(|i| Value::Number(i as f64)).collect();
        Ok(Value::Object(interp.realm.new_array(keys)))
    }

    /// Array.prototype.entries(), materialized as an array of pairs
    pub fn entries(interp: &mut Interpreter, this: Value, _args: &[Value]) -> JsResult {
        let elements = this_elements(interp, &this, "entries")?;
        let entries = elements
            .into_iter()
            .enumerate()
            .map(|(i, value)| Value::Object(interp.realm.new_array(vec![Value::Number(i as f64), value])))
            .collect();
        Ok(Value::Object(interp.realm.new_array(entries)))
    }
}

fn this_array(interp: &Interpreter, this: &Value, method: &str) -> Result<ObjectRef, Control> {
    match this {
        Value::Object(object) if object.is_array() => Ok(object.clone()),
        _ => Err(interp.type_error(format!("Array.prototype.{} called on non-array", method))),
    }
}

fn this_elements(interp: &Interpreter, this: &Value, method: &str) -> Result<Vec<Value>, Control> {
    Ok(this_array(interp, this, method)?.array_elements())
}

/// Run `f` against the element vector; frozen arrays reject the write
fn mutate<R>(interp: &Interpreter, array: &ObjectRef, f: impl FnOnce(&mut Vec<Value>) -> R) -> Result<R, Control> {
    let mut object = array.borrow_mut();
    if object.frozen {
        drop(object);
        return Err(interp.type_error("Cannot modify a frozen array"));
    }
    match &mut object.kind {
        ObjectKind::Array(elements) => Ok(f(elements)),
        _ => Err(interp.type_error("Array method called on non-array")),
    }
}

/// Call the callback for each element of a snapshot; `visit` returns false to stop
fn for_each_element(
    interp: &mut Interpreter,
    this: &Value,
    args: &[Value],
    method: &str,
    mut visit: impl FnMut(&Value, Value) -> bool,
) -> Result<(), Control> {
    let elements = this_elements(interp, this, method)?;
    let callback = callback_arg(interp, args, 0)?;
    let this_arg = arg(args, 1);
    for (index, element) in elements.iter().enumerate() {
        let result = interp.call(
            &callback,
            this_arg.clone(),
            &[element.clone(), Value::Number(index as f64), this.clone()],
        )?;
        if !visit(element, result) {
            break;
        }
    }
    Ok(())
}

fn search(
    interp: &mut Interpreter,
    this: &Value,
    args: &[Value],
    method: &str,
    from_end: bool,
) -> Result<Option<(usize, Value)>, Control> {
    let elements = this_elements(interp, this, method)?;
    let predicate = callback_arg(interp, args, 0)?;
    let mut order: Vec<usize> = (0..elements.len()).collect();
    if from_end {
        order.reverse();
    }
    for index in order {
        let element = elements[index].clone();
        let hit = interp.call(
            &predicate,
            arg(args, 1),
            &[element.clone(), Value::Number(index as f64), this.clone()],
        )?;
        if hit.to_boolean() {
            return Ok(Some((index, element)));
        }
    }
    Ok(None)
}

fn fold(interp: &mut Interpreter, this: &Value, args: &[Value], items: Vec<(usize, Value)>) -> JsResult {
    let callback = callback_arg(interp, args, 0)?;
    let mut items = items.into_iter();
    let mut accumulator = match args.get(1) {
        Some(initial) => initial.clone(),
        None => match items.next() {
            Some((_, first)) => first,
            None => return Err(interp.type_error("Reduce of empty array with no initial value")),
        },
    };
    for (index, element) in items {
        accumulator = interp.call(
            &callback,
            Value::Undefined,
            &[accumulator, element, Value::Number(index as f64), this.clone()],
        )?;
    }
    Ok(accumulator)
}

/// Deepest `flat()` recursion; self-containing arrays stop here
const MAX_FLAT_DEPTH: f64 = 1024.0;

/// Append `elements` flattened to `depth`; false once the result is too long
fn flatten_into(out: &mut Vec<Value>, elements: Vec<Value>, depth: f64) -> bool {
    for element in elements {
        match &element {
            Value::Object(object) if object.is_array() && depth >= 1.0 => {
                if !flatten_into(out, object.array_elements(), depth - 1.0) {
                    return false;
                }
            }
            _ if out.len() >= MAX_ARRAY_LENGTH => return false,
            _ => out.push(element),
        }
    }
    true
}

/// Stable merge sort whose comparator may throw
fn merge_sort(interp: &mut Interpreter, items: Vec<Value>, comparator: &Value) -> Result<Vec<Value>, Control> {
    if items.len() <= 1 {
        return Ok(items);
    }
    let mut right = items;
    let left = right.drain(..right.len() / 2).collect();
    let left = merge_sort(interp, left, comparator)?;
    let right = merge_sort(interp, right, comparator)?;

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    while let (Some(a), Some(b)) = (left.peek(), right.peek()) {
        if compare(interp, a, b, comparator)? == Ordering::Greater {
            merged.extend(right.next());
        } else {
            merged.extend(left.next());
        }
    }
    merged.extend(left);
    merged.extend(right);
    Ok(merged)
}

fn compare(interp: &mut Interpreter, a: &Value, b: &Value, comparator: &Value) -> Result<Ordering, Control> {
    if comparator.is_undefined() {
        let a = interp.to_string(a)?;
        let b = interp.to_string(b)?;
        return Ok(a.encode_utf16().cmp(b.encode_utf16()));
    }
    let result = interp.call(comparator, Value::Undefined, &[a.clone(), b.clone()])?;
    let n = interp.to_number(&result)?;
    Ok(if n > 0.0 {
        Ordering::Greater
    } else if n < 0.0 {
        Ordering::Less
    } else {
        Ordering::Equal
    })
}
