//! Developer-console rendering of values
//!
//! Produces the compact single-line form a console shows: strings quoted
//! inside containers, `[ 1, 2 ]`, `{ a: 1 }`, `[Function: name]`.

use interpreter::object::ObjectKind;
use interpreter::value::number_to_string;
use interpreter::{ObjectRef, Value};

const MAX_DEPTH: usize = 2;

/// Render a value as a console would print it nested inside a container
///
/// # Examples
///
/// ```
/// use builtins::inspect;
/// use interpreter::Value;
///
/// assert_eq!(inspect(&Value::from("hi")), "'hi'");
/// assert_eq!(inspect(&Value::Number(-0.0)), "-0");
/// ```
pub fn inspect(value: &Value) -> String {
    let mut seen = Vec::new();
    format_value(value, 0, &mut seen)
}

/// Render a value as a top-level console argument: strings are printed raw
pub fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.to_string(),
        other => inspect(other),
    }
}

fn format_value(value: &Value, depth: usize, seen: &mut Vec<usize>) -> String {
    match value {
        Value::Undefined => "undefined".to_string(),
        Value::Null => "null".to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Number(n) if *n == 0.0 && n.is_sign_negative() => "-0".to_string(),
        Value::Number(n) => number_to_string(*n),
        Value::String(s) => quote(s),
        Value::Object(object) => format_object(object, depth, seen),
    }
}

fn format_object(object: &ObjectRef, depth: usize, seen: &mut Vec<usize>) -> String {
    if object.is_callable() {
        return match object.get("name") {
            Value::String(name) if !name.is_empty() => format!("[Function: {}]", name),
            _ => "[Function (anonymous)]".to_string(),
        };
    }
    if let ObjectKind::RegExp(data) = &object.borrow().kind {
        return format!("/{}/{}", data.source, data.flags);
    }
    if object.is_error() {
        let text = error_summary(object);
        return if depth == 0 { text } else { format!("[{}]", text) };
    }

    if seen.contains(&object.id()) {
        return "[Circular]".to_string();
    }
    if depth > MAX_DEPTH {
        return if object.is_array() { "[Array]" } else { "[Object]" }.to_string();
    }

    seen.push(object.id());
    let text = if object.is_array() {
        let mut parts: Vec<String> = object
            .array_elements()
            .iter()
            .map(|element| format_value(element, depth + 1, seen))
            .collect();
        parts.extend(own_entries(object, true, depth, seen));
        if parts.is_empty() {
            "[]".to_string()
        } else {
            format!("[ {} ]", parts.join(", "))
        }
    } else {
        let parts = own_entries(object, false, depth, seen);
        let prefix = constructor_prefix(object);
        match (parts.is_empty(), prefix) {
            (true, Some(prefix)) => format!("{} {{}}", prefix),
            (true, None) => "{}".to_string(),
            (false, Some(prefix)) => format!("{} {{ {} }}", prefix, parts.join(", ")),
            (false, None) => format!("{{ {} }}", parts.join(", ")),
        }
    };
    seen.pop();
    text
}

/// `key: value` pairs for own enumerable properties (non-index keys only for arrays)
fn own_entries(object: &ObjectRef, skip_indices: bool, depth: usize, seen: &mut Vec<usize>) -> Vec<String> {
    let array_len = if skip_indices { object.array_elements().len() } else { 0 };
    object
        .own_keys()
        .into_iter()
        .skip(array_len)
        .map(|key| {
            let value = object.get(&key);
            format!("{}: {}", format_key(&key), format_value(&value, depth + 1, seen))
        })
        .collect()
}

fn format_key(key: &str) -> String {
    let mut chars = key.chars();
    let identifier = match chars.next() {
        Some(first) => {
            (first.is_alphabetic() || first == '_' || first == '$')
                && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        }
        None => false,
    };
    if identifier {
        key.to_string()
    } else {
        quote(key)
    }
}

/// Constructor name for objects whose prototype is not `Object.prototype`
fn constructor_prefix(object: &ObjectRef) -> Option<String> {
    let prototype = object.prototype()?;
    match prototype.get("constructor") {
        Value::Object(constructor) => match constructor.get("name") {
            Value::String(name) if !name.is_empty() && &*name != "Object" => Some(name.to_string()),
            _ => None,
        },
        _ => None,
    }
}

/// `Name: message` for an error object
pub fn error_summary(error: &ObjectRef) -> String {
    let name = match error.get("name") {
        Value::String(name) => name.to_string(),
        _ => "Error".to_string(),
    };
    match error.get("message") {
        Value::String(message) if !message.is_empty() => format!("{}: {}", name, message),
        _ => name,
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}
