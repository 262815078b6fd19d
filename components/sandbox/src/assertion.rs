//! `expect(value)` and its matchers
//!
//! Every matcher either returns `undefined` or throws an `AssertionError`
//! whose host payload is an [`AssertionFailure`], which is how the harness
//! tells a failed expectation apart from any other exception.

use std::fmt;
use std::rc::Rc;

use builtins::value::arg;
use builtins::{describe_thrown, inspect, JsResult};
use interpreter::value::{number_to_string, same_value, same_value_zero, utf16_len};
use interpreter::{Control, Interpreter, NativeFn, ObjectRef, Value};
use serde::Serialize;

/// Details of a failed expectation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssertionFailure {
    /// Matcher name, e.g. `toBe`
    pub matcher: String,
    /// Rendering of the received value
    pub actual: String,
    /// Rendering of what the matcher wanted
    pub expected: String,
    /// Full failure message
    pub message: String,
    /// Whether the matcher was reached through `.not`
    pub negated: bool,
}

impl fmt::Display for AssertionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Outcome of one matcher before `.not` is applied
struct Verdict {
    pass: bool,
    expected: String,
    received: Option<String>,
}

impl Verdict {
    fn new(pass: bool, expected: impl Into<String>) -> Self {
        Self {
            pass,
            expected: expected.into(),
            received: None,
        }
    }

    fn received(mut self, received: impl Into<String>) -> Self {
        self.received = Some(received.into());
        self
    }
}

type Matcher = fn(&mut Interpreter, &Value, &[Value]) -> Result<Verdict, Control>;

const MATCHERS: &[(&str, Matcher)] = &[
    ("toBe", to_be),
    ("toEqual", to_equal),
    ("toStrictEqual", to_strict_equal),
    ("toBeTruthy", to_be_truthy),
    ("toBeFalsy", to_be_falsy),
    ("toBeNull", to_be_null),
    ("toBeUndefined", to_be_undefined),
    ("toBeDefined", to_be_defined),
    ("toBeNaN", to_be_nan),
    ("toBeGreaterThan", to_be_greater_than),
    ("toBeGreaterThanOrEqual", to_be_greater_than_or_equal),
    ("toBeLessThan", to_be_less_than),
    ("toBeLessThanOrEqual", to_be_less_than_or_equal),
    ("toBeCloseTo", to_be_close_to),
    ("toContain", to_contain),
    ("toHaveLength", to_have_length),
    ("toHaveProperty", to_have_property),
    ("toMatch", to_match),
    ("toThrow", to_throw),
];

/// Bind the global `expect`
pub fn install(interp: &mut Interpreter) {
    let func: NativeFn = Rc::new(|interp: &mut Interpreter, _this: Value, args: &[Value]| -> JsResult {
        Ok(Value::Object(expect(interp, arg(args, 0))))
    });
    let expect = interp.realm.new_native_function("expect", 1, func);
    interp.realm.global().define("expect", Value::Object(expect));
}

/// Matcher object for `actual`, with the negated set under `.not`
pub fn expect(interp: &Interpreter, actual: Value) -> ObjectRef {
    let positive = matchers(interp, &actual, false);
    let negative = matchers(interp, &actual, true);
    positive.put_hidden("not", Value::Object(negative));
    positive
}

/// The failure payload of a thrown value, if it came from a matcher
pub fn assertion_failure(value: &Value) -> Option<AssertionFailure> {
    let payload = value.as_object()?.error_payload()?;
    (*payload).downcast_ref::<AssertionFailure>().cloned()
}

fn matchers(interp: &Interpreter, actual: &Value, negated: bool) -> ObjectRef {
    let object = interp.realm.new_object();
    for &(name, matcher) in MATCHERS {
        let actual = actual.clone();
        let func: NativeFn = Rc::new(move |interp: &mut Interpreter, _this: Value, args: &[Value]| -> JsResult {
            let verdict = matcher(interp, &actual, args)?;
            if verdict.pass != negated {
                Ok(Value::Undefined)
            } else {
                Err(failure(interp, name, &actual, args, verdict, negated))
            }
        });
        let function = interp.realm.new_native_function(name, 1, func);
        object.put_hidden(name, Value::Object(function));
    }
    object
}

fn failure(interp: &Interpreter, matcher: &str, actual: &Value, args: &[Value], verdict: Verdict, negated: bool) -> Control {
    let received = verdict.received.unwrap_or_else(|| inspect(actual));
    let message = format!(
        "expect(received).{}{}({}): expected {}{}, received {}",
        if negated { "not." } else { "" },
        matcher,
        if args.is_empty() { "" } else { "expected" },
        if negated { "not " } else { "" },
        verdict.expected,
        received,
    );
    let payload = AssertionFailure {
        matcher: matcher.to_string(),
        actual: received,
        expected: verdict.expected,
        message: message.clone(),
        negated,
    };
    let error = interp
        .realm
        .new_custom_error("AssertionError", &message, Some(Rc::new(payload)));
    Control::Throw(Value::Object(error))
}

fn usage_error(interp: &Interpreter, matcher: &str, problem: &str) -> Control {
    interp.type_error(format!("expect(received).{}(): {}", matcher, problem))
}

fn to_be(_interp: &mut Interpreter, actual: &Value, args: &[Value]) -> Result<Verdict, Control> {
    let expected = arg(args, 0);
    Ok(Verdict::new(same_value(actual, &expected), inspect(&expected)))
}

fn to_equal(_interp: &mut Interpreter, actual: &Value, args: &[Value]) -> Result<Verdict, Control> {
    let expected = arg(args, 0);
    Ok(Verdict::new(deep_equal(actual, &expected, false), inspect(&expected)))
}

fn to_strict_equal(_interp: &mut Interpreter, actual: &Value, args: &[Value]) -> Result<Verdict, Control> {
    let expected = arg(args, 0);
    Ok(Verdict::new(deep_equal(actual, &expected, true), inspect(&expected)))
}

fn to_be_truthy(_interp: &mut Interpreter, actual: &Value, _args: &[Value]) -> Result<Verdict, Control> {
    Ok(Verdict::new(actual.to_boolean(), "truthy"))
}

fn to_be_falsy(_interp: &mut Interpreter, actual: &Value, _args: &[Value]) -> Result<Verdict, Control> {
    Ok(Verdict::new(!actual.to_boolean(), "falsy"))
}

fn to_be_null(_interp: &mut Interpreter, actual: &Value, _args: &[Value]) -> Result<Verdict, Control> {
    Ok(Verdict::new(matches!(actual, Value::Null), "null"))
}

fn to_be_undefined(_interp: &mut Interpreter, actual: &Value, _args: &[Value]) -> Result<Verdict, Control> {
    Ok(Verdict::new(actual.is_undefined(), "undefined"))
}

fn to_be_defined(_interp: &mut Interpreter, actual: &Value, _args: &[Value]) -> Result<Verdict, Control> {
    Ok(Verdict::new(!actual.is_undefined(), "defined"))
}

fn to_be_nan(_interp: &mut Interpreter, actual: &Value, _args: &[Value]) -> Result<Verdict, Control> {
    Ok(Verdict::new(matches!(actual, Value::Number(n) if n.is_nan()), "NaN"))
}

fn numbers(interp: &Interpreter, matcher: &str, actual: &Value, args: &[Value]) -> Result<(f64, f64), Control> {
    let received = actual
        .as_number()
        .ok_or_else(|| usage_error(interp, matcher, "received value must be a number"))?;
    let expected = arg(args, 0)
        .as_number()
        .ok_or_else(|| usage_error(interp, matcher, "expected value must be a number"))?;
    Ok((received, expected))
}

fn comparison(
    interp: &Interpreter,
    matcher: &str,
    actual: &Value,
    args: &[Value],
    symbol: &str,
    holds: fn(f64, f64) -> bool,
) -> Result<Verdict, Control> {
    let (received, expected) = numbers(interp, matcher, actual, args)?;
    Ok(Verdict::new(
        holds(received, expected),
        format!("{} {}", symbol, number_to_string(expected)),
    ))
}

fn to_be_greater_than(interp: &mut Interpreter, actual: &Value, args: &[Value]) -> Result<Verdict, Control> {
    comparison(interp, "toBeGreaterThan", actual, args, ">", |a, b| a > b)
}

fn to_be_greater_than_or_equal(interp: &mut Interpreter, actual: &Value, args: &[Value]) -> Result<Verdict, Control> {
    comparison(interp, "toBeGreaterThanOrEqual", actual, args, ">=", |a, b| a >= b)
}

fn to_be_less_than(interp: &mut Interpreter, actual: &Value, args: &[Value]) -> Result<Verdict, Control> {
    comparison(interp, "toBeLessThan", actual, args, "<", |a, b| a < b)
}

fn to_be_less_than_or_equal(interp: &mut Interpreter, actual: &Value, args: &[Value]) -> Result<Verdict, Control> {
    comparison(interp, "toBeLessThanOrEqual", actual, args, "<=", |a, b| a <= b)
}

/// Widest `toBeCloseTo` precision, in decimal digits either side of the point
const MAX_CLOSE_TO_DIGITS: f64 = 20.0;

fn to_be_close_to(interp: &mut Interpreter, actual: &Value, args: &[Value]) -> Result<Verdict, Control> {
    let (received, expected) = numbers(interp, "toBeCloseTo", actual, args)?;
    let digits = match arg(args, 1) {
        Value::Undefined => 2,
        Value::Number(n) if n.abs() <= MAX_CLOSE_TO_DIGITS => n as i32,
        Value::Number(_) => {
            let problem = format!("precision must be between -{0} and {0}", MAX_CLOSE_TO_DIGITS);
            return Err(usage_error(interp, "toBeCloseTo", &problem));
        }
        _ => return Err(usage_error(interp, "toBeCloseTo", "precision must be a number")),
    };
    let pass = received == expected || (received - expected).abs() < 10f64.powi(-digits) / 2.0;
    Ok(Verdict::new(
        pass,
        format!("{} ({} digits)", number_to_string(expected), digits),
    ))
}

fn to_contain(interp: &mut Interpreter, actual: &Value, args: &[Value]) -> Result<Verdict, Control> {
    let expected = arg(args, 0);
    let pass = match actual {
        Value::String(haystack) => match &expected {
            Value::String(needle) => haystack.contains(&**needle),
            _ => return Err(usage_error(interp, "toContain", "expected value must be a string")),
        },
        Value::Object(list) if list.is_array() => list
            .array_elements()
            .iter()
            .any(|element| same_value_zero(element, &expected)),
        _ => return Err(usage_error(interp, "toContain", "received value must be an array or a string")),
    };
    Ok(Verdict::new(pass, inspect(&expected)))
}

fn to_have_length(interp: &mut Interpreter, actual: &Value, args: &[Value]) -> Result<Verdict, Control> {
    let length = match actual {
        Value::String(s) => utf16_len(s) as f64,
        Value::Object(object) => match object.get("length") {
            Value::Number(n) => n,
            _ => return Err(usage_error(interp, "toHaveLength", "received value must have a length property")),
        },
        _ => return Err(usage_error(interp, "toHaveLength", "received value must have a length property")),
    };
    let expected = arg(args, 0)
        .as_number()
        .ok_or_else(|| usage_error(interp, "toHaveLength", "expected value must be a number"))?;
    Ok(Verdict::new(length == expected, format!("length {}", number_to_string(expected)))
        .received(format!("length {}", number_to_string(length))))
}

fn to_have_property(interp: &mut Interpreter, actual: &Value, args: &[Value]) -> Result<Verdict, Control> {
    let path: Vec<String> = match arg(args, 0) {
        Value::String(path) => path.split('.').map(str::to_string).collect(),
        Value::Object(list) if list.is_array() => {
            let mut segments = Vec::new();
            for segment in list.array_elements() {
                segments.push(interp.to_string(&segment)?.to_string());
            }
            segments
        }
        _ => return Err(usage_error(interp, "toHaveProperty", "path must be a string or an array")),
    };

    let mut current = actual.clone();
    let mut found = true;
    for segment in &path {
        let exists = match &current {
            Value::Object(object) => object.has_property(segment),
            Value::Undefined | Value::Null => false,
            primitive => !interp.get(primitive, segment)?.is_undefined(),
        };
        if !exists {
            found = false;
            break;
        }
        current = interp.get(&current, segment)?;
    }

    let mut expected = format!("property '{}'", path.join("."));
    let mut pass = found;
    if args.len() > 1 {
        let value = arg(args, 1);
        expected = format!("{} = {}", expected, inspect(&value));
        pass = found && deep_equal(&current, &value, false);
    }
    Ok(Verdict::new(pass, expected))
}

fn to_match(interp: &mut Interpreter, actual: &Value, args: &[Value]) -> Result<Verdict, Control> {
    let text = match actual {
        Value::String(text) => text.clone(),
        _ => return Err(usage_error(interp, "toMatch", "received value must be a string")),
    };
    let expected = arg(args, 0);
    let pass = match &expected {
        Value::String(needle) => text.contains(&**needle),
        Value::Object(pattern) if pattern.is_regexp() => {
            pattern.set("lastIndex", Value::Number(0.0));
            interp.invoke(&expected, "test", &[Value::String(text)])?.to_boolean()
        }
        _ => return Err(usage_error(interp, "toMatch", "expected value must be a string or a regular expression")),
    };
    Ok(Verdict::new(pass, inspect(&expected)))
}

fn to_throw(interp: &mut Interpreter, actual: &Value, args: &[Value]) -> Result<Verdict, Control> {
    if !actual.is_callable() {
        return Err(usage_error(interp, "toThrow", "received value must be a function"));
    }
    let thrown = match interp.call(actual, Value::Undefined, &[]) {
        Ok(_) => None,
        Err(Control::Throw(value)) => Some(value),
        Err(halt) => return Err(halt),
    };

    let expected = arg(args, 0);
    let description = match &expected {
        Value::Undefined => "a thrown error".to_string(),
        Value::String(_) => format!("a message containing {}", inspect(&expected)),
        Value::Object(object) if object.is_regexp() => format!("a message matching {}", inspect(&expected)),
        Value::Object(object) if object.is_callable() => format!("an instance of {}", interp.describe(&expected)),
        Value::Object(object) if object.is_error() => format!("a message equal to {}", inspect(&object.get("message"))),
        _ => {
            return Err(usage_error(
                interp,
                "toThrow",
                "expected value must be a string, a regular expression, an error or a constructor",
            ))
        }
    };

    let Some(error) = thrown else {
        return Ok(Verdict::new(false, description).received("no error"));
    };
    let message = message_of(&error);
    let pass = match &expected {
        Value::Undefined => true,
        Value::String(needle) => message.contains(&**needle),
        Value::Object(object) if object.is_regexp() => {
            object.set("lastIndex", Value::Number(0.0));
            interp.invoke(&expected, "test", &[Value::from(message)])?.to_boolean()
        }
        Value::Object(object) if object.is_callable() => interp.instance_of(&error, &expected)?,
        Value::Object(object) => message == message_of(&Value::Object(object.clone())),
        _ => false,
    };
    Ok(Verdict::new(pass, description).received(describe_thrown(&error)))
}

fn message_of(value: &Value) -> String {
    match value {
        Value::Object(object) if object.is_error() => match object.get("message") {
            Value::String(message) => message.to_string(),
            _ => String::new(),
        },
        other => builtins::display(other),
    }
}

/// Structural equality used by `toEqual` (`strict == false`) and
/// `toStrictEqual` (`strict == true`)
///
/// Primitives compare with SameValue. The non-strict form ignores
/// properties whose value is `undefined`; the strict form also requires
/// matching prototypes.
pub fn deep_equal(a: &Value, b: &Value, strict: bool) -> bool {
    let mut visiting = Vec::new();
    equals(a, b, strict, &mut visiting)
}

fn equals(a: &Value, b: &Value, strict: bool, visiting: &mut Vec<(usize, usize)>) -> bool {
    let (x, y) = match (a, b) {
        (Value::Object(x), Value::Object(y)) => (x, y),
        _ => return same_value(a, b),
    };
    if x.ptr_eq(y) || visiting.contains(&(x.id(), y.id())) {
        return true;
    }
    if x.is_callable() || y.is_callable() || x.is_array() != y.is_array() {
        return false;
    }
    if strict && !same_prototype(x, y) {
        return false;
    }
    if x.is_regexp() || y.is_regexp() {
        return x.is_regexp() && y.is_regexp() && x.get("source") == y.get("source") && x.get("flags") == y.get("flags");
    }
    if x.is_error() || y.is_error() {
        return x.is_error() && y.is_error() && x.get("name") == y.get("name") && x.get("message") == y.get("message");
    }

    visiting.push((x.id(), y.id()));
    let result = if x.is_array() {
        let (left, right) = (x.array_elements(), y.array_elements());
        left.len() == right.len() && left.iter().zip(&right).all(|(l, r)| equals(l, r, strict, visiting))
    } else {
        let left = comparable_keys(x, strict);
        let right = comparable_keys(y, strict);
        left.len() == right.len()
            && left.iter().all(|key| {
                right.contains(key) && equals(&x.get(key), &y.get(key), strict, visiting)
            })
    };
    visiting.pop();
    result
}

fn comparable_keys(object: &ObjectRef, strict: bool) -> Vec<Rc<str>> {
    object
        .own_keys()
        .into_iter()
        .filter(|key| strict || !object.get(key).is_undefined())
        .collect()
}

fn same_prototype(x: &ObjectRef, y: &ObjectRef) -> bool {
    match (x.prototype(), y.prototype()) {
        (Some(p), Some(q)) => p.ptr_eq(&q),
        (None, None) => true,
        _ => false,
    }
}
