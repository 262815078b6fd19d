//! JavaScript values and the coercions that need no interpreter state

use std::fmt;
use std::rc::Rc;

use crate::object::ObjectRef;

/// A JavaScript value
///
/// Primitives are stored inline; objects are shared handles compared by identity.
#[derive(Clone, PartialEq)]
pub enum Value {
    /// undefined
    Undefined,
    /// null
    Null,
    /// Boolean value
    Boolean(bool),
    /// Number (IEEE 754 double)
    Number(f64),
    /// Immutable string
    String(Rc<str>),
    /// Object, array, function, error or regexp
    Object(ObjectRef),
}

impl Value {
    /// Create a string value
    pub fn string(s: impl Into<Rc<str>>) -> Self {
        Value::String(s.into())
    }

    /// Create a number value
    pub fn number(n: f64) -> Self {
        Value::Number(n)
    }

    /// True for `undefined` and `null`
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// True for `undefined`
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// True for any object value
    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    /// True for function objects
    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Object(o) if o.is_callable())
    }

    /// Borrow the object handle, if this is an object
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Get the number, if this is a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Borrow the string, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// ToBoolean
    pub fn to_boolean(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Object(_) => true,
        }
    }

    /// The result of the `typeof` operator
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(o) if o.is_callable() => "function",
            Value::Object(_) => "object",
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", number_to_string(*n)),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Object(o) => write!(f, "{:?}", o),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s.into())
    }
}

impl From<ObjectRef> for Value {
    fn from(o: ObjectRef) -> Self {
        Value::Object(o)
    }
}

/// Strict equality (`===`)
pub fn strict_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Boolean(x), Value::Boolean(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Object(x), Value::Object(y)) => x.ptr_eq(y),
        _ => false,
    }
}

/// SameValue: like `===` but `NaN` equals `NaN` and `+0` differs from `-0`
pub fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if x.is_nan() && y.is_nan() {
                return true;
            }
            x == y && x.is_sign_negative() == y.is_sign_negative()
        }
        _ => strict_equals(a, b),
    }
}

/// SameValueZero: like SameValue but `+0` equals `-0`
pub fn same_value_zero(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => (x.is_nan() && y.is_nan()) || x == y,
        _ => strict_equals(a, b),
    }
}

/// Number::toString(10)
///
/// # Examples
///
/// ```
/// use interpreter::value::number_to_string;
///
/// assert_eq!(number_to_string(42.0), "42");
/// assert_eq!(number_to_string(0.1 + 0.2), "0.30000000000000004");
/// assert_eq!(number_to_string(1e21), "1e+21");
/// assert_eq!(number_to_string(-0.0), "0");
/// ```
pub fn number_to_string(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value < 0.0 {
        return format!("-{}", number_to_string(-value));
    }

    let mut buffer = ryu::Buffer::new();
    let (digits, point) = decompose(buffer.format_finite(value));
    let k = digits.len() as i32;
    let n = point;

    if k <= n && n <= 21 {
        let mut out = digits;
        out.extend(std::iter::repeat('0').take((n - k) as usize));
        out
    } else if 0 < n && n <= 21 {
        let (int_part, frac_part) = digits.split_at(n as usize);
        format!("{}.{}", int_part, frac_part)
    } else if -6 < n && n <= 0 {
        format!("0.{}{}", "0".repeat((-n) as usize), digits)
    } else {
        let exponent = n - 1;
        let sign = if exponent >= 0 { '+' } else { '-' };
        let (first, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{}e{}{}", first, sign, exponent.abs())
        } else {
            format!("{}.{}e{}{}", first, rest, sign, exponent.abs())
        }
    }
}

/// Split a formatted float into significant digits and decimal point position.
fn decompose(text: &str) -> (String, i32) {
    let (mantissa, exponent) = match text.find(['e', 'E']) {
        Some(i) => (&text[..i], text[i + 1..].parse::<i32>().unwrap_or(0)),
        None => (text, 0),
    };
    let (int_part, frac_part) = match mantissa.find('.') {
        Some(i) => (&mantissa[..i], &mantissa[i + 1..]),
        None => (mantissa, ""),
    };

    let all: String = int_part.chars().chain(frac_part.chars()).collect();
    let mut point = int_part.len() as i32 + exponent;

    let trimmed_start = all.trim_start_matches('0');
    point -= (all.len() - trimmed_start.len()) as i32;
    let digits = trimmed_start.trim_end_matches('0').to_string();

    (digits, point)
}

/// StringToNumber: whitespace-trimmed decimal, hex/octal/binary or Infinity; otherwise NaN
pub fn string_to_number(text: &str) -> f64 {
    let trimmed = text.trim_matches(|c: char| c.is_whitespace() || c == '\u{FEFF}');
    if trimmed.is_empty() {
        return 0.0;
    }

    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = trimmed.strip_prefix(prefix) {
            if digits.is_empty() {
                return f64::NAN;
            }
            let mut value = 0f64;
            for c in digits.chars() {
                match c.to_digit(radix) {
                    Some(d) => value = value * radix as f64 + d as f64,
                    None => return f64::NAN,
                }
            }
            return value;
        }
    }

    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }

    // Rust also accepts "inf"/"nan"; only allow decimal literal characters
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
    {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

/// ToInt32
pub fn to_int32(n: f64) -> i32 {
    to_uint32(n) as i32
}

/// ToUint32
pub fn to_uint32(n: f64) -> u32 {
    if !n.is_finite() || n == 0.0 {
        return 0;
    }
    let int = n.trunc();
    let modulo = int.rem_euclid(4294967296.0);
    modulo as u32
}

/// Canonical array index for a property key (`"0"`, `"17"`, not `"01"` or `"-1"`)
pub fn array_index(key: &str) -> Option<usize> {
    if key.is_empty() || key.len() > 10 || !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if key.len() > 1 && key.starts_with('0') {
        return None;
    }
    let index: u64 = key.parse().ok()?;
    if index >= u32::MAX as u64 {
        return None;
    }
    Some(index as usize)
}

/// Length of a string in UTF-16 code units, as JavaScript sees it
pub fn utf16_len(s: &str) -> usize {
    s.encode_utf16().count()
}

/// Longest string, in UTF-16 code units, the engine will build
pub const MAX_STRING_LENGTH: usize = (1 << 29) - 24;

/// Whether the concatenation of `parts` is longer than [`MAX_STRING_LENGTH`]
pub fn exceeds_string_limit(parts: &[&str]) -> bool {
    // A code unit takes at least one byte, so the byte count is an upper bound
    let bytes: usize = parts.iter().map(|part| part.len()).sum();
    bytes > MAX_STRING_LENGTH && parts.iter().map(|part| utf16_len(part)).sum::<usize>() > MAX_STRING_LENGTH
}
