//! Number and Boolean objects, their prototypes, and the numeric globals

use interpreter::value::number_to_string;
use interpreter::{Interpreter, Property, Value};

use core_types::ErrorKind;

use crate::value::{arg, define_constructor, define_method, to_integer, Builtin, JsResult};

/// Number object with static properties and methods
pub struct NumberObject;

impl NumberObject {
    /// Number.MAX_SAFE_INTEGER
    pub const MAX_SAFE_INTEGER: f64 = 9007199254740991.0;

    /// Number.MIN_SAFE_INTEGER
    pub const MIN_SAFE_INTEGER: f64 = -9007199254740991.0;

    /// Install `Number`, `Number.prototype` and the global numeric functions
    pub fn install(interp: &mut Interpreter) {
        let prototype = interp.realm.intrinsics().number_prototype.clone();
        let constructor = define_constructor(interp, "Number", 1, &prototype, Self::construct);

        let constants = [
            ("MAX_SAFE_INTEGER", Self::MAX_SAFE_INTEGER),
            ("MIN_SAFE_INTEGER", Self::MIN_SAFE_INTEGER),
            ("EPSILON", f64::EPSILON),
            ("MAX_VALUE", f64::MAX),
            ("MIN_VALUE", 5e-324),
            ("POSITIVE_INFINITY", f64::INFINITY),
            ("NEGATIVE_INFINITY", f64::NEG_INFINITY),
            ("NaN", f64::NAN),
        ];
        for (name, value) in constants {
            constructor.define(
                name,
                Property {
                    value: Value::Number(value),
                    writable: false,
                    enumerable: false,
                },
            );
        }

        let statics: &[(&str, usize, Builtin)] = &[
            ("isInteger", 1, Self::is_integer_native),
            ("isSafeInteger", 1, Self::is_safe_integer_native),
            ("isFinite", 1, Self::is_finite_native),
            ("isNaN", 1, Self::is_nan_native),
            ("parseFloat", 1, global_parse_float),
            ("parseInt", 2, global_parse_int),
        ];
        for (name, length, func) in statics {
            define_method(interp, &constructor, name, *length, *func);
        }

        let methods: &[(&str, usize, Builtin)] = &[
            ("toFixed", 1, NumberPrototype::to_fixed_native),
            ("toString", 1, NumberPrototype::to_string_native),
            ("toPrecision", 1, NumberPrototype::to_precision_native),
            ("valueOf", 0, NumberPrototype::value_of),
        ];
        for (name, length, func) in methods {
            define_method(interp, &prototype, name, *length, *func);
        }

        let globals: &[(&str, usize, Builtin)] = &[
            ("parseInt", 2, global_parse_int),
            ("parseFloat", 1, global_parse_float),
            ("isNaN", 1, global_is_nan),
            ("isFinite", 1, global_is_finite),
        ];
        for (name, length, func) in globals {
            let function = interp.realm.new_native_function(name, *length, std::rc::Rc::new(*func));
            interp.realm.global().define(name, Value::Object(function));
        }
    }

    /// Number(value)
    pub fn construct(interp: &mut Interpreter, _this: Value, args: &[Value]) -> JsResult {
        match args.first() {
            None => Ok(Value::Number(0.0)),
            Some(value) => Ok(Value::Number(interp.to_number(value)?)),
        }
    }

    /// Number.isInteger(value)
    pub fn is_integer(value: f64) -> bool {
        value.is_finite() && value.trunc() == value
    }

    /// Number.isSafeInteger(value)
    pub fn is_safe_integer(value: f64) -> bool {
        Self::is_integer(value) && value.abs() <= Self::MAX_SAFE_INTEGER
    }

    fn is_integer_native(_interp: &mut Interpreter, _this: Value, args: &[Value]) -> JsResult {
        Ok(Value::Boolean(arg(args, 0).as_number().map(Self::is_integer).unwrap_or(false)))
    }

    fn is_safe_integer_native(_interp: &mut Interpreter, _this: Value, args: &[Value]) -> JsResult {
        Ok(Value::Boolean(
            arg(args, 0).as_number().map(Self::is_safe_integer).unwrap_or(false),
        ))
    }

    fn is_finite_native(_interp: &mut Interpreter, _this: Value, args: &[Value]) -> JsResult {
        Ok(Value::Boolean(arg(args, 0).as_number().map(f64::is_finite).unwrap_or(false)))
    }

    fn is_nan_native(_interp: &mut Interpreter, _this: Value, args: &[Value]) -> JsResult {
        Ok(Value::Boolean(arg(args, 0).as_number().map(f64::is_nan).unwrap_or(false)))
    }

    /// parseInt(string, radix)
    pub fn parse_int(s: &str, radix: Option<u32>) -> f64 {
        let mut s = s.trim_start();
        let negative = s.starts_with('-');
        if negative || s.starts_with('+') {
            s = &s[1..];
        }

        let mut radix = radix.unwrap_or(0);
        let has_hex_prefix = s.starts_with("0x") || s.starts_with("0X");
        if (radix == 0 || radix == 16) && has_hex_prefix {
            s = &s[2..];
            radix = 16;
        }
        if radix == 0 {
            radix = 10;
        }
        if !(2..=36).contains(&radix) {
            return f64::NAN;
        }

        let mut value = 0.0;
        let mut found_digit = false;
        for digit in s.chars().map_while(|c| c.to_digit(radix)) {
            value = value * radix as f64 + digit as f64;
            found_digit = true;
        }
        match (found_digit, negative) {
            (false, _) => f64::NAN,
            (true, true) => -value,
            (true, false) => value,
        }
    }

    /// parseFloat(string): the longest decimal-literal prefix
    pub fn parse_float(s: &str) -> f64 {
        let s = s.trim_start();
        let unsigned = s.trim_start_matches(['+', '-']);
        if unsigned.starts_with("Infinity") && s.len() - unsigned.len() <= 1 {
            return if s.starts_with('-') { f64::NEG_INFINITY } else { f64::INFINITY };
        }

        let bytes = s.as_bytes();
        let mut end = 0;
        if matches!(bytes.first(), Some(b'+' | b'-')) {
            end = 1;
        }
        let digits_start = end;
        while bytes.get(end).is_some_and(u8::is_ascii_digit) {
            end += 1;
        }
        if bytes.get(end) == Some(&b'.') {
            end += 1;
            while bytes.get(end).is_some_and(u8::is_ascii_digit) {
                end += 1;
            }
        }
        if end == digits_start || &s[digits_start..end] == "." {
            return f64::NAN;
        }
        if matches!(bytes.get(end), Some(b'e' | b'E')) {
            let mut exponent_end = end + 1;
            if matches!(bytes.get(exponent_end), Some(b'+' | b'-')) {
                exponent_end += 1;
            }
            let exponent_digits = exponent_end;
            while bytes.get(exponent_end).is_some_and(u8::is_ascii_digit) {
                exponent_end += 1;
            }
            if exponent_end > exponent_digits {
                end = exponent_end;
            }
        }
        s[..end].parse::<f64>().unwrap_or(f64::NAN)
    }
}

fn global_parse_int(interp: &mut Interpreter, _this: Value, args: &[Value]) -> JsResult {
    let text = interp.to_string(&arg(args, 0))?;
    let radix = match args.get(1) {
        None | Some(Value::Undefined) => None,
        Some(value) => Some(interpreter::value::to_int32(interp.to_number(value)?) as u32),
    };
    Ok(Value::Number(NumberObject::parse_int(&text, radix)))
}

fn global_parse_float(interp: &mut Interpreter, _this: Value, args: &[Value]) -> JsResult {
    let text = interp.to_string(&arg(args, 0))?;
    Ok(Value::Number(NumberObject::parse_float(&text)))
}

/// Global isNaN (coerces to number first, unlike Number.isNaN)
fn global_is_nan(interp: &mut Interpreter, _this: Value, args: &[Value]) -> JsResult {
    Ok(Value::Boolean(interp.to_number(&arg(args, 0))?.is_nan()))
}

/// Global isFinite (coerces to number first, unlike Number.isFinite)
fn global_is_finite(interp: &mut Interpreter, _this: Value, args: &[Value]) -> JsResult {
    Ok(Value::Boolean(interp.to_number(&arg(args, 0))?.is_finite()))
}

/// Number.prototype methods
pub struct NumberPrototype;

impl NumberPrototype {
    /// Number.prototype.toString(radix)
    pub fn to_string(num: f64, radix: u32) -> String {
        if radix == 10 || !num.is_finite() {
            return number_to_string(num);
        }

        let digits = b"0123456789abcdefghijklmnopqrstuvwxyz";
        let negative = num < 0.0;
        let num = num.abs();
        let mut integer = num.trunc();
        let mut fraction = num - integer;

        let mut integer_digits = Vec::new();
        loop {
            let digit = (integer % radix as f64) as usize;
            integer_digits.push(digits[digit]);
            integer = (integer / radix as f64).trunc();
            if integer < 1.0 {
                break;
            }
        }
        integer_digits.reverse();

        let mut result = String::new();
        if negative {
            result.push('-');
        }
        result.push_str(&String::from_utf8_lossy(&integer_digits));
        if fraction > 0.0 {
            result.push('.');
            for _ in 0..20 {
                fraction *= radix as f64;
                let digit = fraction.trunc() as usize;
                result.push(digits[digit] as char);
                fraction -= digit as f64;
                if fraction <= 0.0 {
                    break;
                }
            }
        }
        result
    }

    /// Number.prototype.toFixed(digits)
    pub fn to_fixed(num: f64, digits: usize) -> String {
        if !num.is_finite() || num.abs() >= 1e21 {
            return number_to_string(num);
        }
        let num = if num == 0.0 { 0.0 } else { num };
        format!("{:.*}", digits, num)
    }

    /// Number.prototype.toPrecision(precision)
    pub fn to_precision(num: f64, precision: usize) -> String {
        if !num.is_finite() {
            return number_to_string(num);
        }
        if num == 0.0 {
            return Self::to_fixed(0.0, precision - 1);
        }
        let exponent = num.abs().log10().floor() as i32;
        if exponent < -6 || exponent >= precision as i32 {
            let formatted = format!("{:.*e}", precision - 1, num);
            return match formatted.split_once('e') {
                Some((mantissa, exp)) if exp.starts_with('-') => format!("{}e{}", mantissa, exp),
                Some((mantissa, exp)) => format!("{}e+{}", mantissa, exp),
                None => formatted,
            };
        }
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        Self::to_fixed(num, decimals)
    }

    fn to_fixed_native(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let num = this_number(interp, &this, "toFixed")?;
        let digits = to_integer(interp, &arg(args, 0))?;
        if !(0.0..=100.0).contains(&digits) {
            return Err(interp.throw_error(ErrorKind::RangeError, "toFixed() digits argument must be between 0 and 100"));
        }
        Ok(Value::from(Self::to_fixed(num, digits as usize)))
    }

    fn to_string_native(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let num = this_number(interp, &this, "toString")?;
        let radix = match args.first() {
            None | Some(Value::Undefined) => 10.0,
            Some(value) => to_integer(interp, value)?,
        };
        if !(2.0..=36.0).contains(&radix) {
            return Err(interp.throw_error(ErrorKind::RangeError, "toString() radix must be between 2 and 36"));
        }
        Ok(Value::from(Self::to_string(num, radix as u32)))
    }

    fn to_precision_native(interp: &mut Interpreter, this: Value, args: &[Value]) -> JsResult {
        let num = this_number(interp, &this, "toPrecision")?;
        if arg(args, 0).is_undefined() {
            return Ok(Value::from(number_to_string(num)));
        }
        let precision = to_integer(interp, &arg(args, 0))?;
        if !(1.0..=100.0).contains(&precision) {
            return Err(interp.throw_error(ErrorKind::RangeError, "toPrecision() argument must be between 1 and 100"));
        }
        Ok(Value::from(Self::to_precision(num, precision as usize)))
    }

    /// Number.prototype.valueOf()
    pub fn value_of(interp: &mut Interpreter, this: Value, _args: &[Value]) -> JsResult {
        Ok(Value::Number(this_number(interp, &this, "valueOf")?))
    }
}

fn this_number(interp: &Interpreter, this: &Value, method: &str) -> Result<f64, interpreter::Control> {
    this.as_number().ok_or_else(|| {
        interp.type_error(format!(
            "Number.prototype.{} requires that 'this' be a Number",
            method
        ))
    })
}

/// Boolean constructor and prototype methods
pub struct BooleanObject;

impl BooleanObject {
    /// Install `Boolean` and `Boolean.prototype`
    pub fn install(interp: &mut Interpreter) {
        let prototype = interp.realm.intrinsics().boolean_prototype.clone();
        define_constructor(interp, "Boolean", 1, &prototype, Self::construct);
        define_method(interp, &prototype, "toString", 0, Self::to_string);
        define_method(interp, &prototype, "valueOf", 0, Self::value_of);
    }

    /// Boolean(value)
    pub fn construct(_interp: &mut Interpreter, _this: Value, args: &[Value]) -> JsResult {
        Ok(Value::Boolean(arg(args, 0).to_boolean()))
    }

    /// Boolean.prototype.toString()
    pub fn to_string(interp: &mut Interpreter, this: Value, _args: &[Value]) -> JsResult {
        match this {
            Value::Boolean(b) => Ok(Value::from(b.to_string())),
            _ => Err(interp.type_error("Boolean.prototype.toString requires that 'this' be a Boolean")),
        }
    }

    /// Boolean.prototype.valueOf()
    pub fn value_of(interp: &mut Interpreter, this: Value, _args: &[Value]) -> JsResult {
        match this {
            Value::Boolean(_) => Ok(this),
            _ => Err(interp.type_error("Boolean.prototype.valueOf requires that 'this' be a Boolean")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(source: &str) -> String {
        let mut interp = Interpreter::new();
        crate::install(&mut interp);
        let value = interp.eval_source(source).unwrap();
        crate::display(&value)
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(NumberObject::parse_int("42px", None), 42.0);
        assert_eq!(NumberObject::parse_int("  -0x1F", None), -31.0);
        assert_eq!(NumberObject::parse_int("101", Some(2)), 5.0);
        assert!(NumberObject::parse_int("abc", None).is_nan());
        assert!(NumberObject::parse_int("1", Some(1)).is_nan());
    }

    #[test]
    fn test_parse_float() {
        assert_eq!(NumberObject::parse_float("3.14abc"), 3.14);
        assert_eq!(NumberObject::parse_float(" -2.5e3x"), -2500.0);
        assert_eq!(NumberObject::parse_float("1e"), 1.0);
        assert_eq!(NumberObject::parse_float("-Infinity"), f64::NEG_INFINITY);
        assert!(NumberObject::parse_float(".").is_nan());
        assert!(NumberObject::parse_float("x1").is_nan());
    }

    #[test]
    fn test_to_fixed() {
        assert_eq!(NumberPrototype::to_fixed(3.14159, 2), "3.14");
        assert_eq!(NumberPrototype::to_fixed(-0.0, 2), "0.00");
        assert_eq!(NumberPrototype::to_fixed(-0.0001, 2), "-0.00");
        assert_eq!(NumberPrototype::to_fixed(2.0, 0), "2");
        assert_eq!(eval("(1.5).toFixed(3)"), "1.500");
    }

    #[test]
    fn test_to_string_radix() {
        assert_eq!(NumberPrototype::to_string(255.0, 16), "ff");
        assert_eq!(NumberPrototype::to_string(-5.0, 2), "-101");
        assert_eq!(NumberPrototype::to_string(0.5, 2), "0.1");
        assert_eq!(eval("(10).toString(36)"), "a");
    }

    #[test]
    fn test_to_precision() {
        assert_eq!(NumberPrototype::to_precision(123.456, 4), "123.5");
        assert_eq!(NumberPrototype::to_precision(0.000123, 2), "0.00012");
        assert_eq!(NumberPrototype::to_precision(123456.0, 2), "1.2e+5");
    }

    #[test]
    fn test_statics_and_globals() {
        assert_eq!(eval("Number.isInteger(5) && !Number.isInteger('5')"), "true");
        assert_eq!(eval("isNaN('abc') && !Number.isNaN('abc')"), "true");
        assert_eq!(eval("Number('  12 ') * 2 + Number.MAX_SAFE_INTEGER % 10"), "25");
        assert_eq!(eval("parseInt('08') + parseFloat('1.5')"), "9.5");
        assert_eq!(eval("Boolean('') || String(Boolean(1))"), "true");
    }
}
