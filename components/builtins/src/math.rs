//! Math object methods

use std::cell::Cell;
use std::f64::consts;
use std::time::{SystemTime, UNIX_EPOCH};

use interpreter::{Interpreter, Property, Value};

use crate::value::{arg, define_method, define_namespace, Builtin, JsResult};

thread_local! {
    static RANDOM_STATE: Cell<u64> = Cell::new(seed());
}

fn seed() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0x9e37_79b9_7f4a_7c15);
    nanos | 1
}

/// Math object with static methods
pub struct MathObject;

impl MathObject {
    /// Install the global `Math` namespace
    pub fn install(interp: &mut Interpreter) {
        let math = define_namespace(interp, "Math");
        let constants = [
            ("PI", consts::PI),
            ("E", consts::E),
            ("LN2", consts::LN_2),
            ("LN10", consts::LN_10),
            ("LOG2E", consts::LOG2_E),
            ("LOG10E", consts::LOG10_E),
            ("SQRT2", consts::SQRT_2),
            ("SQRT1_2", consts::FRAC_1_SQRT_2),
        ];
        for (name, value) in constants {
            math.define(
                name,
                Property {
                    value: Value::Number(value),
                    writable: false,
                    enumerable: false,
                },
            );
        }

        let functions: &[(&str, Builtin)] = &[
            ("abs", |i: &mut Interpreter, _: Value, a: &[Value]| unary(i, a, f64::abs)),
            ("floor", |i: &mut Interpreter, _: Value, a: &[Value]| unary(i, a, f64::floor)),
            ("ceil", |i: &mut Interpreter, _: Value, a: &[Value]| unary(i, a, f64::ceil)),
            ("round", |i: &mut Interpreter, _: Value, a: &[Value]| unary(i, a, Self::round)),
            ("trunc", |i: &mut Interpreter, _: Value, a: &[Value]| unary(i, a, f64::trunc)),
            ("sign", |i: &mut Interpreter, _: Value, a: &[Value]| unary(i, a, Self::sign)),
            ("sqrt", |i: &mut Interpreter, _: Value, a: &[Value]| unary(i, a, f64::sqrt)),
            ("cbrt", |i: &mut Interpreter, _: Value, a: &[Value]| unary(i, a, f64::cbrt)),
            ("exp", |i: &mut Interpreter, _: Value, a: &[Value]| unary(i, a, f64::exp)),
            ("log", |i: &mut Interpreter, _: Value, a: &[Value]| unary(i, a, f64::ln)),
            ("log2", |i: &mut Interpreter, _: Value, a: &[Value]| unary(i, a, f64::log2)),
            ("log10", |i: &mut Interpreter, _: Value, a: &[Value]| unary(i, a, f64::log10)),
            ("sin", |i: &mut Interpreter, _: Value, a: &[Value]| unary(i, a, f64::sin)),
            ("cos", |i: &mut Interpreter, _: Value, a: &[Value]| unary(i, a, f64::cos)),
            ("tan", |i: &mut Interpreter, _: Value, a: &[Value]| unary(i, a, f64::tan)),
            ("atan", |i: &mut Interpreter, _: Value, a: &[Value]| unary(i, a, f64::atan)),
        ];
        for (name, func) in functions {
            define_method(interp, &math, name, 1, *func);
        }
        define_method(interp, &math, "atan2", 2, Self::atan2);
        define_method(interp, &math, "pow", 2, Self::pow);
        define_method(interp, &math, "max", 2, Self::max);
        define_method(interp, &math, "min", 2, Self::min);
        define_method(interp, &math, "hypot", 2, Self::hypot);
        define_method(interp, &math, "random", 0, Self::random);
    }

    /// Math.round(x): halves round towards positive infinity
    pub fn round(x: f64) -> f64 {
        if !x.is_finite() || x == 0.0 {
            return x;
        }
        let rounded = (x + 0.5).floor();
        if rounded == 0.0 && x < 0.0 {
            -0.0
        } else {
            rounded
        }
    }

    /// Math.sign(x)
    pub fn sign(x: f64) -> f64 {
        if x.is_nan() || x == 0.0 {
            x
        } else {
            x.signum()
        }
    }

    /// Math.pow(base, exponent)
    pub fn pow(interp: &mut Interpreter, _this: Value, args: &[Value]) -> JsResult {
        let base = interp.to_number(&arg(args, 0))?;
        let exponent = interp.to_number(&arg(args, 1))?;
        let result = if exponent.is_nan() || (base.abs() == 1.0 && exponent.is_infinite()) {
            f64::NAN
        } else {
            base.powf(exponent)
        };
        Ok(Value::Number(result))
    }

    /// Math.atan2(y, x)
    pub fn atan2(interp: &mut Interpreter, _this: Value, args: &[Value]) -> JsResult {
        let y = interp.to_number(&arg(args, 0))?;
        let x = interp.to_number(&arg(args, 1))?;
        Ok(Value::Number(y.atan2(x)))
    }

    /// Math.max(...values)
    pub fn max(interp: &mut Interpreter, _this: Value, args: &[Value]) -> JsResult {
        let mut result = f64::NEG_INFINITY;
        for value in numbers(interp, args)? {
            if value.is_nan() {
                return Ok(Value::Number(f64::NAN));
            }
            if value > result || (value == 0.0 && result == 0.0 && result.is_sign_negative()) {
                result = value;
            }
        }
        Ok(Value::Number(result))
    }

    /// Math.min(...values)
    pub fn min(interp: &mut Interpreter, _this: Value, args: &[Value]) -> JsResult {
        let mut result = f64::INFINITY;
        for value in numbers(interp, args)? {
            if value.is_nan() {
                return Ok(Value::Number(f64::NAN));
            }
            if value < result || (value == 0.0 && result == 0.0 && value.is_sign_negative()) {
                result = value;
            }
        }
        Ok(Value::Number(result))
    }

    /// Math.hypot(...values)
    pub fn hypot(interp: &mut Interpreter, _this: Value, args: &[Value]) -> JsResult {
        let sum: f64 = numbers(interp, args)?.iter().map(|v| v * v).sum();
        Ok(Value::Number(sum.sqrt()))
    }

    /// Math.random(): xorshift64* over a per-thread state
    pub fn random(_interp: &mut Interpreter, _this: Value, _args: &[Value]) -> JsResult {
        let bits = RANDOM_STATE.with(|state| {
            let mut x = state.get();
            x ^= x >> 12;
            x ^= x << 25;
            x ^= x >> 27;
            state.set(x);
            x.wrapping_mul(0x2545_f491_4f6c_dd1d)
        });
        Ok(Value::Number((bits >> 11) as f64 / (1u64 << 53) as f64))
    }
}

fn unary(interp: &mut Interpreter, args: &[Value], f: fn(f64) -> f64) -> JsResult {
    let x = interp.to_number(&arg(args, 0))?;
    Ok(Value::Number(f(x)))
}

fn numbers(interp: &mut Interpreter, args: &[Value]) -> Result<Vec<f64>, interpreter::Control> {
    args.iter().map(|value| interp.to_number(value)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(source: &str) -> f64 {
        let mut interp = Interpreter::new();
        crate::install(&mut interp);
        interp.eval_source(source).unwrap().as_number().unwrap()
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(MathObject::round(2.5), 3.0);
        assert_eq!(MathObject::round(-2.5), -2.0);
        assert_eq!(MathObject::round(-0.4), -0.0);
        assert!(MathObject::round(-0.4).is_sign_negative());
    }

    #[test]
    fn test_min_max() {
        assert_eq!(eval("Math.max(1, 5, 3)"), 5.0);
        assert_eq!(eval("Math.min(4, -2, 8)"), -2.0);
        assert_eq!(eval("Math.max()"), f64::NEG_INFINITY);
        assert!(eval("Math.max(1, NaN)").is_nan());
    }

    #[test]
    fn test_misc() {
        assert_eq!(eval("Math.abs(-3) + Math.floor(2.7) + Math.ceil(0.2)"), 6.0);
        assert_eq!(eval("Math.pow(2, 10)"), 1024.0);
        assert_eq!(eval("Math.sqrt(16)"), 4.0);
        assert_eq!(eval("Math.trunc(-4.7)"), -4.0);
        assert_eq!(eval("Math.sign(-3)"), -1.0);
        assert_eq!(eval("Math.hypot(3, 4)"), 5.0);
        assert!((eval("Math.PI") - consts::PI).abs() < f64::EPSILON);
    }

    #[test]
    fn test_random_range() {
        for _ in 0..100 {
            let r = eval("Math.random()");
            assert!((0.0..1.0).contains(&r));
        }
    }
}
