//! Arithmetic, comparison and bitwise operators

use std::cmp::Ordering;

use parser::ast::{BinaryOperator, UnaryOperator};

use crate::error::Control;
use crate::interpreter::{Hint, Interpreter};
use crate::value::{strict_equals, to_int32, to_uint32, Value};

impl Interpreter {
    /// Apply a binary operator to evaluated operands
    pub fn binary_operation(&mut self, operator: BinaryOperator, left: &Value, right: &Value) -> Result<Value, Control> {
        use BinaryOperator::*;

        Ok(match operator {
            Add => return self.add(left, right),
            Sub | Mul | Div | Mod | Exp => {
                let a = self.to_number(left)?;
                let b = self.to_number(right)?;
                Value::Number(arithmetic(operator, a, b))
            }
            Eq => Value::Boolean(self.loose_equals(left, right)?),
            NotEq => Value::Boolean(!self.loose_equals(left, right)?),
            StrictEq => Value::Boolean(strict_equals(left, right)),
            StrictNotEq => Value::Boolean(!strict_equals(left, right)),
            Lt => Value::Boolean(self.compare(left, right)? == Some(Ordering::Less)),
            Gt => Value::Boolean(self.compare(left, right)? == Some(Ordering::Greater)),
            LtEq => Value::Boolean(matches!(self.compare(left, right)?, Some(Ordering::Less | Ordering::Equal))),
            GtEq => Value::Boolean(matches!(
                self.compare(left, right)?,
                Some(Ordering::Greater | Ordering::Equal)
            )),
            BitAnd | BitOr | BitXor | LeftShift | RightShift => {
                let a = to_int32(self.to_number(left)?);
                let b = self.to_number(right)?;
                Value::Number(match operator {
                    BitAnd => (a & to_int32(b)) as f64,
                    BitOr => (a | to_int32(b)) as f64,
                    BitXor => (a ^ to_int32(b)) as f64,
                    LeftShift => a.wrapping_shl(to_uint32(b) & 31) as f64,
                    _ => a.wrapping_shr(to_uint32(b) & 31) as f64,
                })
            }
            UnsignedRightShift => {
                let a = to_uint32(self.to_number(left)?);
                let b = to_uint32(self.to_number(right)?);
                Value::Number(a.wrapping_shr(b & 31) as f64)
            }
            In => {
                let object = match right {
                    Value::Object(object) => object.clone(),
                    other => {
                        let key = self.to_property_key(left)?;
                        let message = format!(
                            "Cannot use 'in' operator to search for '{}' in {}",
                            key,
                            self.describe(other)
                        );
                        return Err(self.type_error(message));
                    }
                };
                let key = self.to_property_key(left)?;
                Value::Boolean(object.has_property(&key))
            }
            Instanceof => Value::Boolean(self.instance_of(left, right)?),
        })
    }

    fn add(&mut self, left: &Value, right: &Value) -> Result<Value, Control> {
        if let (Value::Number(a), Value::Number(b)) = (left, right) {
            return Ok(Value::Number(a + b));
        }
        let left = self.to_primitive(left, Hint::Default)?;
        let right = self.to_primitive(right, Hint::Default)?;
        if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) {
            let left = self.to_string(&left)?;
            let right = self.to_string(&right)?;
            return Ok(Value::from(self.concat_strings(&[&*left, &*right])?));
        }
        Ok(Value::Number(self.to_number(&left)? + self.to_number(&right)?))
    }

    /// Abstract relational comparison; `None` when either side is `NaN`
    fn compare(&mut self, left: &Value, right: &Value) -> Result<Option<Ordering>, Control> {
        let left = self.to_primitive(left, Hint::Number)?;
        let right = self.to_primitive(right, Hint::Number)?;
        if let (Value::String(a), Value::String(b)) = (&left, &right) {
            return Ok(Some(a.encode_utf16().cmp(b.encode_utf16())));
        }
        let a = self.to_number(&left)?;
        let b = self.to_number(&right)?;
        Ok(a.partial_cmp(&b))
    }

    /// Unary `-`, `+` and `~`
    pub(crate) fn numeric_unary(&mut self, operator: UnaryOperator, value: &Value) -> Result<Value, Control> {
        let n = self.to_number(value)?;
        Ok(Value::Number(match operator {
            UnaryOperator::Minus => -n,
            UnaryOperator::BitwiseNot => !to_int32(n) as f64,
            _ => n,
        }))
    }
}

fn arithmetic(operator: BinaryOperator, a: f64, b: f64) -> f64 {
    match operator {
        BinaryOperator::Sub => a - b,
        BinaryOperator::Mul => a * b,
        BinaryOperator::Div => a / b,
        BinaryOperator::Mod => {
            if b.is_infinite() && a.is_finite() {
                a
            } else {
                a % b
            }
        }
        BinaryOperator::Exp => {
            if b.is_nan() || (a.abs() == 1.0 && b.is_infinite()) {
                f64::NAN
            } else {
                a.powf(b)
            }
        }
        _ => f64::NAN,
    }
}
