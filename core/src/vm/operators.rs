//! Primitive operations executed by `Unary`, `Binary`, `Ternary` and
//! `Quaternary` instructions.
//!
//! Operators never fail on bad operands: a conversion failure or a division
//! by zero produces a DelayedError value, and a DelayedError operand flows
//! through to the result. Only `assert` raises.

use ecow::EcoString;

use super::{BinaryOp, QuaternaryOp, TernaryOp, UnaryOp};
use crate::errors::ScriptError;
use crate::values::{Color, Function, RangeIter, ScriptIterator, Value};

/// Turn a conversion result into a value, delaying the error.
macro_rules! delayed {
    ($expr:expr) => {
        match $expr {
            Ok(value) => value,
            Err(error) => return Value::delayed_error(error),
        }
    };
}

pub fn unary(op: UnaryOp, a: Value) -> Value {
    match op {
        UnaryOp::MakeIterator => a.make_iterator(),
        UnaryOp::Negate => match a {
            Value::Int(i) => Value::Int(i.wrapping_neg()),
            Value::Double(d) => Value::Double(-d),
            other => Value::Double(-delayed!(other.to_double())),
        },
        UnaryOp::Not => Value::Bool(!delayed!(a.to_bool())),
    }
}

pub fn binary(op: BinaryOp, a: Value, b: Value) -> Result<Value, ScriptError> {
    let result = match op {
        BinaryOp::OrElse => match a {
            Value::Error(_) => b,
            other => other,
        },
        BinaryOp::Assert => {
            return if a.to_bool()? {
                Ok(Value::Nil)
            } else {
                Err(ScriptError::AssertionFailed {
                    message: b.to_string().unwrap_or_else(|_| b.to_code()),
                })
            };
        }
        _ if matches!(a, Value::Error(_)) => a,
        _ if matches!(b, Value::Error(_)) => b,
        BinaryOp::Add => add(a, b),
        BinaryOp::Sub => arithmetic(a, b, i64::wrapping_sub, |x, y| x - y),
        BinaryOp::Mul => arithmetic(a, b, i64::wrapping_mul, |x, y| x * y),
        BinaryOp::FDiv => real_division(a, b),
        BinaryOp::Div => integer_division(a, b),
        BinaryOp::Mod => modulo(a, b),
        BinaryOp::Pow => power(a, b),
        BinaryOp::Xor => xor(&a, &b),
        BinaryOp::Eq => Value::Bool(a.equal(&b)),
        BinaryOp::Neq => Value::Bool(!a.equal(&b)),
        BinaryOp::Lt => comparison(&a, &b, |o| o.is_lt()),
        BinaryOp::Gt => comparison(&a, &b, |o| o.is_gt()),
        BinaryOp::Le => comparison(&a, &b, |o| o.is_le()),
        BinaryOp::Ge => comparison(&a, &b, |o| o.is_ge()),
        BinaryOp::Min => match a.compare(&b) {
            Ok(ordering) if ordering.is_gt() => b,
            Ok(_) => a,
            Err(error) => Value::delayed_error(error),
        },
        BinaryOp::Max => match a.compare(&b) {
            Ok(ordering) if ordering.is_lt() => b,
            Ok(_) => a,
            Err(error) => Value::delayed_error(error),
        },
        BinaryOp::Member => a.get_member(&b),
        BinaryOp::RangeIterator => range(&a, &b),
    };
    Ok(result)
}

pub fn ternary(op: TernaryOp, a: Value, b: Value, c: Value) -> Value {
    match op {
        TernaryOp::Rgb => Value::Color(Color::from_channels(
            delayed!(a.to_int()),
            delayed!(b.to_int()),
            delayed!(c.to_int()),
            255,
        )),
    }
}

pub fn quaternary(op: QuaternaryOp, a: Value, b: Value, c: Value, d: Value) -> Value {
    match op {
        QuaternaryOp::Rgba => Value::Color(Color::from_channels(
            delayed!(a.to_int()),
            delayed!(b.to_int()),
            delayed!(c.to_int()),
            delayed!(d.to_int()),
        )),
    }
}

/// `+` is overloaded: composition of functions, concatenation of
/// collections, numeric addition and, for anything else, string concatenation.
fn add(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Nil, b) => b,
        (a, Value::Nil) => a,
        (a, b) if a.is_function() && b.is_function() => {
            Value::Function(Function::compose(a, b))
        }
        (Value::Collection(a), Value::Collection(b)) => Value::collection(a.concat(&b)),
        (Value::Int(x), Value::Int(y)) => Value::Int(x.wrapping_add(y)),
        (a, b) if a.is_number() && b.is_number() => {
            Value::Double(delayed!(a.to_double()) + delayed!(b.to_double()))
        }
        (a, b) => {
            let mut text: EcoString = delayed!(a.to_string());
            text.push_str(&delayed!(b.to_string()));
            Value::String(text)
        }
    }
}

fn arithmetic(
    a: Value,
    b: Value,
    int_op: fn(i64, i64) -> i64,
    double_op: fn(f64, f64) -> f64,
) -> Value {
    match (&a, &b) {
        (Value::Int(x), Value::Int(y)) => Value::Int(int_op(*x, *y)),
        _ => Value::Double(double_op(delayed!(a.to_double()), delayed!(b.to_double()))),
    }
}

fn real_division(a: Value, b: Value) -> Value {
    let divisor = delayed!(b.to_double());
    if divisor == 0.0 {
        return Value::delayed_error(ScriptError::DivisionByZero);
    }
    Value::Double(delayed!(a.to_double()) / divisor)
}

fn integer_division(a: Value, b: Value) -> Value {
    match (&a, &b) {
        (Value::Int(_), Value::Int(0)) => Value::delayed_error(ScriptError::DivisionByZero),
        (Value::Int(x), Value::Int(y)) => Value::Int(x.wrapping_div(*y)),
        _ => {
            let divisor = delayed!(b.to_double());
            if divisor == 0.0 {
                return Value::delayed_error(ScriptError::DivisionByZero);
            }
            Value::Int((delayed!(a.to_double()) / divisor).trunc() as i64)
        }
    }
}

fn modulo(a: Value, b: Value) -> Value {
    match (&a, &b) {
        (Value::Int(_), Value::Int(0)) => Value::delayed_error(ScriptError::DivisionByZero),
        (Value::Int(x), Value::Int(y)) => Value::Int(x.wrapping_rem(*y)),
        _ => {
            let divisor = delayed!(b.to_double());
            if divisor == 0.0 {
                return Value::delayed_error(ScriptError::DivisionByZero);
            }
            Value::Double(delayed!(a.to_double()) % divisor)
        }
    }
}

fn power(a: Value, b: Value) -> Value {
    if let (Value::Int(base), Value::Int(exponent)) = (&a, &b) {
        let result = u32::try_from(*exponent)
            .ok()
            .and_then(|exponent| base.checked_pow(exponent));
        if let Some(result) = result {
            return Value::Int(result);
        }
    }
    Value::Double(delayed!(a.to_double()).powf(delayed!(b.to_double())))
}

fn comparison(a: &Value, b: &Value, test: fn(core::cmp::Ordering) -> bool) -> Value {
    match a.compare(b) {
        Ok(ordering) => Value::Bool(test(ordering)),
        Err(error) => Value::delayed_error(error),
    }
}

fn xor(a: &Value, b: &Value) -> Value {
    Value::Bool(delayed!(a.to_bool()) ^ delayed!(b.to_bool()))
}

fn range(a: &Value, b: &Value) -> Value {
    let start = delayed!(a.to_int());
    let end = delayed!(b.to_int());
    Value::Iterator(ScriptIterator::new(RangeIter::new(start, end)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bin(op: BinaryOp, a: impl Into<Value>, b: impl Into<Value>) -> Value {
        binary(op, a.into(), b.into()).unwrap()
    }

    fn is_error(value: &Value, expected: ScriptError) -> bool {
        matches!(value, Value::Error(error) if **error == expected)
    }

    #[test]
    fn test_add_table() {
        assert!(bin(BinaryOp::Add, 1i64, 2i64).equal(&Value::Int(3)));
        assert!(matches!(bin(BinaryOp::Add, 1i64, 0.5), Value::Double(d) if d == 1.5));
        assert!(bin(BinaryOp::Add, "a", 1i64).equal(&Value::string("a1")));
        assert!(bin(BinaryOp::Add, Value::Nil, 4i64).equal(&Value::Int(4)));
        let joined = bin(
            BinaryOp::Add,
            Value::list([Value::Int(1)]),
            Value::list([Value::Int(2)]),
        );
        assert_eq!(joined.item_count(), Some(2));
    }

    #[test]
    fn test_integer_and_real_division() {
        assert!(matches!(bin(BinaryOp::FDiv, 7i64, 2i64), Value::Double(d) if d == 3.5));
        assert!(bin(BinaryOp::Div, 7i64, 2i64).equal(&Value::Int(3)));
        assert!(bin(BinaryOp::Mod, 7i64, 3i64).equal(&Value::Int(1)));
        assert!(is_error(&bin(BinaryOp::FDiv, 1i64, 0i64), ScriptError::DivisionByZero));
        assert!(is_error(&bin(BinaryOp::Div, 1i64, 0i64), ScriptError::DivisionByZero));
        assert!(is_error(&bin(BinaryOp::Mod, 1.5, 0.0), ScriptError::DivisionByZero));
    }

    #[test]
    fn test_power() {
        assert!(bin(BinaryOp::Pow, 2i64, 10i64).equal(&Value::Int(1024)));
        assert!(matches!(bin(BinaryOp::Pow, 2i64, -1i64), Value::Double(d) if d == 0.5));
        assert!(matches!(bin(BinaryOp::Pow, 10i64, 40i64), Value::Double(_)));
    }

    #[test]
    fn test_errors_flow_through() {
        let delayed = Value::delayed_error(ScriptError::DivisionByZero);
        assert!(is_error(
            &bin(BinaryOp::Mul, delayed.clone(), 2i64),
            ScriptError::DivisionByZero
        ));
        assert!(bin(BinaryOp::OrElse, delayed, 5i64).equal(&Value::Int(5)));
        assert!(bin(BinaryOp::OrElse, 1i64, 5i64).equal(&Value::Int(1)));
        assert!(matches!(bin(BinaryOp::Sub, "x", 1i64), Value::Error(_)));
    }

    #[test]
    fn test_comparisons() {
        assert!(bin(BinaryOp::Lt, 1i64, 2.5).equal(&Value::Bool(true)));
        assert!(bin(BinaryOp::Ge, "b", "a").equal(&Value::Bool(true)));
        assert!(bin(BinaryOp::Eq, 1i64, "1").equal(&Value::Bool(true)));
        assert!(bin(BinaryOp::Min, 3i64, 2i64).equal(&Value::Int(2)));
        assert!(bin(BinaryOp::Max, 3i64, 2i64).equal(&Value::Int(3)));
    }

    #[test]
    fn test_assert() {
        assert!(binary(BinaryOp::Assert, Value::Bool(true), "msg".into()).is_ok());
        assert_eq!(
            binary(BinaryOp::Assert, Value::Bool(false), "line 1: x".into()).unwrap_err(),
            ScriptError::AssertionFailed {
                message: "line 1: x".into()
            }
        );
    }

    #[test]
    fn test_unary_and_colors() {
        assert!(unary(UnaryOp::Negate, Value::Int(3)).equal(&Value::Int(-3)));
        assert!(unary(UnaryOp::Not, Value::Bool(false)).equal(&Value::Bool(true)));
        assert!(matches!(unary(UnaryOp::Not, Value::Int(1)), Value::Error(_)));
        let color = ternary(TernaryOp::Rgb, 300i64.into(), 2i64.into(), (-1i64).into());
        assert!(color.equal(&Value::Color(Color::rgb(255, 2, 0))));
    }
}
