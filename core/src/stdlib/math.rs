//! Math Package
//!
//! Functions: abs, sqrt, pow, exp, log, log10, floor, ceil, sin, cos, tan,
//!            sin_deg, cos_deg, tan_deg, random_real, random_int, random_boolean
//!
//! All functions take their argument as `input`. Angles are in radians
//! except for the `_deg` variants.

use rand::Rng;

use crate::errors::ScriptError;
use crate::values::{NativeFunction, Value};
use crate::vm::Context;

// ============================================================================
// Basic Operations
// ============================================================================

/// Absolute value; integers stay integers.
fn math_abs(ctx: &mut Context) -> Result<Value, ScriptError> {
    match ctx.input()? {
        Value::Double(d) => Ok(Value::Double(d.abs())),
        other => Ok(Value::Int(other.to_int()?.wrapping_abs())),
    }
}

/// Apply a float function to `input`.
fn unary(f: fn(f64) -> f64) -> impl Fn(&mut Context) -> Result<Value, ScriptError> {
    move |ctx| Ok(Value::Double(f(ctx.param("input")?)))
}

/// Power function - input^exponent
fn math_pow(ctx: &mut Context) -> Result<Value, ScriptError> {
    let base: f64 = ctx.param("input")?;
    let exponent: f64 = ctx.param("exponent")?;
    Ok(Value::Double(base.powf(exponent)))
}

// ============================================================================
// Random Numbers
// ============================================================================

/// Uniform double in `[begin, end)`, by default in `[0, 1)`.
fn random_real(ctx: &mut Context) -> Result<Value, ScriptError> {
    let begin: f64 = ctx.param_or("begin", 0.0)?;
    let end: f64 = ctx.param_or("end", 1.0)?;
    let unit: f64 = rand::thread_rng().r#gen();
    Ok(Value::Double(begin + unit * (end - begin)))
}

/// Uniform integer in `[begin, end)`.
fn random_int(ctx: &mut Context) -> Result<Value, ScriptError> {
    let begin: i64 = ctx.param_or("begin", 0)?;
    let end: i64 = ctx.param("end")?;
    if end <= begin {
        return Err(ScriptError::custom(format!(
            "Can not pick a random integer between {begin} and {end}"
        )));
    }
    Ok(Value::Int(rand::thread_rng().gen_range(begin..end)))
}

/// True with probability `input`, by default one half.
fn random_boolean(ctx: &mut Context) -> Result<Value, ScriptError> {
    let probability: f64 = ctx.param_or("input", 0.5)?;
    Ok(Value::Bool(
        rand::thread_rng().gen_bool(probability.clamp(0.0, 1.0)),
    ))
}

/// Register the math builtins.
pub fn register(ctx: &mut Context) {
    ctx.register_builtin(NativeFunction::new("abs", math_abs));
    ctx.register_builtin(NativeFunction::new("pow", math_pow));

    let functions: [(&str, fn(f64) -> f64); 12] = [
        ("sqrt", f64::sqrt),
        ("exp", f64::exp),
        ("log", f64::ln),
        ("log10", f64::log10),
        ("sin", f64::sin),
        ("cos", f64::cos),
        ("tan", f64::tan),
        ("sin_deg", |x| x.to_radians().sin()),
        ("cos_deg", |x| x.to_radians().cos()),
        ("tan_deg", |x| x.to_radians().tan()),
        ("floor", f64::floor),
        ("ceil", f64::ceil),
    ];
    for (name, f) in functions {
        ctx.register_builtin(NativeFunction::new(name, unary(f)));
    }

    ctx.register_builtin(NativeFunction::new("random_real", random_real));
    ctx.register_builtin(NativeFunction::new("random_int", random_int));
    ctx.register_builtin(NativeFunction::new("random_boolean", random_boolean));
}

#[cfg(test)]
#[path = "math_test.rs"]
mod math_test;
