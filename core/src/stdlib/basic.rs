//! Basic Package
//!
//! Debugging output and explicit conversions.
//!
//! The conversion builtins are more lenient than the implicit coercions of
//! the operators: `to_int(true)` is 1 and `to_int("")` is 0, while `true + 1`
//! is a conversion error.

use ecow::EcoString;
use tracing::{error, info, warn};

use super::string::format_value;
use crate::errors::ScriptError;
use crate::intern::VarId;
use crate::values::{NativeFunction, Value};
use crate::vm::Context;

// ============================================================================
// Debugging
// ============================================================================

/// Log the input and pass it through.
fn trace(ctx: &mut Context) -> Result<Value, ScriptError> {
    let input = ctx.input()?;
    info!(target: "cardscript::script", "Trace: {}", input.to_string()?);
    Ok(input)
}

fn warning(ctx: &mut Context) -> Result<Value, ScriptError> {
    let message: EcoString = ctx.param("input")?;
    if ctx.param_or("condition", true)? {
        warn!(target: "cardscript::script", "{message}");
    }
    Ok(Value::Nil)
}

/// Report an error without failing the script.
fn error(ctx: &mut Context) -> Result<Value, ScriptError> {
    let message: EcoString = ctx.param("input")?;
    if ctx.param_or("condition", true)? {
        error!(target: "cardscript::script", "{message}");
    }
    Ok(Value::Nil)
}

// ============================================================================
// Conversion
// ============================================================================

fn to_string(ctx: &mut Context) -> Result<Value, ScriptError> {
    let input = ctx.input()?;
    // `format` is also a builtin; only a string argument is a format spec.
    let format = crate::intern::lookup("format").and_then(|var| ctx.get_variable_opt(var));
    match format {
        Some(Value::String(format)) => Ok(Value::String(format_value(format, &input)?)),
        _ => Ok(Value::String(input.to_string()?)),
    }
}

fn to_int(ctx: &mut Context) -> Result<Value, ScriptError> {
    let result = match ctx.input()? {
        Value::Bool(b) => b as i64,
        Value::Color(color) => color.average(),
        Value::String(s) if s.trim().is_empty() => 0,
        other => other.to_int()?,
    };
    Ok(Value::Int(result))
}

fn to_real(ctx: &mut Context) -> Result<Value, ScriptError> {
    let result = match ctx.input()? {
        Value::Bool(b) => f64::from(u8::from(b)),
        Value::Color(color) => (color.r as f64 + color.g as f64 + color.b as f64) / 3.0,
        Value::String(s) if s.trim().is_empty() => 0.0,
        other => other.to_double()?,
    };
    Ok(Value::Double(result))
}

/// Like `to_int` or `to_real`, whichever fits the input.
fn to_number(ctx: &mut Context) -> Result<Value, ScriptError> {
    match ctx.input()? {
        Value::Bool(b) => Ok(Value::Int(b as i64)),
        Value::Color(color) => Ok(Value::Int(color.average())),
        Value::Nil => Ok(Value::Int(0)),
        number @ (Value::Int(_) | Value::Double(_)) => Ok(number),
        other => {
            let text = other.to_string()?;
            let trimmed = text.trim();
            if trimmed.is_empty() {
                Ok(Value::Int(0))
            } else if let Ok(i) = trimmed.parse::<i64>() {
                Ok(Value::Int(i))
            } else if let Ok(d) = trimmed.parse::<f64>() {
                Ok(Value::Double(d))
            } else {
                Err(ScriptError::Conversion {
                    value: Some(text),
                    from: other.type_name(),
                    to: "number",
                })
            }
        }
    }
}

fn to_boolean(ctx: &mut Context) -> Result<Value, ScriptError> {
    let result = match ctx.input()? {
        Value::Int(i) => i != 0,
        Value::Double(d) => d != 0.0,
        other => other.to_bool()?,
    };
    Ok(Value::Bool(result))
}

fn to_color(ctx: &mut Context) -> Result<Value, ScriptError> {
    Ok(Value::Color(ctx.param("input")?))
}

/// Parse a date, or `"now"` for the current local time.
fn to_date(ctx: &mut Context) -> Result<Value, ScriptError> {
    let input = ctx.input()?;
    if matches!(&input, Value::String(s) if s.trim() == "now") {
        return Ok(Value::DateTime(chrono::Local::now().naive_local()));
    }
    Ok(Value::DateTime(input.to_datetime()?))
}

fn to_code(ctx: &mut Context) -> Result<Value, ScriptError> {
    Ok(Value::String(ctx.input()?.to_code()))
}

fn type_name(ctx: &mut Context) -> Result<Value, ScriptError> {
    let input = ctx.get_variable_opt(VarId::INPUT).cloned().unwrap_or_default();
    Ok(Value::string(input.type_name()))
}

/// Register the debugging and conversion builtins.
pub fn register(ctx: &mut Context) {
    ctx.register_builtin(NativeFunction::new("trace", trace));
    ctx.register_builtin(NativeFunction::new("warning", warning));
    ctx.register_builtin(NativeFunction::new("error", error));

    ctx.register_builtin(NativeFunction::new("to_string", to_string));
    ctx.register_builtin(NativeFunction::new("to_int", to_int));
    ctx.register_builtin(NativeFunction::new("to_real", to_real));
    ctx.register_builtin(NativeFunction::new("to_number", to_number));
    ctx.register_builtin(NativeFunction::new("to_boolean", to_boolean));
    ctx.register_builtin(NativeFunction::new("to_color", to_color));
    ctx.register_builtin(NativeFunction::new("to_date", to_date));
    ctx.register_builtin(NativeFunction::new("to_code", to_code));
    ctx.register_builtin(NativeFunction::new("type_name", type_name));
}

#[cfg(test)]
#[path = "basic_test.rs"]
mod basic_test;
