//! Typed extraction of builtin arguments.

use chrono::NaiveDateTime;
use ecow::EcoString;

use super::{Color, ImageHandle, Value};
use crate::errors::ScriptError;

/// Conversion from a script value to a Rust type, applying the script's
/// coercion rules. A DelayedError argument converts to its own error.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self, ScriptError>;
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self, ScriptError> {
        Ok(value.clone())
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self, ScriptError> {
        value.to_int()
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, ScriptError> {
        value.to_double()
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, ScriptError> {
        value.to_bool()
    }
}

impl FromValue for EcoString {
    fn from_value(value: &Value) -> Result<Self, ScriptError> {
        value.to_string()
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, ScriptError> {
        value.to_string().map(Into::into)
    }
}

impl FromValue for Color {
    fn from_value(value: &Value) -> Result<Self, ScriptError> {
        value.to_color()
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: &Value) -> Result<Self, ScriptError> {
        value.to_datetime()
    }
}

impl FromValue for ImageHandle {
    fn from_value(value: &Value) -> Result<Self, ScriptError> {
        value.to_image()
    }
}

/// The elements of any iterable value.
impl FromValue for Vec<Value> {
    fn from_value(value: &Value) -> Result<Self, ScriptError> {
        value.to_vec()
    }
}
