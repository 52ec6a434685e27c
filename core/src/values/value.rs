use core::cmp::Ordering;
use core::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use ecow::{EcoString, eco_format};

use super::{
    Closure, Collection, CollectionIter, Color, Function, NativeFunction, ScriptIterator,
    ScriptObject,
};
use crate::errors::ScriptError;

const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Relative tolerance for comparing doubles.
const EPSILON: f64 = 1e-14;

/// Opaque reference to an image resource. The empty name is the blank image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ImageHandle(pub EcoString);

/// A runtime value. Cloning is cheap: compound variants are reference counted.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(EcoString),
    Color(Color),
    DateTime(NaiveDateTime),
    Image(ImageHandle),
    Collection(Arc<Collection>),
    Iterator(ScriptIterator),
    Function(Function),
    Closure(Arc<Closure>),
    Object(Arc<dyn ScriptObject>),
    /// A DelayedError: raised only when the value is actually used.
    Error(Arc<ScriptError>),
}

impl Value {
    // === Construction ===

    pub fn string(text: impl Into<EcoString>) -> Value {
        Value::String(text.into())
    }

    pub fn delayed_error(error: ScriptError) -> Value {
        Value::Error(Arc::new(error))
    }

    pub fn collection(collection: Collection) -> Value {
        Value::Collection(Arc::new(collection))
    }

    pub fn list(items: impl IntoIterator<Item = Value>) -> Value {
        Value::collection(items.into_iter().collect())
    }

    pub fn native(function: NativeFunction) -> Value {
        Value::Function(Function::Native(Arc::new(function)))
    }

    pub fn object(object: impl ScriptObject) -> Value {
        Value::Object(Arc::new(object))
    }

    // === Inspection ===

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Color(_) => "color",
            Value::DateTime(_) => "date",
            Value::Image(_) => "image",
            Value::Collection(_) => "collection",
            Value::Iterator(_) => "iterator",
            Value::Function(_) | Value::Closure(_) => "function",
            Value::Object(object) => object.type_name(),
            Value::Error(_) => "error",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Double(_))
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Value::Function(_) | Value::Closure(_))
    }

    pub fn as_error(&self) -> Option<&ScriptError> {
        match self {
            Value::Error(error) => Some(error),
            _ => None,
        }
    }

    /// Raise a DelayedError, pass any other value through.
    pub fn into_result(self) -> Result<Value, ScriptError> {
        match self {
            Value::Error(error) => Err((*error).clone()),
            other => Ok(other),
        }
    }

    fn conversion_error(&self, to: &'static str) -> ScriptError {
        match self {
            Value::Error(error) => (**error).clone(),
            Value::String(text) => ScriptError::Conversion {
                value: Some(text.clone()),
                from: "string",
                to,
            },
            other => ScriptError::conversion(other.type_name(), to),
        }
    }

    // === Conversions ===

    pub fn to_string(&self) -> Result<EcoString, ScriptError> {
        match self {
            Value::Nil => Ok(EcoString::new()),
            Value::Bool(b) => Ok(if *b { "true".into() } else { "false".into() }),
            Value::Int(i) => Ok(eco_format!("{i}")),
            Value::Double(d) => Ok(format_double(*d)),
            Value::String(s) => Ok(s.clone()),
            Value::Color(c) => Ok(eco_format!("{c}")),
            Value::DateTime(dt) => Ok(eco_format!("{}", dt.format(DATE_TIME_FORMAT))),
            Value::Image(image) => Ok(image.0.clone()),
            Value::Object(object) => object.to_string(),
            _ => Err(self.conversion_error("string")),
        }
    }

    pub fn to_int(&self) -> Result<i64, ScriptError> {
        match self {
            Value::Nil => Ok(0),
            Value::Int(i) => Ok(*i),
            Value::Double(d) => Ok(*d as i64),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| self.conversion_error("integer")),
            _ => Err(self.conversion_error("integer")),
        }
    }

    pub fn to_double(&self) -> Result<f64, ScriptError> {
        match self {
            Value::Nil => Ok(0.0),
            Value::Int(i) => Ok(*i as f64),
            Value::Double(d) => Ok(*d),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| self.conversion_error("double")),
            _ => Err(self.conversion_error("double")),
        }
    }

    pub fn to_bool(&self) -> Result<bool, ScriptError> {
        match self {
            Value::Nil => Ok(false),
            Value::Bool(b) => Ok(*b),
            Value::String(s) => match s.as_str() {
                "yes" | "true" => Ok(true),
                "no" | "false" | "" => Ok(false),
                _ => Err(self.conversion_error("boolean")),
            },
            _ => Err(self.conversion_error("boolean")),
        }
    }

    pub fn to_color(&self) -> Result<Color, ScriptError> {
        match self {
            Value::Nil => Ok(Color::default()),
            Value::Color(c) => Ok(*c),
            Value::String(s) => Color::parse(s).ok_or_else(|| self.conversion_error("color")),
            _ => Err(self.conversion_error("color")),
        }
    }

    pub fn to_datetime(&self) -> Result<NaiveDateTime, ScriptError> {
        match self {
            Value::DateTime(dt) => Ok(*dt),
            Value::String(s) => parse_datetime(s).ok_or_else(|| self.conversion_error("date")),
            _ => Err(self.conversion_error("date")),
        }
    }

    pub fn to_image(&self) -> Result<ImageHandle, ScriptError> {
        match self {
            Value::Nil => Ok(ImageHandle::default()),
            Value::Image(image) => Ok(image.clone()),
            Value::String(s) => Ok(ImageHandle(s.clone())),
            _ => Err(self.conversion_error("image")),
        }
    }

    /// Source-like rendering; literals render as code that evaluates back
    /// to an equal value.
    pub fn to_code(&self) -> EcoString {
        match self {
            Value::Nil => "nil".into(),
            Value::Double(d) if d.is_finite() && d.fract() == 0.0 && d.abs() < 1e15 => {
                eco_format!("{d:.1}")
            }
            Value::String(s) => quote_string(s),
            Value::DateTime(_) | Value::Image(_) => {
                quote_string(&self.to_string().unwrap_or_default())
            }
            Value::Collection(collection) => {
                let mut out = EcoString::from("[");
                let items = collection.items().iter().map(Value::to_code);
                let entries = collection
                    .entries()
                    .iter()
                    .map(|(key, value)| eco_format!("{}: {}", quote_string(key), value.to_code()));
                for (i, part) in items.chain(entries).enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(&part);
                }
                out.push(']');
                out
            }
            Value::Iterator(_) => "<iterator>".into(),
            Value::Function(Function::Native(native)) => eco_format!("<function {}>", native.name()),
            Value::Function(_) => "<function>".into(),
            Value::Closure(_) => "<closure>".into(),
            Value::Object(object) => object.to_code(),
            Value::Error(error) => eco_format!("<error: {error}>"),
            _ => self.to_string().unwrap_or_default(),
        }
    }

    // === Members & iteration ===

    /// Number of items, for values that have them.
    pub fn item_count(&self) -> Option<usize> {
        match self {
            Value::Collection(collection) => Some(collection.len()),
            Value::String(s) => Some(s.chars().count()),
            Value::Object(object) => object.item_count(),
            _ => None,
        }
    }

    /// `self[key]`. Missing members are DelayedErrors.
    pub fn get_member(&self, key: &Value) -> Value {
        match self {
            Value::Error(_) => self.clone(),
            Value::Collection(collection) => match collection.get(key) {
                Some(value) => value.clone(),
                None => self.no_member(key),
            },
            Value::String(s) => key
                .to_int()
                .ok()
                .and_then(|i| usize::try_from(i).ok())
                .and_then(|i| s.chars().nth(i))
                .map(|c| Value::String(c.into()))
                .unwrap_or_else(|| self.no_member(key)),
            Value::Object(object) => match key.to_string() {
                Ok(name) => object.get_member(&name),
                Err(error) => Value::delayed_error(error),
            },
            _ => self.no_member(key),
        }
    }

    pub fn member(&self, name: &str) -> Value {
        self.get_member(&Value::string(name))
    }

    fn no_member(&self, key: &Value) -> Value {
        Value::delayed_error(ScriptError::NoSuchMember {
            type_name: self.type_name(),
            member: key.to_string().unwrap_or_else(|_| key.to_code()),
        })
    }

    /// An iterator over this value, or a DelayedError when it is not iterable.
    pub fn make_iterator(&self) -> Value {
        match self {
            Value::Collection(collection) => {
                Value::Iterator(ScriptIterator::new(CollectionIter::new(collection.clone())))
            }
            Value::Iterator(_) | Value::Error(_) => self.clone(),
            Value::Object(object) => object.make_iterator(),
            _ => Value::delayed_error(self.conversion_error("collection")),
        }
    }

    /// Drain the values of an iterable into a vector.
    pub fn to_vec(&self) -> Result<Vec<Value>, ScriptError> {
        if let Value::Collection(collection) = self {
            return Ok(collection.values().cloned().collect());
        }
        match self.make_iterator() {
            Value::Iterator(iterator) => {
                let mut values = Vec::new();
                while let Some(step) = iterator.next_step() {
                    values.push(step.value);
                }
                Ok(values)
            }
            other => Err(other.conversion_error("collection")),
        }
    }

    // === Comparison ===

    /// Script equality: numbers compare numerically, collections element-wise.
    pub fn equal(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (a, b) if a.is_number() && b.is_number() => match (a.to_double(), b.to_double()) {
                (Ok(a), Ok(b)) => approx_equal(a, b),
                _ => false,
            },
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Color(a), Value::Color(b)) => a == b,
            (Value::Collection(a), Value::Collection(b)) => {
                Arc::ptr_eq(a, b)
                    || (a.items().len() == b.items().len()
                        && a.entries().len() == b.entries().len()
                        && a.items().iter().zip(b.items()).all(|(x, y)| x.equal(y))
                        && a.entries().iter().zip(b.entries()).all(|((ka, va), (kb, vb))| {
                            ka == kb && va.equal(vb)
                        }))
            }
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Closure(a), Value::Closure(b)) => Arc::ptr_eq(a, b),
            (Value::Iterator(a), Value::Iterator(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Error(_), _) | (_, Value::Error(_)) => false,
            (Value::String(_), _) | (_, Value::String(_)) => {
                match (self.to_string(), other.to_string()) {
                    (Ok(a), Ok(b)) => a == b,
                    _ => false,
                }
            }
            _ => self.to_code() == other.to_code(),
        }
    }

    /// Ordering for `<`, `min` and friends.
    pub fn compare(&self, other: &Value) -> Result<Ordering, ScriptError> {
        match (self, other) {
            (Value::Error(error), _) | (_, Value::Error(error)) => Err((**error).clone()),
            (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
            (a, b) if a.is_number() && b.is_number() => {
                let (a, b) = (a.to_double()?, b.to_double()?);
                Ok(a.partial_cmp(&b).unwrap_or(Ordering::Equal))
            }
            (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
            (Value::DateTime(a), Value::DateTime(b)) => Ok(a.cmp(b)),
            (Value::Nil, Value::Nil) => Ok(Ordering::Equal),
            (a, b) if a.is_number() || b.is_number() => {
                let (a, b) = (a.to_double()?, b.to_double()?);
                Ok(a.partial_cmp(&b).unwrap_or(Ordering::Equal))
            }
            (Value::String(_), _) | (_, Value::String(_)) => {
                Ok(self.to_string()?.cmp(&other.to_string()?))
            }
            (a, b) => Err(ScriptError::custom(eco_format!(
                "Can't compare {} with {}",
                a.type_name(),
                b.type_name()
            ))),
        }
    }
}

pub fn approx_equal(a: f64, b: f64) -> bool {
    a == b || (a - b).abs() <= EPSILON * a.abs().max(b.abs())
}

/// Doubles print in their shortest form; whole numbers without a fraction.
pub fn format_double(d: f64) -> EcoString {
    eco_format!("{d}")
}

pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    NaiveDateTime::parse_from_str(text, DATE_TIME_FORMAT)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, DATE_FORMAT)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

pub fn quote_string(text: &str) -> EcoString {
    let mut out = EcoString::from("\"");
    for c in text.chars() {
        match c {
            '"' | '\\' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_code())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.into())
    }
}

impl From<EcoString> for Value {
    fn from(s: EcoString) -> Self {
        Value::String(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s.into())
    }
}

impl From<Color> for Value {
    fn from(c: Color) -> Self {
        Value::Color(c)
    }
}

impl From<Collection> for Value {
    fn from(c: Collection) -> Self {
        Value::collection(c)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::DateTime(dt)
    }
}

impl From<ScriptError> for Value {
    fn from(error: ScriptError) -> Self {
        Value::delayed_error(error)
    }
}
