//! String Package
//!
//! Provides text manipulation functions.
//!
//! Design notes:
//! - Positions and lengths count Unicode scalar values, not bytes
//! - `to_upper`/`to_lower` use full Unicode case mapping
//! - `format` understands a subset of printf: `%d %i %x %X %o %f %e %g %s %%`
//!   with flags, width and precision

use core::cmp::Ordering;

use chrono::format::{Item, StrftimeItems};
use ecow::{EcoString, eco_format};

use crate::errors::ScriptError;
use crate::values::{NativeFunction, Value};
use crate::vm::Context;

// ============================================================================
// Transformation Functions
// ============================================================================

fn text_input(ctx: &Context) -> Result<EcoString, ScriptError> {
    ctx.param("input")
}

fn to_upper(ctx: &mut Context) -> Result<Value, ScriptError> {
    Ok(Value::string(text_input(ctx)?.to_uppercase()))
}

fn to_lower(ctx: &mut Context) -> Result<Value, ScriptError> {
    Ok(Value::string(text_input(ctx)?.to_lowercase()))
}

/// Capitalize the first letter of every word, lowercase the rest.
fn to_title(ctx: &mut Context) -> Result<Value, ScriptError> {
    let input = text_input(ctx)?;
    let mut out = String::with_capacity(input.len());
    let mut word_start = true;
    for c in input.chars() {
        if word_start {
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
        word_start = !c.is_alphanumeric();
    }
    Ok(Value::string(out))
}

fn reverse(ctx: &mut Context) -> Result<Value, ScriptError> {
    Ok(Value::string(text_input(ctx)?.chars().rev().collect::<String>()))
}

fn trim(ctx: &mut Context) -> Result<Value, ScriptError> {
    Ok(Value::string(text_input(ctx)?.trim()))
}

/// Characters `begin` (inclusive) to `end` (exclusive); out of range
/// bounds are clamped.
fn substring(ctx: &mut Context) -> Result<Value, ScriptError> {
    let input = text_input(ctx)?;
    let begin = ctx.param_or("begin", 0i64)?.max(0) as usize;
    let end = ctx.param_or("end", i64::MAX)?.max(0) as usize;
    if begin >= end {
        return Ok(Value::string(""));
    }
    let text: String = input.chars().skip(begin).take(end - begin).collect();
    Ok(Value::string(text))
}

fn contains(ctx: &mut Context) -> Result<Value, ScriptError> {
    let input = text_input(ctx)?;
    let pattern: EcoString = ctx.param("match")?;
    Ok(Value::Bool(input.contains(pattern.as_str())))
}

/// Sort the characters of a string, or with `order` keep only the
/// characters listed in `order`, in that order.
pub(crate) fn sort_text(ctx: &mut Context) -> Result<Value, ScriptError> {
    let input = text_input(ctx)?;
    let order: Option<EcoString> = match ctx.param_opt::<Value>("order")? {
        Some(Value::Nil) | None => None,
        Some(order) => Some(order.to_string()?),
    };
    Ok(Value::string(sort_chars(&input, order.as_deref())))
}

pub(crate) fn sort_chars(input: &str, order: Option<&str>) -> String {
    match order {
        None => {
            let mut chars: Vec<char> = input.chars().collect();
            chars.sort_unstable();
            chars.into_iter().collect()
        }
        Some(order) => {
            let mut out = String::new();
            for wanted in order.chars() {
                out.extend(input.chars().filter(|&c| c == wanted));
            }
            out
        }
    }
}

// ============================================================================
// Formatting
// ============================================================================

pub(crate) fn format(ctx: &mut Context) -> Result<Value, ScriptError> {
    let format: EcoString = ctx.param("format")?;
    let input = ctx.input()?;
    Ok(Value::String(format_value(&format, &input)?))
}

/// A parsed `%` conversion.
#[derive(Debug, Default)]
struct Spec {
    left: bool,
    zero: bool,
    plus: bool,
    space: bool,
    width: usize,
    precision: Option<usize>,
    conversion: char,
}

/// Format `value` with a printf style specification. Every conversion in
/// `format` formats the same value.
pub fn format_value(format: &str, value: &Value) -> Result<EcoString, ScriptError> {
    if let Value::DateTime(datetime) = value {
        let items: Vec<Item<'_>> = StrftimeItems::new(format).collect();
        if items.iter().any(|item| matches!(item, Item::Error)) {
            return Err(unsupported(format));
        }
        return Ok(eco_format!("{}", datetime.format_with_items(items.into_iter())));
    }

    let mut out = EcoString::new();
    let mut chars = format.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            out.push('%');
            continue;
        }

        let mut spec = Spec::default();
        while let Some(&flag) = chars.peek() {
            match flag {
                '-' => spec.left = true,
                '0' => spec.zero = true,
                '+' => spec.plus = true,
                ' ' => spec.space = true,
                _ => break,
            }
            chars.next();
        }
        spec.width = take_number(&mut chars, format)?.unwrap_or(0);
        if chars.peek() == Some(&'.') {
            chars.next();
            spec.precision = Some(take_number(&mut chars, format)?.unwrap_or(0));
        }
        spec.conversion = chars.next().ok_or_else(|| unsupported(format))?;
        out.push_str(&format_one(&spec, value).ok_or_else(|| unsupported(format))??);
    }
    Ok(out)
}

/// Largest width or precision a format may ask for.
const MAX_FORMAT_WIDTH: usize = 1024;

fn take_number(
    chars: &mut core::iter::Peekable<core::str::Chars<'_>>,
    format: &str,
) -> Result<Option<usize>, ScriptError> {
    let mut number = None;
    while let Some(digit) = chars.peek().and_then(|c| c.to_digit(10)) {
        let value = number
            .unwrap_or(0usize)
            .checked_mul(10)
            .and_then(|n| n.checked_add(digit as usize))
            .filter(|&n| n <= MAX_FORMAT_WIDTH)
            .ok_or_else(|| unsupported(format))?;
        number = Some(value);
        chars.next();
    }
    Ok(number)
}

fn unsupported(format: &str) -> ScriptError {
    ScriptError::custom(format!("Unsupported format: '{format}'"))
}

/// `None` for an unknown conversion character.
fn format_one(spec: &Spec, value: &Value) -> Option<Result<String, ScriptError>> {
    let body = match spec.conversion {
        'd' | 'i' => value.to_int().map(|i| signed(spec, i.to_string(), i < 0)),
        'x' => value.to_int().map(|i| format!("{i:x}")),
        'X' => value.to_int().map(|i| format!("{i:X}")),
        'o' => value.to_int().map(|i| format!("{i:o}")),
        'f' | 'F' => value.to_double().map(|d| {
            let text = format!("{:.*}", spec.precision.unwrap_or(6), d.abs());
            signed(spec, apply_sign(d, text), d < 0.0)
        }),
        'e' | 'E' => value.to_double().map(|d| {
            let text = format!("{:.*e}", spec.precision.unwrap_or(6), d.abs());
            let text = if spec.conversion == 'E' { text.to_uppercase() } else { text };
            signed(spec, apply_sign(d, text), d < 0.0)
        }),
        'g' | 'G' => value.to_double().map(|d| signed(spec, format!("{d}"), d < 0.0)),
        's' | 'S' => value.to_string().map(|s| match spec.precision {
            Some(precision) => s.chars().take(precision).collect(),
            None => s.as_str().to_owned(),
        }),
        _ => return None,
    };
    Some(body.map(|body| pad(spec, body)))
}

fn apply_sign(d: f64, text: String) -> String {
    if d < 0.0 { format!("-{text}") } else { text }
}

/// Add an explicit sign for the `+` and space flags.
fn signed(spec: &Spec, text: String, negative: bool) -> String {
    match (negative, spec.plus, spec.space) {
        (false, true, _) => format!("+{text}"),
        (false, false, true) => format!(" {text}"),
        _ => text,
    }
}

fn pad(spec: &Spec, body: String) -> String {
    let len = body.chars().count();
    if len >= spec.width {
        return body;
    }
    let fill = spec.width - len;
    if spec.left {
        format!("{body}{}", " ".repeat(fill))
    } else if spec.zero && spec.conversion != 's' {
        // Zeros go after the sign.
        let (sign, digits) = match body.chars().next() {
            Some(c @ ('-' | '+' | ' ')) => (c.to_string(), body[1..].to_string()),
            _ => (String::new(), body),
        };
        format!("{sign}{}{digits}", "0".repeat(fill))
    } else {
        format!("{}{body}", " ".repeat(fill))
    }
}

/// Compare strings with embedded numbers by their numeric value, so that
/// `"item 9"` sorts before `"item 10"`. Letters compare case-insensitively;
/// case only breaks ties.
pub(crate) fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a = a.chars().peekable();
    let mut b = b.chars().peekable();
    let mut tie_break = Ordering::Equal;
    loop {
        match (a.peek().copied(), b.peek().copied()) {
            (None, None) => return tie_break,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let x = take_digits(&mut a);
                let y = take_digits(&mut b);
                let x_trimmed = x.trim_start_matches('0');
                let y_trimmed = y.trim_start_matches('0');
                let ordering = x_trimmed
                    .len()
                    .cmp(&y_trimmed.len())
                    .then_with(|| x_trimmed.cmp(y_trimmed));
                if ordering.is_ne() {
                    return ordering;
                }
            }
            (Some(x), Some(y)) => {
                let ordering = x.to_lowercase().cmp(y.to_lowercase());
                if ordering.is_ne() {
                    return ordering;
                }
                tie_break = tie_break.then(x.cmp(&y));
                a.next();
                b.next();
            }
        }
    }
}

fn take_digits(chars: &mut core::iter::Peekable<core::str::Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(&c) = chars.peek() {
        if !c.is_ascii_digit() {
            break;
        }
        digits.push(c);
        chars.next();
    }
    digits
}

// ============================================================================
// Inspection Functions
// ============================================================================

/// Number of characters of a string, or of items of a collection.
pub(crate) fn length(ctx: &mut Context) -> Result<Value, ScriptError> {
    let input = ctx.input()?;
    item_count(&input)
}

pub(crate) fn item_count(value: &Value) -> Result<Value, ScriptError> {
    match value {
        Value::Error(error) => Err((**error).clone()),
        Value::Nil => Ok(Value::Int(0)),
        other => match other.item_count() {
            Some(count) => Ok(Value::Int(count as i64)),
            None => Err(ScriptError::conversion(other.type_name(), "collection")),
        },
    }
}

/// Register the string builtins.
pub fn register(ctx: &mut Context) {
    ctx.register_builtin(NativeFunction::new("to_upper", to_upper));
    ctx.register_builtin(NativeFunction::new("to_lower", to_lower));
    ctx.register_builtin(NativeFunction::new("to_title", to_title));
    ctx.register_builtin(NativeFunction::new("reverse", reverse));
    ctx.register_builtin(NativeFunction::new("trim", trim));
    ctx.register_builtin(NativeFunction::new("substring", substring));
    ctx.register_builtin(NativeFunction::new("contains", contains));
    ctx.register_builtin(NativeFunction::new("format", format));
    ctx.register_builtin(NativeFunction::new("sort_text", sort_text));
    ctx.register_builtin(NativeFunction::new("length", length));
}

#[cfg(test)]
#[path = "string_test.rs"]
mod string_test;
