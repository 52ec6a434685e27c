use core::cmp::Ordering;

use pretty_assertions::assert_eq;

use super::*;
use crate::parser::compile;
use crate::stdlib::register_stdlib;

fn eval(source: &str) -> Value {
    let mut ctx = Context::new();
    register_stdlib(&mut ctx);
    let script = compile(source).unwrap_or_else(|e| panic!("{source}: {e:?}"));
    ctx.evaluate(&script, true)
        .unwrap_or_else(|e| panic!("{source}: {e}"))
}

fn eval_code(source: &str) -> String {
    eval(source).to_code().to_string()
}

fn fmt(format: &str, value: impl Into<Value>) -> String {
    format_value(format, &value.into())
        .unwrap_or_else(|e| panic!("{format}: {e}"))
        .to_string()
}

#[test]
fn test_case_conversion() {
    assert_eq!(eval_code(r#"to_upper("Hello")"#), r#""HELLO""#);
    assert_eq!(eval_code(r#"to_lower("Hello")"#), r#""hello""#);
    assert_eq!(eval_code(r#"to_title("the DARK knight")"#), r#""The Dark Knight""#);
    assert_eq!(eval_code(r#"to_upper("straße")"#), r#""STRASSE""#);
}

#[test]
fn test_reverse_and_trim() {
    assert_eq!(eval_code(r#"reverse("abc")"#), r#""cba""#);
    assert_eq!(eval_code(r#"trim("  a b  ")"#), r#""a b""#);
}

#[test]
fn test_substring() {
    assert_eq!(eval_code(r#"substring("abcdef", begin: 2)"#), r#""cdef""#);
    assert_eq!(eval_code(r#"substring("abcdef", begin: 1, end: 3)"#), r#""bc""#);
    assert_eq!(eval_code(r#"substring("abc", begin: 2, end: 100)"#), r#""c""#);
    assert_eq!(eval_code(r#"substring("abc", begin: 5)"#), r#""""#);
    assert_eq!(eval_code(r#"substring("héllo", end: 2)"#), r#""hé""#);
}

#[test]
fn test_contains() {
    assert_eq!(eval_code(r#"contains("flying", match: "fly")"#), "true");
    assert_eq!(eval_code(r#"contains("flying", match: "swim")"#), "false");
}

#[test]
fn test_sort_text() {
    assert_eq!(eval_code(r#"sort_text("banana")"#), r#""aaabnn""#);
    assert_eq!(eval_code(r#"sort_text("WUBRG", order: "WUBRG")"#), r#""WUBRG""#);
    assert_eq!(eval_code(r#"sort_text("GRW", order: "WUBRG")"#), r#""WRG""#);
}

#[test]
fn test_length() {
    assert_eq!(eval_code(r#"length("héllo")"#), "5");
    assert_eq!(eval_code("length([1, 2, a: 3])"), "3");
    assert_eq!(eval_code("length(nil)"), "0");
    assert!(matches!(eval("length(5)"), Value::Error(_)));
}

#[test]
fn test_format_builtin() {
    assert_eq!(eval_code(r#"format(7, format: "%03d")"#), r#""007""#);
    assert_eq!(eval_code(r#"format("x", format: "[%5s]")"#), r#""[    x]""#);
}

#[test]
fn test_format_integers() {
    assert_eq!(fmt("%d", 42i64), "42");
    assert_eq!(fmt("%i", -42i64), "-42");
    assert_eq!(fmt("%5d", 42i64), "   42");
    assert_eq!(fmt("%-5d|", 42i64), "42   |");
    assert_eq!(fmt("%05d", -42i64), "-0042");
    assert_eq!(fmt("%+d", 42i64), "+42");
    assert_eq!(fmt("%x %X %o", 255i64), "ff FF 377");
    assert_eq!(fmt("%d", 2.9), "2");
}

#[test]
fn test_format_floats() {
    assert_eq!(fmt("%f", 1.5), "1.500000");
    assert_eq!(fmt("%.2f", 3.14159), "3.14");
    assert_eq!(fmt("%.0f", 2.0), "2");
    assert_eq!(fmt("%8.3f", -1.0), "  -1.000");
    assert_eq!(fmt("%e", 1234.5), "1.234500e3");
}

#[test]
fn test_format_strings_and_literals() {
    assert_eq!(fmt("%s!", "hi"), "hi!");
    assert_eq!(fmt("%.2s", "hello"), "he");
    assert_eq!(fmt("100%%", 0i64), "100%");
    assert_eq!(fmt("no conversions", 1i64), "no conversions");
}

#[test]
fn test_format_errors() {
    assert!(format_value("%q", &Value::Int(1)).is_err());
    assert!(format_value("%", &Value::Int(1)).is_err());
    assert!(format_value("%d", &Value::string("abc")).is_err());
}

#[test]
fn test_format_width_is_bounded() {
    assert!(format_value("%99999999999999999999d", &Value::Int(1)).is_err());
    assert!(format_value("%2000d", &Value::Int(1)).is_err());
    assert!(format_value("%.5000f", &Value::Double(1.0)).is_err());
    assert_eq!(fmt("%1024d", 1i64).len(), 1024);
    assert!(eval(r#"format(1, format: "%99999999999999999999d")"#)
        .as_error()
        .is_some());
}

#[test]
fn test_natural_cmp() {
    assert_eq!(natural_cmp("item 9", "item 10"), Ordering::Less);
    assert_eq!(natural_cmp("a", "B"), Ordering::Less);
    assert_eq!(natural_cmp("x2", "x02"), Ordering::Equal);
    assert_eq!(natural_cmp("abc", "ab"), Ordering::Greater);
}

#[test]
fn test_natural_cmp_case_breaks_ties_only() {
    assert_eq!(natural_cmp("Item 9", "item 10"), Ordering::Less);
    assert_eq!(natural_cmp("Abc", "abc"), Ordering::Less);
}
