use pretty_assertions::assert_eq;

use crate::parser::compile;
use crate::stdlib::register_stdlib;
use crate::values::Value;
use crate::vm::Context;

fn eval(source: &str) -> Value {
    let mut ctx = Context::new();
    register_stdlib(&mut ctx);
    let script = compile(source).unwrap_or_else(|e| panic!("{source}: {e:?}"));
    ctx.evaluate(&script, true)
        .unwrap_or_else(|e| panic!("{source}: {e}"))
}

fn eval_f64(source: &str) -> f64 {
    eval(source)
        .to_double()
        .unwrap_or_else(|e| panic!("{source}: {e}"))
}

#[test]
fn test_abs_keeps_integers() {
    assert_eq!(eval("abs(-5)").to_code(), "5");
    assert_eq!(eval("abs(-2.5)").to_code(), "2.5");
    assert_eq!(eval(r#"abs("-3")"#).to_code(), "3");
}

#[test]
fn test_unary_functions() {
    assert_eq!(eval("sqrt(16)").to_code(), "4.0");
    assert_eq!(eval("floor(2.7)").to_code(), "2.0");
    assert_eq!(eval("ceil(2.1)").to_code(), "3.0");
    assert!((eval_f64("log10(1000)") - 3.0).abs() < 1e-12);
    assert_eq!(eval("exp(0)").to_code(), "1.0");
    assert!((eval_f64("log(exp(2))") - 2.0).abs() < 1e-12);
}

#[test]
fn test_trigonometry() {
    assert!(eval_f64("sin(0)").abs() < 1e-12);
    assert!((eval_f64("cos_deg(60)") - 0.5).abs() < 1e-12);
    assert!((eval_f64("sin_deg(90)") - 1.0).abs() < 1e-12);
    assert!((eval_f64("tan_deg(45)") - 1.0).abs() < 1e-12);
}

#[test]
fn test_pow() {
    assert_eq!(eval("pow(2, exponent: 10)").to_code(), "1024.0");
    assert!(matches!(eval("pow(2)"), Value::Error(_)));
}

#[test]
fn test_random_real_in_range() {
    for _ in 0..50 {
        let x = eval_f64("random_real(begin: 2, end: 3)");
        assert!((2.0..3.0).contains(&x), "{x}");
    }
    let x = eval_f64("random_real()");
    assert!((0.0..1.0).contains(&x));
}

#[test]
fn test_random_int_in_range() {
    for _ in 0..50 {
        let i = eval("random_int(begin: -2, end: 3)").to_int().unwrap();
        assert!((-2..3).contains(&i), "{i}");
    }
    assert_eq!(eval("random_int(begin: 7, end: 8)").to_code(), "7");

    let error = eval("random_int(begin: 3, end: 3)");
    assert_eq!(
        error.as_error().map(ToString::to_string).as_deref(),
        Some("in function random_int: Can not pick a random integer between 3 and 3")
    );
}

#[test]
fn test_random_boolean_extremes() {
    assert_eq!(eval("random_boolean(0)").to_code(), "false");
    assert_eq!(eval("random_boolean(1)").to_code(), "true");
    assert!(matches!(eval("random_boolean()"), Value::Bool(_)));
}

#[test]
fn test_math_errors_are_delayed() {
    assert!(matches!(eval(r#"sqrt("four")"#), Value::Error(_)));
    assert_eq!(eval(r#"sqrt("four") or else -1"#).to_code(), "-1");
}
