use pretty_assertions::assert_eq;

use super::*;
use crate::api::ExecutionOptions;
use crate::errors::ScriptError;
use crate::intern::VarId;
use crate::parser::compile;
use crate::parser::compile_lenient;
use crate::values::{Function, NativeFunction, Value};
use crate::vm::Script;

fn eval_in(ctx: &mut Context, source: &str) -> Result<Value, ScriptError> {
    let script = compile(source).unwrap_or_else(|e| panic!("{source}: {e:?}"));
    ctx.evaluate(&script, true)
}

fn eval(source: &str) -> Value {
    eval_in(&mut Context::new(), source).unwrap_or_else(|e| panic!("{source}: {e}"))
}

fn eval_code(source: &str) -> String {
    eval(source).to_code().to_string()
}

fn eval_err(source: &str) -> ScriptError {
    eval_in(&mut Context::new(), source).expect_err("expected a script error")
}

#[test]
fn test_arithmetic() {
    assert_eq!(eval_code("1 + 2 * 3"), "7");
    assert_eq!(eval_code("2 ^ 3 ^ 2"), "512");
    assert_eq!(eval_code("7 div 2 + 7 mod 2"), "4");
    assert_eq!(eval_code("-(2 + 3)"), "-5");
    assert_eq!(eval_code("1 / 4"), "0.25");
}

#[test]
fn test_strings_and_interpolation() {
    assert_eq!(eval_code(r#""a{1 + 1}b""#), r#""a2b""#);
    assert_eq!(eval_code(r#""x" + 1"#), r#""x1""#);
}

#[test]
fn test_short_circuit() {
    assert_eq!(eval_code("false and (1/0)"), "false");
    assert_eq!(eval_code("true or not_set_anywhere"), "true");
    assert_eq!(eval_code("true and 1 < 2"), "true");
    assert_eq!(eval_code("true xor true"), "false");
}

#[test]
fn test_assignment_and_sequence() {
    assert_eq!(eval_code("x := 2; y := x * 3; x + y"), "8");
    assert_eq!(eval_code("x := 2\nx := x + 1\nx"), "3");
}

#[test]
fn test_if_and_case() {
    assert_eq!(eval_code(r#"if 1 < 2 then "yes" else "no""#), r#""yes""#);
    assert_eq!(eval_code("if false then 1"), "nil");
    assert_eq!(
        eval_code(r#"case 2 of 1: "one", 2: "two", else: "many""#),
        r#""two""#
    );
    assert_eq!(eval_code(r#"case 5 of 1: "one", else: "many""#), r#""many""#);
    assert_eq!(eval_code(r#"case 5 of 1: "one""#), "nil");
}

#[test]
fn test_for_loops_add_results() {
    crate::test_utils::init_test_logging();
    assert_eq!(eval_code("for x in [1,2,3] do x*2"), "12");
    assert_eq!(eval_code("for each x in [1,2,3] do x"), "6");
    assert_eq!(eval_code("for x from 1 to 4 do x"), "10");
    assert_eq!(eval_code("for x in [] do x"), "nil");
    assert_eq!(
        eval_code(r#"for each k: v in [a: 1, b: 2] do k + "={v};""#),
        r#""a=1;b=2;""#
    );
    assert_eq!(eval_code("for x in [1, 2] do [x]"), "[1, 2]");
}

#[test]
fn test_collections_and_members() {
    assert_eq!(eval_code("[1, 2, 3][1]"), "2");
    assert_eq!(eval_code("[name: 1, other: 2].other"), "2");
    assert_eq!(eval_code(r#"[a: 1]["a"]"#), "1");
    assert!(matches!(eval("[1].missing"), Value::Error(_)));
    assert_eq!(eval_code("[1].missing or else 0"), "0");
}

#[test]
fn test_function_calls() {
    assert_eq!(eval_code("f := { input * 2 }; f(21)"), "42");
    assert_eq!(eval_code("f := { input + _1 }; f(1, 2)"), "3");
    assert_eq!(eval_code("f := { a - b }; f(b: 1, a: 10)"), "9");
    assert_eq!(
        eval_code("fact := { if input <= 1 then 1 else input * fact(input - 1) }; fact(10)"),
        "3628800"
    );
}

#[test]
fn test_function_composition() {
    assert_eq!(eval_code("f := { input + 1 } + { input * 2 }; f(3)"), "8");
}

#[test]
fn test_closures_are_independent() {
    let source = "f := { a + b }
        g := f@(b: 1)
        h := f@(b: 10)
        [g(a: 1), h(a: 1), g(a: 1, b: 5)]";
    assert_eq!(eval_code(source), "[2, 11, 6]");
}

#[test]
fn test_make_closure_captures_current_scope() {
    let mut ctx = Context::new();
    ctx.set("outer", 1i64);
    ctx.open_scope();
    ctx.set("b", 2i64);
    let function = eval_in(&mut ctx, "{ a + b }").unwrap();
    let closure = ctx.make_closure(function);
    ctx.close_scope();

    match &closure {
        Value::Closure(closure) => {
            let names: Vec<String> = closure
                .bindings()
                .iter()
                .map(|(var, _)| var.name().to_string())
                .collect();
            assert_eq!(names, vec!["b".to_string()]);
        }
        other => panic!("expected a closure, got {other:?}"),
    }
    ctx.set("f", closure);
    assert_eq!(eval_in(&mut ctx, "f(a: 1)").unwrap().to_code(), "3");
}

#[test]
fn test_scope_does_not_leak() {
    let mut ctx = Context::new();
    eval_in(&mut ctx, "for x in [1, 2] do y := x").unwrap();
    assert!(ctx.get("y").is_err());
    assert!(ctx.get("x").is_err());

    // Call arguments are unbound when the call returns.
    let script = compile("f := { input }; f(5)").unwrap();
    ctx.evaluate(&script, false).unwrap();
    assert!(ctx.get_variable(VarId::INPUT).is_err());
    assert!(ctx.get("f").is_ok());
}

#[test]
fn test_inner_assignment_restores_outer_binding() {
    let mut ctx = Context::new();
    ctx.set("x", 1i64);
    assert_eq!(eval_in(&mut ctx, "x := 5; x").unwrap().to_code(), "5");
    assert_eq!(ctx.get("x").unwrap().to_code(), "1");
}

#[test]
fn test_unset_variable() {
    assert_eq!(
        eval_err("unset_var"),
        ScriptError::NoSuchVariable {
            name: "unset_var".into()
        }
    );
}

#[test]
fn test_delayed_errors_and_or_else() {
    assert!(matches!(
        eval("1 / 0").as_error(),
        Some(ScriptError::DivisionByZero)
    ));
    assert_eq!(eval_code("(1 / 0) or else 5"), "5");
    assert_eq!(eval_code(r#"("abc" - 1) or else 0"#), "0");
    assert_eq!(eval_code("(1 / 0) + 2 or else 3"), "3");
    // Using a delayed error as a condition raises it.
    assert_eq!(eval_err("if 1 / 0 then 1"), ScriptError::DivisionByZero);
}

#[test]
fn test_assert() {
    assert_eq!(eval_code("assert(1 < 2)"), "nil");
    assert_eq!(
        eval_err("assert(1 > 2)"),
        ScriptError::AssertionFailed {
            message: "line 1: 1 > 2".into()
        }
    );
}

#[test]
fn test_native_errors_are_delayed() {
    let mut ctx = Context::new();
    ctx.register_builtin(NativeFunction::new("fail", |_| {
        Err(ScriptError::custom("boom"))
    }));

    let value = eval_in(&mut ctx, "fail()").unwrap();
    assert_eq!(
        value.as_error().map(ToString::to_string),
        Some("in function fail: boom".to_string())
    );
    assert_eq!(eval_in(&mut ctx, r#"fail() or else "ok""#).unwrap().to_code(), r#""ok""#);
    assert_eq!(ctx.stack_depth(), 0);
}

#[test]
fn test_script_errors_propagate_with_function_name() {
    let error = eval_err("check := { assert(input > 0) }; check(-1) or else 0");
    assert_eq!(
        error.to_string(),
        "in function check: Assertion failure: line 1: input > 0"
    );
    assert!(matches!(error.root_cause(), ScriptError::AssertionFailed { .. }));
}

#[test]
fn test_native_reads_parameters() {
    let mut ctx = Context::new();
    ctx.register_builtin(NativeFunction::new("scale", |ctx| {
        let input: f64 = ctx.param("input")?;
        let factor: f64 = ctx.param_or("factor", 2.0)?;
        Ok(Value::Double(input * factor))
    }));
    assert_eq!(eval_in(&mut ctx, "scale(1.5)").unwrap().to_code(), "3.0");
    assert_eq!(eval_in(&mut ctx, "scale(1, factor: 10)").unwrap().to_code(), "10.0");
}

#[test]
fn test_stack_overflow() {
    let mut ctx = Context::with_options(ExecutionOptions {
        max_depth: 50,
        max_iterations: None,
    });
    let error = eval_in(&mut ctx, "f := { f() }; f()").unwrap_err();
    assert!(matches!(
        error.root_cause(),
        ScriptError::StackOverflow { max_depth: 50, .. }
    ));
    assert!(error.is_fatal());
    assert_eq!(ctx.stack_depth(), 0);
    assert_eq!(ctx.depth(), 0);
}

#[test]
fn test_iteration_limit() {
    let mut ctx = Context::with_options(ExecutionOptions {
        max_depth: 500,
        max_iterations: Some(5),
    });
    assert_eq!(
        eval_in(&mut ctx, "for x from 1 to 100 do x").unwrap_err(),
        ScriptError::IterationLimit { limit: 5 }
    );
    assert_eq!(ctx.stack_depth(), 0);
}

#[test]
fn test_stack_balance() {
    let sources = [
        "1",
        "1 + 2 * 3",
        "x := 1; x",
        "if true then 1 else 2",
        "case 3 of 1: 1, 2: 2, else: 3",
        "for x in [1, 2, 3] do x",
        "for each k: v in [a: 1] do k",
        "f := { input }; f(1)",
        "[1, 2, a: 3]",
        "min(3, 1, 2) + max(1, 2)",
        "rgb(1, 2, 3)",
        "(1 / 0) or else 2",
        "false or (true and false)",
        r#""a{1}b{2}c""#,
    ];
    let mut ctx = Context::new();
    for source in sources {
        let before = ctx.stack_depth();
        eval_in(&mut ctx, source).unwrap_or_else(|e| panic!("{source}: {e}"));
        assert_eq!(ctx.stack_depth(), before, "unbalanced stack for {source}");
    }

    // Also along error paths.
    for source in ["unset_var + 1", "[1, 2, f()]", "if 1/0 then 1"] {
        assert!(eval_in(&mut ctx, source).is_err());
        assert_eq!(ctx.stack_depth(), 0, "unbalanced stack for {source}");
    }
}

/// Every jump of `script` and of the functions it defines lands inside
/// its own script.
fn assert_jumps_valid(script: &Script, source: &str) {
    let len = script.instructions().len() as u32;
    for instruction in script.instructions() {
        if let Some(target) = instruction.jump_target() {
            assert!(target < len, "jump out of bounds in {source}: {instruction:?}");
        }
    }
    for constant in script.constants() {
        if let Value::Function(Function::Script(inner)) = constant {
            assert_jumps_valid(inner, source);
        }
    }
}

#[test]
fn test_stack_balance_of_generated_expressions() {
    let operands = ["1", "2.5", "\"s\"", "x", "nil", "[1, a: 2]", "(1 / 0)", "f(2)"];
    let forms = [
        "A + B",
        "A - B",
        "A * B",
        "A / B",
        "A div B",
        "A mod B",
        "A ^ B",
        "A = B",
        "A != B",
        "A < B",
        "A >= B",
        "A and B",
        "A or B",
        "A xor B",
        "A or else B",
        "not A",
        "-A",
        "x := A",
        "A and x := B",
        "A or x := B",
        "A + x := B",
        "if A then B else A",
        "if A then B",
        "case A of 1: B, else: A",
        "for i in [A, B] do i",
        "for each k: v in [A, b: B] do k",
        "for i from 1 to 3 do A",
        "\"t{A}u{B}\"",
        "min(A, B)",
        "max(A, B, A)",
        "rgb(A, B, 1)",
        "[A, k: B]",
        "A; B",
        "A\nB",
        "f(A) + g(input: B)",
        "{ A + input }(B)",
        "f@(input: A)(B)",
        "assert(A or true)",
        "y := B; A",
    ];

    let mut ctx = Context::new();
    ctx.set("x", 3i64);
    let identity = eval_in(&mut ctx, "{ input }").unwrap();
    ctx.set("f", identity.clone());
    ctx.set("g", identity);

    for form in forms {
        for a in operands {
            for b in operands {
                let source = form.replace('A', a).replace('B', b);
                let (script, _errors) = compile_lenient(&source);
                assert_jumps_valid(&script, &source);

                let before = ctx.stack_depth();
                // Errors are fine here, only the stack discipline matters.
                let _ = ctx.evaluate(&script, true);
                assert_eq!(ctx.stack_depth(), before, "unbalanced stack for {source}");
                assert_eq!(ctx.depth(), 0, "unbalanced depth for {source}");
            }
        }
    }
}

#[test]
fn test_long_composition_chain() {
    let mut ctx = Context::new();
    assert_eq!(
        eval_in(&mut ctx, "f := for i from 1 to 20000 do { input }; f(1)")
            .unwrap()
            .to_code(),
        "1"
    );
    assert_eq!(ctx.depth(), 0);
}

#[test]
fn test_compositions_are_flat() {
    match eval("{ input } + { input } + ({ input } + { input })") {
        Value::Function(Function::Compose(parts)) => assert_eq!(parts.len(), 4),
        other => panic!("expected a composition, got {other:?}"),
    }
    assert_eq!(
        eval_code("f := { input + 1 } + { input * 2 } + { input - 3 }; f(3)"),
        "5"
    );
}

#[test]
fn test_closure_of_closure_keeps_outer_arguments() {
    let source = "f := { a + b }; g := f@(b: 1)@(a: 2, b: 5); [g(), g(b: 0)]";
    assert_eq!(eval_code(source), "[7, 2]");
}

#[test]
fn test_nested_closures_and_compositions_count_depth() {
    let source = format!(
        "g := {{ input }}\n{}g(1)",
        "g := (g + g)@(a: 1)\n".repeat(12)
    );
    assert_eq!(eval_code(&source), "1");

    let mut ctx = Context::with_options(ExecutionOptions {
        max_depth: 10,
        max_iterations: None,
    });
    let error = eval_in(&mut ctx, &source).unwrap_err();
    assert!(matches!(
        error.root_cause(),
        ScriptError::StackOverflow { max_depth: 10, .. }
    ));
    assert_eq!(ctx.stack_depth(), 0);
    assert_eq!(ctx.depth(), 0);
}

#[test]
fn test_colors_and_min_max() {
    assert_eq!(eval_code("rgb(255, 0, 0)"), "rgb(255,0,0)");
    assert_eq!(eval_code("min(3, 1, 2)"), "1");
    assert_eq!(eval_code("max(3, 1, 2)"), "3");
    assert_eq!(eval_code("min()"), "nil");
}
