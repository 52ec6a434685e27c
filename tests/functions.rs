#[macro_use]
mod cases;

use indoc::indoc;

test_case!(call_with_input, input: "double := { input * 2 }; double(21)", value: "42");
test_case!(named_arguments, input: "f := { a - b }; f(b: 1, a: 10)", value: "9");
test_case!(positional_arguments, input: "f := { input + _1 }; f(1, 2)", value: "3");
test_case!(
    recursion,
    input: "fact := { if input <= 1 then 1 else input * fact(input - 1) }; fact(10)",
    value: "3628800",
);
test_case!(
    callee_sees_caller_variables,
    input: "bonus := 2; f := { input + bonus }; f(1)",
    value: "3",
);
test_case!(
    arguments_shadow_caller_variables,
    input: "bonus := 2; f := { input + bonus }; f(1, bonus: 10)",
    value: "11",
);
test_case!(
    assignments_in_call_stay_local,
    input: "x := 1; f := { x := 99; x }; f() + x",
    value: "100",
);
test_case!(
    composition_pipes_results,
    input: "f := { input + 1 } + { input * 2 }; f(3)",
    value: "8",
);
test_case!(
    closure_binds_arguments,
    input: "add := { a + b }; inc := add@(b: 1); inc(a: 41)",
    value: "42",
);
test_case!(
    closure_arguments_can_be_overridden,
    input: "add := { a + b }; inc := add@(b: 1); inc(a: 1, b: 5)",
    value: "6",
);
test_case!(
    closure_of_builtin,
    input: r#"pad := format@(format: "%02d"); pad(7) + pad(12)"#,
    value: r#""0712""#,
);
test_case!(
    higher_order,
    input: "twice := { f(f(input)) }; twice(3, f: { input * input })",
    value: "81",
);

test_case!(format_rule, input: r#"pad := format_rule(format: "%03d"); pad(5)"#, value: r#""005""#);
test_case!(
    filter_rule,
    input: "big := filter_rule(filter: { input > 2 }); big([1, 5, 2, 3])",
    value: "[5, 3]",
);
test_case!(
    rule_of_script_function,
    input: indoc! {"
        add := rule({ input + amount })
        add_two := add(amount: 2)
        add_two(3)
    "},
    value: "5",
);

test_case!(
    native_function_prints_its_name,
    input: "to_upper",
    value: "<function to_upper>",
);
test_case!(type_of_function, input: "type_name({ 1 })", value: r#""function""#);
