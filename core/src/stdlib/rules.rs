//! Rules
//!
//! A rule is a function that, when called, does not do its work but returns
//! a closure capturing the arguments of the call. `format_rule(format: "%03d")`
//! is a function that pads its input to three digits.

use std::sync::Arc;

use super::{collection, string};
use crate::errors::ScriptError;
use crate::values::{Function, NativeFunction, Value};
use crate::vm::Context;

fn rule_of(function: NativeFunction) -> Value {
    Value::Function(Function::Rule(Arc::new(Value::native(function))))
}

/// `rule(f)` turns any function into a rule.
fn rule(ctx: &mut Context) -> Result<Value, ScriptError> {
    let function = ctx.input()?.into_result()?;
    if !function.is_function() {
        return Err(ScriptError::conversion(function.type_name(), "function"));
    }
    Ok(Value::Function(Function::Rule(Arc::new(function))))
}

/// Register `rule` and the rule forms of `format`, `sort_text` and
/// `filter_list`.
pub fn register(ctx: &mut Context) {
    ctx.register_builtin(NativeFunction::new("rule", rule));

    ctx.set("format_rule", rule_of(NativeFunction::new("format", string::format)));
    ctx.set("sort_rule", rule_of(NativeFunction::new("sort_text", string::sort_text)));
    ctx.set(
        "filter_rule",
        rule_of(NativeFunction::new("filter_list", collection::filter_list)),
    );
}

#[cfg(test)]
mod tests {
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

    #[test]
    fn test_format_rule() {
        assert_eq!(eval(r#"pad := format_rule(format: "%03d"); pad(5)"#).to_code(), r#""005""#);
    }

    #[test]
    fn test_sort_rule() {
        assert_eq!(eval(r#"letters := sort_rule(); letters("cab")"#).to_code(), r#""abc""#);
        assert_eq!(
            eval(r#"only := sort_rule(order: "xy"); only("yaxbx")"#).to_code(),
            r#""xxy""#
        );
    }

    #[test]
    fn test_filter_rule() {
        assert_eq!(
            eval("big := filter_rule(filter: { input > 2 }); big([1, 5, 2, 3])").to_code(),
            "[5, 3]"
        );
    }

    #[test]
    fn test_rule_of_script_function() {
        let source = "add := rule({ input + amount })
            add_two := add(amount: 2)
            add_two(3)";
        assert_eq!(eval(source).to_code(), "5");
    }

    #[test]
    fn test_rule_arguments_can_be_overridden() {
        let source = r#"pad := format_rule(format: "%03d"); pad(7, format: "%d!")"#;
        assert_eq!(eval(source).to_code(), r#""7!""#);
    }

    #[test]
    fn test_rule_of_non_function() {
        assert!(matches!(eval("rule(1)"), Value::Error(_)));
    }
}
