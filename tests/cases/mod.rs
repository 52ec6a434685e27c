#![allow(dead_code, unused_macros)]

use cardscript::{CompilationOptions, Engine, Error, ExecutionOptions, render_error_to_string_no_color};
use once_cell::sync::Lazy;

pub static ENGINE: Lazy<Engine> = Lazy::new(Engine::default);

/// Small limits keep runaway recursion well inside the test thread's stack.
pub fn test_limits() -> ExecutionOptions {
    ExecutionOptions {
        max_depth: 40,
        max_iterations: Some(100_000),
    }
}

fn run(source: &str, string_mode: bool) -> Result<cardscript::Value, Error> {
    ENGINE.run_with(source, &CompilationOptions { string_mode }, test_limits())
}

/// Evaluate and print the result as code.
pub fn eval_code(source: &str) -> String {
    match run(source, false) {
        Ok(value) => value.to_code().to_string(),
        Err(error) => panic!(
            "{source} failed:\n{}",
            render_error_to_string_no_color(&error, source)
        ),
    }
}

/// Evaluate in string mode and print the result as code.
pub fn eval_string_mode(source: &str) -> String {
    match run(source, true) {
        Ok(value) => value.to_code().to_string(),
        Err(error) => panic!(
            "{source} failed:\n{}",
            render_error_to_string_no_color(&error, source)
        ),
    }
}

/// The message of the runtime error raised by `source`.
pub fn eval_error(source: &str) -> String {
    match run(source, false) {
        Ok(value) => panic!("{source} should fail, got {}", value.to_code()),
        Err(error) => match error.script_error() {
            Some(error) => error.to_string(),
            None => panic!("{source} should fail at runtime, got {error}"),
        },
    }
}

/// The messages of the diagnostics reported when compiling `source`.
pub fn compile_errors(source: &str) -> Vec<String> {
    match ENGINE.compile(source) {
        Ok(_) => panic!("{source} should not compile"),
        Err(Error::Compilation { diagnostics }) => {
            diagnostics.into_iter().map(|d| d.message).collect()
        }
        Err(other) => panic!("{source}: unexpected error {other}"),
    }
}

macro_rules! test_case {
    ($name:ident, input: $input:expr, value: $value:expr $(,)?) => {
        #[test]
        fn $name() {
            pretty_assertions::assert_eq!($crate::cases::eval_code($input), $value);
        }
    };
    ($name:ident, input: $input:expr, error: $error:expr $(,)?) => {
        #[test]
        fn $name() {
            pretty_assertions::assert_eq!($crate::cases::eval_error($input), $error);
        }
    };
    ($name:ident, input: $input:expr, compile_error: $error:expr $(,)?) => {
        #[test]
        fn $name() {
            pretty_assertions::assert_eq!($crate::cases::compile_errors($input), vec![$error]);
        }
    };
}
