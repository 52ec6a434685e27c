//! Compilation of source text to [`Script`]s.

mod compiler;
pub mod error;

use std::sync::Arc;

use tracing::debug;

use crate::api::CompilationOptions;
use crate::vm::Script;

pub use compiler::{Compiler, Precedence};
pub use error::{OpenBracket, ParseError, ParseErrorKind};

/// Compile an expression.
pub fn compile(source: &str) -> Result<Arc<Script>, Vec<ParseError>> {
    compile_with(source, &CompilationOptions::default())
}

/// Compile a source that is the body of a string literal, like
/// `Hello {name}!`.
pub fn compile_string_mode(source: &str) -> Result<Arc<Script>, Vec<ParseError>> {
    compile_with(source, &CompilationOptions { string_mode: true })
}

pub fn compile_with(
    source: &str,
    options: &CompilationOptions,
) -> Result<Arc<Script>, Vec<ParseError>> {
    let (script, errors) = compile_lenient_with(source, options);
    if errors.is_empty() {
        Ok(script)
    } else {
        Err(errors)
    }
}

/// Compile and report errors alongside a script that is still runnable:
/// every part that failed to parse evaluates to `nil`.
pub fn compile_lenient(source: &str) -> (Arc<Script>, Vec<ParseError>) {
    compile_lenient_with(source, &CompilationOptions::default())
}

fn compile_lenient_with(
    source: &str,
    options: &CompilationOptions,
) -> (Arc<Script>, Vec<ParseError>) {
    let (script, errors) = Compiler::new(source, options).compile();
    debug!(
        length = source.len(),
        instructions = script.instructions().len(),
        errors = errors.len(),
        string_mode = options.string_mode,
        "compiled script"
    );
    (script, errors)
}
