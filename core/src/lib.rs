//! Core of the cardscript language: a small dynamically typed scripting
//! language for card templates.
//!
//! Source text is compiled in a single pass ([`parser`]) to bytecode
//! ([`vm::Script`]) that runs on a stack machine ([`vm::Context`]). Values
//! ([`values::Value`]) are cheap to clone; errors that happen while computing
//! a value are carried along as DelayedErrors until the value is used.
//!
//! # Example
//!
//! ```
//! use cardscript_core::{Context, compile, stdlib};
//!
//! let script = compile("to_upper(name) + \"!\"").unwrap();
//! let mut ctx = Context::new();
//! stdlib::register_stdlib(&mut ctx);
//! ctx.set("name", "goblin");
//! let value = ctx.evaluate(&script, true).unwrap();
//! assert_eq!(value.to_string().unwrap(), "GOBLIN!");
//! ```

pub mod api;
pub mod errors;
pub mod intern;
pub mod lexer;
pub mod parser;
pub mod scope_stack;
pub mod stdlib;
pub mod values;
pub mod vm;

pub use api::Engine;
pub use errors::ScriptError;
pub use parser::{compile, compile_lenient, compile_string_mode};
pub use values::Value;
pub use vm::{Context, Script};

/// Test utilities for enabling logging in tests
#[cfg(test)]
pub mod test_utils {
    /// Initialize tracing subscriber for tests with DEBUG level
    /// Call this at the start of tests where you want to see logging output
    ///
    /// # Example
    /// ```ignore
    /// #[test]
    /// fn test_for_loop() {
    ///     test_utils::init_test_logging();
    ///     // ... your test code
    /// }
    /// ```
    pub fn init_test_logging() {
        use tracing_subscriber::{EnvFilter, fmt};

        // Try to initialize, ignore error if already initialized
        let _ = fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .with_test_writer()
            .try_init();
    }
}
