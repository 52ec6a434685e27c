//! Cardscript - the scripting language of card templates
//!
//! # Overview
//!
//! Cardscript is a small dynamically typed language used inside card
//! templates to compute field values, build text and pick styles. Scripts
//! are short expressions such as
//!
//! ```text
//! if card.rarity = "rare" then "gold" else "silver"
//! ```
//!
//! compiled once to bytecode and evaluated many times.
//!
//! # Quick Start
//!
//! ```
//! use cardscript::{Engine, EngineOptions};
//!
//! let engine = Engine::new(EngineOptions::default());
//! let result = engine.run("to_upper(\"goblin\") + \" guide\"").unwrap();
//! assert_eq!(result.to_string().unwrap(), "GOBLIN guide");
//! ```
//!
//! # Hosts
//!
//! Hosts evaluate scripts in a [`Context`] holding their own variables.
//! Native functions read their arguments by name:
//!
//! ```
//! use cardscript::{Engine, NativeFunction, Value, compile};
//!
//! let engine = Engine::default();
//! let mut ctx = engine.new_context();
//! ctx.register_builtin(NativeFunction::new("double", |ctx| {
//!     let input: i64 = ctx.param("input")?;
//!     Ok(Value::Int(input * 2))
//! }));
//!
//! let script = compile("double(21)").unwrap();
//! assert_eq!(ctx.evaluate(&script, true).unwrap().to_int().unwrap(), 42);
//! ```

mod error_renderer;

// Re-export public API from cardscript_core
pub use cardscript_core::api::{
    CompilationOptions, Diagnostic, Engine, EngineOptions, Error, ExecutionOptions, RelatedInfo,
    Severity,
};
pub use cardscript_core::stdlib::{IncludeResolver, KeywordExpander};
pub use cardscript_core::{Context, Script, ScriptError, compile, compile_lenient, compile_string_mode};

// Re-export commonly used values
pub use cardscript_core::values::{self, Collection, Color, Function, NativeFunction, ScriptObject, Value};

pub use error_renderer::{
    render_error, render_error_to, render_error_to_string, render_error_to_string_no_color,
};
