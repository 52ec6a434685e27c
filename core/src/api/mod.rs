//! Public API for the cardscript language.
//!
//! The [`Engine`] is the entry point for hosts: it compiles sources, builds
//! contexts with the builtin library and the host's hooks installed, and
//! reports failures as [`Error`]s with diagnostics.
//!
//! # Example
//!
//! ```
//! use cardscript_core::api::{Engine, EngineOptions, Error};
//!
//! let engine = Engine::new(EngineOptions::default());
//!
//! let value = engine.run("for x from 1 to 4 do x").unwrap();
//! assert_eq!(value.to_int().unwrap(), 10);
//!
//! match engine.run("(1 +") {
//!     Err(Error::Compilation { diagnostics }) => assert_eq!(diagnostics.len(), 1),
//!     _ => unreachable!(),
//! }
//! ```

pub mod engine;
pub mod error;
pub mod options;

pub use engine::Engine;
pub use error::{Diagnostic, Error, RelatedInfo, Severity};
pub use options::{CompilationOptions, EngineOptions, ExecutionOptions};
