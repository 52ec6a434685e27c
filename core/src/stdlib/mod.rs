//! Cardscript Standard Library
//!
//! The builtin functions every card script can call, grouped by area:
//! - Basic: debugging output and conversions
//! - Math: arithmetic helpers, trigonometry and randomness
//! - String: text manipulation and `printf` style formatting
//! - Collection: searching, filtering, sorting and sampling
//! - Rules: closure factories such as `format_rule`
//!
//! Builtins are native functions bound as variables of the outermost scope.
//! They read their arguments with the `Context::param` helpers and report
//! failures as errors, which the VM turns into DelayedErrors.

use crate::vm::Context;

pub mod basic;
pub mod collection;
pub mod hooks;
pub mod math;
pub mod rules;
pub mod string;

pub use hooks::{IncludeResolver, KeywordExpander, register_include_resolver, register_keyword_expander};

/// Register the whole standard library in `ctx`.
///
/// The `include_file` and `expand_keywords` hooks get their default
/// behaviour; a host replaces them with [`register_include_resolver`] and
/// [`register_keyword_expander`].
pub fn register_stdlib(ctx: &mut Context) {
    basic::register(ctx);
    math::register(ctx);
    string::register(ctx);
    collection::register(ctx);
    rules::register(ctx);
    hooks::register(ctx);
}
