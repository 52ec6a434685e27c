//! The cardscript engine.

use std::sync::Arc;

use tracing::debug;

use super::{CompilationOptions, EngineOptions, Error, ExecutionOptions};
use crate::parser;
use crate::stdlib::{self, IncludeResolver, KeywordExpander};
use crate::values::Value;
use crate::vm::{Context, Script};

/// Compiles scripts and builds contexts that can run them.
///
/// The engine manages:
/// - Default compilation and execution options
/// - Host hooks installed into every new context
///
/// # Example
///
/// ```
/// use cardscript_core::api::{Engine, EngineOptions};
///
/// let engine = Engine::new(EngineOptions::default());
/// let result = engine.run("x := 20; x * 2 + 2").unwrap();
/// assert_eq!(result.to_int().unwrap(), 42);
/// ```
#[derive(Default, Clone)]
pub struct Engine {
    options: EngineOptions,
    include_resolver: Option<Arc<dyn IncludeResolver>>,
    keyword_expander: Option<Arc<dyn KeywordExpander>>,
}

impl Engine {
    pub fn new(options: EngineOptions) -> Self {
        Self {
            options,
            include_resolver: None,
            keyword_expander: None,
        }
    }

    /// Resolve `include_file` through `resolver` in contexts made by this engine.
    pub fn with_include_resolver(mut self, resolver: Arc<dyn IncludeResolver>) -> Self {
        self.include_resolver = Some(resolver);
        self
    }

    /// Expand keywords through `expander` in contexts made by this engine.
    pub fn with_keyword_expander(mut self, expander: Arc<dyn KeywordExpander>) -> Self {
        self.keyword_expander = Some(expander);
        self
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// A fresh context with the builtin library and the engine's hooks.
    pub fn new_context(&self) -> Context {
        self.new_context_with(self.options.default_execution_options.clone())
    }

    pub fn new_context_with(&self, options: ExecutionOptions) -> Context {
        let mut ctx = Context::with_options(options);
        stdlib::register_stdlib(&mut ctx);
        if let Some(resolver) = &self.include_resolver {
            stdlib::register_include_resolver(&mut ctx, resolver.clone());
        }
        if let Some(expander) = &self.keyword_expander {
            stdlib::register_keyword_expander(&mut ctx, expander.clone());
        }
        ctx
    }

    /// Compile with the engine's default options.
    pub fn compile(&self, source: &str) -> Result<Arc<Script>, Error> {
        self.compile_with(source, &self.options.default_compilation_options)
    }

    pub fn compile_with(
        &self,
        source: &str,
        options: &CompilationOptions,
    ) -> Result<Arc<Script>, Error> {
        Ok(parser::compile_with(source, options)?)
    }

    /// Evaluate `script` in `ctx`. A DelayedError result is reported as an
    /// error.
    pub fn evaluate(&self, ctx: &mut Context, script: &Script) -> Result<Value, Error> {
        let value = ctx.evaluate(script, false)?;
        Ok(value.into_result()?)
    }

    /// Compile `source` and evaluate it in a fresh context.
    pub fn run(&self, source: &str) -> Result<Value, Error> {
        let script = self.compile(source)?;
        let mut ctx = self.new_context();
        self.evaluate(&mut ctx, &script)
    }

    /// Like [`run`](Self::run), with explicit options.
    pub fn run_with(
        &self,
        source: &str,
        compilation: &CompilationOptions,
        execution: ExecutionOptions,
    ) -> Result<Value, Error> {
        let script = self.compile_with(source, compilation)?;
        let mut ctx = self.new_context_with(execution);
        let result = self.evaluate(&mut ctx, &script);
        if let Err(error) = &result {
            debug!(%error, "script failed");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::errors::ScriptError;

    #[test]
    fn test_run_with_stdlib() {
        let engine = Engine::default();
        let value = engine.run(r#"to_upper("abc") + length([1, 2])"#).unwrap();
        assert_eq!(value.to_code(), r#""ABC2""#);
    }

    #[test]
    fn test_compilation_error() {
        let engine = Engine::default();
        match engine.run("(1 +") {
            Err(Error::Compilation { diagnostics }) => {
                assert_eq!(diagnostics.len(), 1);
                assert_eq!(diagnostics[0].code.as_deref(), Some("P001"));
            }
            other => panic!("expected a compilation error, got {other:?}"),
        }
    }

    #[test]
    fn test_delayed_error_is_reported() {
        let engine = Engine::default();
        match engine.run("1 / 0") {
            Err(Error::Runtime(error)) => assert_eq!(error, ScriptError::DivisionByZero),
            other => panic!("expected a runtime error, got {other:?}"),
        }
        assert_eq!(engine.run("1 / 0 or else 7").unwrap().to_code(), "7");
    }

    #[test]
    fn test_resource_limits() {
        let engine = Engine::default();
        let result = engine.run_with(
            "f := { f() }; f()",
            &CompilationOptions::default(),
            ExecutionOptions {
                max_depth: 20,
                max_iterations: None,
            },
        );
        assert!(matches!(result, Err(Error::ResourceExceeded(_))));

        let result = engine.run_with(
            "for x from 1 to 1000 do x",
            &CompilationOptions::default(),
            ExecutionOptions {
                max_depth: 20,
                max_iterations: Some(10),
            },
        );
        match result {
            Err(error) => assert_eq!(
                error.script_error(),
                Some(&ScriptError::IterationLimit { limit: 10 })
            ),
            Ok(value) => panic!("expected an iteration limit, got {value:?}"),
        }
    }

    #[test]
    fn test_string_mode() {
        let engine = Engine::default();
        let value = engine
            .run_with(
                "{1 + 1} cards",
                &CompilationOptions { string_mode: true },
                ExecutionOptions::default(),
            )
            .unwrap();
        assert_eq!(value.to_code(), r#""2 cards""#);
    }

    #[test]
    fn test_include_resolver() {
        let resolver = |name: &str| -> Result<String, ScriptError> {
            match name {
                "answer" => Ok("42".to_string()),
                other => Err(ScriptError::custom(format!("unknown file {other}"))),
            }
        };
        let engine = Engine::default().with_include_resolver(Arc::new(resolver));
        assert_eq!(engine.run(r#"include_file("answer") + 1"#).unwrap().to_code(), "43");
        assert!(matches!(
            engine.run(r#"include_file("question")"#),
            Err(Error::Runtime(_))
        ));
    }

    #[test]
    fn test_contexts_are_independent() {
        let engine = Engine::default();
        let script = engine.compile("x := 1; x").unwrap();
        let mut first = engine.new_context();
        engine.evaluate(&mut first, &script).unwrap();
        assert!(first.get("x").is_ok());
        assert!(engine.new_context().get("x").is_err());
    }
}
