//! Configuration options for the cardscript engine.

/// Configuration options for compilation.
///
/// # Example
///
/// ```
/// use cardscript_core::api::CompilationOptions;
///
/// let options = CompilationOptions { string_mode: true };
/// assert!(options.string_mode);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CompilationOptions {
    /// Compile the whole source as the body of a string literal: plain text
    /// with `{expr}` interpolations.
    ///
    /// Default: false
    pub string_mode: bool,
}

/// Configuration options for script execution.
///
/// These options control resource limits during evaluation.
///
/// # Example
///
/// ```
/// use cardscript_core::api::ExecutionOptions;
///
/// let options = ExecutionOptions {
///     max_depth: 200,
///     max_iterations: Some(10_000),
/// };
/// ```
#[derive(Debug, Clone)]
pub struct ExecutionOptions {
    /// Maximum nesting of script evaluations (for recursion protection).
    ///
    /// Default: 500
    pub max_depth: usize,

    /// Maximum number of loop steps a context performs (if Some).
    ///
    /// Set to `None` for unlimited iterations (be careful with untrusted code!).
    ///
    /// Default: None
    pub max_iterations: Option<usize>,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            max_depth: 500,
            max_iterations: None,
        }
    }
}

/// Configuration options for the [`Engine`](super::Engine).
///
/// These options set the defaults for compilation and execution,
/// which can be overridden on a per-call basis.
///
/// # Example
///
/// ```
/// use cardscript_core::api::{CompilationOptions, EngineOptions, ExecutionOptions};
///
/// let options = EngineOptions {
///     default_compilation_options: CompilationOptions::default(),
///     default_execution_options: ExecutionOptions {
///         max_depth: 100,
///         max_iterations: Some(10_000),
///     },
/// };
/// ```
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Default options for compilation.
    ///
    /// These can be overridden when calling `Engine::compile_with()`.
    pub default_compilation_options: CompilationOptions,

    /// Default options for execution.
    ///
    /// These can be overridden when calling `Engine::run_with()`.
    pub default_execution_options: ExecutionOptions,
}
