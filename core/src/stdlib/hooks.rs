//! Host hooks: `include_file` and `expand_keywords`.
//!
//! Loading files and expanding keywords belong to the embedding
//! application. The defaults registered here fail (`include_file`) or do
//! nothing (`expand_keywords`) until the host installs its own handler.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use ecow::EcoString;
use tracing::debug;

use crate::errors::ScriptError;
use crate::parser;
use crate::values::{NativeFunction, Value};
use crate::vm::Context;

/// Finds the source text of an included file.
pub trait IncludeResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Result<String, ScriptError>;
}

impl<F> IncludeResolver for F
where
    F: Fn(&str) -> Result<String, ScriptError> + Send + Sync,
{
    fn resolve(&self, name: &str) -> Result<String, ScriptError> {
        self(name)
    }
}

/// Resolves include names as paths relative to a directory. Names that are
/// absolute or contain `..` are rejected.
#[derive(Debug, Clone)]
pub struct DirectoryResolver {
    root: PathBuf,
}

impl DirectoryResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl IncludeResolver for DirectoryResolver {
    fn resolve(&self, name: &str) -> Result<String, ScriptError> {
        let relative = Path::new(name);
        if !relative
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
        {
            return Err(ScriptError::custom(format!(
                "Include file {name} is outside the include directory"
            )));
        }
        let path = self.root.join(relative);
        std::fs::read_to_string(&path).map_err(|error| {
            ScriptError::custom(format!("Can't read include file {}: {error}", path.display()))
        })
    }
}

/// Rewrites card text, replacing keywords by their reminder text.
pub trait KeywordExpander: Send + Sync {
    fn expand(&self, ctx: &mut Context, input: &str) -> Result<EcoString, ScriptError>;
}

/// Install the default hooks.
pub fn register(ctx: &mut Context) {
    ctx.register_builtin(NativeFunction::new("include_file", |ctx| {
        let name: EcoString = ctx.param("input")?;
        Err(ScriptError::custom(format!(
            "Can't include file '{name}': no include resolver registered"
        )))
    }));
    ctx.register_builtin(NativeFunction::new("expand_keywords", |ctx| ctx.input()));
}

/// Make `include_file(name)` load `name` through `resolver`.
///
/// The included source is compiled and evaluated in the scope of the call;
/// its value is the result. Assignments made by the file are local to the
/// call, so a library file ends with a collection of its functions.
pub fn register_include_resolver(ctx: &mut Context, resolver: Arc<dyn IncludeResolver>) {
    ctx.register_builtin(NativeFunction::new("include_file", move |ctx| {
        let name: EcoString = ctx.param("input")?;
        let source = resolver.resolve(&name)?;
        let script = parser::compile(&source).map_err(|errors| {
            let first = errors
                .first()
                .map(ToString::to_string)
                .unwrap_or_default();
            ScriptError::custom(format!("Error in include file {name}: {first}"))
        })?;
        debug!(file = %name, "including file");
        ctx.evaluate(&script, false)
    }));
}

/// Make `expand_keywords(input)` call `expander`.
pub fn register_keyword_expander(ctx: &mut Context, expander: Arc<dyn KeywordExpander>) {
    ctx.register_builtin(NativeFunction::new("expand_keywords", move |ctx| {
        let input: EcoString = ctx.param("input")?;
        Ok(Value::String(expander.expand(ctx, &input)?))
    }));
}
