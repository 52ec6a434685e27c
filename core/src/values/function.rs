//! Callable values.
//!
//! Every callable runs against the caller's [`Context`]: arguments are not
//! passed positionally but bound as variables in the scope the caller opened
//! for the call. A callable reads them back with the `param` helpers.

use core::fmt;
use std::sync::Arc;

use ecow::EcoString;
use smallvec::SmallVec;

use super::Value;
use crate::errors::ScriptError;
use crate::intern::VarId;
use crate::vm::{Context, Dependency, Script};

/// Body of a native function.
pub type NativeFn = dyn Fn(&mut Context) -> Result<Value, ScriptError> + Send + Sync;

/// Abstract interpretation of a native function for dependency analysis.
pub type DependencyFn =
    dyn Fn(&mut Context, &Dependency) -> Result<Value, ScriptError> + Send + Sync;

/// A function implemented in Rust.
pub struct NativeFunction {
    name: EcoString,
    body: Box<NativeFn>,
    dependencies: Option<Box<DependencyFn>>,
}

impl NativeFunction {
    pub fn new(
        name: impl Into<EcoString>,
        body: impl Fn(&mut Context) -> Result<Value, ScriptError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            body: Box::new(body),
            dependencies: None,
        }
    }

    /// Attach a dependency analysis. Without one the function is assumed to
    /// depend only on its arguments.
    pub fn with_dependencies(
        mut self,
        dependencies: impl Fn(&mut Context, &Dependency) -> Result<Value, ScriptError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.dependencies = Some(Box::new(dependencies));
        self
    }

    pub fn name(&self) -> &EcoString {
        &self.name
    }

    pub fn invoke(&self, ctx: &mut Context) -> Result<Value, ScriptError> {
        (self.body)(ctx)
    }

    pub fn dependencies(&self, ctx: &mut Context, dep: &Dependency) -> Result<Value, ScriptError> {
        match &self.dependencies {
            Some(dependencies) => dependencies(ctx, dep),
            None => Ok(Value::dependency_dummy()),
        }
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<function {}>", self.name)
    }
}

#[derive(Clone)]
pub enum Function {
    Native(Arc<NativeFunction>),
    /// A `{ ... }` block or a whole compiled script.
    Script(Arc<Script>),
    /// `f + g + ...`: call each part in turn, with `input` set to the result
    /// of the previous one. Never holds another composition.
    Compose(Arc<Vec<Value>>),
    /// Calling a rule does not run the wrapped function; it captures the
    /// arguments of the call into a closure over it.
    Rule(Arc<Value>),
}

impl Function {
    pub fn ptr_eq(&self, other: &Function) -> bool {
        match (self, other) {
            (Function::Native(a), Function::Native(b)) => Arc::ptr_eq(a, b),
            (Function::Script(a), Function::Script(b)) => Arc::ptr_eq(a, b),
            (Function::Compose(a), Function::Compose(b)) => Arc::ptr_eq(a, b),
            (Function::Rule(a), Function::Rule(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// `first + second`, flattened so that chains stay one level deep.
    pub fn compose(first: Value, second: Value) -> Function {
        let mut parts = match first {
            Value::Function(Function::Compose(parts)) => parts,
            first => Arc::new(vec![first]),
        };
        let list = Arc::make_mut(&mut parts);
        match second {
            Value::Function(Function::Compose(more)) => list.extend(more.iter().cloned()),
            second => list.push(second),
        }
        Function::Compose(parts)
    }

    pub fn name(&self) -> Option<&EcoString> {
        match self {
            Function::Native(native) => Some(native.name()),
            Function::Rule(inner) => match &**inner {
                Value::Function(function) => function.name(),
                _ => None,
            },
            _ => None,
        }
    }
}

/// A function with default arguments, made by `f@(name: value)` or by
/// calling a rule.
pub struct Closure {
    function: Value,
    bindings: SmallVec<[(VarId, Value); 4]>,
}

impl Closure {
    /// A closure over another closure takes over its function and the
    /// bindings it does not override.
    pub fn new(function: Value, bindings: impl IntoIterator<Item = (VarId, Value)>) -> Self {
        let mut bindings: SmallVec<[(VarId, Value); 4]> = bindings.into_iter().collect();
        match function {
            Value::Closure(inner) => {
                for (var, value) in &inner.bindings {
                    if !bindings.iter().any(|(bound, _)| bound == var) {
                        bindings.push((*var, value.clone()));
                    }
                }
                Self {
                    function: inner.function.clone(),
                    bindings,
                }
            }
            function => Self { function, bindings },
        }
    }

    pub fn function(&self) -> &Value {
        &self.function
    }

    pub fn bindings(&self) -> &[(VarId, Value)] {
        &self.bindings
    }

    /// Bind the defaults, except for variables the caller already set in
    /// the current scope.
    pub fn apply_bindings(&self, ctx: &mut Context) {
        for (var, value) in &self.bindings {
            if !ctx.is_bound_in_current_scope(*var) {
                ctx.set_variable(*var, value.clone());
            }
        }
    }
}

impl Value {
    /// Invoke this value with the arguments already bound in `ctx`.
    ///
    /// With `open_scope` the call gets a scope of its own; otherwise it runs
    /// in the scope the caller opened.
    pub fn call(&self, ctx: &mut Context, open_scope: bool) -> Result<Value, ScriptError> {
        match self {
            Value::Function(Function::Native(native)) => {
                ctx.scoped(open_scope, |ctx| native.invoke(ctx))
            }
            Value::Function(Function::Script(script)) => ctx.evaluate(script, open_scope),
            Value::Function(Function::Compose(parts)) => ctx.nested(|ctx| {
                ctx.scoped(open_scope, |ctx| {
                    let mut result = Value::Nil;
                    for (i, part) in parts.iter().enumerate() {
                        if i > 0 {
                            ctx.set_variable(VarId::INPUT, result);
                        }
                        result = part.call(ctx, false)?;
                    }
                    Ok(result)
                })
            }),
            Value::Function(Function::Rule(inner)) => Ok(ctx.make_closure((**inner).clone())),
            Value::Closure(closure) => ctx.nested(|ctx| {
                ctx.scoped(open_scope, |ctx| {
                    closure.apply_bindings(ctx);
                    closure.function.call(ctx, false)
                })
            }),
            Value::Nil => ctx.get_variable(VarId::INPUT),
            Value::Object(object) => ctx.scoped(open_scope, |ctx| object.call(ctx)),
            Value::Error(_) => Ok(self.clone()),
            _ => Ok(Value::delayed_error(ScriptError::conversion(
                self.type_name(),
                "function",
            ))),
        }
    }

    /// Abstract counterpart of [`call`](Self::call): run the dependency
    /// analysis of this value for a change described by `dep`.
    pub fn dependencies(&self, ctx: &mut Context, dep: &Dependency) -> Result<Value, ScriptError> {
        match self {
            Value::Function(Function::Native(native)) => native.dependencies(ctx, dep),
            Value::Function(Function::Script(script)) => ctx.dependencies(dep, script),
            Value::Function(Function::Compose(parts)) => {
                let mut result = Value::Nil;
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        ctx.set_variable(VarId::INPUT, result);
                    }
                    result = part.dependencies(ctx, dep)?;
                }
                Ok(result)
            }
            Value::Function(Function::Rule(inner)) => Ok(ctx.make_closure((**inner).clone())),
            Value::Closure(closure) => {
                closure.apply_bindings(ctx);
                closure.function.dependencies(ctx, dep)
            }
            Value::Object(object) => object.dependencies(ctx, dep),
            _ => Ok(Value::dependency_dummy()),
        }
    }
}
