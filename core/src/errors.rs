//! Runtime script errors.
//!
//! # Error Categories
//!
//! - **Recoverable errors**: conversion failures, missing members, failed
//!   builtins. These may be reified as a DelayedError value
//!   ([`Value::Error`](crate::values::Value::Error)) and replaced by a
//!   fallback with the `or else` operator.
//!
//! - **Fatal errors**: stack overflow, iteration limit and malformed
//!   bytecode. These always unwind the whole evaluation and are never
//!   turned into values.

use ecow::EcoString;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptError {
    #[error("Variable not set: {name}")]
    NoSuchVariable { name: EcoString },

    #[error("{type_name} has no member '{member}'")]
    NoSuchMember {
        type_name: &'static str,
        member: EcoString,
    },

    /// A value could not be converted to the requested type.
    #[error("Can't convert {}from {from} to {to}", quoted(.value))]
    Conversion {
        value: Option<EcoString>,
        from: &'static str,
        to: &'static str,
    },

    #[error("Assertion failure: {message}")]
    AssertionFailed { message: EcoString },

    #[error("Stack overflow: recursion depth {depth} exceeds maximum of {max_depth}")]
    StackOverflow { depth: usize, max_depth: usize },

    #[error("Iteration limit of {limit} loop steps exceeded")]
    IterationLimit { limit: usize },

    #[error("Division by zero")]
    DivisionByZero,

    /// An error raised while calling a named function.
    #[error("in function {function}: {source}")]
    InFunction {
        function: EcoString,
        source: Box<ScriptError>,
    },

    #[error("{0}")]
    Custom(EcoString),

    /// Malformed bytecode, e.g. an operand stack underflow.
    #[error("Internal error: {0}")]
    Internal(EcoString),
}

fn quoted(value: &Option<EcoString>) -> String {
    match value {
        Some(text) => format!("\"{text}\" "),
        None => String::new(),
    }
}

impl ScriptError {
    pub fn custom(message: impl Into<EcoString>) -> Self {
        ScriptError::Custom(message.into())
    }

    pub fn conversion(from: &'static str, to: &'static str) -> Self {
        ScriptError::Conversion {
            value: None,
            from,
            to,
        }
    }

    /// Fatal errors are never caught by `or else` nor reified as values.
    pub fn is_fatal(&self) -> bool {
        match self {
            ScriptError::StackOverflow { .. }
            | ScriptError::IterationLimit { .. }
            | ScriptError::Internal(_) => true,
            ScriptError::InFunction { source, .. } => source.is_fatal(),
            _ => false,
        }
    }

    /// Annotate with the function that was being called, unless it already is.
    pub fn in_function(self, function: EcoString) -> Self {
        match self {
            ScriptError::InFunction { .. } => self,
            other => ScriptError::InFunction {
                function,
                source: Box::new(other),
            },
        }
    }

    /// The innermost error, with any `in function` annotations removed.
    pub fn root_cause(&self) -> &ScriptError {
        match self {
            ScriptError::InFunction { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
