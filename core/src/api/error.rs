//! Public error types for the cardscript API.
//!
//! Internal errors are converted to these types at the API boundary:
//! parse errors become [`Diagnostic`]s, script errors are kept whole so
//! callers can inspect their root cause.

use core::fmt;

use thiserror::Error as ThisError;

use crate::errors::ScriptError;
use crate::lexer::Span;
use crate::parser::ParseError;

/// Public error type for all cardscript operations.
#[derive(Debug, ThisError)]
pub enum Error {
    /// The source did not compile.
    ///
    /// Contains one diagnostic per parse error, in source order.
    #[error("Compilation failed with {} error(s)", count_errors(.diagnostics))]
    Compilation { diagnostics: Vec<Diagnostic> },

    /// The script raised an error, or evaluated to a DelayedError.
    #[error("Runtime error: {0}")]
    Runtime(ScriptError),

    /// Recursion or loop limits were exceeded.
    #[error("Resource limit exceeded: {0}")]
    ResourceExceeded(ScriptError),
}

fn count_errors(diagnostics: &[Diagnostic]) -> usize {
    diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count()
}

impl Error {
    /// The underlying script error of a runtime failure.
    pub fn script_error(&self) -> Option<&ScriptError> {
        match self {
            Error::Runtime(error) | Error::ResourceExceeded(error) => Some(error),
            Error::Compilation { .. } => None,
        }
    }
}

/// A diagnostic message (error, warning, or info) with source location.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,

    /// Primary diagnostic message.
    pub message: String,

    /// Source location of the primary issue.
    pub span: Span,

    /// Related locations, such as the bracket a missing `)` should match.
    pub related: Vec<RelatedInfo>,

    /// Suggestions on how to fix the issue.
    pub help: Vec<String>,

    /// Error code (e.g., "P001") for documentation lookup.
    pub code: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// Related information for a diagnostic.
#[derive(Debug, Clone)]
pub struct RelatedInfo {
    pub span: Span,
    pub message: String,
}

// ============================================================================
// Conversion from internal errors
// ============================================================================

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Error::Compilation {
            diagnostics: vec![err.to_diagnostic()],
        }
    }
}

impl From<Vec<ParseError>> for Error {
    fn from(errors: Vec<ParseError>) -> Self {
        Error::Compilation {
            diagnostics: errors.iter().map(ParseError::to_diagnostic).collect(),
        }
    }
}

impl From<ScriptError> for Error {
    fn from(err: ScriptError) -> Self {
        if err.is_fatal() {
            Error::ResourceExceeded(err)
        } else {
            Error::Runtime(err)
        }
    }
}
