use core::fmt;

use ecow::EcoString;

use crate::api::{Diagnostic, RelatedInfo, Severity};
use crate::lexer::{Span, Token};

/// A compile-time error. Errors are collected rather than thrown, so one
/// compilation reports everything it can find.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
    /// 1-based line number.
    pub line: u32,
    /// The opening bracket a missing closing bracket should have matched.
    pub open_bracket: Option<OpenBracket>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseErrorKind {
    UnexpectedToken {
        expected: EcoString,
        found: EcoString,
    },
    UnknownCharacter(char),
    UnterminatedString,
    InvalidNumber {
        text: EcoString,
    },
    /// The left side of `:=` is not a variable.
    InvalidAssignment,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenBracket {
    pub text: EcoString,
    pub span: Span,
    pub line: u32,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, span: Span, line: u32) -> Self {
        Self {
            kind,
            span,
            line,
            open_bracket: None,
        }
    }

    pub fn unexpected(expected: impl Into<EcoString>, found: &Token) -> Self {
        Self::new(
            ParseErrorKind::UnexpectedToken {
                expected: expected.into(),
                found: EcoString::from(found.to_string()),
            },
            found.span.clone(),
            found.line,
        )
    }

    pub fn with_open_bracket(mut self, open: &Token) -> Self {
        self.open_bracket = Some(OpenBracket {
            text: open.text.clone(),
            span: open.span.clone(),
            line: open.line,
        });
        self
    }

    /// Byte offset of the error.
    pub fn offset(&self) -> usize {
        self.span.start()
    }

    pub fn message(&self) -> EcoString {
        match &self.kind {
            ParseErrorKind::UnexpectedToken { expected, found } => {
                ecow::eco_format!("Expected {expected}, found {found}")
            }
            ParseErrorKind::UnknownCharacter(c) => ecow::eco_format!("Unknown character '{c}'"),
            ParseErrorKind::UnterminatedString => "Unterminated string literal".into(),
            ParseErrorKind::InvalidNumber { text } => {
                ecow::eco_format!("Invalid number literal '{text}'")
            }
            ParseErrorKind::InvalidAssignment => {
                "Can only assign to variables, the left side of ':=' is not a variable".into()
            }
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let (code, help) = match &self.kind {
            ParseErrorKind::UnexpectedToken { .. } => ("P001", None),
            ParseErrorKind::UnknownCharacter(_) => ("P002", None),
            ParseErrorKind::UnterminatedString => {
                ("P003", Some("Add the missing closing quote"))
            }
            ParseErrorKind::InvalidNumber { .. } => ("P004", None),
            ParseErrorKind::InvalidAssignment => (
                "P005",
                Some("Write `name := value` to assign a variable"),
            ),
        };

        Diagnostic {
            severity: Severity::Error,
            message: self.message().to_string(),
            span: self.span.clone(),
            related: self
                .open_bracket
                .iter()
                .map(|open| RelatedInfo {
                    span: open.span.clone(),
                    message: format!("to match this '{}'", open.text),
                })
                .collect(),
            help: help.map(String::from).into_iter().collect(),
            code: Some(code.to_string()),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message())?;
        if let Some(open) = &self.open_bracket {
            write!(f, " (to match '{}' on line {})", open.text, open.line)?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}
