//! Error rendering using ariadne
//!
//! Compilation errors are rendered with source snippets and labels for the
//! related brackets; runtime errors are a single line naming the chain of
//! functions they were raised in.

use crate::{Diagnostic, Error, Severity};
use ariadne::{ColorGenerator, Label, Report, ReportKind, Source};
use std::io::Write;

const SOURCE_ID: &str = "<script>";

/// Render an error with formatting to stderr
///
/// # Example
/// ```no_run
/// use cardscript::{Engine, render_error};
///
/// let engine = Engine::default();
/// let source = "(1 + 2";
/// if let Err(e) = engine.run(source) {
///     render_error(&e, source);
/// }
/// ```
pub fn render_error(error: &Error, source: &str) {
    render_error_to_writer(error, source, &mut std::io::stderr(), true).ok();
}

/// Render an error to a specific writer
pub fn render_error_to(error: &Error, source: &str, writer: &mut dyn Write) -> std::io::Result<()> {
    render_error_to_writer(error, source, writer, true)
}

/// Render an error to a String (useful for logs, web UIs, etc.)
pub fn render_error_to_string(error: &Error, source: &str) -> String {
    let mut buf = Vec::new();
    render_error_to_writer(error, source, &mut buf, true).ok();
    String::from_utf8_lossy(&buf).to_string()
}

/// Render an error to a String without color codes (useful for tests)
pub fn render_error_to_string_no_color(error: &Error, source: &str) -> String {
    let mut buf = Vec::new();
    render_error_to_writer(error, source, &mut buf, false).ok();
    String::from_utf8_lossy(&buf).to_string()
}

fn render_error_to_writer(
    error: &Error,
    source: &str,
    writer: &mut dyn Write,
    use_color: bool,
) -> std::io::Result<()> {
    match error {
        Error::Compilation { diagnostics } => {
            render_diagnostics(source, diagnostics, writer, use_color)
        }
        Error::Runtime(error) => writeln!(writer, "Error: {error}"),
        Error::ResourceExceeded(error) => writeln!(writer, "Resource limit exceeded: {error}"),
    }
}

fn render_diagnostics(
    source: &str,
    diagnostics: &[Diagnostic],
    writer: &mut dyn Write,
    use_color: bool,
) -> std::io::Result<()> {
    for diag in diagnostics {
        let mut colors = ColorGenerator::new();
        colors.next(); // Skip the first color.

        let kind = match diag.severity {
            Severity::Error => ReportKind::Error,
            Severity::Warning => ReportKind::Warning,
            Severity::Info => ReportKind::Advice,
        };

        let mut report = Report::build(kind, (SOURCE_ID, diag.span.0.clone()))
            .with_message(&diag.message)
            .with_config(ariadne::Config::default().with_color(use_color));

        if let Some(code) = &diag.code {
            report = report.with_code(code);
        }

        let color = colors.next();
        report = report.with_label(
            Label::new((SOURCE_ID, diag.span.0.clone()))
                .with_message(&diag.message)
                .with_color(color),
        );

        // The opening bracket of an unclosed group, and similar context.
        for related in &diag.related {
            let color = colors.next();
            report = report.with_label(
                Label::new((SOURCE_ID, related.span.0.clone()))
                    .with_message(&related.message)
                    .with_color(color),
            );
        }

        for help_msg in &diag.help {
            report = report.with_help(help_msg);
        }

        report
            .finish()
            .write((SOURCE_ID, Source::from(source)), &mut *writer)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CompilationOptions, Engine, ExecutionOptions};

    #[test]
    fn test_render_parse_error() {
        let engine = Engine::default();
        let source = "1 + + 2 +";
        let error = engine.run(source).unwrap_err();
        let output = render_error_to_string_no_color(&error, source);

        assert!(output.contains("Error"), "{output}");
        assert!(output.contains("1 + + 2 +"), "{output}");
        assert!(output.contains("P001"), "{output}");
    }

    #[test]
    fn test_render_unclosed_bracket() {
        let engine = Engine::default();
        let source = "f(1,\n  2";
        let error = engine.run(source).unwrap_err();
        let output = render_error_to_string_no_color(&error, source);

        assert!(output.contains("to match this '('"), "{output}");
        assert!(output.lines().count() > 1);
    }

    #[test]
    fn test_render_runtime_error() {
        let engine = Engine::default();
        let source = "check := { assert(input > 0) }; check(-1)";
        let error = engine.run(source).unwrap_err();
        assert_eq!(
            render_error_to_string_no_color(&error, source),
            "Error: in function check: Assertion failure: line 1: input > 0\n"
        );
    }

    #[test]
    fn test_render_resource_error() {
        let engine = Engine::default();
        let source = "f := { f() }; f()";
        let execution = ExecutionOptions {
            max_depth: 50,
            max_iterations: None,
        };
        let error = engine
            .run_with(source, &CompilationOptions::default(), execution)
            .unwrap_err();
        let output = render_error_to_string_no_color(&error, source);
        assert!(output.starts_with("Resource limit exceeded:"), "{output}");
    }
}
