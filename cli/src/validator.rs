use cardscript_core::lexer::{Lexer, TokenKind};
use cardscript_core::parser::ParseErrorKind;
use reedline::{ValidationResult, Validator};

/// Number of brackets left open at the end of `buffer`, or None when the
/// buffer ends inside a string literal.
pub fn calculate_depth(buffer: &str) -> Option<usize> {
    let (tokens, errors) = Lexer::tokenize(buffer);
    if errors
        .iter()
        .any(|e| e.kind == ParseErrorKind::UnterminatedString)
    {
        return None;
    }

    let mut depth: isize = 0;
    for token in &tokens {
        match token.kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => depth -= 1,
            _ => {}
        }
    }
    Some(depth.max(0) as usize)
}

/// Keeps reading lines while brackets or strings are left open, so
/// multi-line functions can be typed at the prompt.
pub struct BracketValidator;

impl Validator for BracketValidator {
    fn validate(&self, line: &str) -> ValidationResult {
        match calculate_depth(line) {
            Some(0) => ValidationResult::Complete,
            _ => ValidationResult::Incomplete,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_counts_open_brackets() {
        assert_eq!(calculate_depth("f(1, [2"), Some(2));
        assert_eq!(calculate_depth("f := { input }"), Some(0));
        assert_eq!(calculate_depth("\"a{1}b\""), Some(0));
        assert_eq!(calculate_depth(")"), Some(0));
        assert_eq!(calculate_depth("\"open"), None);
    }

    #[test]
    fn validator_waits_for_closing_brackets() {
        assert!(matches!(
            BracketValidator.validate("f := {\n  input"),
            ValidationResult::Incomplete
        ));
        assert!(matches!(
            BracketValidator.validate("f := {\n  input\n}"),
            ValidationResult::Complete
        ));
    }
}
