use core::fmt;
use core::ops::Range;

use ecow::EcoString;

/// Byte range into the source text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Span(pub Range<usize>);

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span(start..end)
    }

    pub fn start(&self) -> usize {
        self.0.start
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier or keyword, in canonical form.
    Name,
    Int,
    Double,
    /// String literal (or one literal part of an interpolated string), unescaped.
    String,
    Operator,
    /// `(`, `[`, `{`, or the synthetic `"{` opening an interpolation.
    LParen,
    /// `)`, `]`, `}`, or the synthetic `}"` closing an interpolation.
    RParen,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: EcoString,
    /// Whether a line break separates this token from the previous one.
    pub newline: bool,
    pub span: Span,
    /// 1-based line of the token start.
    pub line: u32,
}

impl Token {
    /// Does this token have the given text? String literals never match, so
    /// `"then"` is not the keyword `then`.
    pub fn is(&self, text: &str) -> bool {
        self.kind != TokenKind::String && self.text == text
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }

    /// The closing text matching this opening bracket.
    pub fn closing_bracket(&self) -> &'static str {
        match self.text.as_str() {
            "(" => ")",
            "[" => "]",
            "{" => "}",
            "\"{" => "}\"",
            _ => "",
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => f.write_str("end of input"),
            TokenKind::String => write!(f, "\"{}\"", self.text),
            _ => write!(f, "'{}'", self.text),
        }
    }
}
