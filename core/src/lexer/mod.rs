//! Tokenizer.
//!
//! Tokens are produced lazily into a lookahead buffer. String interpolation
//! is resolved here: `"a{e}b"` becomes the string `a`, a synthetic `"{`
//! opening paren, the tokens of `e`, a synthetic `}"` closing paren and the
//! string `b`. The `include file: name` directive is rewritten into the
//! tokens of the call `include_file("name")`.

mod token;

#[cfg(test)]
mod lexer_test;

use std::collections::VecDeque;

use ecow::EcoString;

use crate::intern::canonical_name;
use crate::parser::error::{ParseError, ParseErrorKind};

pub use token::{Span, Token, TokenKind};

const INCLUDE_DIRECTIVE: &str = "include file:";

const TWO_CHAR_OPERATORS: [&str; 5] = [":=", "==", "!=", "<=", ">="];
const ONE_CHAR_OPERATORS: &str = "+-*/^.,:;=<>!@";

/// An open `{`. Interpolation braces resume the enclosing string when closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Brace {
    Block,
    Interpolation { template: bool },
}

pub struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    line: u32,
    /// A line break was skipped since the last token.
    newline: bool,
    /// Template mode: the source itself is the body of a string.
    template_pending: bool,
    braces: Vec<Brace>,
    buffer: VecDeque<Token>,
    last: Option<Token>,
    errors: Vec<ParseError>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: 0,
            line: 1,
            newline: true,
            template_pending: false,
            braces: Vec::new(),
            buffer: VecDeque::new(),
            last: None,
            errors: Vec::new(),
        }
    }

    /// Lex `source` as the contents of a string literal with `{...}`
    /// interpolations, without surrounding quotes.
    pub fn new_template(source: &'a str) -> Self {
        Self {
            template_pending: true,
            ..Self::new(source)
        }
    }

    /// Tokenize a whole source, including the final EOF token.
    pub fn tokenize(source: &str) -> (Vec<Token>, Vec<ParseError>) {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next();
            let done = token.is_eof();
            tokens.push(token);
            if done {
                break;
            }
        }
        (tokens, lexer.take_errors())
    }

    /// Consume and return the next token. Repeats EOF forever at the end.
    pub fn next(&mut self) -> Token {
        self.fill(1);
        let token = self
            .buffer
            .pop_front()
            .unwrap_or_else(|| self.eof_token());
        self.last = Some(token.clone());
        token
    }

    /// Look ahead without consuming; `peek(0)` is the token `next` would return.
    pub fn peek(&mut self, offset: usize) -> &Token {
        self.fill(offset + 1);
        let index = offset.min(self.buffer.len().saturating_sub(1));
        &self.buffer[index]
    }

    /// Un-read the most recently consumed token. Only one token can be put back.
    ///
    /// The token itself is replayed, with its own `newline` flag, rather than
    /// a synthetic line break. The compiler only puts back a closing bracket
    /// or the end of input while recovering from an error, so both read the
    /// same.
    pub fn put_back(&mut self) {
        if let Some(token) = self.last.take() {
            self.buffer.push_front(token);
        }
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    pub fn take_errors(&mut self) -> Vec<ParseError> {
        std::mem::take(&mut self.errors)
    }

    fn fill(&mut self, count: usize) {
        while self.buffer.len() < count {
            if self.buffer.back().is_some_and(Token::is_eof) {
                let eof = self.eof_token();
                self.buffer.push_back(eof);
            } else {
                self.read_token();
            }
        }
    }

    fn eof_token(&self) -> Token {
        Token {
            kind: TokenKind::Eof,
            text: EcoString::new(),
            newline: true,
            span: Span::new(self.source.len(), self.source.len()),
            line: self.line,
        }
    }

    // === Character helpers ===

    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn push(&mut self, kind: TokenKind, text: impl Into<EcoString>, start: usize, line: u32) {
        let newline = std::mem::take(&mut self.newline);
        self.buffer.push_back(Token {
            kind,
            text: text.into(),
            newline,
            span: Span::new(start, self.pos),
            line,
        });
    }

    fn error(&mut self, kind: ParseErrorKind, start: usize, line: u32) {
        self.errors
            .push(ParseError::new(kind, Span::new(start, self.pos.max(start + 1)), line));
    }

    /// Skip whitespace and `#` comments, remembering line breaks.
    fn skip_trivia(&mut self) {
        while let Some(c) = self.peek_char() {
            match c {
                '\n' => {
                    self.newline = true;
                    self.bump();
                }
                '#' => {
                    while self.peek_char().is_some_and(|c| c != '\n') {
                        self.bump();
                    }
                }
                c if c.is_whitespace() => {
                    self.bump();
                }
                _ => break,
            }
        }
    }

    // === Tokens ===

    fn read_token(&mut self) {
        if std::mem::take(&mut self.template_pending) {
            let (start, line) = (self.pos, self.line);
            self.read_string_body(start, line, true);
            return;
        }

        loop {
            self.skip_trivia();
            let (start, line) = (self.pos, self.line);
            let Some(c) = self.peek_char() else {
                let eof = Token {
                    newline: true,
                    ..self.eof_token()
                };
                self.buffer.push_back(eof);
                return;
            };

            if self.rest().starts_with(INCLUDE_DIRECTIVE) {
                self.read_include(start, line);
                return;
            }

            let after_dot = self.buffer.back().is_some_and(|t| t.is(".")) || self.last_was_dot();

            if c.is_alphabetic() || c == '_' || (c.is_ascii_digit() && after_dot) {
                let name = self.take_while(|c| c.is_alphanumeric() || c == '_');
                self.push(TokenKind::Name, canonical_name(name), start, line);
                return;
            }

            if c.is_ascii_digit() {
                self.read_number(start, line);
                return;
            }

            match c {
                '"' => {
                    self.bump();
                    self.read_string_body(start, line, false);
                }
                '{' => {
                    self.bump();
                    self.braces.push(Brace::Block);
                    self.push(TokenKind::LParen, "{", start, line);
                }
                '}' => {
                    self.bump();
                    match self.braces.pop() {
                        Some(Brace::Interpolation { template }) => {
                            self.push(TokenKind::RParen, "}\"", start, line);
                            let (start, line) = (self.pos, self.line);
                            self.read_string_body(start, line, template);
                        }
                        _ => self.push(TokenKind::RParen, "}", start, line),
                    }
                }
                '(' | '[' => {
                    self.bump();
                    self.push(TokenKind::LParen, c.to_string(), start, line);
                }
                ')' | ']' => {
                    self.bump();
                    self.push(TokenKind::RParen, c.to_string(), start, line);
                }
                _ => {
                    if let Some(op) = TWO_CHAR_OPERATORS
                        .iter()
                        .find(|op| self.rest().starts_with(**op))
                    {
                        self.pos += op.len();
                        self.push(TokenKind::Operator, *op, start, line);
                    } else if ONE_CHAR_OPERATORS.contains(c) {
                        self.bump();
                        self.push(TokenKind::Operator, c.to_string(), start, line);
                    } else {
                        self.bump();
                        self.error(ParseErrorKind::UnknownCharacter(c), start, line);
                        continue;
                    }
                }
            }
            return;
        }
    }

    fn last_was_dot(&self) -> bool {
        self.buffer.is_empty() && self.last.as_ref().is_some_and(|t| t.is("."))
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek_char().is_some_and(&pred) {
            self.bump();
        }
        &self.source[start..self.pos]
    }

    fn read_number(&mut self, start: usize, line: u32) {
        self.take_while(|c| c.is_ascii_digit());
        let mut kind = TokenKind::Int;
        let mut fraction = self.rest().chars();
        if fraction.next() == Some('.') && fraction.next().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            self.take_while(|c| c.is_ascii_digit());
            kind = TokenKind::Double;
        }
        let text = &self.source[start..self.pos];
        self.push(kind, text, start, line);
    }

    /// Read string characters up to the closing quote or an interpolation.
    /// In template mode the string runs to the end of the input.
    fn read_string_body(&mut self, start: usize, line: u32, template: bool) {
        let mut text = String::new();
        loop {
            let Some(c) = self.bump() else {
                if !template {
                    self.error(ParseErrorKind::UnterminatedString, start, line);
                }
                self.push(TokenKind::String, text, start, line);
                return;
            };
            match c {
                '"' if !template => {
                    self.push(TokenKind::String, text, start, line);
                    return;
                }
                '{' => {
                    let brace = self.pos - 1;
                    self.pos = brace;
                    self.push(TokenKind::String, text, start, line);
                    self.pos = brace + 1;
                    self.braces.push(Brace::Interpolation { template });
                    let line = self.line;
                    self.push(TokenKind::LParen, "\"{", brace, line);
                    return;
                }
                '\\' => match self.bump() {
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some(other) => text.push(other),
                    None => {}
                },
                other => text.push(other),
            }
        }
    }

    /// `include file: name` becomes `include_file("name")`.
    fn read_include(&mut self, start: usize, line: u32) {
        self.pos += INCLUDE_DIRECTIVE.len();
        let file = self.take_while(|c| c != '\n').trim();
        self.push(TokenKind::Name, "include_file", start, line);
        self.push(TokenKind::LParen, "(", start, line);
        self.push(TokenKind::String, file, start, line);
        self.push(TokenKind::RParen, ")", start, line);
    }
}
