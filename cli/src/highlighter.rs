use cardscript_core::lexer::{Lexer, Token, TokenKind};
use nu_ansi_term::{Color, Style};
use reedline::StyledText;

const KEYWORDS: &[&str] = &[
    "if", "then", "else", "case", "of", "for", "each", "in", "from", "to", "do", "and", "or",
    "xor", "not", "div", "mod",
];

const CONSTANTS: &[&str] = &["true", "false", "nil"];

/// Colors REPL input using the script lexer.
pub struct Highlighter {
    default: Style,
}

impl Highlighter {
    pub fn new() -> Self {
        Self {
            default: Style::new().fg(Color::White),
        }
    }

    fn style(&self, token: &Token, next: Option<&Token>) -> Style {
        let fg = match token.kind {
            TokenKind::Name if KEYWORDS.contains(&token.text.as_str()) => Color::Magenta,
            TokenKind::Name if CONSTANTS.contains(&token.text.as_str()) => Color::Cyan,
            TokenKind::Name if next.is_some_and(|next| next.is("(")) => Color::Blue,
            TokenKind::Name => Color::Red,
            TokenKind::Int | TokenKind::Double => Color::Cyan,
            TokenKind::String => Color::Green,
            TokenKind::LParen | TokenKind::RParen if token.text.contains('"') => Color::Green,
            TokenKind::Operator | TokenKind::LParen | TokenKind::RParen | TokenKind::Eof => {
                return self.default;
            }
        };
        Style::new().fg(fg)
    }
}

impl reedline::Highlighter for Highlighter {
    fn highlight(&self, line: &str, _: usize) -> StyledText {
        let mut output = StyledText::new();
        let (tokens, _) = Lexer::tokenize(line);

        // Text between tokens (spaces, comments, quotes) keeps the default
        // style. Synthetic tokens may share a span, so only move forward.
        let mut curr_end = 0;
        for (i, token) in tokens.iter().enumerate() {
            let start = token.span.0.start.max(curr_end);
            let end = token.span.0.end.min(line.len());
            if start >= end {
                continue;
            }
            if let Some(gap) = line.get(curr_end..start).filter(|gap| !gap.is_empty()) {
                output.push((self.default, gap.to_string()));
            }
            let Some(text) = line.get(start..end) else {
                continue;
            };
            output.push((self.style(token, tokens.get(i + 1)), text.to_string()));
            curr_end = end;
        }

        if let Some(rest) = line.get(curr_end..).filter(|rest| !rest.is_empty()) {
            output.push((self.default, rest.to_string()));
        }
        output
    }
}
