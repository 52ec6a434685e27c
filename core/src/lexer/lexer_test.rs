use pretty_assertions::assert_eq;

use super::*;

fn kinds_and_texts(source: &str) -> Vec<(TokenKind, String)> {
    let (tokens, errors) = Lexer::tokenize(source);
    assert!(errors.is_empty(), "unexpected lex errors: {errors:?}");
    tokens
        .into_iter()
        .map(|t| (t.kind, t.text.to_string()))
        .collect()
}

fn tok(kind: TokenKind, text: &str) -> (TokenKind, String) {
    (kind, text.to_string())
}

#[test]
fn test_simple_expression() {
    use TokenKind::*;
    assert_eq!(
        kinds_and_texts("x := 1 + 2.5"),
        vec![
            tok(Name, "x"),
            tok(Operator, ":="),
            tok(Int, "1"),
            tok(Operator, "+"),
            tok(Double, "2.5"),
            tok(Eof, ""),
        ]
    );
}

#[test]
fn test_interpolated_string() {
    use TokenKind::*;
    assert_eq!(
        kinds_and_texts(r#""a{x + 1}b""#),
        vec![
            tok(String, "a"),
            tok(LParen, "\"{"),
            tok(Name, "x"),
            tok(Operator, "+"),
            tok(Int, "1"),
            tok(RParen, "}\""),
            tok(String, "b"),
            tok(Eof, ""),
        ]
    );
}

#[test]
fn test_nested_braces_inside_interpolation() {
    use TokenKind::*;
    assert_eq!(
        kinds_and_texts(r#""<{ {1} }>""#),
        vec![
            tok(String, "<"),
            tok(LParen, "\"{"),
            tok(LParen, "{"),
            tok(Int, "1"),
            tok(RParen, "}"),
            tok(RParen, "}\""),
            tok(String, ">"),
            tok(Eof, ""),
        ]
    );
}

#[test]
fn test_string_inside_interpolation() {
    use TokenKind::*;
    assert_eq!(
        kinds_and_texts(r#""x{"y{z}"}""#),
        vec![
            tok(String, "x"),
            tok(LParen, "\"{"),
            tok(String, "y"),
            tok(LParen, "\"{"),
            tok(Name, "z"),
            tok(RParen, "}\""),
            tok(String, ""),
            tok(RParen, "}\""),
            tok(String, ""),
            tok(Eof, ""),
        ]
    );
}

#[test]
fn test_escapes() {
    let (tokens, errors) = Lexer::tokenize(r#""a\"b\{c\n""#);
    assert!(errors.is_empty());
    assert_eq!(tokens[0].text, "a\"b{c\n");
}

#[test]
fn test_comments_and_newlines() {
    let (tokens, _) = Lexer::tokenize("a # comment\nb");
    assert_eq!(tokens[0].text, "a");
    assert_eq!(tokens[1].text, "b");
    assert!(tokens[1].newline);
    assert_eq!(tokens[1].line, 2);
}

#[test]
fn test_include_directive() {
    use TokenKind::*;
    assert_eq!(
        kinds_and_texts("include file: common.mse-include/script\n1"),
        vec![
            tok(Name, "include_file"),
            tok(LParen, "("),
            tok(String, "common.mse-include/script"),
            tok(RParen, ")"),
            tok(Int, "1"),
            tok(Eof, ""),
        ]
    );
}

#[test]
fn test_numeric_member_after_dot() {
    use TokenKind::*;
    assert_eq!(
        kinds_and_texts("list.0"),
        vec![tok(Name, "list"), tok(Operator, "."), tok(Name, "0"), tok(Eof, "")]
    );
}

#[test]
fn test_keyword_text_does_not_match_string() {
    let (tokens, _) = Lexer::tokenize(r#""then" then"#);
    assert!(!tokens[0].is("then"));
    assert!(tokens[1].is("then"));
}

#[test]
fn test_errors_are_collected() {
    let (tokens, errors) = Lexer::tokenize("1 $ 2 \"open");
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0].kind, ParseErrorKind::UnknownCharacter('$'));
    assert_eq!(errors[1].kind, ParseErrorKind::UnterminatedString);
    // Still a usable token stream.
    assert_eq!(tokens[0].text, "1");
    assert_eq!(tokens[1].text, "2");
    assert_eq!(tokens[2].text, "open");
    assert!(tokens[3].is_eof());
}

#[test]
fn test_peek_and_put_back() {
    let mut lexer = Lexer::new("a b c");
    assert_eq!(lexer.peek(2).text, "c");
    let a = lexer.next();
    assert_eq!(a.text, "a");
    lexer.put_back();
    assert_eq!(lexer.next().text, "a");
    assert_eq!(lexer.next().text, "b");
    assert_eq!(lexer.peek(0).text, "c");
    assert!(lexer.peek(5).is_eof());
}

#[test]
fn test_put_back_replays_the_token_itself() {
    let mut lexer = Lexer::new("a\nb");
    lexer.next();
    let b = lexer.next();
    assert!(b.newline);
    lexer.put_back();
    assert_eq!(lexer.next(), b);

    assert!(lexer.next().is_eof());
    lexer.put_back();
    assert!(lexer.next().is_eof());
}

#[test]
fn test_template_mode() {
    use TokenKind::*;
    let mut lexer = Lexer::new_template("Deal {n} damage");
    let mut seen = Vec::new();
    loop {
        let t = lexer.next();
        if t.is_eof() {
            break;
        }
        seen.push((t.kind, t.text.to_string()));
    }
    assert_eq!(
        seen,
        vec![
            tok(String, "Deal "),
            tok(LParen, "\"{"),
            tok(Name, "n"),
            tok(RParen, "}\""),
            tok(String, " damage"),
        ]
    );
    assert!(lexer.errors().is_empty());
}
