//! Single-pass compiler from tokens straight to bytecode.
//!
//! There is no syntax tree: `parse_expr` compiles one primary expression and
//! `parse_oper` extends it with infix and postfix operators by precedence
//! climbing, emitting each operator's instruction once its right operand has
//! been compiled. Every compiled expression leaves exactly one value on the
//! stack.
//!
//! Errors never abort compilation. Each is recorded and the compiler pushes
//! a `nil` in place of what it could not parse, so the stack discipline
//! holds and later errors are still found.

use std::sync::Arc;

use super::error::{ParseError, ParseErrorKind};
use crate::api::CompilationOptions;
use crate::intern::VarId;
use crate::lexer::{Lexer, Token, TokenKind};
use crate::values::{Function, Value};
use crate::vm::{BinaryOp, Instruction, QuaternaryOp, Script, ScriptBuilder, TernaryOp, UnaryOp};

/// Operator binding strength, loosest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    All,
    /// Line break as statement separator.
    Newline,
    /// `;`
    Seq,
    /// `:=`
    Set,
    /// `and or xor`, `or else`
    And,
    /// `= == != < > <= >=`
    Cmp,
    /// `+ -`
    Add,
    /// `* / div mod`
    Mul,
    /// `^`, right associative
    Pow,
    /// `- not`
    Unary,
    /// `. [] () @()`
    Fun,
    /// String interpolation
    String,
    None,
}

/// Names that continue an expression rather than start one.
const INFIX_KEYWORDS: [&str; 12] = [
    "and", "or", "xor", "mod", "div", "then", "else", "do", "of", "in", "from", "to",
];

pub struct Compiler<'a> {
    source: &'a str,
    lexer: Lexer<'a>,
    errors: Vec<ParseError>,
    /// End offset of the last consumed token.
    last_end: usize,
}

impl<'a> Compiler<'a> {
    pub fn new(source: &'a str, options: &CompilationOptions) -> Self {
        let lexer = if options.string_mode {
            Lexer::new_template(source)
        } else {
            Lexer::new(source)
        };
        Self {
            source,
            lexer,
            errors: Vec::new(),
            last_end: 0,
        }
    }

    /// Compile the whole source. The script is usable even when errors
    /// were reported, with `nil` standing in for the broken parts.
    pub fn compile(mut self) -> (Arc<Script>, Vec<ParseError>) {
        let mut script = ScriptBuilder::new();
        self.parse_oper(&mut script, Precedence::All);

        let end = self.peek(0);
        if !end.is_eof() {
            self.errors.push(ParseError::unexpected("end of input", &end));
        }

        let mut errors = self.lexer.take_errors();
        errors.append(&mut self.errors);
        errors.sort_by_key(ParseError::offset);
        (Arc::new(script.finish()), errors)
    }

    // === Tokens ===

    fn next(&mut self) -> Token {
        let token = self.lexer.next();
        if !token.is_eof() {
            self.last_end = token.span.0.end;
        }
        token
    }

    fn peek(&mut self, offset: usize) -> Token {
        self.lexer.peek(offset).clone()
    }

    /// Consume `text` or report it missing. `open` is the bracket being closed.
    fn expect(&mut self, text: &str, open: Option<&Token>) -> bool {
        let token = self.peek(0);
        if token.is(text) {
            self.next();
            return true;
        }
        // An error was already reported here, usually a missing operand
        // before the end of input. Only add the bracket to it.
        let offset = token.span.start();
        if let Some(previous) = self.errors.iter_mut().find(|e| e.offset() == offset) {
            if let (Some(open), None) = (open, &previous.open_bracket) {
                *previous = previous.clone().with_open_bracket(open);
            }
            return false;
        }
        let mut error = ParseError::unexpected(format!("'{text}'"), &token);
        if let Some(open) = open {
            error = error.with_open_bracket(open);
        }
        self.errors.push(error);
        false
    }

    fn expect_name(&mut self) -> Option<VarId> {
        let token = self.peek(0);
        if token.kind == TokenKind::Name && !is_keyword(&token) {
            self.next();
            Some(VarId::new(&token.text))
        } else {
            self.errors.push(ParseError::unexpected("a name", &token));
            None
        }
    }

    /// Record an unexpected token in expression position and compile `nil`
    /// instead. The token is skipped unless it may close an enclosing bracket.
    fn unexpected(&mut self, script: &mut ScriptBuilder, token: Token) {
        self.errors.push(ParseError::unexpected("an expression", &token));
        if token.is_eof() || token.kind == TokenKind::RParen {
            self.lexer.put_back();
        }
        script.push_constant(Value::Nil);
    }

    // === Expressions ===

    /// Compile a primary expression.
    fn parse_expr(&mut self, script: &mut ScriptBuilder, min: Precedence) {
        let token = self.next();
        match token.kind {
            TokenKind::LParen if token.is("(") => {
                self.parse_oper(script, Precedence::All);
                self.expect(")", Some(&token));
            }
            TokenKind::LParen if token.is("{") => {
                let mut body = ScriptBuilder::new();
                self.parse_oper(&mut body, Precedence::All);
                self.expect("}", Some(&token));
                let function = Function::Script(Arc::new(body.finish()));
                script.push_constant(Value::Function(function));
            }
            TokenKind::LParen if token.is("[") => self.parse_collection(script, &token),
            TokenKind::Operator if token.is("-") && min <= Precedence::Unary => {
                self.parse_oper(script, Precedence::Unary);
                script.emit(Instruction::Unary(UnaryOp::Negate));
            }
            TokenKind::Name => self.parse_name(script, min, token),
            TokenKind::Int => match token.text.parse::<i64>() {
                Ok(i) => script.push_constant(Value::Int(i)),
                Err(_) => self.invalid_number(script, &token),
            },
            TokenKind::Double => match token.text.parse::<f64>() {
                Ok(d) => script.push_constant(Value::Double(d)),
                Err(_) => self.invalid_number(script, &token),
            },
            TokenKind::String => script.push_constant(Value::String(token.text)),
            _ => self.unexpected(script, token),
        }
    }

    fn invalid_number(&mut self, script: &mut ScriptBuilder, token: &Token) {
        self.errors.push(ParseError::new(
            ParseErrorKind::InvalidNumber {
                text: token.text.clone(),
            },
            token.span.clone(),
            token.line,
        ));
        script.push_constant(Value::Nil);
    }

    fn parse_name(&mut self, script: &mut ScriptBuilder, min: Precedence, token: Token) {
        let called = self.peek(0).is("(") && !self.peek(0).newline;
        match token.text.as_str() {
            "not" if min <= Precedence::Unary => {
                self.parse_oper(script, Precedence::Unary);
                script.emit(Instruction::Unary(UnaryOp::Not));
            }
            "true" => script.push_constant(Value::Bool(true)),
            "false" => script.push_constant(Value::Bool(false)),
            "nil" => script.push_constant(Value::Nil),
            "if" => self.parse_if(script),
            "case" => self.parse_case(script),
            "for" => self.parse_for(script),
            "rgb" if called => {
                self.parse_fixed_arguments(script, 3);
                script.emit(Instruction::Ternary(TernaryOp::Rgb));
            }
            "rgba" if called => {
                self.parse_fixed_arguments(script, 4);
                script.emit(Instruction::Quaternary(QuaternaryOp::Rgba));
            }
            "min" if called => self.parse_fold(script, BinaryOp::Min),
            "max" if called => self.parse_fold(script, BinaryOp::Max),
            "assert" if called => self.parse_assert(script),
            _ if is_keyword(&token) => self.unexpected(script, token),
            name => {
                script.emit(Instruction::GetVar(VarId::new(name)));
            }
        }
    }

    /// `if a then b else c`; a missing `else` yields nil.
    fn parse_if(&mut self, script: &mut ScriptBuilder) {
        self.parse_oper(script, Precedence::Set);
        let jump_else = script.jump_placeholder(Instruction::JumpIfNot(0));
        self.expect("then", None);
        self.parse_oper(script, Precedence::Set);
        let jump_end = script.jump_placeholder(Instruction::Jump(0));
        script.patch_jump(jump_else);
        if self.peek(0).is("else") {
            self.next();
            self.parse_oper(script, Precedence::Set);
        } else {
            script.push_constant(Value::Nil);
        }
        script.patch_jump(jump_end);
    }

    /// `case x of a: r, b: s, else: t`. The subject stays on the stack while
    /// the patterns are tested.
    fn parse_case(&mut self, script: &mut ScriptBuilder) {
        self.parse_oper(script, Precedence::Set);
        self.expect("of", None);
        let mut jumps_end = Vec::new();
        let mut has_default = false;

        loop {
            let token = self.peek(0);
            if token.is("else") {
                self.next();
                self.expect(":", None);
                script.emit(Instruction::Pop);
                self.parse_oper(script, Precedence::Set);
                has_default = true;
                break;
            }
            if token.is_eof() || token.kind == TokenKind::RParen {
                break;
            }
            script.emit(Instruction::Dup(0));
            self.parse_oper(script, Precedence::Set);
            script.emit(Instruction::Binary(BinaryOp::Eq));
            let jump_next = script.jump_placeholder(Instruction::JumpIfNot(0));
            self.expect(":", None);
            script.emit(Instruction::Pop);
            self.parse_oper(script, Precedence::Set);
            jumps_end.push(script.jump_placeholder(Instruction::Jump(0)));
            script.patch_jump(jump_next);

            if !self.peek(0).is(",") {
                break;
            }
            self.next();
        }

        if !has_default {
            script.emit(Instruction::Pop);
            script.push_constant(Value::Nil);
        }
        for jump in jumps_end {
            script.patch_jump(jump);
        }
    }

    /// `for [each] x in xs do body`, `for each k: v in xs do body` or
    /// `for x from a to b do body`. The body results are added together,
    /// starting from nil.
    fn parse_for(&mut self, script: &mut ScriptBuilder) {
        if self.peek(0).is("each") {
            self.next();
        }
        let first = self.expect_name();
        let (key, value) = if self.peek(0).is(":") {
            self.next();
            (first, self.expect_name())
        } else {
            (None, first)
        };
        let keyed = key.is_some();

        if self.peek(0).is("in") {
            self.next();
            self.parse_oper(script, Precedence::Set);
            script.emit(Instruction::Unary(UnaryOp::MakeIterator));
        } else if self.peek(0).is("from") {
            self.next();
            self.parse_oper(script, Precedence::Set);
            self.expect("to", None);
            self.parse_oper(script, Precedence::Set);
            script.emit(Instruction::Binary(BinaryOp::RangeIterator));
        } else {
            let token = self.peek(0);
            self.errors.push(ParseError::unexpected("'in' or 'from'", &token));
            script.push_constant(Value::Nil);
            script.emit(Instruction::Unary(UnaryOp::MakeIterator));
        }

        script.push_constant(Value::Nil);
        let start = script.label();
        let jump_loop = script.jump_placeholder(if keyed {
            Instruction::LoopWithKey(0)
        } else {
            Instruction::Loop(0)
        });
        self.expect("do", None);
        // The key is on top of the value.
        let bound = if keyed { vec![key, value] } else { vec![value] };
        for var in bound {
            if let Some(var) = var {
                script.emit(Instruction::SetVar(var));
            }
            script.emit(Instruction::Pop);
        }
        self.parse_oper(script, Precedence::Set);
        script.emit(Instruction::Binary(BinaryOp::Add));
        script.emit(Instruction::Jump(start));
        script.patch_jump(jump_loop);
    }

    /// `[a, b, key: c]`
    fn parse_collection(&mut self, script: &mut ScriptBuilder, open: &Token) {
        let mut count = 0;
        loop {
            let token = self.peek(0);
            if token.is("]") {
                self.next();
                break;
            }
            if token.is_eof() || token.kind == TokenKind::RParen {
                self.expect("]", Some(open));
                break;
            }

            let keyed = matches!(
                token.kind,
                TokenKind::Name | TokenKind::Int | TokenKind::String
            ) && self.peek(1).is(":");
            if keyed {
                self.next();
                self.next();
                script.push_constant(Value::String(token.text.clone()));
            } else {
                script.push_constant(Value::Nil);
            }
            self.parse_oper(script, Precedence::Set);
            count += 1;

            if self.peek(0).is(",") {
                self.next();
            }
        }
        script.emit(Instruction::MakeCollection(count));
    }

    /// Arguments of a call or closure, up to and including `)`. Returns the
    /// variable each argument binds, in order.
    fn parse_arguments(&mut self, script: &mut ScriptBuilder, open: &Token) -> Vec<VarId> {
        let mut names = Vec::new();
        let mut position = 0;
        loop {
            let token = self.peek(0);
            if token.is(")") {
                self.next();
                break;
            }
            if token.is_eof() || token.kind == TokenKind::RParen {
                self.expect(")", Some(open));
                break;
            }

            if token.kind == TokenKind::Name && self.peek(1).is(":") {
                self.next();
                self.next();
                names.push(VarId::new(&token.text));
            } else {
                names.push(VarId::positional(position));
                position += 1;
            }
            self.parse_oper(script, Precedence::Seq);

            if self.peek(0).is(",") {
                self.next();
            }
        }
        names
    }

    /// Exactly `count` comma separated arguments in parentheses, each
    /// leaving one value.
    fn parse_fixed_arguments(&mut self, script: &mut ScriptBuilder, count: usize) {
        let open = self.next();
        for i in 0..count {
            if i > 0 && !self.expect(",", None) {
                script.push_constant(Value::Nil);
                continue;
            }
            self.parse_oper(script, Precedence::All);
        }
        self.expect(")", Some(&open));
    }

    /// `min(a, b, ...)` and `max(a, b, ...)` fold their arguments pairwise.
    fn parse_fold(&mut self, script: &mut ScriptBuilder, op: BinaryOp) {
        let open = self.next();
        let mut count = 0;
        while !self.peek(0).is(")") {
            let token = self.peek(0);
            if token.is_eof() || token.kind == TokenKind::RParen {
                break;
            }
            self.parse_oper(script, Precedence::All);
            count += 1;
            if count > 1 {
                script.emit(Instruction::Binary(op));
            }
            if self.peek(0).is(",") {
                self.next();
            } else {
                break;
            }
        }
        if count == 0 {
            script.push_constant(Value::Nil);
        }
        self.expect(")", Some(&open));
    }

    /// `assert(condition)` fails with the source text of the condition.
    fn parse_assert(&mut self, script: &mut ScriptBuilder) {
        let open = self.next();
        let start = self.peek(0);
        self.parse_oper(script, Precedence::All);
        let text = self
            .source
            .get(start.span.start()..self.last_end.max(start.span.start()))
            .unwrap_or_default()
            .trim();
        script.push_constant(Value::String(ecow::eco_format!("line {}: {}", start.line, text)));
        script.emit(Instruction::Binary(BinaryOp::Assert));
        self.expect(")", Some(&open));
    }

    // === Operators ===

    /// Compile an expression, then every following operator binding at least
    /// as tightly as `min`.
    fn parse_oper(&mut self, script: &mut ScriptBuilder, min: Precedence) {
        // First instruction of the current left operand.
        let mut start = script.label();
        self.parse_expr(script, min);
        loop {
            let token = self.peek(0);
            if token.newline && starts_expression(&token) {
                if min > Precedence::Newline {
                    break;
                }
                // A new line starts a new statement.
                script.emit(Instruction::Pop);
                start = script.label();
                self.parse_oper(script, Precedence::Set);
                continue;
            }

            if let Some((op, level, rhs)) = infix_operator(&token) {
                if min > level {
                    break;
                }
                self.next();
                self.parse_oper(script, rhs);
                script.emit(Instruction::Binary(op));
                continue;
            }

            match (token.kind, token.text.as_str()) {
                (TokenKind::Operator, ";") if min <= Precedence::Seq => {
                    self.next();
                    let next = self.peek(0);
                    if next.kind == TokenKind::RParen || next.is_eof() {
                        // Trailing `;` before a closing bracket.
                        break;
                    }
                    script.emit(Instruction::Pop);
                    start = script.label();
                    self.parse_oper(script, Precedence::Set);
                }
                (TokenKind::Operator, ":=") if min <= Precedence::Set => {
                    self.next();
                    // The variable must be the whole left side, so that no
                    // jump of `and`/`or` lands on the assignment.
                    match script.last() {
                        Some(Instruction::GetVar(var)) if script.label() == start + 1 => {
                            script.pop_last();
                            self.parse_oper(script, Precedence::Set);
                            script.emit(Instruction::SetVar(var));
                        }
                        _ => {
                            self.errors.push(ParseError::new(
                                ParseErrorKind::InvalidAssignment,
                                token.span.clone(),
                                token.line,
                            ));
                            self.parse_oper(script, Precedence::Set);
                            script.emit(Instruction::Pop);
                        }
                    }
                }
                (TokenKind::Name, "and") if min <= Precedence::And => {
                    self.next();
                    let jump = script.jump_placeholder(Instruction::JumpShortAnd(0));
                    self.parse_oper(script, Precedence::Cmp);
                    script.patch_jump(jump);
                }
                (TokenKind::Name, "or") if min <= Precedence::And => {
                    self.next();
                    if self.peek(0).is("else") {
                        self.next();
                        self.parse_oper(script, Precedence::Cmp);
                        script.emit(Instruction::Binary(BinaryOp::OrElse));
                    } else {
                        let jump = script.jump_placeholder(Instruction::JumpShortOr(0));
                        self.parse_oper(script, Precedence::Cmp);
                        script.patch_jump(jump);
                    }
                }
                (TokenKind::Operator, ".") if min <= Precedence::Fun => {
                    self.next();
                    let member = self.next();
                    match member.kind {
                        TokenKind::Name | TokenKind::Int | TokenKind::Double | TokenKind::String => {
                            let index = script.add_constant(Value::String(member.text));
                            script.emit(Instruction::MemberConst(index));
                        }
                        _ => {
                            self.errors.push(ParseError::unexpected("a member name", &member));
                            if member.is_eof() || member.kind == TokenKind::RParen {
                                self.lexer.put_back();
                            }
                        }
                    }
                }
                (TokenKind::LParen, "(") if min <= Precedence::Fun => {
                    let callee = script.last();
                    let open = self.next();
                    let names = self.parse_arguments(script, &open);
                    let call = script.emit(Instruction::Call(names.len() as u32));
                    for name in names {
                        script.emit(Instruction::Arg(name));
                    }
                    if let Some(name) = self.callee_name(script, callee) {
                        script.name_call(call, name);
                    }
                }
                (TokenKind::LParen, "[") if min <= Precedence::Fun => {
                    let open = self.next();
                    self.parse_oper(script, Precedence::All);
                    self.expect("]", Some(&open));
                    script.emit(Instruction::Binary(BinaryOp::Member));
                }
                (TokenKind::Operator, "@") if min <= Precedence::Fun => {
                    self.next();
                    let open = self.peek(0);
                    if self.expect("(", None) {
                        let names = self.parse_arguments(script, &open);
                        script.emit(Instruction::MakeClosure(names.len() as u32));
                        for name in names {
                            script.emit(Instruction::Arg(name));
                        }
                    }
                }
                (TokenKind::LParen, "\"{") if min <= Precedence::String => {
                    let open = self.next();
                    self.parse_oper(script, Precedence::All);
                    script.emit(Instruction::Binary(BinaryOp::Add));
                    self.expect("}\"", Some(&open));
                    self.parse_oper(script, Precedence::None);
                    script.emit(Instruction::Binary(BinaryOp::Add));
                }
                _ => break,
            }
        }
    }

    /// Variable (or member) name of the function about to be called.
    fn callee_name(&self, script: &ScriptBuilder, callee: Option<Instruction>) -> Option<VarId> {
        match callee? {
            Instruction::GetVar(var) => Some(var),
            Instruction::MemberConst(index) => match script.constant(index)? {
                Value::String(name) => Some(VarId::new(name)),
                _ => None,
            },
            _ => None,
        }
    }
}

fn is_keyword(token: &Token) -> bool {
    token.kind == TokenKind::Name && INFIX_KEYWORDS.contains(&token.text.as_str())
}

/// Whether a token at the start of a line begins a new statement.
fn starts_expression(token: &Token) -> bool {
    match token.kind {
        TokenKind::Name => !is_keyword(token),
        TokenKind::Int | TokenKind::Double | TokenKind::String => true,
        TokenKind::LParen => token.text != "\"{",
        _ => false,
    }
}

/// Binary operator for a token: the operator, its level and the level of
/// its right operand.
fn infix_operator(token: &Token) -> Option<(BinaryOp, Precedence, Precedence)> {
    use Precedence::{Add, And, Cmp, Mul, Pow};
    let operator = match (token.kind, token.text.as_str()) {
        (TokenKind::Operator, "=" | "==") => (BinaryOp::Eq, Cmp, Add),
        (TokenKind::Operator, "!=") => (BinaryOp::Neq, Cmp, Add),
        (TokenKind::Operator, "<") => (BinaryOp::Lt, Cmp, Add),
        (TokenKind::Operator, ">") => (BinaryOp::Gt, Cmp, Add),
        (TokenKind::Operator, "<=") => (BinaryOp::Le, Cmp, Add),
        (TokenKind::Operator, ">=") => (BinaryOp::Ge, Cmp, Add),
        (TokenKind::Operator, "+") => (BinaryOp::Add, Add, Mul),
        (TokenKind::Operator, "-") => (BinaryOp::Sub, Add, Mul),
        (TokenKind::Operator, "*") => (BinaryOp::Mul, Mul, Pow),
        (TokenKind::Operator, "/") => (BinaryOp::FDiv, Mul, Pow),
        (TokenKind::Name, "div") => (BinaryOp::Div, Mul, Pow),
        (TokenKind::Name, "mod") => (BinaryOp::Mod, Mul, Pow),
        (TokenKind::Operator, "^") => (BinaryOp::Pow, Pow, Pow),
        (TokenKind::Name, "xor") => (BinaryOp::Xor, And, Cmp),
        _ => return None,
    };
    Some(operator)
}
