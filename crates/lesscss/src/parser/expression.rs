//! Expression and guard parsing.
//!
//! Values are parsed by precedence climbing over the [`Operator`] levels:
//! an operand is read, then operators are folded in while their level is
//! above the caller's minimum. Whitespace between two operands forms a
//! space-separated list, so `1px solid @c` and `@a + @b` both parse
//! naturally.

use crate::error::{LessError, Result, SourcePosition};
use crate::options::DEFAULT_MAX_RECURSION;
use crate::parser::ast::{Expr, Operator};
use crate::parser::stylesheet::ImportContext;
use crate::parser::values::{parse_dimension, parse_hex_color, starts_number};
use crate::types::Value;
use std::sync::Arc;

/// A position-tracking cursor over a string slice.
#[derive(Clone, Debug)]
pub struct Scanner<'t> {
    text: &'t str,
    offset: usize,
    file: Option<Arc<str>>,
    line: u32,
    column: u32,
}

/// A saved scanner position.
#[derive(Clone, Copy, Debug)]
pub struct Mark {
    offset: usize,
    line: u32,
    column: u32,
}

impl<'t> Scanner<'t> {
    pub fn new(text: &'t str, start: &SourcePosition) -> Self {
        Self {
            text,
            offset: 0,
            file: start.file.clone(),
            line: start.line,
            column: start.column,
        }
    }

    pub fn rest(&self) -> &'t str {
        &self.text[self.offset..]
    }

    pub fn at_end(&self) -> bool {
        self.offset >= self.text.len()
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    pub fn peek_nth(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    pub fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.offset += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    /// Advances until `rest()` equals `remaining`, a suffix of it.
    pub fn consume_to(&mut self, remaining: &str) {
        let target = self.text.len() - remaining.len();
        while self.offset < target && self.bump().is_some() {}
    }

    /// Skips whitespace, returning `true` if any was skipped.
    pub fn skip_ws(&mut self) -> bool {
        let mut skipped = false;
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
            skipped = true;
        }
        skipped
    }

    pub fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Returns `true` if a case-insensitive `keyword` follows as a whole word.
    pub fn at_keyword(&self, keyword: &str) -> bool {
        let rest = self.rest();
        rest.get(..keyword.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(keyword))
            && !rest[keyword.len()..]
                .chars()
                .next()
                .is_some_and(is_word_char)
    }

    pub fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.at_keyword(keyword) {
            for _ in keyword.chars() {
                self.bump();
            }
            true
        } else {
            false
        }
    }

    pub fn mark(&self) -> Mark {
        Mark {
            offset: self.offset,
            line: self.line,
            column: self.column,
        }
    }

    pub fn reset(&mut self, mark: Mark) {
        self.offset = mark.offset;
        self.line = mark.line;
        self.column = mark.column;
    }

    pub fn position(&self) -> SourcePosition {
        SourcePosition::new(self.file.clone(), self.line, self.column)
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

fn is_word_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || !c.is_ascii()
}

/// Parses a complete value expression.
pub fn parse_expression(text: &str, pos: &SourcePosition, context: &ImportContext) -> Result<Expr> {
    ExpressionParser::new(text, pos, context).parse_all()
}

/// Parses the condition of a `when` clause.
pub fn parse_guard(text: &str, pos: &SourcePosition, context: &ImportContext) -> Result<Expr> {
    let mut parser = ExpressionParser::new(text, pos, context);
    parser.guard_mode = true;
    let guard = parser.parse_or()?;
    parser.expect_end()?;
    Ok(guard)
}

/// Deepest nesting of parentheses and call arguments accepted.
const MAX_NESTING: usize = DEFAULT_MAX_RECURSION;

struct ExpressionParser<'t, 'c> {
    scanner: Scanner<'t>,
    context: &'c ImportContext,
    /// Stop space lists at `and`, `or`, `not` and `when`.
    guard_mode: bool,
    nesting: usize,
}

impl<'t, 'c> ExpressionParser<'t, 'c> {
    fn new(text: &'t str, pos: &SourcePosition, context: &'c ImportContext) -> Self {
        Self {
            scanner: Scanner::new(text, pos),
            context,
            guard_mode: false,
            nesting: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> LessError {
        LessError::syntax(message, self.scanner.position())
    }

    /// Runs `parse` one level of nesting deeper.
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.nesting >= MAX_NESTING {
            return Err(LessError::RecursionLimit {
                name: "nested expression".to_string(),
                limit: MAX_NESTING,
                pos: self.scanner.position(),
            });
        }
        self.nesting += 1;
        let result = parse(self);
        self.nesting -= 1;
        result
    }

    fn parse_all(mut self) -> Result<Expr> {
        let expr = self.parse_expr(0)?;
        self.expect_end()?;
        Ok(expr)
    }

    fn expect_end(&mut self) -> Result<()> {
        self.scanner.skip_ws();
        match self.scanner.peek() {
            None => Ok(()),
            Some(c) => Err(self.error(format!("unexpected `{c}`"))),
        }
    }

    fn parse_expr(&mut self, min_level: u8) -> Result<Expr> {
        let mut left = self.parse_operand()?;
        loop {
            let mark = self.scanner.mark();
            let had_ws = self.scanner.skip_ws();
            let Some((op, len)) = self.peek_operator(had_ws) else {
                self.scanner.reset(mark);
                break;
            };
            if op.level() <= min_level {
                self.scanner.reset(mark);
                break;
            }
            let pos = self.scanner.position();
            for _ in 0..len {
                self.scanner.bump();
            }
            let right = self.parse_expr(op.level())?;
            left = combine(op, left, right, pos);
        }
        Ok(left)
    }

    fn peek_operator(&self, had_ws: bool) -> Option<(Operator, usize)> {
        let c = self.scanner.peek()?;
        let next = self.scanner.peek_nth(1);
        let op = match c {
            ',' => (Operator::Comma, 1),
            ')' | ']' | ';' | '{' | '}' => return None,
            '+' => (Operator::Add, 1),
            '-' if had_ws && next.is_some_and(|n| !n.is_whitespace()) => (Operator::Space, 0),
            '-' => (Operator::Sub, 1),
            '*' => (Operator::Mul, 1),
            '/' => (Operator::Div, 1),
            '=' => match next {
                Some('<') => (Operator::Le, 2),
                Some('>') => (Operator::Ge, 2),
                _ => (Operator::Eq, 1),
            },
            '<' if next == Some('=') => (Operator::Le, 2),
            '<' => (Operator::Lt, 1),
            '>' if next == Some('=') => (Operator::Ge, 2),
            '>' => (Operator::Gt, 1),
            ':' => (Operator::Colon, 1),
            _ if self.guard_mode && self.at_guard_keyword() => return None,
            _ if had_ws => (Operator::Space, 0),
            _ => (Operator::Concat, 0),
        };
        Some(op)
    }

    fn at_guard_keyword(&self) -> bool {
        ["and", "or", "not", "when"]
            .iter()
            .any(|keyword| self.scanner.at_keyword(keyword))
    }

    fn parse_operand(&mut self) -> Result<Expr> {
        self.scanner.skip_ws();
        let pos = self.scanner.position();
        let Some(c) = self.scanner.peek() else {
            return Err(self.error("expected a value"));
        };
        let next = self.scanner.peek_nth(1);

        match c {
            '(' => {
                self.scanner.bump();
                let inner = self.nested(|parser| parser.parse_expr(0))?;
                self.scanner.skip_ws();
                if !self.scanner.eat(')') {
                    return Err(self.error("expected `)`"));
                }
                Ok(Expr::Group(Box::new(inner)))
            }
            '"' | '\'' => self.parse_quoted(false, pos),
            '~' => {
                self.scanner.bump();
                match self.scanner.peek() {
                    Some('"' | '\'') => self.parse_quoted(true, pos),
                    Some('`') => self.parse_script(true, pos),
                    _ => Err(self.error("expected a string after `~`")),
                }
            }
            '`' => self.parse_script(false, pos),
            '@' if next == Some('{') => self.parse_word(pos),
            '@' => self.parse_variable(pos),
            '#' => match parse_hex_color(self.scanner.rest()) {
                Ok((rest, color)) => {
                    self.scanner.consume_to(rest);
                    Ok(Expr::Literal(Value::Color(color)))
                }
                Err(_) => self.parse_word(pos),
            },
            '!' => {
                self.scanner.bump();
                self.scanner.skip_ws();
                let word = self.read_word();
                Ok(Expr::keyword(format!("!{word}")))
            }
            '%' if next == Some('(') => {
                self.scanner.bump();
                self.parse_call("%".to_string(), pos)
            }
            _ if starts_number(self.scanner.rest()) => {
                let (rest, value) =
                    parse_dimension(self.scanner.rest()).map_err(|_| self.error("invalid number"))?;
                self.scanner.consume_to(rest);
                Ok(Expr::Literal(value))
            }
            '-' => match next {
                Some('@' | '(') => {
                    self.scanner.bump();
                    let operand = self.parse_operand()?;
                    Ok(Expr::Negate(Box::new(operand), pos))
                }
                Some(n) if is_word_start(n) || n == '-' => self.parse_word(pos),
                _ => Err(self.error("unexpected `-`")),
            },
            '.' => self.parse_word(pos),
            c if is_word_start(c) || c == '\\' => self.parse_word(pos),
            other => Err(self.error(format!("unexpected `{other}`"))),
        }
    }

    /// Reads identifier characters, escapes and `@{var}` interpolations.
    fn read_word(&mut self) -> String {
        let mut word = String::new();
        if let Some(first @ ('.' | '#' | '-')) = self.scanner.peek() {
            word.push(first);
            self.scanner.bump();
        }
        loop {
            match self.scanner.peek() {
                Some('@') if self.scanner.peek_nth(1) == Some('{') => {
                    while let Some(c) = self.scanner.bump() {
                        word.push(c);
                        if c == '}' {
                            break;
                        }
                    }
                }
                Some('\\') => {
                    self.scanner.bump();
                    word.push('\\');
                    if let Some(escaped) = self.scanner.bump() {
                        word.push(escaped);
                    }
                }
                Some(c) if is_word_char(c) => {
                    word.push(c);
                    self.scanner.bump();
                }
                _ => return word,
            }
        }
    }

    fn parse_word(&mut self, pos: SourcePosition) -> Result<Expr> {
        let word = self.read_word();
        if word.is_empty() || word == "-" {
            return Err(self.error("expected a value"));
        }
        if word.contains("@{") {
            return Ok(Expr::Interpolated {
                template: word,
                pos,
            });
        }
        if self.scanner.peek() == Some('(') {
            return self.parse_call(word, pos);
        }
        if word.eq_ignore_ascii_case("progid") && self.scanner.peek() == Some(':') {
            let raw = self.scanner.rest().trim_end().to_string();
            self.scanner.consume_to("");
            return Ok(Expr::keyword(format!("{word}{raw}")));
        }
        Ok(Expr::keyword(word))
    }

    fn parse_variable(&mut self, pos: SourcePosition) -> Result<Expr> {
        self.scanner.bump();
        let indirect = self.scanner.eat('@');
        let name = self.read_variable_name();
        if name.is_empty() {
            return Err(self.error("expected a variable name after `@`"));
        }
        Ok(if indirect {
            Expr::VariableVariable { name, pos }
        } else {
            Expr::Variable { name, pos }
        })
    }

    /// Variable names stop before a `-` that is not followed by a word
    /// character, so `@a-@b` reads as a subtraction.
    fn read_variable_name(&mut self) -> String {
        let mut name = String::new();
        while let Some(c) = self.scanner.peek() {
            let continues = match c {
                '-' => self
                    .scanner
                    .peek_nth(1)
                    .is_some_and(|n| n.is_alphanumeric() || n == '_' || n == '-'),
                c => c.is_alphanumeric() || c == '_',
            };
            if !continues {
                break;
            }
            name.push(c);
            self.scanner.bump();
        }
        name
    }

    fn parse_quoted(&mut self, escaped: bool, pos: SourcePosition) -> Result<Expr> {
        let Some(quote) = self.scanner.bump() else {
            return Err(self.error("expected a string"));
        };
        let mut text = String::new();
        loop {
            match self.scanner.bump() {
                None => return Err(LessError::syntax("unterminated string", pos)),
                Some('\\') => {
                    text.push('\\');
                    if let Some(escaped) = self.scanner.bump() {
                        text.push(escaped);
                    }
                }
                Some(c) if c == quote => break,
                Some(c) => text.push(c),
            }
        }
        Ok(if text.contains("@{") {
            Expr::Quoted {
                text,
                quote,
                escaped,
                pos,
            }
        } else if escaped {
            Expr::Literal(Value::keyword(text))
        } else {
            Expr::Literal(Value::quoted(text, quote))
        })
    }

    fn parse_script(&mut self, escaped: bool, pos: SourcePosition) -> Result<Expr> {
        self.scanner.bump();
        let mut source = String::new();
        loop {
            match self.scanner.bump() {
                None => return Err(LessError::syntax("unterminated script", pos)),
                Some('`') => break,
                Some(c) => source.push(c),
            }
        }
        Ok(Expr::Script {
            source,
            escaped,
            pos,
        })
    }

    /// Reads raw text up to the `)` closing an already opened parenthesis.
    fn read_raw_arguments(&mut self) -> Result<String> {
        let mut raw = String::new();
        let mut depth = 0usize;
        loop {
            match self.scanner.bump() {
                None => return Err(self.error("expected `)`")),
                Some(')') if depth == 0 => return Ok(raw),
                Some(c) => {
                    match c {
                        '(' => depth += 1,
                        ')' => depth -= 1,
                        _ => {}
                    }
                    raw.push(c);
                }
            }
        }
    }

    fn parse_call(&mut self, name: String, pos: SourcePosition) -> Result<Expr> {
        self.scanner.bump();
        let lower = name.to_ascii_lowercase();
        if lower == "url" {
            return self.parse_url(pos);
        }
        if lower == "alpha" && self.scanner.rest().trim_start().get(..7).is_some_and(|head| head.eq_ignore_ascii_case("opacity")) {
            let raw = self.read_raw_arguments()?;
            return Ok(Expr::keyword(format!("{name}({raw})")));
        }

        let mut args = Vec::new();
        loop {
            self.scanner.skip_ws();
            if self.scanner.eat(')') {
                break;
            }
            args.push(self.nested(|parser| parser.parse_expr(1))?);
            self.scanner.skip_ws();
            if self.scanner.eat(',') || self.scanner.eat(';') {
                continue;
            }
            if self.scanner.eat(')') {
                break;
            }
            return Err(self.error(format!("expected `,` or `)` in arguments of {name}")));
        }

        if lower == "data-uri" || lower == "colorize-image" {
            args.insert(
                0,
                Expr::Literal(Value::quoted(self.context.relative_dir.clone(), '"')),
            );
        }
        Ok(Expr::Call { name, args, pos })
    }

    fn parse_url(&mut self, pos: SourcePosition) -> Result<Expr> {
        self.scanner.skip_ws();
        let content_pos = self.scanner.position();
        let content = match self.scanner.peek() {
            Some('"' | '\'') => self.parse_quoted(false, content_pos)?,
            _ => {
                let mut raw = String::new();
                while let Some(c) = self.scanner.peek() {
                    if c == ')' {
                        break;
                    }
                    self.scanner.bump();
                    raw.push(c);
                    if c == '\\' {
                        if let Some(escaped) = self.scanner.bump() {
                            raw.push(escaped);
                        }
                    }
                }
                let raw = raw.trim_end().to_string();
                if raw.contains("@{") {
                    Expr::Interpolated {
                        template: raw,
                        pos: content_pos,
                    }
                } else if let Some(name) = raw.strip_prefix('@') {
                    Expr::Variable {
                        name: name.to_string(),
                        pos: content_pos,
                    }
                } else {
                    Expr::keyword(raw)
                }
            }
        };
        self.scanner.skip_ws();
        if !self.scanner.eat(')') {
            return Err(self.error("expected `)` to close url("));
        }
        Ok(Expr::Url {
            content: Box::new(content),
            import_dir: self.context.relative_dir.clone(),
            pos,
        })
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        loop {
            let mark = self.scanner.mark();
            self.scanner.skip_ws();
            let pos = self.scanner.position();
            if self.scanner.eat(',') || self.scanner.eat_keyword("or") {
                let right = self.parse_and()?;
                left = combine(Operator::Or, left, right, pos);
            } else {
                self.scanner.reset(mark);
                return Ok(left);
            }
        }
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_not()?;
        loop {
            let mark = self.scanner.mark();
            self.scanner.skip_ws();
            let pos = self.scanner.position();
            if self.scanner.eat_keyword("and") {
                let right = self.parse_not()?;
                left = combine(Operator::And, left, right, pos);
            } else {
                self.scanner.reset(mark);
                return Ok(left);
            }
        }
    }

    fn parse_not(&mut self) -> Result<Expr> {
        self.scanner.skip_ws();
        let pos = self.scanner.position();
        if self.scanner.eat_keyword("not") {
            let operand = self.nested(Self::parse_not)?;
            return Ok(Expr::Operation {
                op: Operator::Not,
                operands: vec![operand],
                pos,
            });
        }
        self.parse_condition()
    }

    fn parse_condition(&mut self) -> Result<Expr> {
        self.scanner.skip_ws();
        if self.scanner.peek() == Some('(') {
            let mark = self.scanner.mark();
            self.scanner.bump();
            if let Ok(inner) = self.nested(Self::parse_or) {
                self.scanner.skip_ws();
                if self.scanner.eat(')') {
                    let after = self.scanner.mark();
                    self.scanner.skip_ws();
                    let continues = self
                        .scanner
                        .peek()
                        .is_some_and(|c| "<>=+-*/".contains(c));
                    self.scanner.reset(after);
                    if !continues {
                        return Ok(Expr::Group(Box::new(inner)));
                    }
                }
            }
            self.scanner.reset(mark);
        }
        self.parse_expr(1)
    }
}

/// Builds an operation node, merging chains of the same associative
/// operator into one node.
fn combine(op: Operator, left: Expr, right: Expr, pos: SourcePosition) -> Expr {
    let merges = !op.is_comparison() && !matches!(op, Operator::Colon | Operator::Not);
    match left {
        Expr::Operation {
            op: left_op,
            mut operands,
            pos: left_pos,
        } if merges && left_op == op => {
            operands.push(right);
            Expr::Operation {
                op,
                operands,
                pos: left_pos,
            }
        }
        left => Expr::Operation {
            op,
            operands: vec![left, right],
            pos,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Expr {
        parse_expression(text, &SourcePosition::new(None, 1, 1), &ImportContext::default())
            .unwrap()
    }

    fn guard(text: &str) -> Expr {
        parse_guard(text, &SourcePosition::new(None, 1, 1), &ImportContext::default()).unwrap()
    }

    fn op_of(expr: &Expr) -> (Operator, usize) {
        match expr {
            Expr::Operation { op, operands, .. } => (*op, operands.len()),
            other => panic!("expected an operation, got {:?}", other),
        }
    }

    #[test]
    fn test_space_and_comma_lists() {
        let expr = parse("1px solid red, 2px dashed blue");
        assert_eq!(op_of(&expr), (Operator::Comma, 2));
        if let Expr::Operation { operands, .. } = &expr {
            assert_eq!(op_of(&operands[0]), (Operator::Space, 3));
        }
    }

    #[test]
    fn test_precedence() {
        let expr = parse("@a + @b * 2");
        assert_eq!(op_of(&expr), (Operator::Add, 2));
        if let Expr::Operation { operands, .. } = &expr {
            assert_eq!(op_of(&operands[1]), (Operator::Mul, 2));
        }
    }

    #[test]
    fn test_minus_forms() {
        // Binary with whitespace on both sides.
        assert_eq!(op_of(&parse("10px - 5px")), (Operator::Sub, 2));
        // Whitespace only before: a new list element.
        assert_eq!(op_of(&parse("0 -1px")), (Operator::Space, 2));
        // No whitespace: binary.
        assert_eq!(op_of(&parse("10-5")), (Operator::Sub, 2));
        assert!(matches!(parse("-@x"), Expr::Negate(..)));
        assert_eq!(parse("-webkit-box"), Expr::keyword("-webkit-box"));
    }

    #[test]
    fn test_variable_names_stop_before_operators() {
        let expr = parse("@a-@b");
        assert_eq!(op_of(&expr), (Operator::Sub, 2));
        assert!(matches!(parse("@@name"), Expr::VariableVariable { .. }));
    }

    #[test]
    fn test_two_character_comparisons() {
        for (text, op) in [
            ("@a >= 1", Operator::Ge),
            ("@a <= 1", Operator::Le),
            ("@a =< 1", Operator::Le),
            ("@a => 1", Operator::Ge),
            ("@a = 1", Operator::Eq),
        ] {
            assert_eq!(op_of(&parse(text)).0, op, "{}", text);
        }
    }

    #[test]
    fn test_calls_and_urls() {
        match parse("darken(@c, 10%)") {
            Expr::Call { name, args, .. } => {
                assert_eq!(name, "darken");
                assert_eq!(args.len(), 2);
            }
            other => panic!("unexpected {:?}", other),
        }
        match parse("url(http://example.com/a.png)") {
            Expr::Url { content, .. } => {
                assert_eq!(*content, Expr::keyword("http://example.com/a.png"))
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            parse("alpha(opacity=50)"),
            Expr::keyword("alpha(opacity=50)")
        );
    }

    #[test]
    fn test_data_uri_receives_base_path() {
        let context = ImportContext {
            relative_dir: "sub/".to_string(),
            ..Default::default()
        };
        let expr =
            parse_expression("data-uri('a.png')", &SourcePosition::unknown(), &context).unwrap();
        match expr {
            Expr::Call { args, .. } => {
                assert_eq!(args[0], Expr::Literal(Value::quoted("sub/", '"')));
                assert_eq!(args.len(), 2);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_strings() {
        assert_eq!(parse("\"a b\""), Expr::Literal(Value::quoted("a b", '"')));
        assert_eq!(parse("~\"raw\""), Expr::Literal(Value::keyword("raw")));
        assert!(matches!(parse("\"@{x}px\""), Expr::Quoted { .. }));
        assert!(matches!(parse("~`1 + 1`"), Expr::Script { escaped: true, .. }));
    }

    #[test]
    fn test_guards() {
        assert_eq!(op_of(&guard("(@a > 0) and (@b < 1)")), (Operator::And, 2));
        assert_eq!(op_of(&guard("(@a), (@b)")), (Operator::Or, 2));
        assert_eq!(op_of(&guard("not (@a = dark)")), (Operator::Not, 1));
        assert!(matches!(guard("(default())"), Expr::Group(_)));
        assert!(guard("(iscolor(@c)) and not (default())").uses_default());
    }

    #[test]
    fn test_unbalanced_input_is_an_error() {
        let result = parse_expression(
            "(1 + 2",
            &SourcePosition::new(None, 1, 1),
            &ImportContext::default(),
        );
        assert!(matches!(result, Err(LessError::Syntax { .. })));
    }
}
