use std::ops::Range;

use crate::expression::{BinaryOperator, Builtin, Expr};
use crate::parser::error::ParseError;
use crate::parser::path::parse_path;
use crate::path::PathQuery;

// ---------------------------------------------------------------------------
// Token types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Token {
    // Literals
    Number(f64),
    StringLit(String),
    True,
    False,
    Null,

    /// Function name.
    Ident(String),
    /// `root` or `item` plus accessors, rewritten as path text (`$.a.b`, `@[0]`).
    Reference(String),

    Plus,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum TokenKind {
    Number,
    StringLit,
    True,
    False,
    Null,
    Ident,
    Reference,
    Plus,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
}

fn token_kind(t: &Token) -> TokenKind {
    match t {
        Token::Number(_) => TokenKind::Number,
        Token::StringLit(_) => TokenKind::StringLit,
        Token::True => TokenKind::True,
        Token::False => TokenKind::False,
        Token::Null => TokenKind::Null,
        Token::Ident(_) => TokenKind::Ident,
        Token::Reference(_) => TokenKind::Reference,
        Token::Plus => TokenKind::Plus,
        Token::Comma => TokenKind::Comma,
        Token::LParen => TokenKind::LParen,
        Token::RParen => TokenKind::RParen,
        Token::LBracket => TokenKind::LBracket,
        Token::RBracket => TokenKind::RBracket,
    }
}

fn describe(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::Number => "number",
        TokenKind::StringLit => "string",
        TokenKind::True | TokenKind::False => "boolean",
        TokenKind::Null => "null",
        TokenKind::Ident => "name",
        TokenKind::Reference => "reference",
        TokenKind::Plus => "'+'",
        TokenKind::Comma => "','",
        TokenKind::LParen => "'('",
        TokenKind::RParen => "')'",
        TokenKind::LBracket => "'['",
        TokenKind::RBracket => "']'",
    }
}

/// Nested calls, arrays and parentheses beyond this depth are rejected.
const MAX_NESTING: usize = 64;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse an expression string into an AST.
///
/// Grammar:
///
/// ```text
/// expr      := primary ('+' primary)*
/// primary   := string | number | 'true' | 'false' | 'null'
///            | '[' (expr (',' expr)* ','?)? ']'
///            | name '(' (expr (',' expr)*)? ')'
///            | ('root' | 'item') accessor*
///            | '(' expr ')'
/// accessor  := '.' field | '[' path-bracket ']'
/// ```
///
/// Spans in errors are byte offsets into `source`.
pub fn parse_expression(source: &str, file_id: usize) -> Result<Expr, ParseError> {
    let tokens = tokenize(source, file_id)?;
    let mut parser = ExprParser::new(tokens, source.len(), file_id);
    let expr = parser.parse_expr(0)?;
    if !parser.at_end() {
        return Err(parser.error("unexpected tokens after expression"));
    }
    Ok(expr)
}

// ---------------------------------------------------------------------------
// Tokenizer: expression text → Token stream
// ---------------------------------------------------------------------------

fn tokenize(source: &str, file_id: usize) -> Result<Vec<(Token, Range<usize>)>, ParseError> {
    let chars: Vec<char> = source.chars().collect();
    let len = chars.len();

    // Map character indices to byte offsets within the text
    let byte_pos: Vec<usize> = {
        let mut bp = Vec::with_capacity(len + 1);
        let mut offset = 0;
        for c in &chars {
            bp.push(offset);
            offset += c.len_utf8();
        }
        bp.push(offset);
        bp
    };
    let span = |start: usize, end: usize| byte_pos[start]..byte_pos[end];

    let mut tokens = Vec::new();
    let mut i = 0;

    while i < len {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => {
                i += 1;
            }

            // String literal, either quote style
            '"' | '\'' => {
                let start = i;
                i += 1;
                let mut s = String::new();
                loop {
                    if i >= len {
                        return Err(ParseError::error(
                            "unterminated string literal",
                            span(start, len),
                            file_id,
                        ));
                    }
                    match chars[i] {
                        '\\' if i + 1 < len => {
                            s.push(match chars[i + 1] {
                                'n' => '\n',
                                't' => '\t',
                                other => other,
                            });
                            i += 2;
                        }
                        ch if ch == c => {
                            i += 1;
                            break;
                        }
                        ch => {
                            s.push(ch);
                            i += 1;
                        }
                    }
                }
                tokens.push((Token::StringLit(s), span(start, i)));
            }

            // Numbers
            '0'..='9' => {
                let start = i;
                while i < len && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let num_str: String = chars[start..i].iter().collect();
                match num_str.parse::<f64>() {
                    Ok(n) => tokens.push((Token::Number(n), span(start, i))),
                    Err(_) => {
                        return Err(ParseError::error(
                            format!("invalid number '{}'", num_str),
                            span(start, i),
                            file_id,
                        ));
                    }
                }
            }

            // Identifiers, keywords and references
            'a'..='z' | 'A'..='Z' | '_' => {
                let start = i;
                while i < len && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                let token = match ident.as_str() {
                    "true" => Token::True,
                    "false" => Token::False,
                    "null" => Token::Null,
                    "root" | "item" => {
                        let anchor = if ident == "root" { '$' } else { '@' };
                        let suffix_start = i;
                        i = scan_accessors(&chars, i);
                        let mut text = anchor.to_string();
                        text.extend(&chars[suffix_start..i]);
                        Token::Reference(text)
                    }
                    _ => Token::Ident(ident),
                };
                tokens.push((token, span(start, i)));
            }

            '+' => {
                tokens.push((Token::Plus, span(i, i + 1)));
                i += 1;
            }
            ',' => {
                tokens.push((Token::Comma, span(i, i + 1)));
                i += 1;
            }
            '(' => {
                tokens.push((Token::LParen, span(i, i + 1)));
                i += 1;
            }
            ')' => {
                tokens.push((Token::RParen, span(i, i + 1)));
                i += 1;
            }
            '[' => {
                tokens.push((Token::LBracket, span(i, i + 1)));
                i += 1;
            }
            ']' => {
                tokens.push((Token::RBracket, span(i, i + 1)));
                i += 1;
            }

            other => {
                return Err(ParseError::error(
                    format!("unexpected character '{}'", other),
                    span(i, i + 1),
                    file_id,
                ));
            }
        }
    }

    Ok(tokens)
}

/// Scan the accessor chain following `root` / `item` (`.a.b`, `[*]`,
/// `[?(@.x == 'y')]`). Returns the index just past it. Brackets may contain
/// whitespace and quoted strings; outside brackets the chain ends at the
/// first character that cannot belong to a field name.
fn scan_accessors(chars: &[char], mut i: usize) -> usize {
    if !matches!(chars.get(i), Some('.') | Some('[')) {
        return i;
    }

    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    while i < chars.len() {
        let c = chars[i];
        if let Some(q) = quote {
            if c == '\\' {
                i = (i + 2).min(chars.len());
                continue;
            }
            if c == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match c {
            '[' => depth += 1,
            ']' if depth == 0 => break,
            ']' => depth -= 1,
            '\'' | '"' if depth > 0 => quote = Some(c),
            c if depth == 0 && !(c.is_alphanumeric() || matches!(c, '_' | '-' | '.')) => break,
            _ => {}
        }
        i += 1;
    }

    i
}

// ---------------------------------------------------------------------------
// Pratt parser
// ---------------------------------------------------------------------------

struct ExprParser {
    tokens: Vec<(Token, Range<usize>)>,
    pos: usize,
    /// Byte length of the source, for errors at end of input.
    end: usize,
    /// End offset of the most recently consumed token.
    last_end: usize,
    file_id: usize,
    depth: usize,
}

// Binding powers (precedence). Higher = tighter binding.
const BP_CONCAT: u8 = 2; // +

impl ExprParser {
    fn new(tokens: Vec<(Token, Range<usize>)>, end: usize, file_id: usize) -> Self {
        ExprParser {
            tokens,
            pos: 0,
            end,
            last_end: 0,
            file_id,
            depth: 0,
        }
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.tokens.get(self.pos).map(|(t, _)| token_kind(t))
    }

    fn advance(&mut self) -> Option<(Token, Range<usize>)> {
        let next = self.tokens.get(self.pos).cloned()?;
        self.pos += 1;
        self.last_end = next.1.end;
        Some(next)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn current_span(&self) -> Range<usize> {
        self.tokens
            .get(self.pos)
            .map(|(_, span)| span.clone())
            .unwrap_or(self.end..self.end)
    }

    fn error(&self, msg: impl Into<String>) -> ParseError {
        ParseError::error(msg, self.current_span(), self.file_id)
    }

    fn expect_token_kind(&mut self, kind: TokenKind) -> Result<(), ParseError> {
        match self.peek_kind() {
            Some(k) if k == kind => {
                self.advance();
                Ok(())
            }
            Some(other) => Err(self.error(format!(
                "expected {}, found {}",
                describe(kind),
                describe(other)
            ))),
            None => Err(self.error(format!(
                "expected {}, found end of expression",
                describe(kind)
            ))),
        }
    }

    // ------------------------------------------------------------------
    // Pratt parser core
    // ------------------------------------------------------------------

    fn parse_expr(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(self.error("expression nests too deeply"));
        }

        let mut left = self.parse_prefix()?;

        loop {
            let Some(kind) = self.peek_kind() else { break };
            let Some((l_bp, r_bp)) = infix_bp(kind) else { break };

            if l_bp < min_bp {
                break;
            }

            self.advance();
            let right = self.parse_expr(r_bp)?;
            left = Expr::BinaryOperation {
                operator: BinaryOperator::Concatenation,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        self.depth -= 1;
        Ok(left)
    }

    fn parse_prefix(&mut self) -> Result<Expr, ParseError> {
        let (token, span) = self
            .advance()
            .ok_or_else(|| self.error("unexpected end of expression"))?;

        match token {
            // Literals
            Token::Number(n) => Ok(Expr::NumberLiteral(n)),
            Token::StringLit(s) => Ok(Expr::StringLiteral(s)),
            Token::True => Ok(Expr::BooleanLiteral(true)),
            Token::False => Ok(Expr::BooleanLiteral(false)),
            Token::Null => Ok(Expr::NullLiteral),

            // root / item with accessors
            Token::Reference(text) => {
                let query = self.parse_embedded_path(&text, &span)?;
                Ok(Expr::Reference(query, span))
            }

            // Helper call
            Token::Ident(name) => self.parse_call(name, span),

            // Array literal
            Token::LBracket => Ok(Expr::ArrayLiteral(self.parse_list(TokenKind::RBracket)?)),

            // Parenthesized expression
            Token::LParen => {
                let expr = self.parse_expr(0)?;
                self.expect_token_kind(TokenKind::RParen)?;
                Ok(expr)
            }

            other => Err(ParseError::error(
                format!("unexpected {}", describe(token_kind(&other))),
                span,
                self.file_id,
            )),
        }
    }

    fn parse_call(&mut self, name: String, span: Range<usize>) -> Result<Expr, ParseError> {
        let function = Builtin::from_name(&name).ok_or_else(|| {
            ParseError::error(format!("unknown name '{}'", name), span.clone(), self.file_id)
                .with_note("expressions may use root, item, p(...), join(...) and renderDates(...)")
        })?;

        self.expect_token_kind(TokenKind::LParen)
            .map_err(|e| e.with_note(format!("'{}' is a function and must be called", name)))?;
        let arguments = self.parse_list(TokenKind::RParen)?;
        let call_span = span.start..self.last_end;

        let arity = function.arity();
        if !arity.contains(&arguments.len()) {
            let expected = if arity.start() == arity.end() {
                arity.start().to_string()
            } else {
                format!("{} or {}", arity.start(), arity.end())
            };
            return Err(ParseError::error(
                format!(
                    "{}() takes {} argument(s), got {}",
                    function.name(),
                    expected,
                    arguments.len()
                ),
                call_span,
                self.file_id,
            ));
        }

        // p("literal") is resolved once here rather than on every evaluation
        if function == Builtin::Path {
            if let [Expr::StringLiteral(path)] = arguments.as_slice() {
                let query = self.parse_embedded_path(path, &call_span)?;
                return Ok(Expr::Reference(query, call_span));
            }
        }

        Ok(Expr::Call {
            function,
            arguments,
            span: call_span,
        })
    }

    /// Comma-separated expressions up to and including `close`.
    /// A trailing comma is allowed.
    fn parse_list(&mut self, close: TokenKind) -> Result<Vec<Expr>, ParseError> {
        let mut items = Vec::new();
        loop {
            if self.peek_kind() == Some(close) {
                self.advance();
                break;
            }
            items.push(self.parse_expr(0)?);
            match self.peek_kind() {
                Some(TokenKind::Comma) => {
                    self.advance();
                }
                Some(k) if k == close => {
                    self.advance();
                    break;
                }
                _ => {
                    return Err(self.error(format!("expected ',' or {}", describe(close))));
                }
            }
        }
        Ok(items)
    }

    fn parse_embedded_path(&self, text: &str, span: &Range<usize>) -> Result<PathQuery, ParseError> {
        parse_path(text, self.file_id).map_err(|mut e| {
            e.message = format!("invalid path '{}': {}", text, e.message);
            e.with_span(span.clone())
        })
    }
}

/// Infix binding powers: returns (left_bp, right_bp) or None if not infix.
fn infix_bp(kind: TokenKind) -> Option<(u8, u8)> {
    match kind {
        TokenKind::Plus => Some((BP_CONCAT, BP_CONCAT + 1)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::{Anchor, Step};

    fn parse(source: &str) -> Expr {
        parse_expression(source, 0).expect("expression should parse")
    }

    #[test]
    fn literals() {
        assert_eq!(parse("'hello'"), Expr::StringLiteral("hello".into()));
        assert_eq!(parse("\"it\\'s\""), Expr::StringLiteral("it's".into()));
        assert_eq!(parse("42"), Expr::NumberLiteral(42.0));
        assert_eq!(parse("null"), Expr::NullLiteral);
        assert_eq!(
            parse("[\"a\", null, true,]"),
            Expr::ArrayLiteral(vec![
                Expr::StringLiteral("a".into()),
                Expr::NullLiteral,
                Expr::BooleanLiteral(true),
            ])
        );
    }

    #[test]
    fn item_and_root_references() {
        match parse("item.position") {
            Expr::Reference(query, span) => {
                assert_eq!(query.anchor, Anchor::Item);
                assert_eq!(query.steps, vec![Step::Field("position".into())]);
                assert_eq!(span, 0..13);
            }
            other => panic!("expected reference, got {:?}", other),
        }

        match parse("root") {
            Expr::Reference(query, _) => {
                assert_eq!(query.anchor, Anchor::Root);
                assert!(query.steps.is_empty());
            }
            other => panic!("expected reference, got {:?}", other),
        }

        match parse("root.work[?(@.name == 'Acme Co')].highlights") {
            Expr::Reference(query, _) => {
                assert_eq!(query.anchor, Anchor::Root);
                assert_eq!(query.steps.len(), 3);
            }
            other => panic!("expected reference, got {:?}", other),
        }
    }

    #[test]
    fn literal_path_call_becomes_reference() {
        match parse("p('location.city')") {
            Expr::Reference(query, _) => {
                assert_eq!(query.anchor, Anchor::Item);
                assert_eq!(query.source, "location.city");
            }
            other => panic!("expected reference, got {:?}", other),
        }
    }

    #[test]
    fn computed_path_call_stays_a_call() {
        let expr = parse("p('skills.' + item.kind)");
        assert!(matches!(
            expr,
            Expr::Call { function: Builtin::Path, .. }
        ));
    }

    #[test]
    fn concatenation_is_left_associative() {
        let expr = parse("'a' + 'b' + 'c'");
        match expr {
            Expr::BinaryOperation { left, right, .. } => {
                assert!(matches!(*left, Expr::BinaryOperation { .. }));
                assert_eq!(*right, Expr::StringLiteral("c".into()));
            }
            other => panic!("expected concatenation, got {:?}", other),
        }
    }

    #[test]
    fn nested_helper_calls() {
        let expr = parse("join([item.startDate, renderDates([item.startDate, item.endDate])], ' | ')");
        match expr {
            Expr::Call { function, arguments, span } => {
                assert_eq!(function, Builtin::Join);
                assert_eq!(arguments.len(), 2);
                assert_eq!(span.start, 0);
            }
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn unknown_function_is_rejected() {
        let err = parse_expression("eval('1')", 0).unwrap_err();
        assert!(err.message.contains("unknown name 'eval'"));
        assert_eq!(err.span, Some(0..4));
    }

    #[test]
    fn bare_helper_name_must_be_called() {
        let err = parse_expression("join", 0).unwrap_err();
        assert!(err.notes.iter().any(|n| n.contains("must be called")));
    }

    #[test]
    fn arity_is_checked() {
        let err = parse_expression("p('a', 'b')", 0).unwrap_err();
        assert!(err.message.contains("takes 1 argument"));
        assert!(parse_expression("join()", 0).is_err());
        assert!(parse_expression("renderDates(item.dates, '-', 'x')", 0).is_err());
    }

    #[test]
    fn malformed_expressions_are_rejected() {
        for source in [
            "",
            "'unterminated",
            "item.a +",
            "join(item.a",
            "[1, 2",
            "item.a; root",
            "p('a..b')",
            "item.x[",
            "1 2",
        ] {
            assert!(parse_expression(source, 0).is_err(), "expected '{}' to fail", source);
        }
    }

    #[test]
    fn embedded_path_error_spans_the_whole_reference() {
        let err = parse_expression("'x' + p('a..b')", 0).unwrap_err();
        assert!(err.message.starts_with("invalid path 'a..b'"));
        assert_eq!(err.span, Some(6..15));
    }

    #[test]
    fn deep_nesting_is_rejected() {
        let source = format!("{}'x'{}", "(".repeat(200), ")".repeat(200));
        let err = parse_expression(&source, 0).unwrap_err();
        assert!(err.message.contains("nests too deeply"));
    }
}
