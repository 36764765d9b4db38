use crate::parser::error::ParseError;
use crate::path::{Anchor, ComparisonOperator, Literal, PathQuery, Predicate, Step};

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse a path query.
///
/// Grammar:
///
/// ```text
/// path      := ('$' | '@')? first? step*
/// first     := name                      (relative paths only)
/// step      := '.' name | '[' bracket ']'
/// bracket   := '*' | index | quoted | '?(' '@' ('.' name)+ op literal ')'
/// op        := '==' | '!='
/// literal   := quoted | number | 'true' | 'false' | 'null'
/// ```
pub fn parse_path(source: &str, file_id: usize) -> Result<PathQuery, ParseError> {
    let mut cursor = Cursor::new(source, file_id);
    let mut steps = Vec::new();

    let anchor = match cursor.peek() {
        None => return Err(cursor.error("empty path")),
        Some('$') => {
            cursor.bump();
            Anchor::Root
        }
        Some('@') => {
            cursor.bump();
            Anchor::Item
        }
        Some('[') => Anchor::Item,
        Some(_) => {
            steps.push(Step::Field(cursor.name()?));
            Anchor::Item
        }
    };

    while let Some(c) = cursor.peek() {
        match c {
            '.' => {
                cursor.bump();
                steps.push(Step::Field(cursor.name()?));
            }
            '[' => {
                cursor.bump();
                steps.push(cursor.bracket()?);
            }
            other => {
                return Err(cursor.error(format!("unexpected '{}' in path", other)));
            }
        }
    }

    Ok(PathQuery {
        anchor,
        steps,
        source: source.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Cursor
// ---------------------------------------------------------------------------

struct Cursor<'a> {
    source: &'a str,
    /// (byte offset, char) pairs.
    chars: Vec<(usize, char)>,
    pos: usize,
    file_id: usize,
}

impl<'a> Cursor<'a> {
    fn new(source: &'a str, file_id: usize) -> Self {
        Cursor {
            source,
            chars: source.char_indices().collect(),
            pos: 0,
            file_id,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|(_, c)| *c)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.pos)
            .map(|(offset, _)| *offset)
            .unwrap_or(self.source.len())
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        let start = self.offset();
        let end = self
            .peek()
            .map(|c| start + c.len_utf8())
            .unwrap_or(start);
        ParseError::error(message, start..end, self.file_id)
    }

    fn expect(&mut self, expected: char) -> Result<(), ParseError> {
        match self.peek() {
            Some(c) if c == expected => {
                self.bump();
                Ok(())
            }
            Some(c) => Err(self.error(format!("expected '{}', found '{}'", expected, c))),
            None => Err(self.error(format!("expected '{}', found end of path", expected))),
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    /// Field name: letters, digits, `_` and `-`.
    fn name(&mut self) -> Result<String, ParseError> {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '-' {
                name.push(c);
                self.bump();
            } else {
                break;
            }
        }
        if name.is_empty() {
            return Err(self.error("expected a field name"));
        }
        Ok(name)
    }

    /// Contents of `[...]`, after the opening bracket.
    fn bracket(&mut self) -> Result<Step, ParseError> {
        let step = match self.peek() {
            Some('*') => {
                self.bump();
                Step::Wildcard
            }
            Some(c) if c.is_ascii_digit() => Step::Index(self.index()?),
            Some(quote @ ('\'' | '"')) => {
                self.bump();
                Step::Field(self.quoted(quote)?)
            }
            Some('?') => {
                self.bump();
                self.expect('(')?;
                self.skip_whitespace();
                let predicate = self.predicate()?;
                self.skip_whitespace();
                self.expect(')')?;
                Step::Filter(predicate)
            }
            _ => {
                return Err(self
                    .error("expected '*', an index, a quoted key or a filter inside '[...]'"));
            }
        };
        self.expect(']')?;
        Ok(step)
    }

    fn index(&mut self) -> Result<usize, ParseError> {
        let start = self.pos;
        let mut digits = String::new();
        while let Some(c) = self.peek().filter(char::is_ascii_digit) {
            digits.push(c);
            self.bump();
        }
        digits.parse::<usize>().map_err(|_| {
            self.pos = start;
            self.error("array index out of range")
        })
    }

    /// Quoted string body, after the opening quote. `\` escapes the next char.
    fn quoted(&mut self, quote: char) -> Result<String, ParseError> {
        let mut text = String::new();
        loop {
            match self.bump() {
                Some('\\') => match self.bump() {
                    Some(c) => text.push(c),
                    None => return Err(self.error("unterminated string")),
                },
                Some(c) if c == quote => return Ok(text),
                Some(c) => text.push(c),
                None => return Err(self.error("unterminated string")),
            }
        }
    }

    fn predicate(&mut self) -> Result<Predicate, ParseError> {
        self.expect('@')?;
        let mut field = Vec::new();
        while self.peek() == Some('.') {
            self.bump();
            field.push(self.name()?);
        }
        if field.is_empty() {
            return Err(self.error("filter must compare a field of '@', e.g. '@.enabled'"));
        }

        self.skip_whitespace();
        let operator = match (self.peek(), self.chars.get(self.pos + 1).map(|(_, c)| *c)) {
            (Some('='), Some('=')) => ComparisonOperator::Equal,
            (Some('!'), Some('=')) => ComparisonOperator::NotEqual,
            _ => return Err(self.error("expected '==' or '!=' in filter")),
        };
        self.pos += 2;
        self.skip_whitespace();

        let literal = self.literal()?;
        Ok(Predicate {
            field,
            operator,
            literal,
        })
    }

    fn literal(&mut self) -> Result<Literal, ParseError> {
        match self.peek() {
            Some(quote @ ('\'' | '"')) => {
                self.bump();
                Ok(Literal::String(self.quoted(quote)?))
            }
            Some(c) if c == '-' || c.is_ascii_digit() => {
                let start = self.pos;
                let mut number = String::new();
                while let Some(c) = self
                    .peek()
                    .filter(|c: &char| c.is_ascii_digit() || matches!(*c, '-' | '+' | '.' | 'e' | 'E'))
                {
                    number.push(c);
                    self.bump();
                }
                number.parse::<f64>().map(Literal::Number).map_err(|_| {
                    self.pos = start;
                    self.error(format!("invalid number '{}'", number))
                })
            }
            Some(c) if c.is_ascii_alphabetic() => {
                let start = self.pos;
                let mut word = String::new();
                while let Some(c) = self.peek().filter(char::is_ascii_alphabetic) {
                    word.push(c);
                    self.bump();
                }
                match word.as_str() {
                    "true" => Ok(Literal::Boolean(true)),
                    "false" => Ok(Literal::Boolean(false)),
                    "null" => Ok(Literal::Null),
                    _ => {
                        self.pos = start;
                        Err(self.error(format!(
                            "expected a string, number, true, false or null, found '{}'",
                            word
                        )))
                    }
                }
            }
            _ => Err(self.error("expected a literal to compare against")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> PathQuery {
        parse_path(source, 0).expect("path should parse")
    }

    #[test]
    fn dotted_relative_path() {
        let query = parse("basics.location.city");
        assert_eq!(query.anchor, Anchor::Item);
        assert_eq!(
            query.steps,
            vec![
                Step::Field("basics".into()),
                Step::Field("location".into()),
                Step::Field("city".into()),
            ]
        );
    }

    #[test]
    fn root_anchor() {
        let query = parse("$.basics.name");
        assert_eq!(query.anchor, Anchor::Root);
        assert_eq!(query.steps.len(), 2);

        let bare = parse("$");
        assert_eq!(bare.anchor, Anchor::Root);
        assert!(bare.steps.is_empty());
    }

    #[test]
    fn wildcard_with_trailing_field() {
        let query = parse("work[*].highlights");
        assert_eq!(
            query.steps,
            vec![
                Step::Field("work".into()),
                Step::Wildcard,
                Step::Field("highlights".into()),
            ]
        );
    }

    #[test]
    fn index_and_quoted_key() {
        let query = parse("@['first name'][2]");
        assert_eq!(
            query.steps,
            vec![Step::Field("first name".into()), Step::Index(2)]
        );
    }

    #[test]
    fn filter_predicates() {
        let query = parse("items[?(@.enabled==true)]");
        assert_eq!(
            query.steps[1],
            Step::Filter(Predicate {
                field: vec!["enabled".into()],
                operator: ComparisonOperator::Equal,
                literal: Literal::Boolean(true),
            })
        );

        let query = parse("skills[?( @.meta.level != 'Beginner' )].name");
        match &query.steps[1] {
            Step::Filter(predicate) => {
                assert_eq!(predicate.field, vec!["meta".to_string(), "level".to_string()]);
                assert_eq!(predicate.operator, ComparisonOperator::NotEqual);
                assert_eq!(predicate.literal, Literal::String("Beginner".into()));
            }
            other => panic!("expected filter, got {:?}", other),
        }

        let query = parse("scores[?(@.value==-1.5)]");
        assert!(matches!(
            &query.steps[1],
            Step::Filter(Predicate { literal: Literal::Number(n), .. }) if *n == -1.5
        ));
    }

    #[test]
    fn malformed_paths_are_rejected() {
        for source in [
            "",
            "a..b",
            "a[",
            "a[*",
            "a[?(@.x=1)]",
            "a[?(enabled==true)]",
            "a[?(@.x==maybe)]",
            "a b",
            "$name",
            "a['open]",
        ] {
            assert!(parse_path(source, 0).is_err(), "expected '{}' to fail", source);
        }
    }

    #[test]
    fn error_span_points_at_offending_character() {
        let err = parse_path("work[*]!", 0).unwrap_err();
        assert_eq!(err.span, Some(7..8));
    }
}
