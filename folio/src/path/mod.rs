use std::fmt;

use crate::parser::ParseError;

/// A parsed path query: `work[*].position`, `$.basics.name`,
/// `items[?(@.enabled==true)]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PathQuery {
    pub anchor: Anchor,
    pub steps: Vec<Step>,
    /// The text the query was parsed from.
    pub source: String,
}

/// What a query is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// The current item (relative paths, `@`).
    Item,
    /// The data root (`$`).
    Root,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// `.name` or `['name']`
    Field(String),
    /// `[3]`
    Index(usize),
    /// `[*]`
    Wildcard,
    /// `[?(@.field==literal)]`
    Filter(Predicate),
}

/// Single comparison used by filter steps.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    /// Field path below `@`; `@.a.b` is `["a", "b"]`.
    pub field: Vec<String>,
    pub operator: ComparisonOperator,
    pub literal: Literal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    Equal,
    NotEqual,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Number(f64),
    Boolean(bool),
    Null,
}

impl PathQuery {
    /// Parse a path string. Error spans are byte offsets into `source`.
    pub fn parse(source: &str) -> Result<PathQuery, ParseError> {
        crate::parser::path::parse_path(source, 0)
    }
}

impl fmt::Display for PathQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}
