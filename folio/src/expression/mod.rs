use std::ops::{Range, RangeInclusive};

use crate::path::PathQuery;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    /// `a + b`: concatenation of the operands' text.
    Concatenation,
}

/// Helper functions callable from expressions. Nothing else is callable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// `p(path)`: path lookup relative to the current item.
    Path,
    /// `join(list, separator = '•')`
    Join,
    /// `renderDates(list, separator = '-')`
    RenderDates,
}

impl Builtin {
    pub fn from_name(name: &str) -> Option<Builtin> {
        match name {
            "p" => Some(Builtin::Path),
            "join" => Some(Builtin::Join),
            "renderDates" => Some(Builtin::RenderDates),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Path => "p",
            Builtin::Join => "join",
            Builtin::RenderDates => "renderDates",
        }
    }

    /// Accepted argument counts.
    pub fn arity(self) -> RangeInclusive<usize> {
        match self {
            Builtin::Path => 1..=1,
            Builtin::Join | Builtin::RenderDates => 1..=2,
        }
    }
}

/// An expression AST node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    // Literals
    StringLiteral(String),
    NumberLiteral(f64),
    BooleanLiteral(bool),
    NullLiteral,
    ArrayLiteral(Vec<Expr>),

    /// `root`, `item`, `item.a.b[*]`, or `p("literal.path")`: a path query
    /// fixed at compile time.
    Reference(PathQuery, Range<usize>),

    /// Helper call. `p` only appears here when its argument is computed.
    Call {
        function: Builtin,
        arguments: Vec<Expr>,
        span: Range<usize>,
    },

    BinaryOperation {
        operator: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}
