use folio::expression::{BinaryOperator, Builtin, Expr};
use folio::parser::ParseError;
use folio::parser::expression::parse_expression;
use folio::path::PathQuery;
use serde_json::Value as Json;

use crate::builtins;
use crate::dates::DateFormat;
use crate::environment::Scope;
use crate::error::EvalError;
use crate::resolver::resolve_value;
use crate::runtime_value::Value;

/// A compiled expression: pure, reusable, safe to share between threads.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpr {
    source: String,
    expr: Expr,
}

impl CompiledExpr {
    /// Parse `source`. Error spans are byte offsets into it.
    pub fn compile(source: &str) -> Result<CompiledExpr, ParseError> {
        let expr = parse_expression(source, 0)?;
        Ok(CompiledExpr {
            source: source.to_string(),
            expr,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate against a data root and current item.
    pub fn evaluate(&self, root: &Json, item: &Json, dates: &DateFormat) -> Result<Value, EvalError> {
        evaluate(&self.expr, Scope { root, item }, dates)
    }
}

/// Evaluate an expression AST node to produce a Value.
pub fn evaluate(expr: &Expr, scope: Scope<'_>, dates: &DateFormat) -> Result<Value, EvalError> {
    match expr {
        // --- Literals ---
        Expr::StringLiteral(s) => Ok(Value::Scalar(s.clone())),
        Expr::NumberLiteral(n) => Ok(Value::from_number(*n)),
        Expr::BooleanLiteral(b) => Ok(Value::from_bool(*b)),
        Expr::NullLiteral => Ok(Value::Empty),
        Expr::ArrayLiteral(items) => items
            .iter()
            .map(|item| evaluate(item, scope, dates))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),

        // --- References ---
        Expr::Reference(query, _) => Ok(resolve_value(scope, query)),

        // --- Operators ---
        Expr::BinaryOperation {
            operator: BinaryOperator::Concatenation,
            left,
            right,
        } => {
            let mut text = evaluate(left, scope, dates)?.to_text();
            text.push_str(&evaluate(right, scope, dates)?.to_text());
            Ok(Value::Scalar(text))
        }

        // --- Helpers ---
        Expr::Call {
            function,
            arguments,
            ..
        } => {
            let args = arguments
                .iter()
                .map(|arg| evaluate(arg, scope, dates))
                .collect::<Result<Vec<_>, _>>()?;
            call(*function, &args, scope, dates)
        }
    }
}

fn call(function: Builtin, args: &[Value], scope: Scope<'_>, dates: &DateFormat) -> Result<Value, EvalError> {
    match (function, args) {
        (Builtin::Path, [path]) => {
            let path = match path {
                Value::Empty => return Ok(Value::Empty),
                Value::Scalar(path) => path,
                Value::List(_) => return Err(type_error(function, "a path string", path)),
            };
            let query = PathQuery::parse(path).map_err(|e| EvalError::InvalidPath {
                path: path.clone(),
                message: e.message,
            })?;
            Ok(resolve_value(scope, &query))
        }
        (Builtin::Join, [list]) => Ok(builtins::join(list, None)),
        (Builtin::Join, [list, separator]) => {
            let separator = separator_text(function, separator)?;
            Ok(builtins::join(list, Some(separator.as_str())))
        }
        (Builtin::RenderDates, [list]) => Ok(builtins::render_dates(list, None, dates)),
        (Builtin::RenderDates, [list, separator]) => {
            let separator = separator_text(function, separator)?;
            Ok(builtins::render_dates(list, Some(separator.as_str()), dates))
        }
        _ => Err(EvalError::ArgumentCount {
            function: function.name(),
            got: args.len(),
        }),
    }
}

fn separator_text(function: Builtin, separator: &Value) -> Result<String, EvalError> {
    match separator {
        Value::List(_) => Err(type_error(function, "a separator string", separator)),
        other => Ok(other.to_text()),
    }
}

fn type_error(function: Builtin, expected: &'static str, got: &Value) -> EvalError {
    EvalError::TypeError {
        function: function.name(),
        expected,
        got: got.type_name(),
    }
}
