use folio::parser::ParseError;
use thiserror::Error;

/// Failure while evaluating a compiled expression.
///
/// These never abort a render: the node's text degrades to "".
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("type error in {function}(): expected {expected}, got {got}")]
    TypeError {
        function: &'static str,
        expected: &'static str,
        got: &'static str,
    },
    #[error("{function}() called with {got} argument(s)")]
    ArgumentCount { function: &'static str, got: usize },
    #[error("invalid path '{path}': {message}")]
    InvalidPath { path: String, message: String },
}

/// Failure that prevents a render from producing any output.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template nests {depth} levels deep, the limit is {limit}")]
    TooDeep { depth: usize, limit: usize },
    #[error("invalid template: {}", summarize(.0))]
    InvalidTemplate(Vec<ParseError>),
}

fn summarize(errors: &[ParseError]) -> String {
    match errors {
        [] => "no details".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{} (and {} more)", first, rest.len()),
    }
}

impl From<Vec<ParseError>> for RenderError {
    fn from(errors: Vec<ParseError>) -> Self {
        RenderError::InvalidTemplate(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_template_message_counts_remaining_errors() {
        let err = RenderError::from(vec![
            ParseError::structural("text node has no content", 0).with_note("at /root"),
            ParseError::structural("invalid node", 0),
        ]);
        assert_eq!(
            err.to_string(),
            "invalid template: text node has no content (at /root) (and 1 more)"
        );
    }
}
