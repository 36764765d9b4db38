pub mod error;
pub mod expression;
pub mod path;
mod structural;

pub use error::ParseError;

use serde_json::Value as Json;

use crate::Template;

/// Template parser entry point.
pub struct Parser {
    source: String,
    file_id: usize,
}

impl Parser {
    pub fn new(source: String, file_id: usize) -> Self {
        Parser { source, file_id }
    }

    /// Parse JSON template text into a complete Template.
    pub fn parse(&self) -> Result<Template, Vec<ParseError>> {
        structural::parse_template(&self.source, self.file_id)
    }
}

/// Load a template from a JSON document the host already holds in memory.
pub fn parse_value(document: &Json, file_id: usize) -> Result<Template, Vec<ParseError>> {
    structural::lower_document(document, file_id)
}
