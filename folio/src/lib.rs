pub mod expression;
pub mod node;
pub mod parser;
pub mod path;
pub mod style;

use serde_json::Value as Json;

use crate::node::Node;
use crate::parser::ParseError;
use crate::style::ClassDefinitions;

/// A loaded document template.
///
/// Templates are immutable once loaded; a single instance may be rendered
/// any number of times, from any number of threads.
#[derive(Debug, Clone)]
pub struct Template {
    /// Root of the node tree.
    pub root: Node,
    /// Named style bundles referenced through `class` on nodes.
    pub classes: ClassDefinitions,
    /// Deepest nesting level below and including `root` (a lone root is 1).
    pub depth: usize,
    /// The source file ID (for error reporting with codespan-reporting).
    pub source_id: usize,
}

impl Template {
    /// Load a template from an already-deserialized JSON document.
    pub fn from_value(document: &Json) -> Result<Template, Vec<ParseError>> {
        parser::parse_value(document, 0)
    }
}
