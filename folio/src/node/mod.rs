use crate::path::PathQuery;
use crate::style::{ClassList, StyleMap};

/// A single node of a document template.
#[derive(Debug, Clone)]
pub struct Node {
    /// Data scope. A list-valued resolution repeats the node once per element.
    /// Only containers and `TextSource::Lookup` leaves carry one; for a lookup
    /// it is the same query as the lookup.
    pub path: Option<PathQuery>,
    pub class: ClassList,
    /// Inline style; always wins over `class`.
    pub style: StyleMap,
    pub kind: NodeKind,
    /// JSON pointer of this node within the template document, for diagnostics.
    pub location: String,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Layout container; children render in declaration order.
    Container(Vec<Node>),
    /// Text leaf.
    Text(TextSource),
}

/// Where a text leaf takes its content from.
/// When a template names several sources, the first in declaration order
/// here wins: literal, then computed, then lookup.
#[derive(Debug, Clone)]
pub enum TextSource {
    /// Fixed text.
    Literal(String),
    /// Expression source, compiled lazily through the renderer's cache.
    Computed(String),
    /// Data lookup relative to the current item.
    Lookup(PathQuery),
}

impl Node {
    pub fn children(&self) -> &[Node] {
        match &self.kind {
            NodeKind::Container(children) => children,
            NodeKind::Text(_) => &[],
        }
    }

    /// This node and all of its descendants, depth first.
    pub fn walk(&self) -> Vec<&Node> {
        let mut nodes = vec![self];
        for child in self.children() {
            nodes.extend(child.walk());
        }
        nodes
    }

    /// Nesting depth of the subtree rooted here (a leaf is 1).
    pub fn depth(&self) -> usize {
        1 + self
            .children()
            .iter()
            .map(Node::depth)
            .max()
            .unwrap_or(0)
    }
}
