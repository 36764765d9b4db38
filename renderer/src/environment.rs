use serde_json::Value as Json;

/// What a node can see while it renders: the data root and the current item.
///
/// There is no stack of enclosing items; a node only sees the item
/// established by its nearest expanding ancestor.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    pub root: &'a Json,
    pub item: &'a Json,
}

impl<'a> Scope<'a> {
    /// Top-level scope, where the current item is the root.
    pub fn new(root: &'a Json) -> Self {
        Scope { root, item: root }
    }

    /// Same root, new current item.
    pub fn with_item(self, item: &'a Json) -> Self {
        Scope {
            root: self.root,
            item,
        }
    }
}
