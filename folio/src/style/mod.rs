use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value as Json;

/// A set of style properties keyed by renderer-defined names
/// (`fontSize`, `color`, `marginTop`, ...).
pub type StyleMap = BTreeMap<String, Json>;

/// Named style bundles, loaded once per template and never mutated.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct ClassDefinitions {
    classes: BTreeMap<String, StyleMap>,
}

impl ClassDefinitions {
    pub fn get(&self, name: &str) -> Option<&StyleMap> {
        self.classes.get(name)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Class names attached to a node, in the order they were written.
/// Order matters: later classes override earlier ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassList(Vec<String>);

impl ClassList {
    /// Split a space-separated class attribute (`"h1 muted"`).
    pub fn parse(attribute: &str) -> Self {
        ClassList(attribute.split_whitespace().map(str::to_string).collect())
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<String> for ClassList {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        ClassList(
            iter.into_iter()
                .flat_map(|name| {
                    name.split_whitespace()
                        .map(str::to_string)
                        .collect::<Vec<_>>()
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_attribute_splits_on_any_whitespace() {
        let list = ClassList::parse("  h1\tmuted  wide ");
        assert_eq!(list.names(), ["h1", "muted", "wide"]);
    }

    #[test]
    fn class_array_entries_may_hold_several_names() {
        let list: ClassList = vec!["h1 muted".to_string(), "wide".to_string()]
            .into_iter()
            .collect();
        assert_eq!(list.names(), ["h1", "muted", "wide"]);
    }
}
