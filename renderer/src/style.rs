use folio::style::{ClassDefinitions, ClassList, StyleMap};
use tracing::debug;

/// Merge class bundles left to right, then the inline style on top.
///
/// Unknown class names are skipped.
pub fn resolve_style(classes: &ClassList, definitions: &ClassDefinitions, inline: &StyleMap) -> StyleMap {
    let mut style = StyleMap::new();

    for name in classes.names() {
        match definitions.get(name) {
            Some(bundle) => {
                style.extend(bundle.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            None => debug!(class = %name, "unknown style class"),
        }
    }

    style.extend(inline.iter().map(|(k, v)| (k.clone(), v.clone())));
    style
}
