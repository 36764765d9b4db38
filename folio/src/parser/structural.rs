use serde::Deserialize;
use serde_json::Value as Json;

use crate::Template;
use crate::node::{Node, NodeKind, TextSource};
use crate::parser::error::ParseError;
use crate::parser::path::parse_path;
use crate::path::PathQuery;
use crate::style::{ClassDefinitions, ClassList, StyleMap};

/// Hard limit applied while lowering. The renderer's configurable depth cap
/// is checked separately.
const MAX_TEMPLATE_DEPTH: usize = 256;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse JSON template text.
pub fn parse_template(source: &str, file_id: usize) -> Result<Template, Vec<ParseError>> {
    let document: Json =
        serde_json::from_str(source).map_err(|e| vec![json_error(source, &e, file_id)])?;
    lower_document(&document, file_id)
}

/// Lower a JSON document into a typed Template, collecting every problem.
pub fn lower_document(document: &Json, file_id: usize) -> Result<Template, Vec<ParseError>> {
    let Some(object) = document.as_object() else {
        return Err(vec![ParseError::structural(
            "template document must be a JSON object",
            file_id,
        )]);
    };

    let mut state = LowerState::new(file_id);

    let classes = match object.get("classes") {
        None | Some(Json::Null) => ClassDefinitions::default(),
        Some(value) => ClassDefinitions::deserialize(value).unwrap_or_else(|e| {
            state.error(format!("invalid class definitions: {}", e), "/classes");
            ClassDefinitions::default()
        }),
    };

    let Some(root) = object.get("root") else {
        state.error("template has no `root` node", "");
        return Err(state.errors);
    };

    let root = state.lower_node(root, "/root".to_string(), 1);

    match root {
        Some(root) if state.errors.is_empty() => Ok(Template {
            depth: root.depth(),
            root,
            classes,
            source_id: file_id,
        }),
        _ => Err(state.errors),
    }
}

// ---------------------------------------------------------------------------
// Raw wire shape
// ---------------------------------------------------------------------------

// Both shapes ignore unknown keys, `type` included.

#[derive(Deserialize)]
struct RawContainer {
    path: Option<String>,
    class: Option<RawClass>,
    style: Option<StyleMap>,
    // `elements` is read from the document directly
}

#[derive(Deserialize)]
struct RawText {
    #[serde(alias = "data")]
    literal: Option<String>,
    #[serde(alias = "render")]
    computed: Option<String>,
    path: Option<String>,
    class: Option<RawClass>,
    style: Option<StyleMap>,
}

/// `"h1 muted"` or `["h1", "muted"]`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawClass {
    Attribute(String),
    Names(Vec<String>),
}

impl From<Option<RawClass>> for ClassList {
    fn from(raw: Option<RawClass>) -> Self {
        match raw {
            None => ClassList::default(),
            Some(RawClass::Attribute(attribute)) => ClassList::parse(&attribute),
            Some(RawClass::Names(names)) => names.into_iter().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Lowering
// ---------------------------------------------------------------------------

struct LowerState {
    file_id: usize,
    errors: Vec<ParseError>,
}

impl LowerState {
    fn new(file_id: usize) -> Self {
        LowerState {
            file_id,
            errors: Vec::new(),
        }
    }

    fn error(&mut self, message: impl Into<String>, pointer: &str) {
        let location = if pointer.is_empty() { "/" } else { pointer };
        self.errors.push(
            ParseError::structural(message, self.file_id).with_note(format!("at {}", location)),
        );
    }

    fn lower_node(&mut self, value: &Json, pointer: String, depth: usize) -> Option<Node> {
        if depth > MAX_TEMPLATE_DEPTH {
            self.error(
                format!("template nests deeper than {} levels", MAX_TEMPLATE_DEPTH),
                &pointer,
            );
            return None;
        }

        if !value.is_object() {
            self.error("node must be a JSON object", &pointer);
            return None;
        }

        match value.get("type").and_then(Json::as_str) {
            Some("container") => match RawContainer::deserialize(value) {
                Ok(container) => Some(self.lower_container(container, value, pointer, depth)),
                Err(e) => {
                    self.error(format!("invalid container node: {}", e), &pointer);
                    None
                }
            },
            Some("text") => match RawText::deserialize(value) {
                Ok(text) => Some(self.lower_text(text, pointer)),
                Err(e) => {
                    self.error(format!("invalid text node: {}", e), &pointer);
                    None
                }
            },
            Some(other) => {
                self.error(format!("unknown node type '{}'", other), &pointer);
                None
            }
            None => {
                self.errors.push(
                    ParseError::structural("node has no `type`", self.file_id)
                        .with_note(format!("at {}", pointer))
                        .with_note("expected \"container\" or \"text\""),
                );
                None
            }
        }
    }

    fn lower_container(&mut self, container: RawContainer, value: &Json, pointer: String, depth: usize) -> Node {
        let path = self.lower_path(container.path.as_deref(), &pointer);
        let elements = match value.get("elements") {
            None | Some(Json::Null) => &[][..],
            Some(Json::Array(elements)) => elements.as_slice(),
            Some(_) => {
                self.error("`elements` must be an array of nodes", &pointer);
                &[][..]
            }
        };
        let children = elements
            .iter()
            .enumerate()
            .filter_map(|(i, child)| {
                self.lower_node(child, format!("{}/elements/{}", pointer, i), depth + 1)
            })
            .collect();
        Node {
            path,
            class: container.class.into(),
            style: container.style.unwrap_or_default(),
            kind: NodeKind::Container(children),
            location: pointer,
        }
    }

    fn lower_text(&mut self, text: RawText, pointer: String) -> Node {
        let path = self.lower_path(text.path.as_deref(), &pointer);
        let (source, path) = if let Some(literal) = text.literal {
            (TextSource::Literal(literal), None)
        } else if let Some(computed) = text.computed {
            (TextSource::Computed(computed), None)
        } else if let Some(query) = path {
            (TextSource::Lookup(query.clone()), Some(query))
        } else {
            // An invalid path was already reported by lower_path
            if text.path.is_none() {
                self.errors.push(
                    ParseError::structural("text node has no content", self.file_id)
                        .with_note(format!("at {}", pointer))
                        .with_note("expected one of `literal`, `computed` or `path`"),
                );
            }
            (TextSource::Literal(String::new()), None)
        };
        Node {
            path,
            class: text.class.into(),
            style: text.style.unwrap_or_default(),
            kind: NodeKind::Text(source),
            location: pointer,
        }
    }

    fn lower_path(&mut self, path: Option<&str>, pointer: &str) -> Option<PathQuery> {
        let path = path?;
        match parse_path(path, self.file_id) {
            Ok(query) => Some(query),
            Err(e) => {
                self.error(
                    format!("invalid path '{}': {}", path, e.message),
                    &format!("{}/path", pointer),
                );
                None
            }
        }
    }
}

/// Convert a serde_json syntax error into a spanned ParseError.
fn json_error(source: &str, error: &serde_json::Error, file_id: usize) -> ParseError {
    let message = format!("invalid template JSON: {}", error);
    match line_column_offset(source, error.line(), error.column()) {
        Some(offset) => {
            let end = source[offset..]
                .chars()
                .next()
                .map(|c| offset + c.len_utf8())
                .unwrap_or(offset);
            ParseError::error(message, offset..end, file_id)
        }
        None => ParseError::structural(message, file_id),
    }
}

/// Byte offset of a 1-based line/column position, clamped to the source.
fn line_column_offset(source: &str, line: usize, column: usize) -> Option<usize> {
    if line == 0 {
        return None;
    }
    let line_start: usize = source
        .split_inclusive('\n')
        .take(line - 1)
        .map(str::len)
        .sum();
    let mut offset = (line_start + column.saturating_sub(1)).min(source.len());
    while !source.is_char_boundary(offset) {
        offset -= 1;
    }
    Some(offset)
}
