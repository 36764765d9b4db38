use std::fmt;
use std::sync::Arc;

use folio::Template;
use folio::node::{Node, NodeKind, TextSource};
use folio::parser::ParseError;
use folio::style::{ClassDefinitions, StyleMap};
use serde::Serialize;
use serde_json::Value as Json;
use tracing::{debug, warn};

use crate::cache::ExpressionCache;
use crate::dates::DateFormat;
use crate::environment::Scope;
use crate::error::RenderError;
use crate::resolver::{Resolved, resolve};
use crate::style::resolve_style;

pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Per-render settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    /// Format applied by `renderDates`.
    pub date_format: DateFormat,
    /// Templates nesting deeper than this are rejected before rendering.
    pub max_depth: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            date_format: DateFormat::default(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

// ---------------------------------------------------------------------------
// Output tree
// ---------------------------------------------------------------------------

/// A fully resolved node. Holds no reference to the template or the data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutputNode {
    Container {
        style: StyleMap,
        children: Vec<OutputNode>,
    },
    Text {
        style: StyleMap,
        text: String,
    },
}

impl OutputNode {
    pub fn style(&self) -> &StyleMap {
        match self {
            OutputNode::Container { style, .. } | OutputNode::Text { style, .. } => style,
        }
    }

    pub fn children(&self) -> &[OutputNode] {
        match self {
            OutputNode::Container { children, .. } => children,
            OutputNode::Text { .. } => &[],
        }
    }

    /// Leaf text, or None for containers.
    pub fn text(&self) -> Option<&str> {
        match self {
            OutputNode::Text { text, .. } => Some(text.as_str()),
            OutputNode::Container { .. } => None,
        }
    }

    /// Every leaf's text in document order, empty ones included.
    pub fn texts(&self) -> Vec<&str> {
        match self {
            OutputNode::Text { text, .. } => vec![text.as_str()],
            OutputNode::Container { children, .. } => {
                children.iter().flat_map(OutputNode::texts).collect()
            }
        }
    }
}

/// Plain-text view: one line per non-empty leaf.
impl fmt::Display for OutputNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for text in self.texts().into_iter().filter(|t| !t.is_empty()) {
            writeln!(f, "{}", text)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// A computed expression that does not compile.
#[derive(Debug, Clone)]
pub struct CompileFailure {
    /// JSON pointer of the text node.
    pub location: String,
    pub expression: String,
    /// Spans are byte offsets into `expression`.
    pub error: ParseError,
}

/// Renders templates against data. Cheap to clone; clones share the cache.
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    cache: Arc<ExpressionCache>,
    options: RenderOptions,
}

impl Renderer {
    pub fn new(options: RenderOptions) -> Self {
        Renderer {
            cache: Arc::new(ExpressionCache::new()),
            options,
        }
    }

    /// Use an existing cache, e.g. one shared by several renderers.
    pub fn with_cache(cache: Arc<ExpressionCache>, options: RenderOptions) -> Self {
        Renderer { cache, options }
    }

    pub fn cache(&self) -> &Arc<ExpressionCache> {
        &self.cache
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Compile every computed expression in `template` into the cache,
    /// returning the ones that fail.
    pub fn precompile(&self, template: &Template) -> Vec<CompileFailure> {
        template
            .root
            .walk()
            .into_iter()
            .filter_map(|node| match &node.kind {
                NodeKind::Text(TextSource::Computed(expression)) => {
                    self.cache.get_or_compile(expression).err().map(|error| CompileFailure {
                        location: node.location.clone(),
                        expression: expression.clone(),
                        error,
                    })
                }
                _ => None,
            })
            .collect()
    }

    /// Render `template` against `data`.
    ///
    /// The only failure is a template nesting deeper than `max_depth`;
    /// missing data and broken expressions degrade to empty text.
    pub fn render(&self, template: &Template, data: &Json) -> Result<OutputNode, RenderError> {
        if template.depth > self.options.max_depth {
            return Err(RenderError::TooDeep {
                depth: template.depth,
                limit: self.options.max_depth,
            });
        }

        let pass = RenderPass {
            renderer: self,
            classes: &template.classes,
        };
        let mut instances = pass.render_node(&template.root, Scope::new(data));
        debug!(instances = instances.len(), "rendered template root");

        if instances.len() == 1 {
            if let Some(only) = instances.pop() {
                return Ok(only);
            }
        }

        // The root expanded into zero or several instances
        Ok(OutputNode::Container {
            style: StyleMap::new(),
            children: instances,
        })
    }
}

/// State for one render call.
struct RenderPass<'r> {
    renderer: &'r Renderer,
    classes: &'r ClassDefinitions,
}

impl<'r> RenderPass<'r> {
    /// Render `node` in `scope`; a list-valued `path` yields one output per
    /// element, in order.
    fn render_node(&self, node: &Node, scope: Scope<'_>) -> Vec<OutputNode> {
        let style = resolve_style(&node.class, self.classes, &node.style);

        let Some(query) = &node.path else {
            return vec![self.render_instance(node, scope, style, Resolved::Single(scope.item))];
        };

        let resolved = resolve(scope, query);
        if let Some(elements) = resolved.elements() {
            return elements
                .into_iter()
                .map(|element| {
                    self.render_instance(
                        node,
                        scope.with_item(element),
                        style.clone(),
                        Resolved::Single(element),
                    )
                })
                .collect();
        }

        // Anything but a list renders once, with the current item unchanged
        vec![self.render_instance(node, scope, style, resolved)]
    }

    /// `bound` is what the node's own path selected for this instance; a
    /// lookup leaf takes its text from it.
    fn render_instance(&self, node: &Node, scope: Scope<'_>, style: StyleMap, bound: Resolved<'_>) -> OutputNode {
        match &node.kind {
            NodeKind::Container(children) => OutputNode::Container {
                style,
                children: children
                    .iter()
                    .flat_map(|child| self.render_node(child, scope))
                    .collect(),
            },
            NodeKind::Text(source) => {
                let text = match source {
                    TextSource::Literal(text) => text.clone(),
                    TextSource::Computed(expression) => self.compute(node, expression, scope),
                    TextSource::Lookup(_) => bound
                        .into_value()
                        .first_text()
                        .unwrap_or_default()
                        .to_string(),
                };
                OutputNode::Text { style, text }
            }
        }
    }

    fn compute(&self, node: &Node, expression: &str, scope: Scope<'_>) -> String {
        let compiled = match self.renderer.cache.get_or_compile(expression) {
            Ok(compiled) => compiled,
            Err(e) => {
                warn!(expression, node = %node.location, error = %e, "expression failed to compile");
                return String::new();
            }
        };

        match compiled.evaluate(scope.root, scope.item, &self.renderer.options.date_format) {
            Ok(value) => value.to_text(),
            Err(e) => {
                warn!(expression, node = %node.location, error = %e, "expression failed to evaluate");
                String::new()
            }
        }
    }
}

/// Render with a fresh cache.
pub fn render(template: &Template, data: &Json, options: &RenderOptions) -> Result<OutputNode, RenderError> {
    Renderer::new(options.clone()).render(template, data)
}

/// Load `template` from JSON and render it.
pub fn render_value(template: &Json, data: &Json, options: &RenderOptions) -> Result<OutputNode, RenderError> {
    let template = Template::from_value(template)?;
    render(&template, data, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render_json(template: Json, data: Json) -> OutputNode {
        render_value(&template, &data, &RenderOptions::default()).expect("render should succeed")
    }

    #[test]
    fn container_expands_over_list() {
        let output = render_json(
            json!({
                "root": {
                    "type": "container",
                    "elements": [{
                        "type": "container",
                        "path": "work",
                        "elements": [
                            { "type": "text", "path": "name" },
                            { "type": "text", "computed": "item.position + ' @ ' + root.basics.name" }
                        ]
                    }]
                }
            }),
            json!({
                "basics": { "name": "Ada" },
                "work": [
                    { "name": "Acme", "position": "Dev" },
                    { "name": "Globex", "position": "Lead" }
                ]
            }),
        );

        assert_eq!(output.children().len(), 2);
        assert_eq!(output.texts(), ["Acme", "Dev @ Ada", "Globex", "Lead @ Ada"]);
    }

    #[test]
    fn lookup_leaf_expands_into_one_leaf_per_element() {
        let output = render_json(
            json!({
                "root": {
                    "type": "container",
                    "elements": [{ "type": "text", "path": "keywords", "class": "tag" }]
                },
                "classes": { "tag": { "fontSize": 9 } }
            }),
            json!({ "keywords": ["Rust", "Go", "SQL"] }),
        );
        assert_eq!(output.texts(), ["Rust", "Go", "SQL"]);
        assert!(output.children().iter().all(|c| c.style()["fontSize"] == json!(9)));
    }

    #[test]
    fn object_path_keeps_the_current_item() {
        let output = render_json(
            json!({
                "root": {
                    "type": "container",
                    "path": "basics",
                    "elements": [
                        { "type": "text", "path": "basics.name" },
                        { "type": "text", "path": "name" }
                    ]
                }
            }),
            json!({ "basics": { "name": "Ada" } }),
        );
        assert_eq!(output.texts(), ["Ada", ""]);
    }

    #[test]
    fn computed_leaf_ignores_a_list_path() {
        let output = render_json(
            json!({
                "root": {
                    "type": "container",
                    "elements": [
                        { "type": "text", "computed": "'B'", "path": "tags" },
                        { "type": "text", "literal": "A", "path": "tags" }
                    ]
                }
            }),
            json!({ "tags": ["x", "y", "z"] }),
        );
        assert_eq!(output.texts(), ["B", "A"]);
    }

    #[test]
    fn scalar_path_leaves_the_item_alone() {
        let output = render_json(
            json!({
                "root": {
                    "type": "container",
                    "path": "basics.name",
                    "elements": [{ "type": "text", "path": "basics.label" }]
                }
            }),
            json!({ "basics": { "name": "Ada", "label": "Engineer" } }),
        );
        assert_eq!(output.texts(), ["Engineer"]);
    }

    #[test]
    fn expanded_root_is_wrapped() {
        let output = render_json(
            json!({ "root": { "type": "text", "path": "tags" } }),
            json!({ "tags": ["a", "b"] }),
        );
        assert!(output.style().is_empty());
        assert_eq!(output.texts(), ["a", "b"]);
    }

    #[test]
    fn empty_list_yields_no_instances() {
        let output = render_json(
            json!({
                "root": {
                    "type": "container",
                    "elements": [
                        { "type": "container", "path": "awards", "elements": [{ "type": "text", "literal": "x" }] },
                        { "type": "text", "literal": "after" }
                    ]
                }
            }),
            json!({ "awards": [] }),
        );
        assert_eq!(output.texts(), ["after"]);
    }

    #[test]
    fn broken_expression_degrades_to_empty_text() {
        let output = render_json(
            json!({
                "root": {
                    "type": "container",
                    "elements": [
                        { "type": "text", "computed": "item.name +" },
                        { "type": "text", "computed": "exec('rm')" },
                        { "type": "text", "computed": "p(item.bad)" },
                        { "type": "text", "literal": "still here" }
                    ]
                }
            }),
            json!({ "bad": "a..b" }),
        );
        assert_eq!(output.texts(), ["", "", "", "still here"]);
    }

    #[test]
    fn depth_limit_is_checked_before_rendering() {
        let template = Template::from_value(&json!({
            "root": {
                "type": "container",
                "elements": [{ "type": "container", "elements": [{ "type": "text", "literal": "x" }] }]
            }
        }))
        .expect("template should load");

        let renderer = Renderer::new(RenderOptions {
            max_depth: 2,
            ..RenderOptions::default()
        });
        assert!(matches!(
            renderer.render(&template, &json!({})),
            Err(RenderError::TooDeep { depth: 3, limit: 2 })
        ));
    }

    #[test]
    fn precompile_reports_failures_with_locations() {
        let template = Template::from_value(&json!({
            "root": {
                "type": "container",
                "elements": [
                    { "type": "text", "computed": "item.a" },
                    { "type": "text", "computed": "nope(1)" }
                ]
            }
        }))
        .expect("template should load");

        let renderer = Renderer::default();
        let failures = renderer.precompile(&template);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].location, "/root/elements/1");
        assert_eq!(failures[0].expression, "nope(1)");
        assert!(renderer.cache().contains("item.a"));
    }

    #[test]
    fn output_serializes_with_type_tags() {
        let output = render_json(
            json!({ "root": { "type": "text", "literal": "hi", "style": { "color": "red" } } }),
            json!({}),
        );
        assert_eq!(
            serde_json::to_value(&output).expect("serialize"),
            json!({ "type": "text", "style": { "color": "red" }, "text": "hi" })
        );
        assert_eq!(output.to_string(), "hi\n");
    }
}
