use folio::path::{Anchor, ComparisonOperator, Literal, PathQuery, Predicate, Step};
use serde_json::Value as Json;

use crate::environment::Scope;
use crate::runtime_value::Value;

/// Result of resolving a path, still borrowing the data.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved<'a> {
    Missing,
    Single(&'a Json),
    /// Matches of a wildcard or filter, in document order.
    Many(Vec<&'a Json>),
}

impl<'a> Resolved<'a> {
    /// Text form. A single JSON array is a list, like a wildcard match.
    pub fn into_value(self) -> Value {
        match self {
            Resolved::Missing => Value::Empty,
            Resolved::Single(json) => Value::from_json(json),
            Resolved::Many(matches) => {
                Value::List(matches.into_iter().map(Value::from_json).collect())
            }
        }
    }

    /// Elements a node should repeat over, if the result is list-shaped.
    pub fn elements(&self) -> Option<Vec<&'a Json>> {
        match self {
            Resolved::Many(matches) => Some(matches.clone()),
            Resolved::Single(Json::Array(items)) => Some(items.iter().collect()),
            _ => None,
        }
    }
}

/// Resolve `query` in `scope`. Misses are never errors.
pub fn resolve<'a>(scope: Scope<'a>, query: &PathQuery) -> Resolved<'a> {
    let start = match query.anchor {
        Anchor::Root => scope.root,
        Anchor::Item => scope.item,
    };

    let mut current = vec![start];
    let mut multi = false;

    for step in &query.steps {
        current = match step {
            Step::Field(name) => current
                .into_iter()
                .filter_map(|value| value.get(name.as_str()))
                .collect(),
            Step::Index(index) => current
                .into_iter()
                .filter_map(|value| value.as_array().and_then(|items| items.get(*index)))
                .collect(),
            Step::Wildcard => {
                multi = true;
                current.into_iter().flat_map(children).collect()
            }
            Step::Filter(predicate) => {
                multi = true;
                current
                    .into_iter()
                    .flat_map(children)
                    .filter(|element| matches(element, predicate))
                    .collect()
            }
        };

        if current.is_empty() && !multi {
            return Resolved::Missing;
        }
    }

    if multi {
        Resolved::Many(current)
    } else {
        match current.first().copied() {
            Some(Json::Null) | None => Resolved::Missing,
            Some(value) => Resolved::Single(value),
        }
    }
}

/// Convenience wrapper returning the text form directly.
pub fn resolve_value(scope: Scope<'_>, query: &PathQuery) -> Value {
    resolve(scope, query).into_value()
}

/// Array elements or object values, in document order.
fn children(value: &Json) -> Vec<&Json> {
    match value {
        Json::Array(items) => items.iter().collect(),
        Json::Object(map) => map.values().collect(),
        _ => Vec::new(),
    }
}

fn matches(element: &Json, predicate: &Predicate) -> bool {
    let field = predicate
        .field
        .iter()
        .try_fold(element, |value, name| value.get(name.as_str()));

    let equal = match (field, &predicate.literal) {
        (None, _) => false,
        (Some(Json::String(a)), Literal::String(b)) => a == b,
        (Some(Json::Bool(a)), Literal::Boolean(b)) => a == b,
        (Some(Json::Number(a)), Literal::Number(b)) => a.as_f64() == Some(*b),
        (Some(Json::Null), Literal::Null) => true,
        _ => false,
    };

    match predicate.operator {
        ComparisonOperator::Equal => equal,
        ComparisonOperator::NotEqual => !equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn query(source: &str) -> PathQuery {
        PathQuery::parse(source).expect("path should parse")
    }

    fn data() -> Json {
        json!({
            "basics": { "name": "Ada", "location": { "city": "London" } },
            "work": [
                { "name": "Acme", "highlights": ["Shipped", "Scaled"], "current": true },
                { "name": "Globex", "highlights": [], "current": false },
                { "name": "Initech", "highlights": ["Automated"] }
            ],
            "skills": { "lang": { "name": "Rust" }, "ops": { "name": "K8s" } },
            "nothing": null
        })
    }

    #[test]
    fn dotted_access() {
        let data = data();
        let scope = Scope::new(&data);
        assert_eq!(resolve_value(scope, &query("basics.location.city")), Value::from("London"));
        assert_eq!(resolve(scope, &query("basics.missing.city")), Resolved::Missing);
        assert_eq!(resolve(scope, &query("nothing")), Resolved::Missing);
    }

    #[test]
    fn root_anchor_ignores_current_item() {
        let data = data();
        let scope = Scope::new(&data).with_item(&data["work"][0]);
        assert_eq!(resolve_value(scope, &query("name")), Value::from("Acme"));
        assert_eq!(resolve_value(scope, &query("$.basics.name")), Value::from("Ada"));
    }

    #[test]
    fn wildcard_maps_trailing_fields() {
        let data = data();
        let scope = Scope::new(&data);
        assert_eq!(
            resolve_value(scope, &query("work[*].name")).texts(),
            ["Acme", "Globex", "Initech"]
        );
        assert_eq!(
            resolve_value(scope, &query("skills[*].name")).texts(),
            ["Rust", "K8s"]
        );
    }

    #[test]
    fn plain_path_to_array_is_list_shaped() {
        let data = data();
        let scope = Scope::new(&data);
        let resolved = resolve(scope, &query("work[0].highlights"));
        assert_eq!(resolved.elements().map(|e| e.len()), Some(2));
        assert_eq!(resolved.into_value().texts(), ["Shipped", "Scaled"]);
    }

    #[test]
    fn filters_keep_document_order() {
        let data = json!({
            "items": [
                { "label": "A", "enabled": true },
                { "label": "B", "enabled": false },
                { "label": "C", "enabled": true }
            ]
        });
        let scope = Scope::new(&data);
        assert_eq!(
            resolve_value(scope, &query("items[?(@.enabled==true)].label")).texts(),
            ["A", "C"]
        );
        assert_eq!(
            resolve_value(scope, &query("items[?(@.label!='A')].label")).texts(),
            ["B", "C"]
        );
    }

    #[test]
    fn filter_on_missing_field() {
        let data = data();
        let scope = Scope::new(&data);
        assert_eq!(
            resolve_value(scope, &query("work[?(@.current==true)].name")).texts(),
            ["Acme"]
        );
        assert_eq!(
            resolve_value(scope, &query("work[?(@.current!=true)].name")).texts(),
            ["Globex", "Initech"]
        );
    }

    #[test]
    fn wildcard_over_nothing_is_an_empty_list() {
        let data = data();
        let scope = Scope::new(&data);
        assert_eq!(resolve(scope, &query("missing[*]")), Resolved::Many(Vec::new()));
        assert!(resolve_value(scope, &query("missing[*]")).is_empty());
    }
}
