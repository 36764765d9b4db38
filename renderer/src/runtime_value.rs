use std::fmt;

use serde_json::Value as Json;

/// A value produced by a path lookup or an expression.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    /// Nothing matched, or the data held `null`.
    #[default]
    Empty,
    Scalar(String),
    /// Ordered matches; entries may themselves be lists or empty.
    List(Vec<Value>),
}

impl Value {
    /// Convert a JSON value into its text form.
    ///
    /// Falsy data (`null`, `false`, `0`) and objects, which have no text
    /// form, become `Empty`. Other numbers and `true` become their display
    /// strings; arrays become lists.
    pub fn from_json(json: &Json) -> Value {
        match json {
            Json::Null | Json::Object(_) | Json::Bool(false) => Value::Empty,
            Json::Bool(true) => Value::from("true"),
            Json::String(s) => Value::Scalar(s.clone()),
            Json::Number(n) => match n.as_f64() {
                Some(f) => Value::from_number(f),
                None => Value::Scalar(n.to_string()),
            },
            Json::Array(items) => Value::List(items.iter().map(Value::from_json).collect()),
        }
    }

    /// Zero is falsy and reads as `Empty`.
    pub fn from_number(n: f64) -> Value {
        if n == 0.0 {
            Value::Empty
        } else {
            Value::Scalar(format_number(n))
        }
    }

    pub fn from_bool(b: bool) -> Value {
        if b { Value::from("true") } else { Value::Empty }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Value::Empty => true,
            Value::Scalar(s) => s.is_empty(),
            Value::List(items) => items.iter().all(Value::is_empty),
        }
    }

    /// The first non-empty text, descending into lists.
    pub fn first_text(&self) -> Option<&str> {
        match self {
            Value::Empty => None,
            Value::Scalar(s) if s.is_empty() => None,
            Value::Scalar(s) => Some(s.as_str()),
            Value::List(items) => items.iter().find_map(Value::first_text),
        }
    }

    /// Every non-empty text, flattening nested lists, in order.
    pub fn texts(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_texts(&mut out);
        out
    }

    fn collect_texts<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Value::Empty => {}
            Value::Scalar(s) if s.is_empty() => {}
            Value::Scalar(s) => out.push(s),
            Value::List(items) => {
                for item in items {
                    item.collect_texts(out);
                }
            }
        }
    }

    /// Text form used for node content and `+`: lists are joined with ", ".
    pub fn to_text(&self) -> String {
        match self {
            Value::Empty => String::new(),
            Value::Scalar(s) => s.clone(),
            Value::List(_) => self.texts().join(", "),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Empty => "Empty",
            Value::Scalar(_) => "Scalar",
            Value::List(_) => "List",
        }
    }
}

/// Integral numbers print without a fractional part (`2020`, not `2020.0`).
fn format_number(n: f64) -> String {
    if n.is_finite() && n == n.floor() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_text())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Scalar(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Scalar(s)
    }
}
