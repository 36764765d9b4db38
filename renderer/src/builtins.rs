use crate::dates::DateFormat;
use crate::runtime_value::Value;

pub const DEFAULT_JOIN_SEPARATOR: &str = "•";
pub const DEFAULT_DATE_SEPARATOR: &str = "-";

/// `join(list, separator)`: flatten, drop empty entries, join.
pub fn join(list: &Value, separator: Option<&str>) -> Value {
    let separator = separator.unwrap_or(DEFAULT_JOIN_SEPARATOR);
    Value::Scalar(list.texts().join(separator))
}

/// `renderDates(list, separator)`: like `join`, formatting each date-like
/// entry first. `"Present"` and other free text pass through.
pub fn render_dates(list: &Value, separator: Option<&str>, format: &DateFormat) -> Value {
    let separator = separator.unwrap_or(DEFAULT_DATE_SEPARATOR);
    let formatted: Vec<String> = list
        .texts()
        .into_iter()
        .map(|text| format.format(text))
        .filter(|text| !text.is_empty())
        .collect();
    Value::Scalar(formatted.join(separator))
}
