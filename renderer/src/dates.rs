use std::fmt;

use chrono::{DateTime, NaiveDate};

/// Display format for date-like strings, written with dayjs-style tokens.
///
/// | token  | output      |
/// |--------|-------------|
/// | `YYYY` | `2020`      |
/// | `YY`   | `20`        |
/// | `MMMM` | `January`   |
/// | `MMM`  | `Jan`       |
/// | `MM`   | `01`        |
/// | `M`    | `1`         |
/// | `DD`   | `05`        |
/// | `D`    | `5`         |
///
/// Text inside `[...]` is copied as is; any other character is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFormat {
    pattern: String,
    /// The pattern translated to chrono's strftime syntax.
    strftime: String,
}

pub const DEFAULT_DATE_FORMAT: &str = "MMM YYYY";

// Longest first, so `MMMM` is not read as `MM` twice.
const TOKENS: &[(&str, &str)] = &[
    ("YYYY", "%Y"),
    ("YY", "%y"),
    ("MMMM", "%B"),
    ("MMM", "%b"),
    ("MM", "%m"),
    ("M", "%-m"),
    ("DD", "%d"),
    ("D", "%-d"),
];

impl DateFormat {
    pub fn new(pattern: &str) -> Self {
        DateFormat {
            pattern: pattern.to_string(),
            strftime: translate(pattern),
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Format `input` if it looks like a date (`2020-01-31`, `2020-01`,
    /// `2020-1` or RFC 3339); anything else is returned unchanged.
    pub fn format(&self, input: &str) -> String {
        match parse_date(input) {
            Some(date) => date.format(&self.strftime).to_string(),
            None => input.to_string(),
        }
    }
}

impl Default for DateFormat {
    fn default() -> Self {
        DateFormat::new(DEFAULT_DATE_FORMAT)
    }
}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pattern)
    }
}

fn translate(pattern: &str) -> String {
    let mut out = String::new();
    let mut rest = pattern;

    'outer: while let Some(c) = rest.chars().next() {
        if c == '[' {
            if let Some(end) = rest.find(']') {
                push_literal(&mut out, &rest[1..end]);
                rest = &rest[end + 1..];
                continue;
            }
        }

        for &(token, spec) in TOKENS {
            if let Some(after) = rest.strip_prefix(token) {
                out.push_str(spec);
                rest = after;
                continue 'outer;
            }
        }

        push_literal(&mut out, &rest[..c.len_utf8()]);
        rest = &rest[c.len_utf8()..];
    }

    out
}

fn push_literal(out: &mut String, text: &str) {
    for c in text.chars() {
        if c == '%' {
            out.push_str("%%");
        } else {
            out.push(c);
        }
    }
}

fn parse_date(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Some(date);
    }
    if let Some(date) = parse_year_month(input) {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(input)
        .ok()
        .map(|dt| dt.date_naive())
}

/// `2020-01` or `2020-1`, read as the first of the month.
fn parse_year_month(input: &str) -> Option<NaiveDate> {
    let (year, month) = input.split_once('-')?;
    let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if year.len() != 4 || !(1..=2).contains(&month.len()) || !digits(year) || !digits(month) {
        return None;
    }
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, 1)
}
