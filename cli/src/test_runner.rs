use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use renderer::{DateFormat, RenderOptions, Renderer};

const FIXTURE_SUFFIX: &str = ".test.toml";

/// One fixture file.
///
/// ```toml
/// description = "filters keep document order"
/// template = '''{ "root": { "type": "text", "path": "items[?(@.on==true)].label" } }'''
/// data = '''{ "items": [{ "label": "A", "on": true }] }'''
/// expect_text = "A"
/// ```
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestCase {
    /// Human-readable test description.
    #[serde(default)]
    pub description: Option<String>,

    /// Overrides the default "MMM YYYY".
    #[serde(default)]
    pub date_format: Option<String>,

    #[serde(default)]
    pub max_depth: Option<usize>,

    /// Template document as JSON text.
    pub template: String,

    /// Data root as JSON text. Defaults to `{}`.
    #[serde(default = "default_data")]
    pub data: String,

    /// Expected plain-text output (trimmed comparison).
    #[serde(default)]
    pub expect_text: Option<String>,

    /// Expected output tree, as JSON text compared structurally.
    #[serde(default)]
    pub expect_json: Option<String>,

    /// Loading or rendering must fail with a message containing this.
    #[serde(default)]
    pub expect_error: Option<String>,
}

fn default_data() -> String {
    "{}".to_string()
}

pub enum TestOutcome {
    Pass,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    pub description: Option<String>,
    pub outcome: TestOutcome,
}

impl TestResult {
    fn label(&self) -> String {
        self.description.clone().unwrap_or_else(|| {
            self.path
                .file_name()
                .and_then(|s| s.to_str())
                .map(|s| s.trim_end_matches(FIXTURE_SUFFIX).to_string())
                .unwrap_or_else(|| "?".to_string())
        })
    }
}

fn run_single_test(path: &Path) -> TestResult {
    let (description, outcome) = match std::fs::read_to_string(path) {
        Err(e) => (None, Err(format!("cannot read file: {}", e))),
        Ok(content) => match toml::from_str::<TestCase>(&content) {
            Err(e) => (None, Err(format!("TOML parse error: {}", e))),
            Ok(case) => (case.description.clone(), check_case(&case)),
        },
    };

    TestResult {
        path: path.to_path_buf(),
        description,
        outcome: match outcome {
            Ok(()) => TestOutcome::Pass,
            Err(reason) => TestOutcome::Fail(reason),
        },
    }
}

/// Load, render and compare. `Err` carries the failure reason.
fn check_case(case: &TestCase) -> Result<(), String> {
    let data: serde_json::Value =
        serde_json::from_str(&case.data).map_err(|e| format!("invalid data JSON: {}", e))?;

    let defaults = RenderOptions::default();
    let options = RenderOptions {
        date_format: case
            .date_format
            .as_deref()
            .map(DateFormat::new)
            .unwrap_or(defaults.date_format),
        max_depth: case.max_depth.unwrap_or(defaults.max_depth),
    };

    let result = folio::parser::Parser::new(case.template.clone(), 0)
        .parse()
        .map_err(|errors| {
            errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ")
        })
        .and_then(|template| {
            Renderer::new(options)
                .render(&template, &data)
                .map_err(|e| e.to_string())
        });

    match (&case.expect_error, result) {
        (Some(expected), Err(actual)) if actual.contains(expected.as_str()) => Ok(()),
        (Some(expected), Err(actual)) => Err(format!(
            "expected error containing \"{}\", got: {}",
            expected, actual
        )),
        (Some(expected), Ok(_)) => Err(format!(
            "expected error containing \"{}\", but rendering succeeded",
            expected
        )),
        (None, Err(actual)) => Err(format!("unexpected error: {}", actual)),
        (None, Ok(output)) => {
            if let Some(expected) = &case.expect_text {
                let actual = output.to_string();
                if actual.trim() != expected.trim() {
                    return Err(format!(
                        "text mismatch\n  expected: {}\n  actual:   {}",
                        expected.trim(),
                        actual.trim()
                    ));
                }
            }
            if let Some(expected) = &case.expect_json {
                let expected: serde_json::Value = serde_json::from_str(expected)
                    .map_err(|e| format!("invalid expect_json: {}", e))?;
                let actual = serde_json::to_value(&output)
                    .map_err(|e| format!("cannot serialize output: {}", e))?;
                if actual != expected {
                    return Err(format!(
                        "output tree mismatch\n  expected: {}\n  actual:   {}",
                        expected, actual
                    ));
                }
            }
            Ok(())
        }
    }
}

/// Discover fixtures grouped by category (subfolder relative to root).
/// Files directly in `root` get category "" (uncategorized).
fn discover_categorized(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    collect_tests(root, root, &mut categories);
    for files in categories.values_mut() {
        files.sort();
    }
    categories
}

fn collect_tests(dir: &Path, root: &Path, out: &mut BTreeMap<String, Vec<PathBuf>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_tests(&path, root, out);
        } else if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.ends_with(FIXTURE_SUFFIX))
        {
            let category = path
                .parent()
                .and_then(|p| p.strip_prefix(root).ok())
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_default();
            out.entry(category).or_default().push(path);
        }
    }
}

fn category_label(category: &str) -> &str {
    if category.is_empty() { "(root)" } else { category }
}

/// List available categories for the given test path.
pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }

    let categories = discover_categorized(path);
    if categories.is_empty() {
        eprintln!("no {} files found in {}", FIXTURE_SUFFIX, path.display());
        return;
    }

    eprintln!("available categories:");
    for (category, files) in &categories {
        eprintln!("  {} ({} tests)", category_label(category), files.len());
    }
}

/// Keep only the requested categories; a request also selects subfolders.
fn select_categories(
    all: BTreeMap<String, Vec<PathBuf>>,
    requested: &[String],
) -> BTreeMap<String, Vec<PathBuf>> {
    if requested.is_empty() {
        return all;
    }

    for request in requested {
        let request = request.trim_matches('/');
        let found = all
            .keys()
            .any(|cat| cat == request || cat.starts_with(&format!("{}/", request)));
        if !found {
            eprintln!(
                "warning: category '{}' not found (available: {})",
                request,
                all.keys()
                    .map(|k| category_label(k))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }

    all.into_iter()
        .filter(|(cat, _)| {
            requested.iter().any(|request| {
                let request = request.trim_matches('/');
                cat == request || cat.starts_with(&format!("{}/", request))
            })
        })
        .collect()
}

fn paint(text: &str, code: &str, no_color: bool) -> String {
    if no_color {
        text.to_string()
    } else {
        format!("\x1b[{}m{}\x1b[0m", code, text)
    }
}

/// Run every fixture under `path` (or a single file).
/// If `categories` is non-empty, only run tests in those categories.
/// Returns exit code: 0 = all pass, 1 = any failure.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String]) -> i32 {
    let selected = if path.is_file() {
        BTreeMap::from([(String::new(), vec![path.to_path_buf()])])
    } else {
        let all = discover_categorized(path);
        if all.is_empty() {
            eprintln!("no {} files found in {}", FIXTURE_SUFFIX, path.display());
            return 1;
        }
        select_categories(all, categories)
    };

    if selected.is_empty() {
        eprintln!("no matching categories found");
        return 1;
    }

    let mut passed = 0usize;
    let mut failures: Vec<TestResult> = Vec::new();

    for (category, files) in &selected {
        if !path.is_file() {
            eprintln!();
            eprintln!("{}", paint(category_label(category), "1", no_color));
        }

        for file in files {
            let result = run_single_test(file);
            match &result.outcome {
                TestOutcome::Pass => {
                    passed += 1;
                    eprintln!("  {}  {}", paint("PASS", "32", no_color), result.label());
                }
                TestOutcome::Fail(_) => {
                    eprintln!("  {}  {}", paint("FAIL", "31", no_color), result.label());
                    failures.push(result);
                }
            }
        }
    }

    if !failures.is_empty() {
        eprintln!();
        eprintln!("failures:");
        for failure in &failures {
            eprintln!();
            eprintln!("  --- {} ---", failure.path.display());
            if let TestOutcome::Fail(reason) = &failure.outcome {
                for line in reason.lines() {
                    eprintln!("  {}", line);
                }
            }
        }
    }

    eprintln!();
    if failures.is_empty() {
        eprintln!("test result: {}. {} passed, 0 failed", paint("ok", "32", no_color), passed);
        0
    } else {
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            paint("FAILED", "31", no_color),
            passed,
            failures.len(),
            passed + failures.len()
        );
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, relative: &str, content: &str) -> PathBuf {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create fixture dir");
        }
        std::fs::write(&path, content).expect("write fixture");
        path
    }

    const PASSING: &str = r#"
description = "join drops nulls"
template = '''{ "root": { "type": "text", "computed": "join(['a', null, 'b'], '-')" } }'''
expect_text = "a-b"
"#;

    const FAILING: &str = r#"
template = '''{ "root": { "type": "text", "literal": "actual" } }'''
expect_text = "expected"
"#;

    #[test]
    fn passing_fixture() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write(dir.path(), "join.test.toml", PASSING);
        let result = run_single_test(&path);
        assert!(matches!(result.outcome, TestOutcome::Pass));
        assert_eq!(result.label(), "join drops nulls");
    }

    #[test]
    fn failing_fixture_reports_mismatch() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write(dir.path(), "literal.test.toml", FAILING);
        let result = run_single_test(&path);
        match &result.outcome {
            TestOutcome::Fail(reason) => assert!(reason.contains("text mismatch")),
            TestOutcome::Pass => panic!("fixture should fail"),
        }
        assert_eq!(result.label(), "literal");
    }

    #[test]
    fn expected_errors() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write(
            dir.path(),
            "bad.test.toml",
            r#"
template = '''{ "root": { "type": "text" } }'''
expect_error = "text node has no content"
"#,
        );
        assert!(matches!(run_single_test(&path).outcome, TestOutcome::Pass));
    }

    #[test]
    fn expected_output_tree() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write(
            dir.path(),
            "tree.test.toml",
            r#"
template = '''{ "classes": { "h1": { "fontSize": 24 } }, "root": { "type": "text", "literal": "T", "class": "h1" } }'''
expect_json = '''{ "type": "text", "style": { "fontSize": 24 }, "text": "T" }'''
"#,
        );
        assert!(matches!(run_single_test(&path).outcome, TestOutcome::Pass));
    }

    #[test]
    fn categories_follow_subfolders() {
        let dir = tempfile::tempdir().expect("temp dir");
        write(dir.path(), "top.test.toml", PASSING);
        write(dir.path(), "paths/filter.test.toml", PASSING);
        write(dir.path(), "paths/nested/deep.test.toml", PASSING);
        write(dir.path(), "paths/notes.md", "ignored");

        let categories = discover_categorized(dir.path());
        assert_eq!(
            categories.keys().map(String::as_str).collect::<Vec<_>>(),
            ["", "paths", "paths/nested"]
        );

        let selected = select_categories(categories, &["paths".to_string()]);
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn run_tests_exit_codes() {
        let dir = tempfile::tempdir().expect("temp dir");
        write(dir.path(), "ok/join.test.toml", PASSING);
        write(dir.path(), "bad/literal.test.toml", FAILING);

        assert_eq!(run_tests(dir.path(), true, &["ok".to_string()]), 0);
        assert_eq!(run_tests(dir.path(), true, &[]), 1);
        assert_eq!(run_tests(dir.path(), true, &["missing".to_string()]), 1);
    }
}
