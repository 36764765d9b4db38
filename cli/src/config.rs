use std::path::Path;

use renderer::{DateFormat, RenderOptions};
use serde::Deserialize;

const DEFAULT_LOG_LEVEL: &str = "warn";

/// Settings read from a TOML file passed with `--config`.
///
/// ```toml
/// date_format = "MMM YYYY"
/// max_depth = 64
/// log_level = "warn"
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub date_format: Option<String>,
    pub max_depth: Option<usize>,
    pub log_level: Option<String>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Config, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read '{}': {}", path.display(), e))?;
        toml::from_str(&text).map_err(|e| format!("invalid config '{}': {}", path.display(), e))
    }

    /// Render options, with command-line flags taking precedence.
    pub fn render_options(&self, date_format: Option<&str>, max_depth: Option<usize>) -> RenderOptions {
        let defaults = RenderOptions::default();
        RenderOptions {
            date_format: date_format
                .or(self.date_format.as_deref())
                .map(DateFormat::new)
                .unwrap_or(defaults.date_format),
            max_depth: max_depth.or(self.max_depth).unwrap_or(defaults.max_depth),
        }
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_all_fields() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "date_format = \"MM/YYYY\"\nmax_depth = 12\nlog_level = \"debug\"")
            .expect("write config");

        let config = Config::load(file.path()).expect("config should load");
        let options = config.render_options(None, None);
        assert_eq!(options.date_format.pattern(), "MM/YYYY");
        assert_eq!(options.max_depth, 12);
        assert_eq!(config.log_level(), "debug");
    }

    #[test]
    fn flags_override_file_values() {
        let config = Config {
            date_format: Some("YYYY".into()),
            max_depth: Some(10),
            log_level: None,
        };
        let options = config.render_options(Some("MMMM YYYY"), Some(3));
        assert_eq!(options.date_format.pattern(), "MMMM YYYY");
        assert_eq!(options.max_depth, 3);
        assert_eq!(config.log_level(), "warn");
    }

    #[test]
    fn defaults_without_a_file() {
        let options = Config::default().render_options(None, None);
        assert_eq!(options, RenderOptions::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "date_fmt = \"YYYY\"").expect("write config");
        let err = Config::load(file.path()).unwrap_err();
        assert!(err.contains("invalid config"));
    }
}
