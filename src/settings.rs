//! Runtime configuration: built-in defaults, then an optional TOML file
//! (`controla.toml` unless another path is given), then `CONTROLA__*`
//! environment variables (e.g. `CONTROLA__DATABASE__PATH`).

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::domain::Cents;

const DEFAULT_CONFIG_FILE: &str = "controla.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub log: LogSettings,
    pub incentives: IncentiveSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub path: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: "controla.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Reserved amounts and category names of the incentive scheme.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IncentiveSettings {
    pub stipend_cents: Cents,
    pub completion_cents: Cents,
    pub exam_cents: Cents,
    pub stipend_category: String,
    pub completion_category: String,
    pub exam_category: String,
}

impl Default for IncentiveSettings {
    fn default() -> Self {
        Self {
            stipend_cents: 20000,
            completion_cents: 100000,
            exam_cents: 20000,
            stipend_category: "Stipend".to_string(),
            completion_category: "Completion Incentive".to_string(),
            exam_category: "Exam Incentive".to_string(),
        }
    }
}

impl IncentiveSettings {
    /// Names of the three reserved incentive categories.
    pub fn category_names(&self) -> [&str; 3] {
        [
            self.stipend_category.as_str(),
            self.completion_category.as_str(),
            self.exam_category.as_str(),
        ]
    }
}

impl Settings {
    /// Load settings. An explicit `path` must exist; the default file is optional.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::with_name(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix("CONTROLA").separator("__"))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.database.path, "controla.db");
        assert_eq!(settings.log.level, "info");
        assert_eq!(settings.incentives.stipend_cents, 20000);
        assert_eq!(settings.incentives.completion_cents, 100000);
        assert_eq!(settings.incentives.exam_cents, 20000);
    }

    #[test]
    fn test_load_file_overrides_defaults() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(
            file,
            "[database]\npath = \"ledger.db\"\n\n[incentives]\nexam_cents = 15000\n"
        )
        .unwrap();

        let settings = Settings::load(file.path().to_str()).unwrap();

        assert_eq!(settings.database.path, "ledger.db");
        assert_eq!(settings.incentives.exam_cents, 15000);
        assert_eq!(settings.incentives.stipend_cents, 20000);
        assert_eq!(settings.log.level, "info");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        assert!(Settings::load(Some("/nonexistent/controla-settings.toml")).is_err());
    }
}
