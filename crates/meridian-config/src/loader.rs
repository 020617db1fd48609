//! Layered configuration loading.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::{ConfigError, MeridianConfig};

/// Default prefix of environment overrides.
pub const DEFAULT_ENV_PREFIX: &str = "MERIDIAN";

/// Loads configuration in layers, later layers overriding earlier ones:
///
/// 1. defaults (or a preset)
/// 2. a TOML or JSON file
/// 3. a `.env` file (feeds step 4)
/// 4. environment variables `PREFIX__SECTION__KEY`
///
/// # Example
///
/// ```no_run
/// use meridian_config::ConfigLoader;
///
/// # fn main() -> Result<(), meridian_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_optional_file("meridian.toml")?
///     .with_dotenv()?
///     .with_env_prefix("MERIDIAN")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: MeridianConfig,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a loader starting from the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: MeridianConfig::default(),
            env_prefix: None,
        }
    }

    /// Starts from the development preset.
    ///
    /// ```
    /// use meridian_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new().with_development().load().unwrap();
    /// assert_eq!(config.telemetry.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = MeridianConfig::development();
        self
    }

    /// Starts from the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = MeridianConfig::production();
        self
    }

    /// Loads a `.toml` or `.json` file. The file replaces the current layer;
    /// sections and fields it omits take their defaults.
    ///
    /// # Errors
    ///
    /// Fails when the file is missing, unreadable, has another extension or
    /// does not parse (unknown fields included).
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }
        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);
        self.config = match extension.as_deref() {
            Some("toml") => toml::from_str(&content)?,
            Some("json") => serde_json::from_str(&content)?,
            _ => {
                return Err(ConfigError::validation_error(format!(
                    "unsupported configuration file format: {}",
                    path.display()
                )))
            }
        };
        Ok(self)
    }

    /// Like [`with_file`](Self::with_file), but a missing file is skipped.
    ///
    /// # Errors
    ///
    /// Fails when the file exists but cannot be loaded.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Loads configuration from a string in `format` (`toml` or `json`).
    ///
    /// ```
    /// use meridian_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string("[query]\nmax_page_limit = 100", "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    /// assert_eq!(config.query.max_page_limit, Some(100));
    /// ```
    ///
    /// # Errors
    ///
    /// Fails for other formats and for content that does not parse.
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = match format.to_lowercase().as_str() {
            "toml" => toml::from_str(content)?,
            "json" => serde_json::from_str(content)?,
            _ => {
                return Err(ConfigError::validation_error(format!(
                    "unsupported configuration format: {format}"
                )))
            }
        };
        Ok(self)
    }

    /// Enables environment overrides with `prefix`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Loads a `.env` file into the process environment, if one exists.
    ///
    /// # Errors
    ///
    /// Fails when a `.env` file exists but cannot be parsed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(ConfigError::validation_error(format!(
                "failed to load .env file: {e}"
            ))),
        }
    }

    /// Applies environment overrides and validates.
    ///
    /// # Errors
    ///
    /// Fails when an override does not parse or validation fails.
    pub fn load(mut self) -> Result<MeridianConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            let vars: HashMap<String, String> = env::vars()
                .filter(|(k, _)| k.starts_with(&prefix))
                .collect();
            for (key, value) in vars {
                self.apply_env_var(&key, &value, &prefix)?;
            }
        }
        self.config.validate()?;
        Ok(self.config)
    }

    /// Returns the configuration without overrides or validation.
    #[must_use]
    pub fn load_unvalidated(self) -> MeridianConfig {
        self.config
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let Some(path) = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
        else {
            return Ok(());
        };
        let parts: Vec<&str> = path.split("__").collect();
        let config = &mut self.config;

        match parts.as_slice() {
            ["ENGINE", "BASE_URL"] => config.engine.base_url = optional_string(value),
            ["ENGINE", "PATH_PREFIX"] => config.engine.path_prefix = optional_string(value),
            ["ENGINE", "ALLOW_DYNAMIC_FIELDS"] => {
                config.engine.allow_dynamic_fields = bool_var(key, value)?;
            }
            ["ENGINE", "IMMUTABLE_WRITE_BEHAVIOR"] => {
                config.engine.immutable_write_behavior =
                    enum_var(key, value, "expected 'fail' or 'ignore'")?;
            }
            ["ENGINE", "LOOKUP_BEHAVIOR"] => {
                config.engine.lookup_behavior =
                    enum_var(key, value, "expected 'when_null', 'always' or 'never'")?;
            }
            ["ENGINE", "RETURN_404_ON_NULL"] => {
                config.engine.return_404_on_null = bool_var(key, value)?;
            }

            ["QUERY", "DEFAULT_PAGE_LIMIT"] => {
                config.query.default_page_limit = optional_u64_var(key, value)?;
            }
            ["QUERY", "MAX_PAGE_LIMIT"] => {
                config.query.max_page_limit = optional_u64_var(key, value)?;
            }
            ["QUERY", "ALLOW_UNKNOWN_PARAMETERS"] => {
                config.query.allow_unknown_parameters = bool_var(key, value)?;
            }

            ["BODY", "MAX_BODY_BYTES"] => {
                config.body.max_body_bytes = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))?;
            }

            ["TELEMETRY", "LOGGING", "ENABLED"] => {
                config.telemetry.logging.enabled = bool_var(key, value)?;
            }
            ["TELEMETRY", "LOGGING", "LEVEL"] => {
                config.telemetry.logging.level = value.to_string();
            }
            ["TELEMETRY", "LOGGING", "FORMAT"] => {
                config.telemetry.logging.format =
                    enum_var(key, value, "expected 'json' or 'pretty'")?;
            }
            ["TELEMETRY", "METRICS", "ENABLED"] => {
                config.telemetry.metrics.enabled = bool_var(key, value)?;
            }

            _ => {}
        }
        Ok(())
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn bool_var(key: &str, value: &str) -> Result<bool, ConfigError> {
    parse_bool(value).ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))
}

fn optional_string(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn optional_u64_var(key: &str, value: &str) -> Result<Option<u64>, ConfigError> {
    if value.is_empty() || value.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::env_parse_error(key, "expected integer or 'none'"))
}

// Enum sections use snake_case serde names, so the variable value is fed
// through the same deserializer as the file.
fn enum_var<T: DeserializeOwned>(key: &str, value: &str, expected: &str) -> Result<T, ConfigError> {
    serde_json::from_value(serde_json::Value::String(value.to_lowercase()))
        .map_err(|_| ConfigError::env_parse_error(key, expected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_core::{ImmutableWriteBehavior, LookupIncludeBehavior};
    use meridian_telemetry::LogFormat;
    use std::io::Write;

    #[test]
    fn test_loader_defaults() {
        let config = ConfigLoader::new().load().unwrap();
        assert_eq!(config, MeridianConfig::default());
    }

    #[test]
    fn test_loader_with_production() {
        let config = ConfigLoader::new().with_production().load().unwrap();
        assert_eq!(config.query.max_page_limit, Some(500));
        assert_eq!(config.telemetry.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_loader_with_json_string() {
        let json = r#"{"engine": {"allow_dynamic_fields": true}, "body": {"max_body_bytes": 2048}}"#;
        let config = ConfigLoader::new()
            .with_string(json, "json")
            .unwrap()
            .load()
            .unwrap();
        assert!(config.engine.allow_dynamic_fields);
        assert_eq!(config.body.max_body_bytes, 2048);
    }

    #[test]
    fn test_loader_rejects_unknown_section() {
        let result = ConfigLoader::new().with_string("[server]\nport = 1", "toml");
        assert!(matches!(result, Err(ConfigError::TomlError(_))));
    }

    #[test]
    fn test_loader_rejects_unknown_format() {
        assert!(ConfigLoader::new().with_string("a: 1", "yaml").is_err());
    }

    #[test]
    fn test_loader_with_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
            [engine]
            base_url = "https://api.example.com/"
            path_prefix = "/api"
            immutable_write_behavior = "ignore"

            [query]
            default_page_limit = 10
            max_page_limit = 50

            [telemetry.logging]
            level = "warn"
            format = "pretty"
            "#
        )
        .unwrap();

        let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();
        assert_eq!(config.engine.path_prefix.as_deref(), Some("/api"));
        assert_eq!(
            config.engine.immutable_write_behavior,
            ImmutableWriteBehavior::Ignore
        );
        assert_eq!(config.query.default_page_limit, Some(10));
        assert_eq!(config.telemetry.logging.format, LogFormat::Pretty);
        assert!(config.telemetry.metrics.enabled);
    }

    #[test]
    fn test_missing_files() {
        assert!(matches!(
            ConfigLoader::new().with_file("/nonexistent/meridian.toml"),
            Err(ConfigError::FileNotFound { .. })
        ));
        let config = ConfigLoader::new()
            .with_optional_file("/nonexistent/meridian.toml")
            .unwrap()
            .load()
            .unwrap();
        assert_eq!(config, MeridianConfig::default());
    }

    #[test]
    fn test_apply_env_vars() {
        let mut loader = ConfigLoader::new();
        loader
            .apply_env_var("TEST__ENGINE__LOOKUP_BEHAVIOR", "ALWAYS", "TEST")
            .unwrap();
        loader
            .apply_env_var("TEST__QUERY__MAX_PAGE_LIMIT", "25", "TEST")
            .unwrap();
        loader
            .apply_env_var("TEST__ENGINE__RETURN_404_ON_NULL", "off", "TEST")
            .unwrap();
        loader
            .apply_env_var("TEST__TELEMETRY__LOGGING__FORMAT", "pretty", "TEST")
            .unwrap();
        loader
            .apply_env_var("TEST__UNRELATED__KEY", "x", "TEST")
            .unwrap();

        let config = loader.load_unvalidated();
        assert_eq!(config.engine.lookup_behavior, LookupIncludeBehavior::Always);
        assert_eq!(config.query.max_page_limit, Some(25));
        assert!(!config.engine.return_404_on_null);
        assert_eq!(config.telemetry.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_apply_env_var_errors() {
        let mut loader = ConfigLoader::new();
        assert!(loader
            .apply_env_var("TEST__BODY__MAX_BODY_BYTES", "lots", "TEST")
            .is_err());
        assert!(loader
            .apply_env_var("TEST__ENGINE__IMMUTABLE_WRITE_BEHAVIOR", "warn", "TEST")
            .is_err());
        assert!(loader
            .apply_env_var("TEST__QUERY__ALLOW_UNKNOWN_PARAMETERS", "maybe", "TEST")
            .is_err());
    }

    #[test]
    fn test_optional_limit_can_be_cleared() {
        let mut loader = ConfigLoader::new().with_production();
        loader
            .apply_env_var("TEST__QUERY__DEFAULT_PAGE_LIMIT", "none", "TEST")
            .unwrap();
        assert_eq!(loader.load_unvalidated().query.default_page_limit, None);
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("Yes"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool(""), None);
    }
}
