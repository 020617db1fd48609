//! The root configuration type and its builder.

use serde::{Deserialize, Serialize};

use crate::{BodyConfig, ConfigError, EngineConfig, QueryConfig, TelemetryConfigSection};

/// Complete Meridian configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to layer files and environment
/// variables over the defaults.
///
/// # Example
///
/// ```
/// use meridian_config::MeridianConfig;
///
/// let config = MeridianConfig::default();
/// assert_eq!(config.query.max_page_limit, None);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct MeridianConfig {
    /// Dispatch and mapping behavior.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Query parameter handling.
    #[serde(default)]
    pub query: QueryConfig,

    /// Request body handling.
    #[serde(default)]
    pub body: BodyConfig,

    /// Logging and metrics.
    #[serde(default)]
    pub telemetry: TelemetryConfigSection,
}

impl MeridianConfig {
    /// Creates a configuration builder.
    ///
    /// ```
    /// use meridian_config::{MeridianConfig, QueryConfig};
    ///
    /// let config = MeridianConfig::builder()
    ///     .query(QueryConfig {
    ///         default_page_limit: Some(20),
    ///         max_page_limit: Some(100),
    ///         ..Default::default()
    ///     })
    ///     .build();
    ///
    /// assert_eq!(config.query.default_page_limit, Some(20));
    /// ```
    #[must_use]
    pub fn builder() -> MeridianConfigBuilder {
        MeridianConfigBuilder::new()
    }

    /// Checks values and cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] or
    /// [`ConfigError::ValidationError`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(base_url) = &self.engine.base_url {
            if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
                return Err(ConfigError::invalid_value(
                    "engine.base_url",
                    format!("expected an http(s) URL, got '{base_url}'"),
                ));
            }
        }

        if let Some(prefix) = &self.engine.path_prefix {
            if !prefix.starts_with('/') {
                return Err(ConfigError::invalid_value(
                    "engine.path_prefix",
                    format!("must start with '/', got '{prefix}'"),
                ));
            }
        }

        if self.query.default_page_limit == Some(0) {
            return Err(ConfigError::invalid_value(
                "query.default_page_limit",
                "must be positive",
            ));
        }
        if self.query.max_page_limit == Some(0) {
            return Err(ConfigError::invalid_value(
                "query.max_page_limit",
                "must be positive",
            ));
        }
        if let (Some(default), Some(max)) = (self.query.default_page_limit, self.query.max_page_limit)
        {
            if default > max {
                return Err(ConfigError::validation_error(format!(
                    "query.default_page_limit ({default}) exceeds query.max_page_limit ({max})"
                )));
            }
        }

        if self.body.max_body_bytes == 0 {
            return Err(ConfigError::invalid_value(
                "body.max_body_bytes",
                "must be positive",
            ));
        }

        if self.telemetry.logging.enabled {
            meridian_telemetry::create_env_filter(&self.telemetry.logging.level)
                .map_err(|e| ConfigError::invalid_value("telemetry.logging.level", e.to_string()))?;
        }

        Ok(())
    }

    /// Development preset: pretty debug logs, unknown query parameters ignored.
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.query.allow_unknown_parameters = true;
        config.telemetry.logging.level = "debug".to_string();
        config.telemetry.logging.format = meridian_telemetry::LogFormat::Pretty;
        config
    }

    /// Production preset: JSON logs and bounded pages.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.query.default_page_limit = Some(50);
        config.query.max_page_limit = Some(500);
        config
    }
}

/// Builder for [`MeridianConfig`].
#[derive(Debug, Default)]
pub struct MeridianConfigBuilder {
    engine: Option<EngineConfig>,
    query: Option<QueryConfig>,
    body: Option<BodyConfig>,
    telemetry: Option<TelemetryConfigSection>,
}

impl MeridianConfigBuilder {
    /// Creates a builder with every section at its default.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the engine section.
    #[must_use]
    pub fn engine(mut self, engine: EngineConfig) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Sets the query section.
    #[must_use]
    pub fn query(mut self, query: QueryConfig) -> Self {
        self.query = Some(query);
        self
    }

    /// Sets the body section.
    #[must_use]
    pub fn body(mut self, body: BodyConfig) -> Self {
        self.body = Some(body);
        self
    }

    /// Sets the telemetry section.
    #[must_use]
    pub fn telemetry(mut self, telemetry: TelemetryConfigSection) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Builds without validating.
    #[must_use]
    pub fn build(self) -> MeridianConfig {
        MeridianConfig {
            engine: self.engine.unwrap_or_default(),
            query: self.query.unwrap_or_default(),
            body: self.body.unwrap_or_default(),
            telemetry: self.telemetry.unwrap_or_default(),
        }
    }

    /// Builds and validates.
    ///
    /// # Errors
    ///
    /// See [`MeridianConfig::validate`].
    pub fn build_validated(self) -> Result<MeridianConfig, ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_telemetry::LogFormat;

    #[test]
    fn test_presets_are_valid() {
        assert!(MeridianConfig::default().validate().is_ok());
        assert!(MeridianConfig::development().validate().is_ok());
        assert!(MeridianConfig::production().validate().is_ok());
        assert_eq!(
            MeridianConfig::development().telemetry.logging.format,
            LogFormat::Pretty
        );
    }

    #[test]
    fn test_default_limit_above_max_is_rejected() {
        let result = MeridianConfig::builder()
            .query(QueryConfig {
                default_page_limit: Some(200),
                max_page_limit: Some(100),
                allow_unknown_parameters: false,
            })
            .build_validated();
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_relative_base_url_is_rejected() {
        let result = MeridianConfig::builder()
            .engine(EngineConfig {
                base_url: Some("api.example.com".into()),
                ..EngineConfig::default()
            })
            .build_validated();
        assert!(matches!(result, Err(ConfigError::InvalidValue { ref field, .. }) if field == "engine.base_url"));
    }

    #[test]
    fn test_path_prefix_must_be_absolute() {
        let mut config = MeridianConfig::default();
        config.engine.path_prefix = Some("api".into());
        assert!(config.validate().is_err());
        config.engine.path_prefix = Some("/api".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_body_limit_is_rejected() {
        let mut config = MeridianConfig::default();
        config.body.max_body_bytes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_level_is_rejected() {
        let mut config = MeridianConfig::default();
        config.telemetry.logging.level = "meridian=loud".into();
        assert!(config.validate().is_err());
        config.telemetry.logging.enabled = false;
        assert!(config.validate().is_ok());
    }
}
