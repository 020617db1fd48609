//! Configuration sections.
//!
//! Every section rejects unknown fields and falls back to its defaults for
//! missing ones.

use meridian_core::{ImmutableWriteBehavior, LookupIncludeBehavior};
use meridian_telemetry::{LogConfig, LogFormat, MetricsConfig};
use serde::{Deserialize, Serialize};

/// Default request body limit (1 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Dispatch and mapping behavior.
///
/// # Example
///
/// ```
/// use meridian_config::EngineConfig;
///
/// let engine = EngineConfig::default();
/// assert!(!engine.allow_dynamic_fields);
/// assert!(engine.return_404_on_null);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct EngineConfig {
    /// Absolute base URL used for `links`; links are relative when unset.
    pub base_url: Option<String>,

    /// Prefix stripped from request paths, e.g. `/api`.
    pub path_prefix: Option<String>,

    /// Accept body members that are not fields of the resource.
    pub allow_dynamic_fields: bool,

    /// What happens when a write touches a read-only or immutable field.
    pub immutable_write_behavior: ImmutableWriteBehavior,

    /// Lookup behavior for relationships that do not declare their own.
    pub lookup_behavior: LookupIncludeBehavior,

    /// Answer 404 when a single-resource GET finds nothing; `data: null` otherwise.
    pub return_404_on_null: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            path_prefix: None,
            allow_dynamic_fields: false,
            immutable_write_behavior: ImmutableWriteBehavior::Fail,
            lookup_behavior: LookupIncludeBehavior::WhenNull,
            return_404_on_null: true,
        }
    }
}

/// Query parameter handling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields, default)]
pub struct QueryConfig {
    /// Page size applied to collection requests without `page[limit]`.
    pub default_page_limit: Option<u64>,

    /// Largest accepted `page[limit]`.
    pub max_page_limit: Option<u64>,

    /// Ignore unknown query parameters instead of answering 400.
    pub allow_unknown_parameters: bool,
}

/// Request body handling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct BodyConfig {
    /// Largest accepted request body in bytes.
    pub max_body_bytes: usize,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// Logging section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct LoggingConfig {
    /// Install the log subscriber.
    pub enabled: bool,

    /// `EnvFilter` directive.
    pub level: String,

    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}

impl LoggingConfig {
    /// Settings for [`meridian_telemetry::init_logging`].
    #[must_use]
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            enabled: self.enabled,
            level: self.level.clone(),
            format: self.format,
            span_events: self.format == LogFormat::Pretty,
            ..LogConfig::default()
        }
    }
}

/// Metrics section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct MetricsSection {
    /// Install the Prometheus recorder.
    pub enabled: bool,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl MetricsSection {
    /// Settings for [`meridian_telemetry::init_metrics`].
    #[must_use]
    pub fn to_metrics_config(&self) -> MetricsConfig {
        MetricsConfig {
            enabled: self.enabled,
            ..MetricsConfig::default()
        }
    }
}

/// Telemetry section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields, default)]
pub struct TelemetryConfigSection {
    /// Logging.
    pub logging: LoggingConfig,

    /// Metrics.
    pub metrics: MetricsSection,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_section_parses_enums() {
        let engine: EngineConfig = toml::from_str(
            r#"
            immutable_write_behavior = "ignore"
            lookup_behavior = "always"
            "#,
        )
        .unwrap();
        assert_eq!(engine.immutable_write_behavior, ImmutableWriteBehavior::Ignore);
        assert_eq!(engine.lookup_behavior, LookupIncludeBehavior::Always);
        assert!(engine.return_404_on_null);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let result: Result<QueryConfig, _> = toml::from_str("page_size = 10");
        assert!(result.is_err());
    }

    #[test]
    fn test_logging_to_log_config() {
        let logging = LoggingConfig {
            enabled: true,
            level: "debug".into(),
            format: LogFormat::Pretty,
        };
        let config = logging.to_log_config();
        assert_eq!(config.level, "debug");
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.span_events);
    }

    #[test]
    fn test_body_default() {
        assert_eq!(BodyConfig::default().max_body_bytes, DEFAULT_MAX_BODY_BYTES);
    }
}
