//! Typed configuration for Meridian.
//!
//! [`MeridianConfig`] groups the settings of the framework:
//!
//! - [`EngineConfig`]: links, path prefix, field write policy, relationship
//!   lookup defaults
//! - [`QueryConfig`]: paging limits and unknown parameter handling
//! - [`BodyConfig`]: request body limit
//! - [`TelemetryConfigSection`]: logging and metrics
//!
//! Unknown fields are rejected everywhere. [`ConfigLoader`] layers defaults,
//! a file, a `.env` file and `MERIDIAN__SECTION__KEY` environment variables.
//!
//! # Configuration file
//!
//! ```toml
//! [engine]
//! base_url = "https://api.example.com"
//! path_prefix = "/api"
//! allow_dynamic_fields = false
//! immutable_write_behavior = "fail"   # or "ignore"
//! lookup_behavior = "when_null"       # or "always", "never"
//! return_404_on_null = true
//!
//! [query]
//! default_page_limit = 20
//! max_page_limit = 100
//! allow_unknown_parameters = false
//!
//! [body]
//! max_body_bytes = 1048576
//!
//! [telemetry.logging]
//! enabled = true
//! level = "info"
//! format = "json"
//!
//! [telemetry.metrics]
//! enabled = true
//! ```

mod config;
mod error;
mod loader;
mod schema;

pub use config::{MeridianConfig, MeridianConfigBuilder};
pub use error::ConfigError;
pub use loader::{ConfigLoader, DEFAULT_ENV_PREFIX};
pub use meridian_telemetry::LogFormat;
pub use schema::{
    BodyConfig, EngineConfig, LoggingConfig, MetricsSection, QueryConfig, TelemetryConfigSection,
    DEFAULT_MAX_BODY_BYTES,
};
