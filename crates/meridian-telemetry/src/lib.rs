//! Observability for Meridian.
//!
//! - [`logging`]: structured `tracing` output (JSON or pretty)
//! - [`metrics`]: request counters and latency histograms recorded by the
//!   dispatcher, with an optional Prometheus recorder
//!
//! Both halves are optional: the framework instruments itself with `tracing`
//! and `metrics` macros, which are no-ops until a subscriber or recorder is
//! installed.
//!
//! # Metrics
//!
//! ```text
//! # TYPE meridian_requests_total counter
//! meridian_requests_total{controller="CollectionGet",status="200"} 12
//! meridian_requests_total{controller="ResourcePost",status="403"} 1
//! ```

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::TelemetryError;
pub use logging::{create_env_filter, init_logging, LogConfig, LogFormat};
pub use self::metrics::{
    init_metrics, record_repository_error, record_request, render_metrics, InFlightGuard,
    MetricsConfig,
};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
