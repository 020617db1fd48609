//! Dispatch metrics.
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `meridian_requests_total` | Counter | `controller`, `status` |
//! | `meridian_request_duration_seconds` | Histogram | `controller` |
//! | `meridian_in_flight_requests` | Gauge | - |
//! | `meridian_repository_errors_total` | Counter | `resource_type` |
//!
//! Recording works without an installed recorder (the calls are no-ops);
//! [`init_metrics`] installs a Prometheus recorder whose output is available
//! through [`render_metrics`].

use crate::error::TelemetryError;
use crate::TelemetryResult;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

/// Counter of dispatched requests.
pub const REQUESTS_TOTAL: &str = "meridian_requests_total";
/// Histogram of dispatch latency.
pub const REQUEST_DURATION_SECONDS: &str = "meridian_request_duration_seconds";
/// Gauge of requests being dispatched.
pub const IN_FLIGHT_REQUESTS: &str = "meridian_in_flight_requests";
/// Counter of repository failures surfaced as 5xx.
pub const REPOSITORY_ERRORS_TOTAL: &str = "meridian_repository_errors_total";

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsConfig {
    /// Whether to install the Prometheus recorder.
    pub enabled: bool,

    /// Histogram buckets for the request duration, in seconds.
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            duration_buckets: vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
            ],
        }
    }
}

/// Installs the Prometheus recorder as the global `metrics` recorder.
///
/// # Errors
///
/// Returns [`TelemetryError::MetricsInit`] when a recorder is already
/// installed, and [`TelemetryError::InvalidConfig`] for empty buckets.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }
    if config.duration_buckets.is_empty() {
        return Err(TelemetryError::InvalidConfig(
            "duration_buckets must not be empty".to_string(),
        ));
    }

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(REQUEST_DURATION_SECONDS.to_string()),
            &config.duration_buckets,
        )
        .map_err(|e| TelemetryError::InvalidConfig(e.to_string()))?
        .install_recorder()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    let _ = METRICS_HANDLE.set(handle);
    describe_metrics();
    Ok(())
}

/// Renders all metrics in the Prometheus text format.
///
/// Returns `None` until [`init_metrics`] succeeded.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

fn describe_metrics() {
    describe_counter!(REQUESTS_TOTAL, "Total number of dispatched JSON:API requests");
    describe_histogram!(
        REQUEST_DURATION_SECONDS,
        "Dispatch duration of JSON:API requests in seconds"
    );
    describe_gauge!(
        IN_FLIGHT_REQUESTS,
        "Number of JSON:API requests currently being dispatched"
    );
    describe_counter!(
        REPOSITORY_ERRORS_TOTAL,
        "Repository failures that surfaced as server errors"
    );
}

/// Records a completed request.
///
/// `controller` is the controller name, or `none` when no controller matched.
pub fn record_request(controller: &str, status_code: u16, duration: Duration) {
    counter!(
        REQUESTS_TOTAL,
        "controller" => controller.to_string(),
        "status" => status_code.to_string()
    )
    .increment(1);

    histogram!(REQUEST_DURATION_SECONDS, "controller" => controller.to_string())
        .record(duration.as_secs_f64());
}

/// Records a repository failure that surfaced as a server error.
pub fn record_repository_error(resource_type: &str) {
    counter!(REPOSITORY_ERRORS_TOTAL, "resource_type" => resource_type.to_string()).increment(1);
}

/// Keeps the in-flight gauge raised while alive.
#[derive(Debug)]
pub struct InFlightGuard {
    _private: (),
}

impl InFlightGuard {
    /// Increments the in-flight gauge.
    #[must_use]
    pub fn new() -> Self {
        gauge!(IN_FLIGHT_REQUESTS).increment(1.0);
        Self { _private: () }
    }
}

impl Default for InFlightGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        gauge!(IN_FLIGHT_REQUESTS).decrement(1.0);
    }
}
