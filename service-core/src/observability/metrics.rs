//! Prometheus exposition for the `metrics` facade.

use crate::error::AppError;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

/// Latency buckets in seconds, sized for calls that range from a cached page
/// to a slow model completion.
const LATENCY_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];

fn builder() -> Result<PrometheusBuilder, AppError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Suffix("_seconds".to_string()), LATENCY_BUCKETS)
        .map_err(|e| AppError::ConfigError(anyhow::anyhow!("Invalid metric buckets: {}", e)))
}

/// Install the global recorder. Must be called once at startup.
pub fn init_metrics() -> Result<PrometheusHandle, AppError> {
    builder()?.install_recorder().map_err(|e| {
        AppError::InternalError(anyhow::anyhow!("Failed to install metrics recorder: {}", e))
    })
}

/// A handle backed by a recorder that is not installed globally.
///
/// Renders an empty exposition; used where routers are built without a
/// process-wide recorder, such as in tests.
pub fn detached_metrics_handle() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}
