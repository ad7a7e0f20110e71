//! Prometheus metrics for the cityroute service.
//!
//! - [`MetricsConfig`]: `METRICS_ENABLED` switch
//! - [`init_metrics`]: install the global Prometheus recorder
//! - [`metrics_handler`]: `GET /metrics` in exposition format
//! - `record_*` helpers for graph loads, routes, exports, and timeouts
//!
//! HTTP request counts and latencies are recorded by
//! [`crate::middleware::MetricsLayer`].

use cityroute_lib::{Error as LibError, RouteAlgorithm};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::GraphSummary;

static PROMETHEUS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl MetricsConfig {
    /// `METRICS_ENABLED`: anything but "false" enables metrics (default: true).
    pub fn from_env() -> Self {
        let enabled = std::env::var("METRICS_ENABLED")
            .map(|v| !v.trim().eq_ignore_ascii_case("false"))
            .unwrap_or(true);
        Self { enabled }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MetricsError {
    #[error("metrics are disabled")]
    Disabled,
    #[error("metrics recorder already initialized")]
    AlreadyInitialized,
    #[error("failed to install metrics recorder: {0}")]
    InstallFailed(String),
}

/// Install the Prometheus recorder. Call once at startup.
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    if !config.enabled {
        return Err(MetricsError::Disabled);
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| MetricsError::InstallFailed(e.to_string()))?;

    PROMETHEUS_HANDLE
        .set(handle)
        .map_err(|_| MetricsError::AlreadyInitialized)
}

/// `GET /metrics`.
pub async fn metrics_handler() -> String {
    PROMETHEUS_HANDLE
        .get()
        .map(PrometheusHandle::render)
        .unwrap_or_else(|| "# Metrics not initialized\n".to_string())
}

/// A graph snapshot was published.
pub fn record_graph_loaded(summary: GraphSummary) {
    metrics::counter!("cityroute_graph_loads_total").increment(1);
    metrics::gauge!("cityroute_graph_nodes").set(summary.nodes as f64);
    metrics::gauge!("cityroute_graph_edges").set(summary.edges as f64);
}

/// A shortest-path query succeeded.
pub fn record_route_calculated(algorithm: RouteAlgorithm, length_m: f64, hops: usize) {
    let algorithm = algorithm.to_string();
    metrics::counter!("cityroute_routes_calculated_total", "algorithm" => algorithm.clone())
        .increment(1);
    metrics::histogram!("cityroute_route_length_meters", "algorithm" => algorithm.clone())
        .record(length_m);
    metrics::histogram!("cityroute_route_hops", "algorithm" => algorithm).record(hops as f64);
}

/// A shortest-path query failed.
pub fn record_route_failed(error: &LibError) {
    metrics::counter!("cityroute_routes_failed_total", "reason" => failure_reason(error))
        .increment(1);
}

/// A route was written out as `format` ("png" or "geojson").
pub fn record_route_exported(format: &'static str) {
    metrics::counter!("cityroute_routes_exported_total", "format" => format).increment(1);
}

/// Blocking work for `operation` exceeded its budget.
pub fn record_operation_timeout(operation: &'static str) {
    metrics::counter!("cityroute_operation_timeouts_total", "operation" => operation)
        .increment(1);
}

/// Low-cardinality label for a library error.
pub fn failure_reason(error: &LibError) -> &'static str {
    match error {
        LibError::StoreUnavailable { .. } => "store_unavailable",
        LibError::NotFound { .. } => "not_found",
        LibError::NotInitialized => "not_initialized",
        LibError::EmptyGraph => "empty_graph",
        LibError::NoPath { .. } => "no_path",
        LibError::InvalidRoute { .. } => "invalid_route",
        LibError::DataIntegrity { .. } => "data_integrity",
        LibError::Timeout { .. } => "timeout",
        LibError::Render { .. } => "render",
        LibError::Output { .. } => "output",
        LibError::Json(_) => "json",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(record: impl FnOnce()) -> String {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        metrics::with_local_recorder(&recorder, record);
        handle.render()
    }

    #[test]
    fn graph_gauges_follow_the_latest_snapshot() {
        let text = rendered(|| {
            record_graph_loaded(GraphSummary { nodes: 3, edges: 4 });
            record_graph_loaded(GraphSummary { nodes: 8, edges: 16 });
        });
        assert!(text.contains("cityroute_graph_nodes 8"), "{text}");
        assert!(text.contains("cityroute_graph_edges 16"), "{text}");
        assert!(text.contains("cityroute_graph_loads_total 2"), "{text}");
    }

    #[test]
    fn routes_are_labelled_by_algorithm_and_failure_reason() {
        let text = rendered(|| {
            record_route_calculated(RouteAlgorithm::AStar, 661.0, 3);
            record_route_failed(&LibError::NoPath {
                origin: 101,
                destination: 107,
            });
        });
        assert!(text.contains(r#"cityroute_routes_calculated_total{algorithm="a-star"} 1"#), "{text}");
        assert!(text.contains(r#"reason="no_path""#), "{text}");
        assert!(text.contains("cityroute_route_length_meters"), "{text}");
    }

    #[test]
    fn exports_and_timeouts_are_counted() {
        let text = rendered(|| {
            record_route_exported("geojson");
            record_operation_timeout("initialize");
        });
        assert!(text.contains(r#"format="geojson""#), "{text}");
        assert!(text.contains(r#"operation="initialize""#), "{text}");
    }

    #[test]
    fn disabled_metrics_are_not_installed() {
        assert_eq!(
            init_metrics(&MetricsConfig { enabled: false }),
            Err(MetricsError::Disabled)
        );
    }

    #[tokio::test]
    async fn handler_reports_missing_recorder() {
        // No test installs the global recorder.
        assert_eq!(metrics_handler().await, "# Metrics not initialized\n");
    }
}
