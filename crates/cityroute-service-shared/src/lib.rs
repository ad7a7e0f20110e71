//! Shared infrastructure for the cityroute HTTP service.
//!
//! - [`AppState`]: document store handle plus the current road-graph snapshot
//! - [`ServiceConfig`]: environment-driven configuration
//! - [`ServiceError`]: `{"error": ...}` responses mapped from library errors
//! - [`health`]: liveness/readiness handlers
//! - [`logging`]: structured JSON or text logging setup
//! - [`metrics`]: Prometheus recorder, `/metrics` handler, business counters
//! - [`middleware`]: request ids, per-request tracing spans, HTTP metrics
//! - Request types with validation for each endpoint
//!
//! Handlers stay thin: parse and validate JSON, hand the blocking work to
//! [`run_blocking`] (or [`run_gated`] when the work publishes state), call `cityroute-lib`, and format the response.

#![deny(warnings)]

mod config;
mod error;
mod health;
pub mod logging;
pub mod metrics;
pub mod middleware;
mod request;
mod state;
mod task;

pub use config::{ConfigError, ServiceConfig};
pub use error::{from_lib_error, ErrorBody, ServiceError};
pub use health::{health_live, health_ready, HealthStatus};
pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use metrics::{
    failure_reason, init_metrics, metrics_handler, record_graph_loaded, record_operation_timeout,
    record_route_calculated, record_route_exported, record_route_failed, MetricsConfig,
    MetricsError,
};
pub use middleware::{extract_or_generate_request_id, request_span, MetricsLayer, RequestId};
pub use request::{
    resolve_output_path, SaveRouteRequest, ShortestPathRequest, Validate, VisualizeRouteRequest,
    DEFAULT_VISUALIZATION_FILE,
};
pub use state::{AppState, GraphSummary};
pub use task::{run_blocking, run_gated, PublishGate};
