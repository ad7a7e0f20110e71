//! cityroute HTTP service.
//!
//! # Configuration
//!
//! - `CITYROUTE_STORE_PATH` - SQLite document store (default: /data/osm_data.db)
//! - `CITYROUTE_OUTPUT_DIR` - where rendered and exported files go (default: .)
//! - `REQUEST_TIMEOUT_SECS` - per-request budget for blocking work (default: 30)
//! - `SERVICE_PORT` - HTTP port (default: 8080)
//! - `RUST_LOG` - log filter (default: info)
//! - `LOG_FORMAT` - json (default) or text
//! - `METRICS_ENABLED` - Prometheus metrics on `/metrics` (default: true)

use std::net::SocketAddr;

use tracing::{error, info, warn};

use cityroute_service::router;
use cityroute_service_shared::{
    init_logging, init_metrics, AppState, LoggingConfig, MetricsConfig, ServiceConfig,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let logging_config = LoggingConfig::from_env().with_default_service("cityroute");
    init_logging(&logging_config);

    let metrics_config = MetricsConfig::from_env();
    if let Err(e) = init_metrics(&metrics_config) {
        warn!(error = %e, "metrics not available");
    }

    let config = ServiceConfig::from_env().map_err(|e| {
        error!(error = %e, "invalid configuration");
        e
    })?;

    info!(
        service = logging_config.service.as_deref().unwrap_or("cityroute"),
        store = %config.store_path.display(),
        output_dir = %config.output_dir.display(),
        timeout_secs = config.request_timeout.as_secs(),
        port = config.port,
        "starting cityroute service"
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let app = router(AppState::from_config(config));

    info!(addr = %addr, "listening on");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
