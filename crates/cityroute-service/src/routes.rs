use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::info;

use cityroute_lib::{
    save_geojson, save_png, save_png_over_tile, shortest_path, NodeId, RouteAlgorithm,
};
use cityroute_service_shared::{
    health_live, health_ready, metrics_handler, record_graph_loaded, record_route_calculated,
    record_route_exported, record_route_failed, request_span, resolve_output_path, run_blocking,
    run_gated, AppState, MetricsLayer, SaveRouteRequest, ServiceError, ShortestPathRequest,
    Validate, VisualizeRouteRequest,
};

/// `{"message": ...}` success body.
#[derive(Debug, Serialize)]
struct MessageResponse {
    message: String,
}

#[derive(Debug, Serialize)]
struct InitializeResponse {
    message: &'static str,
    nodes: usize,
    edges: usize,
}

#[derive(Debug, Serialize)]
struct ShortestPathResponse {
    path: Vec<NodeId>,
    length: f64,
    algorithm: RouteAlgorithm,
}

/// Build the service router over `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/initialize", post(initialize_handler))
        .route("/shortest_path", post(shortest_path_handler))
        .route("/visualize_route", post(visualize_route_handler))
        .route("/save_route_as_geojson", post(save_route_handler))
        .route("/map_tile/{location_name}", get(map_tile_handler))
        .route("/health/live", get(health_live))
        .route("/health/ready", get(health_ready))
        .route("/metrics", get(metrics_handler))
        .layer(MetricsLayer)
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .with_state(state)
}

/// Unwrap a JSON body, turning extractor rejections into `{"error"}` 400s.
fn parse_body<T: Validate>(body: Result<Json<T>, JsonRejection>) -> Result<T, ServiceError> {
    let Json(request) = body.map_err(|rejection| ServiceError::bad_request(rejection.body_text()))?;
    request.validate()?;
    Ok(request)
}

async fn initialize_handler(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let timeout = state.config().request_timeout;
    let worker = state.clone();
    let summary = run_gated("initialize", timeout, move |gate| {
        worker.initialize_gated(gate)
    })
    .await?;
    record_graph_loaded(summary);

    info!(nodes = summary.nodes, edges = summary.edges, "graph initialized");
    Ok(Json(InitializeResponse {
        message: "Graph initialized successfully",
        nodes: summary.nodes,
        edges: summary.edges,
    })
    .into_response())
}

async fn shortest_path_handler(
    State(state): State<AppState>,
    body: Result<Json<ShortestPathRequest>, JsonRejection>,
) -> Result<Response, ServiceError> {
    let request = parse_body(body)?;
    let graph = state.graph()?;

    let (origin, destination, algorithm) =
        (request.origin(), request.destination(), request.algorithm);
    info!(%origin, %destination, %algorithm, "handling shortest path request");

    let plan = run_blocking("shortest_path", state.config().request_timeout, move || {
        let result = shortest_path(&graph, origin, destination, algorithm);
        match &result {
            Ok(plan) => record_route_calculated(plan.algorithm, plan.length_m, plan.hop_count()),
            Err(err) => record_route_failed(err),
        }
        result
    })
    .await?;

    Ok(Json(ShortestPathResponse {
        path: plan.route,
        length: plan.length_m,
        algorithm: plan.algorithm,
    })
    .into_response())
}

async fn visualize_route_handler(
    State(state): State<AppState>,
    body: Result<Json<VisualizeRouteRequest>, JsonRejection>,
) -> Result<Response, ServiceError> {
    let request = parse_body(body)?;
    let graph = state.graph()?;
    let file = request.output_file().to_string();
    let target = resolve_output_path(&state.config().output_dir, &file)?;

    let worker = state.clone();
    let (route, location_name) = (request.path, request.location_name);
    run_blocking("visualize_route", state.config().request_timeout, move || {
        match location_name {
            Some(location_name) => {
                let tile = worker.store().fetch_map_tile(&location_name)?;
                save_png_over_tile(&graph, &route, &tile, &target)
            }
            None => save_png(&graph, &route, &target),
        }
    })
    .await?;
    record_route_exported("png");

    Ok(Json(MessageResponse {
        message: format!("Route visualization saved to {file}"),
    })
    .into_response())
}

async fn save_route_handler(
    State(state): State<AppState>,
    body: Result<Json<SaveRouteRequest>, JsonRejection>,
) -> Result<Response, ServiceError> {
    let request = parse_body(body)?;
    let graph = state.graph()?;
    let target = resolve_output_path(&state.config().output_dir, &request.output_file)?;

    let route = request.path;
    run_blocking(
        "save_route_as_geojson",
        state.config().request_timeout,
        move || save_geojson(&graph, &route, &target),
    )
    .await?;
    record_route_exported("geojson");

    Ok(Json(MessageResponse {
        message: format!("Route saved as GeoJSON to {}", request.output_file),
    })
    .into_response())
}

async fn map_tile_handler(
    State(state): State<AppState>,
    Path(location_name): Path<String>,
) -> Result<Response, ServiceError> {
    let worker = state.clone();
    let bytes = run_blocking("map_tile", state.config().request_timeout, move || {
        worker.store().fetch_map_tile(&location_name)
    })
    .await?;

    Ok(([(header::CONTENT_TYPE, "image/png")], bytes).into_response())
}
