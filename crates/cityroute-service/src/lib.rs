//! HTTP façade over the cityroute library.
//!
//! # Endpoints
//!
//! - `POST /initialize` - load the road graph from the document store
//! - `POST /shortest_path` - route between two `[lat, lon]` coordinates
//! - `POST /visualize_route` - render a route to a PNG file, optionally over a
//!   stored map tile
//! - `POST /save_route_as_geojson` - export a route to a GeoJSON file
//! - `GET /map_tile/{location_name}` - stored map tile bytes
//! - `GET /health/live`, `GET /health/ready` - liveness and readiness
//! - `GET /metrics` - Prometheus metrics

#![deny(warnings)]

mod routes;

pub use routes::router;
