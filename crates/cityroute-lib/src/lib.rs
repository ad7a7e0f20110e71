//! Cityroute library entry points.
//!
//! This crate loads a city road network from a document store, reconstructs
//! it as a directed multigraph, answers nearest-node and shortest-path
//! queries, and renders or exports planned routes. Higher-level consumers
//! (CLI, HTTP service) should only depend on the functions exported here.

#![deny(warnings)]

pub mod distance;
pub mod document;
pub mod error;
pub mod export;
pub mod graph;
pub mod path;
pub mod render;
pub mod routing;
pub mod spatial;
pub mod store;

pub use document::{edge_document, node_document, AttributeValue, Attributes, Document};
pub use error::{Error, Result};
pub use export::{export_geojson, export_geojson_bytes, save_geojson};
pub use graph::{build_graph, GraphEdge, GraphNode, NodeId, RoadGraph};
pub use render::{render_png, render_png_over_tile, save_png, save_png_over_tile, RenderStyle};
pub use routing::{shortest_path, Coordinate, RouteAlgorithm, RoutePlan};
pub use store::{DocumentStore, ImportMode, ImportSummary, MemoryDocumentStore, SqliteDocumentStore};

/// Fetch every node and edge document from `store` and build the graph.
pub fn load_graph(store: &dyn DocumentStore) -> Result<RoadGraph> {
    let nodes = store.fetch_nodes()?;
    let edges = store.fetch_edges()?;
    build_graph(nodes, edges)
}
