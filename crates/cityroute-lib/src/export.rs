//! GeoJSON export of planned routes.

use std::fs;
use std::path::Path;

use geo::{Coord, LineString};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, GeometryValue as GeoJsonValue};
use serde_json::Value;
use tracing::info;

use crate::error::{Error, Result};
use crate::graph::{NodeId, RoadGraph};
use crate::routing::route_edges;

/// Build a `FeatureCollection` holding the route as one `LineString`.
///
/// Edge geometries are concatenated in route order; the coordinate shared by
/// consecutive edges appears once per edge. The feature carries the route
/// `length` in meters and its `nodes` count.
pub fn export_geojson(graph: &RoadGraph, route: &[NodeId]) -> Result<FeatureCollection> {
    let edges = route_edges(graph, route)?;

    let coords: Vec<Coord<f64>> = edges
        .iter()
        .flat_map(|edge| edge.geometry.coords().copied())
        .collect();
    let length: f64 = edges.iter().map(|edge| edge.length).sum();

    let mut properties = JsonObject::new();
    properties.insert("length".to_string(), Value::from(length));
    properties.insert("nodes".to_string(), Value::from(route.len()));

    let feature = Feature {
        bbox: None,
        geometry: Some(Geometry::new(GeoJsonValue::from(&LineString::new(coords)))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    };

    Ok(FeatureCollection {
        features: vec![feature],
        bbox: None,
        foreign_members: None,
    })
}

/// Serialize the route export to JSON bytes.
pub fn export_geojson_bytes(graph: &RoadGraph, route: &[NodeId]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(&export_geojson(graph, route)?)?)
}

/// Write the route export to `path`.
pub fn save_geojson(graph: &RoadGraph, route: &[NodeId], path: &Path) -> Result<()> {
    let bytes = export_geojson_bytes(graph, route)?;
    fs::write(path, &bytes).map_err(|source| Error::Output {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), nodes = route.len(), "route saved as GeoJSON");
    Ok(())
}
