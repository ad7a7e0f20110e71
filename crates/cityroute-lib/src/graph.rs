use std::collections::{HashMap, HashSet};

use geo::{Coord, LineString, Point};
use tracing::{debug, info};

use crate::distance::great_circle_m;
use crate::document::{
    into_attributes, take_f64, take_i64, take_i64_or, take_line, take_point, Attributes, Document,
};
use crate::error::{Error, Result};
use crate::spatial::NodeLocator;

/// OpenStreetMap node identifier.
pub type NodeId = i64;

/// Coordinate reference system of every reconstructed graph (WGS84).
pub const CRS: &str = "EPSG:4326";

/// Intersection or shape point of the road network.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub osmid: NodeId,
    /// Longitude in decimal degrees.
    pub x: f64,
    /// Latitude in decimal degrees.
    pub y: f64,
    pub geometry: Point<f64>,
    pub attributes: Attributes,
}

/// Directed road segment from `u` to `v`.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphEdge {
    pub u: NodeId,
    pub v: NodeId,
    /// Disambiguates parallel edges between the same ordered pair.
    pub key: i64,
    /// Segment length in meters.
    pub length: f64,
    pub geometry: LineString<f64>,
    pub attributes: Attributes,
}

/// Directed multigraph reconstructed from stored documents.
///
/// Immutable once built; share it behind an `Arc` and replace it wholesale.
#[derive(Debug)]
pub struct RoadGraph {
    nodes: Vec<GraphNode>,
    index: HashMap<NodeId, usize>,
    edges: Vec<GraphEdge>,
    outgoing: Vec<Vec<usize>>,
    locator: NodeLocator,
    heuristic_scale: f64,
}

impl RoadGraph {
    /// Coordinate reference system tag.
    pub fn crs(&self) -> &'static str {
        CRS
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in document order.
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.iter()
    }

    /// Edges in document order.
    pub fn edges(&self) -> impl Iterator<Item = &GraphEdge> {
        self.edges.iter()
    }

    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.index.get(&id).map(|&i| &self.nodes[i])
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    /// Outgoing edges of `id`, including every parallel edge.
    pub fn out_edges(&self, id: NodeId) -> impl Iterator<Item = &GraphEdge> {
        self.index
            .get(&id)
            .map(|&i| self.outgoing[i].as_slice())
            .unwrap_or(&[])
            .iter()
            .map(|&e| &self.edges[e])
    }

    /// Cheapest edge from `u` to `v`: minimum length, then lowest key.
    pub fn best_edge(&self, u: NodeId, v: NodeId) -> Option<&GraphEdge> {
        self.out_edges(u)
            .filter(|edge| edge.v == v)
            .min_by(|a, b| a.length.total_cmp(&b.length).then_with(|| a.key.cmp(&b.key)))
    }

    /// Node closest to the given latitude/longitude.
    pub fn nearest_node(&self, lat: f64, lon: f64) -> Option<NodeId> {
        self.locator.nearest(lat, lon)
    }

    /// Factor in `[0, 1]` applied to great-circle estimates so they never
    /// exceed stored edge lengths.
    pub fn heuristic_scale(&self) -> f64 {
        self.heuristic_scale
    }

    /// Great-circle distance in meters between two nodes, if both exist.
    pub fn straight_line_m(&self, from: NodeId, to: NodeId) -> Option<f64> {
        let a = self.node(from)?;
        let b = self.node(to)?;
        Some(great_circle_m(a.y, a.x, b.y, b.x))
    }
}

/// Reconstruct a [`RoadGraph`] from node and edge documents.
///
/// Every node document needs an integer `osmid` and numeric `x`/`y`; every
/// edge document needs `u`, `v`, and a non-negative `length`, with `key`
/// defaulting to 0. A missing `geometry` is synthesized from the node
/// positions. Any inconsistency is reported as [`Error::DataIntegrity`].
pub fn build_graph<N, E>(nodes: N, edges: E) -> Result<RoadGraph>
where
    N: IntoIterator<Item = Document>,
    E: IntoIterator<Item = Document>,
{
    let mut graph_nodes = Vec::new();
    let mut index = HashMap::new();

    for (position, document) in nodes.into_iter().enumerate() {
        let node = parse_node(document, position)?;
        if index.insert(node.osmid, graph_nodes.len()).is_some() {
            return Err(Error::integrity(
                format!("node {}", node.osmid),
                "duplicate osmid",
            ));
        }
        graph_nodes.push(node);
    }

    let mut graph_edges = Vec::new();
    let mut outgoing = vec![Vec::new(); graph_nodes.len()];
    let mut seen_keys: HashSet<(NodeId, NodeId, i64)> = HashSet::new();
    let mut heuristic_scale: f64 = 1.0;

    for (position, document) in edges.into_iter().enumerate() {
        let edge = parse_edge(document, position, &graph_nodes, &index)?;
        if !seen_keys.insert((edge.u, edge.v, edge.key)) {
            return Err(Error::integrity(
                edge_label(&edge),
                "duplicate (u, v, key)",
            ));
        }

        let (u, v) = (&graph_nodes[index[&edge.u]], &graph_nodes[index[&edge.v]]);
        let straight = great_circle_m(u.y, u.x, v.y, v.x);
        if straight > 0.0 {
            heuristic_scale = heuristic_scale.min(edge.length / straight);
        }

        outgoing[index[&edge.u]].push(graph_edges.len());
        graph_edges.push(edge);
    }

    if heuristic_scale < 1.0 {
        debug!(
            heuristic_scale,
            "edge lengths shorter than straight-line distance; scaling A* heuristic"
        );
    }

    let locator = NodeLocator::build(graph_nodes.iter().map(|n| (n.osmid, n.y, n.x)));

    info!(
        nodes = graph_nodes.len(),
        edges = graph_edges.len(),
        crs = CRS,
        "road graph reconstructed"
    );

    Ok(RoadGraph {
        nodes: graph_nodes,
        index,
        edges: graph_edges,
        outgoing,
        locator,
        heuristic_scale: heuristic_scale.max(0.0),
    })
}

fn parse_node(mut document: Document, position: usize) -> Result<GraphNode> {
    let label = format!("node #{position}");
    let osmid = take_i64(&mut document, "osmid", &label)?;
    let label = format!("node {osmid}");
    let x = take_f64(&mut document, "x", &label)?;
    let y = take_f64(&mut document, "y", &label)?;
    let geometry = take_point(&mut document, &label)?.unwrap_or_else(|| Point::new(x, y));

    Ok(GraphNode {
        osmid,
        x,
        y,
        geometry,
        attributes: into_attributes(document),
    })
}

fn parse_edge(
    mut document: Document,
    position: usize,
    nodes: &[GraphNode],
    index: &HashMap<NodeId, usize>,
) -> Result<GraphEdge> {
    let label = format!("edge #{position}");
    let u = take_i64(&mut document, "u", &label)?;
    let v = take_i64(&mut document, "v", &label)?;
    let key = take_i64_or(&mut document, "key", &label, 0)?;
    let label = format!("edge {u}->{v} (key {key})");

    let (Some(&ui), Some(&vi)) = (index.get(&u), index.get(&v)) else {
        let missing = if index.contains_key(&u) { v } else { u };
        return Err(Error::integrity(
            label,
            format!("references unknown node {missing}"),
        ));
    };

    let length = take_f64(&mut document, "length", &label)?;
    if length < 0.0 {
        return Err(Error::integrity(label, "length must be non-negative"));
    }

    let geometry = match take_line(&mut document, &label)? {
        Some(line) => line,
        None => LineString::new(vec![
            Coord {
                x: nodes[ui].x,
                y: nodes[ui].y,
            },
            Coord {
                x: nodes[vi].x,
                y: nodes[vi].y,
            },
        ]),
    };

    Ok(GraphEdge {
        u,
        v,
        key,
        length,
        geometry,
        attributes: into_attributes(document),
    })
}

fn edge_label(edge: &GraphEdge) -> String {
    format!("edge {}->{} (key {})", edge.u, edge.v, edge.key)
}
