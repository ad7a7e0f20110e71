//! Route planning over a reconstructed [`RoadGraph`].
//!
//! - [`Coordinate`] - WGS84 latitude/longitude input
//! - [`RouteAlgorithm`] - supported search algorithms (A*, Dijkstra)
//! - [`RoutePlan`] - planned route result
//! - [`shortest_path`] - resolve nearest nodes and search between them
//! - [`route_edges`] - validate a node sequence against a graph
//!
//! Algorithms are encapsulated behind the [`RoutePlanner`] trait so callers
//! can select one at runtime with [`select_planner`].

mod planner;

pub use planner::{select_planner, AStarPlanner, DijkstraPlanner, RoutePlanner};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::graph::{GraphEdge, NodeId, RoadGraph};

/// Latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Whether both components are finite and inside WGS84 bounds.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lon)
    }
}

impl FromStr for Coordinate {
    type Err = String;

    /// Parse `"LAT,LON"`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (lat, lon) = s
            .split_once(',')
            .ok_or_else(|| format!("expected LAT,LON, got '{s}'"))?;
        let lat: f64 = lat
            .trim()
            .parse()
            .map_err(|_| format!("invalid latitude '{}'", lat.trim()))?;
        let lon: f64 = lon
            .trim()
            .parse()
            .map_err(|_| format!("invalid longitude '{}'", lon.trim()))?;
        let coordinate = Coordinate::new(lat, lon);
        if !coordinate.is_valid() {
            return Err(format!("coordinate out of range: {coordinate}"));
        }
        Ok(coordinate)
    }
}

/// Supported routing algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RouteAlgorithm {
    /// Dijkstra's algorithm (uninformed baseline).
    Dijkstra,
    /// A* search guided by great-circle distance.
    #[default]
    #[serde(rename = "a-star")]
    AStar,
}

impl fmt::Display for RouteAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            RouteAlgorithm::Dijkstra => "dijkstra",
            RouteAlgorithm::AStar => "a-star",
        };
        f.write_str(value)
    }
}

impl FromStr for RouteAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dijkstra" => Ok(RouteAlgorithm::Dijkstra),
            "a-star" | "astar" | "a*" => Ok(RouteAlgorithm::AStar),
            other => Err(format!(
                "unknown algorithm '{other}' (expected 'a-star' or 'dijkstra')"
            )),
        }
    }
}

/// Planned route returned by [`shortest_path`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutePlan {
    pub algorithm: RouteAlgorithm,
    pub origin_node: NodeId,
    pub destination_node: NodeId,
    /// Node ids from origin to destination, inclusive.
    pub route: Vec<NodeId>,
    /// Sum of the traversed edge lengths in meters.
    pub length_m: f64,
}

impl RoutePlan {
    /// Number of edges traversed.
    pub fn hop_count(&self) -> usize {
        self.route.len().saturating_sub(1)
    }
}

/// Compute the shortest route between the nodes nearest to two coordinates.
///
/// Fails with [`Error::EmptyGraph`] when the graph has no nodes and with
/// [`Error::NoPath`] when the destination node is unreachable. When both
/// coordinates resolve to the same node the route holds that single node.
pub fn shortest_path(
    graph: &RoadGraph,
    origin: Coordinate,
    destination: Coordinate,
    algorithm: RouteAlgorithm,
) -> Result<RoutePlan> {
    let origin_node = graph
        .nearest_node(origin.lat, origin.lon)
        .ok_or(Error::EmptyGraph)?;
    let destination_node = graph
        .nearest_node(destination.lat, destination.lon)
        .ok_or(Error::EmptyGraph)?;
    debug!(
        %origin,
        %destination,
        origin_node,
        destination_node,
        "resolved nearest nodes"
    );

    let planner = select_planner(algorithm);
    let route = planner
        .find_path(graph, origin_node, destination_node)
        .ok_or(Error::NoPath {
            origin: origin_node,
            destination: destination_node,
        })?;

    let length_m = route_length(graph, &route)?;
    info!(
        algorithm = %planner.algorithm(),
        origin_node,
        destination_node,
        nodes = route.len(),
        length_m,
        "route planned"
    );

    Ok(RoutePlan {
        algorithm: planner.algorithm(),
        origin_node,
        destination_node,
        route,
        length_m,
    })
}

/// Resolve the edge used for each consecutive pair of `route`.
///
/// Each pair uses its cheapest parallel edge. Fails with
/// [`Error::InvalidRoute`] when the route has fewer than two nodes, names an
/// unknown node, or a pair has no connecting edge.
pub fn route_edges<'g>(graph: &'g RoadGraph, route: &[NodeId]) -> Result<Vec<&'g GraphEdge>> {
    if route.len() < 2 {
        return Err(Error::invalid_route(format!(
            "route must contain at least two nodes, got {}",
            route.len()
        )));
    }
    if let Some(unknown) = route.iter().find(|id| !graph.contains_node(**id)) {
        return Err(Error::invalid_route(format!("unknown node {unknown}")));
    }

    route
        .windows(2)
        .map(|pair| {
            graph.best_edge(pair[0], pair[1]).ok_or_else(|| {
                Error::invalid_route(format!("no edge from {} to {}", pair[0], pair[1]))
            })
        })
        .collect()
}

/// Total length in meters of a node sequence.
///
/// A single known node has length zero.
pub fn route_length(graph: &RoadGraph, route: &[NodeId]) -> Result<f64> {
    match route {
        [single] if graph.contains_node(*single) => Ok(0.0),
        _ => Ok(route_edges(graph, route)?.iter().map(|e| e.length).sum()),
    }
}
