//! Route planning strategies.
//!
//! Each [`RoutePlanner`] wraps one search algorithm from [`crate::path`];
//! [`select_planner`] maps a [`RouteAlgorithm`] to its planner.

use crate::graph::{NodeId, RoadGraph};
use crate::path::{find_route_a_star, find_route_dijkstra};

use super::RouteAlgorithm;

/// Trait for route planning strategies.
pub trait RoutePlanner: Send + Sync {
    /// The algorithm identifier for this planner.
    fn algorithm(&self) -> RouteAlgorithm;

    /// Execute the search on the given graph.
    ///
    /// Returns `Some(path)` if `goal` is reachable from `start`.
    fn find_path(&self, graph: &RoadGraph, start: NodeId, goal: NodeId) -> Option<Vec<NodeId>>;
}

/// Dijkstra's algorithm planner.
#[derive(Debug, Clone, Default)]
pub struct DijkstraPlanner;

impl RoutePlanner for DijkstraPlanner {
    fn algorithm(&self) -> RouteAlgorithm {
        RouteAlgorithm::Dijkstra
    }

    fn find_path(&self, graph: &RoadGraph, start: NodeId, goal: NodeId) -> Option<Vec<NodeId>> {
        find_route_dijkstra(graph, start, goal)
    }
}

/// A* planner using the scaled great-circle heuristic.
#[derive(Debug, Clone, Default)]
pub struct AStarPlanner;

impl RoutePlanner for AStarPlanner {
    fn algorithm(&self) -> RouteAlgorithm {
        RouteAlgorithm::AStar
    }

    fn find_path(&self, graph: &RoadGraph, start: NodeId, goal: NodeId) -> Option<Vec<NodeId>> {
        find_route_a_star(graph, start, goal)
    }
}

/// Select the planner implementing `algorithm`.
pub fn select_planner(algorithm: RouteAlgorithm) -> Box<dyn RoutePlanner> {
    match algorithm {
        RouteAlgorithm::Dijkstra => Box::new(DijkstraPlanner),
        RouteAlgorithm::AStar => Box::new(AStarPlanner),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dijkstra_planner_returns_correct_algorithm() {
        assert_eq!(DijkstraPlanner.algorithm(), RouteAlgorithm::Dijkstra);
    }

    #[test]
    fn a_star_planner_returns_correct_algorithm() {
        assert_eq!(AStarPlanner.algorithm(), RouteAlgorithm::AStar);
    }

    #[test]
    fn select_planner_matches_requested_algorithm() {
        for algorithm in [RouteAlgorithm::Dijkstra, RouteAlgorithm::AStar] {
            assert_eq!(select_planner(algorithm).algorithm(), algorithm);
        }
    }
}
