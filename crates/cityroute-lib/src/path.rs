use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use crate::graph::{NodeId, RoadGraph};

/// Run Dijkstra's algorithm over edge `length`s.
///
/// Every parallel edge is relaxed, so the cheapest one between a pair wins.
pub fn find_route_dijkstra(graph: &RoadGraph, start: NodeId, goal: NodeId) -> Option<Vec<NodeId>> {
    if !graph.contains_node(start) || !graph.contains_node(goal) {
        return None;
    }
    if start == goal {
        return Some(vec![start]);
    }

    let mut distances: HashMap<NodeId, f64> = HashMap::new();
    let mut parents: HashMap<NodeId, Option<NodeId>> = HashMap::new();
    let mut queue = BinaryHeap::new();

    distances.insert(start, 0.0);
    parents.insert(start, None);
    queue.push(QueueEntry::new(start, 0.0));

    while let Some(entry) = queue.pop() {
        let current_distance = match distances.get(&entry.node) {
            Some(distance) if *distance < entry.cost.0 => continue,
            Some(distance) => *distance,
            None => continue,
        };

        if entry.node == goal {
            return Some(reconstruct_path(&parents, start, goal));
        }

        for edge in graph.out_edges(entry.node) {
            let next_cost = current_distance + edge.length;
            if next_cost < *distances.get(&edge.v).unwrap_or(&f64::INFINITY) {
                distances.insert(edge.v, next_cost);
                parents.insert(edge.v, Some(entry.node));
                queue.push(QueueEntry::new(edge.v, next_cost));
            }
        }
    }

    None
}

/// Run A* search guided by the great-circle distance to `goal`.
///
/// The estimate is multiplied by [`RoadGraph::heuristic_scale`], which keeps
/// it below every stored edge length and therefore admissible.
pub fn find_route_a_star(graph: &RoadGraph, start: NodeId, goal: NodeId) -> Option<Vec<NodeId>> {
    if !graph.contains_node(start) || !graph.contains_node(goal) {
        return None;
    }
    if start == goal {
        return Some(vec![start]);
    }

    let scale = graph.heuristic_scale();
    let heuristic = |node: NodeId| {
        graph
            .straight_line_m(node, goal)
            .map_or(0.0, |distance| distance * scale)
    };

    let mut g_score: HashMap<NodeId, f64> = HashMap::new();
    let mut parents: HashMap<NodeId, Option<NodeId>> = HashMap::new();
    let mut queue = BinaryHeap::new();

    g_score.insert(start, 0.0);
    parents.insert(start, None);
    queue.push(AStarEntry::new(start, 0.0, heuristic(start)));

    while let Some(entry) = queue.pop() {
        let current_score = match g_score.get(&entry.node) {
            Some(score) if *score < entry.cost.0 => continue,
            Some(score) => *score,
            None => continue,
        };

        if entry.node == goal {
            return Some(reconstruct_path(&parents, start, goal));
        }

        for edge in graph.out_edges(entry.node) {
            let tentative_g = current_score + edge.length;
            if tentative_g < *g_score.get(&edge.v).unwrap_or(&f64::INFINITY) {
                g_score.insert(edge.v, tentative_g);
                parents.insert(edge.v, Some(entry.node));
                queue.push(AStarEntry::new(edge.v, tentative_g, heuristic(edge.v)));
            }
        }
    }

    None
}

fn reconstruct_path(
    parents: &HashMap<NodeId, Option<NodeId>>,
    start: NodeId,
    goal: NodeId,
) -> Vec<NodeId> {
    let mut path = Vec::new();
    let mut current = Some(goal);
    while let Some(node) = current {
        path.push(node);
        if node == start {
            break;
        }
        current = parents.get(&node).copied().flatten();
    }
    path.reverse();
    path
}

#[derive(Copy, Clone, Debug, Default)]
struct FloatOrd(f64);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct QueueEntry {
    node: NodeId,
    cost: FloatOrd,
}

impl QueueEntry {
    fn new(node: NodeId, cost: f64) -> Self {
        Self {
            node,
            cost: FloatOrd(cost),
        }
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap pops the cheapest entry, lowest id on ties.
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct AStarEntry {
    node: NodeId,
    cost: FloatOrd,
    estimate: FloatOrd,
}

impl AStarEntry {
    fn new(node: NodeId, cost: f64, heuristic: f64) -> Self {
        Self {
            node,
            cost: FloatOrd(cost),
            estimate: FloatOrd(cost + heuristic),
        }
    }
}

impl Ord for AStarEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .estimate
            .cmp(&self.estimate)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for AStarEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
