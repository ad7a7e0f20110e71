mod common;

use std::collections::HashSet;

use cityroute_lib::routing::{route_edges, route_length};
use cityroute_lib::{
    build_graph, shortest_path, Coordinate, Error, NodeId, RoadGraph, RouteAlgorithm,
};

use common::{fixture_graph, scenario_graph};

const ALGORITHMS: [RouteAlgorithm; 2] = [RouteAlgorithm::AStar, RouteAlgorithm::Dijkstra];

fn at(graph: &RoadGraph, id: NodeId) -> Coordinate {
    let node = graph.node(id).unwrap();
    Coordinate::new(node.y, node.x)
}

/// Exhaustive minimum over every simple path from `start` to `goal`.
fn brute_force_length(graph: &RoadGraph, start: NodeId, goal: NodeId) -> Option<f64> {
    fn walk(
        graph: &RoadGraph,
        node: NodeId,
        goal: NodeId,
        visited: &mut HashSet<NodeId>,
        cost: f64,
        best: &mut Option<f64>,
    ) {
        if node == goal {
            *best = Some(best.map_or(cost, |b: f64| b.min(cost)));
            return;
        }
        for edge in graph.out_edges(node) {
            if visited.insert(edge.v) {
                walk(graph, edge.v, goal, visited, cost + edge.length, best);
                visited.remove(&edge.v);
            }
        }
    }

    let mut best = None;
    let mut visited = HashSet::from([start]);
    walk(graph, start, goal, &mut visited, 0.0, &mut best);
    best
}

#[test]
fn scenario_prefers_two_short_edges_over_direct_edge() {
    let graph = scenario_graph();
    for algorithm in ALGORITHMS {
        let plan = shortest_path(
            &graph,
            Coordinate::new(0.0, 0.0),
            Coordinate::new(1.0, 1.0),
            algorithm,
        )
        .unwrap();
        assert_eq!(plan.route, vec![1, 2, 3], "{algorithm}");
        assert_eq!(plan.length_m, 20.0);
        assert_eq!(plan.algorithm, algorithm);
        assert_eq!(plan.hop_count(), 2);
    }
}

#[test]
fn fixture_route_follows_the_shortest_street_sequence() {
    let graph = fixture_graph();
    let plan = shortest_path(
        &graph,
        Coordinate::new(10.7700, 106.7000),
        Coordinate::new(10.7720, 106.7040),
        RouteAlgorithm::AStar,
    )
    .unwrap();
    assert_eq!(plan.origin_node, 101);
    assert_eq!(plan.destination_node, 106);
    assert_eq!(plan.route, vec![101, 102, 103, 106]);
    assert!((plan.length_m - 661.0).abs() < 1e-9);
}

#[test]
fn shortest_path_matches_brute_force_on_every_pair() {
    let graph = fixture_graph();
    let ids: Vec<NodeId> = graph.nodes().map(|n| n.osmid).collect();

    for &from in &ids {
        for &to in &ids {
            if from == to {
                continue;
            }
            let expected = brute_force_length(&graph, from, to);
            for algorithm in ALGORITHMS {
                let result = shortest_path(&graph, at(&graph, from), at(&graph, to), algorithm);
                match (expected, result) {
                    (Some(length), Ok(plan)) => {
                        assert!(
                            (plan.length_m - length).abs() < 1e-6,
                            "{algorithm} {from}->{to}: {} vs {length}",
                            plan.length_m
                        );
                        assert_eq!(route_length(&graph, &plan.route).unwrap(), plan.length_m);
                    }
                    (None, Err(Error::NoPath { .. })) => {}
                    (expected, result) => {
                        panic!("{algorithm} {from}->{to}: expected {expected:?}, got {result:?}")
                    }
                }
            }
        }
    }
}

#[test]
fn a_star_and_dijkstra_agree_on_length() {
    let graph = fixture_graph();
    let ids: Vec<NodeId> = graph.nodes().map(|n| n.osmid).collect();
    for &from in &ids {
        for &to in &ids {
            let a = shortest_path(&graph, at(&graph, from), at(&graph, to), RouteAlgorithm::AStar);
            let d = shortest_path(
                &graph,
                at(&graph, from),
                at(&graph, to),
                RouteAlgorithm::Dijkstra,
            );
            match (a, d) {
                (Ok(a), Ok(d)) => assert!((a.length_m - d.length_m).abs() < 1e-6),
                (Err(Error::NoPath { .. }), Err(Error::NoPath { .. })) => {}
                (a, d) => panic!("{from}->{to}: a-star {a:?}, dijkstra {d:?}"),
            }
        }
    }
}

#[test]
fn disconnected_components_report_no_path() {
    let graph = fixture_graph();
    let err = shortest_path(
        &graph,
        at(&graph, 101),
        at(&graph, 108),
        RouteAlgorithm::default(),
    )
    .unwrap_err();
    match err {
        Error::NoPath {
            origin,
            destination,
        } => {
            assert_eq!((origin, destination), (101, 108));
        }
        other => panic!("expected NoPath, got {other:?}"),
    }
}

#[test]
fn same_nearest_node_yields_single_node_route() {
    let graph = fixture_graph();
    let plan = shortest_path(
        &graph,
        Coordinate::new(10.77001, 106.70001),
        Coordinate::new(10.76999, 106.69999),
        RouteAlgorithm::Dijkstra,
    )
    .unwrap();
    assert_eq!(plan.route, vec![101]);
    assert_eq!(plan.length_m, 0.0);
}

#[test]
fn empty_graph_is_reported_before_search() {
    let graph = build_graph(Vec::new(), Vec::new()).unwrap();
    for algorithm in ALGORITHMS {
        assert!(matches!(
            shortest_path(
                &graph,
                Coordinate::new(10.0, 106.0),
                Coordinate::new(10.1, 106.1),
                algorithm
            ),
            Err(Error::EmptyGraph)
        ));
    }
}

#[test]
fn route_edges_uses_cheapest_parallel_edge() {
    let graph = fixture_graph();
    let edges = route_edges(&graph, &[101, 102]).unwrap();
    assert_eq!(edges[0].key, 0);
    assert_eq!(edges[0].length, 219.0);
}

#[test]
fn route_edges_rejects_reverse_of_one_way_street() {
    let graph = fixture_graph();
    assert!(matches!(
        route_edges(&graph, &[105, 102]),
        Err(Error::InvalidRoute { .. })
    ));
}
