//! Shared fixtures for cityroute-lib integration tests.

use std::fs;
use std::path::PathBuf;

use cityroute_lib::{build_graph, Document, MemoryDocumentStore, RoadGraph};
use serde_json::{json, Value};

/// Directory holding the JSON document fixtures.
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../docs/fixtures/minimal")
}

#[allow(dead_code)]
/// Load a JSON array of documents from the fixtures directory.
pub fn fixture_documents(name: &str) -> Vec<Document> {
    let path = fixtures_dir().join(name);
    let text = fs::read_to_string(&path).expect("read fixture file");
    serde_json::from_str(&text).expect("fixture is an array of objects")
}

/// Store preloaded with the minimal downtown network.
#[allow(dead_code)]
pub fn fixture_store() -> MemoryDocumentStore {
    MemoryDocumentStore::new(fixture_documents("nodes.json"), fixture_documents("edges.json"))
}

/// Graph built from the minimal downtown network.
#[allow(dead_code)]
pub fn fixture_graph() -> RoadGraph {
    build_graph(fixture_documents("nodes.json"), fixture_documents("edges.json"))
        .expect("fixture graph builds")
}

#[allow(dead_code)]
/// Convert a `json!` object literal into a document.
pub fn doc(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        other => panic!("expected JSON object, got {other}"),
    }
}

/// Three-node scenario: A(0,0), B(0,1), C(1,1) with A->B 10, B->C 10, A->C 30.
///
/// Ids: A = 1, B = 2, C = 3. Coordinates are (lat, lon).
#[allow(dead_code)]
pub fn scenario_documents() -> (Vec<Document>, Vec<Document>) {
    let nodes = vec![
        doc(json!({"osmid": 1, "y": 0.0, "x": 0.0})),
        doc(json!({"osmid": 2, "y": 0.0, "x": 1.0})),
        doc(json!({"osmid": 3, "y": 1.0, "x": 1.0})),
    ];
    let edges = vec![
        doc(json!({"u": 1, "v": 2, "key": 0, "length": 10.0})),
        doc(json!({"u": 2, "v": 3, "key": 0, "length": 10.0})),
        doc(json!({"u": 1, "v": 3, "key": 0, "length": 30.0})),
    ];
    (nodes, edges)
}

#[allow(dead_code)]
pub fn scenario_graph() -> RoadGraph {
    let (nodes, edges) = scenario_documents();
    build_graph(nodes, edges).expect("scenario graph builds")
}
