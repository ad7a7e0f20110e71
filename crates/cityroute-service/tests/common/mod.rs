//! Shared fixtures for service handler tests.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum_test::TestServer;
use cityroute_lib::{build_graph, render_png, Document, DocumentStore, MemoryDocumentStore};
use cityroute_service::router;
use cityroute_service_shared::{AppState, ServiceConfig};
use tempfile::TempDir;

fn fixture_documents(name: &str) -> Vec<Document> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../docs/fixtures/minimal")
        .join(name);
    let text = fs::read_to_string(&path).expect("read fixture file");
    serde_json::from_str(&text).expect("fixture is an array of objects")
}

/// Location of a tile that decodes as a real PNG.
pub const DOWNTOWN_TILE: &str = "Downtown";

/// Store that takes `delay` to hand out each collection.
pub struct SlowStore {
    inner: MemoryDocumentStore,
    delay: Duration,
}

impl SlowStore {
    pub fn new(inner: MemoryDocumentStore, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

impl DocumentStore for SlowStore {
    fn fetch_nodes(&self) -> cityroute_lib::Result<Vec<Document>> {
        std::thread::sleep(self.delay);
        self.inner.fetch_nodes()
    }

    fn fetch_edges(&self) -> cityroute_lib::Result<Vec<Document>> {
        std::thread::sleep(self.delay);
        self.inner.fetch_edges()
    }

    fn fetch_map_tile(&self, location_name: &str) -> cityroute_lib::Result<Vec<u8>> {
        self.inner.fetch_map_tile(location_name)
    }
}

/// The minimal downtown fixture with two stored tiles: one undecodable, one
/// a rendering of the network itself.
pub fn fixture_store() -> MemoryDocumentStore {
    let nodes = fixture_documents("nodes.json");
    let edges = fixture_documents("edges.json");
    let graph = build_graph(nodes.clone(), edges.clone()).expect("fixture graph");
    let tile = render_png(&graph, &[]).expect("render fixture tile");
    MemoryDocumentStore::new(nodes, edges)
        .with_tile("Ho Chi Minh City, Vietnam", b"\x89PNG fixture".to_vec())
        .with_tile(DOWNTOWN_TILE, tile)
}

/// Test server plus the temporary output directory it writes into.
pub struct TestApp {
    pub server: TestServer,
    output_dir: TempDir,
}

impl TestApp {
    pub fn with_store(store: MemoryDocumentStore) -> Self {
        Self::with_config(Arc::new(store), ServiceConfig::default())
    }

    /// Server over `store` with `config`; the output directory is replaced
    /// by a temporary one.
    pub fn with_config(store: Arc<dyn DocumentStore>, config: ServiceConfig) -> Self {
        let output_dir = TempDir::new().expect("create output dir");
        let config = config.with_output_dir(output_dir.path());
        let state = AppState::new(store, config);
        let server = TestServer::new(router(state)).expect("start test server");
        Self { server, output_dir }
    }

    /// Server over [`fixture_store`].
    pub fn fixture() -> Self {
        Self::with_store(fixture_store())
    }

    pub fn output_dir(&self) -> &Path {
        self.output_dir.path()
    }
}
