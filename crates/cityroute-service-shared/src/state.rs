//! Application state shared by all handlers.
//!
//! The state owns the document store handle and the current road-graph
//! snapshot. A snapshot is immutable; [`AppState::initialize`] builds a new
//! graph outside the lock and swaps it in, so readers see either the old or
//! the new graph, never a partially built one.

use std::sync::{Arc, PoisonError, RwLock};

use cityroute_lib::{load_graph, DocumentStore, Error as LibError, RoadGraph, SqliteDocumentStore};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::ServiceConfig;
use crate::task::PublishGate;

/// Size of a freshly loaded graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GraphSummary {
    pub nodes: usize,
    pub edges: usize,
}

impl GraphSummary {
    fn of(graph: &RoadGraph) -> Self {
        Self {
            nodes: graph.node_count(),
            edges: graph.edge_count(),
        }
    }
}

/// Shared application state, cheap to clone.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    store: Arc<dyn DocumentStore>,
    graph: RwLock<Option<Arc<RoadGraph>>>,
    config: ServiceConfig,
}

impl AppState {
    /// Create an uninitialized state over `store`.
    pub fn new(store: Arc<dyn DocumentStore>, config: ServiceConfig) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                store,
                graph: RwLock::new(None),
                config,
            }),
        }
    }

    /// Create an uninitialized state over the SQLite store named by `config`.
    pub fn from_config(config: ServiceConfig) -> Self {
        let store = Arc::new(SqliteDocumentStore::new(config.store_path.clone()));
        Self::new(store, config)
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.inner.store.as_ref()
    }

    /// Load every document, rebuild the graph, and publish it.
    ///
    /// Blocking; run it on the blocking pool. On failure the previous
    /// snapshot, if any, stays in place.
    pub fn initialize(&self) -> Result<GraphSummary, LibError> {
        self.initialize_gated(&PublishGate::open())
    }

    /// [`AppState::initialize`], publishing only if `gate` still allows it.
    ///
    /// The gate is claimed under the write lock, so a withdrawn request
    /// leaves the current snapshot untouched.
    pub fn initialize_gated(&self, gate: &PublishGate) -> Result<GraphSummary, LibError> {
        let graph = match load_graph(self.store()) {
            Ok(graph) => graph,
            Err(err) => {
                warn!(error = %err, "graph initialization failed; keeping previous snapshot");
                return Err(err);
            }
        };
        let summary = GraphSummary::of(&graph);

        let mut current = self
            .inner
            .graph
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if !gate.try_publish() {
            warn!(
                nodes = summary.nodes,
                edges = summary.edges,
                "initialize abandoned by caller; discarding graph"
            );
            return Err(gate.timeout_error("initialize"));
        }
        let previous = current.replace(Arc::new(graph));
        drop(current);

        info!(
            nodes = summary.nodes,
            edges = summary.edges,
            replaced = previous.is_some(),
            "graph snapshot published"
        );
        Ok(summary)
    }

    /// Current snapshot, or [`LibError::NotInitialized`].
    pub fn graph(&self) -> Result<Arc<RoadGraph>, LibError> {
        self.inner
            .graph
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(LibError::NotInitialized)
    }

    /// Size of the current snapshot, if one is loaded.
    pub fn summary(&self) -> Option<GraphSummary> {
        self.graph().ok().map(|graph| GraphSummary::of(&graph))
    }

    pub fn is_ready(&self) -> bool {
        self.summary().is_some()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.inner.config)
            .field("graph", &self.summary())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cityroute_lib::{Document, MemoryDocumentStore};
    use serde_json::{json, Value};

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    fn two_node_store() -> MemoryDocumentStore {
        MemoryDocumentStore::new(
            vec![
                doc(json!({"osmid": 1, "x": 0.0, "y": 0.0})),
                doc(json!({"osmid": 2, "x": 0.001, "y": 0.0})),
            ],
            vec![doc(json!({"u": 1, "v": 2, "length": 112.0}))],
        )
    }

    #[test]
    fn graph_is_unavailable_before_initialize() {
        let state = AppState::new(Arc::new(two_node_store()), ServiceConfig::default());
        assert!(!state.is_ready());
        assert!(matches!(state.graph(), Err(LibError::NotInitialized)));
    }

    #[test]
    fn initialize_publishes_snapshot() {
        let state = AppState::new(Arc::new(two_node_store()), ServiceConfig::default());
        let summary = state.initialize().unwrap();
        assert_eq!(summary, GraphSummary { nodes: 2, edges: 1 });
        assert_eq!(state.graph().unwrap().node_count(), 2);
        assert!(state.is_ready());
    }

    #[test]
    fn snapshots_held_by_readers_survive_reinitialize() {
        let state = AppState::new(Arc::new(two_node_store()), ServiceConfig::default());
        state.initialize().unwrap();
        let held = state.graph().unwrap();
        state.initialize().unwrap();
        assert!(!Arc::ptr_eq(&held, &state.graph().unwrap()));
        assert_eq!(held.node_count(), 2);
    }

    #[test]
    fn withdrawn_gate_discards_the_new_graph() {
        let state = AppState::new(Arc::new(two_node_store()), ServiceConfig::default());
        let gate = PublishGate::new(std::time::Duration::from_millis(20));
        assert!(gate.timeout_error("x").to_string().contains("20ms"));

        assert!(gate.withdraw());
        assert!(matches!(
            state.initialize_gated(&gate),
            Err(LibError::Timeout { .. })
        ));
        assert!(!state.is_ready());
    }

    #[test]
    fn failed_initialize_keeps_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServiceConfig {
            store_path: dir.path().join("missing.db"),
            ..ServiceConfig::default()
        };
        let state = AppState::from_config(config);
        assert!(matches!(
            state.initialize(),
            Err(LibError::StoreUnavailable { .. })
        ));
        assert!(!state.is_ready());
    }
}
