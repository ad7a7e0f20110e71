//! Document store adapters.
//!
//! The store holds three collections: node documents, edge documents, and
//! map tiles (`{location_name, image_data}`). [`SqliteDocumentStore`] keeps
//! them in a single SQLite file, one JSON document per row;
//! [`MemoryDocumentStore`] keeps them in process memory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OpenFlags, OptionalExtension, TransactionBehavior};
use serde_json::Value;
use tracing::{debug, info};

use crate::document::Document;
use crate::error::{Error, Result};
use crate::graph::build_graph;

/// Read access to the stored road network.
pub trait DocumentStore: Send + Sync {
    /// All node documents, in storage order.
    fn fetch_nodes(&self) -> Result<Vec<Document>>;

    /// All edge documents, in storage order.
    fn fetch_edges(&self) -> Result<Vec<Document>>;

    /// Raw image bytes of the map tile stored under `location_name`.
    fn fetch_map_tile(&self, location_name: &str) -> Result<Vec<u8>>;
}

/// How [`SqliteDocumentStore::import_network`] treats documents already stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportMode {
    /// Keep stored documents and add the new ones next to them.
    #[default]
    Append,
    /// Drop stored nodes and edges first. Map tiles are kept.
    Replace,
}

/// Outcome of an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    /// Documents written by this import.
    pub nodes: usize,
    pub edges: usize,
    /// Size of the stored network afterwards.
    pub total_nodes: usize,
    pub total_edges: usize,
}

/// Collection holding node or edge documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Collection {
    Nodes,
    Edges,
}

impl Collection {
    fn table(self) -> &'static str {
        match self {
            Collection::Nodes => "nodes",
            Collection::Edges => "edges",
        }
    }
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS nodes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        document TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS edges (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        document TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS maps (
        location_name TEXT PRIMARY KEY,
        image_data BLOB NOT NULL
    );
";

/// SQLite-backed document store.
///
/// Every call opens its own connection, so the store is cheap to share
/// between threads. Reads open the file read-only: a missing database is
/// reported as [`Error::StoreUnavailable`] instead of silently creating an
/// empty store.
#[derive(Debug, Clone)]
pub struct SqliteDocumentStore {
    path: PathBuf,
}

impl SqliteDocumentStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the backing database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect_read(&self) -> Result<Connection> {
        let connection = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| Error::StoreUnavailable {
            message: format!("cannot open {}: {e}", self.path.display()),
        })?;
        Ok(connection)
    }

    fn connect_write(&self) -> Result<Connection> {
        let connection = Connection::open(&self.path)?;
        connection.execute_batch(SCHEMA)?;
        Ok(connection)
    }

    fn fetch_documents(&self, collection: Collection) -> Result<Vec<Document>> {
        let connection = self.connect_read()?;
        let documents = read_collection(&connection, collection)?;
        debug!(
            collection = collection.table(),
            count = documents.len(),
            path = %self.path.display(),
            "fetched documents"
        );
        Ok(documents)
    }

    /// Write node and edge documents in one transaction.
    ///
    /// The documents that will be stored afterwards (what is already stored
    /// plus `nodes`/`edges` for [`ImportMode::Append`], only the new ones for
    /// [`ImportMode::Replace`]) must build into a graph; otherwise nothing is
    /// written and the [`build_graph`] error is returned.
    pub fn import_network(
        &self,
        nodes: &[Document],
        edges: &[Document],
        mode: ImportMode,
    ) -> Result<ImportSummary> {
        let mut connection = self.connect_write()?;
        // Immediate: no other writer can slip in between validation and commit.
        let tx = connection.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let (mut all_nodes, mut all_edges) = match mode {
            ImportMode::Append => (
                read_collection(&tx, Collection::Nodes)?,
                read_collection(&tx, Collection::Edges)?,
            ),
            ImportMode::Replace => (Vec::new(), Vec::new()),
        };
        all_nodes.extend_from_slice(nodes);
        all_edges.extend_from_slice(edges);
        let graph = build_graph(all_nodes, all_edges)?;

        if mode == ImportMode::Replace {
            tx.execute_batch("DELETE FROM nodes; DELETE FROM edges;")?;
        }
        write_collection(&tx, Collection::Nodes, nodes)?;
        write_collection(&tx, Collection::Edges, edges)?;
        tx.commit()?;

        let summary = ImportSummary {
            nodes: nodes.len(),
            edges: edges.len(),
            total_nodes: graph.node_count(),
            total_edges: graph.edge_count(),
        };
        info!(
            ?mode,
            nodes = summary.nodes,
            edges = summary.edges,
            total_nodes = summary.total_nodes,
            total_edges = summary.total_edges,
            "imported road network"
        );
        Ok(summary)
    }

    /// Store a map tile, replacing any tile with the same name.
    pub fn insert_map_tile(&self, location_name: &str, image_data: &[u8]) -> Result<()> {
        let connection = self.connect_write()?;
        connection.execute(
            "INSERT OR REPLACE INTO maps (location_name, image_data) VALUES (?1, ?2)",
            params![location_name, image_data],
        )?;
        info!(location_name, bytes = image_data.len(), "stored map tile");
        Ok(())
    }
}

fn read_collection(connection: &Connection, collection: Collection) -> Result<Vec<Document>> {
    let sql = format!("SELECT id, document FROM {} ORDER BY id", collection.table());
    let mut statement = connection.prepare(&sql)?;
    let rows = statement.query_map([], |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut documents = Vec::new();
    for row in rows {
        let (id, text) = row?;
        let record = || format!("{} row {id}", collection.table());
        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => documents.push(map),
            Ok(_) => {
                return Err(Error::integrity(
                    record(),
                    "stored document is not a JSON object",
                ))
            }
            Err(e) => return Err(Error::integrity(record(), e.to_string())),
        }
    }
    Ok(documents)
}

fn write_collection(connection: &Connection, collection: Collection, documents: &[Document]) -> Result<()> {
    let sql = format!("INSERT INTO {} (document) VALUES (?1)", collection.table());
    let mut statement = connection.prepare(&sql)?;
    for document in documents {
        let text = serde_json::to_string(document)?;
        statement.execute(params![text])?;
    }
    Ok(())
}

impl DocumentStore for SqliteDocumentStore {
    fn fetch_nodes(&self) -> Result<Vec<Document>> {
        self.fetch_documents(Collection::Nodes)
    }

    fn fetch_edges(&self) -> Result<Vec<Document>> {
        self.fetch_documents(Collection::Edges)
    }

    fn fetch_map_tile(&self, location_name: &str) -> Result<Vec<u8>> {
        let connection = self.connect_read()?;
        let tile = connection
            .query_row(
                "SELECT image_data FROM maps WHERE location_name = ?1",
                params![location_name],
                |row| row.get::<_, Vec<u8>>(0),
            )
            .optional()?;

        tile.ok_or_else(|| Error::NotFound {
            kind: "map tile",
            name: location_name.to_string(),
        })
    }
}

/// In-memory document store.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentStore {
    nodes: Vec<Document>,
    edges: Vec<Document>,
    tiles: HashMap<String, Vec<u8>>,
}

impl MemoryDocumentStore {
    pub fn new(nodes: Vec<Document>, edges: Vec<Document>) -> Self {
        Self {
            nodes,
            edges,
            tiles: HashMap::new(),
        }
    }

    /// Attach a map tile under `location_name`.
    pub fn with_tile(mut self, location_name: impl Into<String>, image_data: Vec<u8>) -> Self {
        self.tiles.insert(location_name.into(), image_data);
        self
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn fetch_nodes(&self) -> Result<Vec<Document>> {
        Ok(self.nodes.clone())
    }

    fn fetch_edges(&self) -> Result<Vec<Document>> {
        Ok(self.edges.clone())
    }

    fn fetch_map_tile(&self, location_name: &str) -> Result<Vec<u8>> {
        self.tiles
            .get(location_name)
            .cloned()
            .ok_or_else(|| Error::NotFound {
                kind: "map tile",
                name: location_name.to_string(),
            })
    }
}
