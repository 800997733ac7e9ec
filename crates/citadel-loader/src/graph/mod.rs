//! Graph database capability.
//!
//! [`GraphStore`] is the seam between the loader and the database engine:
//! database/class listing and creation, vertex writes, set-to-single edge
//! creation, clearing and counting. [`surreal::SurrealGraphStore`] backs it
//! with SurrealDB; tests use the recording fake from `test_utils`.

pub mod surreal;

use crate::error::StoreError;
use async_trait::async_trait;
use citadel_config::StorageMode;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Whether a class holds vertices or edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassKind {
    Vertex,
    Edge,
}

impl fmt::Display for ClassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassKind::Vertex => f.write_str("vertex"),
            ClassKind::Edge => f.write_str("edge"),
        }
    }
}

/// Kind of database to create. Only graph databases are used by the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseType {
    Graph,
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("graph")
    }
}

/// Everything needed to create a database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSpec {
    pub name: String,
    pub db_type: DatabaseType,
    pub storage: StorageMode,
}

impl DatabaseSpec {
    pub fn graph(name: impl Into<String>, storage: StorageMode) -> Self {
        Self {
            name: name.into(),
            db_type: DatabaseType::Graph,
            storage,
        }
    }
}

/// A provisioned database that the store's session is using.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseHandle {
    pub name: String,
}

/// A provisioned class inside a [`DatabaseHandle`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassHandle {
    pub name: String,
    pub kind: ClassKind,
}

/// A class as reported by [`GraphStore::list_classes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassInfo {
    pub name: String,
    pub kind: ClassKind,
}

/// Vertex payload: the upstream id plus the projected fields.
///
/// `fields` never contains `id`; the id is the vertex key.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    pub id: i64,
    pub fields: Map<String, Value>,
}

/// How a vertex write treats an existing vertex with the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexWrite {
    /// Fail if the id already exists
    Create,
    /// Overwrite the existing vertex
    Upsert,
}

/// The existing vertices of `class` whose id is in `ids`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexSet {
    pub class: String,
    pub ids: Vec<i64>,
}

/// The single existing vertex `class#id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexRef {
    pub class: String,
    pub id: i64,
}

impl fmt::Display for VertexRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.class, self.id)
    }
}

/// One bulk edge request: an edge from every matched source to the target.
///
/// Sources or a target that do not exist are skipped silently, so a request
/// can create fewer edges than it names ids, or none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeRequest {
    pub edge: String,
    pub sources: VertexSet,
    pub target: VertexRef,
}

#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn list_databases(&self) -> Result<Vec<String>, StoreError>;

    async fn create_database(&self, spec: &DatabaseSpec) -> Result<(), StoreError>;

    /// Point the session at `name`; later class and vertex operations use it.
    async fn use_database(&self, name: &str) -> Result<(), StoreError>;

    async fn list_classes(&self) -> Result<Vec<ClassInfo>, StoreError>;

    async fn create_class(&self, name: &str, kind: ClassKind) -> Result<(), StoreError>;

    /// Delete every instance of the class.
    async fn clear_class(&self, class: &ClassHandle) -> Result<(), StoreError>;

    async fn write_vertex(
        &self,
        class: &ClassHandle,
        vertex: &Vertex,
        mode: VertexWrite,
    ) -> Result<(), StoreError>;

    /// Create the edges described by `request`, returning how many were created.
    async fn create_edges(&self, request: &EdgeRequest) -> Result<u64, StoreError>;

    /// Read a vertex back as its field map, `id` included.
    async fn get_vertex(&self, class: &str, id: i64) -> Result<Option<Map<String, Value>>, StoreError>;

    async fn count(&self, class: &str) -> Result<u64, StoreError>;

    /// `(source id, target id)` of every edge in `edge`, sorted.
    async fn edge_endpoints(&self, edge: &str) -> Result<Vec<(i64, i64)>, StoreError>;

    async fn close(&self) -> Result<(), StoreError>;
}

/// Opens a [`GraphStore`] session.
///
/// The pipeline connects inside its Provisioning stage, so an unreachable
/// database is reported like any other provisioning failure.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn GraphStore>, StoreError>;
}

/// An already open store connects to itself.
#[async_trait]
impl<S: GraphStore + 'static> StoreConnector for Arc<S> {
    async fn connect(&self) -> Result<Arc<dyn GraphStore>, StoreError> {
        Ok(Arc::clone(self) as Arc<dyn GraphStore>)
    }
}

/// Reject names that cannot be used as bare identifiers in a query.
pub(crate) fn ensure_identifier(name: &str) -> Result<(), StoreError> {
    if citadel_config::is_identifier(name) {
        Ok(())
    } else {
        Err(StoreError::InvalidIdentifier(name.to_string()))
    }
}
