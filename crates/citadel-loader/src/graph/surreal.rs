//! SurrealDB implementation of [`GraphStore`].
//!
//! ## Mapping
//!
//! - database → SurrealDB database inside the configured namespace
//! - vertex class → table `TYPE NORMAL`, edge class → table `TYPE RELATION`
//! - vertex → record `class:<id>` keyed by the upstream integer id
//! - edge set → `RELATE` from the matched source records to the target record
//!
//! ## Supported Backends
//!
//! - **Remote**: `ws://host:port`, signed in as a root user
//! - **Memory**: `mem://`, embedded engine for development and testing
//!
//! Identifiers are validated before being interpolated into SurrealQL; all
//! values are bound as parameters.

use super::{
    ensure_identifier, ClassHandle, ClassInfo, ClassKind, DatabaseSpec, EdgeRequest, GraphStore,
    StoreConnector, Vertex, VertexWrite,
};
use crate::error::StoreError;
use async_trait::async_trait;
use citadel_config::{DatabaseConfig, StorageMode};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use surrealdb::engine::any::{self, Any};
use surrealdb::opt::auth::Root;
use surrealdb::Surreal;
use tokio::sync::RwLock;
use tracing::debug;

/// SurrealDB-backed graph store.
///
/// Cloning is cheap and shares the same connection.
#[derive(Clone)]
pub struct SurrealGraphStore {
    inner: Arc<SurrealGraphStoreInner>,
}

struct SurrealGraphStoreInner {
    /// `None` once the store has been closed
    db: RwLock<Option<Surreal<Any>>>,
    /// Database selected by `use_database`
    current: RwLock<Option<String>>,
    endpoint: String,
    namespace: String,
}

impl std::fmt::Debug for SurrealGraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurrealGraphStore")
            .field("endpoint", &self.inner.endpoint)
            .field("namespace", &self.inner.namespace)
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
struct NamespaceInfo {
    #[serde(default)]
    databases: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabaseInfo {
    #[serde(default)]
    tables: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct CountRow {
    count: u64,
}

#[derive(Debug, Deserialize)]
struct EdgeRow {
    source: i64,
    target: i64,
}

impl SurrealGraphStore {
    /// Connect to the configured endpoint and select the namespace.
    ///
    /// Remote endpoints are signed into with the configured root credentials.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        ensure_identifier(&config.namespace)?;
        let endpoint = config.endpoint();

        let db = any::connect(endpoint.as_str()).await.map_err(|e| {
            StoreError::Connection(format!("failed to connect to {}: {}", endpoint, e))
        })?;

        if config.storage == StorageMode::Remote {
            db.signin(Root {
                username: &config.username,
                password: &config.password,
            })
            .await
            .map_err(|e| {
                StoreError::Connection(format!(
                    "failed to sign in to {} as '{}': {}",
                    endpoint, config.username, e
                ))
            })?;
        }

        db.use_ns(config.namespace.as_str()).await.map_err(|e| {
            StoreError::Connection(format!(
                "failed to use namespace '{}': {}",
                config.namespace, e
            ))
        })?;

        let store = Self {
            inner: Arc::new(SurrealGraphStoreInner {
                db: RwLock::new(Some(db)),
                current: RwLock::new(None),
                endpoint,
                namespace: config.namespace.clone(),
            }),
        };

        // Namespaces are listed like databases; make sure ours is defined
        store
            .execute(format!(
                "DEFINE NAMESPACE IF NOT EXISTS {}",
                config.namespace
            ))
            .await?;

        debug!(
            "Connected to {} (namespace '{}')",
            store.inner.endpoint, store.inner.namespace
        );
        Ok(store)
    }

    /// Embedded in-memory store, used by tests.
    pub async fn memory(namespace: &str) -> Result<Self, StoreError> {
        let config = DatabaseConfig {
            namespace: namespace.to_string(),
            ..DatabaseConfig::memory("unused")
        };
        Self::connect(&config).await
    }

    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }

    async fn client(&self) -> Result<Surreal<Any>, StoreError> {
        self.inner
            .db
            .read()
            .await
            .clone()
            .ok_or_else(|| StoreError::Connection("connection already closed".to_string()))
    }

    async fn require_database(&self) -> Result<String, StoreError> {
        self.inner
            .current
            .read()
            .await
            .clone()
            .ok_or(StoreError::NoDatabase)
    }

    /// Run a query without bindings and surface statement errors.
    async fn execute(&self, sql: String) -> Result<surrealdb::Response, StoreError> {
        let db = self.client().await?;
        let response = db
            .query(sql)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;
        response
            .check()
            .map_err(|e| StoreError::Rejected(e.to_string()))
    }
}

fn decode_error(e: surrealdb::Error) -> StoreError {
    StoreError::Decode(e.to_string())
}

/// Table kind from its `DEFINE TABLE` statement as reported by `INFO FOR DB`.
fn kind_from_definition(definition: &str) -> ClassKind {
    if definition.to_ascii_uppercase().contains("TYPE RELATION") {
        ClassKind::Edge
    } else {
        ClassKind::Vertex
    }
}

#[async_trait]
impl GraphStore for SurrealGraphStore {
    async fn list_databases(&self) -> Result<Vec<String>, StoreError> {
        let mut response = self.execute("INFO FOR NS".to_string()).await?;
        let info: Option<NamespaceInfo> = response.take(0).map_err(decode_error)?;
        Ok(info.unwrap_or_default().databases.into_keys().collect())
    }

    async fn create_database(&self, spec: &DatabaseSpec) -> Result<(), StoreError> {
        ensure_identifier(&spec.name)?;
        self.execute(format!(
            "DEFINE DATABASE {} COMMENT \"type={} storage={}\"",
            spec.name, spec.db_type, spec.storage
        ))
        .await?;
        Ok(())
    }

    async fn use_database(&self, name: &str) -> Result<(), StoreError> {
        ensure_identifier(name)?;
        let db = self.client().await?;
        db.use_db(name)
            .await
            .map_err(|e| StoreError::Connection(format!("failed to use database '{}': {}", name, e)))?;
        *self.inner.current.write().await = Some(name.to_string());
        Ok(())
    }

    async fn list_classes(&self) -> Result<Vec<ClassInfo>, StoreError> {
        self.require_database().await?;
        let mut response = self.execute("INFO FOR DB".to_string()).await?;
        let info: Option<DatabaseInfo> = response.take(0).map_err(decode_error)?;
        Ok(info
            .unwrap_or_default()
            .tables
            .into_iter()
            .map(|(name, definition)| ClassInfo {
                kind: kind_from_definition(&definition),
                name,
            })
            .collect())
    }

    async fn create_class(&self, name: &str, kind: ClassKind) -> Result<(), StoreError> {
        self.require_database().await?;
        ensure_identifier(name)?;
        let table_type = match kind {
            ClassKind::Vertex => "NORMAL",
            ClassKind::Edge => "RELATION",
        };
        self.execute(format!(
            "DEFINE TABLE {} TYPE {} SCHEMALESS",
            name, table_type
        ))
        .await?;
        Ok(())
    }

    async fn clear_class(&self, class: &ClassHandle) -> Result<(), StoreError> {
        self.require_database().await?;
        ensure_identifier(&class.name)?;
        self.execute(format!("DELETE {}", class.name)).await?;
        Ok(())
    }

    async fn write_vertex(
        &self,
        class: &ClassHandle,
        vertex: &Vertex,
        mode: VertexWrite,
    ) -> Result<(), StoreError> {
        self.require_database().await?;
        ensure_identifier(&class.name)?;
        let statement = match mode {
            VertexWrite::Create => "CREATE",
            VertexWrite::Upsert => "UPSERT",
        };
        let db = self.client().await?;
        db.query(format!(
            "{} type::thing($class, $id) CONTENT $content RETURN NONE",
            statement
        ))
        .bind(("class", class.name.clone()))
        .bind(("id", vertex.id))
        .bind(("content", Value::Object(vertex.fields.clone())))
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?
        .check()
        .map_err(|e| StoreError::Rejected(e.to_string()))?;
        Ok(())
    }

    async fn create_edges(&self, request: &EdgeRequest) -> Result<u64, StoreError> {
        self.require_database().await?;
        ensure_identifier(&request.edge)?;
        ensure_identifier(&request.sources.class)?;
        ensure_identifier(&request.target.class)?;

        let sql = format!(
            "LET $sources = (SELECT VALUE id FROM {source} WHERE record::id(id) IN $source_ids);
             LET $targets = (SELECT VALUE id FROM type::thing($target_class, $target_id));
             IF array::len($sources) > 0 AND array::len($targets) > 0 {{
                 RELATE $sources->{edge}->$targets RETURN NONE;
             }};
             RETURN array::len($sources) * array::len($targets);",
            source = request.sources.class,
            edge = request.edge,
        );

        let db = self.client().await?;
        let mut response = db
            .query(sql)
            .bind(("source_ids", request.sources.ids.clone()))
            .bind(("target_class", request.target.class.clone()))
            .bind(("target_id", request.target.id))
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?
            .check()
            .map_err(|e| StoreError::Rejected(e.to_string()))?;

        let created: Option<u64> = response.take(3).map_err(decode_error)?;
        Ok(created.unwrap_or(0))
    }

    async fn get_vertex(
        &self,
        class: &str,
        id: i64,
    ) -> Result<Option<Map<String, Value>>, StoreError> {
        self.require_database().await?;
        ensure_identifier(class)?;
        let db = self.client().await?;
        let mut response = db
            .query("SELECT * OMIT id FROM type::thing($class, $id)")
            .bind(("class", class.to_string()))
            .bind(("id", id))
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?
            .check()
            .map_err(|e| StoreError::Rejected(e.to_string()))?;

        let row: Option<Value> = response.take(0).map_err(decode_error)?;
        match row {
            Some(Value::Object(mut fields)) => {
                fields.insert("id".to_string(), Value::from(id));
                Ok(Some(fields))
            }
            Some(other) => Err(StoreError::Decode(format!(
                "expected an object for {}#{}, got {}",
                class, id, other
            ))),
            None => Ok(None),
        }
    }

    async fn count(&self, class: &str) -> Result<u64, StoreError> {
        self.require_database().await?;
        ensure_identifier(class)?;
        let mut response = self
            .execute(format!("SELECT count() FROM {} GROUP ALL", class))
            .await?;
        let rows: Vec<CountRow> = response.take(0).map_err(decode_error)?;
        Ok(rows.first().map(|row| row.count).unwrap_or(0))
    }

    async fn edge_endpoints(&self, edge: &str) -> Result<Vec<(i64, i64)>, StoreError> {
        self.require_database().await?;
        ensure_identifier(edge)?;
        let mut response = self
            .execute(format!(
                "SELECT record::id(in) AS source, record::id(out) AS target FROM {}",
                edge
            ))
            .await?;
        let rows: Vec<EdgeRow> = response.take(0).map_err(decode_error)?;
        let mut pairs: Vec<(i64, i64)> = rows.into_iter().map(|row| (row.source, row.target)).collect();
        pairs.sort_unstable();
        Ok(pairs)
    }

    async fn close(&self) -> Result<(), StoreError> {
        // Dropping the last client handle shuts the connection down
        if self.inner.db.write().await.take().is_some() {
            debug!("Closed connection to {}", self.inner.endpoint);
        }
        Ok(())
    }
}

/// Connects a [`SurrealGraphStore`] with these settings.
#[async_trait]
impl StoreConnector for DatabaseConfig {
    async fn connect(&self) -> Result<Arc<dyn GraphStore>, StoreError> {
        let store = SurrealGraphStore::connect(self).await?;
        Ok(Arc::new(store))
    }
}
