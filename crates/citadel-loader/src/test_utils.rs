//! Test utilities: an in-memory [`GraphStore`] that records every call.
//!
//! `RecordingGraphStore` behaves like a small graph database (databases,
//! classes, vertices keyed by id, edges) and keeps an ordered log of the
//! operations issued against it, so tests can assert on exactly which
//! requests a component made. Single operations can be made to fail.

use crate::error::StoreError;
use crate::graph::{
    ClassHandle, ClassInfo, ClassKind, DatabaseSpec, EdgeRequest, GraphStore, Vertex, VertexWrite,
};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// One operation issued against the store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    ListDatabases,
    CreateDatabase(DatabaseSpec),
    UseDatabase(String),
    ListClasses,
    CreateClass(String, ClassKind),
    ClearClass(String),
    WriteVertex {
        class: String,
        id: i64,
        mode: VertexWrite,
    },
    CreateEdges(EdgeRequest),
    GetVertex(String, i64),
    Count(String),
    EdgeEndpoints(String),
    Close,
}

/// Operation kinds that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOn {
    ListDatabases,
    CreateDatabase,
    CreateClass,
    ClearClass,
    WriteVertex,
    CreateEdges,
    Close,
}

#[derive(Debug, Default)]
struct DatabaseState {
    classes: BTreeMap<String, ClassKind>,
    vertices: BTreeMap<String, BTreeMap<i64, Map<String, Value>>>,
    edges: BTreeMap<String, Vec<(String, i64, String, i64)>>,
}

#[derive(Debug, Default)]
struct State {
    databases: BTreeMap<String, DatabaseState>,
    current: Option<String>,
    calls: Vec<StoreCall>,
    failures: Vec<FailOn>,
    closed: bool,
}

#[derive(Debug, Default)]
pub struct RecordingGraphStore {
    state: Mutex<State>,
}

impl RecordingGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation of this kind fail with `Rejected`.
    pub fn fail_on(&self, op: FailOn) {
        self.lock().failures.push(op);
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    /// Number of recorded calls matching `predicate`.
    pub fn count_calls(&self, predicate: impl Fn(&StoreCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|call| predicate(call)).count()
    }

    /// Every edge request issued, in order.
    pub fn edge_requests(&self) -> Vec<EdgeRequest> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                StoreCall::CreateEdges(request) => Some(request.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Edges stored in `edge` as `(source id, target id)` pairs, sorted.
    pub fn edges(&self, edge: &str) -> Vec<(i64, i64)> {
        let state = self.lock();
        let mut pairs: Vec<(i64, i64)> = state
            .current
            .as_ref()
            .and_then(|db| state.databases.get(db))
            .and_then(|db| db.edges.get(edge))
            .map(|edges| edges.iter().map(|(_, from, _, to)| (*from, *to)).collect())
            .unwrap_or_default();
        pairs.sort_unstable();
        pairs
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record the call and apply failure injection.
    fn begin(&self, call: StoreCall, op: Option<FailOn>) -> Result<MutexGuard<'_, State>, StoreError> {
        let mut state = self.lock();
        state.calls.push(call);
        if state.closed {
            return Err(StoreError::Connection("connection already closed".to_string()));
        }
        if let Some(op) = op {
            if state.failures.contains(&op) {
                return Err(StoreError::Rejected(format!("injected failure on {:?}", op)));
            }
        }
        Ok(state)
    }
}

fn current_db<'a>(state: &'a mut State) -> Result<&'a mut DatabaseState, StoreError> {
    let name = state.current.clone().ok_or(StoreError::NoDatabase)?;
    state
        .databases
        .get_mut(&name)
        .ok_or_else(|| StoreError::Query(format!("database '{}' does not exist", name)))
}

#[async_trait]
impl GraphStore for RecordingGraphStore {
    async fn list_databases(&self) -> Result<Vec<String>, StoreError> {
        let state = self.begin(StoreCall::ListDatabases, Some(FailOn::ListDatabases))?;
        Ok(state.databases.keys().cloned().collect())
    }

    async fn create_database(&self, spec: &DatabaseSpec) -> Result<(), StoreError> {
        let mut state = self.begin(
            StoreCall::CreateDatabase(spec.clone()),
            Some(FailOn::CreateDatabase),
        )?;
        if state.databases.contains_key(&spec.name) {
            return Err(StoreError::Rejected(format!(
                "database '{}' already exists",
                spec.name
            )));
        }
        state.databases.insert(spec.name.clone(), DatabaseState::default());
        Ok(())
    }

    async fn use_database(&self, name: &str) -> Result<(), StoreError> {
        let mut state = self.begin(StoreCall::UseDatabase(name.to_string()), None)?;
        if !state.databases.contains_key(name) {
            return Err(StoreError::Query(format!("database '{}' does not exist", name)));
        }
        state.current = Some(name.to_string());
        Ok(())
    }

    async fn list_classes(&self) -> Result<Vec<ClassInfo>, StoreError> {
        let mut state = self.begin(StoreCall::ListClasses, None)?;
        let db = current_db(&mut state)?;
        Ok(db
            .classes
            .iter()
            .map(|(name, kind)| ClassInfo {
                name: name.clone(),
                kind: *kind,
            })
            .collect())
    }

    async fn create_class(&self, name: &str, kind: ClassKind) -> Result<(), StoreError> {
        let mut state = self.begin(
            StoreCall::CreateClass(name.to_string(), kind),
            Some(FailOn::CreateClass),
        )?;
        let db = current_db(&mut state)?;
        if db.classes.contains_key(name) {
            return Err(StoreError::Rejected(format!("class '{}' already exists", name)));
        }
        db.classes.insert(name.to_string(), kind);
        Ok(())
    }

    async fn clear_class(&self, class: &ClassHandle) -> Result<(), StoreError> {
        let mut state = self.begin(
            StoreCall::ClearClass(class.name.clone()),
            Some(FailOn::ClearClass),
        )?;
        let db = current_db(&mut state)?;
        db.vertices.remove(&class.name);
        db.edges.remove(&class.name);
        // Removing vertices removes the edges attached to them
        for edges in db.edges.values_mut() {
            edges.retain(|(from_class, _, to_class, _)| {
                from_class != &class.name && to_class != &class.name
            });
        }
        Ok(())
    }

    async fn write_vertex(
        &self,
        class: &ClassHandle,
        vertex: &Vertex,
        mode: VertexWrite,
    ) -> Result<(), StoreError> {
        let mut state = self.begin(
            StoreCall::WriteVertex {
                class: class.name.clone(),
                id: vertex.id,
                mode,
            },
            Some(FailOn::WriteVertex),
        )?;
        let db = current_db(&mut state)?;
        let vertices = db.vertices.entry(class.name.clone()).or_default();
        if mode == VertexWrite::Create && vertices.contains_key(&vertex.id) {
            return Err(StoreError::Rejected(format!(
                "record {}#{} already exists",
                class.name, vertex.id
            )));
        }
        vertices.insert(vertex.id, vertex.fields.clone());
        Ok(())
    }

    async fn create_edges(&self, request: &EdgeRequest) -> Result<u64, StoreError> {
        let mut state = self.begin(
            StoreCall::CreateEdges(request.clone()),
            Some(FailOn::CreateEdges),
        )?;
        let db = current_db(&mut state)?;

        let exists = |class: &str, id: i64| {
            db.vertices
                .get(class)
                .map(|vertices| vertices.contains_key(&id))
                .unwrap_or(false)
        };
        if !exists(&request.target.class, request.target.id) {
            return Ok(0);
        }
        let sources: Vec<i64> = request
            .sources
            .ids
            .iter()
            .copied()
            .filter(|id| exists(&request.sources.class, *id))
            .collect();

        let edges = db.edges.entry(request.edge.clone()).or_default();
        for id in &sources {
            edges.push((
                request.sources.class.clone(),
                *id,
                request.target.class.clone(),
                request.target.id,
            ));
        }
        Ok(sources.len() as u64)
    }

    async fn get_vertex(
        &self,
        class: &str,
        id: i64,
    ) -> Result<Option<Map<String, Value>>, StoreError> {
        let mut state = self.begin(StoreCall::GetVertex(class.to_string(), id), None)?;
        let db = current_db(&mut state)?;
        Ok(db
            .vertices
            .get(class)
            .and_then(|vertices| vertices.get(&id))
            .map(|fields| {
                let mut row = fields.clone();
                row.insert("id".to_string(), Value::from(id));
                row
            }))
    }

    async fn count(&self, class: &str) -> Result<u64, StoreError> {
        let mut state = self.begin(StoreCall::Count(class.to_string()), None)?;
        let db = current_db(&mut state)?;
        let vertices = db.vertices.get(class).map(|v| v.len()).unwrap_or(0);
        let edges = db.edges.get(class).map(|e| e.len()).unwrap_or(0);
        Ok((vertices + edges) as u64)
    }

    async fn edge_endpoints(&self, edge: &str) -> Result<Vec<(i64, i64)>, StoreError> {
        drop(self.begin(StoreCall::EdgeEndpoints(edge.to_string()), None)?);
        Ok(self.edges(edge))
    }

    async fn close(&self) -> Result<(), StoreError> {
        let mut state = self.lock();
        state.calls.push(StoreCall::Close);
        if state.failures.contains(&FailOn::Close) {
            return Err(StoreError::Connection("injected failure on Close".to_string()));
        }
        state.closed = true;
        Ok(())
    }
}
