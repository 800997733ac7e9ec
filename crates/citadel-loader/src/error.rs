//! Error types for citadel-loader.
//!
//! One enum per pipeline stage. Nothing is retried: a stage error aborts the
//! stage and the orchestrator wraps it in [`PipelineError`].

use crate::api::reference::ReferenceError;
use crate::graph::ClassKind;
use crate::pipeline::PipelineState;

/// Failures reported by a [`GraphStore`](crate::graph::GraphStore) backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("query failed: {0}")]
    Query(String),

    /// The store refused a write (duplicate record, permissions, ...)
    #[error("operation rejected: {0}")]
    Rejected(String),

    #[error("failed to decode store response: {0}")]
    Decode(String),

    #[error("'{0}' is not a valid identifier")]
    InvalidIdentifier(String),

    #[error("no database selected")]
    NoDatabase,
}

/// Network or parse failure while paginating an upstream resource.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// Body was not JSON, or a required field was missing or mistyped
    #[error("unexpected response body from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Database or class setup failure.
#[derive(Debug, thiserror::Error)]
pub enum ProvisioningError {
    #[error("failed to connect to graph database: {0}")]
    Connect(#[source] StoreError),

    #[error("failed to list databases: {0}")]
    ListDatabases(#[source] StoreError),

    #[error("failed to create database '{name}': {source}")]
    CreateDatabase {
        name: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to open database '{name}': {source}")]
    OpenDatabase {
        name: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to list classes: {0}")]
    ListClasses(#[source] StoreError),

    #[error("failed to create {kind} class '{name}': {source}")]
    CreateClass {
        name: String,
        kind: ClassKind,
        #[source]
        source: StoreError,
    },

    #[error("class '{name}' already exists as {found}, expected {expected}")]
    KindMismatch {
        name: String,
        expected: ClassKind,
        found: ClassKind,
    },
}

/// Vertex creation or class clearing rejected.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("batch for class '{class}' contains id {id} more than once")]
    DuplicateId { class: String, id: i64 },

    #[error("failed to create {class}#{id}: {source}")]
    Create {
        class: String,
        id: i64,
        #[source]
        source: StoreError,
    },

    #[error("failed to clear class '{class}': {source}")]
    Clear {
        class: String,
        #[source]
        source: StoreError,
    },
}

/// Edge-creation failure.
#[derive(Debug, thiserror::Error)]
pub enum DerivationError {
    #[error("{owner} has an invalid reference: {source}")]
    InvalidReference {
        owner: String,
        #[source]
        source: ReferenceError,
    },

    #[error("failed to create {edge} edges into {target}: {source}")]
    Relate {
        edge: String,
        target: String,
        #[source]
        source: StoreError,
    },
}

/// Error from any stage, tagged with the state the pipeline was in.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("{state} failed: {source}")]
    Provisioning {
        state: PipelineState,
        #[source]
        source: ProvisioningError,
    },

    #[error("{state} failed: {source}")]
    Fetch {
        state: PipelineState,
        #[source]
        source: FetchError,
    },

    #[error("{state} failed: {source}")]
    Load {
        state: PipelineState,
        #[source]
        source: LoadError,
    },

    #[error("{state} failed: {source}")]
    Derivation {
        state: PipelineState,
        #[source]
        source: DerivationError,
    },

    #[error("closing the database connection failed: {0}")]
    Close(#[source] StoreError),
}

impl PipelineError {
    /// The state the run was in when it failed.
    pub fn state(&self) -> PipelineState {
        match self {
            PipelineError::Provisioning { state, .. }
            | PipelineError::Fetch { state, .. }
            | PipelineError::Load { state, .. }
            | PipelineError::Derivation { state, .. } => *state,
            PipelineError::Close(_) => PipelineState::Closing,
        }
    }
}
