//! # citadel-loader
//!
//! Loads the Rick and Morty REST catalogue (characters, episodes, locations)
//! into a graph database.
//!
//! ## Pipeline
//!
//! ```text
//! Pipeline (orchestration)
//!   ├─> SchemaProvisioner   database + Character/Episode/Location/MENTIONS/VISITED
//!   ├─> ResourceFetcher     page 1, then pages 2..N with bounded fan-out
//!   ├─> EntityLoader        one vertex per record, projected fields only
//!   └─> EdgeDeriver         set-to-single edge requests from reference URLs
//! ```
//!
//! The graph database sits behind the [`GraphStore`] trait; [`SurrealGraphStore`]
//! is the production backend.

pub mod api;
pub mod edges;
pub mod error;
pub mod graph;
pub mod loader;
pub mod pipeline;
pub mod schema;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use api::{Character, Episode, Location, Resource, ResourceFetcher};
pub use edges::{DerivationSummary, EdgeDeriver};
pub use error::{
    DerivationError, FetchError, LoadError, PipelineError, ProvisioningError, StoreError,
};
pub use graph::surreal::SurrealGraphStore;
pub use graph::{ClassHandle, ClassKind, DatabaseHandle, GraphStore, StoreConnector};
pub use loader::EntityLoader;
pub use pipeline::{Pipeline, PipelineOptions, PipelineState, RunReport};
pub use schema::{GraphSchema, SchemaProvisioner};
