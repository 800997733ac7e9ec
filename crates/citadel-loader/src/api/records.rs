//! Typed upstream records.
//!
//! Required fields are enforced by deserialization: a page whose records lack
//! `id`, `name` or a reference list fails to decode instead of carrying
//! undefined values into the loader. Fields the loader does not consume are
//! ignored.

use super::Resource;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Pagination metadata of a page response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    /// Total number of pages for the resource
    pub pages: u32,
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub next: Option<String>,
}

/// One page of a paginated resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub info: PageInfo,
    pub results: Vec<T>,
}

/// A record type served by one of the paginated collections.
pub trait ResourceRecord: DeserializeOwned + Send + Sync + 'static {
    const RESOURCE: Resource;

    /// Upstream identifier, reused as the vertex id.
    fn id(&self) -> i64;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub id: i64,
    pub name: String,
    pub species: String,
    /// Episode reference URLs, in upstream order
    pub episode: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    pub id: i64,
    pub name: String,
    /// Episode code, e.g. `S01E01`
    pub episode: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: i64,
    pub name: String,
    /// Character reference URLs, in upstream order
    pub residents: Vec<String>,
}

impl ResourceRecord for Character {
    const RESOURCE: Resource = Resource::Character;

    fn id(&self) -> i64 {
        self.id
    }
}

impl ResourceRecord for Episode {
    const RESOURCE: Resource = Resource::Episode;

    fn id(&self) -> i64 {
        self.id
    }
}

impl ResourceRecord for Location {
    const RESOURCE: Resource = Resource::Location;

    fn id(&self) -> i64 {
        self.id
    }
}
