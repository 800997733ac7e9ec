//! Upstream REST API: typed records, reference URLs and the paginated fetcher.

pub mod fetcher;
pub mod records;
pub mod reference;

pub use fetcher::ResourceFetcher;
pub use records::{Character, Episode, Location, Page, PageInfo, ResourceRecord};
pub use reference::{parse_reference, ReferenceError};

use std::fmt;

/// The three paginated collections exposed by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Character,
    Episode,
    Location,
}

impl Resource {
    /// Path segment used by the API (`/api/{segment}/`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Character => "character",
            Resource::Episode => "episode",
            Resource::Location => "location",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
