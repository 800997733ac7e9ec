//! Edge derivation from embedded reference URLs.
//!
//! - `MENTIONS`: Episode → Character, from each character's `episode` list
//! - `VISITED`: Character → Location, from each location's `residents` list
//!
//! Each record with a non-empty reference list produces exactly one
//! set-to-single [`EdgeRequest`]; records with an empty list produce none.
//! All references are parsed before the first request is sent.

use crate::api::{parse_reference, Character, Location, Resource};
use crate::error::DerivationError;
use crate::graph::{ClassHandle, EdgeRequest, GraphStore, VertexRef, VertexSet};
use crate::schema::GraphSchema;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::BTreeSet;
use tracing::debug;

/// Outcome of one derivation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DerivationSummary {
    /// Edge requests issued
    pub requests: usize,
    /// Edges the store reported as created
    pub edges: u64,
}

pub struct EdgeDeriver<'a> {
    store: &'a dyn GraphStore,
    schema: &'a GraphSchema,
    concurrency: usize,
}

impl<'a> EdgeDeriver<'a> {
    pub fn new(store: &'a dyn GraphStore, schema: &'a GraphSchema, concurrency: usize) -> Self {
        Self {
            store,
            schema,
            concurrency: concurrency.max(1),
        }
    }

    /// One MENTIONS request per character that appears in at least one episode.
    pub fn plan_mentions(&self, characters: &[Character]) -> Result<Vec<EdgeRequest>, DerivationError> {
        let mut requests = Vec::new();
        for character in characters {
            if let Some(request) = plan(
                &self.schema.mentions,
                &self.schema.episode,
                Resource::Episode,
                VertexRef {
                    class: self.schema.character.name.clone(),
                    id: character.id,
                },
                &character.episode,
            )? {
                requests.push(request);
            }
        }
        Ok(requests)
    }

    /// One VISITED request per location with at least one resident.
    pub fn plan_visited(&self, locations: &[Location]) -> Result<Vec<EdgeRequest>, DerivationError> {
        let mut requests = Vec::new();
        for location in locations {
            if let Some(request) = plan(
                &self.schema.visited,
                &self.schema.character,
                Resource::Character,
                VertexRef {
                    class: self.schema.location.name.clone(),
                    id: location.id,
                },
                &location.residents,
            )? {
                requests.push(request);
            }
        }
        Ok(requests)
    }

    pub async fn derive_mentions(
        &self,
        characters: &[Character],
    ) -> Result<DerivationSummary, DerivationError> {
        let requests = self.plan_mentions(characters)?;
        self.execute(requests).await
    }

    pub async fn derive_visited(
        &self,
        locations: &[Location],
    ) -> Result<DerivationSummary, DerivationError> {
        let requests = self.plan_visited(locations)?;
        self.execute(requests).await
    }

    /// Issue the requests with bounded concurrency; the first failure aborts.
    async fn execute(&self, requests: Vec<EdgeRequest>) -> Result<DerivationSummary, DerivationError> {
        let store = self.store;
        let counts: Vec<u64> = stream::iter(requests.iter())
            .map(|request| async move {
                let created = store.create_edges(request).await.map_err(|source| {
                    DerivationError::Relate {
                        edge: request.edge.clone(),
                        target: request.target.to_string(),
                        source,
                    }
                })?;
                debug!(
                    "{} <-- {} -- {}{:?} ({} created)",
                    request.target, request.edge, request.sources.class, request.sources.ids, created
                );
                Ok::<u64, DerivationError>(created)
            })
            .buffer_unordered(self.concurrency)
            .try_collect()
            .await?;

        Ok(DerivationSummary {
            requests: counts.len(),
            edges: counts.iter().sum(),
        })
    }
}

/// Build the request for one record, or `None` when it references nothing.
fn plan(
    edge: &ClassHandle,
    source_class: &ClassHandle,
    source_resource: Resource,
    target: VertexRef,
    references: &[String],
) -> Result<Option<EdgeRequest>, DerivationError> {
    if references.is_empty() {
        return Ok(None);
    }

    let ids = references
        .iter()
        .map(|reference| parse_reference(reference, source_resource))
        .collect::<Result<BTreeSet<i64>, _>>()
        .map_err(|source| DerivationError::InvalidReference {
            owner: target.to_string(),
            source,
        })?;

    Ok(Some(EdgeRequest {
        edge: edge.name.clone(),
        sources: VertexSet {
            class: source_class.name.clone(),
            ids: ids.into_iter().collect(),
        },
        target,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{DatabaseSpec, Vertex, VertexWrite};
    use crate::schema::SchemaProvisioner;
    use crate::test_utils::{FailOn, RecordingGraphStore, StoreCall};
    use citadel_config::StorageMode;
    use serde_json::Map;

    fn character(id: i64, episodes: &[&str]) -> Character {
        Character {
            id,
            name: format!("Character {}", id),
            species: "Human".to_string(),
            episode: episodes.iter().map(|e| e.to_string()).collect(),
        }
    }

    fn location(id: i64, residents: &[&str]) -> Location {
        Location {
            id,
            name: format!("Location {}", id),
            residents: residents.iter().map(|r| r.to_string()).collect(),
        }
    }

    async fn setup() -> (RecordingGraphStore, GraphSchema) {
        let store = RecordingGraphStore::new();
        let schema = SchemaProvisioner::new(&store)
            .provision(&DatabaseSpec::graph("Test", StorageMode::Memory))
            .await
            .unwrap();
        (store, schema)
    }

    async fn seed(store: &RecordingGraphStore, class: &ClassHandle, ids: &[i64]) {
        for id in ids {
            store
                .write_vertex(
                    class,
                    &Vertex {
                        id: *id,
                        fields: Map::new(),
                    },
                    VertexWrite::Create,
                )
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_one_request_per_character_with_episodes() {
        let (store, schema) = setup().await;
        let deriver = EdgeDeriver::new(&store, &schema, 4);

        deriver
            .derive_mentions(&[character(10, &["/api/episode/1/", "/api/episode/3/"])])
            .await
            .unwrap();

        let requests = store.edge_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].edge, "MENTIONS");
        assert_eq!(
            requests[0].sources,
            VertexSet {
                class: "Episode".to_string(),
                ids: vec![1, 3]
            }
        );
        assert_eq!(
            requests[0].target,
            VertexRef {
                class: "Character".to_string(),
                id: 10
            }
        );
    }

    #[tokio::test]
    async fn test_empty_reference_lists_issue_no_requests() {
        let (store, schema) = setup().await;
        let deriver = EdgeDeriver::new(&store, &schema, 4);

        let mentions = deriver.derive_mentions(&[character(10, &[])]).await.unwrap();
        let visited = deriver.derive_visited(&[location(100, &[])]).await.unwrap();

        assert_eq!(mentions, DerivationSummary::default());
        assert_eq!(visited, DerivationSummary::default());
        assert_eq!(
            store.count_calls(|c| matches!(c, StoreCall::CreateEdges(_))),
            0
        );
    }

    #[tokio::test]
    async fn test_single_resident_targets_one_character() {
        let (store, schema) = setup().await;
        let deriver = EdgeDeriver::new(&store, &schema, 4);

        deriver
            .derive_visited(&[location(
                100,
                &["https://rickandmortyapi.com/api/character/10"],
            )])
            .await
            .unwrap();

        let requests = store.edge_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].edge, "VISITED");
        assert_eq!(requests[0].sources.class, "Character");
        assert_eq!(requests[0].sources.ids, vec![10]);
        assert_eq!(requests[0].target.class, "Location");
        assert_eq!(requests[0].target.id, 100);
    }

    #[tokio::test]
    async fn test_duplicate_references_collapse_to_a_set() {
        let (store, schema) = setup().await;
        let deriver = EdgeDeriver::new(&store, &schema, 1);

        let requests = deriver
            .plan_mentions(&[character(
                1,
                &["/api/episode/2", "/api/episode/1", "/api/episode/2/"],
            )])
            .unwrap();
        assert_eq!(requests[0].sources.ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_missing_vertices_shrink_the_edge_set_silently() {
        let (store, schema) = setup().await;
        seed(&store, &schema.episode, &[1]).await;
        seed(&store, &schema.character, &[10]).await;
        let deriver = EdgeDeriver::new(&store, &schema, 4);

        let summary = deriver
            .derive_mentions(&[character(10, &["/api/episode/1", "/api/episode/99"])])
            .await
            .unwrap();

        assert_eq!(summary, DerivationSummary { requests: 1, edges: 1 });
        assert_eq!(store.edges("MENTIONS"), vec![(1, 10)]);
    }

    #[tokio::test]
    async fn test_malformed_reference_fails_before_any_request() {
        let (store, schema) = setup().await;
        let deriver = EdgeDeriver::new(&store, &schema, 4);

        let err = deriver
            .derive_mentions(&[
                character(1, &["/api/episode/1"]),
                character(2, &["/api/episode/NaN"]),
            ])
            .await
            .unwrap_err();

        assert!(
            matches!(err, DerivationError::InvalidReference { ref owner, .. } if owner == "Character#2")
        );
        assert!(store.edge_requests().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_is_a_derivation_error() {
        let (store, schema) = setup().await;
        store.fail_on(FailOn::CreateEdges);
        let deriver = EdgeDeriver::new(&store, &schema, 4);

        let err = deriver
            .derive_visited(&[location(5, &["/api/character/1"])])
            .await
            .unwrap_err();
        assert!(matches!(err, DerivationError::Relate { ref target, .. } if target == "Location#5"));
    }
}
