//! Entity loading: one vertex per fetched record.
//!
//! A projection picks the fields that are persisted on the vertex. Reference
//! lists (`episode` on characters, `residents` on locations) stay on the
//! in-memory records for edge derivation and are never written.

use crate::api::{Character, Episode, Location};
use crate::error::LoadError;
use crate::graph::{ClassHandle, GraphStore, Vertex, VertexWrite};
use futures::stream::{self, TryStreamExt};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::{debug, trace};

/// Character vertex: `id`, `name`, `species`.
pub fn project_character(character: &Character) -> Vertex {
    let mut fields = Map::new();
    fields.insert("name".into(), Value::from(character.name.clone()));
    fields.insert("species".into(), Value::from(character.species.clone()));
    Vertex {
        id: character.id,
        fields,
    }
}

/// Episode vertex: `id`, `name`, `episode` (the episode code).
pub fn project_episode(episode: &Episode) -> Vertex {
    let mut fields = Map::new();
    fields.insert("name".into(), Value::from(episode.name.clone()));
    fields.insert("episode".into(), Value::from(episode.episode.clone()));
    Vertex {
        id: episode.id,
        fields,
    }
}

/// Location vertex: `id`, `name`.
pub fn project_location(location: &Location) -> Vertex {
    let mut fields = Map::new();
    fields.insert("name".into(), Value::from(location.name.clone()));
    Vertex {
        id: location.id,
        fields,
    }
}

pub struct EntityLoader<'a> {
    store: &'a dyn GraphStore,
    mode: VertexWrite,
    concurrency: usize,
}

impl<'a> EntityLoader<'a> {
    pub fn new(store: &'a dyn GraphStore, mode: VertexWrite, concurrency: usize) -> Self {
        Self {
            store,
            mode,
            concurrency: concurrency.max(1),
        }
    }

    /// Write one vertex of `class` per record, returning the number written.
    ///
    /// Ids are checked for duplicates before anything is written, so no two
    /// writes in the batch ever target the same vertex. Writes then run with
    /// bounded concurrency and the first rejected write aborts the batch;
    /// writes already completed are not rolled back.
    pub async fn load_entities<R, P>(
        &self,
        class: &ClassHandle,
        records: &[R],
        projection: P,
    ) -> Result<usize, LoadError>
    where
        P: Fn(&R) -> Vertex,
    {
        let vertices: Vec<Vertex> = records.iter().map(projection).collect();

        let mut seen = HashSet::with_capacity(vertices.len());
        for vertex in &vertices {
            if !seen.insert(vertex.id) {
                return Err(LoadError::DuplicateId {
                    class: class.name.clone(),
                    id: vertex.id,
                });
            }
        }

        let store = self.store;
        let mode = self.mode;
        stream::iter(vertices.iter().map(Ok::<_, LoadError>))
            .try_for_each_concurrent(self.concurrency, |vertex| async move {
                store
                    .write_vertex(class, vertex, mode)
                    .await
                    .map_err(|source| LoadError::Create {
                        class: class.name.clone(),
                        id: vertex.id,
                        source,
                    })?;
                trace!("Created {}#{}", class.name, vertex.id);
                Ok::<(), LoadError>(())
            })
            .await?;

        debug!("Wrote {} {} vertices", vertices.len(), class.name);
        Ok(vertices.len())
    }

    /// Delete every instance of `class`.
    pub async fn clear(&self, class: &ClassHandle) -> Result<(), LoadError> {
        self.store
            .clear_class(class)
            .await
            .map_err(|source| LoadError::Clear {
                class: class.name.clone(),
                source,
            })?;
        debug!("Cleared class '{}'", class.name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ClassKind, DatabaseSpec};
    use crate::schema::SchemaProvisioner;
    use crate::test_utils::{FailOn, RecordingGraphStore, StoreCall};
    use citadel_config::StorageMode;
    use serde_json::json;

    fn rick() -> Character {
        Character {
            id: 1,
            name: "Rick".to_string(),
            species: "Human".to_string(),
            episode: vec!["/api/episode/1/".to_string()],
        }
    }

    async fn provisioned(store: &RecordingGraphStore) -> ClassHandle {
        let provisioner = SchemaProvisioner::new(store);
        let db = provisioner
            .ensure_database(&DatabaseSpec::graph("Test", StorageMode::Memory))
            .await
            .unwrap();
        provisioner
            .ensure_class(&db, ClassKind::Vertex, "Character")
            .await
            .unwrap()
    }

    #[test]
    fn test_character_projection_drops_references() {
        let vertex = project_character(&rick());
        assert_eq!(vertex.id, 1);
        assert_eq!(
            Value::Object(vertex.fields),
            json!({"name": "Rick", "species": "Human"})
        );
    }

    #[test]
    fn test_episode_and_location_projections() {
        let episode = project_episode(&Episode {
            id: 1,
            name: "Pilot".to_string(),
            episode: "S01E01".to_string(),
        });
        assert_eq!(
            Value::Object(episode.fields),
            json!({"name": "Pilot", "episode": "S01E01"})
        );

        let location = project_location(&Location {
            id: 3,
            name: "Citadel of Ricks".to_string(),
            residents: vec!["/api/character/1".to_string()],
        });
        assert_eq!(Value::Object(location.fields), json!({"name": "Citadel of Ricks"}));
    }

    #[tokio::test]
    async fn test_round_trip_keeps_only_projected_fields() {
        let store = RecordingGraphStore::new();
        let class = provisioned(&store).await;
        let loader = EntityLoader::new(&store, VertexWrite::Create, 4);

        let written = loader
            .load_entities(&class, &[rick()], project_character)
            .await
            .unwrap();
        assert_eq!(written, 1);

        let row = store.get_vertex("Character", 1).await.unwrap().unwrap();
        assert_eq!(
            Value::Object(row),
            json!({"id": 1, "name": "Rick", "species": "Human"})
        );
    }

    #[tokio::test]
    async fn test_duplicate_ids_abort_before_any_write() {
        let store = RecordingGraphStore::new();
        let class = provisioned(&store).await;
        let loader = EntityLoader::new(&store, VertexWrite::Create, 4);

        let err = loader
            .load_entities(&class, &[rick(), rick()], project_character)
            .await
            .unwrap_err();

        assert!(matches!(err, LoadError::DuplicateId { id: 1, .. }));
        assert_eq!(
            store.count_calls(|c| matches!(c, StoreCall::WriteVertex { .. })),
            0
        );
    }

    #[tokio::test]
    async fn test_rejected_write_fails_the_batch() {
        let store = RecordingGraphStore::new();
        let class = provisioned(&store).await;
        store.fail_on(FailOn::WriteVertex);
        let loader = EntityLoader::new(&store, VertexWrite::Create, 2);

        let err = loader
            .load_entities(&class, &[rick()], project_character)
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::Create { id: 1, .. }));
    }

    #[tokio::test]
    async fn test_create_rejects_existing_vertex_but_upsert_overwrites() {
        let store = RecordingGraphStore::new();
        let class = provisioned(&store).await;

        EntityLoader::new(&store, VertexWrite::Create, 1)
            .load_entities(&class, &[rick()], project_character)
            .await
            .unwrap();

        let err = EntityLoader::new(&store, VertexWrite::Create, 1)
            .load_entities(&class, &[rick()], project_character)
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::Create { .. }));

        let mut renamed = rick();
        renamed.name = "Rick Sanchez".to_string();
        EntityLoader::new(&store, VertexWrite::Upsert, 1)
            .load_entities(&class, &[renamed], project_character)
            .await
            .unwrap();
        let row = store.get_vertex("Character", 1).await.unwrap().unwrap();
        assert_eq!(row["name"], json!("Rick Sanchez"));
    }

    #[tokio::test]
    async fn test_empty_batch_writes_nothing() {
        let store = RecordingGraphStore::new();
        let class = provisioned(&store).await;
        let written = EntityLoader::new(&store, VertexWrite::Create, 4)
            .load_entities(&class, &[] as &[Character], project_character)
            .await
            .unwrap();
        assert_eq!(written, 0);
    }
}
