//! Idempotent schema provisioning.
//!
//! Databases and classes are looked up first and only created when absent,
//! so provisioning can run on every load without duplicating anything.

use crate::error::ProvisioningError;
use crate::graph::{ClassHandle, ClassKind, DatabaseHandle, DatabaseSpec, GraphStore};
use tracing::{debug, info};

pub const CHARACTER_CLASS: &str = "Character";
pub const EPISODE_CLASS: &str = "Episode";
pub const LOCATION_CLASS: &str = "Location";
pub const MENTIONS_EDGE: &str = "MENTIONS";
pub const VISITED_EDGE: &str = "VISITED";

/// Handles to the five classes the loader writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphSchema {
    pub database: DatabaseHandle,
    pub character: ClassHandle,
    pub episode: ClassHandle,
    pub location: ClassHandle,
    /// Episode → Character
    pub mentions: ClassHandle,
    /// Character → Location
    pub visited: ClassHandle,
}

impl GraphSchema {
    pub fn vertex_classes(&self) -> [&ClassHandle; 3] {
        [&self.character, &self.episode, &self.location]
    }

    pub fn edge_classes(&self) -> [&ClassHandle; 2] {
        [&self.mentions, &self.visited]
    }
}

pub struct SchemaProvisioner<'a> {
    store: &'a dyn GraphStore,
}

impl<'a> SchemaProvisioner<'a> {
    pub fn new(store: &'a dyn GraphStore) -> Self {
        Self { store }
    }

    /// Return the database named by `spec`, creating it if it does not exist,
    /// and point the store's session at it.
    pub async fn ensure_database(
        &self,
        spec: &DatabaseSpec,
    ) -> Result<DatabaseHandle, ProvisioningError> {
        let databases = self
            .store
            .list_databases()
            .await
            .map_err(ProvisioningError::ListDatabases)?;

        if databases.iter().any(|name| name == &spec.name) {
            debug!("Database '{}' already exists", spec.name);
        } else {
            self.store
                .create_database(spec)
                .await
                .map_err(|source| ProvisioningError::CreateDatabase {
                    name: spec.name.clone(),
                    source,
                })?;
            info!(
                "Created {} database '{}' ({} storage)",
                spec.db_type, spec.name, spec.storage
            );
        }

        self.store
            .use_database(&spec.name)
            .await
            .map_err(|source| ProvisioningError::OpenDatabase {
                name: spec.name.clone(),
                source,
            })?;

        Ok(DatabaseHandle {
            name: spec.name.clone(),
        })
    }

    /// Return the class `name` in `database`, creating it with `kind` if absent.
    ///
    /// A class that exists with the other kind is an error rather than
    /// being silently reused.
    pub async fn ensure_class(
        &self,
        database: &DatabaseHandle,
        kind: ClassKind,
        name: &str,
    ) -> Result<ClassHandle, ProvisioningError> {
        let classes = self
            .store
            .list_classes()
            .await
            .map_err(ProvisioningError::ListClasses)?;

        match classes.iter().find(|class| class.name == name) {
            Some(existing) if existing.kind != kind => {
                return Err(ProvisioningError::KindMismatch {
                    name: name.to_string(),
                    expected: kind,
                    found: existing.kind,
                });
            }
            Some(_) => debug!("Class '{}:{}' already exists in '{}'", kind, name, database.name),
            None => {
                self.store
                    .create_class(name, kind)
                    .await
                    .map_err(|source| ProvisioningError::CreateClass {
                        name: name.to_string(),
                        kind,
                        source,
                    })?;
                info!("Created class '{}:{}' in '{}'", kind, name, database.name);
            }
        }

        Ok(ClassHandle {
            name: name.to_string(),
            kind,
        })
    }

    /// Ensure the database and all five classes.
    ///
    /// Classes are provisioned one after another: they share the session and
    /// each lookup must see the previous creation.
    pub async fn provision(&self, spec: &DatabaseSpec) -> Result<GraphSchema, ProvisioningError> {
        let database = self.ensure_database(spec).await?;

        let character = self
            .ensure_class(&database, ClassKind::Vertex, CHARACTER_CLASS)
            .await?;
        let episode = self
            .ensure_class(&database, ClassKind::Vertex, EPISODE_CLASS)
            .await?;
        let location = self
            .ensure_class(&database, ClassKind::Vertex, LOCATION_CLASS)
            .await?;
        let mentions = self
            .ensure_class(&database, ClassKind::Edge, MENTIONS_EDGE)
            .await?;
        let visited = self
            .ensure_class(&database, ClassKind::Edge, VISITED_EDGE)
            .await?;

        Ok(GraphSchema {
            database,
            character,
            episode,
            location,
            mentions,
            visited,
        })
    }
}
