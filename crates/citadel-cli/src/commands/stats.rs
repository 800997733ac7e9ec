use anyhow::{Context, Result};
use citadel_config::LoaderConfig;
use citadel_loader::schema::{
    CHARACTER_CLASS, EPISODE_CLASS, LOCATION_CLASS, MENTIONS_EDGE, VISITED_EDGE,
};
use citadel_loader::{GraphStore, ProvisioningError, StoreConnector};

const CLASSES: [&str; 5] = [
    CHARACTER_CLASS,
    EPISODE_CLASS,
    LOCATION_CLASS,
    MENTIONS_EDGE,
    VISITED_EDGE,
];

/// Read-only: a missing database is reported, never created.
pub async fn execute(config: LoaderConfig) -> Result<()> {
    let name = config.database.name.clone();
    let store = config
        .database
        .connect()
        .await
        .map_err(ProvisioningError::Connect)?;

    let counts = collect(store.as_ref(), &name).await;
    let closed = store.close().await;
    let counts = counts?;
    closed?;

    println!("Database: {} ({})", name, config.database.endpoint());
    match counts {
        Some(counts) => {
            for (class, count) in counts {
                println!("  {:<10} {:>8}", class, count);
            }
        }
        None => println!("  database not found"),
    }
    Ok(())
}

async fn collect(store: &dyn GraphStore, database: &str) -> Result<Option<Vec<(&'static str, u64)>>> {
    let databases = store
        .list_databases()
        .await
        .map_err(ProvisioningError::ListDatabases)?;
    if !databases.iter().any(|name| name == database) {
        return Ok(None);
    }
    store
        .use_database(database)
        .await
        .map_err(|source| ProvisioningError::OpenDatabase {
            name: database.to_string(),
            source,
        })?;

    let mut counts = Vec::with_capacity(CLASSES.len());
    for class in CLASSES {
        let count = store
            .count(class)
            .await
            .with_context(|| format!("failed to count {}", class))?;
        counts.push((class, count));
    }
    Ok(Some(counts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use citadel_config::StorageMode;
    use citadel_loader::graph::DatabaseSpec;
    use citadel_loader::test_utils::{RecordingGraphStore, StoreCall};
    use citadel_loader::SchemaProvisioner;

    #[tokio::test]
    async fn test_missing_database_is_not_created() {
        let store = RecordingGraphStore::new();

        let counts = collect(&store, "RickAndMorty").await.unwrap();

        assert!(counts.is_none());
        assert_eq!(
            store.count_calls(|c| matches!(c, StoreCall::CreateDatabase(_) | StoreCall::CreateClass(..))),
            0
        );
    }

    #[tokio::test]
    async fn test_counts_every_class_of_an_existing_database() {
        let store = RecordingGraphStore::new();
        SchemaProvisioner::new(&store)
            .provision(&DatabaseSpec::graph("RickAndMorty", StorageMode::Memory))
            .await
            .unwrap();

        let counts = collect(&store, "RickAndMorty").await.unwrap().unwrap();

        let classes: Vec<&str> = counts.iter().map(|(class, _)| *class).collect();
        assert_eq!(classes, CLASSES.to_vec());
        assert!(counts.iter().all(|(_, count)| *count == 0));
    }
}
