use anyhow::Result;
use citadel_config::LoaderConfig;
use citadel_loader::{
    GraphStore, PipelineOptions, ProvisioningError, SchemaProvisioner, StoreConnector,
};

pub async fn execute(config: LoaderConfig) -> Result<()> {
    let options = PipelineOptions::from_config(&config);
    let store = config
        .database
        .connect()
        .await
        .map_err(ProvisioningError::Connect)?;

    let provisioned = SchemaProvisioner::new(store.as_ref())
        .provision(&options.database)
        .await;
    // Close even when provisioning failed; the provisioning error wins
    let closed = store.close().await;
    let schema = provisioned?;
    closed?;

    println!("database: {}", schema.database.name);
    for class in schema.vertex_classes().into_iter().chain(schema.edge_classes()) {
        println!("  {:<10} {}", class.name, class.kind);
    }
    Ok(())
}
