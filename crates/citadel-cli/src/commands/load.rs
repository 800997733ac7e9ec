use anyhow::{Context, Result};
use citadel_config::{LoaderConfig, RunMode};
use citadel_loader::{Pipeline, PipelineOptions, ResourceFetcher};
use tracing::info;

pub async fn execute(config: LoaderConfig, mode: Option<RunMode>) -> Result<()> {
    let mut options = PipelineOptions::from_config(&config);
    if let Some(mode) = mode {
        options.mode = mode;
    }

    let fetcher = ResourceFetcher::from_config(&config.api).context("failed to build HTTP client")?;

    info!(
        "Loading {} into database '{}' at {} ({} mode)",
        config.api.base_url,
        options.database.name,
        config.database.endpoint(),
        options.mode
    );
    // The pipeline connects during provisioning
    let mut pipeline = Pipeline::new(config.database, fetcher, options);
    let report = pipeline.run().await?;

    println!("{}", report);
    Ok(())
}
