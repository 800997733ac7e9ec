use anyhow::Result;
use clap::Parser;
use tracing::debug;

use citadel_cli::{
    cli::{Cli, Commands},
    commands, logging,
};
use citadel_config::LoaderConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config first: the log level may come from it
    let config = LoaderConfig::load(cli.config.as_deref())?;

    let level = logging::resolve_level(cli.log_level, cli.verbose, &config.logging.level);
    logging::init(&level);
    debug!("Using configuration {:?}", config);

    match cli.command {
        Commands::Load { mode } => commands::load::execute(config, mode.map(Into::into)).await?,
        Commands::Provision => commands::provision::execute(config).await?,
        Commands::Stats => commands::stats::execute(config).await?,
        Commands::Config => commands::config::execute(&config)?,
    }

    Ok(())
}
