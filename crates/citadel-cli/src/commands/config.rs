use anyhow::Result;
use citadel_config::LoaderConfig;

pub fn execute(config: &LoaderConfig) -> Result<()> {
    print!("{}", config.to_masked_toml()?);
    Ok(())
}
