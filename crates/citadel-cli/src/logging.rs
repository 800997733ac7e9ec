use crate::cli::LogLevel;
use tracing_subscriber::EnvFilter;

/// Resolve the level: `--log-level`, then `--verbose`, then the config value.
pub fn resolve_level(flag: Option<LogLevel>, verbose: bool, configured: &str) -> String {
    match (flag, verbose) {
        (Some(level), _) => level.directive().to_string(),
        (None, true) => "debug".to_string(),
        (None, false) => configured.to_string(),
    }
}

/// Filter for the citadel targets at `level`. `RUST_LOG` wins when set.
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("citadel_loader={},citadel_cli={}", level, level))
    })
}

/// Install the global subscriber. Logs go to stderr so stdout stays clean
/// for reports and `config` output.
pub fn init(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_writer(std::io::stderr)
        .init();
}
