//! # Citadel Configuration
//!
//! Typed configuration for the citadel loader.
//!
//! Configuration is resolved in three layers, later layers winning:
//!
//! 1. Built-in defaults (`localhost:2424`, `root`/`rootpwd`, fresh-load mode)
//! 2. An optional TOML file
//! 3. `CITADEL_*` environment variables, each overriding one field
//!
//! ```rust,no_run
//! use citadel_config::LoaderConfig;
//!
//! let config = LoaderConfig::load(None).expect("configuration");
//! println!("{}", config.database.endpoint());
//! ```

#![warn(clippy::all)]

mod components;

pub use components::*;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const ENV_DB_HOST: &str = "CITADEL_DB_HOST";
pub const ENV_DB_PORT: &str = "CITADEL_DB_PORT";
pub const ENV_DB_USERNAME: &str = "CITADEL_DB_USERNAME";
pub const ENV_DB_PASSWORD: &str = "CITADEL_DB_PASSWORD";
pub const ENV_DB_NAMESPACE: &str = "CITADEL_DB_NAMESPACE";
pub const ENV_DB_NAME: &str = "CITADEL_DB_NAME";
pub const ENV_DB_STORAGE: &str = "CITADEL_DB_STORAGE";
pub const ENV_API_URL: &str = "CITADEL_API_URL";
pub const ENV_RUN_MODE: &str = "CITADEL_RUN_MODE";
pub const ENV_LOG_LEVEL: &str = "CITADEL_LOG_LEVEL";

/// Errors raised while resolving configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {var}: {message}")]
    InvalidEnv { var: &'static str, message: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level loader configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub run: RunConfig,
    pub logging: LoggingConfig,
}

impl LoaderConfig {
    /// Resolve configuration from defaults, an optional file and the process environment.
    ///
    /// An explicitly given file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file. Missing sections fall back to their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Apply `CITADEL_*` overrides using `lookup` to read variables.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(ENV_DB_HOST) {
            self.database.host = host;
        }
        if let Some(port) = lookup(ENV_DB_PORT) {
            self.database.port = port.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: ENV_DB_PORT,
                message: format!("'{}' is not a port number", port),
            })?;
        }
        if let Some(username) = lookup(ENV_DB_USERNAME) {
            self.database.username = username;
        }
        if let Some(password) = lookup(ENV_DB_PASSWORD) {
            self.database.password = password;
        }
        if let Some(namespace) = lookup(ENV_DB_NAMESPACE) {
            self.database.namespace = namespace;
        }
        if let Some(name) = lookup(ENV_DB_NAME) {
            self.database.name = name;
        }
        if let Some(storage) = lookup(ENV_DB_STORAGE) {
            self.database.storage = storage
                .parse()
                .map_err(|message| ConfigError::InvalidEnv {
                    var: ENV_DB_STORAGE,
                    message,
                })?;
        }
        if let Some(url) = lookup(ENV_API_URL) {
            self.api.base_url = url;
        }
        if let Some(mode) = lookup(ENV_RUN_MODE) {
            self.run.mode = mode.parse().map_err(|message| ConfigError::InvalidEnv {
                var: ENV_RUN_MODE,
                message,
            })?;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.logging.level = level;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("api.base_url must not be empty".into()));
        }
        if self.api.page_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "api.page_concurrency must be at least 1".into(),
            ));
        }
        if self.run.write_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "run.write_concurrency must be at least 1".into(),
            ));
        }
        if self.database.storage == StorageMode::Remote && self.database.host.trim().is_empty() {
            return Err(ConfigError::Invalid("database.host must not be empty".into()));
        }
        for (field, value) in [
            ("database.namespace", &self.database.namespace),
            ("database.name", &self.database.name),
        ] {
            if !is_identifier(value) {
                return Err(ConfigError::Invalid(format!(
                    "{} '{}' must start with a letter or '_' and contain only letters, digits and '_'",
                    field, value
                )));
            }
        }
        Ok(())
    }

    /// Render as TOML with the password masked.
    pub fn to_masked_toml(&self) -> Result<String, ConfigError> {
        let mut masked = self.clone();
        masked.database.password = "***".to_string();
        toml::to_string_pretty(&masked)
            .map_err(|e| ConfigError::Invalid(format!("failed to render configuration: {}", e)))
    }
}

/// True for names that can be interpolated into a query as a bare identifier.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_each_connection_field_overrides_independently() {
        let mut config = LoaderConfig::default();
        config
            .apply_overrides(lookup_from(&[(ENV_DB_HOST, "graph.internal")]))
            .unwrap();

        assert_eq!(config.database.host, "graph.internal");
        assert_eq!(config.database.port, 2424);
        assert_eq!(config.database.username, "root");
        assert_eq!(config.database.password, "rootpwd");
    }

    #[test]
    fn test_all_overrides_applied() {
        let mut config = LoaderConfig::default();
        config
            .apply_overrides(lookup_from(&[
                (ENV_DB_PORT, "8000"),
                (ENV_DB_USERNAME, "admin"),
                (ENV_DB_PASSWORD, "s3cret"),
                (ENV_DB_STORAGE, "memory"),
                (ENV_API_URL, "http://127.0.0.1:9999/api"),
                (ENV_RUN_MODE, "upsert"),
                (ENV_LOG_LEVEL, "debug"),
            ]))
            .unwrap();

        assert_eq!(config.database.port, 8000);
        assert_eq!(config.database.username, "admin");
        assert_eq!(config.database.password, "s3cret");
        assert_eq!(config.database.storage, StorageMode::Memory);
        assert_eq!(config.api.base_url, "http://127.0.0.1:9999/api");
        assert_eq!(config.run.mode, RunMode::Upsert);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let mut config = LoaderConfig::default();
        let err = config
            .apply_overrides(lookup_from(&[(ENV_DB_PORT, "twenty")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { var, .. } if var == ENV_DB_PORT));
    }

    #[test]
    fn test_invalid_run_mode_is_rejected() {
        let mut config = LoaderConfig::default();
        let err = config
            .apply_overrides(lookup_from(&[(ENV_RUN_MODE, "merge")]))
            .unwrap_err();
        assert!(err.to_string().contains("merge"));
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let mut config = LoaderConfig::default();
        config.api.page_concurrency = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_non_identifier_database_name() {
        let mut config = LoaderConfig::default();
        config.database.name = "Rick and Morty".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("RickAndMorty"));
        assert!(is_identifier("_private1"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("1abc"));
        assert!(!is_identifier("drop;table"));
    }

    #[test]
    fn test_masked_toml_hides_password() {
        let rendered = LoaderConfig::default().to_masked_toml().unwrap();
        assert!(rendered.contains("[database]"));
        assert!(!rendered.contains("rootpwd"));
    }
}
