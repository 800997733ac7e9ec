//! Graph database connection configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the graph database stores its data.
///
/// `Remote` talks to a running server over WebSocket and signs in as root.
/// `Memory` runs an embedded in-memory engine, which is what the tests use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    #[default]
    Remote,
    Memory,
}

impl StorageMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageMode::Remote => "remote",
            StorageMode::Memory => "memory",
        }
    }
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "remote" => Ok(StorageMode::Remote),
            "memory" | "mem" => Ok(StorageMode::Memory),
            other => Err(format!("unknown storage mode '{}'", other)),
        }
    }
}

/// Connection parameters for the graph database.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Namespace that holds the loader's database
    pub namespace: String,
    /// Database the vertices and edges are written to
    pub name: String,
    pub storage: StorageMode,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 2424,
            username: "root".to_string(),
            password: "rootpwd".to_string(),
            namespace: "citadel".to_string(),
            name: "RickAndMorty".to_string(),
            storage: StorageMode::Remote,
        }
    }
}

impl DatabaseConfig {
    /// In-memory database, used by tests and dry runs.
    pub fn memory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            storage: StorageMode::Memory,
            ..Self::default()
        }
    }

    /// Engine endpoint for the configured storage mode.
    pub fn endpoint(&self) -> String {
        match self.storage {
            StorageMode::Remote => format!("ws://{}:{}", self.host, self.port),
            StorageMode::Memory => "mem://".to_string(),
        }
    }
}

// Hand-written so the password never ends up in logs
impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .field("namespace", &self.namespace)
            .field("name", &self.name)
            .field("storage", &self.storage)
            .finish()
    }
}
