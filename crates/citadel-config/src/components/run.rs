//! Pipeline run configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What happens to vertices and edges left over from a previous run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Clear every vertex and edge class, then create from scratch.
    #[default]
    Fresh,
    /// Keep vertices and overwrite them by id; edges are still rebuilt.
    Upsert,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Fresh => f.write_str("fresh"),
            RunMode::Upsert => f.write_str("upsert"),
        }
    }
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fresh" => Ok(RunMode::Fresh),
            "upsert" => Ok(RunMode::Upsert),
            other => Err(format!("unknown run mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub mode: RunMode,
    /// Upper bound on vertex and edge writes in flight at once
    pub write_concurrency: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::Fresh,
            write_concurrency: 16,
        }
    }
}
