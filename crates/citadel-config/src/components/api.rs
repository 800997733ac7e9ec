//! Upstream REST API configuration

use serde::{Deserialize, Serialize};

/// Where and how the paginated resources are fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL up to and including `/api`, e.g. `https://rickandmortyapi.com/api`
    pub base_url: String,
    /// Maximum number of pages requested at once after the first page
    pub page_concurrency: usize,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://rickandmortyapi.com/api".to_string(),
            page_concurrency: 4,
            timeout_secs: 30,
            user_agent: concat!("citadel/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}
