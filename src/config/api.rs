//! Query API server configuration.

use serde::Deserialize;

/// Configuration for the read-only HTTP query API.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Serve the query API alongside the updater.
    pub enabled: bool,
    /// Listen address.
    pub bind_addr: String,
    /// Maximum ranked results returned per query.
    pub result_limit: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_addr: "0.0.0.0:8080".to_string(),
            result_limit: 20,
        }
    }
}
