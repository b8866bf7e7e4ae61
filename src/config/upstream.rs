//! Upstream endpoints and fetch chunking.

use serde::Deserialize;

/// Upstream market API and game-catalog endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the market aggregation API (bulk listings, marketable
    /// item ids).
    pub api_url: String,
    /// Server-list endpoint, fetched once at startup.
    pub server_list_url: String,
    /// Item acquisition-source document (catalog extracts).
    pub extracts_url: String,
    /// Crafting recipe document (ingredient lists).
    pub recipes_url: String,
    /// Item ids per bulk listing request. The upstream endpoint caps a call
    /// at 100 ids.
    pub chunk_size: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_url: "https://universalis.app/api".to_string(),
            server_list_url: "https://xivapi.com/servers".to_string(),
            extracts_url: "https://raw.githubusercontent.com/ffxiv-teamcraft/ffxiv-teamcraft/staging/libs/data/src/lib/extracts/extracts.json".to_string(),
            recipes_url: "https://raw.githubusercontent.com/ffxiv-teamcraft/ffxiv-teamcraft/staging/libs/data/src/lib/json/recipes.json".to_string(),
            chunk_size: 100,
        }
    }
}
