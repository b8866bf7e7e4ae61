//! Catalog provider: builds the immutable item catalog at startup.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::config::UpstreamConfig;
use crate::domain::catalog::{source_kind, CatalogEntry, Ingredient, ItemCatalog, ItemId};
use crate::error::{Result, UpstreamError};

/// One item entry of the extracts document.
#[derive(Debug, Deserialize)]
struct ExtractEntry {
    id: u32,
    #[serde(default)]
    sources: Vec<ExtractSource>,
}

/// One acquisition source: a kind code plus a kind-specific payload.
#[derive(Debug, Deserialize)]
struct ExtractSource {
    #[serde(rename = "type")]
    kind: i64,
    #[serde(default)]
    data: Value,
}

/// One recipe of the recipes document.
#[derive(Debug, Deserialize)]
struct RecipeEntry {
    id: Value,
    #[serde(default)]
    ingredients: Vec<Ingredient>,
}

/// Fetches the extracts and recipes documents and builds the [`ItemCatalog`].
///
/// These are static game-data documents on a separate host, fetched once at
/// startup outside the rate governor.
pub struct CatalogClient {
    http: reqwest::Client,
    config: UpstreamConfig,
}

impl CatalogClient {
    #[must_use]
    pub fn new(http: reqwest::Client, config: UpstreamConfig) -> Self {
        Self { http, config }
    }

    /// Build the catalog from the two upstream documents.
    pub async fn load(&self) -> Result<ItemCatalog> {
        let extracts: HashMap<String, ExtractEntry> =
            self.get_json(&self.config.extracts_url).await?;
        let recipes: Vec<RecipeEntry> = self.get_json(&self.config.recipes_url).await?;
        Ok(build_catalog(extracts.into_values(), &recipes))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.http.get(url).send().await.map_err(UpstreamError::from)?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            }
            .into());
        }
        response
            .json::<T>()
            .await
            .map_err(|err| UpstreamError::Payload(err.to_string()).into())
    }
}

/// Assemble catalog entries, skipping items carrying the excluded source kind
/// and resolving each craftable item's first recipe to its ingredient list.
fn build_catalog(
    extracts: impl IntoIterator<Item = ExtractEntry>,
    recipes: &[RecipeEntry],
) -> ItemCatalog {
    let mut entries = HashMap::new();

    for extract in extracts {
        if extract
            .sources
            .iter()
            .any(|source| source.kind == source_kind::EXCLUDED)
        {
            continue;
        }

        let source_data = |kind: i64| -> Option<Value> {
            extract
                .sources
                .iter()
                .find(|source| source.kind == kind)
                .map(|source| source.data.clone())
                .filter(|data| !data.is_null())
        };

        let crafting = source_data(source_kind::CRAFTING);
        let requirements = crafting
            .as_ref()
            .and_then(first_recipe_id)
            .and_then(|recipe_id| {
                recipes
                    .iter()
                    .find(|recipe| value_as_id_string(&recipe.id) == recipe_id)
                    .map(|recipe| recipe.ingredients.clone())
            });

        let id = ItemId(extract.id);
        entries.insert(
            id,
            CatalogEntry {
                id,
                crafting,
                gathering: source_data(source_kind::GATHERING),
                vendors: source_data(source_kind::VENDOR),
                trades: source_data(source_kind::TRADE),
                reduction: source_data(source_kind::REDUCTION),
                requirements,
            },
        );
    }

    ItemCatalog::new(entries)
}

/// Recipe id of the first crafting reference, stringified for comparison
/// (the documents mix numeric and string ids).
fn first_recipe_id(crafting: &Value) -> Option<String> {
    crafting
        .as_array()
        .and_then(|refs| refs.first())
        .and_then(|first| first.get("id"))
        .map(value_as_id_string)
}

fn value_as_id_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
