//! Chunked market-data fetching through the rate governor.

mod catalog;
mod client;

pub use catalog::CatalogClient;
pub use client::{HttpDispatcher, MarketApiClient};

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future;
use serde_json::Value;
use tracing::debug;

use crate::domain::{ItemId, Server};
use crate::error::Result;
use crate::governor::{Dispatch, RateGovernor};
use crate::port::MarketFetcher;

/// Splits an item set into fixed-size batches, one governed dispatch per
/// batch, and reassembles the per-server listing map.
///
/// The first permanent dispatch failure aborts the whole call and propagates;
/// chunks that already completed are not rolled back (the downstream cache is
/// eventually consistent anyway).
pub struct ChunkFetcher<D: Dispatch<Output = Value>> {
    governor: Arc<RateGovernor<D>>,
    client: Arc<MarketApiClient>,
    chunk_size: usize,
}

impl<D: Dispatch<Output = Value>> ChunkFetcher<D> {
    #[must_use]
    pub fn new(
        governor: Arc<RateGovernor<D>>,
        client: Arc<MarketApiClient>,
        chunk_size: usize,
    ) -> Self {
        Self {
            governor,
            client,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Number of dispatches a fetch of `item_count` ids will issue.
    #[must_use]
    pub fn chunk_count(&self, item_count: usize) -> usize {
        item_count.div_ceil(self.chunk_size)
    }
}

#[async_trait]
impl<D: Dispatch<Output = Value>> MarketFetcher for ChunkFetcher<D> {
    async fn fetch(&self, server: &Server, items: &[ItemId]) -> Result<HashMap<ItemId, Value>> {
        let dispatches = items
            .chunks(self.chunk_size)
            .map(|chunk| self.governor.submit(self.client.listings_url(server, chunk)));

        // Fail-fast join: chunk completions interleave freely, but the caller
        // only proceeds once all settle or one fails permanently.
        let pages = future::try_join_all(dispatches).await?;

        let mut merged = HashMap::new();
        for page in pages {
            merge_page(&mut merged, page);
        }
        debug!(server = %server, items = merged.len(), "Merged chunk responses");
        Ok(merged)
    }
}

/// Fold one bulk response page into the per-server listing map.
///
/// A multi-id request answers with an `items` map; a single-id request
/// answers with the listing object itself.
fn merge_page(merged: &mut HashMap<ItemId, Value>, page: Value) {
    if let Some(items) = page.get("items").and_then(Value::as_object) {
        for (key, listing) in items {
            match key.parse::<u32>() {
                Ok(id) => {
                    merged.insert(ItemId(id), listing.clone());
                }
                Err(_) => debug!(key = %key, "Skipping non-numeric item key in page"),
            }
        }
        return;
    }

    if let Some(id) = page.get("itemID").and_then(Value::as_u64) {
        merged.insert(ItemId(id as u32), page);
    }
}
