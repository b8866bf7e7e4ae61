//! Profit cache recomputation.
//!
//! Recomputes each server's full `profit:<server>` array from the raw
//! listing snapshots and the item catalog. The computation is a pure
//! function of those two inputs, so re-running it after an identical fetch
//! rewrites an identical array.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::{CatalogEntry, ItemCatalog, ItemId, ProfitEstimate, ProfitRecord, Server};
use crate::error::{Error, Result};
use crate::port::store::{keys, SnapshotStore};
use crate::port::CacheUpdater;

/// Units the fifty-unit revenue estimate assumes the market absorbs.
const ABSORPTION_UNITS: i64 = 50;

/// Recomputes ranked profit records from snapshots and the catalog.
#[derive(Default)]
pub struct ProfitCacheUpdater;

impl ProfitCacheUpdater {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    async fn recompute_server(
        &self,
        server: &Server,
        catalog: &ItemCatalog,
        store: &dyn SnapshotStore,
    ) -> Result<Vec<ProfitRecord>> {
        // Cheapest-listing prices first, so ingredient costs can be resolved
        // in a second pass without re-reading snapshots.
        let mut listings: HashMap<ItemId, MarketSummary> = HashMap::new();
        for (id, _) in catalog.iter() {
            let Some(raw) = store.get(&keys::snapshot(server, *id)).await? else {
                continue;
            };
            match serde_json::from_str::<Value>(&raw) {
                Ok(snapshot) => {
                    if let Some(summary) = MarketSummary::from_snapshot(&snapshot) {
                        listings.insert(*id, summary);
                    }
                }
                Err(err) => {
                    warn!(server = %server, item = id.0, error = %err, "Discarding unreadable snapshot");
                }
            }
        }

        let mut records: Vec<ProfitRecord> = catalog
            .iter()
            .filter_map(|(id, entry)| build_record(*id, entry, &listings))
            .collect();
        records.sort_by_key(|record| record.id.0);
        debug!(server = %server, records = records.len(), "Profit cache recomputed");
        Ok(records)
    }
}

#[async_trait]
impl CacheUpdater for ProfitCacheUpdater {
    async fn update(
        &self,
        servers: &[Server],
        catalog: &ItemCatalog,
        store: &dyn SnapshotStore,
    ) -> Result<()> {
        for server in servers {
            let records = self.recompute_server(server, catalog, store).await?;
            let payload = serde_json::to_string(&records)
                .map_err(|err| Error::CacheUpdate(err.to_string()))?;
            store.set(&keys::profit(server), payload).await?;
        }
        Ok(())
    }
}

/// Price and volume figures digested from one listing snapshot.
struct MarketSummary {
    cheapest: i64,
    absorbed_50: i64,
    velocity: f64,
}

impl MarketSummary {
    /// Digest a Universalis-style snapshot. Returns `None` for snapshots
    /// without a single priced listing.
    fn from_snapshot(snapshot: &Value) -> Option<Self> {
        let raw = snapshot.get("listings")?.as_array()?;
        let mut priced: Vec<(i64, i64)> = raw
            .iter()
            .filter_map(|listing| {
                let price = listing.get("pricePerUnit")?.as_i64()?;
                let quantity = listing.get("quantity").and_then(Value::as_i64).unwrap_or(1);
                (price > 0).then_some((price, quantity.max(1)))
            })
            .collect();
        if priced.is_empty() {
            return None;
        }
        priced.sort_unstable();

        // Walk listings cheapest-first until fifty units are covered; the
        // price of the listing that crosses the threshold is what a bulk
        // seller would have to undercut.
        let mut remaining = ABSORPTION_UNITS;
        let mut absorbed_50 = priced.last().map_or(0, |(price, _)| *price);
        for (price, quantity) in &priced {
            remaining -= quantity;
            if remaining <= 0 {
                absorbed_50 = *price;
                break;
            }
        }

        let velocity = snapshot
            .get("regularSaleVelocity")
            .and_then(Value::as_f64)
            .unwrap_or(0.0);

        Some(Self {
            cheapest: priced[0].0,
            absorbed_50,
            velocity,
        })
    }
}

fn build_record(
    id: ItemId,
    entry: &CatalogEntry,
    listings: &HashMap<ItemId, MarketSummary>,
) -> Option<ProfitRecord> {
    let summary = listings.get(&id)?;

    let (cost, complexity) = match &entry.requirements {
        Some(requirements) => {
            let mut cost = 0i64;
            for ingredient in requirements {
                // An unlisted ingredient contributes nothing; rare enough
                // that a partial cost beats dropping the record.
                if let Some(ingredient_market) = listings.get(&ingredient.id) {
                    cost += ingredient_market.cheapest * i64::from(ingredient.amount);
                }
            }
            (cost, requirements.len() as u32)
        }
        None => (0, 0),
    };

    Some(ProfitRecord {
        id,
        crafting: entry.is_craftable(),
        gathering: entry.is_gatherable(),
        profit: ProfitEstimate {
            c: summary.cheapest,
            c50: summary.absorbed_50,
        },
        cost,
        v24: summary.velocity,
        complexity,
        level_reqs: crafting_levels(entry),
    })
}

/// Job level requirements from the crafting source payload.
fn crafting_levels(entry: &CatalogEntry) -> Vec<u32> {
    let Some(crafting) = &entry.crafting else {
        return Vec::new();
    };
    let Some(recipes) = crafting.as_array() else {
        return Vec::new();
    };
    recipes
        .iter()
        .filter_map(|recipe| recipe.get("lvl").and_then(Value::as_u64))
        .map(|lvl| lvl as u32)
        .collect()
}
