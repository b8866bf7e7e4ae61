//! Static game-item catalog.
//!
//! The catalog maps every marketable item to its acquisition sources and
//! crafting requirements. It is built once at startup from two upstream JSON
//! documents and shared read-only across all server updates for the process
//! lifetime.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Numeric game-item identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u32);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u32> for ItemId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Acquisition-source kind codes used by the catalog extracts document.
pub mod source_kind {
    pub const EXCLUDED: i64 = -1;
    pub const CRAFTING: i64 = 1;
    pub const TRADE: i64 = 2;
    pub const VENDOR: i64 = 3;
    pub const REDUCTION: i64 = 4;
    pub const GATHERING: i64 = 7;
}

/// One ingredient requirement of a crafting recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: ItemId,
    pub amount: u32,
}

/// One item's acquisition sources and crafting requirements.
///
/// The source payloads are kept as raw JSON: the updater only cares whether a
/// source exists, while the cache updater digs level and recipe details out
/// of the crafting payload.
#[derive(Debug, Clone, Default)]
pub struct CatalogEntry {
    pub id: ItemId,
    /// Crafting recipe references (`data` of the crafting source).
    pub crafting: Option<Value>,
    /// Gathering node references.
    pub gathering: Option<Value>,
    /// Vendor listings.
    pub vendors: Option<Value>,
    /// Trade/exchange listings.
    pub trades: Option<Value>,
    /// Aetherial-reduction style conversion references.
    pub reduction: Option<Value>,
    /// Ingredient list of the item's first crafting recipe.
    pub requirements: Option<Vec<Ingredient>>,
}

impl CatalogEntry {
    #[must_use]
    pub fn is_craftable(&self) -> bool {
        self.crafting.is_some()
    }

    #[must_use]
    pub fn is_gatherable(&self) -> bool {
        self.gathering.is_some()
    }
}

/// Immutable item catalog, keyed by globally unique item id.
#[derive(Debug, Default)]
pub struct ItemCatalog {
    entries: HashMap<ItemId, CatalogEntry>,
}

impl ItemCatalog {
    #[must_use]
    pub fn new(entries: HashMap<ItemId, CatalogEntry>) -> Self {
        Self { entries }
    }

    #[must_use]
    pub fn get(&self, id: ItemId) -> Option<&CatalogEntry> {
        self.entries.get(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ItemId, &CatalogEntry)> {
        self.entries.iter()
    }
}
