//! Stored profit-ranking records.
//!
//! These are the records the cache updater writes under `profit:<server>`
//! and the query API filters and ranks. The field names are part of the
//! stored JSON schema and must stay stable across writers and readers.

use serde::{Deserialize, Serialize};

use super::catalog::ItemId;

/// Profit estimates for one item on one server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfitEstimate {
    /// Revenue from selling at the cheapest current listing.
    pub c: i64,
    /// Revenue assuming the market absorbs fifty units.
    pub c50: i64,
}

/// One ranked profit record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfitRecord {
    pub id: ItemId,
    /// Item can be crafted.
    pub crafting: bool,
    /// Item can be gathered.
    pub gathering: bool,
    pub profit: ProfitEstimate,
    /// Acquisition cost (crafting ingredients at current prices).
    pub cost: i64,
    /// Estimated trailing 24h sales throughput.
    pub v24: f64,
    /// Cost/difficulty score of the item's dependency chain.
    pub complexity: u32,
    /// Job level requirements of the crafting recipe.
    #[serde(rename = "levelReqs")]
    pub level_reqs: Vec<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_stored_schema_names() {
        let record = ProfitRecord {
            id: ItemId(42),
            crafting: true,
            gathering: false,
            profit: ProfitEstimate { c: 1200, c50: 950 },
            cost: 400,
            v24: 18.5,
            complexity: 3,
            level_reqs: vec![80, 0],
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["profit"]["c"], 1200);
        assert_eq!(json["levelReqs"][0], 80);
        assert!(json.get("level_reqs").is_none());
    }

    #[test]
    fn round_trips_through_json() {
        let record = ProfitRecord {
            id: ItemId(7),
            v24: 4.25,
            ..Default::default()
        };
        let parsed: ProfitRecord =
            serde_json::from_str(&serde_json::to_string(&record).unwrap()).unwrap();
        assert_eq!(parsed, record);
    }
}
