//! Filtering and ranking of stored profit records.
//!
//! Pure functions over the deserialized `profit:<server>` array; the HTTP
//! layer only parses parameters and serializes the result.

use serde::Deserialize;

use crate::domain::ProfitRecord;

/// Records priced above this are treated as market noise and excluded.
const PRICE_CEILING: i64 = 99_999_999;

fn default_max_complexity() -> u32 {
    u32::MAX
}

/// Items selling slower than this per day are noise for most players.
fn default_min_velocity() -> f64 {
    10.0
}

/// Parameters of a crafting profitability query.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CraftingQuery {
    pub server: String,
    #[serde(default = "default_max_complexity")]
    pub max_complexity: u32,
    #[serde(default = "default_min_velocity")]
    pub min_velocity: f64,
    /// Rank by margin after ingredient costs are zeroed out, for players who
    /// gather their own materials.
    #[serde(default)]
    pub self_sufficient: bool,
    /// Comma-separated crafting job levels, positionally matched against
    /// each recipe's level requirements.
    #[serde(default)]
    pub levels: Option<String>,
}

impl CraftingQuery {
    #[must_use]
    pub fn parsed_levels(&self) -> Vec<u32> {
        self.levels
            .as_deref()
            .unwrap_or("")
            .split(',')
            .filter_map(|part| part.trim().parse().ok())
            .collect()
    }
}

/// Parameters of a gathering profitability query.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatheringQuery {
    pub server: String,
    #[serde(default = "default_min_velocity")]
    pub min_velocity: f64,
}

/// Rank craftable items by expected margin, best first.
#[must_use]
pub fn rank_crafting(
    records: &[ProfitRecord],
    query: &CraftingQuery,
    limit: usize,
) -> Vec<ProfitRecord> {
    let levels = query.parsed_levels();
    let mut matched: Vec<&ProfitRecord> = records
        .iter()
        .filter(|record| {
            record.crafting
                && record.profit.c < PRICE_CEILING
                && record.complexity < query.max_complexity
                && record.v24 > query.min_velocity
                && (!query.self_sufficient || levels_satisfied(&record.level_reqs, &levels))
        })
        .collect();

    let score = |record: &ProfitRecord| -> f64 {
        if query.self_sufficient {
            (record.profit.c - i64::from(record.complexity) * 10) as f64 * record.v24
        } else {
            (record.profit.c - record.cost) as f64 * record.v24 / 4.0
        }
    };
    matched.sort_by(|a, b| score(b).total_cmp(&score(a)));
    matched.into_iter().take(limit).cloned().collect()
}

/// Rank gatherable items by bulk-sale margin, best first.
#[must_use]
pub fn rank_gathering(
    records: &[ProfitRecord],
    query: &GatheringQuery,
    limit: usize,
) -> Vec<ProfitRecord> {
    let mut matched: Vec<&ProfitRecord> = records
        .iter()
        .filter(|record| {
            record.gathering && record.profit.c < PRICE_CEILING && record.v24 > query.min_velocity
        })
        .collect();

    let score = |record: &ProfitRecord| -> f64 { record.profit.c50 as f64 * record.v24 / 2.0 };
    matched.sort_by(|a, b| score(b).total_cmp(&score(a)));
    matched.into_iter().take(limit).cloned().collect()
}

fn levels_satisfied(requirements: &[u32], levels: &[u32]) -> bool {
    requirements
        .iter()
        .enumerate()
        .all(|(i, req)| levels.get(i).copied().unwrap_or(0) >= *req)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ItemId, ProfitEstimate};

    fn record(id: u32) -> ProfitRecord {
        ProfitRecord {
            id: ItemId(id),
            crafting: true,
            gathering: true,
            profit: ProfitEstimate { c: 1000, c50: 800 },
            cost: 200,
            v24: 10.0,
            complexity: 2,
            level_reqs: vec![50],
        }
    }

    fn query(server: &str) -> CraftingQuery {
        CraftingQuery {
            server: server.to_string(),
            max_complexity: default_max_complexity(),
            min_velocity: 0.0,
            self_sufficient: false,
            levels: None,
        }
    }

    #[test]
    fn queries_default_to_a_minimum_velocity_of_ten() {
        let crafting: CraftingQuery =
            serde_json::from_value(serde_json::json!({ "server": "Cactuar" })).unwrap();
        assert!((crafting.min_velocity - 10.0).abs() < f64::EPSILON);

        let gathering: GatheringQuery =
            serde_json::from_value(serde_json::json!({ "server": "Cactuar" })).unwrap();
        assert!((gathering.min_velocity - 10.0).abs() < f64::EPSILON);

        let slow = ProfitRecord {
            v24: 5.0,
            ..record(1)
        };
        let brisk = ProfitRecord {
            v24: 12.0,
            ..record(2)
        };
        let ranked = rank_crafting(&[slow, brisk], &crafting, 20);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].id, ItemId(2));
    }

    #[test]
    fn crafting_ranks_by_margin_times_velocity() {
        let mut fast_seller = record(1);
        fast_seller.v24 = 50.0;
        let mut wide_margin = record(2);
        wide_margin.profit.c = 5000;

        let ranked = rank_crafting(&[fast_seller, wide_margin], &query("Cactuar"), 20);
        // (5000 - 200) * 10 beats (1000 - 200) * 50.
        assert_eq!(ranked[0].id, ItemId(2));
        assert_eq!(ranked[1].id, ItemId(1));
    }

    #[test]
    fn crafting_excludes_price_ceiling_and_complexity() {
        let mut absurd = record(1);
        absurd.profit.c = PRICE_CEILING;
        let mut deep = record(2);
        deep.complexity = 9;
        let ok = record(3);

        let mut q = query("Cactuar");
        q.max_complexity = 5;
        let ranked = rank_crafting(&[absurd, deep, ok], &q, 20);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].id, ItemId(3));
    }

    #[test]
    fn self_sufficient_requires_matching_levels() {
        let mut out_of_reach = record(1);
        out_of_reach.level_reqs = vec![90];
        let reachable = record(2);

        let mut q = query("Cactuar");
        q.self_sufficient = true;
        q.levels = Some("60".to_string());
        let ranked = rank_crafting(&[out_of_reach, reachable], &q, 20);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].id, ItemId(2));
    }

    #[test]
    fn gathering_uses_bulk_price_and_velocity() {
        let mut not_gatherable = record(1);
        not_gatherable.gathering = false;
        let mut slow = record(2);
        slow.v24 = 0.5;
        let bulk = record(3);

        let q = GatheringQuery {
            server: "Cactuar".to_string(),
            min_velocity: 1.0,
        };
        let ranked = rank_gathering(&[not_gatherable, slow, bulk], &q, 20);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].id, ItemId(3));
    }

    #[test]
    fn limit_truncates_after_sorting() {
        let records: Vec<ProfitRecord> = (1..=5)
            .map(|id| {
                let mut r = record(id);
                r.profit.c = 1000 + i64::from(id) * 100;
                r
            })
            .collect();
        let ranked = rank_crafting(&records, &query("Cactuar"), 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].id, ItemId(5));
    }
}
