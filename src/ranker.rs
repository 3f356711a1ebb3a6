//! Filtering, type partitioning and ordering of scored results

use rusqlite::Connection;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::backend::SearchBackend;
use crate::config::SearchConfig;
use crate::error::Result;
use crate::fields::FieldRegistry;
use crate::models::{ItemId, ItemType, RankedItems, ScoreMap, TypedResults};
use crate::query::{SortKey, SortOrder};
use crate::type_cache::ItemTypeCache;

/// Caller predicate; returning true discards the item
pub type ResultFilter = Box<dyn Fn(ItemId) -> bool>;

/// Drop every item some filter rejects. Filters run in registration order
/// and stop at the first rejection.
pub fn apply_filters(scores: ScoreMap, filters: &[ResultFilter]) -> ScoreMap {
    if filters.is_empty() {
        return scores;
    }
    scores
        .into_iter()
        .filter(|(item, _)| !filters.iter().any(|reject| reject(*item)))
        .collect()
}

/// Order by score, ties broken by ascending item id
pub fn sort_by_score(scores: &ScoreMap, descending: bool) -> RankedItems {
    let mut ranked: RankedItems = scores.iter().map(|(item, score)| (*item, *score)).collect();
    ranked.sort_by(|(a_item, a_score), (b_item, b_score)| {
        let by_score = if descending {
            b_score.total_cmp(a_score)
        } else {
            a_score.total_cmp(b_score)
        };
        by_score.then_with(|| a_item.cmp(b_item))
    });
    ranked
}

/// Partition flat scores by item type. Items without a known type are left out.
pub fn build_multi_type_results(
    scores: &ScoreMap,
    types: &HashMap<ItemId, ItemType>,
) -> BTreeMap<ItemType, ScoreMap> {
    let mut partitions: BTreeMap<ItemType, ScoreMap> = BTreeMap::new();
    for (item, score) in scores {
        if let Some(item_type) = types.get(item) {
            partitions.entry(*item_type).or_default().insert(*item, *score);
        }
    }
    partitions
}

pub fn flatten_multi_type_results(partitions: &BTreeMap<ItemType, ScoreMap>) -> ScoreMap {
    partitions
        .values()
        .flat_map(|scores| scores.iter().map(|(item, score)| (*item, *score)))
        .collect()
}

/// Concatenate ranked partitions in item type order
pub fn flatten_ranked(results: &TypedResults) -> RankedItems {
    results.values().flatten().copied().collect()
}

/// Ranked results with the match count taken after filtering
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SortedResults {
    pub total: usize,
    pub by_type: TypedResults,
}

pub struct Ranker<'a> {
    pub(crate) conn: &'a Connection,
    pub(crate) registry: &'a FieldRegistry,
    pub(crate) backend: &'a dyn SearchBackend,
    pub(crate) config: &'a SearchConfig,
    pub(crate) type_cache: &'a mut ItemTypeCache,
    pub(crate) filters: &'a [ResultFilter],
}

impl<'a> Ranker<'a> {
    pub fn sort_scores(&mut self, scores: ScoreMap, sort: &SortOrder) -> Result<SortedResults> {
        let scores = apply_filters(scores, self.filters);
        let total = scores.len();

        let types = self
            .type_cache
            .types_for(self.conn, scores.keys(), self.config.max_batch_size)?;
        let partitions = build_multi_type_results(&scores, &types);
        if types.len() < total {
            log::debug!("{} results have no recorded item type", total - types.len());
        }

        let mut by_type = TypedResults::new();
        for (item_type, partition) in partitions {
            let ranked = self.sort_partition(item_type, &partition, sort.key_for(item_type))?;
            by_type.insert(item_type, ranked);
        }

        Ok(SortedResults { total, by_type })
    }

    fn sort_partition(
        &self,
        item_type: ItemType,
        partition: &ScoreMap,
        key: SortKey,
    ) -> Result<RankedItems> {
        let Some(field_id) = key.field_id else {
            return Ok(sort_by_score(partition, key.descending));
        };

        let Some(field) = self.registry.get(field_id) else {
            log::warn!("Cannot sort by unregistered field {}", field_id);
            return Ok(sort_by_score(partition, key.descending));
        };

        let ordered = self
            .backend
            .item_ids_sorted_by_field(item_type, field, key.descending)?;
        let mut seen = HashSet::new();
        let ranked: RankedItems = ordered
            .into_iter()
            .filter(|item| seen.insert(*item))
            .filter_map(|item| partition.get(&item).map(|score| (item, *score)))
            .collect();

        if ranked.is_empty() {
            log::debug!(
                "No ordering for type {} by field {}; sorting by score",
                item_type,
                field_id
            );
            return Ok(sort_by_score(partition, key.descending));
        }
        Ok(ranked)
    }
}
