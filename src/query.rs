//! Query tree
//!
//! A [`SearchParameterSet`] is one node: its own field clauses combined with
//! its logic, plus nested subgroups combined with the same logic.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::models::{FieldId, ItemType, Logic, KEYWORD_FIELD_ID};

/// How to order one item type's results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortKey {
    /// Field to order by; `None` orders by relevance score
    pub field_id: Option<FieldId>,
    pub descending: bool,
}

impl SortKey {
    pub fn relevance() -> Self {
        Self {
            field_id: None,
            descending: true,
        }
    }

    pub fn by_field(field_id: FieldId, descending: bool) -> Self {
        Self {
            field_id: Some(field_id),
            descending,
        }
    }
}

impl Default for SortKey {
    fn default() -> Self {
        Self::relevance()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SortOrder {
    /// Same key for every item type
    Uniform(SortKey),
    /// Key per item type; unlisted types sort by relevance
    PerType(BTreeMap<ItemType, SortKey>),
}

impl SortOrder {
    pub fn key_for(&self, item_type: ItemType) -> SortKey {
        match self {
            SortOrder::Uniform(key) => *key,
            SortOrder::PerType(keys) => keys.get(&item_type).copied().unwrap_or_default(),
        }
    }
}

impl Default for SortOrder {
    fn default() -> Self {
        SortOrder::Uniform(SortKey::relevance())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchParameterSet {
    pub logic: Logic,
    /// Raw search strings per field
    pub fields: BTreeMap<FieldId, Vec<String>>,
    /// Strings searched against the keyword pseudo-field
    pub keywords: Vec<String>,
    pub subgroups: Vec<SearchParameterSet>,
    /// Only items of these types survive, when set
    pub item_types: Option<BTreeSet<ItemType>>,
    pub sort: SortOrder,
}

impl SearchParameterSet {
    pub fn new(logic: Logic) -> Self {
        Self {
            logic,
            ..Self::default()
        }
    }

    pub fn with_keywords(mut self, text: impl Into<String>) -> Self {
        self.keywords.push(text.into());
        self
    }

    pub fn with_field(mut self, field_id: FieldId, text: impl Into<String>) -> Self {
        self.fields.entry(field_id).or_default().push(text.into());
        self
    }

    pub fn with_subgroup(mut self, subgroup: SearchParameterSet) -> Self {
        self.subgroups.push(subgroup);
        self
    }

    pub fn restricted_to(mut self, item_types: impl IntoIterator<Item = ItemType>) -> Self {
        self.item_types = Some(item_types.into_iter().collect());
        self
    }

    pub fn sorted_by(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    /// This node's own clauses, keywords folded under the keyword field,
    /// strings trimmed and blanks dropped
    pub fn clauses(&self) -> Vec<(FieldId, Vec<String>)> {
        let keywords = (!self.keywords.is_empty()).then_some((KEYWORD_FIELD_ID, &self.keywords));
        keywords
            .into_iter()
            .chain(self.fields.iter().map(|(id, strings)| (*id, strings)))
            .filter_map(|(id, strings)| {
                let strings: Vec<String> = strings
                    .iter()
                    .map(|s| s.trim())
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
                (!strings.is_empty()).then_some((id, strings))
            })
            .collect()
    }

    /// No clause here or in any subgroup has text
    pub fn is_empty(&self) -> bool {
        self.clauses().is_empty() && self.subgroups.iter().all(SearchParameterSet::is_empty)
    }
}
