//! Collaborators the engine consumes but does not implement
//!
//! The item catalog supplies field content for indexing and answers the
//! lookups that cannot be served from the inverted index: literal phrase
//! matches, relational comparisons, and field-ordered id lists for sorting.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::fields::Field;
use crate::models::{FieldId, ItemId, ItemType, Logic};

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Backend error: {0}")]
    Failed(String),
    #[error("Operation not supported by backend: {0}")]
    Unsupported(&'static str),
}

/// Raw content of one field of one item
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldContent {
    #[default]
    None,
    Text(String),
    List(Vec<String>),
}

impl FieldContent {
    pub fn strings(&self) -> Vec<&str> {
        match self {
            FieldContent::None => Vec::new(),
            FieldContent::Text(text) => vec![text.as_str()],
            FieldContent::List(list) => list.iter().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for FieldContent {
    fn from(text: &str) -> Self {
        FieldContent::Text(text.to_string())
    }
}

impl From<String> for FieldContent {
    fn from(text: String) -> Self {
        FieldContent::Text(text)
    }
}

impl From<Vec<String>> for FieldContent {
    fn from(list: Vec<String>) -> Self {
        FieldContent::List(list)
    }
}

impl<T: Into<FieldContent>> From<Option<T>> for FieldContent {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

/// Relational operator of a comparison search.
///
/// The `@` family compares against a date range field as a whole: `@`
/// alone asks whether the range contains the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ComparisonOperator {
    StartsWith,
    EndsWith,
    Greater,
    GreaterOrEqual,
    Equal,
    LessOrEqual,
    Less,
    NotEqual,
    RangeContains,
    RangeGreater,
    RangeGreaterOrEqual,
    RangeEqual,
    RangeLessOrEqual,
    RangeLess,
    RangeNotEqual,
}

// Longest symbols first so ">=" wins over ">"
const OPERATORS: [(&str, ComparisonOperator); 15] = [
    ("@>=", ComparisonOperator::RangeGreaterOrEqual),
    ("@<=", ComparisonOperator::RangeLessOrEqual),
    ("@!=", ComparisonOperator::RangeNotEqual),
    ("@>", ComparisonOperator::RangeGreater),
    ("@<", ComparisonOperator::RangeLess),
    ("@=", ComparisonOperator::RangeEqual),
    (">=", ComparisonOperator::GreaterOrEqual),
    ("<=", ComparisonOperator::LessOrEqual),
    ("!=", ComparisonOperator::NotEqual),
    ("@", ComparisonOperator::RangeContains),
    ("^", ComparisonOperator::StartsWith),
    ("$", ComparisonOperator::EndsWith),
    (">", ComparisonOperator::Greater),
    ("<", ComparisonOperator::Less),
    ("=", ComparisonOperator::Equal),
];

impl ComparisonOperator {
    /// Split a leading operator off `text`, returning it and the trimmed value
    pub fn parse_prefix(text: &str) -> Option<(Self, &str)> {
        let text = text.trim_start();
        let (symbol, op) = OPERATORS
            .iter()
            .find(|(symbol, _)| text.starts_with(symbol))?;
        let value = text[symbol.len()..].trim();
        (!value.is_empty()).then_some((*op, value))
    }

    pub fn symbol(self) -> &'static str {
        OPERATORS
            .iter()
            .find(|(_, op)| *op == self)
            .map(|(symbol, _)| *symbol)
            .unwrap_or("=")
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// One comparison against one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonClause {
    pub field_id: FieldId,
    pub operator: ComparisonOperator,
    pub value: String,
}

pub trait SearchBackend {
    /// Raw content of a field, used when indexing
    fn field_content(&self, item_id: ItemId, field: &Field) -> Result<FieldContent, BackendError>;

    /// Items whose field literally contains the phrase
    fn search_field_for_phrase(&self, field: &Field, phrase: &str)
        -> Result<Vec<ItemId>, BackendError>;

    /// Items satisfying the comparison clauses, combined with `logic`
    fn search_fields_for_comparison_matches(
        &self,
        clauses: &[ComparisonClause],
        logic: Logic,
    ) -> Result<Vec<ItemId>, BackendError>;

    /// Ids of one item type ordered by a field. An empty list makes the
    /// ranker fall back to score order.
    fn item_ids_sorted_by_field(
        &self,
        _item_type: ItemType,
        _field: &Field,
        _descending: bool,
    ) -> Result<Vec<ItemId>, BackendError> {
        Ok(Vec::new())
    }

    /// Up to `limit` items with id >= `start_id`, ascending by id
    fn items_from(
        &self,
        _start_id: ItemId,
        _limit: usize,
    ) -> Result<Vec<(ItemId, ItemType)>, BackendError> {
        Err(BackendError::Unsupported("items_from"))
    }
}
