use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Identifier of an externally owned item
pub type ItemId = i64;

/// Integer enum naming the kind of an item
pub type ItemType = i64;

/// Identifier of a registered search field
pub type FieldId = i64;

/// Reserved pseudo-field aggregating every field marked `in_keyword_search`
pub const KEYWORD_FIELD_ID: FieldId = 0;

/// Relevance scores keyed by item
pub type ScoreMap = HashMap<ItemId, f64>;

/// Items of one type in ranked order
pub type RankedItems = Vec<(ItemId, f64)>;

/// Ranked results partitioned by item type
pub type TypedResults = BTreeMap<ItemType, RankedItems>;

/// Identifier of an indexed term.
///
/// Words and stems are numbered independently; the variant keeps the two id
/// spaces apart wherever they flow through the same scoring code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TermId {
    Word(i64),
    Stem(i64),
}

impl TermId {
    /// Value of the `term_kind` column for this id
    pub fn kind(self) -> i64 {
        match self {
            TermId::Word(_) => 0,
            TermId::Stem(_) => 1,
        }
    }

    pub fn id(self) -> i64 {
        match self {
            TermId::Word(id) | TermId::Stem(id) => id,
        }
    }
}

impl fmt::Display for TermId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TermId::Word(id) => write!(f, "word#{}", id),
            TermId::Stem(id) => write!(f, "stem#{}", id),
        }
    }
}

/// How the clauses of a query node combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Logic {
    #[default]
    And,
    Or,
}

/// Per-term marker derived from a leading `+`, `-` or `~`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TermState {
    /// Item must contain the term
    Required,
    /// Item must not contain the term
    Excluded,
    /// Term adds to the score when present
    Present,
}

impl TermState {
    pub fn is_inclusive(self) -> bool {
        !matches!(self, TermState::Excluded)
    }
}

/// Row counts of the search tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    pub words: i64,
    pub stems: i64,
    pub occurrences: i64,
    pub items: i64,
    pub synonym_edges: i64,
}
