//! Field-weighted relevance search over a SQLite inverted index.
//!
//! Items from an external catalog are indexed per field into word and stem
//! occurrence counts. Queries are trees of per-field search strings with
//! And/Or logic and `+`/`-`/`~` term flags; results are scored by field
//! weight, widened through synonyms and stems, and ranked per item type.

pub mod backend;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod fields;
pub mod indexer;
pub mod lexicon;
pub mod models;
pub mod normalizer;
pub mod query;
pub mod ranker;
pub mod stemmer;
pub mod synonyms;
pub mod type_cache;

pub use backend::{BackendError, ComparisonClause, ComparisonOperator, FieldContent, SearchBackend};
pub use config::SearchConfig;
pub use db::connection::{init_memory_pool, init_pool_at_path, DbPool};
pub use engine::SearchEngine;
pub use error::{Result, SearchError};
pub use evaluator::SearchTerm;
pub use normalizer::TermTally;
pub use fields::{Field, FieldRegistry, FieldType};
pub use models::{
    FieldId, IndexStats, ItemId, ItemType, Logic, RankedItems, ScoreMap, TermState, TypedResults,
    KEYWORD_FIELD_ID,
};
pub use query::{SearchParameterSet, SortKey, SortOrder};
pub use ranker::{build_multi_type_results, flatten_multi_type_results, ResultFilter};
