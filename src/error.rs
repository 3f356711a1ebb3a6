use thiserror::Error;

use crate::backend::BackendError;
use crate::config::ConfigError;
use crate::db::connection::DbError;
use crate::db::lexicon::LexiconDbError;
use crate::db::occurrences::IndexDbError;
use crate::db::synonyms::SynonymDbError;
use crate::fields::FieldError;
use crate::synonyms::SynonymError;

/// Any failure surfaced by the engine.
///
/// Storage and backend errors pass through unchanged; the engine never
/// retries.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Database error: {0}")]
    DbError(#[from] DbError),
    #[error("Database connection error: {0}")]
    ConnectionError(#[from] r2d2::Error),
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),
    #[error("Lexicon error: {0}")]
    LexiconError(#[from] LexiconDbError),
    #[error("Index error: {0}")]
    IndexError(#[from] IndexDbError),
    #[error("Synonym storage error: {0}")]
    SynonymDbError(#[from] SynonymDbError),
    #[error("Synonym error: {0}")]
    SynonymError(#[from] SynonymError),
    #[error("Field error: {0}")]
    FieldError(#[from] FieldError),
    #[error("Configuration error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Backend error: {0}")]
    BackendError(#[from] BackendError),
}

pub type Result<T, E = SearchError> = std::result::Result<T, E>;
