//! Word and stem tables
//!
//! Insert-if-absent relies on the UNIQUE text columns, so two indexers
//! creating the same term concurrently both end up with the same id.

use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

use crate::models::TermId;

#[derive(Error, Debug)]
pub enum LexiconDbError {
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),
    #[error("Term could not be created: {0}")]
    NotCreated(String),
}

/// Find the id of a word
pub fn find_word_id(conn: &Connection, word: &str) -> Result<Option<i64>, LexiconDbError> {
    let id = conn
        .query_row(
            "SELECT id FROM search_words WHERE word = ?1",
            params![word],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

/// Find the id of a stem
pub fn find_stem_id(conn: &Connection, stem: &str) -> Result<Option<i64>, LexiconDbError> {
    let id = conn
        .query_row(
            "SELECT id FROM search_stems WHERE stem = ?1",
            params![stem],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

/// Find or create a word, returning its id
pub fn find_or_create_word(conn: &Connection, word: &str) -> Result<i64, LexiconDbError> {
    conn.execute(
        "INSERT INTO search_words (word) VALUES (?1) ON CONFLICT(word) DO NOTHING",
        params![word],
    )?;
    find_word_id(conn, word)?.ok_or_else(|| LexiconDbError::NotCreated(word.to_string()))
}

/// Find or create a stem, returning its id
pub fn find_or_create_stem(conn: &Connection, stem: &str) -> Result<i64, LexiconDbError> {
    conn.execute(
        "INSERT INTO search_stems (stem) VALUES (?1) ON CONFLICT(stem) DO NOTHING",
        params![stem],
    )?;
    find_stem_id(conn, stem)?.ok_or_else(|| LexiconDbError::NotCreated(stem.to_string()))
}

/// Get the text stored for a term id
pub fn get_term_text(conn: &Connection, term: TermId) -> Result<Option<String>, LexiconDbError> {
    let sql = match term {
        TermId::Word(_) => "SELECT word FROM search_words WHERE id = ?1",
        TermId::Stem(_) => "SELECT stem FROM search_stems WHERE id = ?1",
    };
    let text = conn
        .query_row(sql, params![term.id()], |row| row.get(0))
        .optional()?;
    Ok(text)
}

/// Count rows in the word and stem tables
pub fn count_terms(conn: &Connection) -> Result<(i64, i64), LexiconDbError> {
    let words: i64 = conn.query_row("SELECT COUNT(*) FROM search_words", [], |row| row.get(0))?;
    let stems: i64 = conn.query_row("SELECT COUNT(*) FROM search_stems", [], |row| row.get(0))?;
    Ok((words, stems))
}
