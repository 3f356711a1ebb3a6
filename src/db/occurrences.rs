//! Weighted inverted index rows
//!
//! One row per (term, item, field). Counts only ever grow through
//! `add_occurrence`; re-indexing an item deletes its rows first.

use rusqlite::{params, Connection, Row};
use thiserror::Error;

use crate::models::{FieldId, ItemId, TermId};

#[derive(Error, Debug)]
pub enum IndexDbError {
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),
    #[error("Unknown term kind {0} in index")]
    UnknownTermKind(i64),
}

/// One weighted-count row of the index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    pub term: TermId,
    pub item_id: ItemId,
    pub field_id: FieldId,
    pub count: i64,
}

fn row_to_occurrence(row: &Row) -> Result<(i64, Occurrence), rusqlite::Error> {
    let kind: i64 = row.get(0)?;
    let term_id: i64 = row.get(1)?;
    Ok((
        kind,
        Occurrence {
            term: TermId::Word(term_id),
            item_id: row.get(2)?,
            field_id: row.get(3)?,
            count: row.get(4)?,
        },
    ))
}

/// Add `count` to the row for (term, item, field), creating it if needed
pub fn add_occurrence(
    conn: &Connection,
    term: TermId,
    item_id: ItemId,
    field_id: FieldId,
    count: i64,
) -> Result<(), IndexDbError> {
    conn.execute(
        "INSERT INTO search_word_counts (term_kind, term_id, item_id, field_id, count)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(term_kind, term_id, field_id, item_id)
         DO UPDATE SET count = count + excluded.count",
        params![term.kind(), term.id(), item_id, field_id, count],
    )?;
    Ok(())
}

/// Get (item, count) pairs for a term in one field
pub fn get_term_counts(
    conn: &Connection,
    term: TermId,
    field_id: FieldId,
) -> Result<Vec<(ItemId, i64)>, IndexDbError> {
    let mut stmt = conn.prepare_cached(
        "SELECT item_id, count FROM search_word_counts
         WHERE term_kind = ?1 AND term_id = ?2 AND field_id = ?3
         ORDER BY item_id",
    )?;

    let counts = stmt
        .query_map(params![term.kind(), term.id(), field_id], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(counts)
}

/// Get every row recorded for an item
pub fn get_item_occurrences(
    conn: &Connection,
    item_id: ItemId,
) -> Result<Vec<Occurrence>, IndexDbError> {
    let mut stmt = conn.prepare(
        "SELECT term_kind, term_id, item_id, field_id, count FROM search_word_counts
         WHERE item_id = ?1
         ORDER BY field_id, term_kind, term_id",
    )?;

    let rows = stmt
        .query_map(params![item_id], row_to_occurrence)?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(kind, mut occurrence)| {
            occurrence.term = match kind {
                0 => TermId::Word(occurrence.term.id()),
                1 => TermId::Stem(occurrence.term.id()),
                other => return Err(IndexDbError::UnknownTermKind(other)),
            };
            Ok(occurrence)
        })
        .collect()
}

/// Delete all rows for an item
pub fn delete_item_occurrences(conn: &Connection, item_id: ItemId) -> Result<usize, IndexDbError> {
    let rows_affected = conn.execute(
        "DELETE FROM search_word_counts WHERE item_id = ?1",
        params![item_id],
    )?;
    Ok(rows_affected)
}

/// Delete all rows for a field
pub fn delete_field_occurrences(
    conn: &Connection,
    field_id: FieldId,
) -> Result<usize, IndexDbError> {
    let rows_affected = conn.execute(
        "DELETE FROM search_word_counts WHERE field_id = ?1",
        params![field_id],
    )?;
    Ok(rows_affected)
}

pub fn count_occurrences(conn: &Connection) -> Result<i64, IndexDbError> {
    let count = conn.query_row("SELECT COUNT(*) FROM search_word_counts", [], |row| row.get(0))?;
    Ok(count)
}
