//! Synonym edge storage
//!
//! Each undirected edge is one row with the smaller word id first, so the
//! primary key rejects a duplicate in either direction.

use rusqlite::{params, Connection};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SynonymDbError {
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),
}

fn ordered(a: i64, b: i64) -> (i64, i64) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Insert an edge unless it exists. Returns true if a row was added.
pub fn add_edge(conn: &Connection, word_id: i64, synonym_id: i64) -> Result<bool, SynonymDbError> {
    if word_id == synonym_id {
        return Ok(false);
    }
    let (low, high) = ordered(word_id, synonym_id);
    let rows_affected = conn.execute(
        "INSERT OR IGNORE INTO search_synonyms (word_id, synonym_id) VALUES (?1, ?2)",
        params![low, high],
    )?;
    Ok(rows_affected > 0)
}

pub fn remove_edge(
    conn: &Connection,
    word_id: i64,
    synonym_id: i64,
) -> Result<bool, SynonymDbError> {
    let (low, high) = ordered(word_id, synonym_id);
    let rows_affected = conn.execute(
        "DELETE FROM search_synonyms WHERE word_id = ?1 AND synonym_id = ?2",
        params![low, high],
    )?;
    Ok(rows_affected > 0)
}

/// Remove every edge touching a word
pub fn remove_edges_for_word(conn: &Connection, word_id: i64) -> Result<usize, SynonymDbError> {
    let rows_affected = conn.execute(
        "DELETE FROM search_synonyms WHERE word_id = ?1 OR synonym_id = ?1",
        params![word_id],
    )?;
    Ok(rows_affected)
}

pub fn clear_edges(conn: &Connection) -> Result<usize, SynonymDbError> {
    let rows_affected = conn.execute("DELETE FROM search_synonyms", [])?;
    Ok(rows_affected)
}

/// Get (id, text) of every word one hop away from `word_id`
pub fn get_synonym_words(
    conn: &Connection,
    word_id: i64,
) -> Result<Vec<(i64, String)>, SynonymDbError> {
    let mut stmt = conn.prepare_cached(
        "SELECT w.id, w.word FROM search_synonyms s
         INNER JOIN search_words w ON w.id = s.synonym_id
         WHERE s.word_id = ?1
         UNION
         SELECT w.id, w.word FROM search_synonyms s
         INNER JOIN search_words w ON w.id = s.word_id
         WHERE s.synonym_id = ?1
         ORDER BY 2",
    )?;

    let words = stmt
        .query_map(params![word_id], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(words)
}

/// Get every edge as a pair of word texts
pub fn get_all_edges(conn: &Connection) -> Result<Vec<(String, String)>, SynonymDbError> {
    let mut stmt = conn.prepare(
        "SELECT a.word, b.word FROM search_synonyms s
         INNER JOIN search_words a ON a.id = s.word_id
         INNER JOIN search_words b ON b.id = s.synonym_id
         ORDER BY a.word, b.word",
    )?;

    let edges = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(edges)
}

pub fn count_edges(conn: &Connection) -> Result<i64, SynonymDbError> {
    let count = conn.query_row("SELECT COUNT(*) FROM search_synonyms", [], |row| row.get(0))?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::init_test_pool;
    use crate::db::lexicon::find_or_create_word;

    #[test]
    fn test_edges_are_undirected() {
        let pool = init_test_pool().unwrap();
        let conn = pool.get().unwrap();

        let fox = find_or_create_word(&conn, "fox").unwrap();
        let vulpine = find_or_create_word(&conn, "vulpine").unwrap();

        assert!(add_edge(&conn, vulpine, fox).unwrap());
        assert!(!add_edge(&conn, fox, vulpine).unwrap());
        assert_eq!(count_edges(&conn).unwrap(), 1);

        let from_fox = get_synonym_words(&conn, fox).unwrap();
        assert_eq!(from_fox, vec![(vulpine, "vulpine".to_string())]);
        let from_vulpine = get_synonym_words(&conn, vulpine).unwrap();
        assert_eq!(from_vulpine, vec![(fox, "fox".to_string())]);
    }

    #[test]
    fn test_self_edges_are_skipped() {
        let pool = init_test_pool().unwrap();
        let conn = pool.get().unwrap();

        let fox = find_or_create_word(&conn, "fox").unwrap();
        assert!(!add_edge(&conn, fox, fox).unwrap());
        assert_eq!(count_edges(&conn).unwrap(), 0);
    }

    #[test]
    fn test_remove_edges() {
        let pool = init_test_pool().unwrap();
        let conn = pool.get().unwrap();

        let big = find_or_create_word(&conn, "big").unwrap();
        let large = find_or_create_word(&conn, "large").unwrap();
        let huge = find_or_create_word(&conn, "huge").unwrap();
        add_edge(&conn, big, large).unwrap();
        add_edge(&conn, big, huge).unwrap();
        add_edge(&conn, large, huge).unwrap();

        assert!(remove_edge(&conn, large, big).unwrap());
        assert!(!remove_edge(&conn, large, big).unwrap());
        assert_eq!(remove_edges_for_word(&conn, huge).unwrap(), 2);
        assert_eq!(count_edges(&conn).unwrap(), 0);

        add_edge(&conn, big, large).unwrap();
        assert_eq!(clear_edges(&conn).unwrap(), 1);
    }

    #[test]
    fn test_get_all_edges() {
        let pool = init_test_pool().unwrap();
        let conn = pool.get().unwrap();

        let fox = find_or_create_word(&conn, "fox").unwrap();
        let vulpine = find_or_create_word(&conn, "vulpine").unwrap();
        add_edge(&conn, fox, vulpine).unwrap();

        let edges = get_all_edges(&conn).unwrap();
        assert_eq!(edges, vec![("fox".to_string(), "vulpine".to_string())]);
    }
}
