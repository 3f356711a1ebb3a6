use rusqlite::Connection;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),
}

/// Run all database migrations
pub fn run_migrations(conn: &Connection) -> Result<(), MigrationError> {
    // Create migrations table if it doesn't exist
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            applied_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );",
    )?;

    let migrations: Vec<(&str, &str)> = vec![
        ("001_lexicon", MIGRATION_001_LEXICON),
        ("002_occurrences", MIGRATION_002_OCCURRENCES),
        ("003_synonyms", MIGRATION_003_SYNONYMS),
    ];

    for (name, sql) in migrations {
        if !migration_applied(conn, name)? {
            conn.execute_batch(sql)?;
            mark_migration_applied(conn, name)?;
            log::debug!("Applied migration {}", name);
        }
    }

    Ok(())
}

fn migration_applied(conn: &Connection, name: &str) -> Result<bool, MigrationError> {
    let count: i32 = conn.query_row(
        "SELECT COUNT(*) FROM _migrations WHERE name = ?1",
        [name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn mark_migration_applied(conn: &Connection, name: &str) -> Result<(), MigrationError> {
    conn.execute("INSERT INTO _migrations (name) VALUES (?1)", [name])?;
    Ok(())
}

const MIGRATION_001_LEXICON: &str = r#"
-- Normalized words; UNIQUE(word) makes insert-if-absent atomic
CREATE TABLE search_words (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    word TEXT NOT NULL UNIQUE
);

-- Stems have their own id sequence, addressed separately from words
CREATE TABLE search_stems (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    stem TEXT NOT NULL UNIQUE
);
"#;

const MIGRATION_002_OCCURRENCES: &str = r#"
-- Weighted inverted index. term_kind: 0 = word, 1 = stem
CREATE TABLE search_word_counts (
    term_kind INTEGER NOT NULL CHECK (term_kind IN (0, 1)),
    term_id INTEGER NOT NULL,
    item_id INTEGER NOT NULL,
    field_id INTEGER NOT NULL,
    count INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (term_kind, term_id, field_id, item_id)
);

CREATE INDEX idx_search_word_counts_item ON search_word_counts(item_id);
CREATE INDEX idx_search_word_counts_field ON search_word_counts(field_id);

CREATE TABLE search_item_types (
    item_id INTEGER PRIMARY KEY,
    item_type INTEGER NOT NULL
);

CREATE INDEX idx_search_item_types_type ON search_item_types(item_type);
"#;

const MIGRATION_003_SYNONYMS: &str = r#"
-- Undirected edges stored once, smaller word id first
CREATE TABLE search_synonyms (
    word_id INTEGER NOT NULL REFERENCES search_words(id) ON DELETE CASCADE,
    synonym_id INTEGER NOT NULL REFERENCES search_words(id) ON DELETE CASCADE,
    PRIMARY KEY (word_id, synonym_id),
    CHECK (word_id < synonym_id)
);

CREATE INDEX idx_search_synonyms_synonym ON search_synonyms(synonym_id);
"#;
