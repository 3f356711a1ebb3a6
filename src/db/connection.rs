use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OpenFlags;
use std::fs;
use std::path::Path;
use thiserror::Error;

use super::migrations::{self, MigrationError};

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Failed to create database directory: {0}")]
    CreateDirError(#[from] std::io::Error),
    #[error("Database connection error: {0}")]
    ConnectionError(#[from] r2d2::Error),
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),
    #[error("Migration error: {0}")]
    MigrationError(#[from] MigrationError),
}

/// Initialize the database connection pool at a specific path
pub fn init_pool_at_path(db_path: &Path) -> Result<DbPool, DbError> {
    // Ensure the directory exists
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let manager = SqliteConnectionManager::file(db_path).with_flags(
        OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
    );

    let pool = Pool::builder().max_size(10).build(manager)?;

    {
        let conn = pool.get()?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        // WAL lets searches read while an indexer writes
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;

        migrations::run_migrations(&conn)?;
    }

    log::info!("Search database ready at {:?}", db_path);
    Ok(pool)
}

/// Initialize a single-connection in-memory pool.
///
/// Every connection of an in-memory manager is a distinct database, so the
/// pool holds exactly one connection and never recycles it.
pub fn init_memory_pool() -> Result<DbPool, DbError> {
    let manager = SqliteConnectionManager::memory();
    let pool = Pool::builder()
        .max_size(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .build(manager)?;

    {
        let conn = pool.get()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migrations::run_migrations(&conn)?;
    }

    Ok(pool)
}

#[cfg(test)]
pub fn init_test_pool() -> Result<DbPool, DbError> {
    init_memory_pool()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_pool_runs_migrations() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("search.db");

        let pool = init_pool_at_path(&path).unwrap();
        assert!(path.exists());

        let conn = pool.get().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM search_words", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_reopening_file_pool_keeps_data() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("search.db");

        {
            let pool = init_pool_at_path(&path).unwrap();
            let conn = pool.get().unwrap();
            conn.execute("INSERT INTO search_words (word) VALUES ('fox')", [])
                .unwrap();
        }

        let pool = init_pool_at_path(&path).unwrap();
        let conn = pool.get().unwrap();
        let word: String = conn
            .query_row("SELECT word FROM search_words", [], |row| row.get(0))
            .unwrap();
        assert_eq!(word, "fox");
    }
}
