//! Database setup and initialization.
//!
//! This module provides the `setup_database()` function for initializing
//! the `SQLite` path-cache store. Entry points call this with the resolved
//! database path - one store file per pipeline configuration.
//!
//! The pool is capped at a single connection: `SQLite` serializes writers
//! anyway, and a one-connection pool makes the at-most-one-writer rule
//! explicit while WAL keeps concurrent readers (other processes) safe.

use anyhow::Result;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use std::path::Path;
use tracing::debug;

/// Sets up the `SQLite` path-cache store and ensures the schema exists.
///
/// This function:
/// 1. Creates the parent directory and database file if missing
/// 2. Opens a single-connection pool in WAL mode
/// 3. Creates the table and indexes (idempotent)
///
/// # Errors
///
/// Returns an error if the database file cannot be opened or created, or
/// schema creation fails.
pub async fn setup_database(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    create_schema(&pool).await?;
    debug!(path = %db_path.display(), "path cache store ready");
    Ok(pool)
}

/// Sets up an in-memory `SQLite` store for testing.
///
/// Creates a fresh in-memory database with the full production schema. The
/// pool is capped at one connection; with `sqlite::memory:` every
/// connection would otherwise see its own empty database.
#[cfg(any(test, feature = "test-utils"))]
pub async fn setup_test_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    create_schema(&pool).await?;
    Ok(pool)
}

/// Creates the complete store schema.
///
/// Safe to call multiple times as all operations use IF NOT EXISTS.
async fn create_schema(pool: &SqlitePool) -> Result<()> {
    // One row per entity-path mapping. relative_path collates NOCASE so
    // lookups and the uniqueness constraint are case-insensitive.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS path_cache (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            entity_type TEXT NOT NULL,
            entity_id INTEGER NOT NULL,
            entity_name TEXT,
            root_name TEXT NOT NULL,
            relative_path TEXT NOT NULL COLLATE NOCASE,
            is_primary INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    // A concrete location belongs to at most one entity
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_path_cache_location
         ON path_cache(root_name, relative_path)",
    )
    .execute(pool)
    .await?;

    // At most one primary location per entity per root
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_path_cache_primary
         ON path_cache(entity_type, entity_id, root_name) WHERE is_primary = 1",
    )
    .execute(pool)
    .await?;

    // Forward lookups: entity -> paths
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_path_cache_entity
         ON path_cache(entity_type, entity_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
