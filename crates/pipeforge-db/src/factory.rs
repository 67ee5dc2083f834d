//! Composition utilities for wiring services with `SQLite` backends.
//!
//! Focused purely on construction; no domain logic lives here.

use sqlx::SqlitePool;
use std::sync::Arc;

use pipeforge_core::ports::path_cache::PathCacheRepository;

use crate::repositories::SqlitePathCacheRepository;

/// Factory for creating repository instances with `SQLite` backends.
pub struct StoreFactory;

impl StoreFactory {
    /// Create a `SQLite` connection pool from a URL.
    ///
    /// Most callers should prefer [`crate::setup_database`], which also
    /// applies the schema; this exists for adapters that manage their own
    /// migration step.
    pub async fn create_pool(db_url: &str) -> anyhow::Result<SqlitePool> {
        let pool = SqlitePool::connect(db_url).await?;
        Ok(pool)
    }

    /// Build the path-cache repository as a core trait object.
    ///
    /// This is the recommended way for adapters to obtain the repository.
    pub fn build_path_cache(pool: SqlitePool) -> Arc<dyn PathCacheRepository> {
        Arc::new(SqlitePathCacheRepository::new(pool))
    }
}

/// Test database helper for integration tests.
///
/// Provides an in-memory `SQLite` store with the full production schema
/// already applied, ensuring test parity with real stores.
#[cfg(any(test, feature = "test-utils"))]
pub struct TestDb {
    pool: SqlitePool,
}

#[cfg(any(test, feature = "test-utils"))]
impl TestDb {
    /// Create a new in-memory test store with full schema.
    pub async fn new() -> anyhow::Result<Self> {
        let pool = crate::setup::setup_test_database().await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Path-cache repository backed by this test store.
    pub fn path_cache(&self) -> Arc<dyn PathCacheRepository> {
        StoreFactory::build_path_cache(self.pool.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeforge_core::domain::EntityRef;
    use pipeforge_core::ports::path_cache::PathMapping;

    #[tokio::test]
    async fn test_db_wires_a_working_repository() {
        let db = TestDb::new().await.unwrap();
        let cache = db.path_cache();

        cache
            .add_mapping(&PathMapping::primary(
                EntityRef::named("Project", 1, "demo"),
                "primary",
                "demo",
            ))
            .await
            .unwrap();

        let found = cache.get_entity("primary", "demo").await.unwrap();
        assert_eq!(found.unwrap().entity_type, "Project");
    }
}
