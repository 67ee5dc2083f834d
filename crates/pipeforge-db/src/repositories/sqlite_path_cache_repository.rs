//! `SQLite` implementation of the `PathCacheRepository` trait.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use pipeforge_core::domain::EntityRef;
use pipeforge_core::paths::{lookup_form, normalize_relative};
use pipeforge_core::ports::path_cache::{PathCacheError, PathCacheRepository, PathMapping};

/// `SQLite` implementation of the `PathCacheRepository` trait.
///
/// Holds a single-connection pool (see `setup`), which serializes writers;
/// concurrent readers from other processes are handled by `SQLite` itself.
/// Entries are append-only: nothing here mutates a mapping in place.
pub struct SqlitePathCacheRepository {
    pool: SqlitePool,
}

impl SqlitePathCacheRepository {
    /// Create a new `SQLite` path-cache repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// The entity currently claiming a location, if any.
    async fn claiming_entity(
        &self,
        root_name: &str,
        relative_path: &str,
    ) -> Result<Option<EntityRef>, PathCacheError> {
        let row = sqlx::query(
            "SELECT entity_type, entity_id, entity_name FROM path_cache
             WHERE root_name = ? AND relative_path = ?",
        )
        .bind(root_name)
        .bind(relative_path)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(|r| EntityRef {
            entity_type: r.get("entity_type"),
            id: r.get("entity_id"),
            name: r.get("entity_name"),
        }))
    }
}

#[async_trait]
impl PathCacheRepository for SqlitePathCacheRepository {
    async fn add_mapping(&self, mapping: &PathMapping) -> Result<(), PathCacheError> {
        let relative = normalize_relative(&mapping.relative_path)
            .map_err(|e| PathCacheError::Storage(e.to_string()))?;

        // Existing claim on this exact location?
        if let Some(existing) = self.claiming_entity(&mapping.root_name, &relative).await? {
            if existing.same_record(&mapping.entity) {
                // Identical mapping: a no-op, not an error.
                return Ok(());
            }
            return Err(PathCacheError::Conflict {
                root_name: mapping.root_name.clone(),
                relative_path: relative,
                existing,
                attempted: mapping.entity.clone(),
            });
        }

        // A second primary for the same entity under the same root means
        // the configuration produced two canonical locations.
        if mapping.is_primary {
            let row = sqlx::query(
                "SELECT relative_path FROM path_cache
                 WHERE entity_type = ? AND entity_id = ? AND root_name = ? AND is_primary = 1",
            )
            .bind(&mapping.entity.entity_type)
            .bind(mapping.entity.id)
            .bind(&mapping.root_name)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

            if let Some(row) = row {
                let existing_path: String = row.get("relative_path");
                if lookup_form(&existing_path) != lookup_form(&relative) {
                    return Err(PathCacheError::PrimaryConflict {
                        entity: mapping.entity.clone(),
                        root_name: mapping.root_name.clone(),
                        existing_path,
                    });
                }
            }
        }

        let insert = sqlx::query(
            "INSERT INTO path_cache
             (entity_type, entity_id, entity_name, root_name, relative_path, is_primary)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&mapping.entity.entity_type)
        .bind(mapping.entity.id)
        .bind(mapping.entity.name.as_deref())
        .bind(&mapping.root_name)
        .bind(&relative)
        .bind(mapping.is_primary)
        .execute(&self.pool)
        .await;

        match insert {
            Ok(_) => {
                debug!(
                    entity = %mapping.entity,
                    path = %relative,
                    "path cache mapping added"
                );
                Ok(())
            }
            Err(e) => {
                // A concurrent writer may have claimed the location between
                // our check and the insert; re-read to report it precisely.
                if let Some(existing) =
                    self.claiming_entity(&mapping.root_name, &relative).await?
                {
                    if existing.same_record(&mapping.entity) {
                        return Ok(());
                    }
                    return Err(PathCacheError::Conflict {
                        root_name: mapping.root_name.clone(),
                        relative_path: relative,
                        existing,
                        attempted: mapping.entity.clone(),
                    });
                }
                Err(map_sqlx_error(e))
            }
        }
    }

    async fn get_paths(
        &self,
        entity_type: &str,
        entity_id: i64,
    ) -> Result<Vec<PathMapping>, PathCacheError> {
        let rows = sqlx::query(
            "SELECT entity_type, entity_id, entity_name, root_name, relative_path, is_primary
             FROM path_cache
             WHERE entity_type = ? AND entity_id = ?
             ORDER BY is_primary DESC, root_name ASC, relative_path ASC",
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows
            .iter()
            .map(|row| PathMapping {
                entity: EntityRef {
                    entity_type: row.get("entity_type"),
                    id: row.get("entity_id"),
                    name: row.get("entity_name"),
                },
                root_name: row.get("root_name"),
                relative_path: row.get("relative_path"),
                is_primary: row.get("is_primary"),
            })
            .collect())
    }

    async fn get_entity(
        &self,
        root_name: &str,
        relative_path: &str,
    ) -> Result<Option<EntityRef>, PathCacheError> {
        let relative = normalize_relative(relative_path)
            .map_err(|e| PathCacheError::Storage(e.to_string()))?;
        self.claiming_entity(root_name, &relative).await
    }

    async fn remove_mappings(
        &self,
        entity_type: &str,
        entity_id: i64,
    ) -> Result<u64, PathCacheError> {
        let result = sqlx::query("DELETE FROM path_cache WHERE entity_type = ? AND entity_id = ?")
            .bind(entity_type)
            .bind(entity_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn wipe(&self) -> Result<(), PathCacheError> {
        sqlx::query("DELETE FROM path_cache")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}

/// Map storage failures, keeping corruption distinct: a corrupt store needs
/// a full resync and must never be silently ignored.
fn map_sqlx_error(error: sqlx::Error) -> PathCacheError {
    let text = error.to_string();
    let lowered = text.to_ascii_lowercase();
    if lowered.contains("malformed") || lowered.contains("not a database") {
        PathCacheError::Corrupt(text)
    } else {
        PathCacheError::Storage(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::setup_test_database;

    async fn repo() -> SqlitePathCacheRepository {
        let pool = setup_test_database().await.unwrap();
        SqlitePathCacheRepository::new(pool)
    }

    fn shot_mapping() -> PathMapping {
        PathMapping::primary(
            EntityRef::named("Shot", 2, "shot_020"),
            "primary",
            "shots/seq_010/shot_020",
        )
    }

    #[tokio::test]
    async fn add_and_read_back_both_directions() {
        let repo = repo().await;
        repo.add_mapping(&shot_mapping()).await.unwrap();

        let paths = repo.get_paths("Shot", 2).await.unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].relative_path, "shots/seq_010/shot_020");
        assert!(paths[0].is_primary);

        let entity = repo
            .get_entity("primary", "shots/seq_010/shot_020")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entity, EntityRef::named("Shot", 2, "shot_020"));
    }

    #[tokio::test]
    async fn identical_mapping_is_a_no_op() {
        let repo = repo().await;
        repo.add_mapping(&shot_mapping()).await.unwrap();
        repo.add_mapping(&shot_mapping()).await.unwrap();

        let paths = repo.get_paths("Shot", 2).await.unwrap();
        assert_eq!(paths.len(), 1);
    }

    #[tokio::test]
    async fn different_entity_at_same_path_conflicts() {
        let repo = repo().await;
        repo.add_mapping(&shot_mapping()).await.unwrap();

        let intruder = PathMapping::primary(
            EntityRef::named("Shot", 99, "impostor"),
            "primary",
            "shots/seq_010/shot_020",
        );
        let err = repo.add_mapping(&intruder).await.unwrap_err();
        assert!(matches!(err, PathCacheError::Conflict { existing, .. }
            if existing.id == 2));
    }

    #[tokio::test]
    async fn lookup_normalizes_case_and_separators() {
        let repo = repo().await;
        repo.add_mapping(&shot_mapping()).await.unwrap();

        let entity = repo
            .get_entity("primary", "Shots\\Seq_010\\Shot_020\\")
            .await
            .unwrap();
        assert!(entity.is_some());
    }

    #[tokio::test]
    async fn second_primary_under_same_root_conflicts() {
        let repo = repo().await;
        repo.add_mapping(&shot_mapping()).await.unwrap();

        let second = PathMapping::primary(
            EntityRef::named("Shot", 2, "shot_020"),
            "primary",
            "shots/elsewhere/shot_020",
        );
        let err = repo.add_mapping(&second).await.unwrap_err();
        assert!(matches!(err, PathCacheError::PrimaryConflict { .. }));

        // A secondary location is fine
        let secondary = PathMapping {
            entity: EntityRef::named("Shot", 2, "shot_020"),
            root_name: "primary".to_string(),
            relative_path: "shots/elsewhere/shot_020".to_string(),
            is_primary: false,
        };
        repo.add_mapping(&secondary).await.unwrap();
        assert_eq!(repo.get_paths("Shot", 2).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn remove_and_wipe() {
        let repo = repo().await;
        repo.add_mapping(&shot_mapping()).await.unwrap();

        assert_eq!(repo.remove_mappings("Shot", 2).await.unwrap(), 1);
        assert!(repo.get_paths("Shot", 2).await.unwrap().is_empty());

        repo.add_mapping(&shot_mapping()).await.unwrap();
        repo.wipe().await.unwrap();
        assert!(
            repo.get_entity("primary", "shots/seq_010/shot_020")
                .await
                .unwrap()
                .is_none()
        );
    }
}
