//! Context resolution: from a path via the path cache, or from an entity
//! via hierarchy traversal.
//!
//! Contexts are derived on demand and scoped to the call; nothing here is
//! cached in process-global state.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::domain::{Context, EntityRef, Filter};
use crate::paths::normalize_relative;
use crate::ports::path_cache::PathCacheRepository;
use crate::ports::{CoreError, DataSource, DataSourceError};
use crate::roots::StorageRoots;

/// Fields requested when fetching entities for context assembly.
const CONTEXT_FIELDS: &[&str] = &["code", "name"];

/// Resolves contexts in both directions of the entity-path mapping.
pub struct ContextResolver {
    roots: Arc<StorageRoots>,
    data_source: Arc<dyn DataSource>,
    path_cache: Arc<dyn PathCacheRepository>,
}

impl ContextResolver {
    pub fn new(
        roots: Arc<StorageRoots>,
        data_source: Arc<dyn DataSource>,
        path_cache: Arc<dyn PathCacheRepository>,
    ) -> Self {
        Self {
            roots,
            data_source,
            path_cache,
        }
    }

    /// Resolve the context a concrete path belongs to.
    ///
    /// Walks from the deepest cached ancestor upwards: the first cached
    /// non-project entity becomes the primary entity, entities between it
    /// and the project are kept as additional entities, and the project
    /// closes the walk. Returns `None` for paths no cached entity owns.
    pub async fn from_path(&self, path: &Path) -> Result<Option<Context>, CoreError> {
        let (root_name, relative) = self.roots.split(path)?;
        let Ok(relative) = normalize_relative(&relative) else {
            // The path is the storage root itself; no entity owns it.
            return Ok(None);
        };

        let mut context = Context::default();
        let mut found = false;

        let mut prefix: Option<String> = Some(relative);
        while let Some(current) = prefix {
            if let Some(entity) = self.path_cache.get_entity(&root_name, &current).await? {
                found = true;
                if entity.entity_type == "Project" {
                    context.project = Some(entity);
                    break;
                } else if context.entity.is_none() {
                    context.entity = Some(entity);
                } else {
                    context.additional_entities.push(entity);
                }
            }
            prefix = current
                .rfind('/')
                .map(|idx| current[..idx].to_string());
        }

        if !found {
            debug!(path = %path.display(), "no cached entity for path");
            return Ok(None);
        }
        Ok(Some(context))
    }

    /// Resolve the context for an entity via its links.
    ///
    /// Tasks contribute their step and their linked entity; everything else
    /// becomes the primary entity of its own context.
    pub async fn from_entity(&self, entity: &EntityRef) -> Result<Context, CoreError> {
        let record = self
            .data_source
            .find_one(
                &entity.entity_type,
                &[Filter::is("id", entity.id)],
                CONTEXT_FIELDS,
            )
            .await?
            .ok_or_else(|| DataSourceError::NotFound {
                entity_type: entity.entity_type.clone(),
                id: entity.id,
            })?;

        let project = record.link_of_type("Project").cloned();

        let context = if record.entity_type == "Task" {
            let step = record.link_of_type("Step").cloned();
            let primary = record
                .links
                .values()
                .find(|l| l.entity_type != "Project" && l.entity_type != "Step")
                .cloned();
            Context {
                project,
                entity: primary,
                step,
                task: Some(record.to_ref()),
                ..Context::default()
            }
        } else if record.entity_type == "Project" {
            Context::for_project(record.to_ref())
        } else {
            Context {
                project,
                entity: Some(record.to_ref()),
                ..Context::default()
            }
        };

        Ok(context)
    }
}
