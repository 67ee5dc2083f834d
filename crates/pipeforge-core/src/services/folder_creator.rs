//! Folder-creation orchestrator.
//!
//! Drives one run through its phases: resolve the target's ancestor chain,
//! plan via the schema (pure), then mutate the filesystem and record cache
//! entries in plan order. `preview` stops after planning and is the
//! cancellable checkpoint - a caller that does not want the mutations
//! simply never calls `create`.
//!
//! Creation is monotonic: paths that already exist are skipped (their
//! cache entries are still ensured), and a failure partway through leaves
//! the completed prefix in place. Re-running is always safe.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::domain::{Entity, EntityRef, Filter};
use crate::paths::normalize_relative;
use crate::ports::path_cache::PathMapping;
use crate::ports::{Collaborators, CoreError, DataSourceError};
use crate::roots::StorageRoots;
use crate::schema::{PlannedOp, PlannedPath, ResolutionRequest, Schema};

/// Fields requested when fetching chain entities.
const CHAIN_FIELDS: &[&str] = &["code", "name"];

/// What to create folders for.
#[derive(Debug, Clone)]
pub struct FolderCreationRequest {
    /// Target entity; its ancestor chain is resolved from the data source.
    pub entity: EntityRef,
    /// User for workspace nodes; workspace subtrees are skipped when absent.
    pub user: Option<Entity>,
}

impl FolderCreationRequest {
    pub fn for_entity(entity: EntityRef) -> Self {
        Self { entity, user: None }
    }
}

/// The phase a run failed in, reported alongside the underlying error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationPhase {
    ResolvingChain,
    Planning,
    Creating,
}

impl fmt::Display for CreationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::ResolvingChain => "resolving the entity chain",
            Self::Planning => "planning the folder structure",
            Self::Creating => "creating folders",
        };
        write!(f, "{text}")
    }
}

/// A folder-creation failure, tagged with the phase that produced it.
#[derive(Debug, Error)]
#[error("Folder creation for {entity} failed while {phase}: {source}")]
pub struct FolderCreationError {
    pub entity: EntityRef,
    pub phase: CreationPhase,
    #[source]
    pub source: CoreError,
}

/// Outcome of a committed run.
#[derive(Debug, Clone, Default)]
pub struct CreationReport {
    /// Paths created by this run, in creation order.
    pub created: Vec<PathBuf>,
    /// Paths that already existed and were skipped.
    pub skipped: Vec<PathBuf>,
    /// Cache mappings ensured (inserted or already present).
    pub cache_entries: usize,
}

/// Orchestrates folder creation for one pipeline configuration.
pub struct FolderCreator {
    schema: Arc<Schema>,
    roots: Arc<StorageRoots>,
    collaborators: Collaborators,
}

impl FolderCreator {
    pub fn new(
        schema: Arc<Schema>,
        roots: Arc<StorageRoots>,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            schema,
            roots,
            collaborators,
        }
    }

    /// Resolve and plan without touching the filesystem or the cache.
    pub async fn preview(
        &self,
        request: &FolderCreationRequest,
    ) -> Result<Vec<PlannedPath>, FolderCreationError> {
        let chain = self.resolve_chain(request).await?;
        self.plan(request, chain).await
    }

    /// Run the full pipeline: resolve, plan, create, commit.
    pub async fn create(
        &self,
        request: &FolderCreationRequest,
    ) -> Result<CreationReport, FolderCreationError> {
        let chain = self.resolve_chain(request).await?;
        let plan = self.plan(request, chain).await?;

        let mut report = CreationReport::default();
        for planned in &plan {
            self.execute(planned, &mut report)
                .await
                .map_err(|source| self.failed(request, CreationPhase::Creating, source))?;
        }

        info!(
            entity = %request.entity,
            created = report.created.len(),
            skipped = report.skipped.len(),
            "folder creation committed"
        );
        self.collaborators.observer.folders_created(&report).await;
        Ok(report)
    }

    async fn plan(
        &self,
        request: &FolderCreationRequest,
        chain: Vec<Entity>,
    ) -> Result<Vec<PlannedPath>, FolderCreationError> {
        let resolution = ResolutionRequest {
            chain,
            user: request.user.clone(),
        };
        self.schema
            .resolve(&resolution, self.collaborators.data_source.as_ref())
            .await
            .map_err(|e| self.failed(request, CreationPhase::Planning, e.into()))
    }

    /// Fetch the target entity and every entity it links to, project first.
    ///
    /// A target that does not exist, or a linked ancestor that cannot be
    /// fetched, is fatal for the run.
    async fn resolve_chain(
        &self,
        request: &FolderCreationRequest,
    ) -> Result<Vec<Entity>, FolderCreationError> {
        let fail =
            |source: CoreError| self.failed(request, CreationPhase::ResolvingChain, source);

        let target = self
            .fetch(&request.entity)
            .await
            .map_err(&fail)?
            .ok_or_else(|| {
                fail(DataSourceError::NotFound {
                    entity_type: request.entity.entity_type.clone(),
                    id: request.entity.id,
                }
                .into())
            })?;

        // Deterministic ancestor order: project, then remaining links by
        // field name, then the target itself.
        let mut links: Vec<(&String, &EntityRef)> = target.links.iter().collect();
        links.sort_by_key(|(field, _)| (*field).clone());

        let mut chain = Vec::with_capacity(links.len() + 1);
        for (_, link) in links {
            if link.same_record(&target.to_ref()) {
                continue;
            }
            let ancestor = self.fetch(link).await.map_err(&fail)?.ok_or_else(|| {
                fail(DataSourceError::NotFound {
                    entity_type: link.entity_type.clone(),
                    id: link.id,
                }
                .into())
            })?;
            if ancestor.entity_type == "Project" {
                chain.insert(0, ancestor);
            } else {
                chain.push(ancestor);
            }
        }
        chain.push(target);

        debug!(entity = %request.entity, depth = chain.len(), "entity chain resolved");
        Ok(chain)
    }

    async fn fetch(&self, entity: &EntityRef) -> Result<Option<Entity>, CoreError> {
        Ok(self
            .collaborators
            .data_source
            .find_one(
                &entity.entity_type,
                &[Filter::is("id", entity.id)],
                CHAIN_FIELDS,
            )
            .await?)
    }

    /// Create one planned path and ensure its cache entry.
    async fn execute(
        &self,
        planned: &PlannedPath,
        report: &mut CreationReport,
    ) -> Result<(), CoreError> {
        let absolute = planned.absolute(&self.roots)?;
        let exists = absolute.exists() || absolute.is_symlink();

        if exists {
            report.skipped.push(absolute);
        } else {
            let fs = self.collaborators.filesystem.as_ref();
            match &planned.op {
                PlannedOp::Folder => fs.create_folder(&absolute).await?,
                PlannedOp::File { source } => fs.copy_file(source, &absolute).await?,
                PlannedOp::Symlink { target } => fs.create_symlink(target, &absolute).await?,
            }
            report.created.push(absolute);
        }

        // Existing folders still get their mapping ensured; add_mapping is
        // idempotent for identical entries.
        if let Some(entity) = &planned.entity {
            let mapping = PathMapping {
                entity: entity.clone(),
                root_name: planned.root_name.clone(),
                relative_path: normalize_relative(&planned.relative)?,
                is_primary: planned.is_primary,
            };
            self.collaborators.path_cache.add_mapping(&mapping).await?;
            report.cache_entries += 1;
        }
        Ok(())
    }

    fn failed(
        &self,
        request: &FolderCreationRequest,
        phase: CreationPhase,
        source: CoreError,
    ) -> FolderCreationError {
        FolderCreationError {
            entity: request.entity.clone(),
            phase,
            source,
        }
    }
}
