//! Data-source port definition.
//!
//! The data source is the production-tracking backend the core queries for
//! entity records: ancestor chains, entity-folder fan-out, user lookups.
//! The core never retries a failed query; retry policy belongs to the
//! implementation behind this port.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Entity, Filter};

/// Errors that can occur in data-source operations.
#[derive(Debug, Error)]
pub enum DataSourceError {
    /// The requested entity does not exist.
    #[error("{entity_type} {id} not found")]
    NotFound { entity_type: String, id: i64 },

    /// The backend could not be reached. Fatal for the current
    /// orchestration run; distinguishable from configuration errors so
    /// callers can build retry logic on top.
    #[error("Data source unreachable: {0}")]
    Connection(String),

    /// Any other backend failure.
    #[error("Data source error: {0}")]
    Backend(String),
}

/// Port for querying the production-tracking backend.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// All entities of `entity_type` matching every filter. The `fields`
    /// hint names the fields the caller needs populated.
    async fn find(
        &self,
        entity_type: &str,
        filters: &[Filter],
        fields: &[&str],
    ) -> Result<Vec<Entity>, DataSourceError>;

    /// First entity matching the filters, or `None`.
    async fn find_one(
        &self,
        entity_type: &str,
        filters: &[Filter],
        fields: &[&str],
    ) -> Result<Option<Entity>, DataSourceError> {
        Ok(self
            .find(entity_type, filters, fields)
            .await?
            .into_iter()
            .next())
    }
}
