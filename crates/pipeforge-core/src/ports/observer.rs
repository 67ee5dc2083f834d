//! Post-process notification port.
//!
//! Higher layers (logging, notifications, DCC integrations) observe
//! committed folder-creation runs through this strategy interface instead
//! of a runtime hook-reloading mechanism. The default observer does
//! nothing.

use async_trait::async_trait;

use crate::services::folder_creator::CreationReport;

/// Port notified after a folder-creation run commits.
#[async_trait]
pub trait CreationObserver: Send + Sync {
    /// Called once per committed run with the final report. Implementations
    /// must not fail the run; errors are theirs to handle.
    async fn folders_created(&self, report: &CreationReport);
}

/// Observer that ignores every notification.
#[derive(Debug, Default)]
pub struct NoopObserver;

#[async_trait]
impl CreationObserver for NoopObserver {
    async fn folders_created(&self, _report: &CreationReport) {}
}
