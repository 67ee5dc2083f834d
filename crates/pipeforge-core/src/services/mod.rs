//! Service implementations composing the ports.
//!
//! Services hold `Arc<dyn Port>` collaborators injected at construction -
//! no process-global state - and stay deliberately sequential: one
//! orchestration run performs its steps in order, and the path-cache store
//! is the only cross-process synchronization point.

pub mod context_resolver;
pub mod folder_creator;

pub use context_resolver::ContextResolver;
pub use folder_creator::{
    CreationPhase, CreationReport, FolderCreationError, FolderCreationRequest, FolderCreator,
};
