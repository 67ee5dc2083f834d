//! Core domain types.
//!
//! These types represent the pure domain model, independent of any
//! infrastructure concerns (database, filesystem, etc.).
//!
//! # Structure
//!
//! - `fields` - Typed template field values (`FieldValue`, `FieldMap`)
//! - `entity` - Production entities and query filters
//! - `context` - The resolved project/entity/step/user tuple

pub mod context;
pub mod entity;
pub mod fields;

// Re-export entity types at the domain level for convenience
pub use entity::{Entity, EntityRef, Filter, FilterOp, FilterValue};

// Re-export field types at the domain level for convenience
pub use fields::{FieldMap, FieldValue};

// Re-export context at the domain level for convenience
pub use context::Context;
