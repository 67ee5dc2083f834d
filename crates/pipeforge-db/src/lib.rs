//! `SQLite` adapter crate for pipeforge.
//!
//! Implements the `pipeforge-core` path-cache port on top of a local
//! `SQLite` store - one database file per pipeline configuration - and
//! provides setup and wiring helpers. Core types never see `sqlx`.

#![deny(unsafe_code)]

pub mod factory;
pub mod repositories;
pub mod setup;

// Re-export factory for convenient access
pub use factory::StoreFactory;

// Re-export TestDb for integration tests
#[cfg(any(test, feature = "test-utils"))]
pub use factory::TestDb;

// Re-export repository implementations
pub use repositories::SqlitePathCacheRepository;

// Re-export setup functions for convenient access
pub use setup::setup_database;
#[cfg(any(test, feature = "test-utils"))]
pub use setup::setup_test_database;

// Silence unused dev-dependency warnings until the crate grows mock-based tests
#[cfg(test)]
use tempfile as _;
#[cfg(test)]
use tokio_test as _;
