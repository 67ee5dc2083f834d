//! Repository implementations backed by `SQLite`.

mod sqlite_path_cache_repository;

pub use sqlite_path_cache_repository::SqlitePathCacheRepository;
