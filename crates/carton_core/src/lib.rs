//! Generic validated persistence building block for SQLite-backed hosts.
//! This crate is the single source of truth for repository invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod store;

pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::entity::{DecodeError, Entity, EntityState};
pub use model::validation::{FieldError, Validate, ValidationReport};
pub use repo::entity_repo::{RepoError, RepoResult, Repository};
pub use store::handle::{SqliteStoreHandle, SqliteStoreProvider};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
