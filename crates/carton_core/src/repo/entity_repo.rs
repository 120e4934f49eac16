//! Generic repository contract and SQLite-backed implementation.
//!
//! # Responsibility
//! - Provide `all`/`query`/`find_with_key`/`validate`/`add`/`update`/`delete`
//!   for any entity type implementing `Entity` and `Validate`.
//! - Choreograph validation, transaction boundary, change tagging, and
//!   detach around each mutation.
//!
//! # Invariants
//! - An entity is never committed without first passing validation; a
//!   rejected entity never reaches the change queue in a mutating state.
//! - Mutations either fully succeed (persisted, detached, returned) or
//!   fully fail with no partial state change.
//! - Reads are untracked snapshots and never open a transaction.

use crate::db::DbError;
use crate::model::entity::{DecodeError, Entity, EntityState};
use crate::model::validation::{FieldError, Validate, ValidationReport};
use crate::store::handle::{SqliteStoreHandle, SqliteStoreProvider};
use log::debug;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type RepoResult<T> = Result<T, RepoError>;

/// Error taxonomy for repository operations.
#[derive(Debug)]
pub enum RepoError {
    /// Validation rejected the entity; carries the full ordered error list.
    Validation(ValidationReport),
    /// Update/delete targeted an identity absent from the store.
    NotFound(String),
    /// `find_with_key` predicate matched more than one entity.
    MultipleResults,
    /// Store-level failure; partial writes were rolled back before this
    /// reached the caller.
    Db(DbError),
    /// Persisted row rejected during decode.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(report) => write!(f, "entity validation failed: {report}"),
            Self::NotFound(key) => write!(f, "entity not found: {key}"),
            Self::MultipleResults => write!(f, "predicate matched more than one entity"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted entity data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Validation(_) | Self::NotFound(_) | Self::MultipleResults | Self::InvalidData(_) => {
                None
            }
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<DecodeError> for RepoError {
    fn from(value: DecodeError) -> Self {
        match value {
            DecodeError::Sql(err) => Self::Db(DbError::Sqlite(err)),
            DecodeError::Invalid(message) => Self::InvalidData(message),
        }
    }
}

/// Validated, transactional CRUD over one store handle.
///
/// One repository instance serves one logical unit of work; concurrent use
/// of the same handle is not supported. Repositories for different entity
/// types may share one `SqliteStoreProvider`.
pub struct Repository<'conn, T: Entity + Validate> {
    handle: SqliteStoreHandle<'conn, T>,
}

impl<'conn, T: Entity + Validate> Repository<'conn, T> {
    /// Wraps a pre-built handle, e.g. one shared transaction scope built by
    /// the host.
    pub fn new(handle: SqliteStoreHandle<'conn, T>) -> Self {
        Self { handle }
    }

    /// Builds the handle from an explicit provider dependency.
    pub fn with_provider(provider: &'conn SqliteStoreProvider) -> Self {
        Self::new(provider.handle())
    }

    /// The underlying store handle, exposed for state inspection.
    pub fn handle(&self) -> &SqliteStoreHandle<'conn, T> {
        &self.handle
    }

    /// Every entity of the bound type, loaded without change tracking.
    ///
    /// Safe to call repeatedly and concurrently with in-flight writes from
    /// other handles; isolation is the store's concern.
    pub fn all(&self) -> RepoResult<Vec<T>> {
        self.handle.all()
    }

    /// Filters `all()` with the given predicate, entity by entity.
    ///
    /// Arbitrary closures cannot be pushed into SQL, so filtering happens
    /// in application memory over the snapshot.
    pub fn query(&self, predicate: impl Fn(&T) -> bool) -> RepoResult<Vec<T>> {
        let items = self.all()?;
        Ok(items.into_iter().filter(|entity| predicate(entity)).collect())
    }

    /// The single entity matching `predicate`, or `None`.
    ///
    /// The predicate must be selective (match a unique key); two or more
    /// matches fail with `MultipleResults`.
    pub fn find_with_key(&self, predicate: impl Fn(&T) -> bool) -> RepoResult<Option<T>> {
        self.handle.find_one(predicate)
    }

    /// Field errors for the entity without touching the store. An empty
    /// result means the entity is admissible.
    pub fn validate(&self, entity: &T) -> Vec<FieldError> {
        self.handle.validation_errors(entity).into_errors()
    }

    /// Validates and persists a new entity.
    ///
    /// Invalid entities fail with the full ordered error list before any
    /// transaction opens. On success the entity is committed, detached, and
    /// returned.
    pub fn add(&self, entity: T) -> RepoResult<T> {
        self.admit(&entity, "repo_add")?;
        self.mutate(entity, EntityState::Added, "repo_add")
    }

    /// Validates and persists changes to an existing entity.
    ///
    /// Fails with `NotFound` when the identity is absent from the store.
    pub fn update(&self, entity: T) -> RepoResult<T> {
        self.admit(&entity, "repo_update")?;
        self.mutate(entity, EntityState::Modified, "repo_update")
    }

    /// Removes an existing entity. No validation step.
    ///
    /// Fails with `NotFound` when the identity is absent from the store.
    pub fn delete(&self, entity: T) -> RepoResult<()> {
        self.mutate(entity, EntityState::Deleted, "repo_delete")?;
        Ok(())
    }

    fn admit(&self, entity: &T, event: &str) -> RepoResult<()> {
        let report = self.handle.validation_errors(entity);
        if report.is_valid() {
            return Ok(());
        }
        debug!(
            "event={event} module=repo status=rejected table={} error_count={}",
            T::TABLE,
            report.errors().len()
        );
        Err(RepoError::Validation(report))
    }

    fn mutate(&self, entity: T, state: EntityState, event: &str) -> RepoResult<T> {
        let started_at = Instant::now();

        let tx = self.handle.begin()?;
        self.handle.change_entity_state(&entity, state);
        self.handle.save_changes(&tx)?;
        if let Err(err) = tx.commit() {
            // Commit failure still rolls back; nothing may stay tracked.
            self.handle.detach_all();
            return Err(err.into());
        }
        self.handle.change_entity_state(&entity, EntityState::Detached);

        debug!(
            "event={event} module=repo status=ok table={} duration_ms={}",
            T::TABLE,
            started_at.elapsed().as_millis()
        );
        Ok(entity)
    }
}
