//! SQLite store handle and provider.
//!
//! # Responsibility
//! - Own the per-handle change queue keyed by entity identity.
//! - Translate tagged lifecycle states into INSERT/UPDATE/DELETE on flush.
//! - Provide snapshot reads and the per-entity validation query.
//!
//! # Invariants
//! - An entity is tracked at most once per handle, keyed by `key_value()`.
//! - `save_changes` leaves no pending mutation behind, success or failure.
//! - UPDATE/DELETE that change zero rows surface as `NotFound`, inside the
//!   still-open transaction so nothing partial can commit.

use crate::db::{open_db, open_db_in_memory, DbResult};
use crate::model::entity::{Entity, EntityState};
use crate::model::validation::{Validate, ValidationReport};
use crate::repo::entity_repo::{RepoError, RepoResult};
use rusqlite::{params_from_iter, Connection, Transaction, TransactionBehavior};
use std::cell::RefCell;
use std::path::Path;

/// One queued change: the entity snapshot and its tagged intention.
#[derive(Debug, Clone)]
struct TrackedChange<T> {
    entity: T,
    state: EntityState,
}

/// Session-like handle scoped to one entity type over a shared connection.
///
/// Not thread-safe; use one handle per logical unit of work. Multiple
/// handles for different entity types may share one provider (and thus one
/// connection) to participate in the same database.
pub struct SqliteStoreHandle<'conn, T: Entity> {
    conn: &'conn Connection,
    tracked: RefCell<Vec<TrackedChange<T>>>,
}

impl<'conn, T: Entity> SqliteStoreHandle<'conn, T> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            tracked: RefCell::new(Vec::new()),
        }
    }

    /// Associates `state` with the entity instance inside this handle.
    ///
    /// The sole mutation primitive used by the repository: tagging `Added`,
    /// `Modified`, or `Deleted` queues the corresponding write for the next
    /// flush; `Detached` removes the entity from tracking entirely.
    pub fn change_entity_state(&self, entity: &T, state: EntityState) {
        let mut tracked = self.tracked.borrow_mut();
        let key = entity.key_value();
        let position = tracked
            .iter()
            .position(|change| change.entity.key_value() == key);

        match (position, state) {
            (Some(index), EntityState::Detached) => {
                tracked.remove(index);
            }
            (Some(index), _) => {
                tracked[index].entity = entity.clone();
                tracked[index].state = state;
            }
            (None, EntityState::Detached) => {}
            (None, _) => tracked.push(TrackedChange {
                entity: entity.clone(),
                state,
            }),
        }
    }

    /// Lifecycle state currently associated with the entity instance.
    /// Untracked entities are `Detached`.
    pub fn entity_state(&self, entity: &T) -> EntityState {
        let key = entity.key_value();
        self.tracked
            .borrow()
            .iter()
            .find(|change| change.entity.key_value() == key)
            .map_or(EntityState::Detached, |change| change.state)
    }

    /// Number of entries with a pending write intention.
    pub fn pending_changes(&self) -> usize {
        self.tracked
            .borrow()
            .iter()
            .filter(|change| {
                matches!(
                    change.state,
                    EntityState::Added | EntityState::Modified | EntityState::Deleted
                )
            })
            .count()
    }

    /// Removes every tracked entry, pending or not.
    pub fn detach_all(&self) {
        self.tracked.borrow_mut().clear();
    }

    /// Opens the transaction boundary for one flush.
    ///
    /// The returned transaction rolls back on drop unless `commit` was
    /// reached, which covers every early-return and panic exit path.
    pub fn begin(&self) -> RepoResult<Transaction<'conn>> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        Ok(tx)
    }

    /// Flushes every pending change inside the given transaction.
    ///
    /// Returns the number of rows written. Flushed `Added`/`Modified`
    /// entries become `Unchanged`; `Deleted` entries leave tracking. On any
    /// error the whole queue is detached before the error propagates, so a
    /// failed flush cannot re-fire on a later call.
    pub fn save_changes(&self, tx: &Transaction<'_>) -> RepoResult<usize> {
        let result = self.flush_tracked(tx);
        if result.is_err() {
            self.detach_all();
        }
        result
    }

    fn flush_tracked(&self, tx: &Transaction<'_>) -> RepoResult<usize> {
        let mut tracked = self.tracked.borrow_mut();
        let mut flushed = 0;
        let mut index = 0;

        while index < tracked.len() {
            match tracked[index].state {
                EntityState::Added => {
                    insert_entity(tx, &tracked[index].entity)?;
                    tracked[index].state = EntityState::Unchanged;
                    flushed += 1;
                    index += 1;
                }
                EntityState::Modified => {
                    update_entity(tx, &tracked[index].entity)?;
                    tracked[index].state = EntityState::Unchanged;
                    flushed += 1;
                    index += 1;
                }
                EntityState::Deleted => {
                    delete_entity(tx, &tracked[index].entity)?;
                    tracked.remove(index);
                    flushed += 1;
                }
                EntityState::Unchanged | EntityState::Detached => {
                    index += 1;
                }
            }
        }

        Ok(flushed)
    }

    /// Loads every entity of the bound type as an untracked snapshot.
    pub fn all(&self) -> RepoResult<Vec<T>> {
        let mut stmt = self.conn.prepare(&select_sql::<T>())?;
        let mut rows = stmt.query([])?;
        let mut items = Vec::new();

        while let Some(row) = rows.next()? {
            items.push(T::from_row(row)?);
        }

        Ok(items)
    }

    /// Streams rows through `predicate`, expecting at most one match.
    ///
    /// Short-circuits with `MultipleResults` as soon as a second match is
    /// seen; the full set is never materialized.
    pub fn find_one(&self, predicate: impl Fn(&T) -> bool) -> RepoResult<Option<T>> {
        let mut stmt = self.conn.prepare(&select_sql::<T>())?;
        let mut rows = stmt.query([])?;
        let mut found: Option<T> = None;

        while let Some(row) = rows.next()? {
            let entity = T::from_row(row)?;
            if !predicate(&entity) {
                continue;
            }
            if found.is_some() {
                return Err(RepoError::MultipleResults);
            }
            found = Some(entity);
        }

        Ok(found)
    }

    /// Per-entity validation query required by the handle contract.
    pub fn validation_errors(&self, entity: &T) -> ValidationReport
    where
        T: Validate,
    {
        entity.check()
    }
}

/// Owns one connection and hands out entity-scoped store handles.
///
/// An explicit constructor dependency: callers build a provider (or inject a
/// pre-opened connection) and pass it to each repository, which allows
/// repositories of different entity types to share one database within a
/// larger unit of work.
pub struct SqliteStoreProvider {
    conn: Connection,
}

impl SqliteStoreProvider {
    /// Wraps an already-configured connection.
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Opens a file-backed provider via `db::open_db`.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Ok(Self::new(open_db(path)?))
    }

    /// Opens an in-memory provider via `db::open_db_in_memory`.
    pub fn in_memory() -> DbResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }

    /// Returns a handle scoped to operations on `T`.
    ///
    /// The binding is resolved statically from the type parameter; no
    /// prototype instance is needed.
    pub fn handle<T: Entity>(&self) -> SqliteStoreHandle<'_, T> {
        SqliteStoreHandle::new(&self.conn)
    }

    /// Direct access for host-level concerns such as running migrations.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn select_sql<T: Entity>() -> String {
    format!("SELECT {} FROM {};", T::COLUMNS.join(", "), T::TABLE)
}

fn insert_sql<T: Entity>() -> String {
    let placeholders = (1..=T::COLUMNS.len())
        .map(|index| format!("?{index}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({});",
        T::TABLE,
        T::COLUMNS.join(", "),
        placeholders
    )
}

fn update_sql<T: Entity>() -> String {
    let assignments = T::COLUMNS
        .iter()
        .enumerate()
        .filter(|(_, column)| **column != T::KEY_COLUMN)
        .map(|(index, column)| format!("{} = ?{}", column, index + 1))
        .collect::<Vec<_>>()
        .join(", ");
    let key_index = key_column_index::<T>() + 1;
    format!(
        "UPDATE {} SET {} WHERE {} = ?{};",
        T::TABLE,
        assignments,
        T::KEY_COLUMN,
        key_index
    )
}

fn delete_sql<T: Entity>() -> String {
    format!("DELETE FROM {} WHERE {} = ?1;", T::TABLE, T::KEY_COLUMN)
}

fn key_column_index<T: Entity>() -> usize {
    T::COLUMNS
        .iter()
        .position(|column| *column == T::KEY_COLUMN)
        .unwrap_or(0)
}

fn insert_entity<T: Entity>(tx: &Transaction<'_>, entity: &T) -> RepoResult<()> {
    tx.execute(&insert_sql::<T>(), params_from_iter(entity.to_row()))?;
    Ok(())
}

fn update_entity<T: Entity>(tx: &Transaction<'_>, entity: &T) -> RepoResult<()> {
    let changed = tx.execute(&update_sql::<T>(), params_from_iter(entity.to_row()))?;
    if changed == 0 {
        return Err(RepoError::NotFound(entity.key_display()));
    }
    Ok(())
}

fn delete_entity<T: Entity>(tx: &Transaction<'_>, entity: &T) -> RepoResult<()> {
    let changed = tx.execute(&delete_sql::<T>(), [entity.key_value()])?;
    if changed == 0 {
        return Err(RepoError::NotFound(entity.key_display()));
    }
    Ok(())
}
