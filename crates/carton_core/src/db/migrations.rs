//! SQLite migration executor for host-supplied schemas.
//!
//! Schema content belongs to the application embedding this crate; entity
//! tables are not defined here. This module only provides the mechanism:
//! versioned, atomic application of whatever DDL the host registers.
//!
//! # Invariants
//! - `version` values must strictly increase within one migration list.
//! - Applied migration version is mirrored to `PRAGMA user_version`.
//! - A database newer than the registered list is rejected, never modified.

use crate::db::{DbError, DbResult};
use rusqlite::Connection;

/// One schema migration step owned by the host application.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: u32,
    pub sql: &'static str,
}

/// Returns the latest version in a host migration list.
pub fn latest_version(migrations: &[Migration]) -> u32 {
    migrations.last().map_or(0, |migration| migration.version)
}

/// Applies all pending migrations on the provided connection.
///
/// All pending steps run inside one transaction; a failing step leaves both
/// schema and `user_version` untouched.
pub fn apply_migrations(conn: &mut Connection, migrations: &[Migration]) -> DbResult<()> {
    ensure_strictly_increasing(migrations)?;

    let current_version = current_user_version(conn)?;
    let latest = latest_version(migrations);

    if current_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: latest,
        });
    }

    if current_version == latest {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in migrations {
        if migration.version <= current_version {
            continue;
        }

        tx.execute_batch(migration.sql)?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
    }
    tx.commit()?;

    Ok(())
}

fn ensure_strictly_increasing(migrations: &[Migration]) -> DbResult<()> {
    let mut previous = 0;
    for migration in migrations {
        if migration.version <= previous {
            return Err(DbError::MisorderedMigrations {
                previous,
                next: migration.version,
            });
        }
        previous = migration.version;
    }
    Ok(())
}

fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}
