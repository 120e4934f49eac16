//! SQLite connection bootstrap and schema migration entry points.
//!
//! # Responsibility
//! - Open and configure SQLite connections for carton-backed stores.
//! - Run caller-supplied schema migrations in deterministic order.
//!
//! # Invariants
//! - Applied migration version is tracked via `PRAGMA user_version`.
//! - Hosts must not read/write entity data before their migrations succeed.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    MisorderedMigrations {
        previous: u32,
        next: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::MisorderedMigrations { previous, next } => write!(
                f,
                "migration versions must strictly increase, got {next} after {previous}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } | Self::MisorderedMigrations { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
