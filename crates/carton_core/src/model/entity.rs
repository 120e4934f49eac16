//! Entity binding contract and lifecycle state.
//!
//! # Responsibility
//! - Describe how one host record type maps onto its bound table.
//! - Model the store-tracked lifecycle intention for entity instances.
//!
//! # Invariants
//! - `KEY_COLUMN` must appear in `COLUMNS`; it is the sole identity used
//!   for update/delete targeting.
//! - `from_row` must reject invalid persisted state instead of masking it.

use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-tracked intention attached to an entity instance while it is
/// registered with a store handle.
///
/// State never outlives one repository operation: every mutating call ends
/// with the instance back in `Detached`, so it cannot participate in a
/// later, unrelated flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityState {
    /// Tracked, no pending write.
    Unchanged,
    /// Pending INSERT on next flush.
    Added,
    /// Pending UPDATE on next flush.
    Modified,
    /// Pending DELETE on next flush.
    Deleted,
    /// Not tracked by any handle.
    Detached,
}

/// Row decoding failure raised by `Entity::from_row`.
#[derive(Debug)]
pub enum DecodeError {
    /// Column access or type conversion failed at the SQLite layer.
    Sql(rusqlite::Error),
    /// The row was readable but semantically invalid for the entity type.
    Invalid(String),
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sql(err) => write!(f, "{err}"),
            Self::Invalid(message) => write!(f, "{message}"),
        }
    }
}

impl Error for DecodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sql(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<rusqlite::Error> for DecodeError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sql(value)
    }
}

/// Binding contract between a host record type and its backing table.
///
/// The repository is agnostic to entity fields except identity; everything
/// it needs to read and write rows flows through this trait. Schema content
/// stays with the host application (see `db::migrations`).
pub trait Entity: Clone + Default {
    /// Bound table name.
    const TABLE: &'static str;
    /// Column list in persistence order. Must contain `KEY_COLUMN`.
    const COLUMNS: &'static [&'static str];
    /// Identity column used to target updates and deletes.
    const KEY_COLUMN: &'static str;

    /// Identity of this instance, as the stored value of `KEY_COLUMN`.
    fn key_value(&self) -> Value;

    /// Field values in `COLUMNS` order, identity included.
    fn to_row(&self) -> Vec<Value>;

    /// Decodes one fetched row into an entity instance.
    fn from_row(row: &Row<'_>) -> Result<Self, DecodeError>;

    /// Human-readable identity used in diagnostics and not-found errors.
    fn key_display(&self) -> String {
        format!("{}.{}={}", Self::TABLE, Self::KEY_COLUMN, value_display(&self.key_value()))
    }
}

fn value_display(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(number) => number.to_string(),
        Value::Real(number) => number.to_string(),
        Value::Text(text) => text.clone(),
        Value::Blob(bytes) => format!("<{} bytes>", bytes.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::{value_display, EntityState};
    use rusqlite::types::Value;

    #[test]
    fn entity_state_serializes_snake_case() {
        let rendered = serde_json::to_string(&EntityState::Modified).unwrap();
        assert_eq!(rendered, "\"modified\"");
    }

    #[test]
    fn value_display_covers_scalar_shapes() {
        assert_eq!(value_display(&Value::Null), "NULL");
        assert_eq!(value_display(&Value::Integer(7)), "7");
        assert_eq!(value_display(&Value::Text("abc".to_string())), "abc");
        assert_eq!(value_display(&Value::Blob(vec![1, 2, 3])), "<3 bytes>");
    }
}
