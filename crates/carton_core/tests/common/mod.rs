#![allow(dead_code)]

use carton_core::db::migrations::{apply_migrations, Migration};
use carton_core::db::open_db_in_memory;
use carton_core::model::validation::rules;
use carton_core::{DecodeError, Entity, SqliteStoreProvider, Validate, ValidationReport};
use regex::Regex;
use rusqlite::types::Value;
use rusqlite::Row;
use uuid::Uuid;

pub const TEST_MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        sql: "CREATE TABLE contacts (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL
        );",
    },
    Migration {
        version: 2,
        sql: "CREATE TABLE labels (
            uuid TEXT PRIMARY KEY NOT NULL,
            name TEXT NOT NULL
        );",
    },
];

/// Integer-keyed test entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Contact {
    pub id: i64,
    pub name: String,
    pub email: String,
}

impl Contact {
    pub fn new(id: i64, name: &str, email: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            email: email.to_string(),
        }
    }
}

impl Entity for Contact {
    const TABLE: &'static str = "contacts";
    const COLUMNS: &'static [&'static str] = &["id", "name", "email"];
    const KEY_COLUMN: &'static str = "id";

    fn key_value(&self) -> Value {
        Value::Integer(self.id)
    }

    fn to_row(&self) -> Vec<Value> {
        vec![
            Value::Integer(self.id),
            Value::Text(self.name.clone()),
            Value::Text(self.email.clone()),
        ]
    }

    fn from_row(row: &Row<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            email: row.get("email")?,
        })
    }
}

impl Validate for Contact {
    fn check(&self) -> ValidationReport {
        let mut report = ValidationReport::new();
        rules::in_range(&mut report, "id", self.id, 1, i64::MAX);
        rules::required(&mut report, "name", &self.name);
        rules::max_len(&mut report, "name", &self.name, 120);
        let email_pattern = Regex::new(r"^[^@\s]+@[^@\s]+$").unwrap();
        rules::matches(
            &mut report,
            "email",
            &self.email,
            &email_pattern,
            "a valid email address",
        );
        report
    }
}

/// Uuid-keyed test entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Label {
    pub uuid: Uuid,
    pub name: String,
}

impl Label {
    pub fn new(name: &str) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.to_string(),
        }
    }
}

impl Entity for Label {
    const TABLE: &'static str = "labels";
    const COLUMNS: &'static [&'static str] = &["uuid", "name"];
    const KEY_COLUMN: &'static str = "uuid";

    fn key_value(&self) -> Value {
        Value::Text(self.uuid.to_string())
    }

    fn to_row(&self) -> Vec<Value> {
        vec![
            Value::Text(self.uuid.to_string()),
            Value::Text(self.name.clone()),
        ]
    }

    fn from_row(row: &Row<'_>) -> Result<Self, DecodeError> {
        let uuid_text: String = row.get("uuid")?;
        let uuid = Uuid::parse_str(&uuid_text).map_err(|_| {
            DecodeError::Invalid(format!("invalid uuid value `{uuid_text}` in labels.uuid"))
        })?;
        Ok(Self {
            uuid,
            name: row.get("name")?,
        })
    }
}

impl Validate for Label {
    fn check(&self) -> ValidationReport {
        let mut report = ValidationReport::new();
        rules::required(&mut report, "name", &self.name);
        report
    }
}

pub fn provider() -> SqliteStoreProvider {
    let mut conn = open_db_in_memory().unwrap();
    apply_migrations(&mut conn, TEST_MIGRATIONS).unwrap();
    SqliteStoreProvider::new(conn)
}

pub fn contact_count(provider: &SqliteStoreProvider) -> i64 {
    provider
        .connection()
        .query_row("SELECT COUNT(*) FROM contacts;", [], |row| row.get(0))
        .unwrap()
}
