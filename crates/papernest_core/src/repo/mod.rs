//! Repository layer over the SQLite project store.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts per entity kind.
//! - Isolate SQL and scope-renumbering details from services.
//!
//! # Invariants
//! - Repositories only accept connections migrated to the latest schema.
//! - Structural mutations (move/delete) run in one immediate transaction and
//!   leave every touched scope densely numbered.
//! - Scope listings are deterministic: `index ASC, created_at ASC, rowid ASC`.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod agenda_repo;
pub mod group_repo;
pub mod paper_repo;
pub mod workspace_repo;

/// Result type used by repository operations.
pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from repository operations.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Target entity does not exist.
    NotFound(Uuid),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Persisted data cannot be converted to a valid entity.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "entity not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "project store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "project store requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
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

/// Every table of the project store, in wipe order.
pub(crate) const PROJECT_TABLES: [&str; 6] = [
    "papers",
    "paper_groups",
    "events",
    "todos",
    "definitions",
    "workspaces",
];

/// Deletes every entity of every kind. Callers own the transaction boundary.
pub(crate) fn wipe_all(conn: &Connection) -> RepoResult<()> {
    for table in PROJECT_TABLES {
        conn.execute(&format!("DELETE FROM {table};"), [])?;
    }
    Ok(())
}

/// Verifies schema version and presence of `tables`.
pub(crate) fn ensure_connection_ready(conn: &Connection, tables: &[&'static str]) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in tables {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

pub(crate) fn parse_optional_uuid(
    value: Option<String>,
    column: &'static str,
) -> RepoResult<Option<Uuid>> {
    value.map(|text| parse_uuid(&text, column)).transpose()
}

pub(crate) fn parse_bool(value: i64, column: &'static str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}

pub(crate) fn parse_index(value: i64, column: &'static str) -> RepoResult<i32> {
    i32::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("index `{value}` out of range in {column}")))
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

/// Inserts `id` before `before` (or at the end) in an ordered id list.
///
/// `id` is removed from its previous position first. When `before == id` the
/// original position is kept.
pub(crate) fn place_before(ids: &mut Vec<Uuid>, id: Uuid, before: Option<Uuid>) {
    if before == Some(id) {
        if !ids.contains(&id) {
            ids.push(id);
        }
        return;
    }
    ids.retain(|existing| *existing != id);
    let target = before
        .and_then(|before| ids.iter().position(|existing| *existing == before))
        .unwrap_or(ids.len());
    ids.insert(target, id);
}
