//! Workspace repository contracts and SQLite implementation.
//!
//! # Invariants
//! - At most one workspace row is considered current: the oldest one.
//! - `ensure_workspace` creates an empty workspace lazily.

use super::{ensure_connection_ready, parse_uuid, RepoError, RepoResult};
use crate::model::workspace::Workspace;
use rusqlite::{params, Connection, OptionalExtension, Row};

const WORKSPACE_SELECT_SQL: &str = "SELECT
    uuid,
    project_title,
    research_objective,
    created_at
FROM workspaces";

/// Repository interface for the project workspace record.
pub trait WorkspaceRepository {
    /// Loads the current workspace, if any.
    fn get_workspace(&self) -> RepoResult<Option<Workspace>>;
    /// Loads the current workspace, creating an empty one when absent.
    fn ensure_workspace(&self) -> RepoResult<Workspace>;
    /// Updates title and objective of an existing workspace.
    fn update_workspace(&self, workspace: &Workspace) -> RepoResult<()>;
}

/// SQLite-backed workspace repository.
pub struct SqliteWorkspaceRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteWorkspaceRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["workspaces"])?;
        Ok(Self { conn })
    }
}

impl WorkspaceRepository for SqliteWorkspaceRepository<'_> {
    fn get_workspace(&self) -> RepoResult<Option<Workspace>> {
        load_current_workspace(self.conn)
    }

    fn ensure_workspace(&self) -> RepoResult<Workspace> {
        if let Some(existing) = load_current_workspace(self.conn)? {
            return Ok(existing);
        }
        let workspace = Workspace::empty();
        insert_workspace_row(self.conn, &workspace)?;
        Ok(workspace)
    }

    fn update_workspace(&self, workspace: &Workspace) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE workspaces
             SET project_title = ?2,
                 research_objective = ?3
             WHERE uuid = ?1;",
            params![
                workspace.id.to_string(),
                workspace.project_title.as_str(),
                workspace.research_objective.as_str(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(workspace.id));
        }
        Ok(())
    }
}

pub(crate) fn insert_workspace_row(conn: &Connection, workspace: &Workspace) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO workspaces (
            uuid,
            project_title,
            research_objective,
            created_at
        ) VALUES (?1, ?2, ?3, ?4);",
        params![
            workspace.id.to_string(),
            workspace.project_title.as_str(),
            workspace.research_objective.as_str(),
            workspace.created_at,
        ],
    )?;
    Ok(())
}

pub(crate) fn load_current_workspace(conn: &Connection) -> RepoResult<Option<Workspace>> {
    let mut stmt = conn.prepare(&format!(
        "{WORKSPACE_SELECT_SQL}
         ORDER BY created_at ASC, rowid ASC
         LIMIT 1;"
    ))?;
    let workspace = stmt
        .query_row([], |row| Ok(parse_workspace_row(row)))
        .optional()?;
    workspace.transpose()
}

fn parse_workspace_row(row: &Row<'_>) -> RepoResult<Workspace> {
    let id_text: String = row.get("uuid")?;
    Ok(Workspace {
        id: parse_uuid(&id_text, "workspaces.uuid")?,
        project_title: row.get("project_title")?,
        research_objective: row.get("research_objective")?,
        created_at: row.get("created_at")?,
    })
}
