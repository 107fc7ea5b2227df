//! Project lifecycle: fresh project and store-wide counts.

use crate::model::workspace::Workspace;
use crate::repo::workspace_repo::insert_workspace_row;
use crate::repo::{wipe_all, RepoResult};
use log::info;
use rusqlite::{Connection, Transaction, TransactionBehavior};

/// Number of entities per kind currently in the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectCounts {
    pub workspaces: usize,
    pub paper_groups: usize,
    pub papers: usize,
    pub events: usize,
    pub todos: usize,
    pub definitions: usize,
}

/// Wipes every entity and starts over with one empty workspace.
///
/// Runs in one transaction; on failure the previous project is kept.
pub fn new_project(conn: &Connection, project_title: &str) -> RepoResult<Workspace> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    wipe_all(&tx)?;
    let mut workspace = Workspace::empty();
    workspace.project_title = project_title.trim().to_string();
    insert_workspace_row(&tx, &workspace)?;
    tx.commit()?;
    info!(
        "event=project_new module=project status=ok workspace_id={}",
        workspace.id
    );
    Ok(workspace)
}

/// Counts entities per kind.
pub fn project_counts(conn: &Connection) -> RepoResult<ProjectCounts> {
    let count = |table: &str| -> RepoResult<usize> {
        let value: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
            row.get(0)
        })?;
        Ok(usize::try_from(value).unwrap_or_default())
    };
    Ok(ProjectCounts {
        workspaces: count("workspaces")?,
        paper_groups: count("paper_groups")?,
        papers: count("papers")?,
        events: count("events")?,
        todos: count("todos")?,
        definitions: count("definitions")?,
    })
}
