//! Serializer: store -> document -> project file.
//!
//! # Invariants
//! - Serialization only reads; it never mutates the store.
//! - Collections are in creation order, so two exports of an unchanged
//!   store differ only in `exportedAt`.
//! - File writes are atomic: a temp file in the target directory is renamed
//!   over the destination.

use super::document::{
    DefinitionRecord, EventRecord, PaperGroupRecord, PaperRecord, ProjectDocument, TodoRecord,
    WorkspaceRecord, CURRENT_FORMAT_VERSION,
};
use crate::repo::agenda_repo::{AgendaRepository, SqliteAgendaRepository};
use crate::repo::group_repo::{GroupRepository, SqliteGroupRepository};
use crate::repo::paper_repo::{PaperRepository, SqlitePaperRepository};
use crate::repo::workspace_repo::{SqliteWorkspaceRepository, WorkspaceRepository};
use crate::repo::RepoError;
use crate::service::project_service::ProjectCounts;
use chrono::Utc;
use log::{error, info};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::NamedTempFile;

/// Errors from serializing or writing a project file.
#[derive(Debug)]
pub enum ExportError {
    /// Reading the store failed.
    Store(RepoError),
    /// The document could not be encoded.
    Encode(serde_json::Error),
    /// Writing or renaming the file failed; the destination is untouched.
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl Display for ExportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "cannot read project store: {err}"),
            Self::Encode(err) => write!(f, "cannot encode project document: {err}"),
            Self::WriteFailed { path, source } => {
                write!(f, "cannot write project file `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for ExportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Encode(err) => Some(err),
            Self::WriteFailed { source, .. } => Some(source),
        }
    }
}

impl From<RepoError> for ExportError {
    fn from(value: RepoError) -> Self {
        Self::Store(value)
    }
}

/// Outcome of a successful file export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub counts: ProjectCounts,
    pub bytes_written: usize,
}

/// Builds the document for the current store state.
pub fn serialize_project(conn: &Connection) -> Result<ProjectDocument, ExportError> {
    let workspaces = SqliteWorkspaceRepository::try_new(conn)?;
    let groups = SqliteGroupRepository::try_new(conn)?;
    let papers = SqlitePaperRepository::try_new(conn)?;
    let agenda = SqliteAgendaRepository::try_new(conn)?;

    let paper_records = papers
        .list_all_papers()?
        .iter()
        .map(PaperRecord::try_from_paper)
        .collect::<Result<Vec<_>, _>>()
        .map_err(ExportError::Encode)?;

    Ok(ProjectDocument {
        version: CURRENT_FORMAT_VERSION,
        exported_at: Utc::now(),
        workspaces: workspaces
            .get_workspace()?
            .iter()
            .map(WorkspaceRecord::from)
            .collect(),
        paper_groups: groups
            .list_all_groups()?
            .iter()
            .map(PaperGroupRecord::from)
            .collect(),
        papers: paper_records,
        events: agenda.list_events()?.iter().map(EventRecord::from).collect(),
        todos: agenda.list_todos()?.iter().map(TodoRecord::from).collect(),
        definitions: agenda
            .list_definitions()?
            .iter()
            .map(DefinitionRecord::from)
            .collect(),
    })
}

/// Serializes the store and writes it atomically to `path`.
pub fn export_project(
    conn: &Connection,
    path: impl AsRef<Path>,
) -> Result<ExportSummary, ExportError> {
    let path = path.as_ref();
    let started_at = Instant::now();

    let document = serialize_project(conn)?;
    let payload = document.to_json_pretty().map_err(ExportError::Encode)?;
    if let Err(source) = write_atomic(path, &payload) {
        error!(
            "event=project_export module=transfer status=error duration_ms={} error_code=write_failed error={source}",
            started_at.elapsed().as_millis()
        );
        return Err(ExportError::WriteFailed {
            path: path.to_path_buf(),
            source,
        });
    }

    let counts = document_counts(&document);
    info!(
        "event=project_export module=transfer status=ok duration_ms={} bytes={} groups={} papers={}",
        started_at.elapsed().as_millis(),
        payload.len(),
        counts.paper_groups,
        counts.papers
    );
    Ok(ExportSummary {
        path: path.to_path_buf(),
        counts,
        bytes_written: payload.len(),
    })
}

pub(crate) fn document_counts(document: &ProjectDocument) -> ProjectCounts {
    ProjectCounts {
        workspaces: document.workspaces.len(),
        paper_groups: document.paper_groups.len(),
        papers: document.papers.len(),
        events: document.events.len(),
        todos: document.todos.len(),
        definitions: document.definitions.len(),
    }
}

fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent)?;

    let mut tmp = NamedTempFile::new_in(&parent)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}
