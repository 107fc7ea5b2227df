//! Importer: document -> full replace of the project store.
//!
//! # Responsibility
//! - Validate a document completely before anything is deleted.
//! - Wipe and rebuild the store in one transaction: entities first, links
//!   second, then dense renumbering of every scope.
//!
//! # Invariants
//! - A malformed document never touches the store.
//! - A failure after the wipe rolls back; the previous project survives.
//! - Dangling or depth-violating links are dropped, never fatal; each drop is
//!   reported as an `ImportWarning`.
//! - Exactly one workspace exists after a successful import.

use super::document::{epoch_ms_from_datetime, ProjectDocument, CURRENT_FORMAT_VERSION};
use super::export::document_counts;
use crate::model::agenda::{DefinitionItem, Event, TodoItem};
use crate::model::paper::{decode_authors, decode_notes, Paper, PaperId};
use crate::model::paper_group::{GroupId, PaperGroup};
use crate::model::workspace::{Workspace, WorkspaceId};
use crate::repo::agenda_repo::{insert_definition_row, insert_event_row, insert_todo_row};
use crate::repo::group_repo::{
    insert_group_row, list_group_scopes, renumber_group_scope, set_group_parent,
};
use crate::repo::paper_repo::{
    insert_paper_row, list_paper_scopes, renumber_paper_scope, set_paper_group,
};
use crate::repo::workspace_repo::insert_workspace_row;
use crate::repo::{wipe_all, RepoError, RepoResult};
use crate::service::project_service::ProjectCounts;
use log::{error, info, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Instant;
use uuid::Uuid;

/// Errors from importing a project document.
#[derive(Debug)]
pub enum ImportError {
    /// Source bytes could not be read.
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Document failed to parse or validate; the store is untouched.
    Malformed(String),
    /// Rebuilding failed inside the transaction; it was rolled back.
    Rebuild(RepoError),
    /// The rebuilt store could not be committed; it was rolled back and the
    /// import can be retried. Callers should re-open the project from disk.
    CommitFailed(RepoError),
}

impl Display for ImportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unreadable { path, source } => {
                write!(f, "cannot read project file `{}`: {source}", path.display())
            }
            Self::Malformed(message) => write!(f, "malformed project file: {message}"),
            Self::Rebuild(err) => write!(f, "project rebuild failed and was rolled back: {err}"),
            Self::CommitFailed(err) => write!(
                f,
                "project may be in an inconsistent state, re-open from disk: {err}"
            ),
        }
    }
}

impl Error for ImportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Unreadable { source, .. } => Some(source),
            Self::Malformed(_) => None,
            Self::Rebuild(err) => Some(err),
            Self::CommitFailed(err) => Some(err),
        }
    }
}

/// Non-fatal relink downgrade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportWarning {
    /// `parentID` names no group in the document; the group became a root.
    DanglingGroupParent { group_id: GroupId, parent_id: Uuid },
    /// `parentID` names the group itself; the group became a root.
    SelfParentedGroup { group_id: GroupId },
    /// The named parent kept a parent of its own (or the links form a cycle);
    /// the group became a root.
    DepthExceeded { group_id: GroupId, parent_id: GroupId },
    /// `groupID` names no group in the document; the paper became ungrouped.
    DanglingPaperGroup { paper_id: PaperId, group_id: Uuid },
    /// Only the first workspace is kept.
    ExtraWorkspace { workspace_id: WorkspaceId },
}

impl Display for ImportWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DanglingGroupParent {
                group_id,
                parent_id,
            } => write!(f, "group {group_id} references missing parent {parent_id}"),
            Self::SelfParentedGroup { group_id } => {
                write!(f, "group {group_id} references itself as parent")
            }
            Self::DepthExceeded {
                group_id,
                parent_id,
            } => write!(
                f,
                "group {group_id} would nest under subgroup {parent_id}"
            ),
            Self::DanglingPaperGroup { paper_id, group_id } => {
                write!(f, "paper {paper_id} references missing group {group_id}")
            }
            Self::ExtraWorkspace { workspace_id } => {
                write!(f, "extra workspace {workspace_id} ignored")
            }
        }
    }
}

/// Outcome of a successful import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Entities now in the store.
    pub counts: ProjectCounts,
    /// Links dropped during relinking, in document order.
    pub warnings: Vec<ImportWarning>,
    /// The document had no workspace and an empty one was created.
    pub synthesized_workspace: bool,
}

/// Reads, parses and imports a project file.
pub fn import_project(
    conn: &Connection,
    path: impl AsRef<Path>,
) -> Result<ImportReport, ImportError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| {
        error!("event=project_import module=transfer status=error error_code=unreadable error={source}");
        ImportError::Unreadable {
            path: path.to_path_buf(),
            source,
        }
    })?;
    let document = ProjectDocument::from_json_slice(&bytes).map_err(|err| {
        error!("event=project_import module=transfer status=error error_code=malformed error={err}");
        ImportError::Malformed(err.to_string())
    })?;
    import_document(conn, &document)
}

/// Replaces the whole store with the content of `document`.
///
/// This is a destructive full replace, not a merge.
pub fn import_document(
    conn: &Connection,
    document: &ProjectDocument,
) -> Result<ImportReport, ImportError> {
    let started_at = Instant::now();
    let plan = ImportPlan::build(document).map_err(|err| {
        error!("event=project_import module=transfer status=error error_code=malformed error={err}");
        err
    })?;

    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
        .map_err(|err| ImportError::Rebuild(err.into()))?;
    let warnings = match plan.apply(&tx) {
        Ok(warnings) => warnings,
        Err(err) => {
            error!(
                "event=project_import module=transfer status=error error_code=rebuild_failed error={err}"
            );
            return Err(ImportError::Rebuild(err));
        }
    };
    if let Err(err) = tx.commit() {
        error!(
            "event=project_import module=transfer status=error error_code=commit_failed error={err}"
        );
        return Err(ImportError::CommitFailed(err.into()));
    }

    for warning in &warnings {
        warn!("event=project_import_relink module=transfer status=dropped detail={warning}");
    }
    let mut counts = document_counts(document);
    counts.workspaces = 1;
    info!(
        "event=project_import module=transfer status=ok duration_ms={} groups={} papers={} warnings={}",
        started_at.elapsed().as_millis(),
        counts.paper_groups,
        counts.papers,
        warnings.len()
    );
    Ok(ImportReport {
        counts,
        warnings,
        synthesized_workspace: plan.synthesized_workspace,
    })
}

/// Fully validated entities ready to insert, with their requested links.
struct ImportPlan {
    workspace: Workspace,
    synthesized_workspace: bool,
    extra_workspaces: Vec<WorkspaceId>,
    groups: Vec<(PaperGroup, Option<Uuid>)>,
    papers: Vec<(Paper, Option<Uuid>)>,
    events: Vec<Event>,
    todos: Vec<TodoItem>,
    definitions: Vec<DefinitionItem>,
}

impl ImportPlan {
    fn build(document: &ProjectDocument) -> Result<Self, ImportError> {
        if document.version == 0 || document.version > CURRENT_FORMAT_VERSION {
            return Err(ImportError::Malformed(format!(
                "unsupported project file version {} (supported: 1..={CURRENT_FORMAT_VERSION})",
                document.version
            )));
        }

        let mut workspaces = Vec::with_capacity(document.workspaces.len());
        let mut seen = HashSet::new();
        for record in &document.workspaces {
            let id = claim_id(&mut seen, record.id, "workspace")?;
            workspaces.push(Workspace {
                id,
                project_title: record.project_title.clone(),
                research_objective: record.research_objective.clone(),
                created_at: epoch_ms_from_datetime(&record.created_at),
            });
        }
        let synthesized_workspace = workspaces.is_empty();
        let mut workspaces = workspaces.into_iter();
        let workspace = workspaces.next().unwrap_or_else(Workspace::empty);
        let extra_workspaces = workspaces.map(|extra| extra.id).collect();

        let mut seen = HashSet::new();
        let mut groups = Vec::with_capacity(document.paper_groups.len());
        for record in &document.paper_groups {
            let group = PaperGroup {
                id: claim_id(&mut seen, record.id, "paper group")?,
                name: record.name.clone(),
                order_index: record.order_index,
                is_collapsed: record.is_collapsed,
                parent_id: None,
                created_at: epoch_ms_from_datetime(&record.created_at),
            };
            groups.push((group, record.parent_id));
        }

        let mut seen = HashSet::new();
        let mut papers = Vec::with_capacity(document.papers.len());
        for (position, record) in document.papers.iter().enumerate() {
            let id = claim_id(&mut seen, record.id, "paper")?;
            let authors = decode_authors(&record.authors_json).map_err(|err| {
                ImportError::Malformed(format!("papers[{position}].authorsJSON: {err}"))
            })?;
            let notes = decode_notes(&record.notes_json).map_err(|err| {
                ImportError::Malformed(format!("papers[{position}].notesJSON: {err}"))
            })?;
            let paper = Paper {
                id,
                title: record.title.clone(),
                short_title: record.short_title.clone(),
                abstract_text: record.abstract_text.clone(),
                source_url: record.source_url.clone(),
                authors,
                notes,
                paper_type: record.paper_type,
                sort_index: record.sort_index,
                group_id: None,
                cached_file_path: None,
                created_at: epoch_ms_from_datetime(&record.created_at),
            };
            papers.push((paper, record.group_id));
        }

        let mut seen = HashSet::new();
        let mut events = Vec::with_capacity(document.events.len());
        for record in &document.events {
            events.push(Event {
                id: claim_id(&mut seen, record.id, "event")?,
                title: record.title.clone(),
                details: record.details.clone(),
                starts_at: record.starts_at.as_ref().map(epoch_ms_from_datetime),
                created_at: epoch_ms_from_datetime(&record.created_at),
            });
        }

        let mut seen = HashSet::new();
        let mut todos = Vec::with_capacity(document.todos.len());
        for record in &document.todos {
            todos.push(TodoItem {
                id: claim_id(&mut seen, record.id, "todo")?,
                title: record.title.clone(),
                is_completed: record.is_completed,
                due_at: record.due_at.as_ref().map(epoch_ms_from_datetime),
                created_at: epoch_ms_from_datetime(&record.created_at),
            });
        }

        let mut seen = HashSet::new();
        let mut definitions = Vec::with_capacity(document.definitions.len());
        for record in &document.definitions {
            definitions.push(DefinitionItem {
                id: claim_id(&mut seen, record.id, "definition")?,
                term: record.term.clone(),
                definition: record.definition.clone(),
                created_at: epoch_ms_from_datetime(&record.created_at),
            });
        }

        Ok(Self {
            workspace,
            synthesized_workspace,
            extra_workspaces,
            groups,
            papers,
            events,
            todos,
            definitions,
        })
    }

    /// Wipe, insert, relink and renumber. Caller owns the transaction.
    fn apply(&self, conn: &Connection) -> RepoResult<Vec<ImportWarning>> {
        let mut warnings: Vec<ImportWarning> = self
            .extra_workspaces
            .iter()
            .map(|workspace_id| ImportWarning::ExtraWorkspace {
                workspace_id: *workspace_id,
            })
            .collect();

        wipe_all(conn)?;

        insert_workspace_row(conn, &self.workspace)?;
        let mut live_groups: HashMap<GroupId, &PaperGroup> = HashMap::new();
        for (group, _) in &self.groups {
            insert_group_row(conn, group)?;
            live_groups.insert(group.id, group);
        }
        for (paper, _) in &self.papers {
            insert_paper_row(conn, paper)?;
        }
        for event in &self.events {
            insert_event_row(conn, event)?;
        }
        for todo in &self.todos {
            insert_todo_row(conn, todo)?;
        }
        for definition in &self.definitions {
            insert_definition_row(conn, definition)?;
        }

        let mut candidate_parents: HashMap<GroupId, GroupId> = HashMap::new();
        for (group, requested) in &self.groups {
            let Some(parent_id) = *requested else {
                continue;
            };
            if parent_id == group.id {
                warnings.push(ImportWarning::SelfParentedGroup { group_id: group.id });
            } else if !live_groups.contains_key(&parent_id) {
                warnings.push(ImportWarning::DanglingGroupParent {
                    group_id: group.id,
                    parent_id,
                });
            } else {
                candidate_parents.insert(group.id, parent_id);
            }
        }
        let document_order: Vec<GroupId> = self.groups.iter().map(|(group, _)| group.id).collect();
        let (kept_parents, depth_warnings) =
            resolve_group_parents(&document_order, &candidate_parents);
        warnings.extend(depth_warnings);
        for group_id in &document_order {
            if let Some(parent_id) = kept_parents.get(group_id).copied().flatten() {
                set_group_parent(conn, *group_id, Some(parent_id))?;
            }
        }

        for (paper, requested) in &self.papers {
            let Some(group_id) = *requested else {
                continue;
            };
            if live_groups.contains_key(&group_id) {
                set_paper_group(conn, paper.id, Some(group_id))?;
            } else {
                warnings.push(ImportWarning::DanglingPaperGroup {
                    paper_id: paper.id,
                    group_id,
                });
            }
        }

        for scope in list_group_scopes(conn)? {
            renumber_group_scope(conn, scope)?;
        }
        for scope in list_paper_scopes(conn)? {
            renumber_paper_scope(conn, scope)?;
        }

        Ok(warnings)
    }
}

/// Decides which parent links survive the two-level limit.
///
/// Parents are settled before their children: a link is kept only when the
/// parent ended up a root. Cycles are broken at the link walked last.
fn resolve_group_parents(
    order: &[GroupId],
    candidates: &HashMap<GroupId, GroupId>,
) -> (HashMap<GroupId, Option<GroupId>>, Vec<ImportWarning>) {
    let mut resolved: HashMap<GroupId, Option<GroupId>> = HashMap::new();
    let mut warnings = Vec::new();

    for start in order {
        let mut chain = Vec::new();
        let mut on_chain = HashSet::new();
        let mut current = *start;
        while !resolved.contains_key(&current) {
            let Some(parent_id) = candidates.get(&current).copied() else {
                resolved.insert(current, None);
                break;
            };
            if !on_chain.insert(current) {
                break;
            }
            chain.push(current);
            current = parent_id;
        }

        for group_id in chain.into_iter().rev() {
            let Some(parent_id) = candidates.get(&group_id).copied() else {
                continue;
            };
            if matches!(resolved.get(&parent_id), Some(None)) {
                resolved.insert(group_id, Some(parent_id));
            } else {
                warnings.push(ImportWarning::DepthExceeded {
                    group_id,
                    parent_id,
                });
                resolved.insert(group_id, None);
            }
        }
    }

    (resolved, warnings)
}

/// Returns the record id (or a fresh one), rejecting duplicates in one kind.
fn claim_id(
    seen: &mut HashSet<Uuid>,
    id: Option<Uuid>,
    kind: &'static str,
) -> Result<Uuid, ImportError> {
    let id = id.unwrap_or_else(Uuid::new_v4);
    if !seen.insert(id) {
        return Err(ImportError::Malformed(format!("duplicate {kind} id {id}")));
    }
    Ok(id)
}
