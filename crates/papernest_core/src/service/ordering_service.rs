//! Hierarchical ordering use-case service.
//!
//! # Responsibility
//! - Validate group depth and scope membership above the repository layer.
//! - Provide create, delete, move, rename and collapse operations for the
//!   group tree and the paper order inside each group.
//!
//! # Invariants
//! - Group depth never exceeds 2: a subgroup's parent is a root group.
//! - Invalid input fails before any mutation.
//! - After every mutation each touched scope is densely numbered 0..n-1.
//! - Single writer: callers marshal drag-and-drop results onto the thread
//!   owning the connection; the last committed move wins.

use crate::model::paper::{Paper, PaperId};
use crate::model::paper_group::{GroupId, GroupTreeNode, PaperGroup};
use crate::repo::group_repo::{GroupDeleteOutcome, GroupRepository};
use crate::repo::paper_repo::PaperRepository;
use crate::repo::RepoError;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Errors from ordering operations.
#[derive(Debug)]
pub enum OrderingError {
    /// Group name is blank after trim.
    InvalidName,
    /// Referenced group or paper does not exist.
    NotFound(Uuid),
    /// Creating a child under `parent_id` would exceed two levels.
    InvalidDepth { parent_id: GroupId },
    /// Anchor entity exists but lives in another scope than the target.
    NotInScope {
        anchor_id: Uuid,
        scope: Option<GroupId>,
    },
    /// Repository-level failure.
    Repo(RepoError),
}

impl Display for OrderingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName => write!(f, "group name must not be blank"),
            Self::NotFound(id) => write!(f, "entity not found: {id}"),
            Self::InvalidDepth { parent_id } => write!(
                f,
                "group {parent_id} is a subgroup and cannot contain groups"
            ),
            Self::NotInScope { anchor_id, scope } => match scope {
                Some(group_id) => write!(f, "anchor {anchor_id} is not in group {group_id}"),
                None => write!(f, "anchor {anchor_id} is not in the root scope"),
            },
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for OrderingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for OrderingError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            other => Self::Repo(other),
        }
    }
}

pub type OrderingResult<T> = Result<T, OrderingError>;

/// Group tree and paper order facade.
pub struct OrderingService<G: GroupRepository, P: PaperRepository> {
    groups: G,
    papers: P,
}

impl<G: GroupRepository, P: PaperRepository> OrderingService<G, P> {
    /// Creates service from repository implementations.
    pub fn new(groups: G, papers: P) -> Self {
        Self { groups, papers }
    }

    /// Appends a new root group at the end of the root scope.
    pub fn create_root_group(&self, name: impl Into<String>) -> OrderingResult<PaperGroup> {
        let name = normalize_group_name(name.into())?;
        let group = self.groups.create_group(None, name.as_str())?;
        info!(
            "event=group_create module=ordering status=ok group_id={} depth=root order_index={}",
            group.id, group.order_index
        );
        Ok(group)
    }

    /// Appends a new subgroup at the end of `parent_id`'s scope.
    ///
    /// # Errors
    /// - `InvalidDepth` when `parent_id` is itself a subgroup.
    pub fn create_subgroup(
        &self,
        parent_id: GroupId,
        name: impl Into<String>,
    ) -> OrderingResult<PaperGroup> {
        let name = normalize_group_name(name.into())?;
        let parent = self.require_group(parent_id)?;
        if !parent.is_root() {
            return Err(OrderingError::InvalidDepth { parent_id });
        }
        let group = self.groups.create_group(Some(parent_id), name.as_str())?;
        info!(
            "event=group_create module=ordering status=ok group_id={} depth=sub order_index={}",
            group.id, group.order_index
        );
        Ok(group)
    }

    /// Deletes one group without deleting its content.
    ///
    /// Member papers move to the end of the parent scope (ungrouped for a
    /// root). Subgroups of a root are promoted to roots, appended in their
    /// existing order, and keep their own papers.
    pub fn delete_group(&self, group_id: GroupId) -> OrderingResult<GroupDeleteOutcome> {
        self.require_group(group_id)?;
        let outcome = self.groups.delete_group_reparent(group_id)?;
        info!(
            "event=group_delete module=ordering status=ok group_id={} reparented_papers={} promoted_subgroups={}",
            group_id,
            outcome.reparented_papers,
            outcome.promoted_subgroups.len()
        );
        Ok(outcome)
    }

    /// Moves a paper into `target_group_id`, right before `before_paper_id`
    /// or at the end, then renumbers the target scope.
    ///
    /// Moving onto itself (`before_paper_id == paper_id`) keeps the position.
    pub fn move_paper(
        &self,
        paper_id: PaperId,
        target_group_id: Option<GroupId>,
        before_paper_id: Option<PaperId>,
    ) -> OrderingResult<()> {
        let paper = self.require_paper(paper_id)?;
        if let Some(group_id) = target_group_id {
            self.require_group(group_id)?;
        }
        if let Some(anchor_id) = before_paper_id.filter(|anchor| *anchor != paper_id) {
            let anchor = self.require_paper(anchor_id)?;
            if anchor.group_id != target_group_id {
                return Err(OrderingError::NotInScope {
                    anchor_id,
                    scope: target_group_id,
                });
            }
        }
        if before_paper_id == Some(paper_id) && paper.group_id != target_group_id {
            return Err(OrderingError::NotInScope {
                anchor_id: paper_id,
                scope: target_group_id,
            });
        }

        self.papers
            .move_paper(paper_id, target_group_id, before_paper_id)?;
        info!(
            "event=paper_move module=ordering status=ok paper_id={} cross_scope={}",
            paper_id,
            paper.group_id != target_group_id
        );
        Ok(())
    }

    /// Reorders a group among its siblings; its parent never changes here.
    pub fn move_group(
        &self,
        group_id: GroupId,
        before_group_id: Option<GroupId>,
    ) -> OrderingResult<()> {
        let group = self.require_group(group_id)?;
        if let Some(anchor_id) = before_group_id.filter(|anchor| *anchor != group_id) {
            let anchor = self.require_group(anchor_id)?;
            if anchor.parent_id != group.parent_id {
                return Err(OrderingError::NotInScope {
                    anchor_id,
                    scope: group.parent_id,
                });
            }
        }
        self.groups.move_group(group_id, before_group_id)?;
        Ok(())
    }

    /// Renames one group.
    pub fn rename_group(&self, group_id: GroupId, name: impl Into<String>) -> OrderingResult<()> {
        let name = normalize_group_name(name.into())?;
        self.groups
            .rename_group(group_id, name.as_str())
            .map_err(Into::into)
    }

    /// Sets the collapsed flag explicitly.
    pub fn set_collapsed(&self, group_id: GroupId, is_collapsed: bool) -> OrderingResult<()> {
        self.groups
            .set_collapsed(group_id, is_collapsed)
            .map_err(Into::into)
    }

    /// Flips the collapsed flag and returns the new value.
    pub fn toggle_collapsed(&self, group_id: GroupId) -> OrderingResult<bool> {
        let group = self.require_group(group_id)?;
        let collapsed = !group.is_collapsed;
        self.groups.set_collapsed(group_id, collapsed)?;
        Ok(collapsed)
    }

    /// Lists one group scope in display order.
    pub fn list_groups(&self, parent_id: Option<GroupId>) -> OrderingResult<Vec<PaperGroup>> {
        if let Some(parent_id) = parent_id {
            self.require_group(parent_id)?;
        }
        self.groups.list_groups(parent_id).map_err(Into::into)
    }

    /// Lists one paper scope in display order.
    pub fn list_papers(&self, group_id: Option<GroupId>) -> OrderingResult<Vec<Paper>> {
        if let Some(group_id) = group_id {
            self.require_group(group_id)?;
        }
        self.papers.list_papers(group_id).map_err(Into::into)
    }

    /// Root groups with their subgroups, both in display order.
    pub fn group_tree(&self) -> OrderingResult<Vec<GroupTreeNode>> {
        let roots = self.groups.list_groups(None)?;
        let mut tree = Vec::with_capacity(roots.len());
        for group in roots {
            let subgroups = self.groups.list_groups(Some(group.id))?;
            tree.push(GroupTreeNode { group, subgroups });
        }
        Ok(tree)
    }

    fn require_group(&self, group_id: GroupId) -> OrderingResult<PaperGroup> {
        self.groups
            .get_group(group_id)?
            .ok_or(OrderingError::NotFound(group_id))
    }

    fn require_paper(&self, paper_id: PaperId) -> OrderingResult<Paper> {
        self.papers
            .get_paper(paper_id)?
            .ok_or(OrderingError::NotFound(paper_id))
    }
}

fn normalize_group_name(value: String) -> OrderingResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(OrderingError::InvalidName);
    }
    Ok(trimmed.to_string())
}
