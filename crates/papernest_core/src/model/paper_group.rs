//! Paper group model.
//!
//! # Invariants
//! - `parent_id = None` marks a root group.
//! - A subgroup's parent is always a root group (depth <= 2).
//! - `order_index` is dense (0..n-1) among groups sharing `parent_id`.

use super::now_epoch_ms;
use uuid::Uuid;

/// Stable paper group identifier.
pub type GroupId = Uuid;

/// Folder-like container for papers, at most two levels deep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperGroup {
    pub id: GroupId,
    pub name: String,
    /// Position among siblings sharing `parent_id`.
    pub order_index: i32,
    pub is_collapsed: bool,
    /// Navigational reference only; children are found by lookup.
    pub parent_id: Option<GroupId>,
    pub created_at: i64,
}

impl PaperGroup {
    /// Creates an unattached root group at order 0.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            order_index: 0,
            is_collapsed: false,
            parent_id: None,
            created_at: now_epoch_ms(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// One root group with its ordered subgroups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupTreeNode {
    pub group: PaperGroup,
    pub subgroups: Vec<PaperGroup>,
}
