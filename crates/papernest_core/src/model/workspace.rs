//! Project workspace record.

use super::now_epoch_ms;
use uuid::Uuid;

pub type WorkspaceId = Uuid;

/// Singleton project header. Exactly one exists per open project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    pub id: WorkspaceId,
    pub project_title: String,
    pub research_objective: String,
    pub created_at: i64,
}

impl Workspace {
    /// Creates an empty workspace with a fresh id.
    pub fn empty() -> Self {
        Self {
            id: Uuid::new_v4(),
            project_title: String::new(),
            research_objective: String::new(),
            created_at: now_epoch_ms(),
        }
    }
}
