//! Flat project records: events, todos and definitions.
//!
//! These carry no relationships beyond the implicit workspace scope and take
//! no part in ordering.

use super::now_epoch_ms;
use uuid::Uuid;

/// Dated project event (deadline, meeting, conference).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub details: String,
    /// Epoch milliseconds, if scheduled.
    pub starts_at: Option<i64>,
    pub created_at: i64,
}

impl Event {
    /// Creates an event with a fresh id and empty details.
    pub fn new(title: impl Into<String>, starts_at: Option<i64>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            details: String::new(),
            starts_at,
            created_at: now_epoch_ms(),
        }
    }
}

/// Checklist entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoItem {
    pub id: Uuid,
    pub title: String,
    pub is_completed: bool,
    /// Epoch milliseconds, if the todo has a due date.
    pub due_at: Option<i64>,
    pub created_at: i64,
}

impl TodoItem {
    /// Creates an open todo without a due date.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            is_completed: false,
            due_at: None,
            created_at: now_epoch_ms(),
        }
    }
}

/// Glossary entry kept alongside the reading list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionItem {
    pub id: Uuid,
    pub term: String,
    pub definition: String,
    pub created_at: i64,
}

impl DefinitionItem {
    /// Creates a glossary entry for `term`.
    pub fn new(term: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            term: term.into(),
            definition: definition.into(),
            created_at: now_epoch_ms(),
        }
    }
}
