//! Project file document (format version 1).
//!
//! # Responsibility
//! - Define the flat, versioned JSON shape of an exported project.
//! - Convert between store entities and document records.
//!
//! # Invariants
//! - Relationships are foreign-key ids (`parentID`, `groupID`), never nesting.
//! - Every field is optional on read and always written on export.
//! - `cachedFilePath` has no field here on purpose: it never leaves the machine.
//! - Timestamps are RFC 3339 strings; store values are epoch milliseconds.

use crate::model::agenda::{DefinitionItem, Event, TodoItem};
use crate::model::paper::{encode_authors, encode_notes, Paper, PaperType};
use crate::model::paper_group::PaperGroup;
use crate::model::workspace::Workspace;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Format version written by this build; newer files are rejected.
pub const CURRENT_FORMAT_VERSION: u32 = 1;

/// Whole-project document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectDocument {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub workspaces: Vec<WorkspaceRecord>,
    pub paper_groups: Vec<PaperGroupRecord>,
    pub papers: Vec<PaperRecord>,
    pub events: Vec<EventRecord>,
    pub todos: Vec<TodoRecord>,
    pub definitions: Vec<DefinitionRecord>,
}

impl Default for ProjectDocument {
    fn default() -> Self {
        Self {
            version: CURRENT_FORMAT_VERSION,
            exported_at: DateTime::<Utc>::default(),
            workspaces: Vec::new(),
            paper_groups: Vec::new(),
            papers: Vec::new(),
            events: Vec::new(),
            todos: Vec::new(),
            definitions: Vec::new(),
        }
    }
}

impl ProjectDocument {
    /// Parses a document from raw file bytes.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Encodes the document as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkspaceRecord {
    pub id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub project_title: String,
    pub research_objective: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaperGroupRecord {
    pub id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub name: String,
    pub order_index: i32,
    pub is_collapsed: bool,
    #[serde(rename = "parentID")]
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaperRecord {
    pub id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub short_title: String,
    pub abstract_text: String,
    #[serde(rename = "sourceURL")]
    pub source_url: String,
    /// JSON text of `[{firstName, lastName}]`.
    #[serde(rename = "authorsJSON")]
    pub authors_json: String,
    /// JSON text of `{sectionKey: text}`.
    #[serde(rename = "notesJSON")]
    pub notes_json: String,
    pub paper_type: PaperType,
    pub sort_index: i32,
    #[serde(rename = "groupID")]
    pub group_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventRecord {
    pub id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub details: String,
    pub starts_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TodoRecord {
    pub id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub is_completed: bool,
    pub due_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DefinitionRecord {
    pub id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub term: String,
    pub definition: String,
}

/// Epoch milliseconds to UTC; out-of-range values clamp to the epoch.
pub(crate) fn datetime_from_epoch_ms(value: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(value).unwrap_or_default()
}

pub(crate) fn epoch_ms_from_datetime(value: &DateTime<Utc>) -> i64 {
    value.timestamp_millis()
}

impl From<&Workspace> for WorkspaceRecord {
    fn from(value: &Workspace) -> Self {
        Self {
            id: Some(value.id),
            created_at: datetime_from_epoch_ms(value.created_at),
            project_title: value.project_title.clone(),
            research_objective: value.research_objective.clone(),
        }
    }
}

impl From<&PaperGroup> for PaperGroupRecord {
    fn from(value: &PaperGroup) -> Self {
        Self {
            id: Some(value.id),
            created_at: datetime_from_epoch_ms(value.created_at),
            name: value.name.clone(),
            order_index: value.order_index,
            is_collapsed: value.is_collapsed,
            parent_id: value.parent_id,
        }
    }
}

impl PaperRecord {
    /// Builds the record for `paper`; only JSON encoding can fail.
    pub fn try_from_paper(paper: &Paper) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: Some(paper.id),
            created_at: datetime_from_epoch_ms(paper.created_at),
            title: paper.title.clone(),
            short_title: paper.short_title.clone(),
            abstract_text: paper.abstract_text.clone(),
            source_url: paper.source_url.clone(),
            authors_json: encode_authors(&paper.authors)?,
            notes_json: encode_notes(&paper.notes)?,
            paper_type: paper.paper_type,
            sort_index: paper.sort_index,
            group_id: paper.group_id,
        })
    }
}

impl From<&Event> for EventRecord {
    fn from(value: &Event) -> Self {
        Self {
            id: Some(value.id),
            created_at: datetime_from_epoch_ms(value.created_at),
            title: value.title.clone(),
            details: value.details.clone(),
            starts_at: value.starts_at.map(datetime_from_epoch_ms),
        }
    }
}

impl From<&TodoItem> for TodoRecord {
    fn from(value: &TodoItem) -> Self {
        Self {
            id: Some(value.id),
            created_at: datetime_from_epoch_ms(value.created_at),
            title: value.title.clone(),
            is_completed: value.is_completed,
            due_at: value.due_at.map(datetime_from_epoch_ms),
        }
    }
}

impl From<&DefinitionItem> for DefinitionRecord {
    fn from(value: &DefinitionItem) -> Self {
        Self {
            id: Some(value.id),
            created_at: datetime_from_epoch_ms(value.created_at),
            term: value.term.clone(),
            definition: value.definition.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ProjectDocument, CURRENT_FORMAT_VERSION};
    use crate::model::paper::PaperType;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let doc = ProjectDocument::from_json_slice(br#"{"papers": [{"title": "Only title"}]}"#)
            .unwrap();
        assert_eq!(doc.version, CURRENT_FORMAT_VERSION);
        assert!(doc.workspaces.is_empty());
        let paper = &doc.papers[0];
        assert_eq!(paper.id, None);
        assert_eq!(paper.group_id, None);
        assert_eq!(paper.sort_index, 0);
        assert_eq!(paper.paper_type, PaperType::Empirical);
    }

    #[test]
    fn foreign_keys_use_upper_case_id_suffix() {
        let doc = ProjectDocument::from_json_slice(
            br#"{"paperGroups": [{"name": "A", "parentID": "6f1c1a4e-9a55-4b43-9a8e-2f8f3f0c2d11"}],
                 "papers": [{"sourceURL": "https://arxiv.org/abs/1", "paperType": "theoreticalProof"}]}"#,
        )
        .unwrap();
        assert!(doc.paper_groups[0].parent_id.is_some());
        assert_eq!(doc.papers[0].source_url, "https://arxiv.org/abs/1");
        assert_eq!(doc.papers[0].paper_type, PaperType::TheoreticalProof);
    }

    #[test]
    fn written_documents_carry_every_field() {
        let mut doc = ProjectDocument::default();
        doc.papers.push(Default::default());
        let text = String::from_utf8(doc.to_json_pretty().unwrap()).unwrap();
        for key in [
            "\"version\"",
            "\"exportedAt\"",
            "\"definitions\"",
            "\"groupID\"",
            "\"authorsJSON\"",
            "\"notesJSON\"",
        ] {
            assert!(text.contains(key), "missing {key}");
        }
        assert!(!text.contains("cachedFilePath"));
    }

    #[test]
    fn malformed_uuid_is_a_parse_error() {
        assert!(ProjectDocument::from_json_slice(br#"{"papers": [{"groupID": "nope"}]}"#).is_err());
    }
}
