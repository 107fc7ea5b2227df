//! Paper model.
//!
//! # Responsibility
//! - Define the reading-list entry and its embedded author/notes payloads.
//! - Provide the JSON text encoding used for `authors_json` / `notes_json`.
//!
//! # Invariants
//! - `sort_index` is dense (0..n-1) among papers sharing `group_id`;
//!   papers with `group_id = None` form the ungrouped scope.
//! - `cached_file_path` is machine-local and never leaves the store.

use super::now_epoch_ms;
use super::paper_group::GroupId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Stable paper identifier.
pub type PaperId = Uuid;

/// Section key -> note text.
pub type PaperNotes = BTreeMap<String, String>;

/// Kind of contribution a paper makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PaperType {
    Survey,
    #[default]
    Empirical,
    TheoreticalProof,
}

impl PaperType {
    pub(crate) fn as_db_str(self) -> &'static str {
        match self {
            Self::Survey => "survey",
            Self::Empirical => "empirical",
            Self::TheoreticalProof => "theoretical_proof",
        }
    }

    pub(crate) fn from_db_str(value: &str) -> Option<Self> {
        match value {
            "survey" => Some(Self::Survey),
            "empirical" => Some(Self::Empirical),
            "theoretical_proof" => Some(Self::TheoreticalProof),
            _ => None,
        }
    }
}

/// One author entry; list order is citation order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl Author {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }
}

/// Reading-list entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paper {
    pub id: PaperId,
    pub title: String,
    pub short_title: String,
    pub abstract_text: String,
    pub source_url: String,
    pub authors: Vec<Author>,
    pub notes: PaperNotes,
    pub paper_type: PaperType,
    /// Position within the `group_id` scope.
    pub sort_index: i32,
    pub group_id: Option<GroupId>,
    pub cached_file_path: Option<String>,
    pub created_at: i64,
}

impl Paper {
    /// Creates an ungrouped paper with empty metadata.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            short_title: String::new(),
            abstract_text: String::new(),
            source_url: String::new(),
            authors: Vec::new(),
            notes: PaperNotes::new(),
            paper_type: PaperType::default(),
            sort_index: 0,
            group_id: None,
            cached_file_path: None,
            created_at: now_epoch_ms(),
        }
    }

    /// Label used in compact listings: short title when set, else title.
    pub fn display_title(&self) -> &str {
        if self.short_title.trim().is_empty() {
            self.title.as_str()
        } else {
            self.short_title.as_str()
        }
    }
}

/// Encodes an author list as JSON text.
pub fn encode_authors(authors: &[Author]) -> Result<String, serde_json::Error> {
    serde_json::to_string(authors)
}

/// Decodes JSON text into an author list. Blank text is an empty list.
pub fn decode_authors(text: &str) -> Result<Vec<Author>, serde_json::Error> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(text)
}

/// Encodes section notes as JSON text.
pub fn encode_notes(notes: &PaperNotes) -> Result<String, serde_json::Error> {
    serde_json::to_string(notes)
}

/// Decodes JSON text into section notes. Blank text is an empty map.
pub fn decode_notes(text: &str) -> Result<PaperNotes, serde_json::Error> {
    if text.trim().is_empty() {
        return Ok(PaperNotes::new());
    }
    serde_json::from_str(text)
}
