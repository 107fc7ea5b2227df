//! Paper use-case service.
//!
//! # Responsibility
//! - Create and edit papers, appending new ones at the end of their scope.
//! - Merge fetched metadata exactly like a manual edit would.
//! - Record machine-local PDF locations from the cache collaborator.
//!
//! # Invariants
//! - A paper's target group must exist before the paper is stored.
//! - Stored `source_url` values are normalized.

use crate::external::{
    normalize_source_url, FetchError, MetadataSource, PaperMetadata, PdfCache,
};
use crate::model::paper::{Paper, PaperId};
use crate::model::paper_group::GroupId;
use crate::repo::group_repo::GroupRepository;
use crate::repo::paper_repo::PaperRepository;
use crate::repo::RepoError;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Errors from paper service operations.
#[derive(Debug)]
pub enum PaperServiceError {
    /// Target group does not exist.
    GroupNotFound(GroupId),
    /// Target paper does not exist.
    PaperNotFound(PaperId),
    /// Source URL is blank.
    MissingSourceUrl,
    /// Collaborator failure.
    Fetch(FetchError),
    /// Repository-level failure.
    Repo(RepoError),
}

impl Display for PaperServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GroupNotFound(id) => write!(f, "paper group not found: {id}"),
            Self::PaperNotFound(id) => write!(f, "paper not found: {id}"),
            Self::MissingSourceUrl => write!(f, "paper has no source URL"),
            Self::Fetch(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PaperServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Fetch(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for PaperServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::PaperNotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<FetchError> for PaperServiceError {
    fn from(value: FetchError) -> Self {
        Self::Fetch(value)
    }
}

/// Paper CRUD and collaborator orchestration.
pub struct PaperService<P: PaperRepository, G: GroupRepository> {
    papers: P,
    groups: G,
}

impl<P: PaperRepository, G: GroupRepository> PaperService<P, G> {
    /// Creates service from repository implementations.
    pub fn new(papers: P, groups: G) -> Self {
        Self { papers, groups }
    }

    /// Stores a new paper at the end of its group scope.
    pub fn create_paper(&self, mut paper: Paper) -> Result<Paper, PaperServiceError> {
        if let Some(group_id) = paper.group_id {
            self.require_group(group_id)?;
        }
        paper.source_url = normalize_source_url(&paper.source_url).unwrap_or_default();
        paper.cached_file_path = None;
        let stored = self.papers.create_paper(&paper)?;
        info!(
            "event=paper_create module=papers status=ok paper_id={} grouped={} sort_index={}",
            stored.id,
            stored.group_id.is_some(),
            stored.sort_index
        );
        Ok(stored)
    }

    /// Fetches metadata for `raw_url` and stores the result as a new paper.
    pub fn create_from_metadata(
        &self,
        source: &dyn MetadataSource,
        raw_url: &str,
        group_id: Option<GroupId>,
    ) -> Result<Paper, PaperServiceError> {
        let url = normalize_source_url(raw_url).ok_or(PaperServiceError::MissingSourceUrl)?;
        if let Some(group_id) = group_id {
            self.require_group(group_id)?;
        }
        let metadata = source.fetch_metadata(&url).map_err(|err| {
            warn!("event=metadata_fetch module=papers status=error error={err}");
            err
        })?;

        let mut paper = Paper::new(String::new());
        merge_metadata(&mut paper, metadata);
        paper.source_url = url;
        paper.group_id = group_id;
        self.create_paper(paper)
    }

    /// Re-fetches metadata for an existing paper and applies it as an edit.
    pub fn refresh_metadata(
        &self,
        source: &dyn MetadataSource,
        paper_id: PaperId,
    ) -> Result<Paper, PaperServiceError> {
        let mut paper = self.require_paper(paper_id)?;
        if paper.source_url.trim().is_empty() {
            return Err(PaperServiceError::MissingSourceUrl);
        }
        let metadata = source.fetch_metadata(&paper.source_url)?;
        merge_metadata(&mut paper, metadata);
        self.papers.update_paper(&paper)?;
        Ok(paper)
    }

    /// Saves descriptive fields of an existing paper.
    pub fn update_paper(&self, paper: &Paper) -> Result<(), PaperServiceError> {
        let mut normalized = paper.clone();
        normalized.source_url = normalize_source_url(&paper.source_url).unwrap_or_default();
        self.papers.update_paper(&normalized).map_err(Into::into)
    }

    /// Loads one paper by id.
    pub fn get_paper(&self, paper_id: PaperId) -> Result<Option<Paper>, PaperServiceError> {
        self.papers.get_paper(paper_id).map_err(Into::into)
    }

    /// Deletes one paper; its scope is renumbered.
    pub fn delete_paper(&self, paper_id: PaperId) -> Result<(), PaperServiceError> {
        self.papers.delete_paper(paper_id)?;
        info!("event=paper_delete module=papers status=ok paper_id={paper_id}");
        Ok(())
    }

    /// Returns the local PDF path, asking the cache when none is recorded or
    /// the recorded file is gone.
    pub fn resolve_local_file(
        &self,
        cache: &dyn PdfCache,
        paper_id: PaperId,
    ) -> Result<PathBuf, PaperServiceError> {
        let paper = self.require_paper(paper_id)?;
        if let Some(existing) = paper.cached_file_path.as_deref() {
            if Path::new(existing).is_file() {
                return Ok(PathBuf::from(existing));
            }
        }
        if paper.source_url.trim().is_empty() {
            return Err(PaperServiceError::MissingSourceUrl);
        }

        let path = cache.resolve_local_path(paper.id, &paper.source_url)?;
        self.papers
            .set_cached_file_path(paper.id, Some(path.to_string_lossy().as_ref()))?;
        Ok(path)
    }

    fn require_group(&self, group_id: GroupId) -> Result<(), PaperServiceError> {
        self.groups
            .get_group(group_id)?
            .map(|_| ())
            .ok_or(PaperServiceError::GroupNotFound(group_id))
    }

    fn require_paper(&self, paper_id: PaperId) -> Result<Paper, PaperServiceError> {
        self.papers
            .get_paper(paper_id)?
            .ok_or(PaperServiceError::PaperNotFound(paper_id))
    }
}

/// Applies non-empty fetched fields over `paper`. Notes are never touched.
fn merge_metadata(paper: &mut Paper, metadata: PaperMetadata) {
    if !metadata.title.trim().is_empty() {
        paper.title = metadata.title.trim().to_string();
    }
    if let Some(short_title) = metadata.short_title.filter(|value| !value.trim().is_empty()) {
        paper.short_title = short_title.trim().to_string();
    }
    if !metadata.abstract_text.trim().is_empty() {
        paper.abstract_text = metadata.abstract_text;
    }
    if !metadata.authors.is_empty() {
        paper.authors = metadata.authors;
    }
    if let Some(paper_type) = metadata.paper_type {
        paper.paper_type = paper_type;
    }
}
