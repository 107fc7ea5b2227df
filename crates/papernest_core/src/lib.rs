//! Core domain logic for PaperNest.
//! This crate is the single source of truth for ordering and hierarchy
//! invariants of a research project.

pub mod db;
pub mod external;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod transfer;

pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use rusqlite::Connection;
pub use external::{normalize_source_url, FetchError, MetadataSource, PaperMetadata, PdfCache};
pub use logging::{default_log_level, init_logging, parse_log_level, LoggingError};
pub use model::agenda::{DefinitionItem, Event, TodoItem};
pub use model::paper::{Author, Paper, PaperId, PaperNotes, PaperType};
pub use model::paper_group::{GroupId, GroupTreeNode, PaperGroup};
pub use model::workspace::{Workspace, WorkspaceId};
pub use repo::agenda_repo::{AgendaRepository, SqliteAgendaRepository};
pub use repo::group_repo::{GroupDeleteOutcome, GroupRepository, SqliteGroupRepository};
pub use repo::paper_repo::{PaperRepository, SqlitePaperRepository};
pub use repo::workspace_repo::{SqliteWorkspaceRepository, WorkspaceRepository};
pub use repo::{RepoError, RepoResult};
pub use service::ordering_service::{OrderingError, OrderingResult, OrderingService};
pub use service::paper_service::{PaperService, PaperServiceError};
pub use service::project_service::{new_project, project_counts, ProjectCounts};
pub use transfer::{
    export_project, import_document, import_project, serialize_project, ExportError,
    ExportSummary, ImportError, ImportReport, ImportWarning, ProjectDocument,
    CURRENT_FORMAT_VERSION,
};
