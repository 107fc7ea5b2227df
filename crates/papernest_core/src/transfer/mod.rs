//! Project file exchange.
//!
//! # Responsibility
//! - Serialize the whole store into one versioned JSON document.
//! - Rebuild the store from such a document as an atomic full replace.

pub mod document;
pub mod export;
pub mod import;

pub use document::{ProjectDocument, CURRENT_FORMAT_VERSION};
pub use export::{export_project, serialize_project, ExportError, ExportSummary};
pub use import::{import_document, import_project, ImportError, ImportReport, ImportWarning};
